//! Contrast-limited adaptive histogram equalization.

use image::{GrayImage, Luma};

const BINS: usize = 256;

/// Equalize `img` tile by tile, clipping each tile histogram at
/// `clip_limit` times the mean bin height, and blend neighbouring tile
/// mappings bilinearly so tile borders do not show.
pub fn clahe(img: &GrayImage, tile_grid: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let tile_w = width.div_ceil(tile_grid.clamp(1, width));
    let tile_h = height.div_ceil(tile_grid.clamp(1, height));
    // Recount so that no tile is empty when the size does not divide evenly.
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(img, x0, y0, x1, y1, clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    GrayImage::from_fn(width, height, |x, y| {
        let value = img.get_pixel(x, y)[0] as usize;

        let (tx0, tx1, ax) = neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = neighbours(y, tile_h, tiles_y);

        let top = lut_at(tx0, ty0)[value] as f32 * (1.0 - ax) + lut_at(tx1, ty0)[value] as f32 * ax;
        let bottom =
            lut_at(tx0, ty1)[value] as f32 * (1.0 - ax) + lut_at(tx1, ty1)[value] as f32 * ax;
        let blended = top * (1.0 - ay) + bottom * ay;
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// The two tile indices whose centers surround `pos`, and the weight of the second.
fn neighbours(pos: u32, tile_size: u32, tiles: u32) -> (u32, u32, f32) {
    let t = (pos as f32 + 0.5) / tile_size as f32 - 0.5;
    let lower = t.floor();
    let weight = t - lower;
    let last = tiles as i64 - 1;
    let t0 = (lower as i64).clamp(0, last) as u32;
    let t1 = (lower as i64 + 1).clamp(0, last) as u32;
    (t0, t1, weight)
}

fn tile_lut(img: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; BINS] {
    let mut hist = [0u32; BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    let area = (x1 - x0) * (y1 - y0);
    if area == 0 {
        let mut identity = [0u8; BINS];
        for (i, v) in identity.iter_mut().enumerate() {
            *v = i as u8;
        }
        return identity;
    }

    clip_histogram(&mut hist, area, clip_limit);

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; BINS];
    let mut cumulative = 0u32;
    for (bin, count) in hist.iter().enumerate() {
        cumulative += count;
        lut[bin] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Cap every bin and spread the excess evenly over all bins.
fn clip_histogram(hist: &mut [u32; BINS], area: u32, clip_limit: f32) {
    let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);

    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let per_bin = excess / BINS as u32;
    let mut residual = excess % BINS as u32;
    for count in hist.iter_mut() {
        *count += per_bin;
    }
    if residual > 0 {
        let step = (BINS as u32 / residual).max(1) as usize;
        let mut bin = 0;
        while bin < BINS && residual > 0 {
            hist[bin] += 1;
            residual -= 1;
            bin += step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_dimensions() {
        let img = GrayImage::from_fn(37, 23, |x, y| Luma([((x + y) * 3) as u8]));
        let out = clahe(&img, 8, 2.0);
        assert_eq!(out.dimensions(), img.dimensions());
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let img = GrayImage::from_pixel(64, 64, Luma([120u8]));
        let out = clahe(&img, 8, 2.0);
        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn keeps_intensity_order_within_tiles() {
        // Same two-level texture in every tile, so every tile mapping matches.
        let img = GrayImage::from_fn(64, 64, |x, y| {
            Luma([if (x + y) % 2 == 0 { 110u8 } else { 150u8 }])
        });
        let out = clahe(&img, 8, 2.0);
        assert!(out.get_pixel(0, 0)[0] < out.get_pixel(1, 0)[0]);
    }

    #[test]
    fn clipping_conserves_pixel_count() {
        let mut hist = [0u32; BINS];
        hist[10] = 1000;
        hist[20] = 24;
        clip_histogram(&mut hist, 1024, 2.0);
        assert_eq!(hist.iter().sum::<u32>(), 1024);
        assert!(hist[10] < 1000);
    }

    #[test]
    fn tiny_images_use_fewer_tiles() {
        let img = GrayImage::from_pixel(3, 2, Luma([40u8]));
        let out = clahe(&img, 8, 2.0);
        assert_eq!(out.dimensions(), (3, 2));
    }
}
