use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tabscan::pipeline::load_image;
use tabscan::{DebugConfig, Extraction, ExtractorConfig, TableExtractor, Telemetry};

#[derive(Parser)]
#[command(name = "tabscan")]
#[command(about = "Extract tables from scanned document images")]
struct Cli {
    /// Input image files
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Skip OCR (only report detected table regions)
    #[arg(long)]
    skip_ocr: bool,

    /// Row band threshold in pixels
    #[arg(long, value_name = "PX")]
    row_threshold: Option<f32>,

    /// Column band threshold in pixels
    #[arg(long, value_name = "PX")]
    col_threshold: Option<f32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "tabscan=debug" } else { "tabscan=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => ExtractorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ExtractorConfig::default(),
    };
    if let Some(threshold) = args.row_threshold {
        config.structure.row_threshold = threshold;
    }
    if let Some(threshold) = args.col_threshold {
        config.structure.col_threshold = threshold;
    }
    if args.skip_ocr {
        config.ocr.backends.clear();
    }

    let debug = args.debug_out.map(DebugConfig::new).transpose()?;

    let extractor = Arc::new(TableExtractor::from_config(&config, Telemetry::new("cli"))?);
    if args.verbose {
        for status in extractor.ocr().statuses() {
            match &status.error {
                None => println!("Backend {}: available", status.name),
                Some(reason) => println!("Backend {}: unavailable ({})", status.name, reason),
            }
        }
    }

    let multiple = args.images.len() > 1;
    let mut tasks = Vec::with_capacity(args.images.len());
    for (index, path) in args.images.into_iter().enumerate() {
        let extractor = Arc::clone(&extractor);
        let debug = debug.as_ref().map(|d| {
            if multiple {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
                d.child(&format!("{:02}_{}", index + 1, stem))
            } else {
                d.clone()
            }
        });

        tasks.push(tokio::task::spawn_blocking(move || -> anyhow::Result<(PathBuf, Extraction)> {
            let image = load_image(&path)
                .with_context(|| format!("Failed to load image {}", path.display()))?;
            let extraction = extractor.extract_with_debug(&image, debug.as_ref())?;
            Ok((path, extraction))
        }));
    }

    let mut failures = 0usize;
    for task in tasks {
        match task.await? {
            Ok((path, extraction)) => print_extraction(&path, &extraction, args.skip_ocr, args.verbose),
            Err(e) => {
                failures += 1;
                eprintln!("Error: {e:#}");
            }
        }
    }

    if args.verbose {
        println!("\n=== Metrics ===");
        for (name, stats) in extractor.telemetry().metrics().snapshot() {
            println!(
                "  {name}: count={} mean={:.2} min={:.2} max={:.2}",
                stats.count,
                stats.mean(),
                stats.min,
                stats.max
            );
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} image(s) failed");
    }
    Ok(())
}

fn print_extraction(path: &std::path::Path, extraction: &Extraction, skip_ocr: bool, verbose: bool) {
    let diag = &extraction.diagnostics;
    println!("\n=== {} ===", path.display());
    println!("Tables detected: {} (tier: {})", extraction.tables.len(), diag.detection_tier);
    if diag.detection_degraded {
        println!("  No table outline found, used the whole image.");
    }
    if !skip_ocr && diag.recognition_unavailable {
        println!("  No text recognized; no OCR backend produced output.");
    }
    if verbose {
        println!(
            "  Run {} in {:.1} ms (preprocess {:.1} ms, skew {:.2} deg)",
            diag.run_id,
            diag.elapsed.as_secs_f64() * 1000.0,
            diag.preprocess.elapsed.as_secs_f64() * 1000.0,
            diag.preprocess.skew_angle.unwrap_or(0.0)
        );
    }

    for (i, table) in extraction.tables.iter().enumerate() {
        let r = &table.region;
        println!(
            "\nTable {} at ({}, {})-({}, {})",
            i + 1,
            r.x1(),
            r.y1(),
            r.x2(),
            r.y2()
        );
        if skip_ocr {
            continue;
        }
        println!(
            "  {}x{} cells, {} fragments, mean confidence {:.2}",
            table.grid.row_count(),
            table.grid.col_count(),
            table.fragment_count,
            table.mean_confidence
        );
        for row in table.grid.rows() {
            println!("  | {} |", row.join(" | "));
        }
    }
}
