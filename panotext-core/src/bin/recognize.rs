use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use snafu::ensure;
use tracing::info;

use panotext_core::consts::*;
use panotext_core::draw::save_annotated;
use panotext_core::error::MissingPanoramaSnafu;
use panotext_core::{ModelPaths, PaddleOcrEngine, PanoOcr, PanoOcrConfig, PanoOcrResult};

#[derive(Parser)]
#[command(name = "recognize")]
#[command(about = "Panoramic OCR: finds text in an equirectangular panorama")]
struct Args {
    #[arg(help = "Input equirectangular panorama image")]
    input: PathBuf,

    #[arg(
        short,
        long,
        default_value = "detections.json",
        help = "Output JSON file"
    )]
    output: PathBuf,

    #[arg(
        short,
        long,
        help = "Write a copy of the panorama with detection boxes drawn on it"
    )]
    annotated: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_FOV_DEG, help = "Field of view per perspective view, degrees")]
    fov: f32,

    #[arg(long, default_value_t = DEFAULT_OVERLAP, help = "Overlap fraction between adjacent views")]
    overlap: f32,

    #[arg(long, default_value_t = DEFAULT_VIEW_SIZE, help = "Rendered view size in pixels")]
    view_size: u32,

    #[arg(long, default_value_t = CONFIDENCE_THRESHOLD, help = "Minimum detection confidence")]
    confidence: f32,

    #[arg(long, default_value_t = 20, help = "Table rows to print, 0 for all")]
    limit: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    ensure!(
        args.input.exists(),
        MissingPanoramaSnafu {
            path: args.input.display().to_string(),
        }
    );

    let panorama = image::open(&args.input)?;
    info!(
        input = %args.input.display(),
        width = panorama.width(),
        height = panorama.height(),
        "loaded panorama"
    );

    let paths = ModelPaths::ensure_all()?;
    let engine = PaddleOcrEngine::new(&paths)?;

    let config = PanoOcrConfig {
        fov_deg: args.fov,
        overlap: args.overlap,
        view_size: args.view_size,
        confidence_threshold: args.confidence,
        ..PanoOcrConfig::default()
    };

    let mut ocr = PanoOcr::new(engine, config);
    let result = ocr.process(&panorama)?;

    print_detections(&result, args.limit);

    result.save_json(&args.output)?;
    info!(output = %args.output.display(), "detections saved");

    if let Some(annotated_path) = &args.annotated {
        save_annotated(&panorama, &result.results, annotated_path)?;
        info!(output = %annotated_path.display(), "annotated panorama saved");
    }

    Ok(())
}

fn print_detections(result: &PanoOcrResult, limit: usize) {
    if result.is_empty() {
        println!("No text detected.");
        return;
    }

    println!(
        "{:<30} {:>8} {:>8} {:>7} {:>7} {:>6}",
        "Text", "Yaw", "Pitch", "Width", "Height", "Conf"
    );
    let rows = table_rows(&result.results, limit);
    for detection in rows {
        println!(
            "{:<30} {:>8.2} {:>8.2} {:>7.2} {:>7.2} {:>6.2}",
            truncate(&detection.text, 28),
            detection.rect.yaw,
            detection.rect.pitch,
            detection.rect.width,
            detection.rect.height,
            detection.confidence,
        );
    }
    if result.len() > rows.len() {
        println!("  ... and {} more", result.len() - rows.len());
    }
    println!("\n{} detections", result.len());
}

/// Results are confidence-sorted, so the cap keeps the top detections.
fn table_rows<T>(results: &[T], limit: usize) -> &[T] {
    if limit == 0 {
        results
    } else {
        &results[..results.len().min(limit)]
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
