// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — QR code and barcode scanner.
//
// Entry point. Initialises logging, loads the scanner configuration, scans
// every image given on the command line, and prints one JSON response per
// image on stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use scanwerk_core::error::ScanError;
use scanwerk_core::{ResponseClass, ScanConfig, ScanRequest, ScanResponse};
use scanwerk_decode::scan::standard_battery;
use scanwerk_decode::{CodeScanner, ImageProcessor, Transform};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "scanwerk")]
#[command(about = "Decode QR codes and barcodes from image files")]
#[command(version)]
struct Cli {
    /// Image files to scan (JPEG, PNG, BMP, GIF, TIFF, WebP, ...).
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,

    /// JSON file with scanner settings; missing fields use defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Declared MIME type of the uploads. Inferred from the file extension
    /// when omitted.
    #[arg(long, value_name = "MIME")]
    content_type: Option<String>,

    /// Pretty-print the JSON responses.
    #[arg(long)]
    pretty: bool,

    /// Write every preprocessing variant of each image to this directory.
    #[arg(long, value_name = "DIR")]
    save_variants: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(worst) => match worst {
            ResponseClass::Success => ExitCode::SUCCESS,
            ResponseClass::ServerError => ExitCode::from(1),
            ResponseClass::ClientError => ExitCode::from(2),
        },
        Err(err) => {
            eprintln!("scanwerk: {err:#}");
            ExitCode::from(1)
        }
    }
}

/// Scan every image and print its response. Returns the worst response class
/// seen.
fn run(cli: Cli) -> Result<ResponseClass> {
    let config = match &cli.config {
        Some(path) => ScanConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ScanConfig::default(),
    };
    let scanner = CodeScanner::with_available_strategies(&config);
    info!(images = cli.images.len(), "Scanwerk starting");

    let mut worst = ResponseClass::Success;
    for path in &cli.images {
        let (response, class) = scan_file(&scanner, path, cli.content_type.as_deref());
        let json = if cli.pretty {
            response.to_json_pretty()?
        } else {
            response.to_json()?
        };
        println!("{json}");
        worst = worse(worst, class);

        if let Some(dir) = &cli.save_variants {
            if let Err(err) = save_variants(path, dir, &config) {
                warn!(path = %path.display(), error = %err, "Could not save variants");
            }
        }
    }

    Ok(worst)
}

/// Scan one file and wrap the outcome in a response envelope.
fn scan_file(
    scanner: &CodeScanner,
    path: &Path,
    content_type: Option<&str>,
) -> (ScanResponse, ResponseClass) {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => return ScanResponse::from_error(&ScanError::Io(err)),
    };

    let declared = content_type
        .map(str::to_string)
        .or_else(|| infer_content_type(path));
    let outcome = match declared {
        Some(mime) => scanner.scan_request(&ScanRequest::new(bytes, Some(mime))),
        None => scanner.scan_bytes(&bytes),
    };

    match outcome {
        Ok(result) => {
            info!(
                path = %path.display(),
                count = result.count(),
                strategy = ?result.strategy_used,
                "Scanned"
            );
            (ScanResponse::from_result(&result), ResponseClass::Success)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Scan rejected");
            ScanResponse::from_error(&err)
        }
    }
}

/// MIME type implied by the file extension, if it names an image format.
fn infer_content_type(path: &Path) -> Option<String> {
    image::ImageFormat::from_path(path)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}

/// Write each preprocessing variant as `<stem>-<transform>.png` into `dir`.
fn save_variants(path: &Path, dir: &Path, config: &ScanConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let canonical = ImageProcessor::open(path)?.to_canonical_rgb().into_dynamic();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".into());

    let mut written = Vec::new();
    for transform in standard_battery(config) {
        let kind = transform.kind();
        match transform.apply(&canonical) {
            Ok(variant) => {
                let out = dir.join(format!("{stem}-{kind}.png"));
                ImageProcessor::from_dynamic(variant).save(&out)?;
                written.push(out);
            }
            Err(err) => warn!(transform = %kind, error = %err, "Variant skipped"),
        }
    }
    Ok(written)
}

fn worse(a: ResponseClass, b: ResponseClass) -> ResponseClass {
    fn rank(class: ResponseClass) -> u8 {
        match class {
            ResponseClass::Success => 0,
            ResponseClass::ServerError => 1,
            ResponseClass::ClientError => 2,
        }
    }
    if rank(b) > rank(a) { b } else { a }
}
