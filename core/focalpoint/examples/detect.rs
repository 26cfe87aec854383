//! Print the detected focal point of each image given on the command line.
//!
//! Usage:
//!   RUST_LOG=focalpoint=debug cargo run --example detect -- photo.jpg [more.png ...]
//!   RUSTFACE_MODEL_PATH=model/seeta_fd_frontal_v1.0.bin \
//!     cargo run --example detect --features rustface -- photo.jpg

use focalpoint::{size_variants, FocalPointDetector, ImageInput};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let detector = FocalPointDetector::new();

    for path in std::env::args().skip(1) {
        println!("=== {path} ===");

        let input = match ImageInput::from_path(&path) {
            Ok(input) => input,
            Err(e) => {
                println!("  cannot read: {e}");
                continue;
            }
        };

        match detector.process_image_file(input) {
            Ok(processed) => {
                let result = &processed.detection;
                println!(
                    "  {}x{} {:?}, method={}, confidence={:.2}, object-position: {}",
                    processed.width,
                    processed.height,
                    processed.format,
                    result.method,
                    result.confidence,
                    result.focal_point.css_position(),
                );
                if let Some(warning) = &result.warning {
                    println!("  warning: {warning}");
                }
                let variants = size_variants(&path, result.focal_point);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "detection": result,
                        "variants": variants,
                    }))
                    .unwrap()
                );
            }
            Err(e) => println!("  rejected: {e}"),
        }
        println!();
    }
}
