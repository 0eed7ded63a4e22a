//! Edge-Infer test client – entry point.
//!
//! Streams image files from a directory to a running inference server
//! and prints the ranked class scores and measured latency for each.
//! File names are matched against the class labels (e.g. a file called
//! `Sneaker_003.bin` is expected to score highest for `Sneaker`), which
//! makes eyeballing model accuracy from the output straightforward.
//!
//! # Usage
//!
//! ```text
//! infer-client --server 192.168.11.52 --image-dir ./test_data
//!
//! Options:
//!   --server <HOST>     server hostname or IP [default: 127.0.0.1]
//!   --port <PORT>       server TCP port [default: 1234]
//!   --image-dir <DIR>   directory of raw image files
//!   --loops <N>         passes over the image set [default: 1]
//! ```
//!
//! Image files are sent verbatim: they must already be in the byte
//! format the server's model expects (raw float32 samples for both the
//! float and the quantizing ingest paths).

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use infer_client::InferenceClient;

/// Class labels of the reference fashion-classification model, in output
/// index order.
const LABELS: [&str; 10] = [
    "Tshirt_top",
    "Trouser",
    "Pullover",
    "Dress",
    "Coat",
    "Sandal",
    "Shirt",
    "Sneaker",
    "Bag",
    "Ankle_boot",
];

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Edge-Infer test client.
#[derive(Debug, Parser)]
#[command(
    name = "infer-client",
    about = "Streams image files to an Edge-Infer server and prints ranked scores",
    version
)]
struct Cli {
    /// Server hostname or IP address.
    #[arg(long, default_value = "127.0.0.1", env = "EDGE_INFER_SERVER")]
    server: String,

    /// Server TCP port.
    #[arg(long, default_value_t = 1234, env = "EDGE_INFER_PORT")]
    port: u16,

    /// Directory containing raw image files to send.
    #[arg(long)]
    image_dir: PathBuf,

    /// Number of passes over the image set.
    #[arg(long, default_value_t = 1)]
    loops: u32,
}

/// One image loaded from disk, tagged with the label its file name
/// matched.
struct LabelledImage {
    label: &'static str,
    data: Vec<u8>,
}

/// Loads all images whose file name contains a known label, in sorted
/// file-name order. Files matching no label are skipped with a warning.
fn load_images(dir: &Path) -> anyhow::Result<Vec<LabelledImage>> {
    let mut names: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read image directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    names.sort();

    let mut images = Vec::new();
    for path in names {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(label) = LABELS.iter().find(|l| file_name.contains(*l)) else {
            warn!("skipping {file_name}: file name matches no known label");
            continue;
        };
        let data = std::fs::read(&path)
            .with_context(|| format!("failed to read image {}", path.display()))?;
        images.push(LabelledImage { label, data });
    }
    Ok(images)
}

/// Prints one response: label/score pairs sorted descending, then the
/// latency in milliseconds.
fn print_response(expected_label: &str, scores: &[f32], inference_time_us: i64) {
    println!("File: {expected_label}");

    // Filtered responses can be shorter than the label set; the count
    // prefix tells us exactly how many survived, but their original
    // indices are only recoverable when nothing was filtered out.
    if scores.len() == LABELS.len() {
        let mut ranked: Vec<(&str, f32)> = LABELS.iter().copied().zip(scores.iter().copied()).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (label, score) in ranked {
            println!("Label {label}: {:.4}%", score * 100.0);
        }
    } else {
        for (idx, score) in scores.iter().enumerate() {
            println!("Score[{idx}]: {:.4}%", score * 100.0);
        }
    }
    println!("Inference time: {} ms", inference_time_us as f64 / 1000.0);
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let images = load_images(&cli.image_dir)?;
    anyhow::ensure!(
        !images.is_empty(),
        "no labelled images found in {}",
        cli.image_dir.display()
    );
    info!("loaded {} images", images.len());

    let addr = format!("{}:{}", cli.server, cli.port);
    let mut client = InferenceClient::connect(addr.as_str())
        .await
        .with_context(|| format!("failed to connect to inference server at {addr}"))?;
    info!("connected to server at {addr}");

    for pass in 1..=cli.loops {
        for image in &images {
            let response = client
                .infer(&image.data)
                .await
                .with_context(|| format!("inference request for {} failed", image.label))?;
            print_response(image.label, &response.scores, response.inference_time_us);
        }
        info!("completed pass {pass}/{}", cli.loops);
    }

    Ok(())
}
