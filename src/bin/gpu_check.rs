//! # GPU Diagnostic - Entry Point
//!
//! Probes the Candle CUDA runtime and prints a short report: whether
//! CUDA is usable from this build, how many devices respond, and the
//! identity of device 0. When CUDA is unavailable the report carries
//! two remediation hints instead; no device query is attempted.
//!
//! CPU-only builds of this crate report unavailable by design; compile
//! with `--features cuda` to link the CUDA backend.

use anyhow::Result;
use asr_tools::device::DeviceManager;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "asr_tools=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Probing CUDA runtime...");
    let report = DeviceManager::probe_cuda();

    if report.available {
        println!("CUDA is available. You can use GPU for acceleration.");
        println!("Number of GPUs available: {}", report.device_count);
        println!(
            "GPU name: {}",
            report.device_name.as_deref().unwrap_or("unknown")
        );
    } else {
        println!("CUDA is not available. Please check your GPU drivers and CUDA toolkit installation.");
        println!("Find your CUDA version using the command `nvcc --version`.");
        println!("Then follow https://huggingface.github.io/candle/guide/installation.html");
    }

    Ok(())
}
