//! analyze_video - serves the analyze-video endpoint
//!
//! This daemon:
//! 1. Loads service configuration (file + environment + flags)
//! 2. Selects the configured detector backend
//! 3. Serves the analysis API until Ctrl-C

use anyhow::Result;
use clap::Parser;
use std::sync::{mpsc, Arc};

use vigil::{
    api::{ApiConfig, ApiServer},
    config::AnalysisServiceConfig,
    Analyzer, AnalyzerOptions,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML when the name ends in .toml).
    #[arg(long, env = "VIGIL_CONFIG")]
    config: Option<String>,
    /// Listen address, overrides the config file.
    #[arg(long)]
    addr: Option<String>,
    /// Simulated inference latency in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Reject detections with out-of-range confidence or inverted boxes.
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(path) = &args.config {
        std::env::set_var("VIGIL_CONFIG", path);
    }
    let mut config = AnalysisServiceConfig::load()?;
    if let Some(addr) = args.addr {
        config.api_addr = addr;
    }
    if let Some(delay) = args.delay_ms {
        config.simulated_delay = std::time::Duration::from_millis(delay);
    }
    if args.strict {
        config.strict_detections = true;
    }
    config.validate()?;

    let detector = vigil::detector_from_config(&config)?;
    log::info!(
        "using detector backend {} (model {})",
        detector.name(),
        detector.model_version()
    );
    let analyzer = Arc::new(Analyzer::new(
        detector,
        AnalyzerOptions {
            simulated_delay: config.simulated_delay,
            strict_detections: config.strict_detections,
        },
    ));

    let api_config = ApiConfig {
        addr: config.api_addr.clone(),
        max_body_bytes: config.max_body_bytes,
    };
    let api_handle = ApiServer::new(api_config, analyzer).spawn()?;
    log::info!("analysis api listening on {}", api_handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("analyze_video waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}
