//! CLI interface for piper-rt: command parsing, wiring of the real
//! collaborators, and the async entrypoint.
//!
//! All business logic (discovery, delta resolution, export orchestration,
//! publication) lives in the `piper-rt-core` crate. This module is
//! strictly CLI glue: it loads configuration, constructs the hub client
//! and exporter once, and hands everything to the core pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use piper_rt_core::config::PipelineConfig;
use piper_rt_core::export::PiperExporter;
use piper_rt_core::hub::HfHubClient;
use piper_rt_core::pipeline;

use crate::load_config::load_config;

/// CLI for piper-rt: release streaming-capable Piper voices.
#[derive(Parser)]
#[clap(
    name = "piper-rt",
    version,
    about = "Discover new Piper voice checkpoints, export them for streaming and republish them"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronise newly trained checkpoints into streaming voice releases
    Sync {
        /// Path to the YAML config file; the production defaults apply
        /// when omitted
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sync { config } => {
            let config = match config {
                Some(path) => load_config(path)?,
                None => PipelineConfig::default(),
            };
            config.trace_loaded();

            let token = std::env::var("HF_TOKEN").ok();
            if token.is_none() {
                tracing::warn!("HF_TOKEN not set; uploads to the hub will be rejected");
            }
            let client = HfHubClient::new(token);
            let exporter = PiperExporter::new(&config);

            tracing::info!(command = "sync", "Starting synchronisation process");
            match pipeline::run(&config, &client, &exporter).await {
                Ok(report) => {
                    tracing::info!(
                        command = "sync",
                        discovered = report.discovered,
                        new = report.new,
                        published = report.published.len(),
                        failed = report.failed.len(),
                        "Synchronisation complete"
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
