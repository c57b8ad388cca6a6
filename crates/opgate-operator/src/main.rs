//! opgate - Kueue admission check controller for Fluid data operations

mod config;
mod controller_runner;

use std::sync::Arc;

use clap::Parser;
use kube::Client;

use opgate_admission::Context;
use opgate_common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};

use crate::config::Cli;
use crate::controller_runner::build_admission_controllers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider before any TLS client is built
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!(
            "CRITICAL: Failed to install aws-lc-rs crypto provider: {:?}. \
             The controller cannot talk to the API server without TLS.",
            e
        );
        std::process::exit(1);
    }

    let cli = Cli::parse();

    init_telemetry(TelemetryConfig::default())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let settings = cli.gate_settings();
    tracing::info!(
        controller_name = %settings.controller_name,
        poll_interval_secs = settings.poll_interval.as_secs(),
        error_requeue_secs = settings.error_requeue.as_secs(),
        missing_gate_policy = %settings.missing_gate_policy,
        concurrency = cli.concurrency,
        "Starting opgate controllers"
    );

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let ctx = Arc::new(Context::from_client(client.clone(), settings));
    let controllers = build_admission_controllers(client, ctx, cli.concurrency);

    futures::future::join_all(controllers).await;

    tracing::info!("Controllers stopped, shutting down");
    shutdown_telemetry();
    Ok(())
}
