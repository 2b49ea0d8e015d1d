// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vpa_enroller::config::Config;
use vpa_enroller::kubernetes::create_client;
use vpa_enroller::supervisor::Supervisor;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, honoring RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    info!(
        "Starting VPA enroller: default_update_mode={}, workload_kinds={:?}, reconcile_interval={:?}",
        config.default_update_mode,
        config.watched_kinds(),
        config.reconcile_interval()
    );

    let client = create_client(config.kubeconfig.as_deref()).await?;
    info!("Connected to Kubernetes cluster");

    Supervisor::new(client, config).run().await?;

    info!("VPA enroller stopped");
    Ok(())
}
