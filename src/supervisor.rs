// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Process lifecycle: wires the informers and the reconciler together and
//! unwinds them on SIGINT/SIGTERM.

use crate::config::Config;
use crate::constants::SHUTDOWN_GRACE_SECS;
use crate::error::{Result, VpaEnrollerError};
use crate::kubernetes::{wait_for_vpa_crd, Informers, VpaClient};
use crate::reconcilers::{ReconcilerConfig, VpaReconciler};
use kube::Client;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Supervisor {
    client: Client,
    config: Config,
    token: CancellationToken,
}

impl Supervisor {
    pub fn new(client: Client, config: Config) -> Self {
        Self {
            client,
            config,
            token: CancellationToken::new(),
        }
    }

    /// Run until SIGINT or SIGTERM
    pub async fn run(self) -> Result<()> {
        let shutdown = shutdown_signal()?;
        self.run_until(shutdown).await
    }

    /// Run until `shutdown` completes. Returns an error if startup fails or the
    /// reconciler stops on its own.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);

        info!("Waiting for VerticalPodAutoscaler CRD to become available...");
        tokio::select! {
            result = wait_for_vpa_crd(&self.client) => result?,
            _ = &mut shutdown => {
                info!("Shutdown requested before the CRD became available");
                return Ok(());
            }
        }

        let kinds = self.config.watched_kinds();
        let (informers, mut tasks) = Informers::start(&self.client, &kinds, &self.token);

        info!("Waiting for informer caches to sync...");
        let synced = tokio::select! {
            result = informers.wait_for_sync(self.config.informer_sync_timeout()) => result,
            _ = &mut shutdown => {
                info!("Shutdown requested during informer sync");
                self.stop(tasks).await;
                return Ok(());
            }
        };
        if let Err(e) = synced {
            error!("Informer sync failed: {}", e);
            self.stop(tasks).await;
            return Err(e);
        }

        let reconciler = VpaReconciler::new(
            informers,
            VpaClient::new(self.client.clone()),
            self.reconciler_config(),
        );
        let mut reconciler_task = tokio::spawn(reconciler.run(self.token.clone()));

        let reconciler_exited = tokio::select! {
            _ = &mut shutdown => false,
            joined = &mut reconciler_task => {
                if let Err(e) = joined {
                    error!("VPA reconciler task failed: {}", e);
                }
                true
            }
        };

        if reconciler_exited {
            error!("VPA reconciler stopped unexpectedly, shutting down");
            self.stop(tasks).await;
            return Err(VpaEnrollerError::ReconcilerExited);
        }

        info!("Shutdown signal received, stopping reconciler and informers");
        tasks.push(reconciler_task);
        self.stop(tasks).await;
        Ok(())
    }

    fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            interval: self.config.reconcile_interval(),
            default_update_mode: self.config.default_update_mode,
            concurrency: usize::from(self.config.concurrency),
        }
    }

    /// Cancel every task and give them SHUTDOWN_GRACE_SECS to finish
    async fn stop(&self, tasks: Vec<JoinHandle<()>>) {
        self.token.cancel();

        let grace = Duration::from_secs(SHUTDOWN_GRACE_SECS);
        if tokio::time::timeout(grace, futures::future::join_all(tasks))
            .await
            .is_err()
        {
            warn!(
                "Background tasks did not stop within {} seconds",
                SHUTDOWN_GRACE_SECS
            );
        } else {
            info!("All background tasks stopped");
        }
    }
}

#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await
            }
        }
    })
}
