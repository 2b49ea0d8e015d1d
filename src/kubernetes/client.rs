// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes client creation from in-cluster config or a kubeconfig file

use crate::error::{Result, VpaEnrollerError};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use std::path::Path;
use tracing::{info, instrument};

/// Create a client from `kubeconfig` when given, otherwise from the in-cluster service account
#[instrument]
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let client_config = match kubeconfig {
        Some(path) => {
            info!("Loading kubeconfig from {}", path.display());
            let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                VpaEnrollerError::KubeconfigError(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))
            })?;
            config_from_kubeconfig(&contents).await?
        }
        None => {
            info!("Using in-cluster configuration");
            kube::Config::incluster().map_err(|e| {
                VpaEnrollerError::KubeconfigError(format!("Failed to load in-cluster config: {}", e))
            })?
        }
    };

    Client::try_from(client_config)
        .map_err(|e| VpaEnrollerError::KubeconfigError(format!("Failed to create client: {}", e)))
}

/// Build a client config from kubeconfig YAML, using its current context
async fn config_from_kubeconfig(kubeconfig: &str) -> Result<kube::Config> {
    let kubeconfig_parsed: Kubeconfig = serde_yaml::from_str(kubeconfig).map_err(|e| {
        VpaEnrollerError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e))
    })?;

    kube::Config::from_custom_kubeconfig(kubeconfig_parsed, &KubeConfigOptions::default())
        .await
        .map_err(|e| VpaEnrollerError::KubeconfigError(format!("Failed to create config: {}", e)))
}
