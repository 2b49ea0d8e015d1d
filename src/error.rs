// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VpaEnrollerError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Invalid update mode '{0}': expected Auto or Initial")]
    InvalidUpdateMode(String),

    #[error("Unknown workload kind: {0}")]
    UnknownWorkloadKind(String),

    #[error("Informer for {kind} failed to sync: {reason}")]
    InformerSync { kind: String, reason: String },

    #[error("VPA reconciler stopped before shutdown was requested")]
    ReconcilerExited,

    #[error("Failed to install signal handler: {0}")]
    SignalError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VpaEnrollerError>;
