// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::{UpdateMode, WorkloadKind};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Controller configuration parsed from command line flags
#[derive(Parser, Debug, Clone)]
#[command(name = "vpa-enroller", version, about = "Enrolls workloads of opted-in namespaces into VerticalPodAutoscalers")]
pub struct Config {
    /// Path to a kubeconfig file. Uses the in-cluster config when omitted.
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Update mode for namespaces that opt in without a vpa/update-mode label
    #[arg(long, default_value = "Initial")]
    pub default_update_mode: UpdateMode,

    /// Seconds between two reconciliation passes
    #[arg(long, default_value_t = 60)]
    pub reconcile_interval_secs: u64,

    /// Workload kinds to watch and enroll
    #[arg(long, value_delimiter = ',', default_values = ["Deployment", "StatefulSet"])]
    pub workload_kinds: Vec<WorkloadKind>,

    /// Maximum number of namespaces reconciled in parallel
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Seconds to wait for every informer's initial sync before giving up
    #[arg(long, default_value_t = 120)]
    pub informer_sync_timeout_secs: u64,
}

impl Config {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn informer_sync_timeout(&self) -> Duration {
        Duration::from_secs(self.informer_sync_timeout_secs)
    }

    /// Watched kinds with duplicates removed, in declaration order
    pub fn watched_kinds(&self) -> Vec<WorkloadKind> {
        let mut kinds = self.workload_kinds.clone();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}
