// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! VerticalPodAutoscaler CRD availability checking

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::constants::vpa;
use crate::error::Result;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Wait for the VerticalPodAutoscaler CRD to be served by the API server.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_vpa_crd(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match check_vpa_crd_exists(client).await {
            Ok(true) => {
                info!(
                    "{} CRD ({}/{}) is available",
                    vpa::KIND,
                    vpa::GROUP,
                    vpa::VERSION
                );
                return Ok(());
            }
            Ok(false) => {
                info!(
                    "{} CRD ({}/{}) not yet available, waiting {} seconds...",
                    vpa::KIND,
                    vpa::GROUP,
                    vpa::VERSION,
                    interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for {} CRD: {}, retrying in {} seconds...",
                    vpa::KIND,
                    e,
                    interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        interval = next_interval(interval);
    }
}

fn next_interval(interval: u64) -> u64 {
    (interval * 2).min(POLL_MAX_INTERVAL_SECS)
}

/// Check if the VerticalPodAutoscaler kind is served in the expected group version.
async fn check_vpa_crd_exists(client: &Client) -> Result<bool> {
    let discovery = Discovery::new(client.clone())
        .filter(&[vpa::GROUP])
        .run()
        .await?;

    let served = discovery
        .groups()
        .filter(|group| group.name() == vpa::GROUP)
        .flat_map(|group| group.versioned_resources(vpa::VERSION))
        .any(|(ar, _)| ar.kind == vpa::KIND);

    Ok(served)
}
