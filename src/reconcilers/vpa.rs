// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! VPA reconciler - periodically drives the VPA population toward namespace intent.
//!
//! Each tick runs two phases. The namespace fan-out enrolls workloads of `open`
//! namespaces and empties `close` namespaces. The orphan sweep then deletes VPAs in
//! `open` namespaces whose target workload is gone from the cache. All reads come
//! from the informer caches; the API server only sees writes.

use crate::intent::{resolve_intent, unrecognized_update_mode, NamespaceIntent};
use crate::kubernetes::informers::HasWorkloadStore;
use crate::kubernetes::{Informers, VpaClient, WriteOutcome};
use crate::types::{vpa_name, UpdateMode, VerticalPodAutoscaler, Workload, WorkloadKind};
use crate::with_workload_type;
use futures::{stream, StreamExt};
use kube::ResourceExt;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub interval: Duration,
    pub default_update_mode: UpdateMode,
    /// Namespaces reconciled in parallel
    pub concurrency: usize,
}

/// Writes issued during one tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub collections_deleted: usize,
    pub failed: usize,
}

impl TickStats {
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted + self.collections_deleted
    }
}

impl AddAssign for TickStats {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.collections_deleted += other.collections_deleted;
        self.failed += other.failed;
    }
}

pub struct VpaReconciler {
    informers: Informers,
    vpas: VpaClient,
    config: ReconcilerConfig,
    /// Namespace -> (name, uid) of the VPAs cached when its last bulk delete went out
    closed: Mutex<HashMap<String, BTreeSet<(String, String)>>>,
}

impl VpaReconciler {
    pub fn new(informers: Informers, vpas: VpaClient, config: ReconcilerConfig) -> Self {
        Self {
            informers,
            vpas,
            config,
            closed: Mutex::new(HashMap::new()),
        }
    }

    /// Tick until `token` is cancelled. A slow tick delays the next one; missed ticks are not replayed.
    pub async fn run(self, token: CancellationToken) {
        let reconciler = Arc::new(self);
        reconciler.run_until_cancelled(token).await;
    }

    async fn run_until_cancelled(self: Arc<Self>, token: CancellationToken) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "VPA reconciler started: interval={:?}, default_update_mode={}, watched_kinds={:?}",
            self.config.interval,
            self.config.default_update_mode,
            self.informers.watched_kinds()
        );

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let stats = self.tick(&token).await;
            if stats.writes() > 0 || stats.failed > 0 {
                info!("Reconciliation pass finished: {:?}", stats);
            } else {
                debug!("Reconciliation pass finished without changes");
            }
        }

        info!("VPA reconciler stopped");
    }

    /// One full pass: namespace fan-out, then the orphan sweep
    pub async fn tick(self: &Arc<Self>, token: &CancellationToken) -> TickStats {
        let intents = self.resolve_intents().await;
        let open: HashSet<String> = intents
            .iter()
            .filter(|(_, intent)| matches!(intent, NamespaceIntent::Open(_)))
            .map(|(name, _)| name.clone())
            .collect();

        let mut stats = self.reconcile_namespaces(intents, token).await;
        if token.is_cancelled() {
            return stats;
        }

        stats += self.sweep_orphans(&open, token).await;

        stats
    }

    async fn resolve_intents(&self) -> Vec<(String, NamespaceIntent)> {
        let intents: Vec<(String, NamespaceIntent)> = self
            .informers
            .namespaces()
            .iter()
            .map(|ns| {
                let intent = resolve_intent(ns, self.config.default_update_mode);
                if let (NamespaceIntent::Open(mode), Some(value)) = (intent, unrecognized_update_mode(ns)) {
                    warn!(
                        "Namespace {} has unrecognized vpa/update-mode '{}', using {}",
                        ns.name_any(),
                        value,
                        mode
                    );
                }
                (ns.name_any(), intent)
            })
            .collect();

        // Forget bulk deletes for namespaces that are no longer closed
        let mut closed = self.closed.lock().await;
        closed.retain(|name, _| {
            intents
                .iter()
                .any(|(ns, intent)| ns == name && *intent == NamespaceIntent::Close)
        });

        intents
    }

    /// Namespace futures own their inputs and a handle to the reconciler
    async fn reconcile_namespaces(
        self: &Arc<Self>,
        intents: Vec<(String, NamespaceIntent)>,
        token: &CancellationToken,
    ) -> TickStats {
        let concurrency = self.config.concurrency.max(1);
        let reconciler = Arc::clone(self);
        let token = token.clone();

        stream::iter(intents)
            .map(move |(namespace, intent)| {
                let reconciler = Arc::clone(&reconciler);
                let token = token.clone();
                async move { reconciler.reconcile_namespace(namespace, intent, token).await }
            })
            .buffer_unordered(concurrency)
            .fold(TickStats::default(), |mut acc, stats| async move {
                acc += stats;
                acc
            })
            .await
    }

    async fn reconcile_namespace(
        &self,
        namespace: String,
        intent: NamespaceIntent,
        token: CancellationToken,
    ) -> TickStats {
        if token.is_cancelled() {
            return TickStats::default();
        }
        match intent {
            NamespaceIntent::Unmanaged => TickStats::default(),
            NamespaceIntent::Close => self.close(&namespace).await,
            NamespaceIntent::Open(mode) => self.open(&namespace, mode).await,
        }
    }

    /// Give every eligible workload in `namespace` a VPA with `mode`
    #[instrument(skip(self))]
    async fn open(&self, namespace: &str, mode: UpdateMode) -> TickStats {
        let mut stats = TickStats::default();
        for kind in self.informers.watched_kinds() {
            with_workload_type!(kind, K => self.enroll::<K>(namespace, mode, &mut stats).await);
        }
        stats
    }

    async fn enroll<K: Workload>(&self, namespace: &str, mode: UpdateMode, stats: &mut TickStats)
    where
        Informers: HasWorkloadStore<K>,
    {
        for workload in self.informers.workloads_in::<K>(namespace) {
            if !workload.is_top_level() {
                continue;
            }

            let workload_name = workload.name_any();
            let name = vpa_name(K::KIND, &workload_name);

            if workload.is_opted_out() {
                if self.informers.vpa(namespace, &name).is_some() {
                    info!(
                        "{} {}/{} opted out, deleting VPA {}",
                        K::KIND,
                        namespace,
                        workload_name,
                        name
                    );
                    self.delete(namespace, &name, stats).await;
                }
                continue;
            }

            match self.informers.vpa(namespace, &name) {
                None => self.create(namespace, K::KIND, &workload_name, mode, stats).await,
                Some(vpa) if !vpa.has_update_mode(mode) => self.update_mode(&vpa, mode, stats).await,
                Some(_) => {}
            }
        }
    }

    /// Remove every VPA in `namespace` with a single collection delete
    #[instrument(skip(self))]
    async fn close(&self, namespace: &str) -> TickStats {
        let mut stats = TickStats::default();
        // A VPA recreated under the same name gets a new uid and counts as new
        let cached: BTreeSet<(String, String)> = self
            .informers
            .vpas_in(namespace)
            .iter()
            .map(|vpa| (vpa.name_any(), vpa.uid().unwrap_or_default()))
            .collect();

        {
            let mut closed = self.closed.lock().await;
            if cached.is_empty() {
                closed.insert(namespace.to_string(), BTreeSet::new());
                return stats;
            }
            // Objects already covered by the last bulk delete are deletions the cache has not seen yet
            if closed
                .get(namespace)
                .is_some_and(|swept| cached.is_subset(swept))
            {
                debug!("Bulk delete already issued, waiting for cache to catch up");
                return stats;
            }
        }

        info!(
            "Namespace {} is closed, deleting all {} VPAs",
            namespace,
            cached.len()
        );
        match self.vpas.delete_all(namespace).await {
            Ok(WriteOutcome::Applied) | Ok(WriteOutcome::NotFound) => {
                stats.collections_deleted += 1;
                self.closed
                    .lock()
                    .await
                    .insert(namespace.to_string(), cached);
            }
            Ok(outcome) => {
                warn!("Unexpected outcome deleting VPAs in {}: {:?}", namespace, outcome);
                stats.failed += 1;
            }
            Err(e) => {
                warn!("Failed to delete VPAs in {}: {}", namespace, e);
                stats.failed += 1;
            }
        }

        stats
    }

    /// Delete VPAs in `open` namespaces whose target is a watched kind that no longer exists
    async fn sweep_orphans(&self, open: &HashSet<String>, token: &CancellationToken) -> TickStats {
        let mut stats = TickStats::default();

        for vpa in self.informers.vpas() {
            if token.is_cancelled() {
                break;
            }

            let Some(namespace) = vpa.namespace() else {
                continue;
            };
            if !open.contains(&namespace) {
                continue;
            }
            let Some(target) = vpa.target_ref() else {
                continue;
            };
            let Ok(kind) = target.kind.parse::<WorkloadKind>() else {
                continue;
            };

            // None: kind not watched, leave the VPA alone
            if self.informers.workload_exists(kind, &namespace, &target.name) == Some(false) {
                info!(
                    "VPA {}/{} targets missing {} {}, deleting",
                    namespace,
                    vpa.name_any(),
                    kind,
                    target.name
                );
                self.delete(&namespace, &vpa.name_any(), &mut stats).await;
            }
        }

        stats
    }

    async fn create(
        &self,
        namespace: &str,
        kind: WorkloadKind,
        workload_name: &str,
        mode: UpdateMode,
        stats: &mut TickStats,
    ) {
        let vpa = VerticalPodAutoscaler::for_workload(namespace, kind, workload_name, mode);
        let name = vpa.name_any();

        match self.vpas.create(&vpa).await {
            Ok(WriteOutcome::Applied) => {
                info!(
                    "Created VPA {}/{} for {} {} with mode {}",
                    namespace, name, kind, workload_name, mode
                );
                stats.created += 1;
            }
            Ok(WriteOutcome::AlreadyExists) => {
                debug!("VPA {}/{} already exists", namespace, name);
            }
            Ok(outcome) => {
                warn!("Unexpected outcome creating VPA {}/{}: {:?}", namespace, name, outcome);
                stats.failed += 1;
            }
            Err(e) => {
                warn!("Failed to create VPA {}/{}: {}", namespace, name, e);
                stats.failed += 1;
            }
        }
    }

    async fn update_mode(&self, vpa: &VerticalPodAutoscaler, mode: UpdateMode, stats: &mut TickStats) {
        let namespace = vpa.namespace().unwrap_or_default();
        let name = vpa.name_any();
        let resource_version = vpa.resource_version();

        match self
            .vpas
            .set_update_mode(&namespace, &name, mode, resource_version.as_deref())
            .await
        {
            Ok(WriteOutcome::Applied) => {
                info!(
                    "Updated VPA {}/{} mode {} -> {}",
                    namespace,
                    name,
                    vpa.update_mode().unwrap_or("<unset>"),
                    mode
                );
                stats.updated += 1;
            }
            Ok(WriteOutcome::NotFound) => {
                debug!("VPA {}/{} disappeared before its mode could be updated", namespace, name);
            }
            Ok(WriteOutcome::Conflict) => {
                warn!(
                    "VPA {}/{} was modified since it was cached, retrying next pass",
                    namespace, name
                );
                stats.failed += 1;
            }
            Ok(WriteOutcome::AlreadyExists) => {
                warn!("Unexpected AlreadyExists updating VPA {}/{}", namespace, name);
                stats.failed += 1;
            }
            Err(e) => {
                warn!("Failed to update VPA {}/{}: {}", namespace, name, e);
                stats.failed += 1;
            }
        }
    }

    async fn delete(&self, namespace: &str, name: &str, stats: &mut TickStats) {
        match self.vpas.delete(namespace, name).await {
            Ok(WriteOutcome::Applied) => {
                info!("Deleted VPA {}/{}", namespace, name);
                stats.deleted += 1;
            }
            Ok(WriteOutcome::NotFound) => {
                debug!("VPA {}/{} already deleted", namespace, name);
            }
            Ok(outcome) => {
                warn!("Unexpected outcome deleting VPA {}/{}: {:?}", namespace, name, outcome);
                stats.failed += 1;
            }
            Err(e) => {
                warn!("Failed to delete VPA {}/{}: {}", namespace, name, e);
                stats.failed += 1;
            }
        }
    }
}
