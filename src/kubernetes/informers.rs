// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reflector-backed local caches for Namespaces, watched workloads and VPAs.
//!
//! Every informer lists, then watches, its resource cluster-wide and keeps an
//! indexed store the reconciler reads from. Stores are read-only to everything
//! but the informer task that feeds them.

use crate::error::{Result, VpaEnrollerError};
use crate::types::{VerticalPodAutoscaler, Workload, WorkloadKind};
use crate::with_workload_type;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Namespace, ReplicationController};
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::{
    reflector::{self, ObjectRef, Store},
    watcher, WatchStreamExt,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Gives generic access to the store of one workload kind, if that kind is watched.
pub trait HasWorkloadStore<K: Workload> {
    fn workload_store(&self) -> Option<&Store<K>>;
    fn workload_store_mut(&mut self) -> &mut Option<Store<K>>;
}

/// Eventually consistent caches of every resource the reconciler reads.
#[derive(Clone)]
pub struct Informers {
    pub(crate) namespaces: Store<Namespace>,
    pub(crate) vpas: Store<VerticalPodAutoscaler>,
    pub(crate) deployments: Option<Store<Deployment>>,
    pub(crate) stateful_sets: Option<Store<StatefulSet>>,
    pub(crate) daemon_sets: Option<Store<DaemonSet>>,
    pub(crate) replica_sets: Option<Store<ReplicaSet>>,
    pub(crate) jobs: Option<Store<Job>>,
    pub(crate) cron_jobs: Option<Store<CronJob>>,
    pub(crate) replication_controllers: Option<Store<ReplicationController>>,
}

macro_rules! impl_has_workload_store {
    ($resource:ty, $field:ident) => {
        impl HasWorkloadStore<$resource> for Informers {
            fn workload_store(&self) -> Option<&Store<$resource>> {
                self.$field.as_ref()
            }

            fn workload_store_mut(&mut self) -> &mut Option<Store<$resource>> {
                &mut self.$field
            }
        }
    };
}

impl_has_workload_store!(Deployment, deployments);
impl_has_workload_store!(StatefulSet, stateful_sets);
impl_has_workload_store!(DaemonSet, daemon_sets);
impl_has_workload_store!(ReplicaSet, replica_sets);
impl_has_workload_store!(Job, jobs);
impl_has_workload_store!(CronJob, cron_jobs);
impl_has_workload_store!(ReplicationController, replication_controllers);

impl Informers {
    /// Caches for namespaces and VPAs only; workload stores are added per watched kind.
    pub(crate) fn new(namespaces: Store<Namespace>, vpas: Store<VerticalPodAutoscaler>) -> Self {
        Self {
            namespaces,
            vpas,
            deployments: None,
            stateful_sets: None,
            daemon_sets: None,
            replica_sets: None,
            jobs: None,
            cron_jobs: None,
            replication_controllers: None,
        }
    }

    /// Start one informer task per resource. The tasks stop when `token` is cancelled.
    pub fn start(
        client: &Client,
        kinds: &[WorkloadKind],
        token: &CancellationToken,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let mut handles = Vec::with_capacity(kinds.len() + 2);

        let (namespaces, handle) = spawn_informer(Api::<Namespace>::all(client.clone()), token.clone());
        handles.push(handle);
        let (vpas, handle) =
            spawn_informer(Api::<VerticalPodAutoscaler>::all(client.clone()), token.clone());
        handles.push(handle);

        let mut informers = Self::new(namespaces, vpas);
        for kind in kinds {
            let handle = with_workload_type!(kind, K => {
                let (store, handle) = spawn_informer(Api::<K>::all(client.clone()), token.clone());
                *HasWorkloadStore::<K>::workload_store_mut(&mut informers) = Some(store);
                handle
            });
            handles.push(handle);
        }

        info!(
            "Started informers for Namespace, VerticalPodAutoscaler and {:?}",
            kinds
        );
        (informers, handles)
    }

    /// Block until every informer has completed its initial list.
    /// Running the reconciler against a cold cache would delete VPAs whose targets merely
    /// have not been listed yet, so any informer missing the deadline is fatal.
    pub async fn wait_for_sync(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        wait_synced(&self.namespaces, deadline).await?;
        wait_synced(&self.vpas, deadline).await?;
        for kind in self.watched_kinds() {
            with_workload_type!(kind, K => {
                if let Some(store) = self.store_for::<K>() {
                    wait_synced(store, deadline).await?;
                }
            });
        }

        info!("All informers synced");
        Ok(())
    }

    pub fn watched_kinds(&self) -> Vec<WorkloadKind> {
        WorkloadKind::ALL
            .into_iter()
            .filter(|kind| self.is_watched(*kind))
            .collect()
    }

    pub fn is_watched(&self, kind: WorkloadKind) -> bool {
        with_workload_type!(kind, K => self.store_for::<K>().is_some())
    }

    pub fn namespaces(&self) -> Vec<Arc<Namespace>> {
        self.namespaces.state()
    }

    pub fn vpas(&self) -> Vec<Arc<VerticalPodAutoscaler>> {
        self.vpas.state()
    }

    pub fn vpa(&self, namespace: &str, name: &str) -> Option<Arc<VerticalPodAutoscaler>> {
        self.vpas.get(&ObjectRef::new(name).within(namespace))
    }

    pub fn vpas_in(&self, namespace: &str) -> Vec<Arc<VerticalPodAutoscaler>> {
        self.vpas
            .state()
            .into_iter()
            .filter(|vpa| vpa.namespace().as_deref() == Some(namespace))
            .collect()
    }

    pub fn store_for<K: Workload>(&self) -> Option<&Store<K>>
    where
        Self: HasWorkloadStore<K>,
    {
        <Self as HasWorkloadStore<K>>::workload_store(self)
    }

    /// Workloads of kind `K` in `namespace`; empty when the kind is not watched
    pub fn workloads_in<K: Workload>(&self, namespace: &str) -> Vec<Arc<K>>
    where
        Self: HasWorkloadStore<K>,
    {
        self.store_for::<K>()
            .map(|store| {
                store
                    .state()
                    .into_iter()
                    .filter(|w| w.namespace().as_deref() == Some(namespace))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `None` when the kind is not watched, so callers cannot mistake "unknown" for "gone"
    pub fn workload_exists(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Option<bool> {
        with_workload_type!(kind, K => {
            self.store_for::<K>()
                .map(|store| store.get(&ObjectRef::<K>::new(name).within(namespace)).is_some())
        })
    }
}

async fn wait_synced<K>(store: &Store<K>, deadline: Instant) -> Result<()>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Default + Eq + Hash + Clone,
{
    let kind = K::kind(&K::DynamicType::default()).to_string();

    match timeout_at(deadline, store.wait_until_ready()).await {
        Ok(Ok(())) => {
            debug!("{} informer synced", kind);
            Ok(())
        }
        Ok(Err(e)) => Err(VpaEnrollerError::InformerSync {
            kind,
            reason: e.to_string(),
        }),
        Err(_) => Err(VpaEnrollerError::InformerSync {
            kind,
            reason: "timed out waiting for initial list".to_string(),
        }),
    }
}

fn spawn_informer<K>(api: Api<K>, token: CancellationToken) -> (Store<K>, JoinHandle<()>)
where
    K: Resource + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    K::DynamicType: Default + Eq + Hash + Clone,
{
    let kind = K::kind(&K::DynamicType::default()).to_string();
    let (reader, writer) = reflector::store();
    let stream = watcher(api, watcher::Config::default())
        .default_backoff()
        .reflect(writer);

    let handle = tokio::spawn(async move {
        let mut stream = Box::pin(stream);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Stopping {} informer", kind);
                    break;
                }
                event = stream.next() => match event {
                    Some(Ok(_)) => {}
                    // Watcher errors are retried by the backoff
                    Some(Err(e)) => warn!("{} informer watch error: {}", kind, e),
                    None => {
                        warn!("{} informer stream terminated", kind);
                        break;
                    }
                },
            }
        }
    });

    (reader, handle)
}
