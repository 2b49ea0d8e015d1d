// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Workload kinds the controller can enroll and the capabilities it needs from them.

use crate::constants::{annotations, labels};
use crate::error::VpaEnrollerError;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::ReplicationController;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;

/// Top-level pod controllers. Ordering follows declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
    ReplicaSet,
    Job,
    CronJob,
    ReplicationController,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 7] = [
        WorkloadKind::Deployment,
        WorkloadKind::StatefulSet,
        WorkloadKind::DaemonSet,
        WorkloadKind::ReplicaSet,
        WorkloadKind::Job,
        WorkloadKind::CronJob,
        WorkloadKind::ReplicationController,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
            WorkloadKind::ReplicaSet => "ReplicaSet",
            WorkloadKind::Job => "Job",
            WorkloadKind::CronJob => "CronJob",
            WorkloadKind::ReplicationController => "ReplicationController",
        }
    }

    /// The apiVersion written into `targetRef`. Must match the version the informer watches.
    pub fn api_version(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment
            | WorkloadKind::StatefulSet
            | WorkloadKind::DaemonSet
            | WorkloadKind::ReplicaSet => "apps/v1",
            WorkloadKind::Job | WorkloadKind::CronJob => "batch/v1",
            WorkloadKind::ReplicationController => "v1",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = VpaEnrollerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| VpaEnrollerError::UnknownWorkloadKind(s.to_string()))
    }
}

/// A typed workload object served by an informer.
pub trait Workload:
    Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Send + Sync + 'static
{
    const KIND: WorkloadKind;

    /// Only workloads nobody owns are enrolled
    fn is_top_level(&self) -> bool {
        self.owner_references().is_empty()
    }

    fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations().get(key).map(String::as_str)
    }

    /// `autoscaling/vpa=close` exempts this workload from enrollment
    fn is_opted_out(&self) -> bool {
        self.annotation(annotations::CONTROL) == Some(labels::CLOSE)
    }
}

macro_rules! impl_workload {
    ($resource:ty, $kind:ident) => {
        impl Workload for $resource {
            const KIND: WorkloadKind = WorkloadKind::$kind;
        }
    };
}

impl_workload!(Deployment, Deployment);
impl_workload!(StatefulSet, StatefulSet);
impl_workload!(DaemonSet, DaemonSet);
impl_workload!(ReplicaSet, ReplicaSet);
impl_workload!(Job, Job);
impl_workload!(CronJob, CronJob);
impl_workload!(ReplicationController, ReplicationController);

/// Run `$body` with `$ty` bound to the k8s-openapi type of a [`WorkloadKind`].
#[macro_export]
macro_rules! with_workload_type {
    ($kind:expr, $ty:ident => $body:expr) => {
        match $kind {
            $crate::types::WorkloadKind::Deployment => {
                type $ty = ::k8s_openapi::api::apps::v1::Deployment;
                $body
            }
            $crate::types::WorkloadKind::StatefulSet => {
                type $ty = ::k8s_openapi::api::apps::v1::StatefulSet;
                $body
            }
            $crate::types::WorkloadKind::DaemonSet => {
                type $ty = ::k8s_openapi::api::apps::v1::DaemonSet;
                $body
            }
            $crate::types::WorkloadKind::ReplicaSet => {
                type $ty = ::k8s_openapi::api::apps::v1::ReplicaSet;
                $body
            }
            $crate::types::WorkloadKind::Job => {
                type $ty = ::k8s_openapi::api::batch::v1::Job;
                $body
            }
            $crate::types::WorkloadKind::CronJob => {
                type $ty = ::k8s_openapi::api::batch::v1::CronJob;
                $body
            }
            $crate::types::WorkloadKind::ReplicationController => {
                type $ty = ::k8s_openapi::api::core::v1::ReplicationController;
                $body
            }
        }
    };
}
