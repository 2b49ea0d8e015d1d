// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource types: the VerticalPodAutoscaler CRD and the workload kinds it targets.

pub mod vpa;
pub mod workload;

pub use vpa::{vpa_name, TargetRef, UpdateMode, VerticalPodAutoscaler};
pub use workload::{Workload, WorkloadKind};
