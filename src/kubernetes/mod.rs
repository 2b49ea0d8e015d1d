// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes plumbing: client creation, CRD discovery, informer caches and VPA writes.

pub mod client;
pub mod crd;
pub mod informers;
pub mod vpa;

pub use client::create_client;
pub use crd::wait_for_vpa_crd;
pub use informers::{HasWorkloadStore, Informers};
pub use vpa::{VpaClient, WriteOutcome};
