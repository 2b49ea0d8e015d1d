// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Periodic reconciliation of VerticalPodAutoscalers against namespace intent.

pub mod vpa;

pub use vpa::{ReconcilerConfig, TickStats, VpaReconciler};
