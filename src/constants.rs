// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Namespace labels that declare enrollment intent
pub mod labels {
    /// "open" enrolls every eligible workload, "close" removes all VPAs
    pub const CONTROL: &str = "autoscaling/vpa";
    /// "Initial" (any case) selects Initial, anything else Auto
    pub const UPDATE_MODE: &str = "vpa/update-mode";

    pub const OPEN: &str = "open";
    pub const CLOSE: &str = "close";
}

/// Workload annotations honored by the reconciler
pub mod annotations {
    /// Set to "close" to exempt a single workload
    pub const CONTROL: &str = "autoscaling/vpa";
}

/// VerticalPodAutoscaler API coordinates
pub mod vpa {
    pub const GROUP: &str = "autoscaling.k8s.io";
    pub const VERSION: &str = "v1";
    pub const KIND: &str = "VerticalPodAutoscaler";
    /// Suffix appended to every VPA name this controller derives
    pub const NAME_SUFFIX: &str = "-vpa";
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// How long shutdown waits for background tasks to finish
pub const SHUTDOWN_GRACE_SECS: u64 = 30;
