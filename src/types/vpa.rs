// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants;
use crate::error::VpaEnrollerError;
use crate::types::workload::WorkloadKind;
use kube::api::ObjectMeta;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The subset of the VerticalPodAutoscaler spec this controller reads and writes.
/// Everything else is carried opaquely so that any VPA in the cluster deserializes.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, schemars::JsonSchema)]
#[kube(
    group = "autoscaling.k8s.io",
    version = "v1",
    kind = "VerticalPodAutoscaler",
    plural = "verticalpodautoscalers"
)]
#[kube(namespaced)]
#[kube(status = "VerticalPodAutoscalerStatus")]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscalerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<UpdatePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_policy: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommenders: Option<Vec<serde_json::Value>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub kind: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePolicy {
    /// Kept as a string: the cluster may hold modes this controller never writes (Off, Recreate, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscalerStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<serde_json::Value>>,
}

/// Update modes this controller assigns to the VPAs it manages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateMode {
    Auto,
    Initial,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Auto => "Auto",
            UpdateMode::Initial => "Initial",
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse used for the `--default-update-mode` flag
impl FromStr for UpdateMode {
    type Err = VpaEnrollerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Auto" => Ok(UpdateMode::Auto),
            "Initial" => Ok(UpdateMode::Initial),
            other => Err(VpaEnrollerError::InvalidUpdateMode(other.to_string())),
        }
    }
}

/// Derive the VPA name for a workload: `<kind>-<name>-vpa`, lowercased
pub fn vpa_name(kind: WorkloadKind, workload_name: &str) -> String {
    format!(
        "{}-{}{}",
        kind.as_str().to_lowercase(),
        workload_name.to_lowercase(),
        constants::vpa::NAME_SUFFIX
    )
}

impl VerticalPodAutoscaler {
    /// Build the VPA this controller wants for a workload
    pub fn for_workload(
        namespace: &str,
        kind: WorkloadKind,
        workload_name: &str,
        mode: UpdateMode,
    ) -> Self {
        let name = vpa_name(kind, workload_name);
        let mut vpa = VerticalPodAutoscaler::new(
            &name,
            VerticalPodAutoscalerSpec {
                target_ref: Some(TargetRef {
                    api_version: Some(kind.api_version().to_string()),
                    kind: kind.as_str().to_string(),
                    name: workload_name.to_string(),
                }),
                update_policy: Some(UpdatePolicy {
                    update_mode: Some(mode.as_str().to_string()),
                    min_replicas: None,
                }),
                resource_policy: None,
                recommenders: None,
            },
        );
        vpa.metadata = ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        };
        vpa
    }

    pub fn target_ref(&self) -> Option<&TargetRef> {
        self.spec.target_ref.as_ref()
    }

    /// The raw update mode as stored on the object
    pub fn update_mode(&self) -> Option<&str> {
        self.spec
            .update_policy
            .as_ref()
            .and_then(|p| p.update_mode.as_deref())
    }

    pub fn has_update_mode(&self, mode: UpdateMode) -> bool {
        self.update_mode() == Some(mode.as_str())
    }
}
