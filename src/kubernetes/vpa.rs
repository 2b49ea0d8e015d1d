// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! VerticalPodAutoscaler writes with benign races reported as outcomes, not errors.

use crate::error::Result;
use crate::types::{UpdateMode, VerticalPodAutoscaler};
use kube::{
    api::{DeleteParams, ListParams, Patch, PatchParams, PostParams},
    Api, Client, ResourceExt,
};
use serde_json::json;
use tracing::instrument;

/// Result of a write the API server accepted or rejected for a benign reason
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// Create raced with another writer or a lagging cache
    AlreadyExists,
    /// Delete or patch target was already gone
    NotFound,
    /// The object changed since it was cached
    Conflict,
}

/// Typed client for the only resource this controller writes
#[derive(Clone)]
pub struct VpaClient {
    client: Client,
}

impl VpaClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<VerticalPodAutoscaler> {
        Api::namespaced(self.client.clone(), namespace)
    }

    #[instrument(skip(self, vpa), fields(vpa = %format!("{}/{}", vpa.namespace().unwrap_or_default(), vpa.name_any())))]
    pub async fn create(&self, vpa: &VerticalPodAutoscaler) -> Result<WriteOutcome> {
        let namespace = vpa.namespace().unwrap_or_default();
        classify(self.api(&namespace).create(&PostParams::default(), vpa).await)
    }

    /// Merge-patch `spec.updatePolicy.updateMode` only; every other field is left untouched.
    /// With a `resource_version` the patch fails with a conflict if the object moved on.
    #[instrument(skip(self, resource_version))]
    pub async fn set_update_mode(
        &self,
        namespace: &str,
        name: &str,
        mode: UpdateMode,
        resource_version: Option<&str>,
    ) -> Result<WriteOutcome> {
        let mut patch = json!({
            "spec": {
                "updatePolicy": {
                    "updateMode": mode.as_str()
                }
            }
        });
        if let Some(rv) = resource_version {
            patch["metadata"] = json!({ "resourceVersion": rv });
        }

        classify(
            self.api(namespace)
                .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await,
        )
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, namespace: &str, name: &str) -> Result<WriteOutcome> {
        classify(self.api(namespace).delete(name, &DeleteParams::default()).await)
    }

    /// Delete every VerticalPodAutoscaler in `namespace` in one call
    #[instrument(skip(self))]
    pub async fn delete_all(&self, namespace: &str) -> Result<WriteOutcome> {
        classify(
            self.api(namespace)
                .delete_collection(&DeleteParams::default(), &ListParams::default())
                .await,
        )
    }
}

/// Map the API response onto an outcome using status code and reason, never message text
fn classify<T>(result: kube::Result<T>) -> Result<WriteOutcome> {
    match result {
        Ok(_) => Ok(WriteOutcome::Applied),
        Err(kube::Error::Api(err)) if err.code == 404 => Ok(WriteOutcome::NotFound),
        Err(kube::Error::Api(err)) if err.code == 409 && err.reason == "AlreadyExists" => {
            Ok(WriteOutcome::AlreadyExists)
        }
        Err(kube::Error::Api(err)) if err.code == 409 => Ok(WriteOutcome::Conflict),
        Err(e) => Err(e.into()),
    }
}
