// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking the Kubernetes API and seeding informer stores.

use crate::kubernetes::Informers;
use crate::types::VerticalPodAutoscaler;
use http::{Request, Response};
use http_body_util::BodyExt;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube_runtime::reflector::{self, store::Writer};
use kube_runtime::watcher::Event;
use kube::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request the mock API server received
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn is_write(&self) -> bool {
        self.method != "GET"
    }
}

/// A mock HTTP service that returns predefined responses based on request paths
/// and records every request it receives.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for requests with `method` matching the path (exact or prefix)
    pub fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.is_write()).collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Longest registered prefix wins so that collection and item paths can coexist
        responses
            .iter()
            .filter(|((m, p), _)| m == method && path.starts_with(p.as_str()))
            .max_by_key(|((_, p), _)| p.len())
            .map(|(_, resp)| resp.clone())
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let response = self.find_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let body = req.into_body().collect().await?.to_bytes().to_vec();
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path: path.clone(),
                body,
            });

            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("path", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Path of the VPA collection in a namespace
pub fn vpa_collection_path(namespace: &str) -> String {
    format!("/apis/autoscaling.k8s.io/v1/namespaces/{namespace}/verticalpodautoscalers")
}

/// Path of a single VPA
pub fn vpa_path(namespace: &str, name: &str) -> String {
    format!("{}/{name}", vpa_collection_path(namespace))
}

/// Create a mock VerticalPodAutoscaler JSON response
pub fn vpa_json(namespace: &str, name: &str, kind: &str, target: &str, mode: &str) -> String {
    serde_json::json!({
        "apiVersion": "autoscaling.k8s.io/v1",
        "kind": "VerticalPodAutoscaler",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "test-uid",
            "resourceVersion": "2"
        },
        "spec": {
            "targetRef": {"apiVersion": "apps/v1", "kind": kind, "name": target},
            "updatePolicy": {"updateMode": mode}
        }
    })
    .to_string()
}

/// Create an empty VerticalPodAutoscalerList JSON response
pub fn vpa_list_json() -> String {
    serde_json::json!({
        "apiVersion": "autoscaling.k8s.io/v1",
        "kind": "VerticalPodAutoscalerList",
        "metadata": {"resourceVersion": "3"},
        "items": []
    })
    .to_string()
}

pub fn success_status_json() -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Success"
    })
    .to_string()
}

fn status_json(code: u16, reason: &str, message: String) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", format!("{} \"{}\" not found", resource, name))
}

pub fn already_exists_json(resource: &str, name: &str) -> String {
    status_json(
        409,
        "AlreadyExists",
        format!("{} \"{}\" already exists", resource, name),
    )
}

pub fn conflict_json(resource: &str, name: &str) -> String {
    status_json(
        409,
        "Conflict",
        format!(
            "Operation cannot be fulfilled on {} \"{}\": the object has been modified",
            resource, name
        ),
    )
}

pub fn server_error_json() -> String {
    status_json(500, "InternalError", "etcdserver: request timed out".to_string())
}

/// Register discovery responses that serve `autoscaling.k8s.io/v1 VerticalPodAutoscaler`
pub fn with_vpa_discovery(mock: MockService) -> MockService {
    mock.on_get(
        "/api",
        200,
        r#"{"kind":"APIVersions","versions":["v1"],"serverAddressByClientCIDRs":[]}"#,
    )
    .on_get(
        "/apis",
        200,
        &serde_json::json!({
            "kind": "APIGroupList",
            "apiVersion": "v1",
            "groups": [{
                "name": "autoscaling.k8s.io",
                "versions": [{"groupVersion": "autoscaling.k8s.io/v1", "version": "v1"}],
                "preferredVersion": {"groupVersion": "autoscaling.k8s.io/v1", "version": "v1"}
            }]
        })
        .to_string(),
    )
    .on_get(
        "/apis/autoscaling.k8s.io/v1",
        200,
        &serde_json::json!({
            "kind": "APIResourceList",
            "apiVersion": "v1",
            "groupVersion": "autoscaling.k8s.io/v1",
            "resources": [{
                "name": "verticalpodautoscalers",
                "singularName": "verticalpodautoscaler",
                "namespaced": true,
                "kind": "VerticalPodAutoscaler",
                "verbs": ["create", "delete", "deletecollection", "get", "list", "patch", "update", "watch"]
            }]
        })
        .to_string(),
    )
}

/// Build a Namespace with the given labels
pub fn make_namespace(name: &str, labels: &[(&str, &str)]) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn workload_meta(namespace: &str, name: &str, annotations: &[(&str, &str)]) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        annotations: Some(
            annotations
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Default::default()
    }
}

pub fn make_deployment(namespace: &str, name: &str, annotations: &[(&str, &str)]) -> Deployment {
    Deployment {
        metadata: workload_meta(namespace, name, annotations),
        ..Default::default()
    }
}

pub fn make_stateful_set(namespace: &str, name: &str) -> StatefulSet {
    StatefulSet {
        metadata: workload_meta(namespace, name, &[]),
        ..Default::default()
    }
}

/// A Deployment owned by another controller
pub fn make_owned_deployment(namespace: &str, name: &str) -> Deployment {
    let mut deployment = make_deployment(namespace, name, &[]);
    deployment.metadata.owner_references = Some(vec![OwnerReference {
        api_version: "argoproj.io/v1alpha1".to_string(),
        kind: "Rollout".to_string(),
        name: name.to_string(),
        uid: "owner-uid".to_string(),
        controller: Some(true),
        ..Default::default()
    }]);
    deployment
}

/// A ReplicaSet controlled by the Deployment `owner`
pub fn make_owned_replica_set(namespace: &str, name: &str, owner: &str) -> ReplicaSet {
    let mut meta = workload_meta(namespace, name, &[]);
    meta.owner_references = Some(vec![OwnerReference {
        api_version: "apps/v1".to_string(),
        kind: "Deployment".to_string(),
        name: owner.to_string(),
        uid: "deployment-uid".to_string(),
        controller: Some(true),
        ..Default::default()
    }]);
    ReplicaSet {
        metadata: meta,
        ..Default::default()
    }
}

pub fn make_cron_job(namespace: &str, name: &str) -> CronJob {
    CronJob {
        metadata: workload_meta(namespace, name, &[]),
        ..Default::default()
    }
}

/// A cached VPA as the informer would hold it
pub fn make_vpa(namespace: &str, name: &str, kind: &str, target: &str, mode: &str) -> VerticalPodAutoscaler {
    serde_json::from_str(&vpa_json(namespace, name, kind, target, mode)).unwrap()
}

/// Informer stores for Namespaces, VPAs and the Deployment, StatefulSet, ReplicaSet and CronJob
/// kinds that tests feed directly
pub struct FakeInformers {
    pub informers: Informers,
    namespaces: Writer<Namespace>,
    vpas: Writer<VerticalPodAutoscaler>,
    deployments: Writer<Deployment>,
    stateful_sets: Writer<StatefulSet>,
    replica_sets: Writer<ReplicaSet>,
    cron_jobs: Writer<CronJob>,
}

impl FakeInformers {
    pub fn new() -> Self {
        let (namespace_store, namespaces) = reflector::store();
        let (vpa_store, vpas) = reflector::store();
        let (deployment_store, deployments) = reflector::store();
        let (stateful_set_store, stateful_sets) = reflector::store();
        let (replica_set_store, replica_sets) = reflector::store();
        let (cron_job_store, cron_jobs) = reflector::store();

        let mut informers = Informers::new(namespace_store, vpa_store);
        informers.deployments = Some(deployment_store);
        informers.stateful_sets = Some(stateful_set_store);
        informers.replica_sets = Some(replica_set_store);
        informers.cron_jobs = Some(cron_job_store);

        Self {
            informers,
            namespaces,
            vpas,
            deployments,
            stateful_sets,
            replica_sets,
            cron_jobs,
        }
    }

    pub fn apply_namespace(&mut self, namespace: Namespace) -> &mut Self {
        self.namespaces.apply_watcher_event(&Event::Apply(namespace));
        self
    }

    pub fn apply_vpa(&mut self, vpa: VerticalPodAutoscaler) -> &mut Self {
        self.vpas.apply_watcher_event(&Event::Apply(vpa));
        self
    }

    pub fn delete_vpa(&mut self, vpa: VerticalPodAutoscaler) -> &mut Self {
        self.vpas.apply_watcher_event(&Event::Delete(vpa));
        self
    }

    pub fn apply_deployment(&mut self, deployment: Deployment) -> &mut Self {
        self.deployments.apply_watcher_event(&Event::Apply(deployment));
        self
    }

    pub fn delete_deployment(&mut self, deployment: Deployment) -> &mut Self {
        self.deployments.apply_watcher_event(&Event::Delete(deployment));
        self
    }

    pub fn apply_stateful_set(&mut self, stateful_set: StatefulSet) -> &mut Self {
        self.stateful_sets.apply_watcher_event(&Event::Apply(stateful_set));
        self
    }

    pub fn apply_replica_set(&mut self, replica_set: ReplicaSet) -> &mut Self {
        self.replica_sets.apply_watcher_event(&Event::Apply(replica_set));
        self
    }

    pub fn apply_cron_job(&mut self, cron_job: CronJob) -> &mut Self {
        self.cron_jobs.apply_watcher_event(&Event::Apply(cron_job));
        self
    }
}

impl Default for FakeInformers {
    fn default() -> Self {
        Self::new()
    }
}
