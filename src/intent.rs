// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolves a Namespace's labels into its VPA enrollment intent.

use crate::constants::labels;
use crate::types::UpdateMode;
use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamespaceIntent {
    /// No (or an unrecognized) control label: the namespace is not managed
    Unmanaged,
    /// Every VPA in the namespace must go
    Close,
    /// Every eligible workload gets a VPA with this mode
    Open(UpdateMode),
}

/// Pure: reads only the namespace's labels
pub fn resolve_intent(namespace: &Namespace, default_mode: UpdateMode) -> NamespaceIntent {
    let ns_labels = namespace.labels();

    match ns_labels.get(labels::CONTROL).map(String::as_str) {
        Some(labels::CLOSE) => NamespaceIntent::Close,
        Some(labels::OPEN) => {
            let mode = match ns_labels.get(labels::UPDATE_MODE) {
                None => default_mode,
                Some(value) if value.eq_ignore_ascii_case("initial") => UpdateMode::Initial,
                Some(_) => UpdateMode::Auto,
            };
            NamespaceIntent::Open(mode)
        }
        _ => NamespaceIntent::Unmanaged,
    }
}

/// The `vpa/update-mode` value if it is neither Auto nor Initial (in any case)
pub fn unrecognized_update_mode(namespace: &Namespace) -> Option<&str> {
    namespace
        .labels()
        .get(labels::UPDATE_MODE)
        .map(String::as_str)
        .filter(|v| !v.eq_ignore_ascii_case("auto") && !v.eq_ignore_ascii_case("initial"))
}
