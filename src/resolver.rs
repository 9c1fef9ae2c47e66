//! Read-only access to objects the reconciler needs but does not own as
//! children: provider-config secrets, config-map sources, and sibling
//! parent resources (`specFrom`, `tfinputs`, `tfvarsFrom`, peer sources).
//!
//! This is the "read-only resolver capability" §9 calls for: a trait boundary
//! so the reconciler stays a pure function of `(parent, children, resolver)`
//! and never holds a Kubernetes client itself. [`crate::k8s`] provides the
//! only production implementation; tests use an in-memory one.
use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::resource::{Parent, ParentKind};

/// A config map's string-valued `data`, as returned by the API server.
pub type ConfigMapData = BTreeMap<String, String>;

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Fetch a secret's data keys (values not needed; only presence and key
    /// names matter to `ProviderConfigReady` and pod env derivation).
    async fn get_secret_keys(&self, namespace: &str, name: &str) -> Option<Vec<String>>;

    /// Fetch a config map's string data by name.
    async fn get_config_map(&self, namespace: &str, name: &str) -> Option<ConfigMapData>;

    /// Fetch a sibling parent resource by kind tag, namespace and name.
    async fn get_peer(&self, kind: ParentKind, namespace: &str, name: &str) -> Option<Parent>;
}
