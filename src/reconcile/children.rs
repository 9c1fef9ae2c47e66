//! The children snapshot the framework hands the reconciler, and the
//! desired-children list it hands back (§3 "Children snapshot", §4.10).
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret};
use serde::{Deserialize, Serialize};

/// Last-applied-configuration annotation carried by the apply-time tooling
/// the framework itself uses; never copied forward onto a new pod (§4.7.2).
pub const LAST_APPLIED_CONFIG_ANNOTATION: &str =
    "kubectl.kubernetes.io/last-applied-configuration";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChildrenSnapshot {
    #[serde(default)]
    pub pods: BTreeMap<String, Pod>,
    #[serde(default, rename = "configMaps")]
    pub config_maps: BTreeMap<String, ConfigMap>,
    #[serde(default)]
    pub secrets: BTreeMap<String, Secret>,
}

/// Children the reconciler wants to exist, keyed by name within each kind so
/// that claiming a child twice in the same invocation is an upsert rather
/// than a duplicate (§4.10).
#[derive(Debug, Clone, Default)]
pub struct DesiredChildren {
    pub pods: BTreeMap<String, Pod>,
    pub config_maps: BTreeMap<String, ConfigMap>,
    pub secrets: BTreeMap<String, Secret>,
}

impl DesiredChildren {
    /// Seed with every child currently present, so the framework does not
    /// garbage-collect objects still needed (§4.10).
    #[must_use]
    pub fn claim_existing(snapshot: &ChildrenSnapshot) -> Self {
        DesiredChildren {
            pods: snapshot.pods.clone(),
            config_maps: snapshot.config_maps.clone(),
            secrets: snapshot.secrets.clone(),
        }
    }

    pub fn upsert_pod(&mut self, name: impl Into<String>, pod: Pod) {
        self.pods.insert(name.into(), pod);
    }

    pub fn upsert_config_map(&mut self, name: impl Into<String>, cm: ConfigMap) {
        self.config_maps.insert(name.into(), cm);
    }

    pub fn upsert_secret(&mut self, name: impl Into<String>, secret: Secret) {
        self.secrets.insert(name.into(), secret);
    }

    /// Flatten into the wire shape: one JSON array mixing kinds, each
    /// object carrying its own `apiVersion`/`kind`, ordered deterministically
    /// (pods, then config maps, then secrets, each sorted by name) so that
    /// identical inputs produce byte-identical output (§8).
    #[must_use]
    pub fn into_flat_list(self) -> Vec<serde_json::Value> {
        let mut out = Vec::with_capacity(self.pods.len() + self.config_maps.len() + self.secrets.len());
        for (_, pod) in self.pods {
            out.push(serde_json::to_value(pod).expect("Pod serializes"));
        }
        for (_, cm) in self.config_maps {
            out.push(serde_json::to_value(cm).expect("ConfigMap serializes"));
        }
        for (_, secret) in self.secrets {
            out.push(serde_json::to_value(secret).expect("Secret serializes"));
        }
        out
    }
}
