use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ParentKind;

/// `spec.specFrom`: adopt another parent's `spec` wholesale instead of carrying one
/// directly. Exactly one of `tfplan`/`tfapply`/`tfdestroy` is set.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfplan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfapply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfdestroy: Option<String>,
    #[serde(default)]
    pub wait_for_ready: bool,
}

impl SpecFrom {
    /// The single `(kind, name)` this `specFrom` points at, if well formed.
    #[must_use]
    pub fn target(&self) -> Option<(ParentKind, &str)> {
        if let Some(name) = self.tfplan.as_deref().filter(|n| !n.is_empty()) {
            Some((ParentKind::Plan, name))
        } else if let Some(name) = self.tfapply.as_deref().filter(|n| !n.is_empty()) {
            Some((ParentKind::Apply, name))
        } else {
            self.tfdestroy
                .as_deref()
                .filter(|n| !n.is_empty())
                .map(|name| (ParentKind::Destroy, name))
        }
    }
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigEntry {
    /// Logical name of the provider, e.g. `google`.
    pub name: String,
    /// Name of the secret in the parent's namespace carrying this provider's credentials.
    pub secret_name: String,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapSource {
    pub name: String,
    #[serde(default)]
    pub trigger: bool,
}

/// One entry of `spec.sources`. Exactly one field is expected to be set.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs: Option<String>,
    /// Pull a peer `TerraformApply`'s resolved sources transitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfapply: Option<String>,
    /// Pull a peer `TerraformPlan`'s resolved sources transitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfplan: Option<String>,
}

/// The resolved variant of a [`Source`], used once validation has rejected
/// malformed entries (zero or multiple fields set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind<'a> {
    ConfigMap(&'a ConfigMapSource),
    Embedded(&'a str),
    Gcs(&'a str),
    /// Either a peer apply or a peer plan source; apply wins when both are set.
    Peer {
        tfapply: Option<&'a str>,
        tfplan: Option<&'a str>,
    },
}

impl Source {
    /// Classify this entry, or `None` if it names zero or more than one variant.
    #[must_use]
    pub fn kind(&self) -> Option<SourceKind<'_>> {
        let set = [
            self.config_map.is_some(),
            self.embedded.is_some(),
            self.gcs.is_some(),
            self.tfapply.is_some() || self.tfplan.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if set != 1 {
            return None;
        }
        if let Some(cm) = &self.config_map {
            Some(SourceKind::ConfigMap(cm))
        } else if let Some(body) = &self.embedded {
            Some(SourceKind::Embedded(body))
        } else if let Some(url) = &self.gcs {
            Some(SourceKind::Gcs(url))
        } else {
            Some(SourceKind::Peer {
                tfapply: self.tfapply.as_deref(),
                tfplan: self.tfplan.as_deref(),
            })
        }
    }
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VarMapEntry {
    /// Name of the output variable on the peer `TerraformApply`.
    pub source: String,
    /// Name of the variable to materialise for this parent's pod.
    pub dest: String,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InputsEntry {
    /// Name of the peer `TerraformApply` to pull outputs from.
    pub name: String,
    pub var_map: Vec<VarMapEntry>,
    #[serde(default)]
    pub wait_for_ready: bool,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VarEntry {
    pub name: String,
    pub value: String,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VarsFromEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfapply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfplan: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TfSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_prefix: Option<String>,

    #[serde(default)]
    pub provider_config: Vec<ProviderConfigEntry>,

    /// Non-empty; validated in `reconcile::validate`.
    pub sources: Vec<Source>,

    /// Name of a peer `TerraformPlan` whose `status.planFile` feeds `TFPLAN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    #[serde(default)]
    pub inputs: Vec<InputsEntry>,

    #[serde(default)]
    pub vars: Vec<VarEntry>,

    #[serde(default)]
    pub vars_from: Vec<VarsFromEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopLevelSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_from: Option<SpecFrom>,
    #[serde(default, flatten)]
    pub spec: Option<TfSpec>,
}
