use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The name of a condition in `status.conditions`, in pipeline order.
///
/// Order here is what §3's *Condition order* invariant pins: the
/// `conditions` slice on status always lists conditions in this order,
/// skipping any whose triggering spec field is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConditionType {
    SpecFromReady,
    ProviderConfigReady,
    ConfigSourceReady,
    InputsReady,
    VarsFromReady,
    PlanReady,
    PodComplete,
    Ready,
}

impl ConditionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionType::SpecFromReady => "SpecFromReady",
            ConditionType::ProviderConfigReady => "ProviderConfigReady",
            ConditionType::ConfigSourceReady => "ConfigSourceReady",
            ConditionType::InputsReady => "InputsReady",
            ConditionType::VarsFromReady => "VarsFromReady",
            ConditionType::PlanReady => "PlanReady",
            ConditionType::PodComplete => "PodComplete",
            ConditionType::Ready => "Ready",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    #[must_use]
    pub fn from_bool(b: bool) -> Self {
        if b {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }

    #[must_use]
    pub fn is_true(self) -> bool {
        matches!(self, ConditionStatus::True)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub last_probe_time: DateTime<Utc>,
    pub last_transition_time: DateTime<Utc>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl Condition {
    #[must_use]
    pub fn new(type_: ConditionType, status: ConditionStatus, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Condition {
            type_: type_.as_str().to_owned(),
            status,
            last_probe_time: now,
            last_transition_time: now,
            reason: reason.into(),
            message: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PodStatusPhase {
    Running,
    Completed,
    Failed,
    Unknown,
}

impl Default for PodStatusPhase {
    fn default() -> Self {
        PodStatusPhase::Unknown
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourcesStatus {
    /// Content hash of each config-map source, by config-map name.
    #[serde(default)]
    pub config_map_hashes: BTreeMap<String, String>,
    /// Names of config maps synthesized from `Embedded` sources.
    #[serde(default)]
    pub embedded_config_maps: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanDiff {
    pub added: u32,
    pub changed: u32,
    pub destroyed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutputVar {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub sensitive: bool,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TfStatus {
    #[serde(default)]
    pub sources: SourcesStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
    #[serde(default)]
    pub pod_status: PodStatusPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub duration: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_diff: Option<PlanDiff>,

    #[serde(default)]
    pub outputs: Vec<OutputVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs_secret: Option<String>,

    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_next_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<String>,

    #[serde(default)]
    #[schemars(schema_with = "super::schemas::conditions")]
    pub conditions: Vec<Condition>,
}

impl TfStatus {
    #[must_use]
    pub fn find_condition(&self, type_: ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_.as_str())
    }

    #[must_use]
    pub fn condition_is_true(&self, type_: ConditionType) -> bool {
        self.find_condition(type_)
            .map_or(false, |c| c.status.is_true())
    }
}
