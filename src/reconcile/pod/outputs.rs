//! Execution-pod output annotations (§6 "Execution pod contract", §4.7.4):
//! `terraform-plan` (opaque string) and `terraform-output` (JSON map).
use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::resource::OutputVar;

pub const PLAN_ANNOTATION: &str = "terraform-plan";
pub const OUTPUT_ANNOTATION: &str = "terraform-output";

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("pod is missing required annotation {0}")]
    Missing(&'static str),
    #[error("annotation {annotation} is not valid JSON: {source}")]
    Parse {
        annotation: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    sensitive: bool,
    #[serde(rename = "type")]
    type_: String,
    value: String,
}

/// Read the plan-reference annotation verbatim; the reconciler never
/// interprets its contents.
pub fn read_plan_annotation(
    annotations: &BTreeMap<String, String>,
) -> Result<String, AnnotationError> {
    annotations
        .get(PLAN_ANNOTATION)
        .cloned()
        .ok_or(AnnotationError::Missing(PLAN_ANNOTATION))
}

/// Parse the output-variable annotation into a deterministic, name-sorted
/// list (§4.7.4: "emit as a slice ordered by ascending name").
pub fn read_output_annotation(
    annotations: &BTreeMap<String, String>,
) -> Result<Vec<OutputVar>, AnnotationError> {
    let raw = annotations
        .get(OUTPUT_ANNOTATION)
        .ok_or(AnnotationError::Missing(OUTPUT_ANNOTATION))?;
    let parsed: BTreeMap<String, RawOutput> =
        serde_json::from_str(raw).map_err(|source| AnnotationError::Parse {
            annotation: OUTPUT_ANNOTATION,
            source,
        })?;
    Ok(parsed
        .into_iter()
        .map(|(name, v)| OutputVar {
            name,
            type_: v.type_,
            sensitive: v.sensitive,
            value: v.value,
        })
        .collect())
}
