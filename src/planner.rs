//! The plan-to-JSON helper (§9, "Plan summariser"): a black box that turns an
//! opaque plan reference into `{added, changed, destroyed}`. A separate
//! specification governs its implementation; the reconciler only needs the
//! trait boundary so it can be mocked in tests.
use async_trait::async_trait;
use thiserror::Error;

use crate::resource::PlanDiff;

#[derive(Debug, Error)]
pub enum PlanSummaryError {
    #[error("failed to summarise plan {plan_ref}: {reason}")]
    Summarise { plan_ref: String, reason: String },
}

#[async_trait]
pub trait PlanSummarizer: Send + Sync {
    /// Given the opaque `terraform-plan` annotation value, return the
    /// resource-level diff summary.
    async fn summarize(&self, plan_ref: &str) -> Result<PlanDiff, PlanSummaryError>;
}

/// Production [`PlanSummarizer`]: shells out to the external plan-to-JSON
/// helper (§9 "Plan summariser"), the same way the reference controller's
/// `util.go` invokes `tfjson-service <planfile>` as a subprocess rather than
/// linking its parsing logic in-process.
#[derive(Debug, Clone)]
pub struct CliPlanSummarizer {
    command: String,
}

impl CliPlanSummarizer {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        CliPlanSummarizer {
            command: command.into(),
        }
    }
}

#[async_trait]
impl PlanSummarizer for CliPlanSummarizer {
    async fn summarize(&self, plan_ref: &str) -> Result<PlanDiff, PlanSummaryError> {
        let output = tokio::process::Command::new(&self.command)
            .arg(plan_ref)
            .output()
            .await
            .map_err(|err| PlanSummaryError::Summarise {
                plan_ref: plan_ref.to_owned(),
                reason: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(PlanSummaryError::Summarise {
                plan_ref: plan_ref.to_owned(),
                reason: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|err| PlanSummaryError::Summarise {
            plan_ref: plan_ref.to_owned(),
            reason: err.to_string(),
        })
    }
}
