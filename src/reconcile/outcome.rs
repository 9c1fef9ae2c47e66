//! Shared result shape for each condition body: a status/reason pair plus
//! whatever the condition resolves to, consumed by later steps (§2 "Pipeline
//! abstraction").
use crate::resource::ConditionStatus;

pub struct StepOutcome<T> {
    pub status: ConditionStatus,
    pub reason: String,
    pub value: T,
}

impl<T> StepOutcome<T> {
    pub fn ready(reason: impl Into<String>, value: T) -> Self {
        StepOutcome {
            status: ConditionStatus::True,
            reason: reason.into(),
            value,
        }
    }

    pub fn waiting(reason: impl Into<String>, value: T) -> Self {
        StepOutcome {
            status: ConditionStatus::False,
            reason: reason.into(),
            value,
        }
    }

    #[must_use]
    pub fn is_true(&self) -> bool {
        self.status.is_true()
    }
}
