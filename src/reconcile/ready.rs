//! Ready aggregator (§4.8): `True` iff every other present condition is
//! `True`.
use crate::resource::{Condition, ConditionStatus, ConditionType};

#[must_use]
pub fn aggregate(conditions: &[Condition]) -> (ConditionStatus, String) {
    let not_true: Vec<&str> = conditions
        .iter()
        .filter(|c| c.type_ != ConditionType::Ready.as_str() && !c.status.is_true())
        .map(|c| c.type_.as_str())
        .collect();

    if not_true.is_empty() {
        (ConditionStatus::True, "All conditions satisfied".to_owned())
    } else {
        (
            ConditionStatus::False,
            format!("Waiting for conditions: {}", not_true.join(",")),
        )
    }
}
