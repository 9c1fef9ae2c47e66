//! InputsReady (§4.5): materialise `destVar -> sourceValue` from peer
//! `TerraformApply` outputs.
use std::collections::BTreeMap;

use crate::reconcile::outcome::StepOutcome;
use crate::resolver::Resolver;
use crate::resource::{ConditionType, InputsEntry, ParentKind};

pub type InputsMap = BTreeMap<String, String>;

pub async fn run(
    namespace: &str,
    entries: &[InputsEntry],
    resolver: &dyn Resolver,
) -> StepOutcome<InputsMap> {
    let mut merged = InputsMap::new();
    let mut problems = Vec::new();

    for entry in entries {
        let Some(peer) = resolver
            .get_peer(ParentKind::Apply, namespace, &entry.name)
            .await
        else {
            problems.push(format!("Waiting for tfapply/{}", entry.name));
            continue;
        };

        if peer.status.outputs.is_empty() {
            problems.push(format!("Waiting for tfapply/{} outputs", entry.name));
            continue;
        }

        if entry.wait_for_ready && !peer.status.condition_is_true(ConditionType::Ready) {
            problems.push(format!(
                "Waiting for tfapply/{} condition: Ready",
                entry.name
            ));
            continue;
        }

        for var_map in &entry.var_map {
            match peer
                .status
                .outputs
                .iter()
                .find(|o| o.name == var_map.source)
            {
                Some(output) => {
                    merged.insert(var_map.dest.clone(), output.value.clone());
                }
                None => problems.push(format!(
                    "tfapply/{} has no output named {}",
                    entry.name, var_map.source
                )),
            }
        }
    }

    if problems.is_empty() {
        StepOutcome::ready("All inputs resolved", merged)
    } else {
        StepOutcome::waiting(problems.join("; "), merged)
    }
}
