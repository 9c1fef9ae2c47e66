//! VarsFromReady (§4.6): inherit a peer's `tfvars` into this parent's
//! variable map. An entry naming both an apply and a plan peer is satisfied
//! by either resolving; vars from both are merged.
use std::collections::BTreeMap;

use crate::reconcile::outcome::StepOutcome;
use crate::resolver::Resolver;
use crate::resource::{ParentKind, VarsFromEntry};

pub type VarsFromMap = BTreeMap<String, String>;

async fn fetch_vars(
    namespace: &str,
    kind: ParentKind,
    name: &str,
    resolver: &dyn Resolver,
) -> Option<Vec<(String, String)>> {
    let peer = resolver.get_peer(kind, namespace, name).await?;
    let spec = peer.spec?;
    Some(
        spec.vars
            .into_iter()
            .map(|v| (v.name, v.value))
            .collect(),
    )
}

pub async fn run(
    namespace: &str,
    entries: &[VarsFromEntry],
    resolver: &dyn Resolver,
) -> StepOutcome<VarsFromMap> {
    let mut merged = VarsFromMap::new();
    let mut problems = Vec::new();

    for entry in entries {
        let apply_vars = match &entry.tfapply {
            Some(name) => fetch_vars(namespace, ParentKind::Apply, name, resolver).await,
            None => None,
        };
        let plan_vars = match &entry.tfplan {
            Some(name) => fetch_vars(namespace, ParentKind::Plan, name, resolver).await,
            None => None,
        };

        if apply_vars.is_none() && plan_vars.is_none() {
            let names: Vec<String> = [
                entry.tfapply.as_ref().map(|n| format!("tfapply/{n}")),
                entry.tfplan.as_ref().map(|n| format!("tfplan/{n}")),
            ]
            .into_iter()
            .flatten()
            .collect();
            problems.push(format!("Waiting for vars from: {}", names.join(", ")));
            continue;
        }

        for (name, value) in apply_vars.into_iter().flatten() {
            merged.insert(name, value);
        }
        for (name, value) in plan_vars.into_iter().flatten() {
            merged.insert(name, value);
        }
    }

    if problems.is_empty() {
        StepOutcome::ready("All vars inherited", merged)
    } else {
        StepOutcome::waiting(problems.join("; "), merged)
    }
}
