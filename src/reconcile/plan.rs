//! PlanReady (§4.6): fetch the referenced `TerraformPlan` peer's
//! `status.planFile` for `TFPLAN` pod env derivation.
use crate::reconcile::outcome::StepOutcome;
use crate::resolver::Resolver;
use crate::resource::ParentKind;

pub async fn run(
    namespace: &str,
    plan_name: Option<&str>,
    resolver: &dyn Resolver,
) -> StepOutcome<Option<String>> {
    let Some(plan_name) = plan_name else {
        return StepOutcome::ready("No plan referenced", None);
    };

    let Some(peer) = resolver.get_peer(ParentKind::Plan, namespace, plan_name).await else {
        return StepOutcome::waiting(format!("Waiting for tfplan/{plan_name}"), None);
    };

    match peer.status.plan_file {
        Some(plan_file) if !plan_file.is_empty() => {
            StepOutcome::ready(format!("tfplan/{plan_name} ready"), Some(plan_file))
        }
        _ => StepOutcome::waiting(format!("Waiting for tfplan/{plan_name} planFile"), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::mock::MockResolver;
    use crate::resource::{Parent, TfStatus};

    fn peer_with_plan_file(name: &str, plan_file: Option<&str>) -> Parent {
        Parent {
            kind: ParentKind::Plan,
            namespace: "default".to_owned(),
            name: name.to_owned(),
            generation: None,
            spec_from: None,
            spec: None,
            status: TfStatus {
                plan_file: plan_file.map(str::to_owned),
                ..TfStatus::default()
            },
        }
    }

    #[tokio::test]
    async fn no_plan_referenced_is_vacuously_ready() {
        let resolver = MockResolver::new();
        let outcome = run("default", None, &resolver).await;
        assert!(outcome.is_true());
        assert!(outcome.value.is_none());
    }

    #[tokio::test]
    async fn ready_peer_supplies_plan_file() {
        let resolver = MockResolver::new().with_peer(peer_with_plan_file("p", Some("gs://bucket/x.tfplan")));
        let outcome = run("default", Some("p"), &resolver).await;
        assert!(outcome.is_true());
        assert_eq!(outcome.value.as_deref(), Some("gs://bucket/x.tfplan"));
    }

    #[tokio::test]
    async fn empty_plan_file_waits() {
        let resolver = MockResolver::new().with_peer(peer_with_plan_file("p", None));
        let outcome = run("default", Some("p"), &resolver).await;
        assert!(!outcome.is_true());
    }
}
