//! SpecFromReady (§4.2): resolve `specFrom` into an effective spec, or pass
//! `parent.spec` through untouched.
use crate::reconcile::outcome::StepOutcome;
use crate::resolver::Resolver;
use crate::resource::{ConditionType, Parent, TfSpec};

pub async fn run(parent: &Parent, resolver: &dyn Resolver) -> StepOutcome<Option<TfSpec>> {
    let Some(spec_from) = parent.spec_from.as_ref() else {
        return StepOutcome::ready("spec set directly", parent.spec.clone());
    };

    let Some((kind, name)) = spec_from.target() else {
        return StepOutcome::waiting("specFrom names no target", None);
    };

    let Some(peer) = resolver.get_peer(kind, &parent.namespace, name).await else {
        return StepOutcome::waiting(format!("Waiting for spec from: {}/{}", kind.short(), name), None);
    };

    if peer.spec_from.is_some() {
        return StepOutcome::waiting(
            format!(
                "{}/{} is also specFrom: cannot reference another specFrom resource.",
                kind.short(),
                name
            ),
            None,
        );
    }

    if spec_from.wait_for_ready && !peer.status.condition_is_true(ConditionType::Ready) {
        return StepOutcome::waiting(
            format!("Waiting for {}/{} condition: Ready", kind.short(), name),
            None,
        );
    }

    StepOutcome::ready(
        format!("Inherited spec from {}/{}", kind.short(), name),
        peer.spec,
    )
}
