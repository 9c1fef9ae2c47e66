// From `CustomResource`
#![allow(clippy::default_trait_access)]

use std::ops::Deref;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod kinds;
mod schemas;
mod spec;
mod status;

pub use kinds::ParentKind;
pub use spec::{
    ConfigMapSource, InputsEntry, ProviderConfigEntry, Source, SourceKind, SpecFrom, TfSpec,
    TopLevelSpec, VarEntry, VarMapEntry, VarsFromEntry,
};
pub use status::{
    Condition, ConditionStatus, ConditionType, OutputVar, PlanDiff, PodStatusPhase, SourcesStatus,
    TfStatus,
};

macro_rules! terraform_kind {
    ($kind:ident, $spec_ty:ident, $plural:literal, $short:literal) => {
        #[derive(CustomResource, Deserialize, Serialize, Debug, PartialEq, Clone, JsonSchema)]
        #[kube(
            group = "terraform-operator.io",
            version = "v1",
            kind = $kind,
            plural = $plural,
            shortname = $short,
            status = "TfStatus",
            namespaced
        )]
        #[serde(rename_all = "camelCase")]
        pub struct $spec_ty {
            #[serde(flatten)]
            pub inner: TopLevelSpec,
        }

        impl Deref for $spec_ty {
            type Target = TopLevelSpec;

            fn deref(&self) -> &TopLevelSpec {
                &self.inner
            }
        }
    };
}

terraform_kind!(TerraformPlan, TerraformPlanSpec, "terraformplans", "tfplan");
terraform_kind!(
    TerraformApply,
    TerraformApplySpec,
    "terraformapplies",
    "tfapply"
);
terraform_kind!(
    TerraformDestroy,
    TerraformDestroySpec,
    "terraformdestroys",
    "tfdestroy"
);

/// A parent resource projected into the kind-agnostic shape the reconciler
/// and the [`crate::resolver::Resolver`] trait operate on. Built from
/// whichever of the three concrete CRD kinds a sync request actually names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    pub kind: ParentKind,
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_from: Option<SpecFrom>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<TfSpec>,
    #[serde(default)]
    pub status: TfStatus,
}

impl Parent {
    #[must_use]
    pub fn namespaced_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl From<&TerraformPlan> for Parent {
    fn from(tf: &TerraformPlan) -> Self {
        from_crd(ParentKind::Plan, tf.metadata.clone(), &tf.spec, tf.status.clone())
    }
}

impl From<&TerraformApply> for Parent {
    fn from(tf: &TerraformApply) -> Self {
        from_crd(ParentKind::Apply, tf.metadata.clone(), &tf.spec, tf.status.clone())
    }
}

impl From<&TerraformDestroy> for Parent {
    fn from(tf: &TerraformDestroy) -> Self {
        from_crd(
            ParentKind::Destroy,
            tf.metadata.clone(),
            &tf.spec,
            tf.status.clone(),
        )
    }
}

fn from_crd(
    kind: ParentKind,
    metadata: kube::api::ObjectMeta,
    spec: &TopLevelSpec,
    status: Option<TfStatus>,
) -> Parent {
    Parent {
        kind,
        namespace: metadata.namespace.unwrap_or_default(),
        name: metadata.name.unwrap_or_default(),
        generation: metadata.generation,
        spec_from: spec.spec_from.clone(),
        spec: spec.spec.clone(),
        status: status.unwrap_or_default(),
    }
}
