//! The reconciler (§4): a pure function of `(parent, children, resolver,
//! planner, config)` that computes the next desired `(status,
//! desiredChildren)`. No Kubernetes writes happen here; the framework that
//! invokes this crate interprets the returned desired children.
pub mod children;
mod config_source;
mod fingerprint;
mod inputs;
mod outcome;
pub mod pod;
mod plan;
mod provider_config;
mod ready;
mod spec_from;
mod vars_from;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use crate::config::ProcessConfig;
use crate::planner::PlanSummarizer;
use crate::resolver::Resolver;
use crate::resource::{Condition, ConditionStatus, ConditionType, Parent, TfSpec, TfStatus};

pub use children::{ChildrenSnapshot, DesiredChildren};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to parse pod output annotation: {0}")]
    Annotation(#[from] pod::outputs::AnnotationError),
    #[error("failed to summarise plan: {0}")]
    PlanSummary(#[from] crate::planner::PlanSummaryError),
}

pub struct ReconcileOutput {
    pub status: TfStatus,
    pub desired_children: DesiredChildren,
}

/// Validate the effective spec (§4.1, §7 "Invalid spec"). Returns the
/// detail message on failure.
fn validate(parent: &Parent, spec: &TfSpec) -> Result<(), String> {
    if spec.sources.is_empty() {
        return Err("spec.sources must not be empty".to_owned());
    }
    for source in &spec.sources {
        if source.kind().is_none() {
            return Err(
                "each spec.sources entry must set exactly one of configMap, embedded, gcs, tfapply, tfplan".to_owned(),
            );
        }
    }
    for input in &spec.inputs {
        if input.var_map.is_empty() {
            return Err(format!("spec.inputs[{}].varMap must not be empty", input.name));
        }
    }
    for source in &spec.sources {
        if let Some(crate::resource::SourceKind::Peer { tfapply, tfplan }) = source.kind() {
            let self_reference = match parent.kind {
                crate::resource::ParentKind::Apply => tfapply == Some(parent.name.as_str()),
                crate::resource::ParentKind::Plan => tfplan == Some(parent.name.as_str()),
                crate::resource::ParentKind::Destroy => false,
            };
            if self_reference {
                return Err(format!(
                    "source self-reference: {}/{} cannot reference itself",
                    parent.kind.short(),
                    parent.name
                ));
            }
        }
    }
    Ok(())
}

/// Carry `lastTransitionTime` forward when the condition's `status` is
/// unchanged from the prior invocation (§4.1).
fn push_condition(
    conditions: &mut Vec<Condition>,
    prior: &BTreeMap<&str, &Condition>,
    type_: ConditionType,
    status: ConditionStatus,
    reason: impl Into<String>,
    now: DateTime<Utc>,
) {
    let mut condition = Condition::new(type_, status, reason, now);
    if let Some(previous) = prior.get(type_.as_str()) {
        if previous.status == status {
            condition.last_transition_time = previous.last_transition_time;
        }
    }
    conditions.push(condition);
}

fn synthetic_invalid_spec(detail: String, now: DateTime<Utc>) -> ReconcileOutput {
    let mut status = TfStatus::default();
    status.conditions.push(Condition::new(
        ConditionType::Ready,
        ConditionStatus::False,
        "Invalid spec",
        now,
    ));
    status.conditions[0].message = detail;
    ReconcileOutput {
        status,
        desired_children: DesiredChildren::default(),
    }
}

#[instrument(skip_all, fields(parent = %parent.namespaced_name(), kind = %parent.kind))]
pub async fn reconcile(
    parent: &Parent,
    children: &ChildrenSnapshot,
    resolver: &dyn Resolver,
    planner: &dyn PlanSummarizer,
    config: &ProcessConfig,
    now: DateTime<Utc>,
) -> ReconcileOutput {
    let prior: Vec<Condition> = parent.status.conditions.clone();
    let prior_by_type: BTreeMap<&str, &Condition> =
        prior.iter().map(|c| (c.type_.as_str(), c)).collect();

    let mut conditions = Vec::new();
    let mut desired = DesiredChildren::claim_existing(children);
    // Carry every status field forward by default (§3 "Ownership", mirroring
    // the reference controller's `makeStatus`); each condition below
    // overwrites only the fields it recomputes this cycle. `conditions`
    // itself is rebuilt from scratch and reassigned at the end.
    let mut status = parent.status.clone();
    status.conditions.clear();

    // §4.2 SpecFromReady
    let effective_spec = if parent.spec_from.is_some() {
        let outcome = spec_from::run(parent, resolver).await;
        push_condition(
            &mut conditions,
            &prior_by_type,
            ConditionType::SpecFromReady,
            outcome.status,
            outcome.reason,
            now,
        );
        if !outcome.is_true() {
            status.conditions = conditions;
            let (ready_status, ready_reason) = ready::aggregate(&status.conditions);
            push_condition(&mut status.conditions, &prior_by_type, ConditionType::Ready, ready_status, ready_reason, now);
            return ReconcileOutput { status, desired_children: desired };
        }
        outcome.value
    } else {
        parent.spec.clone()
    };

    let Some(effective_spec) = effective_spec else {
        return synthetic_invalid_spec("spec.spec or spec.specFrom must be set".to_owned(), now);
    };

    if let Err(detail) = validate(parent, &effective_spec) {
        return synthetic_invalid_spec(detail, now);
    }

    let spec_hash = fingerprint::spec_fingerprint(&effective_spec);

    // §4.3 ProviderConfigReady (elided if no provider configs declared)
    let provider_keys = if effective_spec.provider_config.is_empty() {
        provider_config::ProviderKeys::new()
    } else {
        let outcome =
            provider_config::run(&parent.namespace, &effective_spec.provider_config, resolver).await;
        push_condition(&mut conditions, &prior_by_type, ConditionType::ProviderConfigReady, outcome.status, outcome.reason, now);
        outcome.value
    };

    // §4.4 ConfigSourceReady (never elided)
    let newest_pod_name =
        pod::naming::next_pod_name(&parent.name, parent.kind, &children.pods);
    let source_outcome = config_source::run(
        &parent.namespace,
        &parent.name,
        &effective_spec.sources,
        &newest_pod_name,
        resolver,
        &mut desired,
    )
    .await;
    push_condition(&mut conditions, &prior_by_type, ConditionType::ConfigSourceReady, source_outcome.status, source_outcome.reason, now);
    status.sources.config_map_hashes = source_outcome.value.config_map_hashes.clone();
    status.sources.embedded_config_maps = source_outcome.value.embedded_config_maps.clone();
    let source = source_outcome.value;

    // §4.5 InputsReady (elided if no inputs declared)
    let tf_inputs = if effective_spec.inputs.is_empty() {
        inputs::InputsMap::new()
    } else {
        let outcome = inputs::run(&parent.namespace, &effective_spec.inputs, resolver).await;
        push_condition(&mut conditions, &prior_by_type, ConditionType::InputsReady, outcome.status, outcome.reason, now);
        outcome.value
    };

    // §4.6 VarsFromReady (elided if no varsFrom declared)
    let tf_vars_from = if effective_spec.vars_from.is_empty() {
        vars_from::VarsFromMap::new()
    } else {
        let outcome = vars_from::run(&parent.namespace, &effective_spec.vars_from, resolver).await;
        push_condition(&mut conditions, &prior_by_type, ConditionType::VarsFromReady, outcome.status, outcome.reason, now);
        outcome.value
    };

    // §4.6 PlanReady (elided if no plan referenced)
    let plan_file = if effective_spec.plan.is_some() {
        let outcome = plan::run(&parent.namespace, effective_spec.plan.as_deref(), resolver).await;
        push_condition(&mut conditions, &prior_by_type, ConditionType::PlanReady, outcome.status, outcome.reason, now);
        outcome.value
    } else {
        None
    };

    // §4.9 Condition dependency skip: PodComplete requires every *applicable*
    // prerequisite to be True.
    let prerequisites = [
        ConditionType::ProviderConfigReady,
        ConditionType::ConfigSourceReady,
        ConditionType::InputsReady,
        ConditionType::VarsFromReady,
        ConditionType::PlanReady,
    ];
    let missing: Vec<&str> = prerequisites
        .iter()
        .filter(|ct| {
            conditions
                .iter()
                .any(|c| c.type_ == ct.as_str() && !c.status.is_true())
        })
        .map(|ct| ct.as_str())
        .collect();

    if missing.is_empty() {
        let pod_inputs = pod::PodInputs {
            namespace: &parent.namespace,
            parent_name: &parent.name,
            kind: parent.kind,
            effective_spec: &effective_spec,
            spec_hash: &spec_hash,
            source: &source,
            provider_keys: &provider_keys,
            tf_inputs: &tf_inputs,
            tf_vars_from: &tf_vars_from,
            plan_file: plan_file.as_deref(),
            config,
            now,
        };
        status.plan_file = plan_file.clone();
        status.workspace = Some(format!("{}-{}", parent.namespace, parent.name));
        let pod_outcome = pod::run(pod_inputs, children, &mut status, &mut desired, planner).await;
        push_condition(&mut conditions, &prior_by_type, ConditionType::PodComplete, pod_outcome.status, pod_outcome.reason, now);
    } else {
        push_condition(
            &mut conditions,
            &prior_by_type,
            ConditionType::PodComplete,
            ConditionStatus::False,
            format!("Waiting for conditions: {}", missing.join(",")),
            now,
        );
    }

    let (ready_status, ready_reason) = ready::aggregate(&conditions);
    push_condition(&mut conditions, &prior_by_type, ConditionType::Ready, ready_status, ready_reason, now);

    status.conditions = conditions;
    ReconcileOutput {
        status,
        desired_children: desired,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, Utc};
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateRunning, ContainerStateTerminated, ContainerStatus, Pod,
        PodStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

    use super::*;
    use crate::config::ProcessConfig;
    use crate::planner::mock::MockPlanSummarizer;
    use crate::resolver::mock::MockResolver;
    use crate::resource::{
        ConfigMapSource, InputsEntry, OutputVar, ParentKind, PlanDiff, Source, SpecFrom,
        VarMapEntry,
    };

    fn minimal_spec(sources: Vec<Source>) -> TfSpec {
        TfSpec {
            image: None,
            image_pull_policy: None,
            backend_bucket: None,
            backend_prefix: None,
            provider_config: vec![],
            sources,
            plan: None,
            inputs: vec![],
            vars: vec![],
            vars_from: vec![],
            max_attempts: None,
        }
    }

    fn configmap_source(name: &str) -> Source {
        Source {
            config_map: Some(ConfigMapSource {
                name: name.to_owned(),
                trigger: false,
            }),
            ..Source::default()
        }
    }

    fn parent(kind: ParentKind, name: &str, spec: TfSpec) -> Parent {
        Parent {
            kind,
            namespace: "default".to_owned(),
            name: name.to_owned(),
            generation: None,
            spec_from: None,
            spec: Some(spec),
            status: TfStatus::default(),
        }
    }

    fn pod_named(name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some("default".to_owned()),
                ..ObjectMeta::default()
            },
            spec: None,
            status: None,
        }
    }

    fn succeeded_pod(name: &str, finished_at: DateTime<Utc>, annotations: BTreeMap<String, String>) -> Pod {
        let mut pod = pod_named(name);
        pod.metadata.annotations = Some(annotations);
        pod.status = Some(PodStatus {
            phase: Some("Succeeded".to_owned()),
            container_statuses: Some(vec![ContainerStatus {
                name: "terraform".to_owned(),
                state: Some(ContainerState {
                    terminated: Some(ContainerStateTerminated {
                        exit_code: 0,
                        finished_at: Some(Time(finished_at)),
                        ..ContainerStateTerminated::default()
                    }),
                    ..ContainerState::default()
                }),
                ..ContainerStatus::default()
            }]),
            ..PodStatus::default()
        });
        pod
    }

    fn failed_pod(name: &str, finished_at: DateTime<Utc>) -> Pod {
        let mut pod = pod_named(name);
        pod.status = Some(PodStatus {
            phase: Some("Failed".to_owned()),
            container_statuses: Some(vec![ContainerStatus {
                name: "terraform".to_owned(),
                state: Some(ContainerState {
                    terminated: Some(ContainerStateTerminated {
                        exit_code: 1,
                        finished_at: Some(Time(finished_at)),
                        ..ContainerStateTerminated::default()
                    }),
                    ..ContainerState::default()
                }),
                ..ContainerStatus::default()
            }]),
            ..PodStatus::default()
        });
        pod
    }

    fn running_pod(name: &str, started_at: DateTime<Utc>) -> Pod {
        let mut pod = pod_named(name);
        pod.status = Some(PodStatus {
            phase: Some("Running".to_owned()),
            container_statuses: Some(vec![ContainerStatus {
                name: "terraform".to_owned(),
                state: Some(ContainerState {
                    running: Some(ContainerStateRunning {
                        started_at: Some(Time(started_at)),
                    }),
                    ..ContainerState::default()
                }),
                ..ContainerStatus::default()
            }]),
            ..PodStatus::default()
        });
        pod
    }

    fn condition<'a>(status: &'a TfStatus, ty: ConditionType) -> Option<&'a Condition> {
        status.find_condition(ty)
    }

    // Scenario 1 (§8): plan on a fresh ConfigMap source with no existing pod.
    #[tokio::test]
    async fn scenario1_plan_fresh_configmap_source_creates_pod() {
        let resolver = MockResolver::new().with_config_map(
            "default",
            "cm",
            BTreeMap::from([("main.tf".to_owned(), "resource \"x\" {}".to_owned())]),
        );
        let p = parent(ParentKind::Plan, "name", minimal_spec(vec![configmap_source("cm")]));
        let children = ChildrenSnapshot::default();
        let planner = MockPlanSummarizer::default();
        let config = ProcessConfig::for_tests();

        let out = reconcile(&p, &children, &resolver, &planner, &config, Utc::now()).await;

        assert!(condition(&out.status, ConditionType::ConfigSourceReady).unwrap().status.is_true());
        assert!(condition(&out.status, ConditionType::ProviderConfigReady).is_none());
        let pod_condition = condition(&out.status, ConditionType::PodComplete).unwrap();
        assert_eq!(pod_condition.reason, "Pod/name-tfplan-1: CREATED");
        assert!(!pod_condition.status.is_true());

        let pod = out.desired_children.pods.get("name-tfplan-1").expect("pod declared");
        let main = &pod.spec.as_ref().unwrap().containers[0];
        assert_eq!(main.command.as_ref().unwrap()[0], config.plan_cmd);
        let env = main.env.as_ref().unwrap();
        assert!(env.iter().any(|e| e.name == "WORKSPACE" && e.value.as_deref() == Some("default-name")));
        assert!(env.iter().any(|e| e.name == "BACKEND_BUCKET" && e.value.as_deref() == Some(&config.backend_bucket)));
    }

    // Scenario 2 (§8): the Plan pod has succeeded; the plan summary lands in status.
    #[tokio::test]
    async fn scenario2_plan_pod_succeeded_produces_diff() {
        let resolver = MockResolver::new().with_config_map(
            "default",
            "cm",
            BTreeMap::from([("main.tf".to_owned(), "resource \"x\" {}".to_owned())]),
        );
        let p = parent(ParentKind::Plan, "name", minimal_spec(vec![configmap_source("cm")]));
        let now = Utc::now();
        let annotations = BTreeMap::from([(
            "terraform-plan".to_owned(),
            "gs://bucket/plans/x.tfplan".to_owned(),
        )]);
        let pod = succeeded_pod("name-tfplan-1", now, annotations);
        let mut children = ChildrenSnapshot::default();
        children.pods.insert("name-tfplan-1".to_owned(), pod);
        let planner = MockPlanSummarizer::default().with_diff(
            "gs://bucket/plans/x.tfplan",
            PlanDiff {
                added: 2,
                changed: 1,
                destroyed: 0,
            },
        );
        let config = ProcessConfig::for_tests();

        let out = reconcile(&p, &children, &resolver, &planner, &config, now).await;

        assert_eq!(out.status.plan_file.as_deref(), Some("gs://bucket/plans/x.tfplan"));
        assert_eq!(
            out.status.plan_diff,
            Some(PlanDiff {
                added: 2,
                changed: 1,
                destroyed: 0
            })
        );
        assert!(out.status.condition_is_true(ConditionType::PodComplete));
        assert!(out.status.condition_is_true(ConditionType::Ready));
        assert_eq!(out.status.pod_status, crate::resource::PodStatusPhase::Completed);
    }

    // Scenario 3 (§8): Apply pod failed with retries remaining; backoff gates
    // the next pod declaration on wall-clock elapsed since finishedAt.
    #[tokio::test]
    async fn scenario3_apply_failed_retries_with_backoff() {
        let resolver = MockResolver::new().with_config_map(
            "default",
            "cm",
            BTreeMap::from([("main.tf".to_owned(), "resource \"x\" {}".to_owned())]),
        );
        let mut spec = minimal_spec(vec![configmap_source("cm")]);
        spec.max_attempts = Some(4);
        let mut p = parent(ParentKind::Apply, "name", spec);
        p.status.retry_count = 1;
        let t0 = Utc::now();
        let pod = failed_pod("name-tfapply-2", t0);
        let mut children = ChildrenSnapshot::default();
        children.pods.insert("name-tfapply-2".to_owned(), pod);
        let planner = MockPlanSummarizer::default();
        let config = ProcessConfig::for_tests();
        assert!((config.backoff_scale - 5.0).abs() < f64::EPSILON);

        // 1 prior failure at scale=5.0 backs off 15s (§8 boundary values).
        let out_early = reconcile(&p, &children, &resolver, &planner, &config, t0 + Duration::seconds(10)).await;
        assert_eq!(out_early.status.retry_count, 2);
        assert!(out_early.status.retry_next_at.is_some());
        assert!(!out_early.desired_children.pods.contains_key("name-tfapply-3"));

        p.status = out_early.status;
        let out_late = reconcile(&p, &children, &resolver, &planner, &config, t0 + Duration::seconds(20)).await;
        assert!(out_late.desired_children.pods.contains_key("name-tfapply-3"));
    }

    // Scenario 4 (§8): an input sourced from a peer Apply that is not yet
    // Ready blocks PodComplete via the §4.9 prerequisite short-circuit.
    #[tokio::test]
    async fn scenario4_input_not_ready_blocks_pod() {
        let mut peer_status = TfStatus {
            outputs: vec![OutputVar {
                name: "a".to_owned(),
                type_: "string".to_owned(),
                sensitive: false,
                value: "1".to_owned(),
            }],
            ..TfStatus::default()
        };
        peer_status.conditions.push(Condition::new(
            ConditionType::Ready,
            ConditionStatus::False,
            "",
            Utc::now(),
        ));
        let peer = Parent {
            kind: ParentKind::Apply,
            namespace: "default".to_owned(),
            name: "peer".to_owned(),
            generation: None,
            spec_from: None,
            spec: None,
            status: peer_status,
        };
        let resolver = MockResolver::new()
            .with_config_map(
                "default",
                "cm",
                BTreeMap::from([("main.tf".to_owned(), "resource \"x\" {}".to_owned())]),
            )
            .with_peer(peer);

        let mut spec = minimal_spec(vec![configmap_source("cm")]);
        spec.inputs = vec![InputsEntry {
            name: "peer".to_owned(),
            var_map: vec![VarMapEntry {
                source: "a".to_owned(),
                dest: "b".to_owned(),
            }],
            wait_for_ready: true,
        }];
        let p = parent(ParentKind::Apply, "name", spec);
        let children = ChildrenSnapshot::default();
        let planner = MockPlanSummarizer::default();
        let config = ProcessConfig::for_tests();

        let out = reconcile(&p, &children, &resolver, &planner, &config, Utc::now()).await;

        let inputs_cond = condition(&out.status, ConditionType::InputsReady).unwrap();
        assert!(!inputs_cond.status.is_true());
        assert!(inputs_cond.reason.contains("condition: Ready"));
        let pod_cond = condition(&out.status, ConditionType::PodComplete).unwrap();
        assert!(!pod_cond.status.is_true());
        assert!(pod_cond.reason.contains("InputsReady"));
        assert!(out.desired_children.pods.is_empty());
    }

    // Scenario 5 (§8): an embedded source synthesizes a ConfigMap named from
    // the pod it will be mounted on, and the pod mounts it with the right
    // subPath.
    #[tokio::test]
    async fn scenario5_embedded_source_synthesis() {
        let body = "resource \"y\" {}";
        let source = Source {
            embedded: Some(body.to_owned()),
            ..Source::default()
        };
        let p = parent(ParentKind::Apply, "name", minimal_spec(vec![source]));
        let resolver = MockResolver::new();
        let children = ChildrenSnapshot::default();
        let planner = MockPlanSummarizer::default();
        let config = ProcessConfig::for_tests();

        let out = reconcile(&p, &children, &resolver, &planner, &config, Utc::now()).await;

        assert_eq!(out.status.sources.embedded_config_maps.len(), 1);
        let cm_name = &out.status.sources.embedded_config_maps[0];
        assert!(cm_name.starts_with("name-tfapply-1-"));
        let cm = out.desired_children.config_maps.get(cm_name).expect("synthesized config map declared");
        assert_eq!(cm.data.as_ref().unwrap().get("main.tf"), Some(&body.trim().to_owned()));

        let pod = out.desired_children.pods.get("name-tfapply-1").expect("pod declared");
        let mounts = pod.spec.as_ref().unwrap().containers[0].volume_mounts.as_ref().unwrap();
        let mount = mounts.iter().find(|m| m.mount_path == "/opt/terraform/main.tf").expect("main.tf mounted");
        assert_eq!(mount.sub_path.as_deref(), Some("main.tf"));
        assert_eq!(mount.name, *cm_name);
    }

    // Scenario 6 (§8): a two-hop specFrom chain is rejected.
    #[tokio::test]
    async fn scenario6_specfrom_cycle_rejected() {
        let a = Parent {
            kind: ParentKind::Apply,
            namespace: "default".to_owned(),
            name: "a".to_owned(),
            generation: None,
            spec_from: Some(SpecFrom {
                tfplan: None,
                tfapply: None,
                tfdestroy: Some("c".to_owned()),
                wait_for_ready: false,
            }),
            spec: None,
            status: TfStatus::default(),
        };
        let b = Parent {
            kind: ParentKind::Apply,
            namespace: "default".to_owned(),
            name: "b".to_owned(),
            generation: None,
            spec_from: Some(SpecFrom {
                tfplan: None,
                tfapply: Some("a".to_owned()),
                tfdestroy: None,
                wait_for_ready: false,
            }),
            spec: None,
            status: TfStatus::default(),
        };
        let resolver = MockResolver::new().with_peer(a);
        let children = ChildrenSnapshot::default();
        let planner = MockPlanSummarizer::default();
        let config = ProcessConfig::for_tests();

        let out = reconcile(&b, &children, &resolver, &planner, &config, Utc::now()).await;

        let spec_from_cond = condition(&out.status, ConditionType::SpecFromReady).unwrap();
        assert!(!spec_from_cond.status.is_true());
        assert!(spec_from_cond.reason.contains("also specFrom"));
    }

    // §8 invariant: a condition whose triggering spec field is absent is
    // elided from the conditions array entirely.
    #[tokio::test]
    async fn conditions_elided_when_spec_field_absent() {
        let resolver = MockResolver::new().with_config_map(
            "default",
            "cm",
            BTreeMap::from([("main.tf".to_owned(), "resource \"x\" {}".to_owned())]),
        );
        let p = parent(ParentKind::Apply, "name", minimal_spec(vec![configmap_source("cm")]));
        let children = ChildrenSnapshot::default();
        let planner = MockPlanSummarizer::default();
        let config = ProcessConfig::for_tests();

        let out = reconcile(&p, &children, &resolver, &planner, &config, Utc::now()).await;

        assert!(condition(&out.status, ConditionType::ProviderConfigReady).is_none());
        assert!(condition(&out.status, ConditionType::InputsReady).is_none());
        assert!(condition(&out.status, ConditionType::VarsFromReady).is_none());
        assert!(condition(&out.status, ConditionType::PlanReady).is_none());
        assert!(condition(&out.status, ConditionType::ConfigSourceReady).is_some());
        assert!(condition(&out.status, ConditionType::PodComplete).is_some());
    }

    // §8 idempotence: running back-to-back on identical inputs yields the
    // same conditions/status (modulo lastProbeTime), since the pod observed
    // hasn't changed phase between calls.
    #[tokio::test]
    async fn idempotent_on_identical_inputs() {
        let resolver = MockResolver::new().with_config_map(
            "default",
            "cm",
            BTreeMap::from([("main.tf".to_owned(), "resource \"x\" {}".to_owned())]),
        );
        let p = parent(ParentKind::Apply, "name", minimal_spec(vec![configmap_source("cm")]));
        let t0 = Utc::now();
        let pod = running_pod("name-tfapply-1", t0);
        let mut children = ChildrenSnapshot::default();
        children.pods.insert("name-tfapply-1".to_owned(), pod);
        let planner = MockPlanSummarizer::default();
        let config = ProcessConfig::for_tests();

        let first = reconcile(&p, &children, &resolver, &planner, &config, t0).await;
        let mut p2 = p.clone();
        p2.status = first.status.clone();
        let second = reconcile(&p2, &children, &resolver, &planner, &config, t0 + Duration::seconds(5)).await;

        assert_eq!(first.status.pod_status, second.status.pod_status);
        assert_eq!(first.status.started_at, second.status.started_at);
        assert_eq!(
            first.status.conditions.iter().map(|c| (c.type_.clone(), c.status)).collect::<Vec<_>>(),
            second.status.conditions.iter().map(|c| (c.type_.clone(), c.status)).collect::<Vec<_>>(),
        );
    }

    // §8 boundary: retryCount reaching maxAttempts resets to 0 under the
    // default Reset policy (§9 open question).
    #[tokio::test]
    async fn retry_exhaustion_resets_counter_under_default_policy() {
        let resolver = MockResolver::new().with_config_map(
            "default",
            "cm",
            BTreeMap::from([("main.tf".to_owned(), "resource \"x\" {}".to_owned())]),
        );
        let mut spec = minimal_spec(vec![configmap_source("cm")]);
        spec.max_attempts = Some(4);
        let mut p = parent(ParentKind::Apply, "name", spec);
        p.status.retry_count = 3;
        let t0 = Utc::now();
        let pod = failed_pod("name-tfapply-4", t0);
        let mut children = ChildrenSnapshot::default();
        children.pods.insert("name-tfapply-4".to_owned(), pod);
        let planner = MockPlanSummarizer::default();
        let config = ProcessConfig::for_tests();

        let out = reconcile(&p, &children, &resolver, &planner, &config, t0).await;
        assert_eq!(out.status.retry_count, 0);
        assert!(out.status.retry_next_at.is_none());
    }

    // §7 "Invalid spec": a Plan source that self-references is rejected at
    // validation time with a synthetic Ready=False condition.
    #[tokio::test]
    async fn invalid_spec_self_reference_is_rejected() {
        let source = Source {
            tfapply: Some("name".to_owned()),
            ..Source::default()
        };
        let p = parent(ParentKind::Apply, "name", minimal_spec(vec![source]));
        let resolver = MockResolver::new();
        let children = ChildrenSnapshot::default();
        let planner = MockPlanSummarizer::default();
        let config = ProcessConfig::for_tests();

        let out = reconcile(&p, &children, &resolver, &planner, &config, Utc::now()).await;

        assert_eq!(out.status.conditions.len(), 1);
        let only = &out.status.conditions[0];
        assert_eq!(only.type_, ConditionType::Ready.as_str());
        assert_eq!(only.reason, "Invalid spec");
        assert!(!only.status.is_true());
    }
}
