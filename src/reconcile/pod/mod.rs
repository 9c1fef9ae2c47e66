//! PodComplete (§4.7): the core condition — pod materialisation,
//! progression tracking, retry with backoff, and output capture.
pub mod backoff;
pub mod env;
pub mod naming;
pub mod outputs;
pub mod template;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{ContainerStatus, Pod};

use crate::reconcile::children::{ChildrenSnapshot, DesiredChildren};
use crate::reconcile::config_source::SourceDescriptor;
use crate::reconcile::inputs::InputsMap;
use crate::reconcile::outcome::StepOutcome;
use crate::reconcile::provider_config::ProviderKeys;
use crate::reconcile::vars_from::VarsFromMap;
use crate::planner::PlanSummarizer;
use crate::resource::{ParentKind, PodStatusPhase, TfSpec, TfStatus};
use crate::config::{ProcessConfig, RetryExhaustionPolicy};

const GCS_TARBALL_CONTAINER: &str = "gcs-tarball";
const MAIN_CONTAINER: &str = "terraform";

pub struct PodInputs<'a> {
    pub namespace: &'a str,
    pub parent_name: &'a str,
    pub kind: ParentKind,
    pub effective_spec: &'a TfSpec,
    pub spec_hash: &'a str,
    pub source: &'a SourceDescriptor,
    pub provider_keys: &'a ProviderKeys,
    pub tf_inputs: &'a InputsMap,
    pub tf_vars_from: &'a VarsFromMap,
    pub plan_file: Option<&'a str>,
    pub config: &'a ProcessConfig,
    pub now: DateTime<Utc>,
}

fn find_status<'a>(statuses: &'a [ContainerStatus], name: &str) -> Option<&'a ContainerStatus> {
    statuses.iter().find(|s| s.name == name)
}

fn terminated_at(status: &ContainerStatus) -> Option<DateTime<Utc>> {
    status
        .state
        .as_ref()
        .and_then(|s| s.terminated.as_ref())
        .and_then(|t| t.finished_at.as_ref())
        .map(|t| t.0)
}

fn terminated_failed(status: &ContainerStatus) -> bool {
    status
        .state
        .as_ref()
        .and_then(|s| s.terminated.as_ref())
        .map_or(false, |t| t.exit_code != 0)
}

fn running_started_at(status: &ContainerStatus) -> Option<DateTime<Utc>> {
    status
        .state
        .as_ref()
        .and_then(|s| s.running.as_ref())
        .and_then(|r| r.started_at.as_ref())
        .map(|t| t.0)
}

fn format_duration(started: DateTime<Utc>, finished: DateTime<Utc>) -> String {
    let secs = (finished - started).num_seconds().max(0);
    format!("{}m{}s", secs / 60, secs % 60)
}

fn effective_backend(config: &ProcessConfig, spec: &TfSpec, parent_name: &str) -> (String, String) {
    let bucket = spec
        .backend_bucket
        .clone()
        .unwrap_or_else(|| config.backend_bucket.clone());
    let prefix = spec
        .backend_prefix
        .clone()
        .unwrap_or_else(|| format!("{}-{}", config.backend_prefix, parent_name));
    (bucket, prefix)
}

#[allow(clippy::too_many_lines)]
pub async fn run(
    inputs: PodInputs<'_>,
    children: &ChildrenSnapshot,
    status: &mut TfStatus,
    desired: &mut DesiredChildren,
    planner: &dyn PlanSummarizer,
) -> StepOutcome<()> {
    let PodInputs {
        namespace,
        parent_name,
        kind,
        effective_spec,
        spec_hash,
        source,
        provider_keys,
        tf_inputs,
        tf_vars_from,
        plan_file,
        config,
        now,
    } = inputs;

    let current = naming::current_pod(parent_name, kind, &children.pods);
    let next_name = naming::next_pod_name(parent_name, kind, &children.pods);

    let Some((ordinal, pod_name)) = current else {
        declare_pod(
            namespace,
            parent_name,
            kind,
            1,
            effective_spec,
            spec_hash,
            source,
            provider_keys,
            tf_inputs,
            tf_vars_from,
            plan_file,
            config,
            desired,
            BTreeMap::new(),
        );
        status.pod_name = Some(next_name.clone());
        return StepOutcome::waiting(format!("Pod/{next_name}: CREATED"), ());
    };
    // Capture before this call's bookkeeping overwrites `pod_name`/`pod_status`
    // below: this tells a fresh failure apart from a repeat observation of a
    // pod whose backoff we already started waiting out.
    let already_recorded_failure =
        status.pod_name.as_deref() == Some(pod_name.as_str()) && status.pod_status == PodStatusPhase::Failed;
    status.pod_name = Some(pod_name.clone());

    let pod = children.pods.get(&pod_name).expect("current_pod name came from children.pods");

    let init_failed = pod
        .status
        .as_ref()
        .and_then(|s| s.init_container_statuses.as_ref())
        .and_then(|statuses| find_status(statuses, GCS_TARBALL_CONTAINER))
        .map_or(false, terminated_failed);

    let phase = pod.status.as_ref().and_then(|s| s.phase.as_deref()).unwrap_or("");
    let main_status = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .and_then(|statuses| find_status(statuses, MAIN_CONTAINER));

    if init_failed || phase == "Failed" {
        return handle_failure(
            namespace,
            parent_name,
            kind,
            ordinal,
            pod,
            main_status,
            already_recorded_failure,
            effective_spec,
            spec_hash,
            source,
            provider_keys,
            tf_inputs,
            tf_vars_from,
            plan_file,
            config,
            status,
            desired,
            now,
        );
    }

    if phase == "Succeeded" {
        let pod_spec_hash = pod
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(crate::reconcile::fingerprint::SPEC_HASH_LABEL));
        if pod_spec_hash.map_or(true, |h| h != spec_hash) {
            // §3 "Spec immutability during run": the effective spec changed
            // since this ordinal last ran to completion; start a fresh one
            // rather than treating the stale pod as this invocation's result.
            declare_pod(
                namespace,
                parent_name,
                kind,
                ordinal + 1,
                effective_spec,
                spec_hash,
                source,
                provider_keys,
                tf_inputs,
                tf_vars_from,
                plan_file,
                config,
                desired,
                BTreeMap::new(),
            );
            let fresh_name = naming::build_pod_name(parent_name, kind, ordinal + 1);
            status.pod_name = Some(fresh_name.clone());
            return StepOutcome::waiting(format!("Pod/{fresh_name}: CREATED"), ());
        }
        return handle_success(kind, parent_name, namespace, pod, main_status, status, desired, planner, now).await;
    }

    // Running or pending.
    if let Some(main_status) = main_status {
        if let Some(started) = running_started_at(main_status) {
            status.started_at.get_or_insert(started);
        }
    }
    status.pod_status = PodStatusPhase::Running;
    status.retry_next_at = None;
    StepOutcome::waiting(format!("Pod/{pod_name}: RUNNING"), ())
}

#[allow(clippy::too_many_arguments)]
fn declare_pod(
    namespace: &str,
    parent_name: &str,
    kind: ParentKind,
    ordinal: u64,
    effective_spec: &TfSpec,
    spec_hash: &str,
    source: &SourceDescriptor,
    provider_keys: &ProviderKeys,
    tf_inputs: &InputsMap,
    tf_vars_from: &VarsFromMap,
    plan_file: Option<&str>,
    config: &ProcessConfig,
    desired: &mut DesiredChildren,
    carry_forward_annotations: BTreeMap<String, String>,
) {
    let (backend_bucket, backend_prefix) = effective_backend(config, effective_spec, parent_name);
    let workspace = format!("{namespace}-{parent_name}");
    let tfvars: Vec<(String, String)> = effective_spec
        .vars
        .iter()
        .map(|v| (v.name.clone(), v.value.clone()))
        .collect();
    let image = effective_spec.image.clone().unwrap_or_else(|| config.image.clone());
    let image_pull_policy = effective_spec
        .image_pull_policy
        .clone()
        .unwrap_or_else(|| config.image_pull_policy.clone());

    let pod = template::build_pod(
        config,
        &image,
        &image_pull_policy,
        namespace,
        parent_name,
        kind,
        ordinal,
        spec_hash,
        source,
        &backend_bucket,
        &backend_prefix,
        &workspace,
        &tfvars,
        tf_vars_from,
        tf_inputs,
        plan_file,
        provider_keys,
        &carry_forward_annotations,
    );
    let name = naming::build_pod_name(parent_name, kind, ordinal);
    desired.upsert_pod(name, pod);
}

#[allow(clippy::too_many_arguments)]
fn handle_failure(
    namespace: &str,
    parent_name: &str,
    kind: ParentKind,
    ordinal: u64,
    pod: &Pod,
    main_status: Option<&ContainerStatus>,
    already_recorded: bool,
    effective_spec: &TfSpec,
    spec_hash: &str,
    source: &SourceDescriptor,
    provider_keys: &ProviderKeys,
    tf_inputs: &InputsMap,
    tf_vars_from: &VarsFromMap,
    plan_file: Option<&str>,
    config: &ProcessConfig,
    status: &mut TfStatus,
    desired: &mut DesiredChildren,
    now: DateTime<Utc>,
) -> StepOutcome<()> {
    let pod_name = naming::build_pod_name(parent_name, kind, ordinal);

    let finished_at = main_status
        .and_then(terminated_at)
        .or(status.finished_at)
        .unwrap_or(now);
    if let Some(started) = status.started_at.or_else(|| {
        pod.status
            .as_ref()
            .and_then(|s| s.start_time.as_ref())
            .map(|t| t.0)
    }) {
        status.started_at = Some(started);
        status.duration = format_duration(started, finished_at);
    }

    // Backoff is keyed on how many failures preceded this one (§8 boundary
    // values: retryCount=1,scale=5 -> 15s is the wait *after* the 2nd
    // failure), so read it before incrementing the persisted counter. This
    // same Failed pod can be observed across several invocations while its
    // backoff is pending; only the first observation counts as a new failure.
    let prior_failures = if already_recorded {
        status.retry_count.saturating_sub(1)
    } else {
        status.retry_count
    };

    status.pod_status = PodStatusPhase::Failed;
    status.finished_at = Some(finished_at);
    let max_attempts = effective_spec.max_attempts.unwrap_or(config.max_attempts);
    let backoff = backoff::backoff_duration(prior_failures, config.backoff_scale);

    if !already_recorded {
        status.retry_count += 1;
    }

    if status.retry_count >= max_attempts {
        match config.retry_exhaustion_policy {
            RetryExhaustionPolicy::Reset => {
                status.retry_count = 0;
                status.retry_next_at = None;
            }
            RetryExhaustionPolicy::Terminal => {
                status.retry_next_at = None;
                return StepOutcome::waiting(
                    format!("Pod/{pod_name}: FAILED, retries exhausted"),
                    (),
                );
            }
        }
    } else if now - finished_at >= backoff {
        let annotations = pod.metadata.annotations.clone().unwrap_or_default();
        declare_pod(
            namespace,
            parent_name,
            kind,
            ordinal + 1,
            effective_spec,
            spec_hash,
            source,
            provider_keys,
            tf_inputs,
            tf_vars_from,
            plan_file,
            config,
            desired,
            annotations,
        );
        let fresh_name = naming::build_pod_name(parent_name, kind, ordinal + 1);
        status.pod_name = Some(fresh_name.clone());
        return StepOutcome::waiting(format!("Pod/{fresh_name}: CREATED"), ());
    } else {
        status.retry_next_at = Some(finished_at + backoff);
    }

    StepOutcome::waiting(format!("Pod/{pod_name}: FAILED"), ())
}

#[allow(clippy::too_many_arguments)]
async fn handle_success(
    kind: ParentKind,
    parent_name: &str,
    namespace: &str,
    pod: &Pod,
    main_status: Option<&ContainerStatus>,
    status: &mut TfStatus,
    desired: &mut DesiredChildren,
    planner: &dyn PlanSummarizer,
    now: DateTime<Utc>,
) -> StepOutcome<()> {
    let pod_name = pod.metadata.name.clone().unwrap_or_default();
    let finished_at = main_status.and_then(terminated_at).unwrap_or(now);
    if let Some(started) = status.started_at.or_else(|| {
        pod.status
            .as_ref()
            .and_then(|s| s.start_time.as_ref())
            .map(|t| t.0)
    }) {
        status.started_at = Some(started);
        status.duration = format_duration(started, finished_at);
    }
    status.pod_status = PodStatusPhase::Completed;
    status.finished_at = Some(finished_at);
    status.retry_count = 0;
    status.retry_next_at = None;

    let annotations = pod.metadata.annotations.clone().unwrap_or_default();

    match kind {
        ParentKind::Plan => match outputs::read_plan_annotation(&annotations) {
            Ok(plan_file) => match planner.summarize(&plan_file).await {
                Ok(diff) => {
                    status.plan_file = Some(plan_file);
                    status.plan_diff = Some(diff);
                    StepOutcome::ready(format!("Pod/{pod_name}: SUCCEEDED"), ())
                }
                Err(_) => StepOutcome::waiting("Internal error".to_owned(), ()),
            },
            Err(_) => StepOutcome::waiting("Internal error".to_owned(), ()),
        },
        ParentKind::Apply => match outputs::read_output_annotation(&annotations) {
            Ok(mut values) => {
                values.sort_by(|a, b| a.name.cmp(&b.name));
                let secret_name = format!("{parent_name}-tfapply-outputs");
                let data: BTreeMap<String, String> = values
                    .iter()
                    .map(|o| (o.name.clone(), o.value.clone()))
                    .collect();
                status.outputs = values;
                status.outputs_secret = Some(secret_name.clone());
                desired.upsert_secret(secret_name.clone(), template::build_outputs_secret(namespace, &secret_name, &data));
                StepOutcome::ready(format!("Pod/{pod_name}: SUCCEEDED"), ())
            }
            Err(_) => StepOutcome::waiting("Internal error".to_owned(), ()),
        },
        ParentKind::Destroy => StepOutcome::ready(format!("Pod/{pod_name}: SUCCEEDED"), ()),
    }
}
