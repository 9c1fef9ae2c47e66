//! Pod template derivation (§4.7.2).
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, EmptyDirVolumeSource, EnvVar, Pod, PodSpec,
    Secret, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::env;
use super::naming;
use crate::reconcile::children::LAST_APPLIED_CONFIG_ANNOTATION;
use crate::reconcile::config_source::SourceDescriptor;
use crate::reconcile::fingerprint::SPEC_HASH_LABEL;
use crate::resource::ParentKind;
use crate::ProcessConfig;

/// Build the synthesized `ConfigMap` child for an `Embedded` source (§4.4,
/// §6 "Synthesized config map"): `data["main.tf"] = trim(body)`.
#[must_use]
pub fn build_embedded_config_map(
    namespace: &str,
    name: &str,
    data: &BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(namespace.to_owned()),
            ..ObjectMeta::default()
        },
        data: Some(data.clone()),
        ..ConfigMap::default()
    }
}

/// Build the `{parent}-tfapply-outputs` Secret child (§4.7.4).
#[must_use]
pub fn build_outputs_secret(
    namespace: &str,
    name: &str,
    data: &BTreeMap<String, String>,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(namespace.to_owned()),
            ..ObjectMeta::default()
        },
        string_data: Some(data.clone()),
        ..Secret::default()
    }
}

pub const STATE_VOLUME: &str = "state";
const TERRAFORM_PARENT_LABEL: &str = "terraform-parent";
const CONFIG_MAP_MODE: i32 = 438; // 0666

#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn build_pod(
    config: &ProcessConfig,
    image: &str,
    image_pull_policy: &str,
    namespace: &str,
    parent_name: &str,
    kind: ParentKind,
    ordinal: u64,
    spec_hash: &str,
    source: &SourceDescriptor,
    backend_bucket: &str,
    backend_prefix: &str,
    workspace: &str,
    tfvars: &[(String, String)],
    vars_from: &BTreeMap<String, String>,
    inputs: &BTreeMap<String, String>,
    plan_file: Option<&str>,
    provider_keys: &BTreeMap<String, Vec<String>>,
    carry_forward_annotations: &BTreeMap<String, String>,
) -> Pod {
    let name = naming::build_pod_name(parent_name, kind, ordinal);

    let mut labels = BTreeMap::new();
    labels.insert(TERRAFORM_PARENT_LABEL.to_owned(), parent_name.to_owned());
    labels.insert(SPEC_HASH_LABEL.to_owned(), spec_hash.to_owned());

    let mut annotations = carry_forward_annotations.clone();
    annotations.remove(LAST_APPLIED_CONFIG_ANNOTATION);

    let env_vars: Vec<EnvVar> = env::build_env(
        &config.project_id,
        provider_keys,
        backend_bucket,
        backend_prefix,
        workspace,
        tfvars,
        vars_from,
        inputs,
        plan_file,
    );

    let mut volumes = vec![Volume {
        name: STATE_VOLUME.to_owned(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Volume::default()
    }];
    let mut mounts = vec![VolumeMount {
        name: STATE_VOLUME.to_owned(),
        mount_path: "/opt/terraform/".to_owned(),
        ..VolumeMount::default()
    }];
    for config_map_name in source.config_map_hashes.keys() {
        volumes.push(Volume {
            name: config_map_name.clone(),
            config_map: Some(ConfigMapVolumeSource {
                name: Some(config_map_name.clone()),
                default_mode: Some(CONFIG_MAP_MODE),
                ..ConfigMapVolumeSource::default()
            }),
            ..Volume::default()
        });
    }
    for (config_map_name, key) in &source.config_map_keys {
        let base = key.rsplit('/').next().unwrap_or(key);
        mounts.push(VolumeMount {
            name: config_map_name.clone(),
            mount_path: format!("/opt/terraform/{key}"),
            sub_path: Some(base.to_owned()),
            ..VolumeMount::default()
        });
    }

    let main_container = Container {
        name: "terraform".to_owned(),
        image: Some(image.to_owned()),
        image_pull_policy: Some(image_pull_policy.to_owned()),
        command: Some(vec![config.pod_cmd(kind).to_owned()]),
        env: Some(env_vars),
        volume_mounts: Some(mounts),
        ..Container::default()
    };

    let init_containers = if source.gcs_objects.is_empty() {
        None
    } else {
        let mut init_env = env::build_provider_env(&config.project_id, provider_keys);
        init_env.push(EnvVar {
            name: "GCS_TARBALLS".to_owned(),
            value: Some(source.gcs_objects.join(",")),
            value_from: None,
        });
        Some(vec![Container {
            name: "gcs-tarball".to_owned(),
            image: Some(image.to_owned()),
            image_pull_policy: Some(image_pull_policy.to_owned()),
            command: Some(vec![config.gcs_tarball_cmd.clone()]),
            env: Some(init_env),
            volume_mounts: Some(vec![VolumeMount {
                name: STATE_VOLUME.to_owned(),
                mount_path: "/opt/terraform/".to_owned(),
                ..VolumeMount::default()
            }]),
            ..Container::default()
        }])
    };

    Pod {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_owned()),
            labels: Some(labels),
            annotations: Some(annotations),
            ..ObjectMeta::default()
        },
        spec: Some(PodSpec {
            service_account_name: Some(config.pod_service_account.clone()),
            restart_policy: Some("Never".to_owned()),
            init_containers,
            containers: vec![main_container],
            volumes: Some(volumes),
            ..PodSpec::default()
        }),
        status: None,
    }
}
