//! Pod environment composition (§4.7.3).
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    EnvVar, EnvVarSource, ObjectFieldSelector, SecretKeySelector,
};

/// Rewrite a variable name per the `TF_VAR_` rule: leave names already
/// matching `^TF_VAR_.*` alone, otherwise prepend the prefix.
#[must_use]
pub fn rewrite_var_name(name: &str) -> String {
    if name.starts_with("TF_VAR_") {
        name.to_owned()
    } else {
        format!("TF_VAR_{name}")
    }
}

fn literal(name: impl Into<String>, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: Some(value.into()),
        value_from: None,
    }
}

fn field_ref(name: impl Into<String>, field_path: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field_path.into(),
                ..Default::default()
            }),
            ..Default::default()
        }),
    }
}

fn secret_key_ref(name: impl Into<String>, secret_name: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: None,
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: Some(secret_name.to_owned()),
                key: key.to_owned(),
                optional: Some(false),
            }),
            ..Default::default()
        }),
    }
}

/// The init container's environment (§4.7.2): `PROJECT_ID` plus one
/// `secretKeyRef` per provider-config `(secret, key)`, unprefixed.
#[must_use]
pub fn build_provider_env(
    project_id: &str,
    provider_keys: &BTreeMap<String, Vec<String>>,
) -> Vec<EnvVar> {
    let mut env = vec![literal("PROJECT_ID", project_id)];
    for (secret_name, keys) in provider_keys {
        for key in keys {
            env.push(secret_key_ref(key.clone(), secret_name, key));
        }
    }
    env
}

#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn build_env(
    project_id: &str,
    provider_keys: &BTreeMap<String, Vec<String>>,
    backend_bucket: &str,
    backend_prefix: &str,
    workspace: &str,
    tfvars: &[(String, String)],
    vars_from: &BTreeMap<String, String>,
    inputs: &BTreeMap<String, String>,
    plan_file: Option<&str>,
) -> Vec<EnvVar> {
    let mut env = vec![
        literal("PROJECT_ID", project_id),
        field_ref("POD_NAME", "metadata.name"),
        field_ref("NAMESPACE", "metadata.namespace"),
    ];

    for (secret_name, keys) in provider_keys {
        for key in keys {
            env.push(secret_key_ref(key.clone(), secret_name, key));
        }
    }

    env.push(literal("BACKEND_BUCKET", backend_bucket));
    env.push(literal("BACKEND_PREFIX", backend_prefix));
    env.push(literal("WORKSPACE", workspace));
    env.push(literal("OUTPUT_MODULE", "root"));

    for (name, value) in tfvars {
        env.push(literal(rewrite_var_name(name), value));
    }
    for (dest, value) in vars_from {
        env.push(literal(rewrite_var_name(dest), value));
    }
    for (dest, value) in inputs {
        env.push(literal(rewrite_var_name(dest), value));
    }

    if let Some(plan_file) = plan_file {
        env.push(literal("TFPLAN", plan_file));
    }

    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_bare_names_only() {
        assert_eq!(rewrite_var_name("region"), "TF_VAR_region");
        assert_eq!(rewrite_var_name("TF_VAR_region"), "TF_VAR_region");
    }

    #[test]
    fn every_group_lands_with_the_tf_var_prefix() {
        let env = build_env(
            "proj",
            &BTreeMap::new(),
            "bucket",
            "prefix",
            "default-demo",
            &[("region".to_owned(), "us-east1".to_owned())],
            &BTreeMap::from([("b".to_owned(), "1".to_owned())]),
            &BTreeMap::from([("c".to_owned(), "2".to_owned())]),
            None,
        );
        let names: Vec<_> = env.iter().filter_map(|e| e.value.as_ref().map(|_| e.name.clone())).collect();
        assert!(names.contains(&"TF_VAR_region".to_owned()));
        assert!(names.contains(&"TF_VAR_b".to_owned()));
        assert!(names.contains(&"TF_VAR_c".to_owned()));
    }
}
