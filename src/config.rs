//! Process configuration (§6): everything the reconciler needs that isn't
//! carried on the parent's spec, loaded once at process start and treated as
//! a read-only injected dependency (§9, "Global mutable state").
//!
//! Loaded by individually-named `TF_*` environment variables looked up with
//! plain `std::env::var`, the same convention the reference Go controller's
//! own config loaders use (`os.LookupEnv` per variable, `original_source/`)
//! rather than a struct-deserializing env crate.
use std::env;

use thiserror::Error;

const DEFAULT_IMAGE: &str = "gcr.io/terraform-operator/terraform-pod:latest";
const DEFAULT_IMAGE_PULL_POLICY: &str = "IfNotPresent";
const DEFAULT_SERVICE_ACCOUNT: &str = "terraform";
const DEFAULT_BACKEND_PREFIX: &str = "terraform";
const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_BACKOFF_SCALE: f64 = 5.0;
const DEFAULT_PLAN_CMD: &str = "/run-terraform-plan.sh";
const DEFAULT_APPLY_CMD: &str = "/run-terraform-apply.sh";
const DEFAULT_DESTROY_CMD: &str = "/run-terraform-destroy.sh";
const DEFAULT_GCS_TARBALL_CMD: &str = "/fetch-gcs-tarballs.sh";
const DEFAULT_PROVIDER_SECRET_NAME: &str = "terraform-provider";
const DEFAULT_HTTP_BIND: &str = "0.0.0.0:8080";
const DEFAULT_PLAN_PARSER_CMD: &str = "tfjson-service";

/// What to do once `retryCount` reaches `maxAttempts` (§9, REDESIGN FLAGS).
///
/// `Reset` is the reference behavior this specification encodes: the
/// counter resets to zero and the retry loop continues indefinitely.
/// `Terminal` is the redesigned behavior: the parent stops declaring new
/// pods and stays failed until the spec changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryExhaustionPolicy {
    Reset,
    Terminal,
}

impl Default for RetryExhaustionPolicy {
    fn default() -> Self {
        RetryExhaustionPolicy::Reset
    }
}

impl RetryExhaustionPolicy {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "reset" => Some(RetryExhaustionPolicy::Reset),
            "terminal" => Some(RetryExhaustionPolicy::Terminal),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TF_MAX_ATTEMPTS must be a positive integer, got {0}")]
    InvalidMaxAttempts(String),
    #[error("TF_BACKOFF_SCALE must be a valid float >= 1.0, got {0}")]
    InvalidBackoffScale(String),
    #[error("TF_RETRY_EXHAUSTION_POLICY must be one of reset|terminal, got {0}")]
    InvalidRetryExhaustionPolicy(String),
    #[error("TF_HTTP_BIND is not a valid socket address: {0}")]
    InvalidHttpBind(#[from] std::net::AddrParseError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessConfig {
    pub project_id: String,
    pub image: String,
    pub image_pull_policy: String,
    pub pod_service_account: String,
    pub backend_bucket: String,
    pub backend_prefix: String,
    pub max_attempts: u32,
    pub backoff_scale: f64,
    pub plan_cmd: String,
    pub apply_cmd: String,
    pub destroy_cmd: String,
    pub gcs_tarball_cmd: String,
    pub provider_secret_name: String,
    pub retry_exhaustion_policy: RetryExhaustionPolicy,
    pub http_bind: String,
    pub plan_parser_cmd: String,
}

impl ProcessConfig {
    /// Load from individually-named `TF_*` environment variables, applying
    /// defaults and rejecting invalid values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(|name| env::var(name).ok())
    }

    fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // TF_PROJECT_ID is optional; derived from instance metadata in the
        // reference controller (out of scope here, §1).
        let project_id = lookup("TF_PROJECT_ID").unwrap_or_default();

        // TF_BACKEND_BUCKET is optional; derived from the project if unset.
        let backend_bucket = lookup("TF_BACKEND_BUCKET")
            .unwrap_or_else(|| format!("{project_id}-terraform-operator"));

        // TF_MAX_ATTEMPTS is optional.
        let max_attempts = match lookup("TF_MAX_ATTEMPTS") {
            Some(raw) => {
                let parsed: u32 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidMaxAttempts(raw.clone()))?;
                if parsed == 0 {
                    return Err(ConfigError::InvalidMaxAttempts(raw));
                }
                parsed
            }
            None => DEFAULT_MAX_ATTEMPTS,
        };

        // TF_BACKOFF_SCALE is optional.
        let backoff_scale = match lookup("TF_BACKOFF_SCALE") {
            Some(raw) => {
                let parsed: f64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidBackoffScale(raw.clone()))?;
                if parsed < 1.0 {
                    return Err(ConfigError::InvalidBackoffScale(raw));
                }
                parsed
            }
            None => DEFAULT_BACKOFF_SCALE,
        };

        let retry_exhaustion_policy = match lookup("TF_RETRY_EXHAUSTION_POLICY") {
            Some(raw) => RetryExhaustionPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidRetryExhaustionPolicy(raw))?,
            None => RetryExhaustionPolicy::default(),
        };

        let http_bind = lookup("TF_HTTP_BIND").unwrap_or_else(|| DEFAULT_HTTP_BIND.to_owned());
        // Validated eagerly so a misconfigured bind address fails at load
        // time rather than when the listener is actually bound.
        let _: std::net::SocketAddr = http_bind.parse()?;

        Ok(ProcessConfig {
            project_id,
            image: lookup("TF_IMAGE").unwrap_or_else(|| DEFAULT_IMAGE.to_owned()),
            image_pull_policy: lookup("TF_IMAGE_PULL_POLICY")
                .unwrap_or_else(|| DEFAULT_IMAGE_PULL_POLICY.to_owned()),
            pod_service_account: lookup("TF_POD_SERVICE_ACCOUNT")
                .unwrap_or_else(|| DEFAULT_SERVICE_ACCOUNT.to_owned()),
            backend_bucket,
            backend_prefix: lookup("TF_BACKEND_PREFIX")
                .unwrap_or_else(|| DEFAULT_BACKEND_PREFIX.to_owned()),
            max_attempts,
            backoff_scale,
            plan_cmd: lookup("TF_POD_PLAN_CMD").unwrap_or_else(|| DEFAULT_PLAN_CMD.to_owned()),
            apply_cmd: lookup("TF_POD_APPLY_CMD").unwrap_or_else(|| DEFAULT_APPLY_CMD.to_owned()),
            destroy_cmd: lookup("TF_POD_DESTROY_CMD")
                .unwrap_or_else(|| DEFAULT_DESTROY_CMD.to_owned()),
            gcs_tarball_cmd: lookup("TF_POD_GCS_TARBALL_CMD")
                .unwrap_or_else(|| DEFAULT_GCS_TARBALL_CMD.to_owned()),
            provider_secret_name: lookup("TF_PROVIDER_SECRET_NAME")
                .unwrap_or_else(|| DEFAULT_PROVIDER_SECRET_NAME.to_owned()),
            retry_exhaustion_policy,
            http_bind,
            plan_parser_cmd: lookup("TF_PLAN_PARSER_CMD")
                .unwrap_or_else(|| DEFAULT_PLAN_PARSER_CMD.to_owned()),
        })
    }

    /// The command + base name for the main container, by parent kind.
    #[must_use]
    pub fn pod_cmd(&self, kind: crate::resource::ParentKind) -> &str {
        use crate::resource::ParentKind;
        match kind {
            ParentKind::Plan => &self.plan_cmd,
            ParentKind::Apply => &self.apply_cmd,
            ParentKind::Destroy => &self.destroy_cmd,
        }
    }

    /// All-defaults config for reconciler tests outside this module.
    #[cfg(test)]
    #[must_use]
    pub fn for_tests() -> Self {
        Self::from_env(|_| None).expect("defaults are always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn with_env(vars: &[(&str, &str)]) -> ProcessConfig {
        let map: BTreeMap<&str, &str> = vars.iter().copied().collect();
        ProcessConfig::from_env(|name| map.get(name).map(|v| (*v).to_owned())).unwrap()
    }

    #[test]
    fn defaults_are_applied() {
        let cfg = with_env(&[]);
        assert_eq!(cfg.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!((cfg.backoff_scale - DEFAULT_BACKOFF_SCALE).abs() < f64::EPSILON);
        assert_eq!(cfg.backend_bucket, "-terraform-operator");
        assert_eq!(cfg.retry_exhaustion_policy, RetryExhaustionPolicy::Reset);
    }

    #[test]
    fn backend_bucket_derives_from_project() {
        let cfg = with_env(&[("TF_PROJECT_ID", "my-proj")]);
        assert_eq!(cfg.backend_bucket, "my-proj-terraform-operator");
    }

    #[test]
    fn explicit_backend_bucket_wins_over_derived() {
        let cfg = with_env(&[("TF_PROJECT_ID", "my-proj"), ("TF_BACKEND_BUCKET", "fixed-bucket")]);
        assert_eq!(cfg.backend_bucket, "fixed-bucket");
    }

    #[test]
    fn rejects_zero_max_attempts() {
        let result = ProcessConfig::from_env(|name| {
            (name == "TF_MAX_ATTEMPTS").then(|| "0".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::InvalidMaxAttempts(_))));
    }

    #[test]
    fn rejects_non_numeric_max_attempts() {
        let result = ProcessConfig::from_env(|name| {
            (name == "TF_MAX_ATTEMPTS").then(|| "nope".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::InvalidMaxAttempts(_))));
    }

    #[test]
    fn rejects_backoff_scale_below_one() {
        let result = ProcessConfig::from_env(|name| {
            (name == "TF_BACKOFF_SCALE").then(|| "0.5".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::InvalidBackoffScale(_))));
    }

    #[test]
    fn rejects_unknown_retry_exhaustion_policy() {
        let result = ProcessConfig::from_env(|name| {
            (name == "TF_RETRY_EXHAUSTION_POLICY").then(|| "bogus".to_owned())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidRetryExhaustionPolicy(_))
        ));
    }

    #[test]
    fn terminal_retry_exhaustion_policy_parses() {
        let cfg = with_env(&[("TF_RETRY_EXHAUSTION_POLICY", "terminal")]);
        assert_eq!(cfg.retry_exhaustion_policy, RetryExhaustionPolicy::Terminal);
    }
}
