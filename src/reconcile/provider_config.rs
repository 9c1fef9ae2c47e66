//! ProviderConfigReady (§4.3): fetch each configured provider's credential
//! secret and collect its data keys for env derivation (§4.7.3).
use std::collections::BTreeMap;

use crate::reconcile::outcome::StepOutcome;
use crate::resolver::Resolver;
use crate::resource::ProviderConfigEntry;

pub type ProviderKeys = BTreeMap<String, Vec<String>>;

pub async fn run(
    namespace: &str,
    entries: &[ProviderConfigEntry],
    resolver: &dyn Resolver,
) -> StepOutcome<ProviderKeys> {
    let mut keys = ProviderKeys::new();
    let mut missing = Vec::new();

    for entry in entries {
        match resolver.get_secret_keys(namespace, &entry.secret_name).await {
            Some(secret_keys) => {
                keys.insert(entry.secret_name.clone(), secret_keys);
            }
            None => missing.push(entry.secret_name.clone()),
        }
    }

    if missing.is_empty() {
        let reason = keys
            .keys()
            .map(|name| format!("Secret/{name}"))
            .collect::<Vec<_>>()
            .join(", ");
        StepOutcome::ready(reason, keys)
    } else {
        let reason = format!(
            "Waiting for secrets: {}",
            missing
                .iter()
                .map(|name| format!("Secret/{name}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        StepOutcome::waiting(reason, keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::mock::MockResolver;

    #[tokio::test]
    async fn all_secrets_present_is_ready() {
        let resolver = MockResolver::new().with_secret("default", "google-creds", vec!["key.json"]);
        let entries = vec![ProviderConfigEntry {
            name: "google".to_owned(),
            secret_name: "google-creds".to_owned(),
        }];
        let outcome = run("default", &entries, &resolver).await;
        assert!(outcome.is_true());
        assert_eq!(outcome.value["google-creds"], vec!["key.json".to_owned()]);
    }

    #[tokio::test]
    async fn missing_secret_waits() {
        let resolver = MockResolver::new();
        let entries = vec![ProviderConfigEntry {
            name: "google".to_owned(),
            secret_name: "google-creds".to_owned(),
        }];
        let outcome = run("default", &entries, &resolver).await;
        assert!(!outcome.is_true());
        assert!(outcome.reason.contains("google-creds"));
    }
}
