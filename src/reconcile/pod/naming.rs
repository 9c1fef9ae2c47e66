//! Ordinal pod naming (§4.7.1): `{parent}-{short-kind}-{n}`, strictly
//! positive, strictly increasing within a parent's lifetime.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;

use crate::resource::ParentKind;

fn ordinal_regex(parent: &str, kind: ParentKind) -> Regex {
    Regex::new(&format!(
        "^{}-{}-([0-9]+)$",
        regex::escape(parent),
        regex::escape(kind.short())
    ))
    .expect("ordinal regex is well formed")
}

#[must_use]
pub fn build_pod_name(parent: &str, kind: ParentKind, n: u64) -> String {
    format!("{}-{}-{}", parent, kind.short(), n)
}

/// Extract the ordinal `n` from a pod name, if it matches this parent's
/// naming pattern. Names that don't match are ignored by the caller with a
/// warning, not treated as an error.
#[must_use]
pub fn parse_ordinal(parent: &str, kind: ParentKind, pod_name: &str) -> Option<u64> {
    static CACHE: Lazy<std::sync::Mutex<BTreeMap<(String, ParentKind), Regex>>> =
        Lazy::new(|| std::sync::Mutex::new(BTreeMap::new()));
    let mut cache = CACHE.lock().expect("naming regex cache poisoned");
    let re = cache
        .entry((parent.to_owned(), kind))
        .or_insert_with(|| ordinal_regex(parent, kind));
    re.captures(pod_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// The highest ordinal among `pods` matching this parent's naming pattern,
/// and the name at that ordinal, if any.
#[must_use]
pub fn current_pod(
    parent: &str,
    kind: ParentKind,
    pods: &BTreeMap<String, Pod>,
) -> Option<(u64, String)> {
    pods.keys()
        .filter_map(|name| parse_ordinal(parent, kind, name).map(|n| (n, name.clone())))
        .max_by_key(|(n, _)| *n)
}

/// The name the *next* pod would use, regardless of whether a current pod
/// exists yet. Used by `ConfigSourceReady` (§4.4) to pre-derive synthesized
/// config-map names before `PodComplete` runs.
#[must_use]
pub fn next_pod_name(parent: &str, kind: ParentKind, pods: &BTreeMap<String, Pod>) -> String {
    let last = current_pod(parent, kind, pods).map_or(0, |(n, _)| n);
    build_pod_name(parent, kind, last + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_parse_round_trip() {
        let name = build_pod_name("demo", ParentKind::Apply, 7);
        assert_eq!(name, "demo-tfapply-7");
        assert_eq!(parse_ordinal("demo", ParentKind::Apply, &name), Some(7));
    }

    #[test]
    fn ignores_names_from_other_parents_or_kinds() {
        assert_eq!(parse_ordinal("demo", ParentKind::Apply, "other-tfapply-7"), None);
        assert_eq!(parse_ordinal("demo", ParentKind::Plan, "demo-tfapply-7"), None);
        assert_eq!(parse_ordinal("demo", ParentKind::Apply, "demo-tfapply-abc"), None);
    }

    #[test]
    fn next_pod_name_starts_at_one() {
        let pods = BTreeMap::new();
        assert_eq!(next_pod_name("demo", ParentKind::Plan, &pods), "demo-tfplan-1");
    }
}
