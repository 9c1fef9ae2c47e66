//! Spec fingerprint (§3, "Spec-fingerprint mechanics"): a content hash of the
//! effective spec, stamped onto the current ordinal pod as the
//! `tf-spec-hash` label rather than carried in `status`, mirroring how the
//! reference controller stamps a `tf-config-map-hash` label onto its pods.
use sha1::{Digest, Sha1};

use crate::resource::TfSpec;

pub const SPEC_HASH_LABEL: &str = "tf-spec-hash";

#[must_use]
pub fn spec_fingerprint(spec: &TfSpec) -> String {
    let canonical = serde_json::to_vec(spec).expect("TfSpec always serializes");
    let mut hasher = Sha1::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        use std::fmt::Write;
        bytes.as_ref().iter().fold(String::new(), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
    }
}
