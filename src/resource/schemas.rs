//! Custom schema functions.
//!
//! `status.conditions` needs `x-kubernetes-list-type: map` so server-side
//! apply can merge individual conditions by `type` instead of replacing the
//! whole list, the same reason the reference controller this crate is built
//! from hand-writes its own conditions schema.
use schemars::{gen::SchemaGenerator, schema::Schema};
use serde_json::{from_value, json};

pub fn conditions(_: &mut SchemaGenerator) -> Schema {
    from_value(json!({
        "type": "array",
        "x-kubernetes-list-type": "map",
        "x-kubernetes-list-map-keys": ["type"],
        "items": {
            "type": "object",
            "properties": {
                "type": {
                    "description": "Name of the condition, e.g. PodComplete.",
                    "type": "string"
                },
                "status": {
                    "description": "Status of the condition.",
                    "enum": ["True", "False", "Unknown"],
                    "type": "string"
                },
                "lastProbeTime": {
                    "description": "Last time this condition was probed.",
                    "format": "date-time",
                    "type": "string"
                },
                "lastTransitionTime": {
                    "description": "Last time the condition transitioned from one status to another.",
                    "format": "date-time",
                    "type": "string"
                },
                "reason": {
                    "type": "string"
                },
                "message": {
                    "type": "string"
                }
            },
            "required": ["type", "status", "lastProbeTime", "lastTransitionTime"],
        },
    }))
    .unwrap()
}
