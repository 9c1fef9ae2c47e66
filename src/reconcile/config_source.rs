//! ConfigSourceReady (§4.4): resolve every `spec.sources` entry into a
//! `SourceDescriptor` the pod template and `WORKSPACE` derivation consume.
use std::collections::BTreeMap;

use sha1::{Digest, Sha1};

use crate::reconcile::children::DesiredChildren;
use crate::reconcile::outcome::StepOutcome;
use crate::reconcile::pod::template::build_embedded_config_map;
use crate::resolver::{ConfigMapData, Resolver};
use crate::resource::{Source, SourceKind};

#[derive(Debug, Clone, Default)]
pub struct SourceDescriptor {
    pub config_map_hashes: BTreeMap<String, String>,
    pub config_map_keys: Vec<(String, String)>,
    pub gcs_objects: Vec<String>,
    pub embedded_config_maps: Vec<String>,
}

fn hash_data(data: &ConfigMapData) -> String {
    let canonical = serde_json::to_vec(data).expect("ConfigMapData always serializes");
    let mut hasher = Sha1::new();
    hasher.update(&canonical);
    hex_encode(hasher.finalize())
}

fn hash_body(body: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(body.as_bytes());
    hex_encode(hasher.finalize())
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    use std::fmt::Write;
    bytes.as_ref().iter().fold(String::new(), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

enum SourceOutcome {
    Ok,
    Waiting(String),
    Invalid(String),
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    namespace: &str,
    parent_name: &str,
    sources: &[Source],
    newest_pod_name: &str,
    resolver: &dyn Resolver,
    desired: &mut DesiredChildren,
) -> StepOutcome<SourceDescriptor> {
    let mut descriptor = SourceDescriptor::default();
    let mut problems = Vec::new();

    for source in sources {
        match resolve_one(
            namespace,
            parent_name,
            source,
            newest_pod_name,
            resolver,
            desired,
            &mut descriptor,
            false,
        )
        .await
        {
            SourceOutcome::Ok => {}
            SourceOutcome::Waiting(msg) | SourceOutcome::Invalid(msg) => problems.push(msg),
        }
    }

    if problems.is_empty() {
        StepOutcome::ready("All sources resolved", descriptor)
    } else {
        StepOutcome::waiting(problems.join("; "), descriptor)
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_one<'a>(
    namespace: &'a str,
    parent_name: &'a str,
    source: &'a Source,
    newest_pod_name: &'a str,
    resolver: &'a dyn Resolver,
    desired: &'a mut DesiredChildren,
    descriptor: &'a mut SourceDescriptor,
    is_peer_hop: bool,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = SourceOutcome> + 'a>> {
    Box::pin(async move {
        let Some(kind) = source.kind() else {
            return SourceOutcome::Invalid("source entry must set exactly one of configMap, embedded, gcs, tfapply, tfplan".to_owned());
        };

        match kind {
            SourceKind::ConfigMap(cm) => {
                let Some(data) = resolver.get_config_map(namespace, &cm.name).await else {
                    return SourceOutcome::Waiting(format!("Waiting for ConfigMap/{}", cm.name));
                };
                if data.is_empty() {
                    return SourceOutcome::Invalid(format!("ConfigMap/{} has no data", cm.name));
                }
                descriptor
                    .config_map_hashes
                    .insert(cm.name.clone(), hash_data(&data));
                for key in data.keys() {
                    descriptor.config_map_keys.push((cm.name.clone(), key.clone()));
                }
                SourceOutcome::Ok
            }
            SourceKind::Embedded(body) => {
                if is_peer_hop {
                    // Peer traversal only follows ConfigMap and GCS entries (§4.4).
                    return SourceOutcome::Ok;
                }
                let hash = hash_body(body);
                let name = format!("{newest_pod_name}-{}", &hash[..4]);
                let trimmed = body.trim().to_owned();
                let mut data = BTreeMap::new();
                data.insert("main.tf".to_owned(), trimmed);
                desired.upsert_config_map(
                    name.clone(),
                    build_embedded_config_map(namespace, &name, &data),
                );
                descriptor.config_map_hashes.insert(name.clone(), hash_data(&data));
                descriptor.config_map_keys.push((name.clone(), "main.tf".to_owned()));
                descriptor.embedded_config_maps.push(name);
                SourceOutcome::Ok
            }
            SourceKind::Gcs(url) => {
                descriptor.gcs_objects.push(url.to_owned());
                SourceOutcome::Ok
            }
            SourceKind::Peer { tfapply, tfplan } => {
                if is_peer_hop {
                    return SourceOutcome::Ok;
                }
                if tfapply.is_none() && tfplan.is_none() {
                    return SourceOutcome::Invalid("source references no peer name".to_owned());
                }
                // Apply wins over plan when both are named and both exist;
                // otherwise whichever exists (§4.4).
                let apply_peer = match tfapply {
                    Some(name) => resolver.get_peer(crate::resource::ParentKind::Apply, namespace, name).await,
                    None => None,
                };
                let peer = if let Some(peer) = apply_peer {
                    peer
                } else if let Some(name) = tfplan {
                    match resolver.get_peer(crate::resource::ParentKind::Plan, namespace, name).await {
                        Some(peer) => peer,
                        None => return SourceOutcome::Waiting(format!("Waiting for tfplan/{name}")),
                    }
                } else {
                    let name = tfapply.expect("checked above that at least one is set");
                    return SourceOutcome::Waiting(format!("Waiting for tfapply/{name}"));
                };
                for cm_name in &peer.status.sources.embedded_config_maps {
                    let Some(data) = resolver.get_config_map(&peer.namespace, cm_name).await else {
                        return SourceOutcome::Waiting(format!("Waiting for ConfigMap/{cm_name}"));
                    };
                    descriptor.config_map_hashes.insert(cm_name.clone(), hash_data(&data));
                    for key in data.keys() {
                        descriptor.config_map_keys.push((cm_name.clone(), key.clone()));
                    }
                }
                let Some(peer_spec) = peer.spec.as_ref() else {
                    return SourceOutcome::Ok;
                };
                for peer_source in &peer_spec.sources {
                    match resolve_one(
                        namespace,
                        parent_name,
                        peer_source,
                        newest_pod_name,
                        resolver,
                        desired,
                        descriptor,
                        true,
                    )
                    .await
                    {
                        SourceOutcome::Ok => {}
                        other => return other,
                    }
                }
                SourceOutcome::Ok
            }
        }
    })
}
