//! The production [`crate::resolver::Resolver`] (§5 "Resolver boundary", §9
//! "read-only resolver capability"): read-only `Api::namespaced` lookups
//! against a live cluster, the same way the reference controller's own
//! handlers reach for `kube::Api` directly rather than through an
//! abstraction. Lives at the edge of the crate; the reconciler itself never
//! holds a [`Client`].
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Api, Client};
use tracing::warn;

use crate::resolver::{ConfigMapData, Resolver};
use crate::resource::{Parent, ParentKind, TerraformApply, TerraformDestroy, TerraformPlan};

#[derive(Debug, Clone)]
pub struct KubeResolver {
    client: Client,
}

impl KubeResolver {
    #[must_use]
    pub fn new(client: Client) -> Self {
        KubeResolver { client }
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

#[async_trait]
impl Resolver for KubeResolver {
    async fn get_secret_keys(&self, namespace: &str, name: &str) -> Option<Vec<String>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(secret) => Some(secret.data.map_or_else(Vec::new, |d| d.into_keys().collect())),
            Err(err) if is_not_found(&err) => None,
            Err(err) => {
                warn!(%namespace, %name, error = %err, "failed to fetch Secret");
                None
            }
        }
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Option<ConfigMapData> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(cm) => Some(cm.data.unwrap_or_default()),
            Err(err) if is_not_found(&err) => None,
            Err(err) => {
                warn!(%namespace, %name, error = %err, "failed to fetch ConfigMap");
                None
            }
        }
    }

    async fn get_peer(&self, kind: ParentKind, namespace: &str, name: &str) -> Option<Parent> {
        match kind {
            ParentKind::Plan => {
                let api: Api<TerraformPlan> = Api::namespaced(self.client.clone(), namespace);
                fetch_peer(&api, name, kind, namespace).await.map(|tf| Parent::from(&tf))
            }
            ParentKind::Apply => {
                let api: Api<TerraformApply> = Api::namespaced(self.client.clone(), namespace);
                fetch_peer(&api, name, kind, namespace).await.map(|tf| Parent::from(&tf))
            }
            ParentKind::Destroy => {
                let api: Api<TerraformDestroy> = Api::namespaced(self.client.clone(), namespace);
                fetch_peer(&api, name, kind, namespace).await.map(|tf| Parent::from(&tf))
            }
        }
    }
}

async fn fetch_peer<K>(api: &Api<K>, name: &str, kind: ParentKind, namespace: &str) -> Option<K>
where
    K: kube::Resource<DynamicType = ()> + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    match api.get(name).await {
        Ok(peer) => Some(peer),
        Err(err) if is_not_found(&err) => None,
        Err(err) => {
            warn!(%namespace, %name, kind = %kind, error = %err, "failed to fetch peer parent");
            None
        }
    }
}
