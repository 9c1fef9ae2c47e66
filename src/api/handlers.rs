//! Request/response shapes and the sync handler itself (§6 "Sync endpoint").
use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::{reply, Reply};

use crate::config::ProcessConfig;
use crate::k8s::KubeResolver;
use crate::planner::PlanSummarizer;
use crate::reconcile::{reconcile, ChildrenSnapshot};
use crate::resource::{Parent, TfStatus};

#[derive(Debug, Deserialize)]
pub(super) struct SyncRequest {
    parent: Parent,
    children: ChildrenSnapshot,
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    status: TfStatus,
    children: Vec<serde_json::Value>,
}

#[tracing::instrument(skip_all, fields(parent = %request.parent.namespaced_name()))]
pub(super) async fn sync(
    request: SyncRequest,
    resolver: Arc<KubeResolver>,
    planner: Arc<dyn PlanSummarizer>,
    config: Arc<ProcessConfig>,
) -> Result<impl Reply, Infallible> {
    let output = reconcile(
        &request.parent,
        &request.children,
        resolver.as_ref(),
        planner.as_ref(),
        config.as_ref(),
        chrono::Utc::now(),
    )
    .await;

    let body = SyncResponse {
        status: output.status,
        children: output.desired_children.into_flat_list(),
    };
    Ok(reply::with_status(reply::json(&body), StatusCode::OK))
}
