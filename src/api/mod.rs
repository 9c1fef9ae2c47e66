// Sync webhook adapter (§6 "Sync endpoint"): a thin JSON adapter between an
// external composite-controller framework and the pure reconciler. The
// reconciler itself never touches the network or the cluster; this module
// exists only so the crate is runnable end to end.
//
// Routes:
//
// - `POST /`: sync request `{parent, children}` -> `{status, children}`.
// - `GET /healthz`: liveness probe, always `200 OK`.
//
// Any other method or path falls through to a `400 Bad Request`.
use std::convert::Infallible;
use std::sync::Arc;

use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::config::ProcessConfig;
use crate::k8s::KubeResolver;
use crate::planner::PlanSummarizer;

mod handlers;

#[must_use]
pub fn new(
    resolver: KubeResolver,
    planner: Arc<dyn PlanSummarizer>,
    config: ProcessConfig,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let resolver = Arc::new(resolver);
    let config = Arc::new(config);
    healthz()
        .or(sync(resolver, planner, config))
        .recover(reject_unsupported)
}

// GET /healthz
fn healthz() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::get()
        .and(warp::path("healthz"))
        .and(warp::path::end())
        .map(|| "OK")
}

// POST /
fn sync(
    resolver: Arc<KubeResolver>,
    planner: Arc<dyn PlanSummarizer>,
    config: Arc<ProcessConfig>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::post()
        .and(warp::path::end())
        .and(json_body())
        .and(with(resolver))
        .and(with(planner))
        .and(with(config))
        .and_then(handlers::sync)
}

fn json_body() -> impl Filter<Extract = (handlers::SyncRequest,), Error = Rejection> + Clone {
    warp::body::content_length_limit(1024 * 1024).and(warp::body::json())
}

fn with<T: Send + Sync + ?Sized + 'static>(
    value: Arc<T>,
) -> impl Filter<Extract = (Arc<T>,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

async fn reject_unsupported(_err: Rejection) -> Result<impl Reply, Infallible> {
    Ok(StatusCode::BAD_REQUEST)
}
