// Wires a read-only Kubernetes resolver and an HTTP sync adapter around the
// pure reconciler (§6).
use std::sync::Arc;

use kube::Client;
use tf_operator::{CliPlanSummarizer, KubeResolver, ProcessConfig};
use tracing_subscriber::fmt::format::FmtSpan;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "tf_operator=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let config = ProcessConfig::load()?;
    let bind_addr: std::net::SocketAddr = config.http_bind.parse()?;

    let client = Client::try_default().await?;
    let resolver = KubeResolver::new(client);
    let planner = Arc::new(CliPlanSummarizer::new(config.plan_parser_cmd.clone()));

    let sync = tf_operator::api::new(resolver, planner, config);
    warp::serve(sync).run(bind_addr).await;
    Ok(())
}
