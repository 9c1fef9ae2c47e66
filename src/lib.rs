#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod k8s;
pub mod planner;
pub mod reconcile;
pub mod resolver;
pub mod resource;

pub use config::ProcessConfig;
pub use k8s::KubeResolver;
pub use planner::CliPlanSummarizer;
pub use reconcile::{reconcile, ReconcileError};
pub use resolver::Resolver;
pub use resource::{
    Condition, ConditionStatus, ParentKind, TerraformApply, TerraformDestroy, TerraformPlan,
    TfSpec, TfStatus,
};
