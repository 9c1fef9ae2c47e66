use std::fmt;

use serde::{Deserialize, Serialize};

/// The three sibling custom resource kinds this operator manages.
///
/// They share one spec/status shape end to end; only the kind tag and the
/// pod command selected from `ProcessConfig` differ between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParentKind {
    Plan,
    Apply,
    Destroy,
}

impl ParentKind {
    /// Long form used as the Kubernetes `kind`: `TerraformPlan` etc.
    #[must_use]
    pub fn long(self) -> &'static str {
        match self {
            ParentKind::Plan => "TerraformPlan",
            ParentKind::Apply => "TerraformApply",
            ParentKind::Destroy => "TerraformDestroy",
        }
    }

    /// Short form used in object naming: `tfplan`, `tfapply`, `tfdestroy`.
    #[must_use]
    pub fn short(self) -> &'static str {
        match self {
            ParentKind::Plan => "tfplan",
            ParentKind::Apply => "tfapply",
            ParentKind::Destroy => "tfdestroy",
        }
    }

    #[must_use]
    pub fn from_short(s: &str) -> Option<Self> {
        match s {
            "tfplan" => Some(ParentKind::Plan),
            "tfapply" => Some(ParentKind::Apply),
            "tfdestroy" => Some(ParentKind::Destroy),
            _ => None,
        }
    }
}

impl fmt::Display for ParentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long())
    }
}
