use serde::{Deserialize, Serialize};

/// A mutating action ADM can apply to a pipeline parameter. The closed set accepted by
/// configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    IncBatch,
    StretchScrape,
    EnableSampling,
    DropDebug,
    DropMetrics,
}

impl Action {
    /// All actions in the closed set, for validation and iteration.
    pub const ALL: [Action; 5] = [
        Action::IncBatch,
        Action::StretchScrape,
        Action::EnableSampling,
        Action::DropDebug,
        Action::DropMetrics,
    ];
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::IncBatch => "inc_batch",
            Action::StretchScrape => "stretch_scrape",
            Action::EnableSampling => "enable_sampling",
            Action::DropDebug => "drop_debug",
            Action::DropMetrics => "drop_metrics",
        };
        write!(f, "{name}")
    }
}
