use serde::{Deserialize, Serialize};

/// Priority class of a [`Record`](crate::Record), governing APQ scheduling and spill
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Class {
    Critical,
    High,
    Normal,
}

impl Class {
    /// All classes in strict priority order, as visited within a WRR round.
    pub const ALL: [Class; 3] = [Class::Critical, Class::High, Class::Normal];

    /// The default integer weight for this class (5:3:1).
    pub fn default_weight(&self) -> u32 {
        match self {
            Class::Critical => 5,
            Class::High => 3,
            Class::Normal => 1,
        }
    }
}

impl std::fmt::Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Class::Critical => write!(f, "critical"),
            Class::High => write!(f, "high"),
            Class::Normal => write!(f, "normal"),
        }
    }
}
