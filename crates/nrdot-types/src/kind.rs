use serde::{Deserialize, Serialize};

/// The telemetry kind a [`Record`](crate::Record) carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Metric,
    Trace,
    Log,
}

impl Kind {
    /// The one-byte tag persisted in a DLQ frame header.
    pub fn tag(&self) -> u8 {
        match self {
            Kind::Metric => 0,
            Kind::Trace => 1,
            Kind::Log => 2,
        }
    }

    /// Recovers a [`Kind`] from a frame header tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Kind::Metric),
            1 => Some(Kind::Trace),
            2 => Some(Kind::Log),
            _ => None,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Metric => write!(f, "metric"),
            Kind::Trace => write!(f, "trace"),
            Kind::Log => write!(f, "log"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips() {
        for kind in [Kind::Metric, Kind::Trace, Kind::Log] {
            assert_eq!(Kind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(Kind::from_tag(99), None);
    }
}
