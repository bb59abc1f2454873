use serde::{Deserialize, Serialize};

/// Side of a matchup a score increment goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSide {
    A,
    B,
}

impl ScoreSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSide::A => "a",
            ScoreSide::B => "b",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "a" | "A" => Some(ScoreSide::A),
            "b" | "B" => Some(ScoreSide::B),
            _ => None,
        }
    }
}

/// Destructive action guarded by the arm/confirm flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmedAction {
    Reset,
    Delete,
}

impl ArmedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArmedAction::Reset => "reset",
            ArmedAction::Delete => "delete",
        }
    }

    /// Capitalized label used in notices and badges
    pub fn label(&self) -> &'static str {
        match self {
            ArmedAction::Reset => "Reset",
            ArmedAction::Delete => "Delete",
        }
    }

    /// Document field holding the arm timestamp
    pub fn armed_at_field(&self) -> &'static str {
        match self {
            ArmedAction::Reset => "resetArmedAt",
            ArmedAction::Delete => "deleteArmedAt",
        }
    }
}
