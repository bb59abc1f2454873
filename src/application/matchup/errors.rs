use crate::domain::repositories::RepositoryError;
use crate::domain::services::matchup_rules::RuleViolation;
use crate::domain::value_objects::ArmedAction;

/// Failure of a matchup operation. Nothing was written when one of these is
/// returned.
#[derive(Debug, thiserror::Error)]
pub enum MatchupError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Cooldown active: {remaining_ms} ms left")]
    CooldownActive { remaining_ms: i64 },
    #[error("{action:?} armed: {remaining_ms} ms left before it can be confirmed")]
    ArmPending {
        action: ArmedAction,
        remaining_ms: i64,
    },
    #[error("Matchup was modified concurrently")]
    ConcurrentModification,
    #[error("Caller lacks the required group role")]
    Unauthorized,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl MatchupError {
    /// Expected, time-bounded refusals the caller can simply retry later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MatchupError::CooldownActive { .. }
                | MatchupError::ArmPending { .. }
                | MatchupError::ConcurrentModification
        )
    }
}

impl From<RepositoryError> for MatchupError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => MatchupError::ConcurrentModification,
            RepositoryError::NotFound(_) => MatchupError::NotFound("Matchup"),
            other => MatchupError::Repository(other),
        }
    }
}

impl From<RuleViolation> for MatchupError {
    fn from(violation: RuleViolation) -> Self {
        match violation {
            RuleViolation::CooldownActive { remaining_ms } => {
                MatchupError::CooldownActive { remaining_ms }
            }
            RuleViolation::ArmPending {
                action,
                remaining_ms,
            } => MatchupError::ArmPending {
                action,
                remaining_ms,
            },
        }
    }
}
