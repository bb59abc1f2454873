//! Matchup state machine.
//!
//! Scoring is gated by a cooldown measured from `lastScoreAt`. Reset and
//! delete each run an independent `Idle -> Armed -> Idle/Executed` machine
//! whose only state is the arm timestamp, so any client can re-derive it.
//! These functions are pure: they take the persisted matchup and the store
//! time and say what should change. Committing the change atomically is the
//! caller's job.

use serde_json::{json, Value};

use crate::domain::entities::Matchup;
use crate::domain::repositories::{Fields, TxWrite};
use crate::domain::value_objects::{ArmedAction, ScoreSide};

/// Accepted state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Scored {
        side: ScoreSide,
        score_a: u32,
        score_b: u32,
        at: i64,
    },
    Armed {
        action: ArmedAction,
        at: i64,
    },
    ResetExecuted,
    Deleted,
}

/// Rejected state change; nothing may be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("Cooldown active: {remaining_ms} ms left")]
    CooldownActive { remaining_ms: i64 },
    #[error("{action:?} armed: {remaining_ms} ms left before it can be confirmed")]
    ArmPending {
        action: ArmedAction,
        remaining_ms: i64,
    },
}

/// Add one point to `side` unless the cooldown is still running
pub fn increment_score(
    matchup: &Matchup,
    side: ScoreSide,
    now: i64,
) -> Result<Transition, RuleViolation> {
    let remaining_ms = matchup.cooldown_remaining(now);
    if remaining_ms > 0 {
        return Err(RuleViolation::CooldownActive { remaining_ms });
    }

    let (score_a, score_b) = match side {
        ScoreSide::A => (matchup.score_a.saturating_add(1), matchup.score_b),
        ScoreSide::B => (matchup.score_a, matchup.score_b.saturating_add(1)),
    };

    Ok(Transition::Scored {
        side,
        score_a,
        score_b,
        at: now,
    })
}

/// First call arms `action`; a call after the arm window executes it
pub fn arm_or_confirm(
    matchup: &Matchup,
    action: ArmedAction,
    now: i64,
) -> Result<Transition, RuleViolation> {
    if !matchup.is_armed(action) {
        return Ok(Transition::Armed { action, at: now });
    }

    let remaining_ms = matchup.arm_remaining(action, now);
    if remaining_ms > 0 {
        return Err(RuleViolation::ArmPending {
            action,
            remaining_ms,
        });
    }

    Ok(match action {
        ArmedAction::Reset => Transition::ResetExecuted,
        ArmedAction::Delete => Transition::Deleted,
    })
}

impl Transition {
    /// Fields to merge into the stored document (or its removal)
    pub fn to_write(&self) -> TxWrite {
        let patch = match self {
            Transition::Scored {
                score_a,
                score_b,
                at,
                ..
            } => json!({ "scoreA": score_a, "scoreB": score_b, "lastScoreAt": at }),
            Transition::Armed { action, at } => {
                let mut fields = Fields::new();
                fields.insert(action.armed_at_field().to_string(), json!(at));
                Value::Object(fields)
            }
            Transition::ResetExecuted => json!({
                "scoreA": 0,
                "scoreB": 0,
                "lastScoreAt": Value::Null,
                "resetArmedAt": Value::Null,
            }),
            Transition::Deleted => return TxWrite::Delete,
        };

        match patch {
            Value::Object(fields) => TxWrite::Update(fields),
            _ => TxWrite::None,
        }
    }

    /// Apply to an in-memory copy; returns `None` once the matchup is gone
    pub fn apply(&self, mut matchup: Matchup) -> Option<Matchup> {
        match self {
            Transition::Scored {
                score_a,
                score_b,
                at,
                ..
            } => {
                matchup.score_a = *score_a;
                matchup.score_b = *score_b;
                matchup.last_score_at = Some(*at);
            }
            Transition::Armed { action, at } => match action {
                ArmedAction::Reset => matchup.reset_armed_at = Some(*at),
                ArmedAction::Delete => matchup.delete_armed_at = Some(*at),
            },
            Transition::ResetExecuted => {
                matchup.score_a = 0;
                matchup.score_b = 0;
                matchup.last_score_at = None;
                matchup.reset_armed_at = None;
            }
            Transition::Deleted => return None,
        }
        Some(matchup)
    }
}
