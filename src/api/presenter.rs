//! View models for matchup cards, their live badges and action notices.
//!
//! Everything here is derived from a matchup plus "now"; nothing is stored.

use serde::Serialize;

use crate::application::matchup::{ArmOutcome, MatchupError};
use crate::domain::entities::{Matchup, Participant};
use crate::domain::services::timing::{human, ARM_WINDOW_MS};
use crate::domain::value_objects::ArmedAction;

/// Badge colouring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tone {
    #[serde(rename = "")]
    Neutral,
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "wait")]
    Wait,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub label: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardBadges {
    pub score: Badge,
    pub reset: Badge,
    pub delete: Badge,
}

/// Time-dependent part of a card, refreshed every tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStatus {
    pub id: String,
    pub score_ready: bool,
    pub score_remaining_ms: i64,
    pub show_cooldown_overlay: bool,
    pub reset_remaining_ms: i64,
    pub delete_remaining_ms: i64,
    pub badges: CardBadges,
}

/// Matchup as shown to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupCard {
    pub id: String,
    pub group_id: String,
    pub player_a: Participant,
    pub player_b: Participant,
    pub mode: String,
    pub score_a: u32,
    pub score_b: u32,
    pub created_at: String,
    pub last_score_at: Option<String>,
    #[serde(flatten)]
    pub status: CardStatus,
}

/// Convert a millisecond timestamp to RFC 3339
fn millis_to_rfc3339(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}

pub fn score_badge(matchup: &Matchup, now: i64) -> Badge {
    let remaining = matchup.cooldown_remaining(now);
    if remaining == 0 {
        Badge {
            label: "Score: Ready".to_string(),
            tone: Tone::Ok,
        }
    } else {
        Badge {
            label: format!("Score: Wait {}", human(remaining)),
            tone: Tone::Wait,
        }
    }
}

pub fn arm_badge(matchup: &Matchup, action: ArmedAction, now: i64) -> Badge {
    let label = action.label();
    if !matchup.is_armed(action) {
        return Badge {
            label: format!("{}: Tap to arm", label),
            tone: Tone::Neutral,
        };
    }

    let remaining = matchup.arm_remaining(action, now);
    if remaining == 0 {
        Badge {
            label: format!("{}: Ready to confirm", label),
            tone: Tone::Ok,
        }
    } else {
        Badge {
            label: format!("{}: Armed — Wait {}", label, human(remaining)),
            tone: Tone::Wait,
        }
    }
}

pub fn card_status(matchup: &Matchup, now: i64) -> CardStatus {
    let score_remaining_ms = matchup.cooldown_remaining(now);
    let score_ready = score_remaining_ms == 0;

    CardStatus {
        id: matchup.id.clone(),
        score_ready,
        score_remaining_ms,
        show_cooldown_overlay: !score_ready && matchup.has_scored(),
        reset_remaining_ms: matchup.arm_remaining(ArmedAction::Reset, now),
        delete_remaining_ms: matchup.arm_remaining(ArmedAction::Delete, now),
        badges: CardBadges {
            score: score_badge(matchup, now),
            reset: arm_badge(matchup, ArmedAction::Reset, now),
            delete: arm_badge(matchup, ArmedAction::Delete, now),
        },
    }
}

pub fn render_card(matchup: &Matchup, now: i64) -> MatchupCard {
    MatchupCard {
        id: matchup.id.clone(),
        group_id: matchup.group_id.clone(),
        player_a: matchup.player_a.clone(),
        player_b: matchup.player_b.clone(),
        mode: matchup.mode.clone(),
        score_a: matchup.score_a,
        score_b: matchup.score_b,
        created_at: millis_to_rfc3339(matchup.created_at),
        last_score_at: matchup.last_score_at.map(millis_to_rfc3339),
        status: card_status(matchup, now),
    }
}

pub fn render_cards(matchups: &[Matchup], now: i64) -> Vec<MatchupCard> {
    matchups.iter().map(|m| render_card(m, now)).collect()
}

pub fn refresh_statuses(matchups: &[Matchup], now: i64) -> Vec<CardStatus> {
    matchups.iter().map(|m| card_status(m, now)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Wait,
    Error,
}

/// Short message describing the outcome of a tap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, title: &str, message: String) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message,
        }
    }

    pub fn score_added(mode: &str) -> Self {
        Self::new(NoticeKind::Success, mode, "Score added".to_string())
    }

    pub fn arm_outcome(action: ArmedAction, outcome: &ArmOutcome, mode: &str) -> Self {
        let label = action.label();
        match outcome {
            ArmOutcome::Armed { .. } => Self::new(
                NoticeKind::Wait,
                mode,
                format!(
                    "{} armed — come back in {} minutes, then tap {} again to confirm.",
                    label,
                    ARM_WINDOW_MS / 60_000,
                    label
                ),
            ),
            ArmOutcome::ResetExecuted { .. } => {
                Self::new(NoticeKind::Success, mode, "Reset complete".to_string())
            }
            ArmOutcome::Deleted { .. } => {
                Self::new(NoticeKind::Success, mode, "Matchup deleted".to_string())
            }
        }
    }

    pub fn from_error(error: &MatchupError, title: &str) -> Self {
        match error {
            MatchupError::CooldownActive { remaining_ms } => Self::new(
                NoticeKind::Wait,
                title,
                format!("Cooldown — {} left (anti-tampering)", human(*remaining_ms)),
            ),
            MatchupError::ArmPending {
                action,
                remaining_ms,
            } => Self::new(
                NoticeKind::Wait,
                title,
                format!(
                    "{} armed — {} left before you can confirm.",
                    action.label(),
                    human(*remaining_ms)
                ),
            ),
            _ => Self::new(NoticeKind::Error, title, "Failed".to_string()),
        }
    }
}
