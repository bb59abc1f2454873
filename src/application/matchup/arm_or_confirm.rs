use std::sync::Arc;

use crate::application::matchup::access::{load_matchup, require_editor};
use crate::application::matchup::MatchupError;
use crate::domain::entities::{Matchup, MATCHUPS};
use crate::domain::repositories::{run_transaction, DocumentStore};
use crate::domain::services::matchup_rules::{self, Transition};
use crate::domain::services::timing::ARM_WINDOW_MS;
use crate::domain::value_objects::ArmedAction;

/// Arm-or-confirm input
pub struct ArmOrConfirmInput {
    pub matchup_id: String,
    pub user_id: String,
    pub action: ArmedAction,
}

/// What the call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmOutcome {
    /// First tap recorded; confirm after `wait_ms`
    Armed { matchup: Matchup, wait_ms: i64 },
    /// Scores and cooldown cleared
    ResetExecuted { matchup: Matchup },
    /// Matchup removed for good
    Deleted { matchup_id: String, mode: String },
}

/// Arm-or-confirm output
#[derive(Debug)]
pub struct ArmOrConfirmOutput {
    pub action: ArmedAction,
    pub outcome: ArmOutcome,
}

/// Two-step reset/delete use case
pub struct ArmOrConfirm<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> ArmOrConfirm<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        input: ArmOrConfirmInput,
    ) -> Result<ArmOrConfirmOutput, MatchupError> {
        let action = input.action;

        let matchup = load_matchup(&*self.store, &input.matchup_id).await?;
        require_editor(&*self.store, &matchup.group_id, &input.user_id).await?;

        let outcome = run_transaction::<_, _, MatchupError, _>(
            &*self.store,
            MATCHUPS,
            &input.matchup_id,
            |document, now| {
                let document = document.ok_or(MatchupError::NotFound("Matchup"))?;
                let current = Matchup::from_document(document)?;
                let transition = matchup_rules::arm_or_confirm(&current, action, now)?;
                let write = transition.to_write();

                let matchup_id = current.id.clone();
                let mode = current.mode.clone();
                let outcome = match (&transition, transition.apply(current)) {
                    (Transition::Armed { .. }, Some(matchup)) => ArmOutcome::Armed {
                        matchup,
                        wait_ms: ARM_WINDOW_MS,
                    },
                    (_, Some(matchup)) => ArmOutcome::ResetExecuted { matchup },
                    (_, None) => ArmOutcome::Deleted { matchup_id, mode },
                };
                Ok((write, outcome))
            },
        )
        .await?;

        match &outcome {
            ArmOutcome::Armed { matchup, .. } => {
                tracing::info!("{:?} armed on matchup {} by {}", action, matchup.id, input.user_id)
            }
            ArmOutcome::ResetExecuted { matchup } => {
                tracing::info!("Matchup {} reset by {}", matchup.id, input.user_id)
            }
            ArmOutcome::Deleted { matchup_id, .. } => {
                tracing::info!("Matchup {} deleted by {}", matchup_id, input.user_id)
            }
        }

        Ok(ArmOrConfirmOutput { action, outcome })
    }
}
