use std::sync::Arc;

use crate::application::matchup::access::{load_matchup, require_editor};
use crate::application::matchup::MatchupError;
use crate::domain::entities::{Matchup, MATCHUPS};
use crate::domain::repositories::{run_transaction, DocumentStore};
use crate::domain::services::matchup_rules;
use crate::domain::value_objects::ScoreSide;

/// Increment score input
pub struct IncrementScoreInput {
    pub matchup_id: String,
    pub user_id: String,
    pub side: String, // "a" or "b"
}

/// Increment score output
#[derive(Debug)]
pub struct IncrementScoreOutput {
    pub matchup: Matchup,
    pub side: ScoreSide,
}

/// Increment score use case
pub struct IncrementScore<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> IncrementScore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        input: IncrementScoreInput,
    ) -> Result<IncrementScoreOutput, MatchupError> {
        let side = ScoreSide::from_str(input.side.trim()).ok_or_else(|| {
            MatchupError::InvalidArgument(format!("Unknown side '{}'", input.side))
        })?;

        // Group membership is checked up front; the cooldown itself is
        // re-checked against fresh state inside the transaction
        let matchup = load_matchup(&*self.store, &input.matchup_id).await?;
        require_editor(&*self.store, &matchup.group_id, &input.user_id).await?;

        let updated = run_transaction::<_, _, MatchupError, _>(
            &*self.store,
            MATCHUPS,
            &input.matchup_id,
            |document, now| {
                let document = document.ok_or(MatchupError::NotFound("Matchup"))?;
                let current = Matchup::from_document(document)?;
                let transition = matchup_rules::increment_score(&current, side, now)?;
                Ok((transition.to_write(), transition.apply(current)))
            },
        )
        .await?
        .ok_or(MatchupError::NotFound("Matchup"))?;

        tracing::info!(
            "Score added to side {} of matchup {} by {} ({}:{})",
            side.as_str(),
            updated.id,
            input.user_id,
            updated.score_a,
            updated.score_b
        );

        Ok(IncrementScoreOutput {
            matchup: updated,
            side,
        })
    }
}
