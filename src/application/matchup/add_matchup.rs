use std::sync::Arc;

use crate::application::matchup::access::require_editor;
use crate::application::matchup::MatchupError;
use crate::domain::entities::{Matchup, Participant, User, MATCHUPS, USERS};
use crate::domain::repositories::DocumentStore;

/// Add matchup input
pub struct AddMatchupInput {
    pub group_id: String,
    pub user_id: String,
    pub mode: String,
    pub player_a: String,
    pub player_b: String,
}

/// Add matchup output
pub struct AddMatchupOutput {
    pub matchup: Matchup,
}

/// Add matchup use case
pub struct AddMatchup<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> AddMatchup<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, input: AddMatchupInput) -> Result<AddMatchupOutput, MatchupError> {
        let player_a = input.player_a.trim();
        let player_b = input.player_b.trim();
        let mode = input.mode.trim();

        if player_a.is_empty() || player_b.is_empty() {
            return Err(MatchupError::InvalidArgument(
                "Pick both players".to_string(),
            ));
        }
        if player_a == player_b {
            return Err(MatchupError::InvalidArgument(
                "Players must be different".to_string(),
            ));
        }

        let group = require_editor(&*self.store, &input.group_id, &input.user_id).await?;

        if !group.has_mode(mode) {
            return Err(MatchupError::InvalidArgument(format!(
                "Unknown mode '{}'",
                mode
            )));
        }
        for uid in [player_a, player_b] {
            if !group.is_member(uid) {
                return Err(MatchupError::InvalidArgument(format!(
                    "Player {} is not a member of this group",
                    uid
                )));
            }
        }

        let a = Participant {
            uid: player_a.to_string(),
            name: self.display_name(player_a, "Player A").await?,
        };
        let b = Participant {
            uid: player_b.to_string(),
            name: self.display_name(player_b, "Player B").await?,
        };

        let mut matchup = Matchup::new(
            group.id.clone(),
            a,
            b,
            mode.to_string(),
            input.user_id.clone(),
            self.store.now(),
        );
        matchup.id = self.store.add(MATCHUPS, matchup.to_fields()?).await?;

        tracing::info!(
            "Matchup {} created in group {} by {}: {} vs {} ({})",
            matchup.id,
            group.id,
            input.user_id,
            matchup.player_a.name,
            matchup.player_b.name,
            matchup.mode
        );

        Ok(AddMatchupOutput { matchup })
    }

    async fn display_name(&self, uid: &str, fallback: &str) -> Result<String, MatchupError> {
        let name = match self.store.get(USERS, uid).await? {
            Some(document) => User::from_document(&document)?.label(),
            None => String::new(),
        };
        if name.trim().is_empty() {
            Ok(fallback.to_string())
        } else {
            Ok(name)
        }
    }
}
