use std::sync::Arc;

use crate::application::matchup::access::load_group_role;
use crate::application::matchup::MatchupError;
use crate::domain::entities::{sort_newest_first, Matchup, MATCHUPS};
use crate::domain::repositories::{Direction, DocumentStore, Query};

/// List matchups input
pub struct ListMatchupsInput {
    pub group_id: String,
    pub user_id: String,
    pub search: Option<String>,
}

/// List matchups output
pub struct ListMatchupsOutput {
    pub matchups: Vec<Matchup>,
    /// Matchups in the group before the search filter
    pub total: usize,
}

/// Query for every matchup of a group, newest first
pub fn group_matchups_query(group_id: &str) -> Query {
    Query::new()
        .where_eq("groupId", group_id)
        .order_by("createdAt", Direction::Descending)
}

/// List matchups use case
pub struct ListMatchups<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> ListMatchups<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        input: ListMatchupsInput,
    ) -> Result<ListMatchupsOutput, MatchupError> {
        // Any role may read
        load_group_role(&*self.store, &input.group_id, &input.user_id).await?;

        let documents = self
            .store
            .query(MATCHUPS, &group_matchups_query(&input.group_id))
            .await?;

        let mut matchups = documents
            .iter()
            .map(Matchup::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        sort_newest_first(&mut matchups);
        let total = matchups.len();

        if let Some(search) = input.search.as_deref() {
            matchups.retain(|m| m.matches_search(search));
        }

        Ok(ListMatchupsOutput { matchups, total })
    }
}
