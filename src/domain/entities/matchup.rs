use serde::{Deserialize, Serialize};

use crate::domain::repositories::{Document, Fields, RepositoryError};
use crate::domain::services::timing::{arm_remaining, score_cooldown_remaining};
use crate::domain::value_objects::{ArmedAction, ScoreSide};

/// Collection holding matchup documents
pub const MATCHUPS: &str = "matchups";

/// One side of a matchup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub uid: String,
    pub name: String,
}

/// Matchup entity - a head-to-head score between two group members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    /// Document id, not stored in the body
    #[serde(skip)]
    pub id: String,
    pub group_id: String,
    pub player_a: Participant,
    pub player_b: Participant,
    pub mode: String,
    #[serde(default)]
    pub score_a: u32,
    #[serde(default)]
    pub score_b: u32,
    pub created_at: i64,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub last_score_at: Option<i64>,
    #[serde(default)]
    pub reset_armed_at: Option<i64>,
    #[serde(default)]
    pub delete_armed_at: Option<i64>,
}

impl Matchup {
    /// Create a fresh matchup with zeroed scores and no pending actions
    pub fn new(
        group_id: String,
        player_a: Participant,
        player_b: Participant,
        mode: String,
        created_by: String,
        created_at: i64,
    ) -> Self {
        Self {
            id: String::new(),
            group_id,
            player_a,
            player_b,
            mode,
            score_a: 0,
            score_b: 0,
            created_at,
            created_by,
            last_score_at: None,
            reset_armed_at: None,
            delete_armed_at: None,
        }
    }

    pub fn from_document(document: &Document) -> Result<Self, RepositoryError> {
        let mut matchup: Matchup = document.decode()?;
        matchup.id = document.id.clone();
        Ok(matchup)
    }

    pub fn to_fields(&self) -> Result<Fields, RepositoryError> {
        crate::domain::repositories::to_fields(self)
    }

    pub fn score(&self, side: ScoreSide) -> u32 {
        match side {
            ScoreSide::A => self.score_a,
            ScoreSide::B => self.score_b,
        }
    }

    pub fn has_scored(&self) -> bool {
        self.last_score_at.is_some()
    }

    pub fn cooldown_remaining(&self, now: i64) -> i64 {
        score_cooldown_remaining(self.last_score_at, now)
    }

    pub fn armed_at(&self, action: ArmedAction) -> Option<i64> {
        match action {
            ArmedAction::Reset => self.reset_armed_at,
            ArmedAction::Delete => self.delete_armed_at,
        }
    }

    pub fn is_armed(&self, action: ArmedAction) -> bool {
        self.armed_at(action).is_some()
    }

    pub fn arm_remaining(&self, action: ArmedAction, now: i64) -> i64 {
        arm_remaining(self.armed_at(action), now)
    }

    /// Case-insensitive match over player names and mode
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self.player_a.name.to_lowercase().contains(&needle)
            || self.player_b.name.to_lowercase().contains(&needle)
            || self.mode.to_lowercase().contains(&needle)
    }
}

/// Newest first, id as a stable tie-break
pub fn sort_newest_first(matchups: &mut [Matchup]) {
    matchups.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(uid: &str, name: &str) -> Participant {
        Participant {
            uid: uid.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_document_round_trip_keeps_id_out_of_body() {
        let mut matchup = Matchup::new(
            "g1".into(),
            participant("u1", "Alice"),
            participant("u2", "Bob"),
            "7x".into(),
            "u1".into(),
            1_000,
        );
        let fields = matchup.to_fields().unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["groupId"], "g1");
        assert_eq!(fields["playerA"]["name"], "Alice");
        assert!(fields["lastScoreAt"].is_null());

        let document = Document::new("m1", fields);
        matchup.id = "m1".into();
        assert_eq!(Matchup::from_document(&document).unwrap(), matchup);
    }

    #[test]
    fn test_missing_optional_fields_decode_as_unset() {
        let document = Document::new(
            "m2",
            serde_json::json!({
                "groupId": "g1",
                "playerA": { "uid": "u1", "name": "Alice" },
                "playerB": { "uid": "u2", "name": "Bob" },
                "mode": "Mega Draft",
                "createdAt": 5
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        let matchup = Matchup::from_document(&document).unwrap();
        assert_eq!(matchup.score_a, 0);
        assert!(!matchup.has_scored());
        assert!(!matchup.is_armed(ArmedAction::Reset));
        assert!(!matchup.is_armed(ArmedAction::Delete));
    }

    #[test]
    fn test_search_and_ordering() {
        let mut older = Matchup::new(
            "g".into(),
            participant("u1", "Alice"),
            participant("u2", "Bob"),
            "Triple Draft".into(),
            "u1".into(),
            10,
        );
        older.id = "old".into();
        let mut newer = older.clone();
        newer.id = "new".into();
        newer.created_at = 20;

        assert!(older.matches_search("ali"));
        assert!(older.matches_search("TRIPLE"));
        assert!(older.matches_search("  "));
        assert!(!older.matches_search("carol"));

        let mut list = vec![older, newer];
        sort_newest_first(&mut list);
        assert_eq!(list[0].id, "new");
    }
}
