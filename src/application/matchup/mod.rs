mod access;
mod add_matchup;
mod arm_or_confirm;
mod errors;
mod increment_score;
mod list_matchups;

pub use add_matchup::*;
pub use arm_or_confirm::*;
pub use errors::*;
pub use increment_score::*;
pub use list_matchups::*;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::entities::{Group, User, GROUPS, MATCHUPS, USERS};
    use crate::domain::repositories::DocumentStore;
    use crate::domain::services::timing::{ManualClock, ARM_WINDOW_MS, SCORE_COOLDOWN_MS};
    use crate::domain::value_objects::{ArmedAction, MemberRole};
    use crate::infrastructure::database::InMemoryDocumentStore;

    struct Fixture {
        store: Arc<InMemoryDocumentStore>,
        clock: Arc<ManualClock>,
        group_id: String,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = Arc::new(InMemoryDocumentStore::with_clock(clock.clone()));

        for (uid, name) in [("owner", "Olive"), ("ed", "Eddie"), ("viewer", "")] {
            let user = User::new(uid.into(), name.into(), format!("{}@x.io", uid), "h".into(), 0);
            store.put(USERS, uid, user.to_fields().unwrap()).await.unwrap();
        }

        let mut group = Group::new("Crew".into(), "owner".into(), vec![], 0);
        group.members.insert("ed".into(), MemberRole::Editor);
        group.members.insert("viewer".into(), MemberRole::Viewer);
        let group_id = store.add(GROUPS, group.to_fields().unwrap()).await.unwrap();

        Fixture {
            store,
            clock,
            group_id,
        }
    }

    async fn add(f: &Fixture, caller: &str, a: &str, b: &str) -> Result<AddMatchupOutput, MatchupError> {
        AddMatchup::new(f.store.clone())
            .execute(AddMatchupInput {
                group_id: f.group_id.clone(),
                user_id: caller.into(),
                mode: "7x".into(),
                player_a: a.into(),
                player_b: b.into(),
            })
            .await
    }

    async fn score(f: &Fixture, id: &str, side: &str) -> Result<IncrementScoreOutput, MatchupError> {
        IncrementScore::new(f.store.clone())
            .execute(IncrementScoreInput {
                matchup_id: id.into(),
                user_id: "ed".into(),
                side: side.into(),
            })
            .await
    }

    async fn arm(f: &Fixture, id: &str, action: ArmedAction) -> Result<ArmOrConfirmOutput, MatchupError> {
        ArmOrConfirm::new(f.store.clone())
            .execute(ArmOrConfirmInput {
                matchup_id: id.into(),
                user_id: "owner".into(),
                action,
            })
            .await
    }

    #[tokio::test]
    async fn test_add_matchup_resolves_names_and_server_time() {
        let f = fixture().await;

        let matchup = add(&f, "ed", "owner", "viewer").await.unwrap().matchup;

        assert_eq!(matchup.player_a.name, "Olive");
        assert_eq!(matchup.player_b.name, "viewer@x.io");
        assert_eq!(matchup.created_at, 1_000_000);
        assert_eq!(matchup.created_by, "ed");
        assert_eq!((matchup.score_a, matchup.score_b), (0, 0));
        assert!(f.store.get(MATCHUPS, &matchup.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_matchup_validation() {
        let f = fixture().await;

        assert!(matches!(
            add(&f, "ed", "owner", "owner").await,
            Err(MatchupError::InvalidArgument(_))
        ));
        assert!(matches!(
            add(&f, "ed", "owner", "nobody").await,
            Err(MatchupError::InvalidArgument(_))
        ));
        assert!(matches!(
            add(&f, "viewer", "owner", "ed").await,
            Err(MatchupError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_score_cooldown_timeline() {
        let f = fixture().await;
        let id = add(&f, "owner", "owner", "ed").await.unwrap().matchup.id;

        let first = score(&f, &id, "a").await.unwrap();
        assert_eq!(first.matchup.score_a, 1);
        assert_eq!(first.matchup.last_score_at, Some(1_000_000));

        f.clock.advance(60_000);
        match score(&f, &id, "b").await {
            Err(MatchupError::CooldownActive { remaining_ms }) => assert_eq!(remaining_ms, 60_000),
            other => panic!("expected cooldown, got {:?}", other.map(|o| o.matchup)),
        }

        f.clock.advance(SCORE_COOLDOWN_MS - 60_000);
        let second = score(&f, &id, "B").await.unwrap();
        assert_eq!((second.matchup.score_a, second.matchup.score_b), (1, 1));
    }

    #[tokio::test]
    async fn test_invalid_side_and_missing_matchup() {
        let f = fixture().await;
        let id = add(&f, "owner", "owner", "ed").await.unwrap().matchup.id;

        assert!(matches!(
            score(&f, &id, "c").await,
            Err(MatchupError::InvalidArgument(_))
        ));
        assert!(matches!(
            score(&f, "missing", "a").await,
            Err(MatchupError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_viewer_cannot_score() {
        let f = fixture().await;
        let id = add(&f, "owner", "owner", "ed").await.unwrap().matchup.id;

        let result = IncrementScore::new(f.store.clone())
            .execute(IncrementScoreInput {
                matchup_id: id.clone(),
                user_id: "viewer".into(),
                side: "a".into(),
            })
            .await;

        assert!(matches!(result, Err(MatchupError::Unauthorized)));
        let stored = f.store.get(MATCHUPS, &id).await.unwrap().unwrap();
        assert_eq!(stored.field("scoreA"), Some(&serde_json::json!(0)));
    }

    #[tokio::test]
    async fn test_reset_arm_wait_execute() {
        let f = fixture().await;
        let id = add(&f, "owner", "owner", "ed").await.unwrap().matchup.id;
        score(&f, &id, "a").await.unwrap();

        let armed = arm(&f, &id, ArmedAction::Reset).await.unwrap();
        match armed.outcome {
            ArmOutcome::Armed { matchup, wait_ms } => {
                assert_eq!(wait_ms, ARM_WINDOW_MS);
                assert_eq!(matchup.reset_armed_at, Some(1_000_000));
                assert_eq!(matchup.score_a, 1);
            }
            other => panic!("expected armed, got {:?}", other),
        }

        f.clock.advance(599_000);
        match arm(&f, &id, ArmedAction::Reset).await {
            Err(MatchupError::ArmPending { action, remaining_ms }) => {
                assert_eq!(action, ArmedAction::Reset);
                assert_eq!(remaining_ms, 1_000);
            }
            other => panic!("expected pending, got {:?}", other.map(|o| o.outcome)),
        }

        f.clock.advance(1_000);
        match arm(&f, &id, ArmedAction::Reset).await.unwrap().outcome {
            ArmOutcome::ResetExecuted { matchup } => {
                assert_eq!((matchup.score_a, matchup.score_b), (0, 0));
                assert_eq!(matchup.last_score_at, None);
                assert_eq!(matchup.reset_armed_at, None);
            }
            other => panic!("expected reset, got {:?}", other),
        }

        // Cooldown cleared by the reset
        assert!(score(&f, &id, "b").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_is_irreversible() {
        let f = fixture().await;
        let id = add(&f, "owner", "owner", "ed").await.unwrap().matchup.id;

        arm(&f, &id, ArmedAction::Delete).await.unwrap();
        f.clock.advance(ARM_WINDOW_MS);
        let output = arm(&f, &id, ArmedAction::Delete).await.unwrap();
        assert!(matches!(output.outcome, ArmOutcome::Deleted { ref mode, .. } if mode == "7x"));

        assert!(f.store.get(MATCHUPS, &id).await.unwrap().is_none());
        assert!(matches!(
            arm(&f, &id, ArmedAction::Delete).await,
            Err(MatchupError::NotFound(_))
        ));
        assert!(matches!(
            score(&f, &id, "a").await,
            Err(MatchupError::NotFound(_))
        ));
    }
}
