pub mod matchup_rules;
pub mod timing;
