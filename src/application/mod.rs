pub mod auth;
pub mod feed;
pub mod group;
pub mod matchup;
