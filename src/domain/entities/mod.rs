mod group;
mod matchup;
mod user;

pub use group::*;
pub use matchup::*;
pub use user::*;
