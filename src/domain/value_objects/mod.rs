mod matchup_action;
mod member_role;

pub use matchup_action::*;
pub use member_role::*;
