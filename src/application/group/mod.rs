mod create_group;
mod get_group_details;
mod manage_members;

pub use create_group::*;
pub use get_group_details::*;
pub use manage_members::*;
