pub mod login_user;
pub mod register_user;

pub use login_user::*;
pub use register_user::*;
