pub mod identity;

pub use identity::{AuthenticatedUser, USERNAME_HEADER, USER_ID_HEADER};
