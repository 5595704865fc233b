//! Credential models: redacted token secrets, stored values with cookie-style expiry, and the
//! user profile kept alongside them.

pub mod token;
pub mod user;

pub use token::{record::*, secret::*};
pub use user::*;
