//! Token secrets and the stored credential record.

pub mod record;
pub mod secret;
