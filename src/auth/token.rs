//! Token-level building blocks.

pub mod claims;
pub mod credential;
pub mod pair;
pub mod secret;
