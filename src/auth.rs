//! Credential models: redacted secrets, token pairs, and the coordinator-owned state.

pub mod token;

pub use token::{claims::*, credential::*, pair::*, secret::*};
