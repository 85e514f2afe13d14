//! Best-effort reader for the `exp` claim of JWT access tokens.
//!
//! The signature is never checked; the value only seeds the local expiry used for preemptive
//! refreshes, and the server stays the authority on validity.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

#[derive(Deserialize)]
struct ExpiryClaim {
	exp: Option<i64>,
}

/// Returns the `exp` claim of a compact JWT, or `None` for opaque tokens.
pub fn jwt_expiry(token: &str) -> Option<OffsetDateTime> {
	let mut segments = token.split('.');
	let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);

	if segments.next().is_some() {
		return None;
	}

	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
	let claim = serde_json::from_slice::<ExpiryClaim>(&bytes).ok()?;

	OffsetDateTime::from_unix_timestamp(claim.exp?).ok()
}
