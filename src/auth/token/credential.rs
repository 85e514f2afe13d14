//! Credential state owned by the coordinator.

// self
use crate::{
	_prelude::*,
	auth::token::{pair::TokenPair, secret::TokenSecret},
};

/// Access/refresh credentials plus the access credential's expiry, any of which may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialState {
	/// Credential attached to ordinary requests.
	pub access_token: Option<TokenSecret>,
	/// Credential reserved for the refresh endpoint.
	pub refresh_token: Option<TokenSecret>,
	/// Expiry of the access credential, when known.
	pub expires_at: Option<OffsetDateTime>,
}
impl CredentialState {
	/// Returns `true` when neither credential is held.
	pub fn is_empty(&self) -> bool {
		self.access_token.is_none() && self.refresh_token.is_none()
	}

	/// Returns `true` when a refresh call can be attempted.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.is_some()
	}

	/// Returns `true` when the access credential is locally known to be unusable at `now`.
	///
	/// A missing access credential counts as expired; an unknown expiry does not. A skew that
	/// pushes `now` past the representable range counts as expired.
	pub fn is_expired_at(&self, now: OffsetDateTime, skew: Duration) -> bool {
		if self.access_token.is_none() {
			return true;
		}

		self.expires_at.is_some_and(|expires_at| {
			now.checked_add(skew).is_none_or(|deadline| deadline >= expires_at)
		})
	}

	/// Replaces every field with the freshly issued pair.
	pub fn apply(&mut self, pair: TokenPair) {
		self.access_token = Some(pair.access_token);
		self.refresh_token = Some(pair.refresh_token);
		self.expires_at = pair.expires_at;
	}

	/// Drops both credentials and the expiry.
	pub fn clear(&mut self) {
		*self = Self::default();
	}
}
impl From<TokenPair> for CredentialState {
	fn from(pair: TokenPair) -> Self {
		let mut state = Self::default();

		state.apply(pair);

		state
	}
}
