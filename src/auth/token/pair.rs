//! Token pairs and the structural validator applied to refresh-endpoint payloads.

// self
use crate::{
	_prelude::*,
	auth::token::{claims, secret::TokenSecret},
};

/// Reasons a refresh payload fails shape validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PayloadError {
	/// Body is not valid JSON.
	#[error("body is not valid JSON ({message})")]
	NotJson {
		/// Parser message.
		message: String,
	},
	/// The configured JSON pointer does not resolve inside the body.
	#[error("no value at `{pointer}`")]
	MissingPointer {
		/// Pointer that failed to resolve.
		pointer: String,
	},
	/// A field is missing or has the wrong type.
	#[error("invalid shape at `{path}` ({message})")]
	Shape {
		/// Path of the offending value.
		path: String,
		/// Deserializer message.
		message: String,
	},
	/// A token field is empty or contains whitespace.
	#[error("`{field}` is blank or contains whitespace")]
	BlankToken {
		/// Field label.
		field: &'static str,
	},
	/// `expires_in` is not a positive, representable number of seconds.
	#[error("expires_in value {value} is out of range")]
	InvalidExpiresIn {
		/// Raw value returned by the endpoint.
		value: i64,
	},
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshPayload {
	#[serde(alias = "access_token")]
	access_token: String,
	#[serde(alias = "refresh_token")]
	refresh_token: String,
	#[serde(default, alias = "expires_in")]
	expires_in: Option<i64>,
}

/// Access and refresh credentials issued together by the refresh endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Short-lived credential attached to ordinary requests.
	pub access_token: TokenSecret,
	/// Longer-lived credential used only against the refresh endpoint.
	pub refresh_token: TokenSecret,
	/// Expiry of the access credential, when known.
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenPair {
	const MAX_EXPIRES_IN: i64 = 10 * 365 * 24 * 60 * 60;

	/// Creates a pair without expiry metadata.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
			expires_at: None,
		}
	}

	/// Attaches an absolute expiry instant to the access credential.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Validates a refresh-endpoint body and extracts the token pair.
	///
	/// `pointer` selects a nested object (for example `/data`) when the endpoint wraps its
	/// payload. Expiry comes from `expiresIn`/`expires_in` relative to `now`, falling back to
	/// the access token's JWT `exp` claim.
	pub fn from_payload(
		body: &[u8],
		pointer: Option<&str>,
		now: OffsetDateTime,
	) -> Result<Self, PayloadError> {
		let mut value = serde_json::from_slice::<serde_json::Value>(body)
			.map_err(|e| PayloadError::NotJson { message: e.to_string() })?;

		if let Some(pointer) = pointer.filter(|p| !p.is_empty()) {
			value = value
				.pointer_mut(pointer)
				.map(serde_json::Value::take)
				.ok_or_else(|| PayloadError::MissingPointer { pointer: pointer.to_owned() })?;
		}

		let payload = serde_path_to_error::deserialize::<_, RefreshPayload>(value).map_err(|e| {
			PayloadError::Shape { path: e.path().to_string(), message: e.inner().to_string() }
		})?;

		ensure_token(&payload.access_token, "accessToken")?;
		ensure_token(&payload.refresh_token, "refreshToken")?;

		let expires_at = match payload.expires_in {
			Some(value) if value <= 0 || value > Self::MAX_EXPIRES_IN =>
				return Err(PayloadError::InvalidExpiresIn { value }),
			Some(value) => Some(now + Duration::seconds(value)),
			None => claims::jwt_expiry(&payload.access_token),
		};

		Ok(Self {
			access_token: TokenSecret::new(payload.access_token),
			refresh_token: TokenSecret::new(payload.refresh_token),
			expires_at,
		})
	}
}

fn ensure_token(value: &str, field: &'static str) -> Result<(), PayloadError> {
	if value.is_empty() || value.chars().any(char::is_whitespace) {
		Err(PayloadError::BlankToken { field })
	} else {
		Ok(())
	}
}
