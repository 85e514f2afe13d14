//! Redacting wrapper for access and refresh credentials.

// self
use crate::_prelude::*;

/// Token material that never reaches logs through `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Renders an authorization header value such as `Bearer <token>`.
	///
	/// An empty scheme yields the raw token.
	pub fn header_value(&self, scheme: &str) -> String {
		if scheme.is_empty() { self.0.clone() } else { format!("{scheme} {}", self.0) }
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn header_value_applies_scheme() {
		let secret = TokenSecret::new("A1");

		assert_eq!(secret.header_value("Bearer"), "Bearer A1");
		assert_eq!(secret.header_value(""), "A1");
	}
}
