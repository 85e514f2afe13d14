//! Coordinator-level error types shared across refresh, transport, and store layers.

// self
use crate::{_prelude::*, auth::PayloadError};

/// Coordinator-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical coordinator error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); never triggers a refresh.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The refresh sub-protocol failed and the credentials were cleared.
	///
	/// Callers must run a full re-authentication flow before issuing new requests.
	#[error("Session terminated: {0}")]
	SessionTerminated(#[from] RefreshFailure),
	/// The single retry issued after a refresh was still rejected as expired.
	#[error("Access credential was rejected after refresh (HTTP {status}).")]
	CredentialRejected {
		/// Status code of the rejected retry.
		status: u16,
	},
	/// A bounded wait on an in-flight refresh elapsed.
	#[error("Timed out after {waited} waiting for the in-flight refresh.")]
	RefreshWaitTimeout {
		/// Configured wait bound.
		waited: Duration,
	},
}
impl Error {
	/// Returns `true` when the caller has to re-authenticate from scratch.
	pub fn is_session_terminated(&self) -> bool {
		matches!(self, Self::SessionTerminated(_))
	}
}

/// Configuration and validation failures raised by the coordinator.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request could not be converted into the transport's representation.
	#[error("HTTP request is invalid: {message}.")]
	InvalidRequest {
		/// Human-readable reason.
		message: String,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Expiry skew must not be negative.
	#[error("Expiry skew must not be negative.")]
	NegativeExpirySkew,
	/// Waiter timeout must be positive when set.
	#[error("Refresh wait timeout must be positive.")]
	NonPositiveWaitTimeout,
	/// JSON pointer used to locate the refresh payload is malformed.
	#[error("Payload pointer `{pointer}` must be empty or start with `/`.")]
	InvalidPayloadPointer {
		/// Pointer that failed validation.
		pointer: String,
	},
	/// Credential header name or field name is empty.
	#[error("The {field} must not be empty.")]
	EmptyField {
		/// Offending field label.
		field: &'static str,
	},
	/// Refreshes and bounded waits run on tokio; the caller was not inside a runtime.
	#[error("A tokio runtime is required to refresh credentials.")]
	MissingRuntime,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL of the failed request.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.to_string(), source: Box::new(src) }
	}
}

/// Reasons a refresh sub-protocol run ended without new credentials.
///
/// The value is cloned to every suspended caller, so it only carries owned, printable data.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshFailure {
	/// No refresh credential was held when a refresh was required.
	#[error("no refresh token is available")]
	MissingRefreshToken,
	/// The refresh call itself was classified as an authentication-expiry response.
	#[error("the refresh credential was rejected as expired (HTTP {status})")]
	Expired {
		/// Status code returned by the refresh endpoint.
		status: u16,
	},
	/// The refresh endpoint returned a non-success status.
	#[error("the refresh endpoint returned HTTP {status}")]
	Rejected {
		/// Status code returned by the refresh endpoint.
		status: u16,
	},
	/// The refresh endpoint returned a payload that failed shape validation.
	#[error("the refresh response is malformed: {0}")]
	Malformed(#[from] PayloadError),
	/// The refresh call failed at the transport level.
	#[error("the refresh call failed: {message}")]
	Transport {
		/// Rendered transport error chain.
		message: String,
	},
	/// The refresh task was torn down before it could settle.
	#[error("the refresh task was aborted")]
	Aborted,
	/// Credentials were cleared explicitly while the caller was in flight.
	#[error("the session was signed out")]
	SignedOut,
}
impl From<TransportError> for RefreshFailure {
	fn from(e: TransportError) -> Self {
		let mut message = e.to_string();
		let mut source = std::error::Error::source(&e);

		while let Some(inner) = source {
			message.push_str(": ");
			message.push_str(&inner.to_string());

			source = inner.source();
		}

		Self::Transport { message }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::io::Error as IoError;
	// self
	use super::*;

	#[test]
	fn transport_failure_flattens_source_chain() {
		let url = Url::parse("https://api.example.com/auth/refresh")
			.expect("Refresh URL fixture should parse.");
		let transport = TransportError::network(&url, IoError::other("reset"));
		let failure = RefreshFailure::from(transport);

		assert_eq!(
			failure,
			RefreshFailure::Transport {
				message:
					"Network error occurred while calling https://api.example.com/auth/refresh.: reset"
						.into()
			}
		);
	}

	#[test]
	fn session_terminated_is_detected() {
		let err = Error::from(RefreshFailure::MissingRefreshToken);

		assert!(err.is_session_terminated());
		assert_eq!(err.to_string(), "Session terminated: no refresh token is available");
		assert!(!Error::CredentialRejected { status: 401 }.is_session_terminated());
	}
}
