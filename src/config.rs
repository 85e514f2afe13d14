//! Coordinator configuration (data) and its validating builder.
//!
//! `CoordinatorConfig` describes where the refresh endpoint lives, how credentials are
//! attached to outgoing requests, and the timing knobs used by the refresh election
//! (expiry skew for preemptive refreshes and the optional waiter bound).

/// Builder API for assembling coordinator configuration.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, http::HttpMethod};

/// Where the refresh credential travels on the refresh call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RefreshCredentialPlacement {
	/// Replaces the normal authorization header value.
	Header {
		/// Header name, e.g. `authorization`.
		name: String,
		/// Scheme prefix, e.g. `Bearer`; empty for the raw token.
		scheme: String,
	},
	/// Sent as a JSON object body `{ "<field>": "<refresh token>" }`.
	JsonBody {
		/// Field carrying the refresh credential.
		field: String,
	},
}
impl Default for RefreshCredentialPlacement {
	fn default() -> Self {
		Self::Header { name: "authorization".into(), scheme: "Bearer".into() }
	}
}

/// How the access credential is attached to ordinary requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredentialHeader {
	/// Header name, e.g. `authorization`.
	pub name: String,
	/// Scheme prefix, e.g. `Bearer`; empty for the raw token.
	pub scheme: String,
}
impl Default for AccessCredentialHeader {
	fn default() -> Self {
		Self { name: "authorization".into(), scheme: "Bearer".into() }
	}
}

/// Immutable, validated configuration consumed by the coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
	/// Fixed refresh target.
	pub refresh_endpoint: Url,
	/// Method used for the refresh call.
	pub refresh_method: HttpMethod,
	/// Placement of the refresh credential on the refresh call.
	pub refresh_placement: RefreshCredentialPlacement,
	/// Placement of the access credential on ordinary requests.
	pub access_header: AccessCredentialHeader,
	/// JSON pointer locating the token pair inside the refresh response.
	pub payload_pointer: Option<String>,
	/// Margin subtracted from the known expiry when deciding to refresh preemptively.
	pub expiry_skew: Duration,
	/// Refresh before dispatch when the local expiry has already passed.
	pub preemptive_refresh: bool,
	/// Upper bound for callers suspended on an in-flight refresh; `None` waits indefinitely.
	pub wait_timeout: Option<Duration>,
}
impl CoordinatorConfig {
	/// Creates a new builder targeting the provided refresh endpoint.
	pub fn builder(refresh_endpoint: Url) -> CoordinatorConfigBuilder {
		CoordinatorConfigBuilder::new(refresh_endpoint)
	}
}
