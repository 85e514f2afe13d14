// self
use crate::{
	_prelude::*,
	config::{AccessCredentialHeader, CoordinatorConfig, RefreshCredentialPlacement},
	error::ConfigError,
	http::HttpMethod,
};

/// Builder for [`CoordinatorConfig`] values.
#[derive(Debug)]
pub struct CoordinatorConfigBuilder {
	/// Refresh endpoint being configured.
	pub refresh_endpoint: Url,
	/// Method used for the refresh call.
	pub refresh_method: HttpMethod,
	/// Placement of the refresh credential.
	pub refresh_placement: RefreshCredentialPlacement,
	/// Placement of the access credential.
	pub access_header: AccessCredentialHeader,
	/// Optional JSON pointer for wrapped payloads.
	pub payload_pointer: Option<String>,
	/// Preemptive refresh margin.
	pub expiry_skew: Duration,
	/// Preemptive refresh toggle.
	pub preemptive_refresh: bool,
	/// Optional waiter bound.
	pub wait_timeout: Option<Duration>,
}
impl CoordinatorConfigBuilder {
	const DEFAULT_EXPIRY_SKEW: Duration = Duration::seconds(30);

	/// Creates a new builder seeded with defaults.
	pub fn new(refresh_endpoint: Url) -> Self {
		Self {
			refresh_endpoint,
			refresh_method: HttpMethod::Post,
			refresh_placement: RefreshCredentialPlacement::default(),
			access_header: AccessCredentialHeader::default(),
			payload_pointer: None,
			expiry_skew: Self::DEFAULT_EXPIRY_SKEW,
			preemptive_refresh: true,
			wait_timeout: None,
		}
	}

	/// Overrides the refresh call method (defaults to `POST`).
	pub fn refresh_method(mut self, method: HttpMethod) -> Self {
		self.refresh_method = method;

		self
	}

	/// Overrides where the refresh credential is placed.
	pub fn refresh_placement(mut self, placement: RefreshCredentialPlacement) -> Self {
		self.refresh_placement = placement;

		self
	}

	/// Overrides the header used for the access credential.
	pub fn access_header(mut self, name: impl Into<String>, scheme: impl Into<String>) -> Self {
		self.access_header = AccessCredentialHeader { name: name.into(), scheme: scheme.into() };

		self
	}

	/// Locates the token pair at a JSON pointer such as `/data`.
	pub fn payload_pointer(mut self, pointer: impl Into<String>) -> Self {
		self.payload_pointer = Some(pointer.into());

		self
	}

	/// Overrides the preemptive refresh margin (defaults to 30 seconds).
	pub fn expiry_skew(mut self, skew: Duration) -> Self {
		self.expiry_skew = skew;

		self
	}

	/// Enables or disables refreshing before dispatch when the local expiry has passed.
	pub fn preemptive_refresh(mut self, enabled: bool) -> Self {
		self.preemptive_refresh = enabled;

		self
	}

	/// Bounds how long callers wait on an in-flight refresh.
	pub fn wait_timeout(mut self, timeout: Duration) -> Self {
		self.wait_timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the configuration.
	pub fn build(self) -> Result<CoordinatorConfig, ConfigError> {
		ensure_secure("refresh", &self.refresh_endpoint)?;

		if self.expiry_skew.is_negative() {
			return Err(ConfigError::NegativeExpirySkew);
		}
		if self.wait_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(ConfigError::NonPositiveWaitTimeout);
		}
		if let Some(pointer) =
			self.payload_pointer.as_ref().filter(|p| !p.is_empty() && !p.starts_with('/'))
		{
			return Err(ConfigError::InvalidPayloadPointer { pointer: pointer.clone() });
		}
		if self.access_header.name.trim().is_empty() {
			return Err(ConfigError::EmptyField { field: "access header name" });
		}

		match &self.refresh_placement {
			RefreshCredentialPlacement::Header { name, .. } if name.trim().is_empty() =>
				return Err(ConfigError::EmptyField { field: "refresh header name" }),
			RefreshCredentialPlacement::JsonBody { field } if field.trim().is_empty() =>
				return Err(ConfigError::EmptyField { field: "refresh body field" }),
			_ => {},
		}

		Ok(CoordinatorConfig {
			refresh_endpoint: self.refresh_endpoint,
			refresh_method: self.refresh_method,
			refresh_placement: self.refresh_placement,
			access_header: self.access_header,
			payload_pointer: self.payload_pointer.filter(|pointer| !pointer.is_empty()),
			expiry_skew: self.expiry_skew,
			preemptive_refresh: self.preemptive_refresh,
			wait_timeout: self.wait_timeout,
		})
	}
}

fn ensure_secure(endpoint: &'static str, url: &Url) -> Result<(), ConfigError> {
	let loopback = match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	};

	if url.scheme() == "https" || (url.scheme() == "http" && loopback) {
		Ok(())
	} else {
		Err(ConfigError::InsecureEndpoint { endpoint, url: url.to_string() })
	}
}
