//! Response classification hooks.
//!
//! The coordinator never inspects status codes itself; every response passes through an
//! [`ExpiryClassifier`] so APIs that signal expiry with a 403 plus an error code, or with a
//! vendor status such as 419/498, can be supported without touching the refresh logic.

// self
use crate::{_prelude::*, http::ApiResponse};

/// Classification of a response as seen by the refresh logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseClass {
	/// 2xx response carrying a payload.
	Success,
	/// The access (or refresh) credential is no longer valid.
	Expired,
	/// Any other response; returned to the caller unchanged.
	Failure,
}
impl ResponseClass {
	/// Returns the stable label recorded on `response classified` events.
	pub const fn as_str(self) -> &'static str {
		match self {
			ResponseClass::Success => "success",
			ResponseClass::Expired => "expired",
			ResponseClass::Failure => "failure",
		}
	}
}

/// Strategy hook deciding which responses signal authentication expiry.
pub trait ExpiryClassifier: Send + Sync {
	/// Classifies a response returned by the transport.
	fn classify(&self, response: &ApiResponse) -> ResponseClass;
}

/// Status- and error-code-driven classifier.
///
/// A response is [`ResponseClass::Expired`] when its status is listed in `statuses`, or when
/// its JSON body carries an `error` or `code` string listed in `error_codes`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefaultExpiryClassifier {
	/// Statuses that always mean expiry.
	pub statuses: Vec<u16>,
	/// Body error codes that mean expiry regardless of status.
	pub error_codes: Vec<String>,
}
impl DefaultExpiryClassifier {
	/// Adds a status that signals expiry.
	pub fn with_status(mut self, status: u16) -> Self {
		if !self.statuses.contains(&status) {
			self.statuses.push(status);
		}

		self
	}

	/// Adds a body error code that signals expiry.
	pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
		self.error_codes.push(code.into());

		self
	}

	fn body_code_matches(&self, response: &ApiResponse) -> bool {
		if self.error_codes.is_empty() || response.is_success() {
			return false;
		}

		let Ok(value) = serde_json::from_slice::<serde_json::Value>(&response.body) else {
			return false;
		};

		["error", "code"].iter().filter_map(|key| value.get(key)?.as_str()).any(|code| {
			self.error_codes.iter().any(|expected| expected.eq_ignore_ascii_case(code))
		})
	}
}
impl Default for DefaultExpiryClassifier {
	fn default() -> Self {
		Self { statuses: vec![401], error_codes: Vec::new() }
	}
}
impl ExpiryClassifier for DefaultExpiryClassifier {
	fn classify(&self, response: &ApiResponse) -> ResponseClass {
		if self.statuses.contains(&response.status) || self.body_code_matches(response) {
			ResponseClass::Expired
		} else if response.is_success() {
			ResponseClass::Success
		} else {
			ResponseClass::Failure
		}
	}
}
