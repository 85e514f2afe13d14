//! In-process API double shared by the coordinator integration tests.

#![allow(dead_code)]

// std
use std::{
	io::Error as IoError,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Barrier;
// self
use token_coordinator::{
	TokenCoordinator,
	auth::{CredentialState, TokenPair},
	config::{CoordinatorConfig, CoordinatorConfigBuilder},
	error::TransportError,
	http::{ApiRequest, ApiResponse, ApiTransport, TransportFuture},
	url::Url,
};

pub const REFRESH_PATH: &str = "/auth/refresh";

/// Reply produced by the fake refresh endpoint.
#[derive(Clone, Debug)]
pub enum RefreshReply {
	/// Rotates to the provided pair and reports it as `{ accessToken, refreshToken }`.
	Rotate { access: String, refresh: String },
	/// Returns a raw body with status 200 without rotating anything.
	Body(String),
	/// Returns an empty body with the provided status.
	Status(u16),
}
impl RefreshReply {
	pub fn rotate(access: &str, refresh: &str) -> Self {
		Self::Rotate { access: access.into(), refresh: refresh.into() }
	}
}

#[derive(Debug)]
struct FakeState {
	valid_access: String,
	reply: RefreshReply,
	refresh_delay: StdDuration,
	refresh_requests: Vec<ApiRequest>,
	api_requests: Vec<ApiRequest>,
}

/// Resource server plus refresh endpoint living behind [`ApiTransport`].
///
/// - `/auth/refresh` answers with the scripted [`RefreshReply`] after `refresh_delay`.
/// - `/boom` always answers 500.
/// - `/offline` always fails at the transport level.
/// - Every other path answers 200 when `authorization` carries the valid access token and 401
///   otherwise.
#[derive(Debug)]
pub struct FakeApi {
	state: Mutex<FakeState>,
	refresh_calls: AtomicUsize,
	rejection_barrier: Option<Barrier>,
}
impl FakeApi {
	pub fn new(valid_access: &str, reply: RefreshReply) -> Self {
		Self {
			state: Mutex::new(FakeState {
				valid_access: valid_access.into(),
				reply,
				refresh_delay: StdDuration::from_millis(50),
				refresh_requests: Vec::new(),
				api_requests: Vec::new(),
			}),
			refresh_calls: AtomicUsize::new(0),
			rejection_barrier: None,
		}
	}

	/// Holds every 401 until `callers` rejected requests have arrived.
	pub fn with_rejection_barrier(mut self, callers: usize) -> Self {
		self.rejection_barrier = Some(Barrier::new(callers));

		self
	}

	pub fn with_refresh_delay(self, delay: StdDuration) -> Self {
		self.state.lock().refresh_delay = delay;

		self
	}

	pub fn refresh_calls(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	pub fn refresh_requests(&self) -> Vec<ApiRequest> {
		self.state.lock().refresh_requests.clone()
	}

	/// Authorization header values seen by ordinary endpoints, in arrival order.
	pub fn api_authorizations(&self) -> Vec<Option<String>> {
		self.state
			.lock()
			.api_requests
			.iter()
			.map(|request| request.header_value("authorization").map(str::to_owned))
			.collect()
	}

	pub fn set_valid_access(&self, access: &str) {
		self.state.lock().valid_access = access.into();
	}

	async fn respond(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
		let path = request.url.path().to_owned();

		match path.as_str() {
			REFRESH_PATH => self.respond_refresh(request).await,
			"/offline" => Err(TransportError::network(&request.url, IoError::other("offline"))),
			"/boom" => {
				self.state.lock().api_requests.push(request);

				Ok(ApiResponse::new(500, "upstream exploded"))
			},
			_ => {
				let authorized = {
					let mut state = self.state.lock();
					let expected = format!("Bearer {}", state.valid_access);
					let authorized =
						request.header_value("authorization") == Some(expected.as_str());

					state.api_requests.push(request);

					authorized
				};

				if authorized {
					return Ok(ApiResponse::new(200, r#"{"ok":true}"#));
				}
				if let Some(barrier) = &self.rejection_barrier {
					barrier.wait().await;
				}

				Ok(ApiResponse::new(401, r#"{"error":"token_expired"}"#))
			},
		}
	}

	async fn respond_refresh(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
		self.refresh_calls.fetch_add(1, Ordering::SeqCst);

		let delay = {
			let mut state = self.state.lock();

			state.refresh_requests.push(request);

			state.refresh_delay
		};

		tokio::time::sleep(delay).await;

		let mut state = self.state.lock();

		Ok(match state.reply.clone() {
			RefreshReply::Rotate { access, refresh } => {
				let body = serde_json::json!({ "accessToken": access, "refreshToken": refresh });

				state.valid_access = access;

				ApiResponse::new(200, body.to_string())
			},
			RefreshReply::Body(body) => ApiResponse::new(200, body),
			RefreshReply::Status(status) => ApiResponse::new(status, Vec::new()),
		})
	}
}
impl ApiTransport for FakeApi {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(self.respond(request))
	}
}

pub fn base_url() -> Url {
	Url::parse("http://127.0.0.1:9").expect("Fake API base URL should parse.")
}

pub fn api_url(path: &str) -> Url {
	base_url().join(path).expect("Fake API URL should join.")
}

pub fn config_builder() -> CoordinatorConfigBuilder {
	CoordinatorConfig::builder(api_url(REFRESH_PATH))
}

pub fn config() -> CoordinatorConfig {
	config_builder().build().expect("Fake API configuration should be valid.")
}

pub fn credentials(access: &str, refresh: &str) -> CredentialState {
	TokenPair::new(access, refresh).into()
}

pub fn coordinator(
	api: &Arc<FakeApi>,
	config: CoordinatorConfig,
	credentials: CredentialState,
) -> TokenCoordinator<FakeApi> {
	TokenCoordinator::<FakeApi>::builder(config, api.clone()).credentials(credentials).build()
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
	for _ in 0..400 {
		if condition() {
			return;
		}

		tokio::time::sleep(StdDuration::from_millis(5)).await;
	}

	panic!("Condition should hold within two seconds.");
}
