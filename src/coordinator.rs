//! Request-coalescing refresh coordinator.
//!
//! [`TokenCoordinator::execute`] dispatches requests with the current access credential. When a
//! response is classified as an expiry, callers elect a single refresher: the first caller whose
//! dispatch saw the current credential generation starts the refresh run, every other caller
//! suspends on the same release gate, and all of them re-dispatch exactly once with whatever
//! credentials the run installed.

mod builder;
mod election;
mod refresh;
mod stats;

pub use builder::*;
pub use stats::CoordinatorMetrics;

// crates.io
use tokio::{runtime::Handle, sync::broadcast};
// self
use crate::{
	_prelude::*,
	auth::{CredentialState, TokenPair},
	classify::ResponseClass,
	config::CoordinatorConfig,
	error::{ConfigError, RefreshFailure},
	http::{ApiRequest, ApiResponse, ApiTransport, AuthRequirement},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::SessionEvent,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use election::{Admission, Election, Gate, Persist, Shared, Snapshot};

/// Coordinator backed by the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestCoordinator = TokenCoordinator<ReqwestTransport>;

/// Serializes credential refreshes across every request issued through it.
///
/// Cloning is cheap; clones share credentials, the refresh slot, and session events.
///
/// Refresh runs are spawned onto the ambient tokio runtime, so [`TokenCoordinator::execute`] and
/// [`TokenCoordinator::refresh_now`] fail with [`ConfigError::MissingRuntime`] when a refresh is
/// needed outside one. A configured wait timeout also needs the runtime's time driver.
pub struct TokenCoordinator<T>
where
	T: ?Sized + ApiTransport,
{
	shared: Arc<Shared<T>>,
}
#[cfg(feature = "reqwest")]
impl TokenCoordinator<ReqwestTransport> {
	/// Creates a coordinator using a default [`ReqwestTransport`] and no seeded credentials.
	pub fn new(config: CoordinatorConfig) -> Self {
		CoordinatorBuilder::new(config, ReqwestTransport::default()).build()
	}
}
impl<T> TokenCoordinator<T>
where
	T: ?Sized + ApiTransport,
{
	/// Starts a builder over a custom transport.
	pub fn builder(config: CoordinatorConfig, transport: impl Into<Arc<T>>) -> CoordinatorBuilder<T> {
		CoordinatorBuilder::new(config, transport)
	}

	/// Creates a coordinator seeded from `store`, which then mirrors every credential mutation.
	pub async fn restore(
		config: CoordinatorConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
	) -> Result<Self> {
		CoordinatorBuilder::new(config, transport).store(store).restore().await
	}

	/// Executes `request`, refreshing credentials at most once on an expiry signal.
	///
	/// Non-expiry responses, including HTTP error statuses, are returned unchanged. Transport
	/// failures surface as [`Error::Transport`] and never start a refresh.
	pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		let span = FlowSpan::new(FlowKind::Execute, "execute");

		obs::record_flow_outcome(FlowKind::Execute, FlowOutcome::Attempt);

		let result = span.instrument(self.execute_inner(request)).await;

		obs::record_flow_outcome(
			FlowKind::Execute,
			if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure },
		);

		result
	}

	/// Returns a snapshot of the current credentials.
	pub fn credentials(&self) -> CredentialState {
		self.shared.snapshot().credentials
	}

	/// Returns the current credential generation.
	pub fn generation(&self) -> u64 {
		self.shared.snapshot().generation
	}

	/// Subscribes to session events published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.shared.events.subscribe()
	}

	/// Installs credentials obtained outside the refresh flow, e.g. after a login.
	///
	/// An in-flight refresh that started before this call discards its result.
	pub async fn sign_in(&self, pair: TokenPair) -> Result<()> {
		let persist = self.shared.install(pair);

		self.persist(persist).await
	}

	/// Clears credentials and emits [`SessionEvent::SessionTerminated`] with
	/// [`RefreshFailure::SignedOut`].
	pub async fn sign_out(&self) -> Result<()> {
		let persist = self.shared.terminate(RefreshFailure::SignedOut);

		self.persist(persist).await
	}

	/// Forces a refresh, joining any run already in flight.
	pub async fn refresh_now(&self) -> Result<()> {
		let seen = self.shared.snapshot().generation;

		self.refresh_after(seen).await
	}

	/// Returns `true` while a refresh run holds the slot.
	pub fn is_refreshing(&self) -> bool {
		self.shared.in_flight().is_some()
	}

	/// Returns the in-process refresh counters.
	pub fn metrics(&self) -> &CoordinatorMetrics {
		&self.shared.metrics
	}

	async fn execute_inner(&self, request: ApiRequest) -> Result<ApiResponse> {
		if request.auth == AuthRequirement::Anonymous {
			return Ok(self.shared.transport.send(request).await?);
		}

		let mut snapshot = self.admitted().await?;
		let mut refreshed = false;

		if self.should_refresh_preemptively(&snapshot) {
			self.refresh_after(snapshot.generation).await?;

			snapshot = self.admitted().await?;
			refreshed = true;
		}

		let response = self.dispatch(request.clone(), &snapshot).await?;

		if self.classify(&response) != ResponseClass::Expired {
			return Ok(response);
		}
		if refreshed {
			return Err(rejected(response.status));
		}

		self.refresh_after(snapshot.generation).await?;
		self.shared.metrics.record_retry();

		let retry_snapshot = self.admitted().await?;
		let response = self.dispatch(request, &retry_snapshot).await?;

		match self.classify(&response) {
			ResponseClass::Expired => Err(rejected(response.status)),
			_ => Ok(response),
		}
	}

	/// Waits out in-flight refreshes until credentials can be read with the slot free.
	async fn admitted(&self) -> Result<Snapshot> {
		loop {
			match self.shared.admit() {
				Admission::Ready(snapshot) => return Ok(snapshot),
				Admission::Wait(gate) => self.join(gate).await?,
			}
		}
	}

	fn should_refresh_preemptively(&self, snapshot: &Snapshot) -> bool {
		let config = &self.shared.config;
		// The margin never exceeds half of a pair's issued lifetime.
		let skew = match (snapshot.installed_at, snapshot.credentials.expires_at) {
			(Some(installed_at), Some(expires_at)) => {
				config.expiry_skew.min((expires_at - installed_at) / 2)
			},
			_ => config.expiry_skew,
		};

		config.preemptive_refresh
			&& snapshot.credentials.can_refresh()
			&& snapshot.credentials.is_expired_at(OffsetDateTime::now_utc(), skew)
	}

	fn classify(&self, response: &ApiResponse) -> ResponseClass {
		let class = self.shared.classifier.classify(response);

		obs::response_classified(response.status, class);

		class
	}

	async fn dispatch(&self, mut request: ApiRequest, snapshot: &Snapshot) -> Result<ApiResponse> {
		let header = &self.shared.config.access_header;

		match &snapshot.credentials.access_token {
			Some(token) => request.set_header(&header.name, token.header_value(&header.scheme)),
			None => {
				request.remove_header(&header.name);
			},
		}

		Ok(self.shared.transport.send(request).await?)
	}

	/// Runs the refresh election for a caller whose dispatch used generation `seen`.
	///
	/// The run is spawned onto the ambient runtime so no caller can cancel it.
	async fn refresh_after(&self, seen: u64) -> Result<()> {
		let runtime = runtime()?;

		match self.shared.elect(seen) {
			Election::Leader(gate) => {
				runtime.spawn(refresh::run(self.shared.clone(), gate.clone(), seen));

				self.wait_on(gate).await
			},
			Election::Follower(gate) => self.join(gate).await,
			Election::Settled(outcome) => Ok(outcome?),
		}
	}

	async fn join(&self, gate: Gate) -> Result<()> {
		self.shared.metrics.record_coalesced();
		obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Coalesced);

		self.wait_on(gate).await
	}

	async fn wait_on(&self, gate: Gate) -> Result<()> {
		let outcome = match self.shared.config.wait_timeout {
			Some(limit) => {
				runtime()?;

				match tokio::time::timeout(limit.unsigned_abs(), gate.wait()).await {
					Ok(outcome) => outcome.clone(),
					Err(_) => {
						obs::wait_timed_out(limit);

						return Err(Error::RefreshWaitTimeout { waited: limit });
					},
				}
			},
			None => gate.wait().await.clone(),
		};

		Ok(outcome?)
	}

	async fn persist(&self, persist: Persist) -> Result<()> {
		let Some(store) = &self.shared.store else {
			return Ok(());
		};

		match persist {
			Persist::Save(state) => store.save(state).await?,
			Persist::Clear => store.clear().await?,
			Persist::Skip => (),
		}

		Ok(())
	}
}
impl<T> Clone for TokenCoordinator<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self { shared: self.shared.clone() }
	}
}
impl<T> Debug for TokenCoordinator<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let snapshot = self.shared.snapshot();

		f.debug_struct("TokenCoordinator")
			.field("config", &self.shared.config)
			.field("credentials", &snapshot.credentials)
			.field("generation", &snapshot.generation)
			.field("refreshing", &self.is_refreshing())
			.finish()
	}
}

fn runtime() -> Result<Handle, ConfigError> {
	Handle::try_current().map_err(|_| ConfigError::MissingRuntime)
}

fn rejected(status: u16) -> Error {
	obs::retry_rejected(status);

	Error::CredentialRejected { status }
}
