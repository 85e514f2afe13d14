//! Shared coordinator state, single-writer election, and the release gate.
//!
//! All credential reads and writes go through one `parking_lot` mutex guarding the credentials,
//! their generation, and the in-flight gate. The gate is an `async_lock::OnceCell` that the
//! refresher fills exactly once; every suspended caller is woken together when it is set.
//! State is written and the gate is detached inside a single critical section before the cell
//! is filled, so no waiter can observe a half-applied refresh.

// crates.io
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	auth::{CredentialState, TokenPair, TokenSecret},
	classify::ExpiryClassifier,
	config::CoordinatorConfig,
	coordinator::CoordinatorMetrics,
	error::RefreshFailure,
	http::ApiTransport,
	obs::{self, FlowKind, FlowOutcome},
	session::{SessionEvent, SessionEvents},
	store::CredentialStore,
};

/// Result broadcast to every caller suspended on a refresh.
pub(crate) type RefreshOutcome = Result<(), RefreshFailure>;
/// Release gate for one refresh run.
pub(crate) type Gate = Arc<OnceCell<RefreshOutcome>>;

/// Point-in-time copy of the credentials used for a dispatch.
#[derive(Clone, Debug)]
pub(crate) struct Snapshot {
	pub(crate) credentials: CredentialState,
	pub(crate) generation: u64,
	/// When the current pair was installed by this coordinator; `None` for seeded credentials.
	pub(crate) installed_at: Option<OffsetDateTime>,
}

/// Result of trying to claim the refresh slot.
pub(crate) enum Election {
	/// The caller won and must start the refresh run.
	Leader(Gate),
	/// Another caller is refreshing; wait on its gate.
	Follower(Gate),
	/// Credentials already changed since the caller's dispatch.
	Settled(RefreshOutcome),
}

/// Result of asking to dispatch with the current credentials.
pub(crate) enum Admission {
	/// A refresh is running; wait on its gate before reading credentials.
	Wait(Gate),
	/// No refresh is running; dispatch with this snapshot.
	Ready(Snapshot),
}

/// Mirror operation owed to the credential store after a mutation.
#[derive(Debug)]
pub(crate) enum Persist {
	Save(CredentialState),
	Clear,
	Skip,
}

#[derive(Default)]
pub(crate) struct CredentialCell {
	credentials: CredentialState,
	generation: u64,
	installed_at: Option<OffsetDateTime>,
	last_failure: Option<RefreshFailure>,
	in_flight: Option<Gate>,
}
impl CredentialCell {
	pub(crate) fn new(credentials: CredentialState) -> Self {
		Self { credentials, ..Default::default() }
	}

	fn snapshot(&self) -> Snapshot {
		Snapshot {
			credentials: self.credentials.clone(),
			generation: self.generation,
			installed_at: self.installed_at,
		}
	}

	fn outcome(&self) -> RefreshOutcome {
		if self.credentials.access_token.is_some() {
			Ok(())
		} else {
			Err(self.last_failure.clone().unwrap_or(RefreshFailure::SignedOut))
		}
	}

	fn install(&mut self, pair: TokenPair) -> (SessionEvent, Persist) {
		self.credentials.apply(pair.clone());
		self.generation += 1;
		self.installed_at = Some(OffsetDateTime::now_utc());
		self.last_failure = None;

		(
			SessionEvent::CredentialsUpdated { pair, generation: self.generation },
			Persist::Save(self.credentials.clone()),
		)
	}

	fn terminate(&mut self, reason: RefreshFailure) -> (Option<SessionEvent>, Persist) {
		let was_empty = self.credentials.is_empty();

		self.credentials.clear();
		self.generation += 1;
		self.installed_at = None;
		self.last_failure = Some(reason.clone());

		let event = (!was_empty)
			.then(|| SessionEvent::SessionTerminated { reason, generation: self.generation });

		(event, Persist::Clear)
	}
}

/// State shared between coordinator handles and spawned refresh tasks.
pub(crate) struct Shared<T>
where
	T: ?Sized + ApiTransport,
{
	pub(crate) config: CoordinatorConfig,
	pub(crate) classifier: Arc<dyn ExpiryClassifier>,
	pub(crate) store: Option<Arc<dyn CredentialStore>>,
	pub(crate) events: SessionEvents,
	pub(crate) metrics: CoordinatorMetrics,
	pub(crate) cell: Mutex<CredentialCell>,
	pub(crate) transport: Arc<T>,
}
impl<T> Shared<T>
where
	T: ?Sized + ApiTransport,
{
	pub(crate) fn snapshot(&self) -> Snapshot {
		self.cell.lock().snapshot()
	}

	/// Reads the credentials unless a refresh holds the slot, under a single lock.
	pub(crate) fn admit(&self) -> Admission {
		let cell = self.cell.lock();

		match &cell.in_flight {
			Some(gate) => Admission::Wait(gate.clone()),
			None => Admission::Ready(cell.snapshot()),
		}
	}

	pub(crate) fn in_flight(&self) -> Option<Gate> {
		self.cell.lock().in_flight.clone()
	}

	pub(crate) fn refresh_token(&self) -> Option<TokenSecret> {
		self.cell.lock().credentials.refresh_token.clone()
	}

	/// Claims the refresh slot for a caller whose dispatch used generation `seen`.
	pub(crate) fn elect(&self, seen: u64) -> Election {
		let mut cell = self.cell.lock();

		if let Some(gate) = &cell.in_flight {
			return Election::Follower(gate.clone());
		}
		if cell.generation != seen {
			return Election::Settled(cell.outcome());
		}

		let gate: Gate = Arc::new(OnceCell::new());

		cell.in_flight = Some(gate.clone());

		Election::Leader(gate)
	}

	/// Installs credentials supplied from outside a refresh run.
	pub(crate) fn install(&self, pair: TokenPair) -> Persist {
		let (event, persist) = self.cell.lock().install(pair);

		self.events.publish(event);

		persist
	}

	/// Clears credentials from outside a refresh run.
	pub(crate) fn terminate(&self, reason: RefreshFailure) -> Persist {
		let (event, persist) = self.cell.lock().terminate(reason);

		if let Some(event) = event {
			self.events.publish(event);
		}

		persist
	}

	/// Mirrors a mutation into the store, logging failures.
	pub(crate) async fn mirror(&self, persist: Persist) {
		let Some(store) = &self.store else {
			return;
		};
		let (operation, result) = match persist {
			Persist::Save(state) => ("save", store.save(state).await),
			Persist::Clear => ("clear", store.clear().await),
			Persist::Skip => return,
		};

		if let Err(e) = result {
			obs::store_failed(operation, &e);
		}
	}
}

/// Drop guard owning one refresh run's slot.
///
/// Whatever happens to the task driving the run, the slot is released and the gate filled
/// exactly once: explicitly through [`RefreshSlot::settle`], or with
/// [`RefreshFailure::Aborted`] when the guard is dropped unsettled.
pub(crate) struct RefreshSlot<T>
where
	T: ?Sized + ApiTransport,
{
	shared: Arc<Shared<T>>,
	gate: Gate,
	generation: u64,
	settled: bool,
}
impl<T> RefreshSlot<T>
where
	T: ?Sized + ApiTransport,
{
	pub(crate) fn new(shared: Arc<Shared<T>>, gate: Gate, generation: u64) -> Self {
		Self { shared, gate, generation, settled: false }
	}

	/// Applies the run's result, releases the slot, and wakes every waiter.
	pub(crate) fn settle(&mut self, result: Result<TokenPair, RefreshFailure>) -> Persist {
		self.settled = true;

		let (outcome, event, persist, applied) = {
			let mut cell = self.shared.cell.lock();

			if cell.in_flight.as_ref().is_some_and(|gate| Arc::ptr_eq(gate, &self.gate)) {
				cell.in_flight = None;
			}

			if cell.generation != self.generation {
				// Credentials were replaced explicitly while the call was in flight.
				(cell.outcome(), None, Persist::Skip, false)
			} else {
				match result {
					Ok(pair) => {
						let (event, persist) = cell.install(pair);

						(Ok(()), Some(event), persist, true)
					},
					Err(reason) => {
						let (event, persist) = cell.terminate(reason.clone());

						(Err(reason), event, persist, true)
					},
				}
			}
		};

		match &outcome {
			Ok(()) => {
				self.shared.metrics.record_success();
				obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Success);
			},
			Err(_) => {
				self.shared.metrics.record_failure();
				obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Failure);
			},
		}

		obs::refresh_settled(self.generation, &outcome, applied);

		if let Some(event) = event {
			self.shared.events.publish(event);
		}

		// Sole writer of this cell, so the blocking setter never waits.
		let _ = self.gate.set_blocking(outcome);

		persist
	}
}
impl<T> Drop for RefreshSlot<T>
where
	T: ?Sized + ApiTransport,
{
	fn drop(&mut self) {
		if !self.settled {
			let _ = self.settle(Err(RefreshFailure::Aborted));
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		coordinator::TokenCoordinator,
		http::{ApiRequest, ApiResponse, TransportFuture},
	};

	struct Idle;
	impl ApiTransport for Idle {
		fn send(&self, _: ApiRequest) -> TransportFuture<'_> {
			Box::pin(async { Ok(ApiResponse::new(200, Vec::new())) })
		}
	}

	fn shared() -> Arc<Shared<Idle>> {
		let endpoint =
			Url::parse("https://auth.example.com/refresh").expect("Refresh URL fixture should parse.");
		let config = CoordinatorConfig::builder(endpoint)
			.build()
			.expect("HTTPS refresh endpoint should be accepted.");

		TokenCoordinator::<Idle>::builder(config, Idle)
			.credentials(TokenPair::new("A1", "R1").into())
			.build()
			.shared
	}

	fn ready(shared: &Shared<Idle>) -> Snapshot {
		match shared.admit() {
			Admission::Ready(snapshot) => snapshot,
			Admission::Wait(_) => panic!("Admission should not wait without a running refresh."),
		}
	}

	#[test]
	fn admission_waits_for_the_gate_once_a_refresh_is_elected() {
		let shared = shared();
		let before = ready(&shared);

		assert_eq!(before.installed_at, None);

		let Election::Leader(gate) = shared.elect(before.generation) else {
			panic!("First caller should lead the refresh.");
		};

		match shared.admit() {
			Admission::Wait(waiting) => assert!(Arc::ptr_eq(&waiting, &gate)),
			Admission::Ready(snapshot) => {
				panic!("Admission should not hand out {snapshot:?} while refreshing.")
			},
		}

		RefreshSlot::new(shared.clone(), gate.clone(), before.generation)
			.settle(Ok(TokenPair::new("A2", "R2")));

		assert_eq!(gate.get(), Some(&Ok(())));

		let after = ready(&shared);

		assert_eq!(after.generation, before.generation + 1);
		assert_eq!(after.credentials, CredentialState::from(TokenPair::new("A2", "R2")));
		assert!(after.installed_at.is_some());
	}

	#[test]
	fn dropped_slot_aborts_and_releases_the_gate() {
		let shared = shared();
		let Election::Leader(gate) = shared.elect(0) else {
			panic!("First caller should lead the refresh.");
		};

		drop(RefreshSlot::new(shared.clone(), gate.clone(), 0));

		assert_eq!(gate.get(), Some(&Err(RefreshFailure::Aborted)));
		assert!(shared.in_flight().is_none());

		let after = ready(&shared);

		assert_eq!(after.credentials, CredentialState::default());
		assert_eq!(after.installed_at, None);
	}
}
