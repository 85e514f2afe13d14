// self
use crate::{
	_prelude::*,
	auth::CredentialState,
	classify::{DefaultExpiryClassifier, ExpiryClassifier},
	config::CoordinatorConfig,
	coordinator::{
		TokenCoordinator,
		election::{CredentialCell, Shared},
	},
	http::ApiTransport,
	session::SessionEvents,
	store::CredentialStore,
};

/// Builder for [`TokenCoordinator`] values.
pub struct CoordinatorBuilder<T>
where
	T: ?Sized + ApiTransport,
{
	config: CoordinatorConfig,
	transport: Arc<T>,
	classifier: Arc<dyn ExpiryClassifier>,
	store: Option<Arc<dyn CredentialStore>>,
	credentials: CredentialState,
	event_capacity: usize,
}
impl<T> CoordinatorBuilder<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a builder with the default classifier and no store.
	pub fn new(config: CoordinatorConfig, transport: impl Into<Arc<T>>) -> Self {
		Self {
			config,
			transport: transport.into(),
			classifier: Arc::new(DefaultExpiryClassifier::default()),
			store: None,
			credentials: CredentialState::default(),
			event_capacity: SessionEvents::DEFAULT_CAPACITY,
		}
	}

	/// Replaces the response classifier.
	pub fn classifier(mut self, classifier: Arc<dyn ExpiryClassifier>) -> Self {
		self.classifier = classifier;

		self
	}

	/// Mirrors every credential mutation into `store`.
	pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Seeds the initial credentials.
	pub fn credentials(mut self, credentials: CredentialState) -> Self {
		self.credentials = credentials;

		self
	}

	/// Overrides the per-subscriber session event backlog.
	pub fn event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;

		self
	}

	/// Builds the coordinator with the seeded credentials.
	pub fn build(self) -> TokenCoordinator<T> {
		TokenCoordinator {
			shared: Arc::new(Shared {
				config: self.config,
				classifier: self.classifier,
				store: self.store,
				events: SessionEvents::with_capacity(self.event_capacity),
				metrics: Default::default(),
				cell: Mutex::new(CredentialCell::new(self.credentials)),
				transport: self.transport,
			}),
		}
	}

	/// Builds the coordinator after loading persisted credentials from the configured store.
	///
	/// Stored credentials take precedence over [`CoordinatorBuilder::credentials`]; without a
	/// store this is equivalent to [`CoordinatorBuilder::build`].
	pub async fn restore(mut self) -> Result<TokenCoordinator<T>> {
		let stored = match &self.store {
			Some(store) => store.load().await?,
			None => None,
		};

		if let Some(state) = stored {
			self.credentials = state;
		}

		Ok(self.build())
	}
}
impl<T> Debug for CoordinatorBuilder<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CoordinatorBuilder")
			.field("config", &self.config)
			.field("store_set", &self.store.is_some())
			.field("credentials", &self.credentials)
			.finish()
	}
}
