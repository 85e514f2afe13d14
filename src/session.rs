//! Session lifecycle notifications emitted by the coordinator.
//!
//! Whatever owns the user-facing session (UI state, a CLI profile, a supervisor task) subscribes
//! here instead of reading shared globals: the coordinator publishes every credential rotation
//! and every forced logout exactly once.

// crates.io
use tokio::sync::broadcast;
// self
use crate::{_prelude::*, auth::TokenPair, error::RefreshFailure};

/// Observable side effects of credential mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
	/// New credentials were installed by a refresh or an explicit sign-in.
	CredentialsUpdated {
		/// Installed pair; secrets stay redacted in `Debug` output.
		pair: TokenPair,
		/// Credential generation after the update.
		generation: u64,
	},
	/// Credentials were cleared; the user must re-authenticate.
	SessionTerminated {
		/// Why the session ended.
		reason: RefreshFailure,
		/// Credential generation after the clear.
		generation: u64,
	},
}

/// Broadcast hub for [`SessionEvent`]s.
#[derive(Clone, Debug)]
pub struct SessionEvents(broadcast::Sender<SessionEvent>);
impl SessionEvents {
	/// Default per-subscriber backlog before lagging receivers drop events.
	pub const DEFAULT_CAPACITY: usize = 64;

	/// Creates a hub with the provided per-subscriber backlog.
	pub fn with_capacity(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));

		Self(sender)
	}

	/// Subscribes to events published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.0.subscribe()
	}

	/// Returns the number of live subscribers.
	pub fn subscriber_count(&self) -> usize {
		self.0.receiver_count()
	}

	pub(crate) fn publish(&self, event: SessionEvent) {
		// No subscribers is not an error.
		let _ = self.0.send(event);
	}
}
impl Default for SessionEvents {
	fn default() -> Self {
		Self::with_capacity(Self::DEFAULT_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn subscribers_receive_published_events() {
		let events = SessionEvents::default();

		events.publish(SessionEvent::SessionTerminated {
			reason: RefreshFailure::SignedOut,
			generation: 1,
		});

		let mut receiver = events.subscribe();

		assert_eq!(events.subscriber_count(), 1);

		events.publish(SessionEvent::CredentialsUpdated {
			pair: TokenPair::new("A2", "R2"),
			generation: 2,
		});

		let event = receiver.recv().await.expect("Subscriber should receive the update.");

		assert!(matches!(event, SessionEvent::CredentialsUpdated { generation: 2, .. }));
	}
}
