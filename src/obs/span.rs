// self
use crate::{
	_prelude::*, classify::ResponseClass, error::RefreshFailure, obs::FlowKind, store::StoreError,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by coordinator flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("token_coordinator.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits the start of a refresh run.
pub fn refresh_started(generation: u64) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(generation, "starting credential refresh");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = generation;
	}
}

/// Emits the settled outcome of a refresh run.
pub fn refresh_settled(generation: u64, outcome: &Result<(), RefreshFailure>, applied: bool) {
	#[cfg(feature = "tracing")]
	{
		match outcome {
			Ok(()) => tracing::info!(generation, applied, "credential refresh succeeded"),
			Err(reason) => tracing::warn!(
				generation,
				applied,
				%reason,
				"credential refresh failed; session terminated"
			),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (generation, outcome, applied);
	}
}

/// Emits the classification of a response inside the current flow span.
pub fn response_classified(status: u16, class: ResponseClass) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(status, class = class.as_str(), "response classified");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (status, class);
	}
}

/// Emits a failed mirror write to the credential store.
pub fn store_failed(operation: &'static str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(operation, %error, "credential store update failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, error);
	}
}

/// Emits a waiter giving up on an in-flight refresh.
pub fn wait_timed_out(waited: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(%waited, "gave up waiting for the in-flight refresh");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = waited;
	}
}

/// Emits a post-refresh retry that was still rejected.
pub fn retry_rejected(status: u16) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(status, "request rejected again after refresh; not retrying");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = status;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn event_helpers_do_not_require_subscriber() {
		refresh_started(1);
		response_classified(401, ResponseClass::Expired);
		refresh_settled(2, &Err(RefreshFailure::Aborted), true);
		store_failed("save", &StoreError::Backend { message: "disk full".into() });
		wait_timed_out(Duration::seconds(5));
		retry_rejected(401);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
