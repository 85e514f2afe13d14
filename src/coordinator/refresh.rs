//! Refresh sub-protocol: one call to the refresh endpoint, classified and shape-checked.
//!
//! The run is driven by [`run`], which owns a [`RefreshSlot`] for its whole lifetime. The
//! coordinator spawns it onto the ambient tokio runtime so a caller that loses interest cannot
//! cancel the shared refresh.

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	classify::ResponseClass,
	config::RefreshCredentialPlacement,
	coordinator::election::{Gate, RefreshSlot, Shared},
	error::RefreshFailure,
	http::{ApiRequest, ApiTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Executes one refresh run and settles its slot.
pub(crate) async fn run<T>(shared: Arc<Shared<T>>, gate: Gate, generation: u64)
where
	T: ?Sized + ApiTransport,
{
	let mut slot = RefreshSlot::new(shared.clone(), gate, generation);
	let span = FlowSpan::new(FlowKind::Refresh, "refresh");

	shared.metrics.record_attempt();
	obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Attempt);
	obs::refresh_started(generation);

	let result = span.instrument(request_token_pair(&shared)).await;
	let persist = slot.settle(result);

	drop(slot);
	shared.mirror(persist).await;
}

async fn request_token_pair<T>(shared: &Shared<T>) -> Result<TokenPair, RefreshFailure>
where
	T: ?Sized + ApiTransport,
{
	let refresh_token = shared.refresh_token().ok_or(RefreshFailure::MissingRefreshToken)?;
	let request = build_refresh_request(shared, &refresh_token)?;
	let response = shared.transport.send(request).await?;
	let class = shared.classifier.classify(&response);

	obs::response_classified(response.status, class);

	match class {
		ResponseClass::Success => Ok(TokenPair::from_payload(
			&response.body,
			shared.config.payload_pointer.as_deref(),
			OffsetDateTime::now_utc(),
		)?),
		// Never recurse into another refresh.
		ResponseClass::Expired => Err(RefreshFailure::Expired { status: response.status }),
		ResponseClass::Failure => Err(RefreshFailure::Rejected { status: response.status }),
	}
}

/// Builds the refresh call; it carries the refresh credential and never the access credential.
fn build_refresh_request<T>(
	shared: &Shared<T>,
	refresh_token: &TokenSecret,
) -> Result<ApiRequest, RefreshFailure>
where
	T: ?Sized + ApiTransport,
{
	let config = &shared.config;
	let request =
		ApiRequest::new(config.refresh_method, config.refresh_endpoint.clone()).anonymous();

	match &config.refresh_placement {
		RefreshCredentialPlacement::Header { name, scheme } =>
			Ok(request.header(name, refresh_token.header_value(scheme))),
		RefreshCredentialPlacement::JsonBody { field } => {
			let mut body = serde_json::Map::new();

			body.insert(field.clone(), serde_json::Value::from(refresh_token.expose()));

			request
				.json(&body)
				.map_err(|e| RefreshFailure::Transport { message: e.to_string() })
		},
	}
}
