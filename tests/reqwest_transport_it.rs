#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use token_coordinator::{
	ReqwestCoordinator,
	auth::TokenPair,
	config::CoordinatorConfig,
	error::Error,
	http::{ApiRequest, ApiTransport, ReqwestTransport},
	url::Url,
};

fn mock_url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock server URL should parse.")
}

fn build_coordinator(server: &MockServer) -> ReqwestCoordinator {
	let config = CoordinatorConfig::builder(mock_url(server, "/auth/refresh"))
		.payload_pointer("/data")
		.build()
		.expect("Loopback refresh endpoint should be accepted.");

	let transport = ReqwestTransport::with_timeout(time::Duration::seconds(5))
		.expect("Reqwest client with a timeout should build.");

	ReqwestCoordinator::builder(config, transport)
		.credentials(TokenPair::new("A1", "R1").into())
		.build()
}

#[tokio::test]
async fn expired_request_is_refreshed_and_retried_over_http() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer A1");
			then.status(401).json_body(json!({ "error": "token_expired" }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer A2");
			then.status(200).json_body(json!({ "name": "ada" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").header("authorization", "Bearer R1");
			then.status(200).json_body(json!({
				"data": { "access_token": "A2", "refresh_token": "R2", "expires_in": 3600 }
			}));
		})
		.await;
	let coordinator = build_coordinator(&server);
	let response = coordinator.execute(ApiRequest::get(mock_url(&server, "/me"))).await?;
	let body: serde_json::Value = response.json()?;

	assert_eq!(response.status, 200);
	assert_eq!(body, json!({ "name": "ada" }));

	stale.assert_calls_async(1).await;
	fresh.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	let credentials = coordinator.credentials();

	assert_eq!(credentials.access_token.as_ref().map(|token| token.expose()), Some("A2"));
	assert_eq!(credentials.refresh_token.as_ref().map(|token| token.expose()), Some("R2"));
	assert!(credentials.expires_at.is_some());

	Ok(())
}

#[tokio::test]
async fn server_errors_are_returned_as_responses() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let failing = server
		.mock_async(|when, then| {
			when.method(GET).path("/me");
			then.status(500).header("x-request-id", "req-7").body("boom");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200);
		})
		.await;
	let coordinator = build_coordinator(&server);
	let response = coordinator.execute(ApiRequest::get(mock_url(&server, "/me"))).await?;

	assert_eq!(response.status, 500);
	assert_eq!(response.text(), "boom");
	assert_eq!(response.headers.get("x-request-id").map(String::as_str), Some("req-7"));

	failing.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	Ok(())
}

#[tokio::test]
async fn connection_failures_surface_as_transport_errors() {
	let transport = ReqwestTransport::default();
	let url = Url::parse("http://127.0.0.1:9/me").expect("Closed port URL should parse.");
	let error = transport
		.send(ApiRequest::get(url.clone()))
		.await
		.expect_err("Closed port should refuse the connection.");

	assert!(error.to_string().contains("127.0.0.1"));

	let config = CoordinatorConfig::builder(
		Url::parse("http://127.0.0.1:9/auth/refresh").expect("Refresh URL should parse."),
	)
	.build()
	.expect("Loopback refresh endpoint should be accepted.");
	let coordinator = ReqwestCoordinator::new(config);
	let error = coordinator
		.execute(ApiRequest::get(url))
		.await
		.expect_err("Coordinator should pass transport failures through.");

	assert!(matches!(error, Error::Transport(_)));
	assert_eq!(coordinator.metrics().refresh_attempts(), 0);
}
