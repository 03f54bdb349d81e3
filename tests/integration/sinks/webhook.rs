use hmac::{Hmac, Mac};
use mockito::{Matcher, Server};
use serde_json::{json, Value};
use sha2::Sha256;
use std::{
	sync::{Arc, Mutex},
	time::Duration,
};

use chainwatch::{
	models::{SinkConfig, SinkTypeConfig},
	services::sink::{create_sink, SinkClientPool, SinkSet},
	utils::tests::builders::{block::BlockBuilder, sink::SinkBuilder},
};

fn with_fast_retries(mut config: SinkConfig) -> SinkConfig {
	if let SinkTypeConfig::Webhook { retry_policy, .. } = &mut config.config {
		retry_policy.initial_backoff = Duration::from_millis(1);
		retry_policy.max_backoff = Duration::from_millis(5);
	}
	config
}

#[tokio::test]
async fn test_fan_out_posts_signed_block() {
	let mut server = Server::new_async().await;
	let captured: Arc<Mutex<Option<(String, String, Vec<u8>)>>> = Arc::new(Mutex::new(None));
	let capture = captured.clone();
	let mock = server
		.mock("POST", "/blocks")
		.match_header("content-type", "application/json")
		.match_header("x-source", "chainwatch")
		.match_header("x-signature", Matcher::Regex("^[0-9a-f]{64}$".to_string()))
		.match_header("x-timestamp", Matcher::Regex("^[0-9]+$".to_string()))
		.with_status(200)
		.with_body_from_request(move |request| {
			let header = |name: &str| {
				request
					.header(name)
					.first()
					.and_then(|v| v.to_str().ok())
					.unwrap_or_default()
					.to_string()
			};
			*capture.lock().unwrap() = Some((
				header("x-signature"),
				header("x-timestamp"),
				request.body().unwrap().clone(),
			));
			Vec::new()
		})
		.create_async()
		.await;

	let config = SinkBuilder::new()
		.name("hook")
		.webhook(&format!("{}/blocks", server.url()))
		.secret("s3cr3t")
		.header("X-Source", "chainwatch")
		.build();
	let sink = create_sink(&config, &SinkClientPool::new()).await.unwrap();
	let sinks = SinkSet::configure(vec![sink]).await;
	assert_eq!(sinks.names(), vec!["hook"]);

	let block = BlockBuilder::new().number(77).build();
	assert_eq!(sinks.fan_out(&block).await.unwrap(), 1);
	mock.assert_async().await;

	let (signature, timestamp, body) = captured.lock().unwrap().take().unwrap();
	let received: Value = serde_json::from_slice(&body).unwrap();
	assert_eq!(received["number"], json!(77));
	assert_eq!(received["network_slug"], json!("eos_mainnet"));

	// receivers verify with HMAC-SHA256 over body then timestamp
	let mut mac = Hmac::<Sha256>::new_from_slice(b"s3cr3t").unwrap();
	mac.update(&body);
	mac.update(timestamp.as_bytes());
	assert_eq!(signature, hex::encode(mac.finalize().into_bytes()));
}

#[tokio::test]
async fn test_unsigned_webhook_has_no_signature_headers() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/blocks")
		.match_header("x-signature", Matcher::Missing)
		.match_header("x-timestamp", Matcher::Missing)
		.with_status(204)
		.create_async()
		.await;

	let config = SinkBuilder::new()
		.webhook(&format!("{}/blocks", server.url()))
		.build();
	let sink = create_sink(&config, &SinkClientPool::new()).await.unwrap();

	let sinks = SinkSet::configure(vec![sink]).await;
	assert_eq!(sinks.fan_out(&BlockBuilder::new().build()).await.unwrap(), 1);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_are_retried() {
	let mut server = Server::new_async().await;
	let failing = server
		.mock("POST", "/blocks")
		.with_status(503)
		.expect(4)
		.create_async()
		.await;

	let config = with_fast_retries(
		SinkBuilder::new()
			.webhook(&format!("{}/blocks", server.url()))
			.build(),
	);
	let sink = create_sink(&config, &SinkClientPool::new()).await.unwrap();
	let err = sink.publish(b"{}").await.unwrap_err();

	assert!(err.to_string().contains("503"));
	failing.assert_async().await;
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
	let mut server = Server::new_async().await;
	let rejected = server
		.mock("POST", "/blocks")
		.with_status(422)
		.expect(1)
		.create_async()
		.await;

	let config = with_fast_retries(
		SinkBuilder::new()
			.webhook(&format!("{}/blocks", server.url()))
			.build(),
	);
	let sink = create_sink(&config, &SinkClientPool::new()).await.unwrap();

	assert!(!sink.push(b"{}").await);
	rejected.assert_async().await;
}

#[tokio::test]
async fn test_one_failing_webhook_does_not_stop_the_others() {
	let mut healthy = Server::new_async().await;
	let mut broken = Server::new_async().await;
	let delivered = healthy
		.mock("POST", "/blocks")
		.with_status(200)
		.expect(1)
		.create_async()
		.await;
	broken
		.mock("POST", "/blocks")
		.with_status(400)
		.create_async()
		.await;

	let pool = SinkClientPool::new();
	let mut candidates = Vec::new();
	for (name, server) in [("healthy", &healthy), ("broken", &broken)] {
		let config = SinkBuilder::new()
			.name(name)
			.webhook(&format!("{}/blocks", server.url()))
			.build();
		candidates.push(create_sink(&config, &pool).await.unwrap());
	}
	let sinks = SinkSet::configure(candidates).await;
	assert_eq!(sinks.len(), 2);

	let reached = sinks
		.fan_out(&BlockBuilder::new().number(5).build())
		.await
		.unwrap();
	assert_eq!(reached, 1);
	delivered.assert_async().await;
}

#[tokio::test]
async fn test_invalid_url_is_dropped_at_configure() {
	let config = SinkBuilder::new().name("bad").webhook("not a url").build();
	let sink = create_sink(&config, &SinkClientPool::new()).await.unwrap();

	let sinks = SinkSet::configure(vec![sink]).await;
	assert!(sinks.is_empty());
}
