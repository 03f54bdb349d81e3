use mockito::{Matcher, Server};
use serde_json::{json, Value};

use crate::integration::mocks::{
	create_eos_info_mock, create_eos_test_network_with_urls, eos_block, eos_mainnet_info,
};
use chainwatch::{
	services::blockchain::{BlockchainTransport, EOSTransportClient, TransportError},
	utils::tests::builders::network::{NetworkBuilder, EOS_MAINNET_CHAIN_ID},
};

#[tokio::test]
async fn test_client_creation_probes_get_info() {
	let mut server = Server::new_async().await;
	let mock = create_eos_info_mock(&mut server, EOS_MAINNET_CHAIN_ID, 120, 100);

	let network = create_eos_test_network_with_urls(vec![&server.url()]);
	let client = EOSTransportClient::new(&network).await.unwrap();

	assert_eq!(client.get_current_url().await, server.url());
	mock.assert();
}

#[tokio::test]
async fn test_client_creation_rejects_json_rpc_only_node() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/v1/chain/get_info")
		.with_status(404)
		.create_async()
		.await;

	let network = create_eos_test_network_with_urls(vec![&server.url()]);
	assert!(EOSTransportClient::new(&network).await.is_err());
	mock.assert();
}

#[tokio::test]
async fn test_send_raw_request_posts_to_chain_api_path() {
	let mut server = Server::new_async().await;
	create_eos_info_mock(&mut server, EOS_MAINNET_CHAIN_ID, 120, 100);
	let mock = server
		.mock("POST", "/v1/chain/get_block")
		.match_body(Matcher::Json(json!({"block_num_or_id": 100})))
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(eos_block(100).to_string())
		.create_async()
		.await;

	let network = create_eos_test_network_with_urls(vec![&server.url()]);
	let client = EOSTransportClient::new(&network).await.unwrap();

	let response = client
		.send_raw_request("get_block", Some(json!({"block_num_or_id": 100})))
		.await
		.unwrap();
	assert_eq!(response["block_num"], 100);
	mock.assert();
}

#[tokio::test]
async fn test_customize_request_passes_body_through() {
	let mut server = Server::new_async().await;
	create_eos_info_mock(&mut server, EOS_MAINNET_CHAIN_ID, 1, 1);

	let network = create_eos_test_network_with_urls(vec![&server.url()]);
	let client = EOSTransportClient::new(&network).await.unwrap();

	assert_eq!(
		client
			.customize_request("get_block", Some(json!({"block_num_or_id": 7})))
			.await,
		json!({"block_num_or_id": 7})
	);
	assert_eq!(
		client.customize_request::<Value>("get_info", None).await,
		json!({})
	);
	assert_eq!(
		client.request_url("http://node.example/", "get_info"),
		"http://node.example/v1/chain/get_info"
	);
}

#[tokio::test]
async fn test_node_error_status_is_returned() {
	let mut server = Server::new_async().await;
	create_eos_info_mock(&mut server, EOS_MAINNET_CHAIN_ID, 120, 100);
	let mock = server
		.mock("POST", "/v1/chain/get_block")
		.with_status(400)
		.with_body(r#"{"code":400,"message":"Unknown Block"}"#)
		.create_async()
		.await;

	let network = create_eos_test_network_with_urls(vec![&server.url()]);
	let client = EOSTransportClient::new(&network).await.unwrap();

	let err = client
		.send_raw_request("get_block", Some(json!({"block_num_or_id": 999_999_999u64})))
		.await
		.unwrap_err();
	match err {
		TransportError::Http {
			status_code, body, ..
		} => {
			assert_eq!(status_code, 400);
			assert!(body.contains("Unknown Block"));
		}
		other => panic!("unexpected error {:?}", other),
	}
	mock.assert();
}

#[tokio::test]
async fn test_rate_limited_node_fails_over() {
	let mut primary = Server::new_async().await;
	let mut fallback = Server::new_async().await;
	create_eos_info_mock(&mut primary, EOS_MAINNET_CHAIN_ID, 120, 100);
	fallback
		.mock("POST", "/v1/chain/get_info")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(eos_mainnet_info(121, 101).to_string())
		.create_async()
		.await;
	let rate_limited = primary
		.mock("POST", "/v1/chain/get_block")
		.with_status(429)
		.expect_at_least(1)
		.create_async()
		.await;
	let served = fallback
		.mock("POST", "/v1/chain/get_block")
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(eos_block(100).to_string())
		.expect(1)
		.create_async()
		.await;

	let network = NetworkBuilder::eos()
		.clear_rpc_urls()
		.add_rpc_url(&primary.url(), "rpc", 100)
		.add_rpc_url(&fallback.url(), "rpc", 50)
		.build();
	let client = EOSTransportClient::new(&network).await.unwrap();

	let response = client
		.send_raw_request("get_block", Some(json!({"block_num_or_id": 100})))
		.await
		.unwrap();
	assert_eq!(response["block_num"], 100);
	assert_eq!(client.get_current_url().await, fallback.url());

	rate_limited.assert();
	served.assert();
}
