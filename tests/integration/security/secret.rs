use once_cell::sync::Lazy;
use std::sync::Mutex;
use std::{env, fs};
use tempfile::TempDir;
use zeroize::Zeroize;

use chainwatch::{
	models::{BlockChainType, SecretString, SecretValue, SinkTypeConfig},
	repositories::{
		NetworkRepository, NetworkRepositoryTrait, SinkRepository, SinkRepositoryTrait,
	},
	utils::tests::builders::{network::NetworkBuilder, sink::SinkBuilder},
};

// Tests below share process environment variables
static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[tokio::test]
#[allow(clippy::await_holding_lock)]
async fn test_secret_resolution_from_network_config() {
	let _lock = TEST_LOCK.lock().unwrap();

	let temp_dir = TempDir::new().unwrap();
	const RPC_URL_ENV: &str = "CHAINWATCH_TEST_RPC_URL";
	const RPC_URL_VALUE: &str = "https://eos-rpc.example.com";
	env::set_var(RPC_URL_ENV, RPC_URL_VALUE);

	let network = NetworkBuilder::eos()
		.name("EOS Mainnet")
		.slug("eos_mainnet")
		.block_time_ms(500)
		.clear_rpc_urls()
		.add_rpc_url("https://eos.greymass.com", "rpc", 100)
		.add_secret_rpc_url(SecretValue::Environment(RPC_URL_ENV.to_string()), 90)
		.build();
	fs::write(
		temp_dir.path().join("eos_mainnet.json"),
		serde_json::to_string_pretty(&network).unwrap(),
	)
	.unwrap();

	let repository = NetworkRepository::new(Some(temp_dir.path())).await.unwrap();
	let loaded = repository.get("eos_mainnet").unwrap();
	assert_eq!(loaded.network_type, BlockChainType::EOS);

	assert_eq!(
		loaded.rpc_urls[0].url.resolve().unwrap().as_str(),
		"https://eos.greymass.com"
	);
	// environment references are replaced by their value at load time
	assert_eq!(
		loaded.rpc_urls[1].url,
		SecretValue::Plain(SecretString::new(RPC_URL_VALUE.to_string()))
	);

	env::remove_var(RPC_URL_ENV);
}

#[tokio::test]
#[allow(clippy::await_holding_lock)]
async fn test_missing_environment_variable_fails_load() {
	let _lock = TEST_LOCK.lock().unwrap();

	let temp_dir = TempDir::new().unwrap();
	const MISSING_ENV: &str = "CHAINWATCH_TEST_RPC_URL_UNSET";
	env::remove_var(MISSING_ENV);

	let network = NetworkBuilder::new()
		.slug("eth")
		.clear_rpc_urls()
		.add_secret_rpc_url(SecretValue::Environment(MISSING_ENV.to_string()), 100)
		.build();
	fs::write(
		temp_dir.path().join("eth.json"),
		serde_json::to_string(&network).unwrap(),
	)
	.unwrap();

	assert!(NetworkRepository::new(Some(temp_dir.path())).await.is_err());
}

#[tokio::test]
#[allow(clippy::await_holding_lock)]
async fn test_sink_token_resolution() {
	let _lock = TEST_LOCK.lock().unwrap();

	let temp_dir = TempDir::new().unwrap();
	const TOKEN_ENV: &str = "CHAINWATCH_TEST_PUBSUB_TOKEN";
	env::set_var(TOKEN_ENV, "ya29.secret");

	let mut config = SinkBuilder::new()
		.name("stream")
		.pubsub("https://pubsub.googleapis.com", "chain-data", "blocks", "unused")
		.build();
	if let SinkTypeConfig::PubSub { access_token, .. } = &mut config.config {
		*access_token = SecretValue::Environment(TOKEN_ENV.to_string());
	}
	fs::write(
		temp_dir.path().join("stream.json"),
		serde_json::to_string_pretty(&config).unwrap(),
	)
	.unwrap();

	let repository = SinkRepository::new(Some(temp_dir.path())).await.unwrap();
	match repository.get("stream").unwrap().config {
		SinkTypeConfig::PubSub { access_token, .. } => {
			assert_eq!(access_token.as_str(), "ya29.secret")
		}
		other => panic!("unexpected sink config {:?}", other),
	}

	env::remove_var(TOKEN_ENV);
}

#[tokio::test]
#[allow(clippy::await_holding_lock)]
async fn test_secret_zeroization() {
	let _lock = TEST_LOCK.lock().unwrap();

	let mut secret = SecretValue::Plain(SecretString::new("sensitive_data".to_string()));
	assert_eq!(secret.resolve().unwrap().as_str(), "sensitive_data");

	secret.zeroize();

	if let SecretValue::Plain(ref secret_string) = secret {
		assert_eq!(secret_string.as_str(), "");
	}
}

#[tokio::test]
#[allow(clippy::await_holding_lock)]
async fn test_secret_serialization_deserialization() {
	let _lock = TEST_LOCK.lock().unwrap();

	let plain_secret = SecretValue::Plain(SecretString::new("test_plain".to_string()));
	let env_secret = SecretValue::Environment("TEST_ENV_VAR".to_string());

	let plain_json = serde_json::to_string(&plain_secret).unwrap();
	let env_json = serde_json::to_string(&env_secret).unwrap();

	let deserialized_plain: SecretValue = serde_json::from_str(&plain_json).unwrap();
	let deserialized_env: SecretValue = serde_json::from_str(&env_json).unwrap();

	assert_eq!(deserialized_plain, plain_secret);
	assert_eq!(deserialized_env, env_secret);
}
