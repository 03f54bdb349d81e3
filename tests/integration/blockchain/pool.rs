use chainwatch::{
	models::BlockChainType,
	services::blockchain::{
		ClientPool, ClientPoolTrait, EOSTransportClient, EVMTransportClient, EosClient, EvmClient,
	},
};

use std::sync::Arc;

use crate::integration::mocks::{
	create_eos_info_mock, create_eos_test_network_with_urls, create_evm_chain_id_mock,
	create_evm_test_network_with_urls,
};
use chainwatch::utils::tests::builders::network::EOS_MAINNET_CHAIN_ID;

#[tokio::test]
async fn test_new_pool_is_empty() {
	let pool = ClientPool::new();

	assert_eq!(pool.storages.len(), 2);
	assert_eq!(
		pool.get_client_count::<EvmClient<EVMTransportClient>>(BlockChainType::EVM)
			.await,
		0
	);
	assert_eq!(
		pool.get_client_count::<EosClient<EOSTransportClient>>(BlockChainType::EOS)
			.await,
		0
	);
}

#[tokio::test]
async fn test_get_evm_client_creates_and_caches() {
	let mut mock_server = mockito::Server::new_async().await;
	let mock = create_evm_chain_id_mock(&mut mock_server, 1);
	let pool = ClientPool::new();
	let network = create_evm_test_network_with_urls(vec![&mock_server.url()]);

	let client1 = pool.get_evm_client(&network).await.unwrap();
	assert_eq!(
		pool.get_client_count::<EvmClient<EVMTransportClient>>(BlockChainType::EVM)
			.await,
		1
	);
	assert_eq!(
		pool.get_client_count::<EosClient<EOSTransportClient>>(BlockChainType::EOS)
			.await,
		0
	);

	let client2 = pool.get_evm_client(&network).await.unwrap();
	assert_eq!(
		pool.get_client_count::<EvmClient<EVMTransportClient>>(BlockChainType::EVM)
			.await,
		1
	);
	assert!(Arc::ptr_eq(&client1, &client2));
	mock.assert();
}

#[tokio::test]
async fn test_get_evm_client_rejects_chain_id_mismatch() {
	let mut mock_server = mockito::Server::new_async().await;
	create_evm_chain_id_mock(&mut mock_server, 137);
	let pool = ClientPool::new();
	let network = create_evm_test_network_with_urls(vec![&mock_server.url()]);

	let result = pool.get_evm_client(&network).await;
	assert!(result.is_err());
	assert_eq!(
		pool.get_client_count::<EvmClient<EVMTransportClient>>(BlockChainType::EVM)
			.await,
		0
	);
}

#[tokio::test]
async fn test_get_eos_client_creates_and_caches() {
	let mut mock_server = mockito::Server::new_async().await;
	create_eos_info_mock(&mut mock_server, EOS_MAINNET_CHAIN_ID, 120, 100);
	let pool = ClientPool::new();
	let network = create_eos_test_network_with_urls(vec![&mock_server.url()]);

	let client1 = pool.get_eos_client(&network).await.unwrap();
	let client2 = pool.get_eos_client(&network).await.unwrap();
	assert!(Arc::ptr_eq(&client1, &client2));
	assert_eq!(
		pool.get_client_count::<EosClient<EOSTransportClient>>(BlockChainType::EOS)
			.await,
		1
	);
}

#[tokio::test]
async fn test_get_eos_client_rejects_other_chain() {
	let mut mock_server = mockito::Server::new_async().await;
	create_eos_info_mock(&mut mock_server, &"00".repeat(32), 120, 100);
	let pool = ClientPool::new();
	let network = create_eos_test_network_with_urls(vec![&mock_server.url()]);

	assert!(pool.get_eos_client(&network).await.is_err());
	assert_eq!(
		pool.get_client_count::<EosClient<EOSTransportClient>>(BlockChainType::EOS)
			.await,
		0
	);
}

#[tokio::test]
async fn test_different_networks_get_different_clients() {
	let mut server1 = mockito::Server::new_async().await;
	let mut server2 = mockito::Server::new_async().await;
	create_evm_chain_id_mock(&mut server1, 1);
	create_evm_chain_id_mock(&mut server2, 1);
	let pool = ClientPool::new();

	let network1 = create_evm_test_network_with_urls(vec![&server1.url()]);
	let mut network2 = create_evm_test_network_with_urls(vec![&server2.url()]);
	network2.slug = "test_2".to_string();

	let client1 = pool.get_evm_client(&network1).await.unwrap();
	let client2 = pool.get_evm_client(&network2).await.unwrap();
	assert!(!Arc::ptr_eq(&client1, &client2));
	assert_eq!(
		pool.get_client_count::<EvmClient<EVMTransportClient>>(BlockChainType::EVM)
			.await,
		2
	);
}

#[tokio::test]
async fn test_concurrent_requests_configure_once() {
	let mut mock_server = mockito::Server::new_async().await;
	let mock = create_evm_chain_id_mock(&mut mock_server, 1);
	let pool = Arc::new(ClientPool::new());
	let network = create_evm_test_network_with_urls(vec![&mock_server.url()]);

	let handles: Vec<_> = (0..5)
		.map(|_| {
			let pool = pool.clone();
			let network = network.clone();
			tokio::spawn(async move { pool.get_evm_client(&network).await.unwrap() })
		})
		.collect();

	let mut clients = Vec::new();
	for handle in handles {
		clients.push(handle.await.unwrap());
	}
	assert!(clients.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
	assert_eq!(
		pool.get_client_count::<EvmClient<EVMTransportClient>>(BlockChainType::EVM)
			.await,
		1
	);
	mock.assert();
}
