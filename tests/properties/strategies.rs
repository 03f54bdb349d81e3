use chainwatch::{
	models::{BackoffConfig, BlockChainType, IngestionMode, Network},
	utils::tests::builders::network::{NetworkBuilder, EOS_MAINNET_CHAIN_ID},
};
use proptest::{option, prelude::*};

const MAX_RPC_URLS: usize = 3;

pub fn rpc_url_strategy() -> impl Strategy<Value = (String, u32)> {
	(
		prop_oneof![Just("https"), Just("http")],
		"[a-z]{1,10}",
		prop_oneof![Just("com"), Just("io"), Just("network")],
		0..=100u32,
	)
		.prop_map(|(scheme, host, tld, weight)| (format!("{}://{}.{}", scheme, host, tld), weight))
}

pub fn backoff_strategy() -> impl Strategy<Value = BackoffConfig> {
	(1..=1_000u64, 0..=16u32).prop_map(|(base_delay_ms, doublings)| BackoffConfig {
		base_delay_ms,
		max_delay_ms: base_delay_ms << doublings,
	})
}

/// Networks that pass configuration validation
pub fn network_strategy() -> impl Strategy<Value = Network> {
	(
		prop_oneof![Just(BlockChainType::EVM), Just(BlockChainType::EOS)],
		"[a-z0-9_]{1,10}",                                 // slug
		"[a-zA-Z0-9_ ]{1,20}",                             // name
		proptest::collection::vec(rpc_url_strategy(), 1..MAX_RPC_URLS),
		1..=100_000u64,                                    // chain_id
		100..60_000u64,                                    // block_time_ms
		1..=20u64,                                         // confirmation_blocks
		option::of(1..=1_000u64),                          // max_past_blocks
		any::<bool>(),                                     // subscribe, EVM only
		1..=32usize,                                       // max_concurrent_fetches
		backoff_strategy(),
	)
		.prop_map(
			|(
				network_type,
				slug,
				name,
				rpc_urls,
				chain_id,
				block_time_ms,
				confirmation_blocks,
				max_past_blocks,
				subscribe,
				max_concurrent_fetches,
				backoff,
			)| {
				let mut builder = match network_type {
					BlockChainType::EOS => NetworkBuilder::eos().eos_chain_id(EOS_MAINNET_CHAIN_ID),
					_ => NetworkBuilder::new().chain_id(chain_id).ingestion(if subscribe {
						IngestionMode::Subscribe
					} else {
						IngestionMode::Poll
					}),
				}
				.slug(&slug)
				.name(&name)
				.block_time_ms(block_time_ms)
				.confirmation_blocks(confirmation_blocks)
				.max_concurrent_fetches(max_concurrent_fetches)
				.backoff(backoff)
				.clear_rpc_urls();
				for (url, weight) in &rpc_urls {
					builder = builder.add_rpc_url(url, "rpc", *weight);
				}
				let mut network = builder.build();
				network.max_past_blocks = max_past_blocks;
				network
			},
		)
}
