use chainwatch::{
	models::BigValue,
	services::blockchain::{name_to_string, Asset},
};
use proptest::{prelude::*, test_runner::Config};

const NAME_CHARMAP: &str = ".12345abcdefghijklmnopqrstuvwxyz";

/// Packs up to 12 name characters the way the chain does
fn encode_name(name: &str) -> u64 {
	name.bytes().enumerate().fold(0u64, |value, (i, c)| {
		let symbol = NAME_CHARMAP.bytes().position(|m| m == c).unwrap() as u64;
		value | ((symbol & 0x1f) << (64 - 5 * (i as u64 + 1)))
	})
}

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_names_roundtrip(name in "[a-z1-5]([a-z1-5.]{0,10}[a-z1-5])?") {
		prop_assert_eq!(name_to_string(encode_name(&name)), name);
	}

	#[test]
	fn test_any_value_renders_a_valid_name(value in any::<u64>()) {
		let name = name_to_string(value);
		prop_assert!(name.len() <= 13);
		prop_assert!(!name.ends_with('.'));
		prop_assert!(name.bytes().all(|c| NAME_CHARMAP.as_bytes().contains(&c)));
	}

	#[test]
	fn test_asset_parse(
		whole in 0..1_000_000_000u64,
		fraction in proptest::collection::vec(0..10u8, 0..=8),
		symbol in "[A-Z]{1,7}",
	) {
		let digits: String = fraction.iter().map(|d| char::from(b'0' + d)).collect();
		let quantity = if digits.is_empty() {
			format!("{} {}", whole, symbol)
		} else {
			format!("{}.{} {}", whole, digits, symbol)
		};

		let asset = Asset::parse(&quantity).unwrap();
		let scale = 10u64.pow(fraction.len() as u32);
		let fraction_value = if digits.is_empty() { 0 } else { digits.parse::<u64>().unwrap() };
		let expected = whole * scale + fraction_value;

		prop_assert_eq!(asset.amount, expected as i64);
		prop_assert_eq!(asset.precision as usize, fraction.len());
		prop_assert_eq!(&asset.symbol, &symbol);
		prop_assert_eq!(asset.value().unwrap(), BigValue::from(expected));
	}

	#[test]
	fn test_negative_assets_have_no_value(whole in 1..1_000_000u64, symbol in "[A-Z]{1,7}") {
		let asset = Asset::parse(&format!("-{}.0000 {}", whole, symbol)).unwrap();
		prop_assert!(asset.amount < 0);
		prop_assert!(asset.value().is_err());
	}

	#[test]
	fn test_lowercase_symbols_are_rejected(symbol in "[a-z]{1,7}") {
		let quantity = format!("1.0000 {}", symbol);
		prop_assert!(Asset::parse(&quantity).is_err());
	}
}
