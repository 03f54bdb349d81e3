use alloy::primitives::U256;
use chainwatch::models::BigValue;
use proptest::{prelude::*, test_runner::Config};
use std::str::FromStr;

fn u256_strategy() -> impl Strategy<Value = U256> {
	any::<[u64; 4]>().prop_map(U256::from_limbs)
}

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_decimal_text_roundtrip(value in u256_strategy()) {
		let big = BigValue(value);
		let text = big.to_string();
		prop_assert!(text.bytes().all(|b| b.is_ascii_digit()));
		prop_assert_eq!(BigValue::from_str(&text).unwrap(), big);
	}

	#[test]
	fn test_hex_and_decimal_agree(value in u256_strategy()) {
		let hex = format!("0x{:x}", value);
		prop_assert_eq!(BigValue::from_hex(&hex).unwrap(), BigValue(value));
		prop_assert_eq!(BigValue::from_str(&hex).unwrap(), BigValue(value));
	}

	#[test]
	fn test_serializes_as_decimal_string(value in u256_strategy()) {
		let big = BigValue(value);
		let json = serde_json::to_value(big).unwrap();
		prop_assert_eq!(json.as_str().unwrap(), big.to_string());
		prop_assert_eq!(serde_json::from_value::<BigValue>(json).unwrap(), big);
	}

	#[test]
	fn test_u64_matches_native_formatting(value in any::<u64>()) {
		prop_assert_eq!(BigValue::from(value).to_string(), value.to_string());
	}

	#[test]
	fn test_non_digits_are_rejected(text in "[0-9]{0,5}[a-zA-Z.,-][0-9]{0,5}") {
		prop_assume!(!text.starts_with("0x") && !text.starts_with("0X"));
		prop_assert!(BigValue::from_str(&text).is_err());
	}
}

#[test]
fn test_full_width_values_survive() {
	let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
	let value = BigValue::from_str(max).unwrap();
	assert_eq!(value, BigValue(U256::MAX));
	assert_eq!(value.to_string(), max);
	assert!(BigValue::from_str(&format!("{}0", max)).is_err());
}
