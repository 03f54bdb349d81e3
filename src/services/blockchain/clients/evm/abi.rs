//! Decoding of ERC-20 style token calls found in transaction input.
//!
//! Only the calls that move tokens are recognised. Arguments are static ABI words, so the
//! payload length must match the signature exactly.

use alloy::primitives::{Address, U256};

use crate::models::{ActionKind, BigValue, TokenMovement};

/// `transfer(address,uint256)`
pub const TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
/// `transferFrom(address,address,uint256)`
pub const TRANSFER_FROM: [u8; 4] = [0x23, 0xb8, 0x72, 0xdd];
/// `mint(address,uint256)`
pub const MINT: [u8; 4] = [0x40, 0xc1, 0x0f, 0x19];
/// `issue(uint256)`
pub const ISSUE: [u8; 4] = [0xcc, 0x87, 0x2b, 0x66];

const WORD: usize = 32;

/// Source of minted and issued tokens.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// A decoded token call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCall {
	pub method: &'static str,
	pub kind: ActionKind,
}

/// Lowercase `0x` address.
pub fn format_address(address: &Address) -> String {
	format!("0x{:x}", address)
}

fn word(args: &[u8], index: usize) -> &[u8] {
	&args[index * WORD..(index + 1) * WORD]
}

fn address_arg(args: &[u8], index: usize) -> Result<Address, String> {
	let word = word(args, index);
	if word[..12].iter().any(|b| *b != 0) {
		return Err(format!("argument {} is not a valid address", index));
	}
	Ok(Address::from_slice(&word[12..]))
}

fn uint_arg(args: &[u8], index: usize) -> U256 {
	U256::from_be_slice(word(args, index))
}

/// Decodes `input` when its selector is a known token call.
///
/// Returns `Ok(None)` for any other call and an error when a known selector carries a
/// malformed payload. `sender` is the transaction sender and `token` the called contract,
/// which also serves as the movement's symbol.
pub fn decode_token_call(
	input: &[u8],
	sender: &str,
	token: &str,
) -> Result<Option<TokenCall>, String> {
	let Some(selector) = input.get(..4) else {
		return Ok(None);
	};
	let args = &input[4..];

	let (method, arg_count) = match selector {
		s if s == TRANSFER => ("transfer", 2),
		s if s == TRANSFER_FROM => ("transferFrom", 3),
		s if s == MINT => ("mint", 2),
		s if s == ISSUE => ("issue", 1),
		_ => return Ok(None),
	};

	if args.len() != arg_count * WORD {
		return Err(format!(
			"{} expects {} bytes of arguments, got {}",
			method,
			arg_count * WORD,
			args.len()
		));
	}

	let movement = |from: String, to: String, value: U256| TokenMovement {
		from,
		to,
		value: BigValue(value),
		symbol: token.to_string(),
		precision: 0,
		memo: String::new(),
	};

	let kind = match method {
		"transfer" => ActionKind::Transfer(movement(
			sender.to_string(),
			format_address(&address_arg(args, 0)?),
			uint_arg(args, 1),
		)),
		"transferFrom" => ActionKind::Transfer(movement(
			format_address(&address_arg(args, 0)?),
			format_address(&address_arg(args, 1)?),
			uint_arg(args, 2),
		)),
		"mint" => ActionKind::Mint(movement(
			ZERO_ADDRESS.to_string(),
			format_address(&address_arg(args, 0)?),
			uint_arg(args, 1),
		)),
		_ => ActionKind::Issue(movement(
			ZERO_ADDRESS.to_string(),
			sender.to_string(),
			uint_arg(args, 0),
		)),
	};

	Ok(Some(TokenCall { method, kind }))
}
