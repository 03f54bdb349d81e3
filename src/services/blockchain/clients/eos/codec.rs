//! Binary decoding of EOS names, assets and packed transactions.
//!
//! Integers are little endian, lengths and counts are LEB128 `varuint32`, names are 64-bit
//! values holding up to 13 base-32 characters.

use chrono::DateTime;

use crate::models::{
	BigValue, EOSAction, EOSPermissionLevel, EOSUnpackedTransaction,
};

const NAME_CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// Renders a 64-bit EOS name, dropping trailing dots.
pub fn name_to_string(value: u64) -> String {
	let mut chars = [b'.'; 13];
	let mut rest = value;
	for i in 0..13 {
		let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
		chars[12 - i] = NAME_CHARMAP[(rest & mask) as usize];
		rest >>= shift;
	}
	String::from_utf8_lossy(&chars)
		.trim_end_matches('.')
		.to_string()
}

/// Token quantity, e.g. `1.0000 EOS` is amount 10000 with precision 4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
	pub amount: i64,
	pub precision: u8,
	pub symbol: String,
}

impl Asset {
	/// Parses the textual form used in JSON action data.
	pub fn parse(quantity: &str) -> Result<Self, String> {
		let (number, symbol) = quantity
			.trim()
			.split_once(' ')
			.ok_or_else(|| format!("asset '{}' has no symbol", quantity))?;
		let symbol = symbol.trim();
		if symbol.is_empty()
			|| symbol.len() > 7
			|| !symbol.bytes().all(|b| b.is_ascii_uppercase())
		{
			return Err(format!("asset '{}' has an invalid symbol", quantity));
		}

		let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
		let (negative, int_part) = match int_part.strip_prefix('-') {
			Some(rest) => (true, rest),
			None => (false, int_part),
		};
		let digits = format!("{}{}", int_part, frac_part);
		if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
			return Err(format!("asset '{}' has an invalid amount", quantity));
		}
		let magnitude: i64 = digits
			.parse()
			.map_err(|e| format!("asset '{}' amount overflows: {}", quantity, e))?;

		Ok(Self {
			amount: if negative { -magnitude } else { magnitude },
			precision: u8::try_from(frac_part.len())
				.map_err(|_| format!("asset '{}' precision too large", quantity))?,
			symbol: symbol.to_string(),
		})
	}

	/// Unsigned amount for the canonical model. Negative quantities never move tokens.
	pub fn value(&self) -> Result<BigValue, String> {
		u64::try_from(self.amount)
			.map(BigValue::from)
			.map_err(|_| format!("negative quantity {} {}", self.amount, self.symbol))
	}
}

/// Cursor over a binary payload.
pub struct Reader<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> Reader<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0 }
	}

	pub fn is_empty(&self) -> bool {
		self.pos >= self.data.len()
	}

	fn take(&mut self, len: usize) -> Result<&'a [u8], String> {
		let end = self
			.pos
			.checked_add(len)
			.filter(|end| *end <= self.data.len())
			.ok_or_else(|| {
				format!(
					"unexpected end of data: need {} bytes at offset {}, have {}",
					len,
					self.pos,
					self.data.len()
				)
			})?;
		let slice = &self.data[self.pos..end];
		self.pos = end;
		Ok(slice)
	}

	fn array<const N: usize>(&mut self) -> Result<[u8; N], String> {
		let mut out = [0u8; N];
		out.copy_from_slice(self.take(N)?);
		Ok(out)
	}

	pub fn u8(&mut self) -> Result<u8, String> {
		Ok(self.take(1)?[0])
	}

	pub fn u16(&mut self) -> Result<u16, String> {
		Ok(u16::from_le_bytes(self.array()?))
	}

	pub fn u32(&mut self) -> Result<u32, String> {
		Ok(u32::from_le_bytes(self.array()?))
	}

	pub fn u64(&mut self) -> Result<u64, String> {
		Ok(u64::from_le_bytes(self.array()?))
	}

	pub fn i64(&mut self) -> Result<i64, String> {
		Ok(i64::from_le_bytes(self.array()?))
	}

	pub fn varuint32(&mut self) -> Result<u32, String> {
		let mut value: u64 = 0;
		let mut shift = 0;
		loop {
			let byte = self.u8()?;
			value |= u64::from(byte & 0x7f) << shift;
			if byte & 0x80 == 0 {
				break;
			}
			shift += 7;
			if shift > 28 {
				return Err("varuint32 is longer than 5 bytes".to_string());
			}
		}
		u32::try_from(value).map_err(|_| "varuint32 overflows".to_string())
	}

	pub fn name(&mut self) -> Result<String, String> {
		Ok(name_to_string(self.u64()?))
	}

	pub fn bytes(&mut self) -> Result<&'a [u8], String> {
		let len = self.varuint32()? as usize;
		self.take(len)
	}

	pub fn string(&mut self) -> Result<String, String> {
		let raw = self.bytes()?;
		String::from_utf8(raw.to_vec()).map_err(|e| format!("invalid UTF-8 string: {}", e))
	}

	pub fn asset(&mut self) -> Result<Asset, String> {
		let amount = self.i64()?;
		let symbol = self.u64()?;
		let precision = (symbol & 0xff) as u8;
		let code: String = (symbol >> 8)
			.to_le_bytes()
			.iter()
			.take_while(|b| **b != 0)
			.map(|b| *b as char)
			.collect();
		if code.is_empty() || !code.bytes().all(|b| b.is_ascii_uppercase()) {
			return Err(format!("invalid asset symbol '{}'", code));
		}
		Ok(Asset {
			amount,
			precision,
			symbol: code,
		})
	}

	fn action(&mut self) -> Result<EOSAction, String> {
		let account = self.name()?;
		let name = self.name()?;
		let auth_count = self.varuint32()?;
		let mut authorization = Vec::with_capacity(auth_count.min(16) as usize);
		for _ in 0..auth_count {
			authorization.push(EOSPermissionLevel {
				actor: self.name()?,
				permission: self.name()?,
			});
		}
		let data = hex::encode(self.bytes()?);
		Ok(EOSAction {
			account,
			name,
			authorization,
			data: serde_json::Value::Null,
			hex_data: Some(data),
		})
	}

	fn actions(&mut self) -> Result<Vec<EOSAction>, String> {
		let count = self.varuint32()?;
		let mut actions = Vec::with_capacity(count.min(64) as usize);
		for _ in 0..count {
			actions.push(self.action()?);
		}
		Ok(actions)
	}
}

/// Unpacks an uncompressed `packed_trx` hex string.
pub fn unpack_transaction(packed_hex: &str) -> Result<EOSUnpackedTransaction, String> {
	let raw = hex::decode(packed_hex).map_err(|e| format!("packed_trx is not hex: {}", e))?;
	let mut reader = Reader::new(&raw);

	let expiration = reader.u32()?;
	let expiration = DateTime::from_timestamp(i64::from(expiration), 0)
		.map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
		.ok_or_else(|| format!("invalid expiration {}", expiration))?;

	let transaction = EOSUnpackedTransaction {
		expiration,
		ref_block_num: reader.u16()?,
		ref_block_prefix: reader.u32()?,
		max_net_usage_words: reader.varuint32()?,
		max_cpu_usage_ms: reader.u8()?,
		delay_sec: reader.varuint32()?,
		context_free_actions: reader.actions()?,
		actions: reader.actions()?,
	};

	// transaction_extensions are (u16 type, bytes) pairs with no canonical counterpart
	let extensions = reader.varuint32()?;
	for _ in 0..extensions {
		reader.u16()?;
		reader.bytes()?;
	}

	Ok(transaction)
}

/// Token action payload decoded from binary action data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPayload {
	Transfer {
		from: String,
		to: String,
		quantity: Asset,
		memo: String,
	},
	Issue {
		to: String,
		quantity: Asset,
		memo: String,
	},
	Create {
		issuer: String,
		maximum_supply: Asset,
	},
}

/// Decodes the binary data of a `transfer`, `issue` or `create` action.
///
/// The payload must be consumed exactly.
pub fn decode_token_payload(name: &str, data: &[u8]) -> Result<TokenPayload, String> {
	let mut reader = Reader::new(data);
	let payload = match name {
		"transfer" => TokenPayload::Transfer {
			from: reader.name()?,
			to: reader.name()?,
			quantity: reader.asset()?,
			memo: reader.string()?,
		},
		"issue" => TokenPayload::Issue {
			to: reader.name()?,
			quantity: reader.asset()?,
			memo: reader.string()?,
		},
		"create" => TokenPayload::Create {
			issuer: reader.name()?,
			maximum_supply: reader.asset()?,
		},
		other => return Err(format!("'{}' is not a token action", other)),
	};
	if !reader.is_empty() {
		return Err(format!("trailing bytes after {} payload", name));
	}
	Ok(payload)
}
