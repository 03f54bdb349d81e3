//! Case-insensitive deserialization for `{"type": ..., "value": ...}` enums.

/// Implements `Deserialize` for an adjacently tagged enum whose variants hold a single string.
///
/// The `type` tag is matched without regard to case, so `"plain"`, `"Plain"` and `"PLAIN"` all
/// select the same variant. Each variant must be constructible from a `String` via `Into`.
#[macro_export]
macro_rules! impl_case_insensitive_enum {
	($enum_name:ident, { $($variant_str:expr => $variant:ident),* $(,)? }) => {
		impl<'de> ::serde::Deserialize<'de> for $enum_name {
			fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
			where
				D: ::serde::Deserializer<'de>,
			{
				#[derive(::serde::Deserialize)]
				#[serde(deny_unknown_fields)]
				struct Tagged {
					#[serde(rename = "type")]
					kind: String,
					value: String,
				}

				const VARIANTS: &[&str] = &[$($variant_str),*];

				let Tagged { kind, value } = Tagged::deserialize(deserializer)?;
				match kind.to_lowercase().as_str() {
					$($variant_str => Ok($enum_name::$variant(value.into())),)*
					_ => Err(<D::Error as ::serde::de::Error>::unknown_variant(&kind, VARIANTS)),
				}
			}
		}
	};
}
