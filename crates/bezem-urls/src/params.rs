//! Path parameter values and URI component encoding.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Parameters captured from (or supplied to) a path pattern, keyed by name.
///
/// Unnamed captures use their zero-based index as the key.
pub type Params = HashMap<String, ParamValue>;

/// Characters `encode_component` leaves untouched, matching the browser's
/// `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'!')
	.remove(b'~')
	.remove(b'*')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')');

/// A single captured value, or the segments of a repeatable capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
	/// Value of a non-repeatable token.
	One(String),
	/// Values of a repeatable (`+` / `*`) token, one per segment.
	Many(Vec<String>),
}

impl ParamValue {
	/// Returns the single value, if this is not a repeated capture.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::One(value) => Some(value),
			Self::Many(_) => None,
		}
	}

	/// Returns the segments of a repeated capture.
	pub fn as_slice(&self) -> Option<&[String]> {
		match self {
			Self::One(_) => None,
			Self::Many(values) => Some(values),
		}
	}

	/// Whether this value is a repeated capture.
	pub fn is_many(&self) -> bool {
		matches!(self, Self::Many(_))
	}
}

impl fmt::Display for ParamValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::One(value) => f.write_str(value),
			Self::Many(values) => f.write_str(&values.join("/")),
		}
	}
}

impl From<&str> for ParamValue {
	fn from(value: &str) -> Self {
		Self::One(value.to_string())
	}
}

impl From<String> for ParamValue {
	fn from(value: String) -> Self {
		Self::One(value)
	}
}

impl<T: Into<String>> From<Vec<T>> for ParamValue {
	fn from(values: Vec<T>) -> Self {
		Self::Many(values.into_iter().map(Into::into).collect())
	}
}

macro_rules! impl_param_value_from_display {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for ParamValue {
				fn from(value: $ty) -> Self {
					Self::One(value.to_string())
				}
			}
		)*
	};
}

impl_param_value_from_display!(i32, i64, u32, u64, usize, bool);

/// Builds a [`Params`] map from `(name, value)` pairs.
pub fn params<I, K, V>(pairs: I) -> Params
where
	I: IntoIterator<Item = (K, V)>,
	K: Into<String>,
	V: Into<ParamValue>,
{
	pairs
		.into_iter()
		.map(|(key, value)| (key.into(), value.into()))
		.collect()
}

/// Percent-encodes a path component the way `encodeURIComponent` does.
pub fn encode_component(value: &str) -> String {
	utf8_percent_encode(value, COMPONENT).to_string()
}

/// Decodes a percent-encoded component.
///
/// Malformed escapes or invalid UTF-8 yield the raw input unchanged; this
/// never fails.
pub fn decode_component(value: &str) -> String {
	if !has_valid_escapes(value) {
		return value.to_string();
	}
	match percent_decode_str(value).decode_utf8() {
		Ok(decoded) => decoded.into_owned(),
		Err(_) => value.to_string(),
	}
}

fn has_valid_escapes(value: &str) -> bool {
	let bytes = value.as_bytes();
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'%' {
			let valid = bytes.len() > i + 2
				&& bytes[i + 1].is_ascii_hexdigit()
				&& bytes[i + 2].is_ascii_hexdigit();
			if !valid {
				return false;
			}
			i += 3;
		} else {
			i += 1;
		}
	}
	true
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("hello world", "hello%20world")]
	#[case("a/b", "a%2Fb")]
	#[case("it's (fine)!", "it's%20(fine)!")]
	#[case("caf\u{e9}", "caf%C3%A9")]
	fn test_encode_component(#[case] input: &str, #[case] expected: &str) {
		// Act
		let encoded = encode_component(input);

		// Assert
		assert_eq!(encoded, expected);
	}

	#[rstest]
	#[case("hello%20world", "hello world")]
	#[case("caf%C3%A9", "caf\u{e9}")]
	#[case("100%", "100%")]
	#[case("%zz", "%zz")]
	#[case("%C3", "%C3")]
	fn test_decode_component_never_fails(#[case] input: &str, #[case] expected: &str) {
		// Act
		let decoded = decode_component(input);

		// Assert
		assert_eq!(decoded, expected);
	}

	#[rstest]
	fn test_params_builder_accepts_mixed_values() {
		// Arrange & Act
		let built = params([
			("id", ParamValue::from(42)),
			("path", ParamValue::from(vec!["a", "b"])),
		]);

		// Assert
		assert_eq!(built["id"].as_str(), Some("42"));
		assert_eq!(
			built["path"].as_slice(),
			Some(&["a".to_string(), "b".to_string()][..])
		);
		assert!(built["path"].is_many());
	}
}
