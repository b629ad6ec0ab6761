//! Errors raised while compiling patterns and building paths.

use thiserror::Error;

/// Errors produced by pattern compilation and reverse path building.
///
/// Every reverse-building variant names the offending parameter so the
/// caller can point at the route configuration that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PatternError {
	/// The pattern exceeds the maximum supported length.
	#[error("Pattern length {length} exceeds maximum allowed length of {max} bytes")]
	TooLong {
		/// Length of the rejected pattern.
		length: usize,
		/// Configured maximum.
		max: usize,
	},

	/// The generated regular expression failed to compile.
	#[error("Failed to compile pattern \"{pattern}\": {reason}")]
	InvalidRegex {
		/// The source pattern.
		pattern: String,
		/// Message reported by the regex engine.
		reason: String,
	},

	/// A required non-repeatable parameter has no value.
	#[error("Expected \"{name}\" to be a string")]
	ExpectedString {
		/// Parameter name.
		name: String,
	},

	/// A required repeatable parameter has no value.
	#[error("Expected \"{name}\" to be an array")]
	ExpectedArray {
		/// Parameter name.
		name: String,
	},

	/// An array value was supplied for a parameter that does not repeat.
	#[error("Expected \"{name}\" to not repeat, but got array")]
	UnexpectedRepeat {
		/// Parameter name.
		name: String,
	},

	/// An empty array was supplied for a required repeatable parameter.
	#[error("Expected \"{name}\" to not be empty")]
	EmptyRepeat {
		/// Parameter name.
		name: String,
	},

	/// The encoded value does not satisfy the parameter's pattern.
	#[error("Expected \"{name}\" to match \"{pattern}\", but got \"{value}\"")]
	Mismatch {
		/// Parameter name.
		name: String,
		/// The token's regex fragment.
		pattern: String,
		/// The encoded value that failed validation.
		value: String,
	},
}

impl PatternError {
	/// Returns the parameter this error refers to, if any.
	pub fn param_name(&self) -> Option<&str> {
		match self {
			Self::ExpectedString { name }
			| Self::ExpectedArray { name }
			| Self::UnexpectedRepeat { name }
			| Self::EmptyRepeat { name }
			| Self::Mismatch { name, .. } => Some(name),
			Self::TooLong { .. } | Self::InvalidRegex { .. } => None,
		}
	}
}

/// Result type for pattern operations.
pub type PatternResult<T> = Result<T, PatternError>;
