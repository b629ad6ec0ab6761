//! Building paths from patterns and parameters.

use crate::error::{PatternError, PatternResult};
use crate::params::{ParamValue, Params, encode_component};
use crate::pattern::{MAX_PATTERN_LENGTH, Segment, Token, parse};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

static BUILDER_CACHE: Lazy<RwLock<HashMap<String, Arc<PathBuilder>>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Reverse of a compiled pattern: turns parameters back into a path.
///
/// # Examples
///
/// ```
/// use bezem_urls::{PathBuilder, params};
///
/// let builder = PathBuilder::new("/users/:id/posts/:slug?").unwrap();
/// let path = builder.build(&params([("id", "42")])).unwrap();
/// assert_eq!(path, "/users/42/posts");
/// ```
#[derive(Debug)]
pub struct PathBuilder {
	segments: Vec<Segment>,
	/// Per-segment validator, `None` for literals.
	validators: Vec<Option<Regex>>,
}

impl PathBuilder {
	/// Parses `pattern` and compiles one validator per parameter.
	///
	/// # Errors
	///
	/// Fails when the pattern is too long or a custom capture is not a valid
	/// regular expression.
	pub fn new(pattern: &str) -> PatternResult<Self> {
		if pattern.len() > MAX_PATTERN_LENGTH {
			return Err(PatternError::TooLong {
				length: pattern.len(),
				max: MAX_PATTERN_LENGTH,
			});
		}

		let segments = parse(pattern);
		let validators = segments
			.iter()
			.map(|segment| match segment {
				Segment::Literal(_) => Ok(None),
				Segment::Param(token) => Regex::new(&format!("^(?:{})$", token.pattern))
					.map(Some)
					.map_err(|e| PatternError::InvalidRegex {
						pattern: pattern.to_string(),
						reason: e.to_string(),
					}),
			})
			.collect::<PatternResult<Vec<_>>>()?;

		Ok(Self {
			segments,
			validators,
		})
	}

	/// Parameter tokens in pattern order.
	pub fn tokens(&self) -> impl Iterator<Item = &Token> {
		self.segments.iter().filter_map(Segment::as_token)
	}

	/// Builds a path from `params`.
	///
	/// Values are percent-encoded and then validated against their token's
	/// pattern. Absent optional values are skipped along with their prefix,
	/// except for partial tokens, whose prefix is still written.
	///
	/// # Errors
	///
	/// Returns a [`PatternError`] naming the first parameter that is missing,
	/// repeats when it must not, or fails validation.
	pub fn build(&self, params: &Params) -> PatternResult<String> {
		let mut path = String::new();

		for (segment, validator) in self.segments.iter().zip(&self.validators) {
			let (token, validator) = match (segment, validator) {
				(Segment::Literal(text), _) => {
					path.push_str(text);
					continue;
				}
				(Segment::Param(token), Some(validator)) => (token, validator),
				(Segment::Param(_), None) => continue,
			};
			let name = token.name.key();

			match params.get(&name) {
				Some(ParamValue::Many(values)) => {
					if !token.repeat {
						return Err(PatternError::UnexpectedRepeat { name });
					}
					if values.is_empty() {
						if token.optional {
							continue;
						}
						return Err(PatternError::EmptyRepeat { name });
					}
					for (i, value) in values.iter().enumerate() {
						let encoded = Self::validate(token, validator, &name, value)?;
						path.push_str(if i == 0 {
							&token.prefix
						} else {
							&token.delimiter
						});
						path.push_str(&encoded);
					}
				}
				Some(ParamValue::One(value)) => {
					let encoded = Self::validate(token, validator, &name, value)?;
					path.push_str(&token.prefix);
					path.push_str(&encoded);
				}
				None if token.optional => {
					if token.partial {
						path.push_str(&token.prefix);
					}
				}
				None if token.repeat => return Err(PatternError::ExpectedArray { name }),
				None => return Err(PatternError::ExpectedString { name }),
			}
		}

		Ok(path)
	}

	fn validate(token: &Token, validator: &Regex, name: &str, value: &str) -> PatternResult<String> {
		let encoded = encode_component(value);
		if validator.is_match(&encoded) {
			Ok(encoded)
		} else {
			Err(PatternError::Mismatch {
				name: name.to_string(),
				pattern: token.pattern.clone(),
				value: encoded,
			})
		}
	}
}

/// Returns a cached [`PathBuilder`] for `pattern`.
pub fn path_builder(pattern: &str) -> PatternResult<Arc<PathBuilder>> {
	if let Some(builder) = BUILDER_CACHE.read().get(pattern) {
		return Ok(Arc::clone(builder));
	}
	let builder = Arc::new(PathBuilder::new(pattern)?);
	Ok(Arc::clone(
		BUILDER_CACHE
			.write()
			.entry(pattern.to_string())
			.or_insert(builder),
	))
}

/// Builds a path for `pattern` from `params`.
///
/// Shorthand for [`path_builder`] followed by [`PathBuilder::build`].
pub fn build_path(pattern: &str, params: &Params) -> PatternResult<String> {
	path_builder(pattern)?.build(params)
}
