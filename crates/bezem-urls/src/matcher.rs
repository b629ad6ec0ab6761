//! Route path matching with parameter inheritance.

use crate::error::PatternResult;
use crate::params::{ParamValue, Params, decode_component};
use crate::pattern::{CompileOptions, CompiledPattern, Token};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type CacheKey = (String, bool);

/// Compiled route patterns, keyed by pattern and exactness. Entries live for
/// the rest of the process.
static PATTERN_CACHE: Lazy<RwLock<HashMap<CacheKey, Arc<CompiledPattern>>>> =
	Lazy::new(|| RwLock::new(HashMap::new()));

/// Result of matching a route path against (a suffix of) a pathname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
	/// The consumed prefix of the pathname.
	pub path: String,
	/// Parent keys followed by this pattern's keys.
	pub keys: Vec<Token>,
	/// Inherited parameters overlaid with the values captured here.
	pub params: Params,
}

/// Returns the compiled form of a route path, compiling it on first use.
///
/// Exact patterns are end-anchored; non-exact ones match a prefix ending at
/// a segment boundary. The empty pattern is always strict so that it never
/// consumes a delimiter.
pub fn compile_route_path(route_path: &str, exact: bool) -> PatternResult<Arc<CompiledPattern>> {
	let key = (route_path.to_string(), exact);
	if let Some(compiled) = PATTERN_CACHE.read().get(&key) {
		tracing::trace!(pattern = %route_path, exact, "Pattern cache hit");
		return Ok(Arc::clone(compiled));
	}

	let compiled = Arc::new(CompiledPattern::compile(
		route_path,
		CompileOptions {
			end: exact,
			strict: route_path.is_empty(),
			sensitive: false,
		},
	)?);
	tracing::trace!(pattern = %route_path, exact, "Pattern compiled");

	Ok(Arc::clone(
		PATTERN_CACHE.write().entry(key).or_insert(compiled),
	))
}

/// Matches `route_path` against `path`.
///
/// Captured values are percent-decoded, and repeatable captures are split on
/// their delimiter. A parameter already present in `parent_params` is only
/// replaced when this match captured a value for it.
///
/// Returns `Ok(None)` when the path does not match.
pub fn match_path(
	route_path: &str,
	path: &str,
	exact: bool,
	parent_keys: &[Token],
	parent_params: &Params,
) -> PatternResult<Option<PathMatch>> {
	let compiled = compile_route_path(route_path, exact)?;
	let Some(captures) = compiled.exec(path) else {
		return Ok(None);
	};

	let mut params = parent_params.clone();
	for (key, value) in compiled.keys().iter().zip(captures.values) {
		let name = key.name.key();
		if value.is_none() && params.contains_key(&name) {
			continue;
		}
		match (key.repeat, value) {
			(true, Some(value)) if !value.is_empty() => {
				let parts = value
					.split(key.delimiter.as_str())
					.map(decode_component)
					.collect();
				params.insert(name, ParamValue::Many(parts));
			}
			(true, _) => {
				params.insert(name, ParamValue::Many(Vec::new()));
			}
			(false, Some(value)) => {
				params.insert(name, ParamValue::One(decode_component(&value)));
			}
			(false, None) => {}
		}
	}

	let mut keys = parent_keys.to_vec();
	keys.extend_from_slice(compiled.keys());

	Ok(Some(PathMatch {
		path: captures.matched,
		keys,
		params,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::params;
	use rstest::rstest;

	#[rstest]
	fn test_match_single_parameter() {
		// Act
		let result = match_path("/user/:id", "/user/42", true, &[], &Params::new())
			.expect("Valid pattern")
			.expect("Should match");

		// Assert
		assert_eq!(result.path, "/user/42");
		assert_eq!(result.params["id"].as_str(), Some("42"));
		assert_eq!(result.keys.len(), 1);
	}

	#[rstest]
	fn test_match_missing_segment_returns_none() {
		// Act
		let result =
			match_path("/user/:id", "/user/", true, &[], &Params::new()).expect("Valid pattern");

		// Assert
		assert!(result.is_none());
	}

	#[rstest]
	fn test_match_repeat_splits_and_decodes() {
		// Act
		let result = match_path("/files/:path+", "/files/a/b%20c/d", true, &[], &Params::new())
			.expect("Valid pattern")
			.expect("Should match");

		// Assert
		assert_eq!(
			result.params["path"],
			ParamValue::from(vec!["a", "b c", "d"])
		);
	}

	#[rstest]
	fn test_match_absent_optional_repeat_is_empty_list() {
		// Act
		let result = match_path("/tags/:tag*", "/tags", true, &[], &Params::new())
			.expect("Valid pattern")
			.expect("Should match");

		// Assert
		assert_eq!(result.params["tag"], ParamValue::Many(Vec::new()));
	}

	#[rstest]
	fn test_match_keeps_parent_value_when_absent() {
		// Arrange
		let parent = params([("lang", "nl")]);

		// Act
		let result = match_path("/:lang?/about", "/about", true, &[], &parent)
			.expect("Valid pattern")
			.expect("Should match");

		// Assert
		assert_eq!(result.params["lang"].as_str(), Some("nl"));
	}

	#[rstest]
	fn test_match_overrides_parent_value_when_captured() {
		// Arrange
		let parent = params([("id", "1")]);

		// Act
		let result = match_path("/:id", "/2", true, &[], &parent)
			.expect("Valid pattern")
			.expect("Should match");

		// Assert
		assert_eq!(result.params["id"].as_str(), Some("2"));
	}

	#[rstest]
	fn test_match_malformed_escape_kept_raw() {
		// Act
		let result = match_path("/q/:term", "/q/100%", true, &[], &Params::new())
			.expect("Valid pattern")
			.expect("Should match");

		// Assert
		assert_eq!(result.params["term"].as_str(), Some("100%"));
	}

	#[rstest]
	fn test_compile_route_path_is_cached() {
		// Act
		let first = compile_route_path("/cached/:id", false).expect("Valid pattern");
		let second = compile_route_path("/cached/:id", false).expect("Valid pattern");
		let exact = compile_route_path("/cached/:id", true).expect("Valid pattern");

		// Assert
		assert!(Arc::ptr_eq(&first, &second));
		assert!(!Arc::ptr_eq(&first, &exact));
	}
}
