//! Property tests: paths built from parameters match back to the same
//! parameters.

use bezem_urls::{ParamValue, Params, build_path, match_path};
use proptest::prelude::*;

proptest! {
	#[test]
	fn prop_build_then_match_recovers_params(
		id in "[a-zA-Z0-9_~-]{1,12}",
		parts in prop::collection::vec("[a-z0-9 %!]{1,6}", 0..4),
	) {
		let pattern = "/users/:id/files/:path*";
		let mut input = Params::new();
		input.insert("id".to_string(), ParamValue::One(id.clone()));
		if !parts.is_empty() {
			input.insert("path".to_string(), ParamValue::Many(parts.clone()));
		}

		let path = build_path(pattern, &input).expect("Should build");
		let matched = match_path(pattern, &path, true, &[], &Params::new())
			.expect("Valid pattern")
			.expect("Built path should match");

		prop_assert_eq!(matched.params.get("id"), Some(&ParamValue::One(id)));
		prop_assert_eq!(matched.params.get("path"), Some(&ParamValue::Many(parts)));
	}

	#[test]
	fn prop_optional_segment_round_trips(lang in prop::option::of("[a-z]{2}")) {
		let pattern = "/:lang?/catalogue";
		let mut input = Params::new();
		if let Some(lang) = &lang {
			input.insert("lang".to_string(), ParamValue::One(lang.clone()));
		}

		let path = build_path(pattern, &input).expect("Should build");
		let matched = match_path(pattern, &path, true, &[], &Params::new())
			.expect("Valid pattern")
			.expect("Built path should match");

		prop_assert_eq!(matched.params.get("lang").cloned(), lang.map(ParamValue::One));
	}
}
