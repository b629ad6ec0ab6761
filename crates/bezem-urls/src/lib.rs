//! Path patterns for the bezem client-side router.
//!
//! This crate compiles express-style route paths (`/users/:id`, `/files/:path+`,
//! `/:lang?/about`, `/post/(\d+)`) into regular expressions, matches them
//! against pathnames with parameter inheritance between nested routes, and
//! builds paths back from parameters.
//!
//! ## Example
//!
//! ```
//! use bezem_urls::{Params, build_path, match_path, params};
//!
//! let matched = match_path("/user/:id", "/user/42", true, &[], &Params::new())
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(matched.params["id"].as_str(), Some("42"));
//!
//! let path = build_path("/user/:id", &params([("id", "7")])).unwrap();
//! assert_eq!(path, "/user/7");
//! ```

pub mod base;
pub mod error;
pub mod matcher;
pub mod params;
pub mod pattern;
pub mod reverse;

pub use base::BaseUrl;
pub use error::{PatternError, PatternResult};
pub use matcher::{PathMatch, compile_route_path, match_path};
pub use params::{ParamValue, Params, decode_component, encode_component, params};
pub use pattern::{
	CompileOptions, CompiledPattern, DEFAULT_DELIMITER, MAX_PATTERN_LENGTH, PatternCaptures, Segment,
	Token, TokenName, parse,
};
pub use reverse::{PathBuilder, build_path, path_builder};
