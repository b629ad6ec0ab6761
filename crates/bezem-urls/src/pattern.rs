//! Express-style path patterns.
//!
//! A pattern is a mix of literal text and parameter tokens:
//!
//! - `/users/:id` - named parameter matching one segment
//! - `/users/:id(\d+)` - named parameter with a custom regex
//! - `/files/(.*)` - unnamed parameter, keyed by its index
//! - `:name?`, `:name*`, `:name+` - optional, zero-or-more and one-or-more
//!
//! A delimiter (`/` or `.`) written right before a token becomes that token's
//! prefix, so `/:lang?/about` matches both `/about` and `/en/about`.
//!
//! Patterns are parsed into [`Segment`]s and compiled into a single regular
//! expression by [`CompiledPattern::compile`].

use crate::error::{PatternError, PatternResult};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Delimiter used when a token has no explicit prefix.
pub const DEFAULT_DELIMITER: char = '/';

/// Characters that may act as a token prefix.
const DEFAULT_DELIMITERS: &str = "./";

/// Maximum allowed length for a pattern string in bytes.
pub const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed size for a compiled pattern regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

/// Name of the group that marks a delimiter which must follow a prefix
/// match without being consumed by it.
const LOOKAHEAD_GROUP: &str = "ahead";

static PATH_TOKEN: Lazy<Regex> = Lazy::new(|| {
	Regex::new(
		r"(\\.)|(?:\:(\w+)(?:\(((?:\\.|[^\\()])+)\))?|\(((?:\\.|[^\\()])+)\))([+*?])?",
	)
	.expect("PATH_TOKEN: invalid regex pattern")
});

/// Name of a parameter token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenName {
	/// `:name` tokens.
	Named(String),
	/// Unnamed `(regex)` tokens, numbered from zero in pattern order.
	Index(usize),
}

impl TokenName {
	/// Key under which the token's value is stored in [`crate::Params`].
	pub fn key(&self) -> String {
		self.to_string()
	}
}

impl fmt::Display for TokenName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Named(name) => f.write_str(name),
			Self::Index(index) => write!(f, "{index}"),
		}
	}
}

/// A compiled parameter token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	/// Parameter name or index.
	pub name: TokenName,
	/// Delimiter consumed in front of the token, empty when none.
	pub prefix: String,
	/// Separator between repeated values.
	pub delimiter: String,
	/// `?` or `*` modifier.
	pub optional: bool,
	/// `+` or `*` modifier.
	pub repeat: bool,
	/// The prefix differs from the character that follows the token, so it
	/// stays in built paths even when the value is absent.
	pub partial: bool,
	/// Regex fragment a single value must match.
	pub pattern: String,
}

/// One piece of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	/// Text matched verbatim.
	Literal(String),
	/// A parameter.
	Param(Token),
}

impl Segment {
	/// Returns the token if this segment is a parameter.
	pub fn as_token(&self) -> Option<&Token> {
		match self {
			Self::Param(token) => Some(token),
			Self::Literal(_) => None,
		}
	}
}

/// Parses a pattern into literal and parameter segments.
///
/// Parsing never fails; unrecognised syntax is kept as literal text.
pub fn parse(source: &str) -> Vec<Segment> {
	let mut segments = Vec::new();
	let mut next_index = 0usize;
	let mut index = 0usize;
	let mut path = String::new();
	let mut path_escaped = false;

	for caps in PATH_TOKEN.captures_iter(source) {
		let Some(whole) = caps.get(0) else {
			continue;
		};
		path.push_str(&source[index..whole.start()]);
		index = whole.end();

		if let Some(escaped) = caps.get(1) {
			path.extend(escaped.as_str().chars().skip(1));
			path_escaped = true;
			continue;
		}

		let next = source[index..].chars().next();
		let mut prev = None;
		if !path_escaped
			&& let Some(last) = path.chars().last()
			&& DEFAULT_DELIMITERS.contains(last)
		{
			prev = Some(last);
			path.pop();
		}

		if !path.is_empty() {
			segments.push(Segment::Literal(std::mem::take(&mut path)));
			path_escaped = false;
		}

		let modifier = caps.get(5).map(|m| m.as_str());
		let delimiter = prev.unwrap_or(DEFAULT_DELIMITER).to_string();
		let pattern = match caps.get(3).or_else(|| caps.get(4)) {
			Some(custom) => escape_group(custom.as_str()),
			None => format!("[^{}]+?", regex::escape(&delimiter)),
		};
		let name = match caps.get(2) {
			Some(name) => TokenName::Named(name.as_str().to_string()),
			None => {
				next_index += 1;
				TokenName::Index(next_index - 1)
			}
		};

		segments.push(Segment::Param(Token {
			name,
			prefix: prev.map(String::from).unwrap_or_default(),
			delimiter,
			optional: matches!(modifier, Some("?") | Some("*")),
			repeat: matches!(modifier, Some("+") | Some("*")),
			partial: prev.is_some() && next.is_some() && next != prev,
			pattern,
		}));
	}

	if !path.is_empty() || index < source.len() {
		path.push_str(&source[index..]);
		segments.push(Segment::Literal(path));
	}

	segments
}

/// Escapes unescaped `$` in a user-supplied capture so it cannot anchor the
/// surrounding expression.
fn escape_group(group: &str) -> String {
	let mut escaped = String::with_capacity(group.len());
	let mut chars = group.chars();
	while let Some(c) = chars.next() {
		match c {
			'\\' => {
				escaped.push(c);
				if let Some(next) = chars.next() {
					escaped.push(next);
				}
			}
			'$' => escaped.push_str("\\$"),
			_ => escaped.push(c),
		}
	}
	escaped
}

/// Options controlling regex generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
	/// Anchor at the end of the path. Prefix matching when false.
	pub end: bool,
	/// Disallow the optional trailing delimiter.
	pub strict: bool,
	/// Case-sensitive matching.
	pub sensitive: bool,
}

impl Default for CompileOptions {
	fn default() -> Self {
		Self {
			end: true,
			strict: false,
			sensitive: false,
		}
	}
}

/// Captures produced by [`CompiledPattern::exec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternCaptures {
	/// The matched prefix of the input (the whole input in `end` mode,
	/// possibly including one trailing delimiter).
	pub matched: String,
	/// Raw captured value for each key, `None` when an optional token is absent.
	pub values: Vec<Option<String>>,
}

/// A pattern compiled to a regular expression.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
	source: String,
	segments: Vec<Segment>,
	keys: Vec<Token>,
	regex: Regex,
	options: CompileOptions,
}

impl CompiledPattern {
	/// Parses and compiles `source`.
	///
	/// # Errors
	///
	/// Returns [`PatternError::TooLong`] for patterns over
	/// [`MAX_PATTERN_LENGTH`] bytes, and [`PatternError::InvalidRegex`] when a
	/// custom capture produces an invalid expression.
	pub fn compile(source: &str, options: CompileOptions) -> PatternResult<Self> {
		if source.len() > MAX_PATTERN_LENGTH {
			return Err(PatternError::TooLong {
				length: source.len(),
				max: MAX_PATTERN_LENGTH,
			});
		}

		let segments = parse(source);
		let keys: Vec<Token> = segments
			.iter()
			.filter_map(Segment::as_token)
			.cloned()
			.collect();
		let expression = Self::build_expression(&segments, options);

		let regex = RegexBuilder::new(&expression)
			.case_insensitive(!options.sensitive)
			.size_limit(MAX_REGEX_SIZE)
			.build()
			.map_err(|e| PatternError::InvalidRegex {
				pattern: source.to_string(),
				reason: e.to_string(),
			})?;

		Ok(Self {
			source: source.to_string(),
			segments,
			keys,
			regex,
			options,
		})
	}

	fn build_expression(segments: &[Segment], options: CompileOptions) -> String {
		let delimiter = regex::escape(&DEFAULT_DELIMITER.to_string());
		let mut route = String::from("^");
		let mut end_delimited = segments.is_empty();

		for (i, segment) in segments.iter().enumerate() {
			match segment {
				Segment::Literal(text) => {
					route.push_str(&regex::escape(text));
					end_delimited = i == segments.len() - 1
						&& text
							.chars()
							.last()
							.is_some_and(|c| DEFAULT_DELIMITERS.contains(c));
				}
				Segment::Param(token) => {
					let capture = if token.repeat {
						format!(
							"(?:{p})(?:{d}(?:{p}))*",
							p = token.pattern,
							d = regex::escape(&token.delimiter)
						)
					} else {
						token.pattern.clone()
					};
					let prefix = regex::escape(&token.prefix);
					if !token.optional {
						route.push_str(&format!("{prefix}({capture})"));
					} else if token.partial {
						route.push_str(&format!("{prefix}({capture})?"));
					} else {
						route.push_str(&format!("(?:{prefix}({capture}))?"));
					}
				}
			}
		}

		if options.end {
			if !options.strict {
				route.push_str(&format!("(?:{delimiter})?"));
			}
			route.push('$');
		} else {
			// The remainder must start at a delimiter or be empty. A lone
			// trailing delimiter is consumed unless strict.
			match (options.strict, end_delimited) {
				(false, false) => route.push_str(&format!(
					"(?:{delimiter}$|(?P<{LOOKAHEAD_GROUP}>{delimiter})|$)"
				)),
				(false, true) => route.push_str(&format!("(?:{delimiter}$)?")),
				(true, false) => {
					route.push_str(&format!("(?:(?P<{LOOKAHEAD_GROUP}>{delimiter})|$)"))
				}
				(true, true) => {}
			}
		}

		route
	}

	/// The source pattern.
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Parsed segments in pattern order.
	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	/// Parameter tokens in capture order.
	pub fn keys(&self) -> &[Token] {
		&self.keys
	}

	/// Options the pattern was compiled with.
	pub fn options(&self) -> CompileOptions {
		self.options
	}

	/// The generated regular expression.
	pub fn regex(&self) -> &Regex {
		&self.regex
	}

	/// Whether `path` matches.
	pub fn is_match(&self, path: &str) -> bool {
		self.regex.is_match(path)
	}

	/// Runs the pattern against `path`, returning the matched prefix and the
	/// raw (still percent-encoded) captures.
	pub fn exec(&self, path: &str) -> Option<PatternCaptures> {
		let caps = self.regex.captures(path)?;
		let whole = caps.get(0)?;
		let end = caps
			.name(LOOKAHEAD_GROUP)
			.map_or(whole.end(), |ahead| ahead.start());
		let values = (1..=self.keys.len())
			.map(|i| caps.get(i).map(|m| m.as_str().to_string()))
			.collect();

		Some(PatternCaptures {
			matched: path[..end].to_string(),
			values,
		})
	}
}

impl fmt::Display for CompiledPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.source)
	}
}

impl PartialEq for CompiledPattern {
	fn eq(&self, other: &Self) -> bool {
		self.source == other.source && self.options == other.options
	}
}
