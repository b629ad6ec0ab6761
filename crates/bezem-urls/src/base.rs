//! Base URL handling for applications mounted below the site root.

use std::fmt;
use url::Url;

/// An absolute base URL ending in `/`, against which router paths are
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
	href: Url,
}

impl BaseUrl {
	/// Resolves `base` against `document_url` and drops everything after the
	/// last `/`, so `/app/index.html` and `/app/` both yield `<origin>/app/`.
	///
	/// # Errors
	///
	/// Returns the URL parse error when either input cannot be resolved.
	pub fn resolve(base: &str, document_url: &str) -> Result<Self, url::ParseError> {
		let resolved = Url::parse(document_url)?.join(base)?;
		let href = resolved.as_str();
		let trimmed = match href.rfind('/') {
			Some(index) => &href[..=index],
			None => href,
		};
		Ok(Self {
			href: Url::parse(trimmed)?,
		})
	}

	/// The base URL as a string.
	pub fn as_str(&self) -> &str {
		self.href.as_str()
	}

	/// Path component of the base, e.g. `/app/`.
	pub fn path(&self) -> &str {
		self.href.path()
	}

	/// Rewrites a browser pathname into a base-relative router path.
	///
	/// Returns `None` when the pathname lies outside the base, in which case
	/// the router must not handle it.
	pub fn strip(&self, pathname: &str) -> Option<String> {
		let normalized = self.href.join(pathname).ok()?;
		normalized
			.as_str()
			.strip_prefix(self.href.as_str())
			.map(String::from)
	}

	/// Turns a router path into a browser pathname below the base.
	pub fn apply(&self, pathname: &str) -> String {
		let relative = pathname.strip_prefix('/').unwrap_or(pathname);
		match self.href.join(relative) {
			Ok(url) => url.path().to_string(),
			Err(_) => pathname.to_string(),
		}
	}
}

impl fmt::Display for BaseUrl {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.href.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn base() -> BaseUrl {
		BaseUrl::resolve("/app/", "http://localhost:8080/app/index.html").expect("Valid base")
	}

	#[rstest]
	#[case("/app/", "http://localhost/other", "http://localhost/app/")]
	#[case("/app/index.html", "http://localhost/", "http://localhost/app/")]
	#[case("sub/", "http://localhost/app/page", "http://localhost/app/sub/")]
	fn test_resolve_trims_last_segment(
		#[case] raw: &str,
		#[case] document: &str,
		#[case] expected: &str,
	) {
		// Act
		let resolved = BaseUrl::resolve(raw, document).expect("Valid base");

		// Assert
		assert_eq!(resolved.as_str(), expected);
	}

	#[rstest]
	fn test_strip_inside_base(base: BaseUrl) {
		// Act & Assert
		assert_eq!(base.strip("/app/users/1"), Some("users/1".to_string()));
		assert_eq!(base.strip("/app/"), Some(String::new()));
	}

	#[rstest]
	fn test_strip_outside_base(base: BaseUrl) {
		// Act & Assert
		assert_eq!(base.strip("/elsewhere"), None);
	}

	#[rstest]
	fn test_apply_prefixes_base_path(base: BaseUrl) {
		// Act & Assert
		assert_eq!(base.apply("/users/1"), "/app/users/1");
		assert_eq!(base.apply("users"), "/app/users");
	}
}
