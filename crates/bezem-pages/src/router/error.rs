//! Route configuration and navigation errors.

use super::context::ResolutionContext;
use bezem_urls::PatternError;
use thiserror::Error;

/// Result type for navigation operations.
pub type RouterResult<T> = Result<T, RouteError>;

/// Hard cap on consecutive redirects within one render.
pub const MAX_REDIRECT_COUNT: u32 = 256;

/// Malformed route configuration or URL-building input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
	/// A route with no way to produce a result.
	#[error(
		"Expected route config \"{path}\" to include either \"component\", \"redirect\", \"bundle\" or \"action\" function but none found."
	)]
	MissingResolution {
		/// Path of the offending route.
		path: String,
	},

	/// A script bundle that is not a `.js` source.
	#[error("Unsupported type for bundle \"{src}\": .js must be used")]
	UnsupportedBundle {
		/// Bundle source.
		src: String,
	},

	/// A split bundle with neither variant.
	#[error(
		"Expected route bundle of \"{path}\" to include either \"nomodule\" or \"module\" keys, or both"
	)]
	EmptyBundle {
		/// Path of the offending route.
		path: String,
	},

	/// Two routes share a name.
	#[error("Duplicate route with name \"{name}\". Try setting unique 'name' route properties.")]
	DuplicateName {
		/// The ambiguous name.
		name: String,
	},

	/// No route carries the name.
	#[error("Route \"{name}\" not found")]
	UnknownName {
		/// The missing name.
		name: String,
	},

	/// The configured base URL cannot be resolved.
	#[error("Invalid base URL \"{base}\": {reason}")]
	InvalidBaseUrl {
		/// Configured base.
		base: String,
		/// Parser message.
		reason: String,
	},

	/// Pattern compilation or path building failed.
	#[error(transparent)]
	Pattern(#[from] PatternError),
}

/// Navigation error.
///
/// Resolution failures carry the [`ResolutionContext`] they happened in once
/// the resolver has enriched them.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum RouteError {
	/// Invalid configuration or parameters.
	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// No route produced a result.
	#[error("Page not found ({pathname})")]
	NotFound {
		/// The pathname that was being resolved.
		pathname: String,
		/// The context resolution stopped in.
		context: Option<Box<ResolutionContext>>,
	},

	/// A route action, lazy-children callback or guard failed.
	#[error("{message}")]
	Handler {
		/// Description of the failure.
		message: String,
		/// Http-style status code.
		code: u16,
		/// The context resolution stopped in.
		context: Option<Box<ResolutionContext>>,
	},

	/// More than [`MAX_REDIRECT_COUNT`] redirects in one render.
	#[error("Too many redirects when rendering {from}")]
	RedirectLoop {
		/// Pathname of the last redirect source.
		from: String,
	},

	/// A route bundle failed to load.
	#[error("Bundle not found: {src}. Check if the file name is correct")]
	BundleLoad {
		/// The bundle that failed.
		src: String,
		/// Loader message.
		reason: String,
		/// The context resolution stopped in.
		context: Option<Box<ResolutionContext>>,
	},

	/// A render had to attach content but no outlet was set.
	#[error("Expected router outlet to be a valid DOM Node")]
	Outlet,
}

impl RouteError {
	/// A handler failure with code 500.
	pub fn handler(message: impl Into<String>) -> Self {
		Self::Handler {
			message: message.into(),
			code: 500,
			context: None,
		}
	}

	/// A handler failure with an explicit code.
	pub fn with_code(message: impl Into<String>, code: u16) -> Self {
		Self::Handler {
			message: message.into(),
			code,
			context: None,
		}
	}

	pub(crate) fn not_found(context: &ResolutionContext) -> Self {
		Self::NotFound {
			pathname: context.pathname.clone(),
			context: Some(Box::new(context.without_next())),
		}
	}

	/// Http-style status code.
	pub fn code(&self) -> u16 {
		match self {
			Self::NotFound { .. } => 404,
			Self::Handler { code, .. } => *code,
			_ => 500,
		}
	}

	/// The context the error was raised in, if attached.
	pub fn context(&self) -> Option<&ResolutionContext> {
		match self {
			Self::NotFound { context, .. }
			| Self::Handler { context, .. }
			| Self::BundleLoad { context, .. } => context.as_deref(),
			_ => None,
		}
	}

	/// Attaches `context` unless one is already present.
	pub(crate) fn with_context(mut self, resolved: &ResolutionContext) -> Self {
		if let Self::NotFound { context, .. }
		| Self::Handler { context, .. }
		| Self::BundleLoad { context, .. } = &mut self
			&& context.is_none()
		{
			*context = Some(Box::new(resolved.without_next()));
		}
		self
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}
}

impl From<PatternError> for RouteError {
	fn from(error: PatternError) -> Self {
		Self::Validation(ValidationError::Pattern(error))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(RouteError::handler("boom"), 500)]
	#[case(RouteError::with_code("gone", 410), 410)]
	#[case(RouteError::RedirectLoop { from: "/x".into() }, 500)]
	#[case(RouteError::Outlet, 500)]
	fn test_error_codes(#[case] error: RouteError, #[case] expected: u16) {
		// Act & Assert
		assert_eq!(error.code(), expected);
	}

	#[rstest]
	fn test_not_found_carries_context() {
		// Arrange
		let context = ResolutionContext::new("/a/x");

		// Act
		let error = RouteError::not_found(&context);

		// Assert
		assert_eq!(error.code(), 404);
		assert_eq!(error.to_string(), "Page not found (/a/x)");
		assert_eq!(error.context().map(|c| c.pathname.as_str()), Some("/a/x"));
	}

	#[rstest]
	fn test_with_context_keeps_existing() {
		// Arrange
		let original = ResolutionContext::new("/first");
		let later = ResolutionContext::new("/second");

		// Act
		let error = RouteError::not_found(&original).with_context(&later);

		// Assert
		assert_eq!(error.context().map(|c| c.pathname.as_str()), Some("/first"));
	}

	#[rstest]
	fn test_with_context_fills_handler_error() {
		// Arrange
		let context = ResolutionContext::new("/broken");

		// Act
		let error = RouteError::handler("boom").with_context(&context);

		// Assert
		assert_eq!(error.context().map(|c| c.pathname.as_str()), Some("/broken"));
	}

	#[rstest]
	fn test_pattern_errors_are_validation_errors() {
		// Arrange
		let pattern = PatternError::ExpectedString { name: "id".into() };

		// Act
		let error = RouteError::from(pattern);

		// Assert
		assert!(matches!(
			error,
			RouteError::Validation(ValidationError::Pattern(_))
		));
	}
}
