//! Navigation lifecycle callbacks of routed elements.

use super::context::Redirect;
use super::core::Router;
use super::error::RouteError;
use super::location::RouterLocation;
use bezem_urls::Params;
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};

/// A guard's verdict when it does not let the navigation proceed.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
	/// Stay where the router was.
	Cancel,
	/// Go elsewhere.
	Redirect(Redirect),
}

impl GuardOutcome {
	pub fn is_redirect(&self) -> bool {
		matches!(self, Self::Redirect(_))
	}
}

/// Future returned by a guard. `Ok(None)` lets the navigation proceed.
pub type GuardFuture = LocalBoxFuture<'static, Result<Option<GuardOutcome>, RouteError>>;

/// A guard future that lets the navigation proceed.
pub fn proceed() -> GuardFuture {
	future::ready(Ok(None)).boxed_local()
}

/// Commands available to [`Lifecycle::on_before_leave`].
#[derive(Debug, Clone, Default)]
pub struct BeforeLeaveCommands;

impl BeforeLeaveCommands {
	pub fn prevent(&self) -> GuardOutcome {
		GuardOutcome::Cancel
	}
}

/// Commands available to [`Lifecycle::on_before_enter`].
#[derive(Debug, Clone)]
pub struct BeforeEnterCommands {
	pathname: String,
	params: Params,
}

impl BeforeEnterCommands {
	pub(crate) fn new(pathname: String, params: Params) -> Self {
		Self { pathname, params }
	}

	pub fn prevent(&self) -> GuardOutcome {
		GuardOutcome::Cancel
	}

	/// Redirects to `pathname`, built with the pending navigation's
	/// parameters.
	pub fn redirect(&self, pathname: impl Into<String>) -> GuardOutcome {
		GuardOutcome::Redirect(Redirect {
			pathname: pathname.into(),
			from: self.pathname.clone(),
			params: self.params.clone(),
		})
	}
}

/// Callbacks a routed element may implement.
///
/// Before-callbacks run before the outlet changes and may stop the
/// navigation; leave callbacks run deepest-first, then enter callbacks run
/// outermost-first. After-callbacks run once the new content is attached.
/// The element's `location` is updated before any of them is called.
pub trait Lifecycle {
	fn on_before_leave(
		&self,
		_location: &RouterLocation,
		_commands: &BeforeLeaveCommands,
		_router: &Router,
	) -> GuardFuture {
		proceed()
	}

	fn on_before_enter(
		&self,
		_location: &RouterLocation,
		_commands: &BeforeEnterCommands,
		_router: &Router,
	) -> GuardFuture {
		proceed()
	}

	fn on_after_enter(&self, _location: &RouterLocation, _router: &Router) {}

	fn on_after_leave(&self, _location: &RouterLocation, _router: &Router) {}
}
