//! Published router location.

use super::context::ResolutionContext;
use super::error::RouterResult;
use super::tree::{RouteRef, join_paths};
use bezem_urls::{BaseUrl, Params, build_path};

/// Snapshot of where the router is, built after every successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterLocation {
	/// The base URL the router is mounted under, or empty.
	pub base_url: String,
	pub pathname: String,
	pub search: String,
	pub hash: String,
	/// Routes of the resolved chain, outermost first.
	pub routes: Vec<RouteRef>,
	/// The route the location was built for; the deepest one by default.
	pub route: Option<RouteRef>,
	pub params: Params,
	/// Pathname that redirected here, if any.
	pub redirect_from: Option<String>,
	base: Option<BaseUrl>,
}

impl RouterLocation {
	/// The location before any render.
	pub fn empty(base: Option<BaseUrl>) -> Self {
		Self {
			base_url: base.as_ref().map(|b| b.as_str().to_string()).unwrap_or_default(),
			pathname: String::new(),
			search: String::new(),
			hash: String::new(),
			routes: Vec::new(),
			route: None,
			params: Params::new(),
			redirect_from: None,
			base,
		}
	}

	/// Builds the location for `context`, focused on `route` when given.
	pub(crate) fn from_context(context: &ResolutionContext, route: Option<&RouteRef>) -> Self {
		let routes: Vec<RouteRef> = context
			.chain
			.iter()
			.map(|entry| entry.route().clone())
			.collect();
		let route = route.cloned().or_else(|| routes.last().cloned());
		Self {
			base_url: context
				.base
				.as_ref()
				.map(|b| b.as_str().to_string())
				.unwrap_or_default(),
			pathname: context.pathname.clone(),
			search: context.search.clone(),
			hash: context.hash.clone(),
			routes,
			route,
			params: context.params.clone(),
			redirect_from: context.redirect_from.clone(),
			base: context.base.clone(),
		}
	}

	/// Rebuilds the URL of the matched route pattern, with this location's
	/// parameters overridden by `params`.
	///
	/// # Errors
	///
	/// Fails when a parameter the pattern needs is missing or invalid.
	pub fn get_url(&self, params: &Params) -> RouterResult<String> {
		let pattern = join_paths(self.routes.iter().map(RouteRef::path));
		let mut merged = self.params.clone();
		merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
		let path = build_path(&pattern, &merged)?;
		Ok(match &self.base {
			Some(base) => base.apply(&path),
			None => path,
		})
	}
}
