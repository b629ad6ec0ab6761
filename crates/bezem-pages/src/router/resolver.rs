//! Pathname resolution over a route tree.
//!
//! [`Resolver::resolve`] walks the routes matching a pathname depth-first and
//! hands each to a resolve-route callback until one produces a result. The
//! default callback runs the route's action.

use super::context::{
	ActionResult, ChainEntry, Commands, NextOutcome, ResolutionContext, RouteResult,
};
use super::error::{RouteError, RouterResult, ValidationError};
use super::route::Route;
use super::tree::{MatchCursor, RouteMatch, RouteTree};
use crate::dom::Document;
use bezem_urls::BaseUrl;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// What a resolve-route callback decided for one matched route.
#[derive(Debug, Clone)]
pub enum Resolution {
	/// Resolution ends with this result.
	Done(RouteResult),
	/// The route has nothing to offer; its children are tried next.
	Decline,
	/// The route and its subtree are skipped.
	NotFound,
}

/// Future returned by a resolve-route callback.
pub type ResolutionFuture = LocalBoxFuture<'static, Result<Resolution, RouteError>>;

/// Decides what a matched route resolves to.
pub type ResolveRouteFn = Rc<dyn Fn(ResolutionContext) -> ResolutionFuture>;

/// Turns a resolution failure into a result to show instead.
pub type ErrorHandler = Rc<dyn Fn(&RouteError) -> RouteResult>;

/// How the previous candidate was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrevResult {
	None,
	Declined,
	NotFound,
}

/// Resolver configuration.
#[derive(Clone, Default)]
pub struct ResolverOptions {
	/// Pathnames outside this base are not resolved.
	pub base_url: Option<BaseUrl>,
	pub error_handler: Option<ErrorHandler>,
	/// Replaces the default action-running callback.
	pub resolve_route: Option<ResolveRouteFn>,
	/// Document used for `Commands::component`.
	pub document: Option<Document>,
}

impl fmt::Debug for ResolverOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolverOptions")
			.field("base_url", &self.base_url)
			.field("error_handler", &self.error_handler.is_some())
			.field("resolve_route", &self.resolve_route.is_some())
			.finish()
	}
}

/// Resolves pathnames against a route tree.
#[derive(Clone)]
pub struct Resolver {
	inner: Rc<ResolverInner>,
}

pub(crate) struct ResolverInner {
	tree: RefCell<RouteTree>,
	base: Option<BaseUrl>,
	error_handler: Option<ErrorHandler>,
	resolve_route: ResolveRouteFn,
}

impl Resolver {
	/// # Errors
	///
	/// Fails when a route does not validate.
	pub fn new(routes: Vec<Route>, options: ResolverOptions) -> RouterResult<Self> {
		let document = options.document.unwrap_or_default();
		let resolve_route = options
			.resolve_route
			.unwrap_or_else(|| default_resolve_route(document));
		Ok(Self {
			inner: Rc::new(ResolverInner {
				tree: RefCell::new(RouteTree::new(routes)?),
				base: options.base_url,
				error_handler: options.error_handler,
				resolve_route,
			}),
		})
	}

	pub fn base_url(&self) -> Option<&BaseUrl> {
		self.inner.base.as_ref()
	}

	/// Top-level routes.
	pub fn routes(&self) -> Vec<Route> {
		self.inner.tree.borrow().routes()
	}

	/// Replaces all routes.
	pub fn set_routes(&self, routes: Vec<Route>) -> Result<(), ValidationError> {
		self.inner.tree.borrow_mut().set_routes(routes)
	}

	/// Appends top-level routes and returns the full list.
	pub fn add_routes(&self, routes: Vec<Route>) -> Result<Vec<Route>, ValidationError> {
		let mut tree = self.inner.tree.borrow_mut();
		tree.add_routes(routes)?;
		Ok(tree.routes())
	}

	pub fn remove_routes(&self) {
		self.inner.tree.borrow_mut().clear();
	}

	pub(crate) fn error_handler(&self) -> Option<&ErrorHandler> {
		self.inner.error_handler.as_ref()
	}

	pub(crate) fn tree(&self) -> &RefCell<RouteTree> {
		&self.inner.tree
	}

	/// Rewrites a browser pathname into the path the routes match against.
	/// `None` when the pathname lies outside the base URL.
	pub fn normalize_pathname(&self, pathname: &str) -> Option<String> {
		self.inner.normalize_pathname(pathname)
	}

	/// Turns a router path back into a browser pathname.
	pub fn pathname_for_router(&self, pathname: &str) -> String {
		match &self.inner.base {
			Some(base) => base.apply(pathname),
			None => pathname.to_string(),
		}
	}

	/// Resolves `request` to the first route producing a result.
	///
	/// # Errors
	///
	/// Fails with [`RouteError::NotFound`] when no route produced a result,
	/// or with the error a callback raised. Either carries the context
	/// resolution stopped in. With an error handler configured, its result is
	/// returned instead.
	pub fn resolve(
		&self,
		request: impl Into<ResolutionContext>,
	) -> LocalBoxFuture<'static, RouterResult<ResolutionContext>> {
		let mut base = request.into();
		base.base = self.inner.base.clone();
		Rc::clone(&self.inner).resolve(base).boxed_local()
	}
}

impl fmt::Debug for Resolver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resolver")
			.field("base", &self.inner.base)
			.field("routes", &self.routes().len())
			.finish()
	}
}

impl ResolverInner {
	fn normalize_pathname(&self, pathname: &str) -> Option<String> {
		match &self.base {
			Some(base) => base.strip(pathname),
			None => Some(pathname.to_string()),
		}
	}

	async fn resolve(self: Rc<Self>, base: ResolutionContext) -> RouterResult<ResolutionContext> {
		let Some(pathname) = self.normalize_pathname(&base.pathname) else {
			tracing::debug!(pathname = %base.pathname, "Pathname outside the base URL");
			return self.recover(RouteError::not_found(&base), &base);
		};

		let cursor = {
			let tree = self.tree.borrow();
			MatchCursor::new(&tree, tree.root(), &pathname, self.base.is_some())
		};
		let root = self.tree.borrow().root();
		let session = Rc::new(ResolveSession {
			resolver: Rc::clone(&self),
			cursor: RefCell::new(cursor),
			current: RefCell::new(None),
			buffered: RefCell::new(None),
			base_context: base.clone(),
			current_context: RefCell::new(base.clone()),
		});

		let error = match Rc::clone(&session)
			.next(true, Some(root), PrevResult::None)
			.await
		{
			Ok(NextOutcome::Found(context)) => return Ok(*context),
			Ok(NextOutcome::NotFound) => RouteError::not_found(&base),
			Err(error) => error,
		};
		let current = session.current_context.borrow().clone();
		self.recover(error, &current)
	}

	fn recover(&self, error: RouteError, current: &ResolutionContext) -> RouterResult<ResolutionContext> {
		let mut message = format!(
			"Path '{}' is not properly resolved due to an error.",
			current.pathname
		);
		if let Some(route) = current.route.as_ref().filter(|r| !r.path().is_empty()) {
			message.push_str(&format!(
				" Resolution had failed on route: '{}'",
				route.path()
			));
		}
		tracing::warn!(code = error.code(), "{message}");

		let error = error.with_context(current);
		match &self.error_handler {
			Some(handler) => {
				let mut recovered = current.without_next();
				recovered.result = Some(handler(&error));
				recovered.recovered = true;
				Ok(recovered)
			}
			None => Err(error),
		}
	}
}

/// Iteration state of one `resolve` call, shared by the contexts it creates.
pub(crate) struct ResolveSession {
	resolver: Rc<ResolverInner>,
	cursor: RefCell<MatchCursor>,
	/// Last candidate taken from the cursor.
	current: RefCell<Option<RouteMatch>>,
	/// Candidate handed back by a `next` call that was outside its parent.
	buffered: RefCell<Option<Option<RouteMatch>>>,
	base_context: ResolutionContext,
	current_context: RefCell<ResolutionContext>,
}

impl ResolveSession {
	/// Takes the next candidate and resolves it.
	///
	/// Unless `resume` is set, a candidate outside `parent` (default: the
	/// current route) is kept for the following call and `NotFound` is
	/// returned.
	pub(crate) fn next(
		self: Rc<Self>,
		resume: bool,
		parent: Option<super::tree::RouteId>,
		prev: PrevResult,
	) -> LocalBoxFuture<'static, RouterResult<NextOutcome>> {
		async move {
			let current_route = self.current.borrow().as_ref().map(|m| m.route.id());
			let parent = parent.or(current_route);
			let skip = if prev == PrevResult::NotFound {
				current_route
			} else {
				None
			};

			let buffered = self.buffered.borrow_mut().take();
			let candidate = match buffered {
				Some(candidate) => candidate,
				None => {
					let tree = self.resolver.tree.borrow();
					self.cursor.borrow_mut().next(&tree, skip)?
				}
			};
			*self.current.borrow_mut() = candidate.clone();

			if !resume {
				let is_child = match (&candidate, parent) {
					(Some(found), Some(parent)) => self
						.resolver
						.tree
						.borrow()
						.is_descendant(found.route.id(), parent),
					_ => false,
				};
				if !is_child {
					*self.buffered.borrow_mut() = Some(candidate);
					return Ok(NextOutcome::NotFound);
				}
			}

			let Some(found) = candidate else {
				return Err(RouteError::not_found(&self.base_context));
			};

			let mut context = self.base_context.fork();
			context.chain = self.current_context.borrow().chain.clone();
			context.route = Some(found.route.clone());
			context.params = found.params.clone();
			context.keys = found.keys.clone();
			context.path = found.path.clone();
			update_chain(&mut context, &found);
			*self.current_context.borrow_mut() = context.clone();

			let resolution = (self.resolver.resolve_route)(
				context.clone().with_session(Rc::clone(&self)),
			)
			.await?;

			match resolution {
				Resolution::Done(result) => {
					tracing::debug!(
						route = %found.route.path(),
						pathname = %context.pathname,
						"Route resolved"
					);
					// A nested `next` call may have moved on to a deeper context.
					let mut resolved = self.current_context.borrow().clone();
					resolved.result = Some(result.clone());
					self.current_context.borrow_mut().result = Some(result);
					Ok(NextOutcome::Found(Box::new(resolved.with_session(self))))
				}
				Resolution::Decline => self.next(resume, parent, PrevResult::Declined).await,
				Resolution::NotFound => self.next(resume, parent, PrevResult::NotFound).await,
			}
		}
		.boxed_local()
	}
}

/// Appends the matched route to the chain, first dropping entries that are
/// not ancestors of it. The synthetic root never enters the chain.
fn update_chain(context: &mut ResolutionContext, found: &RouteMatch) {
	if found.route.is_root() {
		return;
	}
	let parent = found.route.parent();
	while context
		.chain
		.last()
		.is_some_and(|top| Some(top.route().id()) != parent)
	{
		context.chain.pop();
	}
	context.chain.push(Rc::new(ChainEntry::new(
		found.path.clone(),
		found.route.clone(),
		None,
	)));
}

/// Runs the matched route's action, if any.
pub fn default_resolve_route(document: Document) -> ResolveRouteFn {
	Rc::new(move |context: ResolutionContext| {
		let commands = Commands::new(document.clone(), &context);
		let action = context
			.route
			.as_ref()
			.and_then(|route| route.route().get_action().cloned());
		async move {
			let Some(action) = action else {
				return Ok(Resolution::Decline);
			};
			Ok(interpret_action_result(action(context, commands).await?))
		}
		.boxed_local()
	})
}

pub(crate) fn interpret_action_result(result: Option<ActionResult>) -> Resolution {
	match result {
		None => Resolution::Decline,
		Some(ActionResult::Element(element)) => Resolution::Done(RouteResult::Element(element)),
		Some(ActionResult::Redirect(redirect)) => Resolution::Done(RouteResult::Redirect(redirect)),
		Some(ActionResult::NotFound) => Resolution::NotFound,
		Some(ActionResult::Context(context)) => match context.result {
			Some(result) => Resolution::Done(result),
			None => Resolution::Decline,
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::Element;
	use futures::executor::block_on;
	use rstest::rstest;

	fn page(path: &str, tag: &'static str) -> Route {
		Route::new(path).action(move |_, commands| async move { Ok(Some(commands.component(tag))) })
	}

	fn tag_of(context: &ResolutionContext) -> Option<String> {
		context
			.result_element()
			.map(|element| element.local_name().to_string())
	}

	#[rstest]
	fn test_resolves_first_route_with_result() {
		// Arrange
		let resolver = Resolver::new(
			vec![page("/a", "x-a"), page("/b", "x-b")],
			ResolverOptions::default(),
		)
		.expect("Valid routes");

		// Act
		let context = block_on(resolver.resolve("/b")).expect("Should resolve");

		// Assert
		assert_eq!(tag_of(&context), Some("x-b".to_string()));
		assert_eq!(context.chain.len(), 1);
	}

	#[rstest]
	fn test_declining_route_tries_its_children() {
		// Arrange
		let resolver = Resolver::new(
			vec![
				Route::new("/a")
					.action(|_, _| async { Ok(None) })
					.children(vec![page("/b", "x-b")]),
			],
			ResolverOptions::default(),
		)
		.expect("Valid routes");

		// Act
		let context = block_on(resolver.resolve("/a/b")).expect("Should resolve");

		// Assert
		assert_eq!(tag_of(&context), Some("x-b".to_string()));
		let paths: Vec<&str> = context.chain.iter().map(|e| e.route().path()).collect();
		assert_eq!(paths, vec!["/a", "/b"]);
	}

	#[rstest]
	fn test_not_found_result_skips_subtree() {
		// Arrange
		let resolver = Resolver::new(
			vec![
				Route::new("/a")
					.action(|_, _| async { Ok(Some(ActionResult::NotFound)) })
					.children(vec![page("/b", "x-nested")]),
				page("/a/b", "x-flat"),
			],
			ResolverOptions::default(),
		)
		.expect("Valid routes");

		// Act
		let context = block_on(resolver.resolve("/a/b")).expect("Should resolve");

		// Assert
		assert_eq!(tag_of(&context), Some("x-flat".to_string()));
	}

	#[rstest]
	fn test_action_can_wrap_next_result() {
		// Arrange
		let resolver = Resolver::new(
			vec![
				Route::new("/a")
					.action(|context, _| async move {
						let outcome = context.next().await?;
						Ok(Some(ActionResult::from(outcome)))
					})
					.children(vec![page("/b", "x-b")]),
			],
			ResolverOptions::default(),
		)
		.expect("Valid routes");

		// Act
		let context = block_on(resolver.resolve("/a/b")).expect("Should resolve");

		// Assert
		assert_eq!(tag_of(&context), Some("x-b".to_string()));
	}

	#[rstest]
	fn test_exhausted_routes_fail_not_found_with_context() {
		// Arrange
		let resolver = Resolver::new(
			vec![Route::new("/a").children(vec![page("/b", "x-b")])],
			ResolverOptions::default(),
		)
		.expect("Valid routes");

		// Act
		let error = block_on(resolver.resolve("/a/x")).expect_err("Should not resolve");

		// Assert
		assert_eq!(error.code(), 404);
		assert_eq!(error.context().map(|c| c.pathname.as_str()), Some("/a/x"));
	}

	#[rstest]
	fn test_handler_error_carries_context() {
		// Arrange
		let resolver = Resolver::new(
			vec![Route::new("/boom").action(|_, _| async { Err(RouteError::handler("boom")) })],
			ResolverOptions::default(),
		)
		.expect("Valid routes");

		// Act
		let error = block_on(resolver.resolve("/boom")).expect_err("Should fail");

		// Assert
		assert_eq!(error.code(), 500);
		let route = error.context().and_then(|c| c.route.clone());
		assert_eq!(route.map(|r| r.path().to_string()), Some("/boom".to_string()));
	}

	#[rstest]
	fn test_error_handler_result_is_installed() {
		// Arrange
		let options = ResolverOptions {
			error_handler: Some(Rc::new(|error: &RouteError| {
				let element = Element::new("x-error");
				element.set_attribute("code", error.code().to_string());
				RouteResult::Element(element)
			})),
			..ResolverOptions::default()
		};
		let resolver = Resolver::new(vec![page("/a", "x-a")], options).expect("Valid routes");

		// Act
		let context = block_on(resolver.resolve("/missing")).expect("Recovered");

		// Assert
		let element = context.result_element().expect("Error element");
		assert_eq!(element.local_name(), "x-error");
		assert_eq!(element.get_attribute("code").as_deref(), Some("404"));
	}

	#[rstest]
	fn test_base_url_strips_prefix() {
		// Arrange
		let options = ResolverOptions {
			base_url: Some(BaseUrl::resolve("/app/", "http://localhost/").expect("Valid base")),
			..ResolverOptions::default()
		};
		let resolver = Resolver::new(vec![page("/users", "x-users")], options).expect("Valid routes");

		// Act
		let inside = block_on(resolver.resolve("/app/users")).expect("Should resolve");
		let outside = block_on(resolver.resolve("/users"));

		// Assert
		assert_eq!(tag_of(&inside), Some("x-users".to_string()));
		assert!(outside.is_err());
		assert_eq!(resolver.pathname_for_router("/users"), "/app/users");
	}

	#[rstest]
	fn test_custom_resolve_route_replaces_actions() {
		// Arrange
		let options = ResolverOptions {
			resolve_route: Some(Rc::new(|context: ResolutionContext| {
				async move {
					let Some(route) = context.route.filter(|route| !route.is_root()) else {
						return Ok(Resolution::Decline);
					};
					let element = Element::new("x-custom");
					element.set_attribute("path", route.path());
					Ok(Resolution::Done(RouteResult::Element(element)))
				}
				.boxed_local()
			})),
			..ResolverOptions::default()
		};
		let resolver = Resolver::new(vec![Route::new("/a").component("x-a")], options)
			.expect("Valid routes");

		// Act
		let context = block_on(resolver.resolve("/a")).expect("Should resolve");

		// Assert
		let element = context.result_element().expect("Element");
		assert_eq!(element.get_attribute("path").as_deref(), Some("/a"));
	}
}
