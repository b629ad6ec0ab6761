//! The navigation controller.
//!
//! A [`Router`] owns an outlet element and keeps it in sync with the window
//! location. Each render runs through these stages:
//!
//! 1. resolve the pathname, following redirects;
//! 2. descend into matching children until the whole pathname is consumed;
//! 3. run before-leave and before-enter guards, which may cancel or redirect;
//! 4. swap the changed part of the outlet subtree, with an optional
//!    transition;
//! 5. publish the location, sync history and fire `location-changed`.
//!
//! Every render holds a [`RenderToken`]. Once a newer render starts, an older
//! one stops at its next suspension point without touching the outlet,
//! history or the published location.

use super::animation::{Animator, CssAnimator};
use super::bundle::{BundleCache, HeadScriptLoader};
use super::context::{ChainEntry, Commands, NextOutcome, Redirect, ResolutionContext, RouteResult};
use super::error::{MAX_REDIRECT_COUNT, RouteError, RouterResult, ValidationError};
use super::generation::{RenderGeneration, RenderToken};
use super::lifecycle::{BeforeEnterCommands, BeforeLeaveCommands, GuardOutcome};
use super::location::RouterLocation;
use super::resolver::{
	PrevResult, Resolution, ResolveRouteFn, Resolver, ResolverOptions, interpret_action_result,
};
use super::route::{Animate, Children, Route};
use super::settings::RouterOptions;
use super::triggers::{NavigationTrigger, default_triggers, fire_go, go_dispatch};
use super::tree::RouteRef;
use crate::dom::{
	Element, ErrorDetail, Event, EventData, EventKind, ListenerId, NavigationIntent,
	ROUTER_IGNORE_STATE, Window, WindowLocation,
};
use bezem_urls::{BaseUrl, Params, build_path};
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture, Shared};
use futures::task::{LocalSpawn, LocalSpawnExt};
use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use url::Url;

/// Outcome of one render: the published location, or `None` when a newer
/// render superseded this one.
pub type RenderOutcome = Result<Option<RouterLocation>, RouteError>;

/// Handle to a render, awaitable any number of times.
pub type RenderFuture = Shared<LocalBoxFuture<'static, RenderOutcome>>;

/// Client-side router bound to a window and an outlet element.
#[derive(Clone)]
pub struct Router {
	inner: Rc<RouterInner>,
}

struct RouterInner {
	window: Window,
	resolver: Resolver,
	outlet: RefCell<Option<Element>>,
	location: RefCell<RouterLocation>,
	previous_context: RefCell<Option<ResolutionContext>>,
	generation: RenderGeneration,
	ready: RefCell<RenderFuture>,
	appearing: RefCell<Option<Vec<Element>>>,
	disappearing: RefCell<Option<Vec<Element>>>,
	bundles: BundleCache,
	animator: Rc<dyn Animator>,
	spawner: Option<Rc<dyn LocalSpawn>>,
	triggers: RefCell<Vec<Rc<dyn NavigationTrigger>>>,
	go_listener: Cell<Option<ListenerId>>,
}

/// A guard to run, with the location it receives.
enum GuardStep {
	Leave(Element, RouterLocation),
	Enter(Element, RouterLocation),
}

impl Router {
	/// Creates a router rendering into `outlet`, subscribed to `go` events on
	/// `window` and with the configured navigation triggers active.
	///
	/// No render happens until routes are set.
	///
	/// # Errors
	///
	/// Fails with [`ValidationError::InvalidBaseUrl`] when the base URL cannot
	/// be resolved against the window URL.
	pub fn new(outlet: Option<Element>, window: &Window, options: RouterOptions) -> RouterResult<Self> {
		let document = window.document();
		let base = match options.base_url.clone().or_else(|| document.base_href()) {
			Some(base) => Some(BaseUrl::resolve(&base, &window.href()).map_err(|error| {
				ValidationError::InvalidBaseUrl {
					base: base.clone(),
					reason: error.to_string(),
				}
			})?),
			None => None,
		};

		let slot: Rc<OnceCell<Weak<RouterInner>>> = Rc::new(OnceCell::new());
		let resolver = Resolver::new(
			Vec::new(),
			ResolverOptions {
				base_url: base.clone(),
				error_handler: options.error_handler.clone(),
				resolve_route: Some(router_resolve_route(Rc::clone(&slot))),
				document: Some(document.clone()),
			},
		)?;

		let animator = options
			.animator
			.clone()
			.unwrap_or_else(|| Rc::new(CssAnimator::new(document.clone())));
		let loader = options
			.script_loader
			.clone()
			.unwrap_or_else(|| Rc::new(HeadScriptLoader::new(document)));
		let inner = Rc::new(RouterInner {
			window: window.clone(),
			resolver,
			outlet: RefCell::new(None),
			location: RefCell::new(RouterLocation::empty(base)),
			previous_context: RefCell::new(None),
			generation: RenderGeneration::default(),
			ready: RefCell::new(future::ready(Ok(None)).boxed_local().shared()),
			appearing: RefCell::new(None),
			disappearing: RefCell::new(None),
			bundles: BundleCache::new(loader),
			animator,
			spawner: options.spawner.clone(),
			triggers: RefCell::new(Vec::new()),
			go_listener: Cell::new(None),
		});
		// Freshly created, so the slot is empty.
		let _ = slot.set(Rc::downgrade(&inner));

		let router = Self { inner };
		router.set_outlet(outlet);
		router.subscribe();
		router.set_triggers(options.triggers.unwrap_or_else(default_triggers));
		Ok(router)
	}

	pub fn window(&self) -> &Window {
		&self.inner.window
	}

	pub fn resolver(&self) -> &Resolver {
		&self.inner.resolver
	}

	pub fn base_url(&self) -> Option<&BaseUrl> {
		self.inner.resolver.base_url()
	}

	pub fn outlet(&self) -> Option<Element> {
		self.inner.outlet.borrow().clone()
	}

	/// Sets the element rendered content is attached under.
	pub fn set_outlet(&self, outlet: Option<Element>) {
		*self.inner.outlet.borrow_mut() = outlet;
	}

	/// The location of the last completed render.
	pub fn location(&self) -> RouterLocation {
		self.inner.location.borrow().clone()
	}

	/// The latest render.
	pub fn ready(&self) -> RenderFuture {
		self.inner.ready.borrow().clone()
	}

	/// Top-level routes.
	pub fn get_routes(&self) -> Vec<Route> {
		self.inner.resolver.routes()
	}

	/// Replaces all routes and, unless `skip_render` is set, renders the
	/// current window location.
	///
	/// # Errors
	///
	/// Fails when a route does not validate; the routes are left unchanged.
	pub fn set_routes(&self, routes: Vec<Route>, skip_render: bool) -> RouterResult<RenderFuture> {
		self.inner.resolver.set_routes(routes)?;
		*self.inner.previous_context.borrow_mut() = None;
		if !skip_render {
			self.on_navigation_event(None, None);
		}
		Ok(self.ready())
	}

	/// Appends top-level routes without rendering.
	pub fn add_routes(&self, routes: Vec<Route>) -> RouterResult<Vec<Route>> {
		Ok(self.inner.resolver.add_routes(routes)?)
	}

	/// Removes all routes and renders the now unmatched location.
	pub fn remove_routes(&self) -> RenderFuture {
		self.inner.resolver.remove_routes();
		*self.inner.previous_context.borrow_mut() = None;
		self.on_navigation_event(None, None);
		self.ready()
	}

	/// Resolves without rendering.
	pub fn resolve(
		&self,
		request: impl Into<ResolutionContext>,
	) -> LocalBoxFuture<'static, RouterResult<ResolutionContext>> {
		self.inner.resolver.resolve(request)
	}

	/// Builds `path` with `params` and places it below the base URL.
	///
	/// # Errors
	///
	/// Fails when the pattern is invalid or a parameter it needs is missing.
	pub fn url_for_path(&self, path: &str, params: &Params) -> RouterResult<String> {
		let built = build_path(path, params)?;
		Ok(self.inner.resolver.pathname_for_router(&built))
	}

	/// Builds the URL of the route named `name`, or of the unnamed route
	/// rendering component `name`.
	///
	/// # Errors
	///
	/// Fails when no route or more than one route carries the name, or when
	/// a parameter the route needs is missing.
	pub fn url_for_name(&self, name: &str, params: &Params) -> RouterResult<String> {
		let pattern = {
			let mut tree = self.inner.resolver.tree().borrow_mut();
			let id = tree.route_by_name(name)?;
			tree.full_path(id)
		};
		let built = build_path(&pattern, params)?;
		let built = if built.is_empty() {
			"/".to_string()
		} else {
			built
		};
		Ok(self.inner.resolver.pathname_for_router(&built))
	}

	/// Fires a `go` event for `path`, parsed relative to the site root.
	///
	/// Returns `true` when a router handled it.
	pub fn go(window: &Window, path: &str) -> bool {
		let url = match Url::parse("http://a").and_then(|origin| origin.join(path)) {
			Ok(url) => url,
			Err(error) => {
				tracing::warn!(%path, %error, "Cannot navigate to an unparsable path");
				return false;
			}
		};
		fire_go(window, NavigationIntent::from(&WindowLocation::from(&url)))
	}

	/// Listens for `go` events. Called by [`Router::new`].
	pub fn subscribe(&self) {
		self.unsubscribe();
		let weak = Rc::downgrade(&self.inner);
		let id = self
			.inner
			.window
			.add_event_listener(EventKind::Go, move |event| {
				let EventData::Go(intent) = event.data() else {
					return;
				};
				if let Some(inner) = weak.upgrade() {
					Router { inner }.on_navigation_event(Some(intent.clone()), Some(event));
				}
			});
		self.inner.go_listener.set(Some(id));
	}

	pub fn unsubscribe(&self) {
		if let Some(id) = self.inner.go_listener.take() {
			self.inner.window.remove_event_listener(id);
		}
	}

	/// Swaps the active navigation triggers.
	pub fn set_triggers(&self, triggers: Vec<Rc<dyn NavigationTrigger>>) {
		let window = &self.inner.window;
		for trigger in self.inner.triggers.borrow().iter() {
			trigger.deactivate(window);
		}
		for trigger in &triggers {
			trigger.activate(window, go_dispatch(window));
		}
		*self.inner.triggers.borrow_mut() = triggers;
	}

	/// Stops reacting to navigation events.
	pub fn dispose(&self) {
		self.unsubscribe();
		self.set_triggers(Vec::new());
	}

	fn on_navigation_event(&self, intent: Option<NavigationIntent>, event: Option<&Event>) {
		let intent =
			intent.unwrap_or_else(|| NavigationIntent::from(&self.inner.window.location()));
		if self
			.inner
			.resolver
			.normalize_pathname(&intent.pathname)
			.is_none()
		{
			tracing::debug!(pathname = %intent.pathname, "Navigation outside the base URL ignored");
			return;
		}
		if let Some(event) = event {
			event.prevent_default();
		}
		self.render(intent, true);
	}

	/// Renders `intent` into the outlet.
	///
	/// With `update_history` set, the window history gets a new entry (or,
	/// on the first render, the current entry is replaced). The returned
	/// handle is also stored as [`Router::ready`].
	pub fn render(&self, intent: impl Into<NavigationIntent>, update_history: bool) -> RenderFuture {
		let intent = intent.into();
		let token = self.inner.generation.begin();
		tracing::debug!(render = token.value(), pathname = %intent.pathname, "Render started");

		let router = self.clone();
		let render = async move { router.run_render(intent, token, update_history).await }
			.boxed_local()
			.shared();
		*self.inner.ready.borrow_mut() = render.clone();

		if let Some(spawner) = &self.inner.spawner
			&& let Err(error) = spawner.spawn_local(render.clone().map(|_| ()))
		{
			tracing::warn!(%error, "Failed to spawn render");
		}
		render
	}

	fn is_latest(&self, token: Option<RenderToken>) -> bool {
		self.inner.generation.is_latest(token)
	}

	async fn run_render(
		&self,
		intent: NavigationIntent,
		token: RenderToken,
		update_history: bool,
	) -> RenderOutcome {
		let base = ResolutionContext::for_render(&intent, token);
		let error = match self.commit(base.clone(), token, update_history).await {
			Ok(outcome) => return Ok(outcome),
			Err(error) => error,
		};
		if !self.is_latest(Some(token)) {
			tracing::debug!(render = token.value(), %error, "Superseded render failed");
			return Ok(None);
		}

		let error = match self.recover(error, &base) {
			Ok(recovered) => match self.commit_resolved(recovered, token, update_history).await {
				Ok(outcome) => return Ok(outcome),
				Err(error) => error,
			},
			Err(error) => error,
		};
		if !self.is_latest(Some(token)) {
			tracing::debug!(render = token.value(), %error, "Superseded render failed");
			return Ok(None);
		}
		if update_history {
			self.update_browser_history(&intent.pathname, &intent.search, &intent.hash, token.is_first());
		}
		if let Some(outlet) = self.outlet() {
			outlet.remove_children();
		}
		*self.inner.previous_context.borrow_mut() = None;

		let mut located = base;
		located.base = self.inner.resolver.base_url().cloned();
		*self.inner.location.borrow_mut() = RouterLocation::from_context(&located, None);
		self.inner.window.dispatch_event(&Event::error(ErrorDetail {
			context: error.context().cloned(),
			error: error.clone(),
			pathname: intent.pathname,
			search: intent.search,
			hash: intent.hash,
		}));
		Err(error)
	}

	/// Turns a failed render into the error handler's result, if a handler
	/// is configured.
	fn recover(&self, error: RouteError, base: &ResolutionContext) -> RouterResult<ResolutionContext> {
		let Some(handler) = self.inner.resolver.error_handler() else {
			return Err(error);
		};
		let failed = error.context().cloned().unwrap_or_else(|| base.clone());
		tracing::warn!(code = error.code(), pathname = %failed.pathname, %error, "Render failed, mounting the error handler result");

		let mut recovered = failed.fork();
		recovered.result = Some(handler(&error));
		recovered.recovered = true;
		recovered.render = base.render;
		Ok(recovered)
	}

	async fn commit(
		&self,
		base: ResolutionContext,
		token: RenderToken,
		update_history: bool,
	) -> RenderOutcome {
		let resolved = self.inner.resolver.resolve(base).await?;
		self.commit_resolved(resolved, token, update_history).await
	}

	async fn commit_resolved(
		&self,
		resolved: ResolutionContext,
		token: RenderToken,
		update_history: bool,
	) -> RenderOutcome {
		let context = self.fully_resolve_chain(resolved.clone(), resolved).await?;
		if !self.is_latest(Some(token)) {
			tracing::debug!(render = token.value(), "Render superseded");
			return Ok(None);
		}
		if context.cancelled {
			return Ok(Some(self.location()));
		}

		let previous = self.inner.previous_context.borrow().clone();
		if let Some(previous) = previous.as_ref().filter(|p| p.id() == context.id()) {
			self.update_browser_history(&previous.pathname, &previous.search, &previous.hash, true);
			return Ok(Some(self.location()));
		}

		let location = RouterLocation::from_context(&context, None);
		*self.inner.location.borrow_mut() = location.clone();
		if update_history {
			self.update_browser_history(&context.pathname, &context.search, &context.hash, token.is_first());
		}
		tracing::info!(pathname = %location.pathname, routes = location.routes.len(), "Location changed");
		self.inner
			.window
			.dispatch_event(&Event::location_changed(location.clone()));

		if context.skip_attach {
			if let Some(outlet) = self.outlet() {
				self.copy_unchanged_elements(&context, previous.as_ref(), &outlet);
			}
			*self.inner.previous_context.borrow_mut() = Some(context);
			return Ok(Some(location));
		}

		self.add_appearing_content(&context, previous.as_ref())?;
		let animation = self.animate_if_needed(&context);
		self.run_on_after_enter_callbacks(&context);
		self.run_on_after_leave_callbacks(&context, previous.as_ref());
		animation.await;

		if !self.is_latest(Some(token)) {
			return Ok(None);
		}
		self.remove_disappearing_content();
		*self.inner.previous_context.borrow_mut() = Some(context);
		Ok(Some(location))
	}

	/// Follows redirects until the context resolves to an element.
	async fn find_component_context(
		&self,
		mut context: ResolutionContext,
	) -> RouterResult<ResolutionContext> {
		loop {
			match context.result.clone() {
				Some(RouteResult::Element(element)) => {
					self.render_element(&mut context, &element);
					return Ok(context);
				}
				Some(RouteResult::Redirect(redirect)) => {
					context = self
						.redirect(&redirect, context.redirect_count, context.render)
						.await?;
				}
				None => {
					return Err(RouteError::handler(format!(
						"Invalid route resolution result for path \"{}\". Expected redirect object or HTML element, but got nothing. Double check the action return value for the route.",
						context.pathname
					)));
				}
			}
		}
	}

	fn render_element(&self, context: &mut ResolutionContext, element: &Element) {
		let index = context
			.route
			.as_ref()
			.filter(|_| !context.recovered)
			.and_then(|route| context.chain.iter().position(|entry| entry.route() == route));
		match index {
			Some(index) => context.chain[index].set_element(Some(element.clone())),
			None => {
				let tree = self.inner.resolver.tree().borrow();
				if let Some(root) = tree.route_ref(tree.root()) {
					context.chain = vec![Rc::new(ChainEntry::new(
						"",
						root.clone(),
						Some(element.clone()),
					))];
				}
			}
		}
		if self.is_latest(context.render) {
			element.set_location(RouterLocation::from_context(context, None));
		}
	}

	async fn redirect(
		&self,
		redirect: &Redirect,
		counter: u32,
		render: Option<RenderToken>,
	) -> RouterResult<ResolutionContext> {
		if counter > MAX_REDIRECT_COUNT {
			return Err(RouteError::RedirectLoop {
				from: redirect.from.clone(),
			});
		}
		let pathname = self.url_for_path(&redirect.pathname, &redirect.params)?;
		tracing::debug!(from = %redirect.from, to = %pathname, count = counter + 1, "Following redirect");

		let mut context = ResolutionContext::new(pathname);
		context.redirect_from = Some(redirect.from.clone());
		context.redirect_count = counter + 1;
		context.render = render;
		self.inner.resolver.resolve(context).await
	}

	/// Extends `before` with deeper matches until the matched path covers
	/// the whole pathname, then runs the guards.
	fn fully_resolve_chain(
		&self,
		top_before: ResolutionContext,
		before: ResolutionContext,
	) -> LocalBoxFuture<'_, RouterResult<ResolutionContext>> {
		async move {
			let before_id = before.id();
			let after = self.find_component_context(before).await?;
			let top_after = if after.id() != before_id {
				after.clone()
			} else {
				top_before
			};
			if after.recovered {
				return self.amend_with_on_before_callbacks(after).await;
			}

			let matched = self
				.inner
				.resolver
				.pathname_for_router(&after.matched_path());
			let is_found = matched == after.pathname;

			let mut parent = after.route.as_ref().map(RouteRef::id);
			let mut prev = PrevResult::None;
			let next = loop {
				match after.next_below(parent, prev).await? {
					NextOutcome::Found(next) => break Some(*next),
					NextOutcome::NotFound if is_found => break None,
					NextOutcome::NotFound => {
						let grandparent = parent
							.and_then(|id| self.inner.resolver.tree().borrow().parent_of(id));
						match grandparent {
							Some(grandparent) => {
								parent = Some(grandparent);
								prev = PrevResult::NotFound;
							}
							None => return Err(RouteError::not_found(&top_after)),
						}
					}
				}
			};

			match next {
				Some(next) if next.id() != after.id() => {
					self.fully_resolve_chain(top_after, next).await
				}
				_ => self.amend_with_on_before_callbacks(after).await,
			}
		}
		.boxed_local()
	}

	fn amend_with_on_before_callbacks(
		&self,
		context: ResolutionContext,
	) -> LocalBoxFuture<'_, RouterResult<ResolutionContext>> {
		async move {
			let full_id = context.id();
			let amended = self.run_on_before_callbacks(context).await?;
			let previous_id = self
				.inner
				.previous_context
				.borrow()
				.as_ref()
				.map(ResolutionContext::id);
			if amended.cancelled || Some(amended.id()) == previous_id || amended.id() == full_id {
				return Ok(amended);
			}
			self.fully_resolve_chain(amended.clone(), amended).await
		}
		.boxed_local()
	}

	async fn run_on_before_callbacks(
		&self,
		mut context: ResolutionContext,
	) -> RouterResult<ResolutionContext> {
		if !self.is_latest(context.render) {
			return Ok(context);
		}
		let previous = self.inner.previous_context.borrow().clone();
		let previous_chain = previous
			.as_ref()
			.map(|p| p.chain.clone())
			.unwrap_or_default();
		let chain = context.chain.clone();
		let mut steps = Vec::new();

		context.diverged_chain_index = 0;
		context.skip_attach = false;
		if !previous_chain.is_empty() {
			let shared = previous_chain.len().min(chain.len());
			while context.diverged_chain_index < shared {
				let old = &previous_chain[context.diverged_chain_index];
				let new = &chain[context.diverged_chain_index];
				let (old_element, new_element) = (old.element(), new.element());
				let unchanged = old.route() == new.route()
					&& (old.path() == new.path() || old_element == new_element)
					&& is_reusable_segment(old_element.as_ref(), new_element.as_ref());
				if !unchanged {
					break;
				}
				context.diverged_chain_index += 1;
			}
			context.skip_attach = chain.len() == previous_chain.len()
				&& context.diverged_chain_index == chain.len()
				&& is_reusable(
					context.result_element(),
					previous.as_ref().and_then(ResolutionContext::result_element),
				);

			let leave_location = RouterLocation::from_context(&context, None);
			let leaving = if context.skip_attach {
				&previous_chain[..]
			} else {
				&previous_chain[context.diverged_chain_index..]
			};
			for entry in leaving.iter().rev() {
				if let Some(element) = entry.element() {
					steps.push(GuardStep::Leave(element, leave_location.clone()));
				}
			}

			if context.skip_attach {
				for (new, old) in chain.iter().zip(&previous_chain) {
					let location = RouterLocation::from_context(&context, Some(new.route()));
					if let Some(element) = old.element().or_else(|| new.element()) {
						steps.push(GuardStep::Enter(element, location));
					}
					if let Some(element) = old.element() {
						element.set_location(RouterLocation::from_context(&context, Some(old.route())));
					}
				}
			}
		}

		if !context.skip_attach {
			for (index, entry) in chain.iter().enumerate() {
				if index < context.diverged_chain_index {
					if let Some(old) = previous_chain.get(index)
						&& let Some(element) = old.element()
					{
						element.set_location(RouterLocation::from_context(&context, Some(old.route())));
					}
					continue;
				}
				let location = RouterLocation::from_context(&context, Some(entry.route()));
				if let Some(element) = entry.element() {
					element.set_location(location.clone());
					steps.push(GuardStep::Enter(element, location));
				}
			}
		}

		let mut outcome = None;
		for step in steps {
			if !self.is_latest(context.render) {
				outcome = None;
				break;
			}
			if outcome.is_some() {
				break;
			}
			outcome = match step {
				GuardStep::Leave(element, location) => match element.lifecycle() {
					Some(lifecycle) => lifecycle
						.on_before_leave(&location, &BeforeLeaveCommands, self)
						.await
						.map_err(|error| error.with_context(&context))?
						.filter(|result| !result.is_redirect()),
					None => None,
				},
				GuardStep::Enter(element, location) => match element.lifecycle() {
					Some(lifecycle) => {
						let commands =
							BeforeEnterCommands::new(context.pathname.clone(), context.params.clone());
						lifecycle
							.on_before_enter(&location, &commands, self)
							.await
							.map_err(|error| error.with_context(&context))?
					}
					None => None,
				},
			};
		}

		match outcome {
			Some(GuardOutcome::Cancel) => {
				tracing::debug!(pathname = %context.pathname, "Navigation cancelled by a guard");
				match previous {
					Some(mut previous) => {
						previous.render = context.render;
						*self.inner.previous_context.borrow_mut() = Some(previous.clone());
						Ok(previous)
					}
					None => {
						context.cancelled = true;
						Ok(context)
					}
				}
			}
			Some(GuardOutcome::Redirect(redirect)) => {
				tracing::debug!(from = %redirect.from, to = %redirect.pathname, "Guard redirected");
				self.redirect(&redirect, context.redirect_count, context.render)
					.await
			}
			None => Ok(context),
		}
	}

	/// Moves elements that survive the navigation into the new chain and
	/// returns the deepest of them, or the outlet.
	fn copy_unchanged_elements(
		&self,
		context: &ResolutionContext,
		previous: Option<&ResolutionContext>,
		outlet: &Element,
	) -> Element {
		let mut deepest = outlet.clone();
		for index in 0..context.diverged_chain_index {
			let unchanged = previous
				.and_then(|p| p.chain.get(index))
				.and_then(|entry| entry.element());
			let Some(unchanged) = unchanged else {
				continue;
			};
			if unchanged.parent().as_ref() != Some(&deepest) {
				break;
			}
			context.chain[index].set_element(Some(unchanged.clone()));
			deepest = unchanged;
		}
		deepest
	}

	fn add_appearing_content(
		&self,
		context: &ResolutionContext,
		previous: Option<&ResolutionContext>,
	) -> RouterResult<()> {
		let outlet = self.outlet().ok_or(RouteError::Outlet)?;
		// Content of an unfinished transition goes away before new content
		// arrives.
		self.remove_appearing_content();

		let deepest = self.copy_unchanged_elements(context, previous, &outlet);
		let existing: Vec<Element> = deepest
			.children()
			.into_iter()
			.filter(Element::is_added_by_router)
			.collect();

		let mut appearing = Vec::new();
		let mut parent = deepest.clone();
		for entry in &context.chain[context.diverged_chain_index.min(context.chain.len())..] {
			let Some(element) = entry.element() else {
				continue;
			};
			parent.append_child(&element);
			element.mark_added_by_router();
			if parent == deepest {
				appearing.push(element.clone());
			}
			parent = element;
		}

		let disappearing = existing
			.into_iter()
			.filter(|element| !appearing.contains(element))
			.collect();
		*self.inner.appearing.borrow_mut() = Some(appearing);
		*self.inner.disappearing.borrow_mut() = Some(disappearing);
		Ok(())
	}

	fn remove_appearing_content(&self) {
		if let Some(appearing) = self.inner.appearing.borrow_mut().take() {
			appearing.iter().for_each(Element::remove);
		}
	}

	fn remove_disappearing_content(&self) {
		if let Some(disappearing) = self.inner.disappearing.borrow_mut().take() {
			disappearing.iter().for_each(Element::remove);
		}
		self.inner.appearing.borrow_mut().take();
	}

	fn animate_if_needed(&self, context: &ResolutionContext) -> LocalBoxFuture<'static, ()> {
		let from = self
			.inner
			.disappearing
			.borrow()
			.as_ref()
			.and_then(|elements| elements.first().cloned());
		let to = self
			.inner
			.appearing
			.borrow()
			.as_ref()
			.and_then(|elements| elements.first().cloned());
		let config: Option<Animate> = context
			.chain
			.iter()
			.rev()
			.find_map(|entry| entry.route().route().get_animate().cloned());

		match (from, to, config) {
			(Some(from), Some(to), Some(config)) => {
				let leave = self.inner.animator.animate(&from, config.leave_class());
				let enter = self.inner.animator.animate(&to, config.enter_class());
				future::join(leave, enter).map(|_| ()).boxed_local()
			}
			_ => future::ready(()).boxed_local(),
		}
	}

	fn run_on_after_enter_callbacks(&self, context: &ResolutionContext) {
		for entry in context.chain.iter().skip(context.diverged_chain_index) {
			let Some(lifecycle) = entry.element().and_then(|element| element.lifecycle()) else {
				continue;
			};
			let location = RouterLocation::from_context(context, Some(entry.route()));
			lifecycle.on_after_enter(&location, self);
		}
	}

	fn run_on_after_leave_callbacks(
		&self,
		context: &ResolutionContext,
		previous: Option<&ResolutionContext>,
	) {
		let Some(previous) = previous else {
			return;
		};
		let location = RouterLocation::from_context(context, None);
		for entry in previous
			.chain
			.iter()
			.skip(context.diverged_chain_index)
			.rev()
		{
			if !self.is_latest(context.render) {
				break;
			}
			let Some(element) = entry.element() else {
				continue;
			};
			if let Some(lifecycle) = element.lifecycle() {
				lifecycle.on_after_leave(&location, self);
			}
			let disappearing = self
				.inner
				.disappearing
				.borrow()
				.as_ref()
				.is_some_and(|elements| elements.contains(&element));
			if disappearing {
				element.remove_children();
			}
		}
	}

	fn update_browser_history(&self, pathname: &str, search: &str, hash: &str, replace: bool) {
		let window = &self.inner.window;
		let current = window.location();
		if current.pathname == pathname && current.search == search && current.hash == hash {
			return;
		}
		let url = format!("{pathname}{search}{hash}");
		let result = if replace {
			window.replace_state(None, &url)
		} else {
			window.push_state(None, &url)
		};
		if let Err(error) = result {
			tracing::warn!(%url, %error, "Failed to update history");
			return;
		}
		window.dispatch_event(&Event::pop_state(Some(ROUTER_IGNORE_STATE)));
	}

	/// Resolves one matched route for a render: loads lazy children, runs
	/// the action, then falls back to the route's redirect, bundle and
	/// component.
	async fn resolve_route(&self, context: ResolutionContext) -> RouterResult<Resolution> {
		let Some(route_ref) = context.route.clone() else {
			return Ok(Resolution::Decline);
		};
		let route = route_ref.route().clone();

		if let Some(Children::Lazy(load)) = route.get_children() {
			let children = load(context.without_next()).await?;
			self.inner
				.resolver
				.tree()
				.borrow_mut()
				.attach_children(route_ref.id(), children)?;
		}

		let commands = Commands::new(self.inner.window.document(), &context);
		let resolution = match route.get_action() {
			Some(action) if self.is_latest(context.render) => {
				interpret_action_result(action(context.clone(), commands.clone()).await?)
			}
			_ => Resolution::Decline,
		};
		if !matches!(resolution, Resolution::Decline) {
			return Ok(resolution);
		}

		if let Some(target) = route.get_redirect() {
			return Ok(Resolution::Done(RouteResult::Redirect(Redirect {
				pathname: target.to_string(),
				from: context.pathname.clone(),
				params: context.params.clone(),
			})));
		}
		if let Some(bundle) = route.get_bundle() {
			self.inner
				.bundles
				.load_bundle(bundle)
				.await
				.map_err(|reason| RouteError::BundleLoad {
					src: bundle.to_string(),
					reason,
					context: None,
				})?;
		}
		if let Some(tag) = route.get_component() {
			return Ok(Resolution::Done(RouteResult::Element(
				commands.create_component(tag),
			)));
		}
		Ok(Resolution::Decline)
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("base_url", &self.base_url())
			.field("outlet", &self.inner.outlet.borrow())
			.field("location", &self.inner.location.borrow().pathname)
			.field("triggers", &self.inner.triggers.borrow().len())
			.finish_non_exhaustive()
	}
}

/// The resolve-route callback a router installs in its resolver.
fn router_resolve_route(slot: Rc<OnceCell<Weak<RouterInner>>>) -> ResolveRouteFn {
	Rc::new(move |context: ResolutionContext| {
		let inner = slot.get().and_then(Weak::upgrade);
		async move {
			match inner {
				Some(inner) => Router { inner }.resolve_route(context).await,
				None => Ok(Resolution::Decline),
			}
		}
		.boxed_local()
	})
}

/// Two elements stand for the same component when the router created both
/// for one tag, or when they are the same element.
fn is_reusable(element: Option<&Element>, other: Option<&Element>) -> bool {
	match (element, other) {
		(Some(element), Some(other))
			if element.is_created_by_router() && other.is_created_by_router() =>
		{
			element.local_name() == other.local_name()
		}
		(Some(element), Some(other)) => element == other,
		_ => false,
	}
}

/// Like [`is_reusable`], with segments that render nothing on both sides
/// counting as unchanged.
fn is_reusable_segment(element: Option<&Element>, other: Option<&Element>) -> bool {
	(element.is_none() && other.is_none()) || is_reusable(element, other)
}

#[cfg(test)]
mod tests {
	use super::*;
	use bezem_urls::params;
	use rstest::{fixture, rstest};

	#[fixture]
	fn window() -> Window {
		Window::new("http://localhost/").expect("Valid URL")
	}

	fn router(window: &Window, options: RouterOptions) -> Router {
		Router::new(Some(Element::new("main")), window, options.no_triggers())
			.expect("Valid router")
	}

	#[rstest]
	fn test_url_for_path_applies_base(window: Window) {
		// Arrange
		let router = router(&window, RouterOptions::new().base_url("/app/"));

		// Act
		let url = router.url_for_path("/users/:id", &params([("id", "7")]));

		// Assert
		assert_eq!(url.expect("Builds"), "/app/users/7");
	}

	#[rstest]
	fn test_document_base_href_is_default_base() {
		// Arrange
		let window = Window::new("http://localhost/shop/index.html").expect("Valid URL");
		window.document().set_base_href(Some("/shop/".into()));

		// Act
		let router = router(&window, RouterOptions::new());

		// Assert
		assert_eq!(router.base_url().map(BaseUrl::path), Some("/shop/"));
	}

	#[rstest]
	fn test_url_for_name_uses_full_path(window: Window) {
		// Arrange
		let router = router(&window, RouterOptions::new());
		router
			.set_routes(
				vec![
					Route::new("/users").children(vec![
						Route::new("/:id").name("user").component("x-user"),
						Route::new("").component("x-user-list"),
					]),
				],
				true,
			)
			.expect("Valid routes");

		// Act
		let by_name = router.url_for_name("user", &params([("id", "42")]));
		let by_component = router.url_for_name("x-user-list", &Params::new());
		let unknown = router.url_for_name("missing", &Params::new());

		// Assert
		assert_eq!(by_name.expect("Named route"), "/users/42");
		assert_eq!(by_component.expect("Component route"), "/users");
		assert!(matches!(
			unknown,
			Err(RouteError::Validation(ValidationError::UnknownName { .. }))
		));
	}

	#[rstest]
	fn test_go_without_router_is_unhandled(window: Window) {
		// Act
		let handled = Router::go(&window, "/anywhere?x=1");

		// Assert
		assert!(!handled);
	}

	#[rstest]
	fn test_invalid_routes_are_rejected(window: Window) {
		// Arrange
		let router = router(&window, RouterOptions::new());

		// Act
		let result = router.set_routes(vec![Route::new("/a")], true);

		// Assert
		assert!(matches!(
			result,
			Err(RouteError::Validation(ValidationError::MissingResolution { .. }))
		));
		assert!(router.get_routes().is_empty());
	}

	#[rstest]
	#[case(true, true, "x-a", "x-a", true)]
	#[case(true, true, "x-a", "x-b", false)]
	#[case(false, false, "x-a", "x-a", false)]
	fn test_reusable_elements(
		#[case] first_by_router: bool,
		#[case] second_by_router: bool,
		#[case] first_tag: &str,
		#[case] second_tag: &str,
		#[case] expected: bool,
	) {
		// Arrange
		let first = Element::new(first_tag);
		let second = Element::new(second_tag);
		if first_by_router {
			first.mark_created_by_router();
		}
		if second_by_router {
			second.mark_created_by_router();
		}

		// Act
		let reusable = is_reusable(Some(&first), Some(&second));

		// Assert
		assert_eq!(reusable, expected);
		assert!(is_reusable(Some(&first), Some(&first)));
	}
}
