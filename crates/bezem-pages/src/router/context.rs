//! Per-navigation resolution state.

use super::error::RouteError;
use super::generation::RenderToken;
use super::resolver::{PrevResult, ResolveSession};
use super::tree::{RouteId, RouteRef, join_paths};
use crate::dom::{Document, Element, NavigationIntent};
use bezem_urls::{BaseUrl, Params, Token};
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a resolution attempt. Clones of a context share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
	fn next() -> Self {
		Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
	}
}

/// One resolved segment of a chain.
///
/// Entries are shared between the contexts of one resolution, so an element
/// stored by the router is visible from each of them.
pub struct ChainEntry {
	path: String,
	route: RouteRef,
	element: RefCell<Option<Element>>,
}

impl ChainEntry {
	pub(crate) fn new(path: impl Into<String>, route: RouteRef, element: Option<Element>) -> Self {
		Self {
			path: path.into(),
			route,
			element: RefCell::new(element),
		}
	}

	/// The part of the pathname this segment consumed.
	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn route(&self) -> &RouteRef {
		&self.route
	}

	pub fn element(&self) -> Option<Element> {
		self.element.borrow().clone()
	}

	pub(crate) fn set_element(&self, element: Option<Element>) {
		*self.element.borrow_mut() = element;
	}
}

impl fmt::Debug for ChainEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ChainEntry")
			.field("path", &self.path)
			.field("route", &self.route)
			.field("element", &self.element.borrow())
			.finish()
	}
}

/// Matched segments from the root to the current route.
pub type Chain = Vec<Rc<ChainEntry>>;

/// A request to navigate elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
	/// Target pattern, built with `params`.
	pub pathname: String,
	/// Pathname being resolved when the redirect was issued.
	pub from: String,
	pub params: Params,
}

/// The value a resolution ends with.
#[derive(Debug, Clone)]
pub enum RouteResult {
	Element(Element),
	Redirect(Redirect),
}

/// What a route action may return.
#[derive(Debug)]
pub enum ActionResult {
	Element(Element),
	Redirect(Redirect),
	/// The route declines and its subtree is skipped.
	NotFound,
	/// The outcome of [`ResolutionContext::next`], passed through.
	Context(Box<ResolutionContext>),
}

impl From<Element> for ActionResult {
	fn from(element: Element) -> Self {
		Self::Element(element)
	}
}

impl From<Redirect> for ActionResult {
	fn from(redirect: Redirect) -> Self {
		Self::Redirect(redirect)
	}
}

impl From<NextOutcome> for ActionResult {
	fn from(outcome: NextOutcome) -> Self {
		match outcome {
			NextOutcome::Found(context) => Self::Context(context),
			NextOutcome::NotFound => Self::NotFound,
		}
	}
}

/// Result of asking for the next matching route.
#[derive(Debug)]
pub enum NextOutcome {
	/// A later route resolved.
	Found(Box<ResolutionContext>),
	/// No further route below the requested parent resolved.
	NotFound,
}

/// Helpers handed to route actions.
#[derive(Debug, Clone)]
pub struct Commands {
	document: Document,
	pathname: String,
	params: Params,
}

impl Commands {
	pub(crate) fn new(document: Document, context: &ResolutionContext) -> Self {
		Self {
			document,
			pathname: context.pathname.clone(),
			params: context.params.clone(),
		}
	}

	/// Redirects to `pathname`, built with the current parameters.
	pub fn redirect(&self, pathname: impl Into<String>) -> ActionResult {
		ActionResult::Redirect(Redirect {
			pathname: pathname.into(),
			from: self.pathname.clone(),
			params: self.params.clone(),
		})
	}

	/// Creates a component element the router may reuse across navigations.
	pub fn component(&self, tag: &str) -> ActionResult {
		ActionResult::Element(self.create_component(tag))
	}

	pub(crate) fn create_component(&self, tag: &str) -> Element {
		let element = self.document.create_element(tag);
		element.mark_created_by_router();
		element
	}
}

/// State of one resolution attempt, handed to route actions.
#[derive(Clone)]
pub struct ResolutionContext {
	id: ContextId,
	pub pathname: String,
	pub search: String,
	pub hash: String,
	pub params: Params,
	pub keys: Vec<Token>,
	/// The part of the pathname the current route consumed.
	pub path: String,
	pub route: Option<RouteRef>,
	pub chain: Chain,
	pub result: Option<RouteResult>,
	pub redirect_from: Option<String>,
	pub(crate) redirect_count: u32,
	pub(crate) render: Option<RenderToken>,
	pub(crate) base: Option<BaseUrl>,
	pub(crate) diverged_chain_index: usize,
	pub(crate) skip_attach: bool,
	/// The result came from the error handler.
	pub(crate) recovered: bool,
	/// A guard cancelled and there was nothing to fall back to.
	pub(crate) cancelled: bool,
	session: Option<Rc<ResolveSession>>,
}

impl ResolutionContext {
	pub fn new(pathname: impl Into<String>) -> Self {
		Self {
			id: ContextId::next(),
			pathname: pathname.into(),
			search: String::new(),
			hash: String::new(),
			params: Params::new(),
			keys: Vec::new(),
			path: String::new(),
			route: None,
			chain: Vec::new(),
			result: None,
			redirect_from: None,
			redirect_count: 0,
			render: None,
			base: None,
			diverged_chain_index: 0,
			skip_attach: false,
			recovered: false,
			cancelled: false,
			session: None,
		}
	}

	pub fn with_search(mut self, search: impl Into<String>) -> Self {
		self.search = search.into();
		self
	}

	pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
		self.hash = hash.into();
		self
	}

	pub(crate) fn for_render(intent: &NavigationIntent, render: RenderToken) -> Self {
		let mut context = Self::new(intent.pathname.clone())
			.with_search(intent.search.clone())
			.with_hash(intent.hash.clone());
		context.render = Some(render);
		context
	}

	pub fn id(&self) -> ContextId {
		self.id
	}

	/// A copy with a fresh identity, an empty chain and no result.
	pub(crate) fn fork(&self) -> Self {
		let mut fork = self.without_next();
		fork.id = ContextId::next();
		fork.chain = Vec::new();
		fork.result = None;
		fork
	}

	/// A copy detached from its resolution, whose `next` finds nothing.
	pub fn without_next(&self) -> Self {
		Self {
			session: None,
			..self.clone()
		}
	}

	pub(crate) fn with_session(mut self, session: Rc<ResolveSession>) -> Self {
		self.session = Some(session);
		self
	}

	/// The element this context resolved to, if any.
	pub fn result_element(&self) -> Option<&Element> {
		match &self.result {
			Some(RouteResult::Element(element)) => Some(element),
			_ => None,
		}
	}

	/// Chain paths joined into the consumed part of the pathname.
	pub fn matched_path(&self) -> String {
		join_paths(self.chain.iter().map(|entry| entry.path()))
	}

	/// Resolves the next route matching the pathname below the current one.
	///
	/// Actions call this to let descendants, or later siblings, produce the
	/// result instead.
	pub fn next(&self) -> LocalBoxFuture<'static, Result<NextOutcome, RouteError>> {
		self.next_below(None, PrevResult::None)
	}

	pub(crate) fn next_below(
		&self,
		parent: Option<RouteId>,
		prev: PrevResult,
	) -> LocalBoxFuture<'static, Result<NextOutcome, RouteError>> {
		match &self.session {
			Some(session) => Rc::clone(session).next(false, parent, prev),
			None => future::ready(Ok(NextOutcome::NotFound)).boxed_local(),
		}
	}
}

impl From<&str> for ResolutionContext {
	fn from(pathname: &str) -> Self {
		Self::new(pathname)
	}
}

impl From<String> for ResolutionContext {
	fn from(pathname: String) -> Self {
		Self::new(pathname)
	}
}

impl From<NavigationIntent> for ResolutionContext {
	fn from(intent: NavigationIntent) -> Self {
		Self::new(intent.pathname)
			.with_search(intent.search)
			.with_hash(intent.hash)
	}
}

impl fmt::Debug for ResolutionContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolutionContext")
			.field("id", &self.id.0)
			.field("pathname", &self.pathname)
			.field("search", &self.search)
			.field("hash", &self.hash)
			.field("params", &self.params)
			.field("route", &self.route)
			.field("chain", &self.chain.len())
			.field("result", &self.result)
			.field("redirect_from", &self.redirect_from)
			.finish_non_exhaustive()
	}
}
