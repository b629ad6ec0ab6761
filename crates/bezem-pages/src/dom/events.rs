//! Window-level events.
//!
//! Listeners are plain closures registered per [`EventKind`]. Every
//! registration returns a [`ListenerId`] used to remove it again, so that a
//! router or trigger can tear down exactly what it installed.

use super::element::Element;
use crate::router::{ResolutionContext, RouteError, RouterLocation};
use std::cell::Cell;
use std::rc::Rc;

/// History state the router writes when it notifies listeners about its own
/// history updates. Pop-state listeners that trigger navigation skip it.
pub const ROUTER_IGNORE_STATE: &str = "bezem-router-ignore";

/// Identifier returned by [`Window::add_event_listener`](super::Window::add_event_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	/// Navigation request (`go`).
	Go,
	/// History traversal (`popstate`).
	PopState,
	/// Pointer click (`click`).
	Click,
	/// A render committed a new location (`location-changed`).
	LocationChanged,
	/// A render failed (`error`).
	Error,
}

impl EventKind {
	/// DOM event type name.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Go => "go",
			Self::PopState => "popstate",
			Self::Click => "click",
			Self::LocationChanged => "location-changed",
			Self::Error => "error",
		}
	}
}

/// Where a navigation should go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationIntent {
	pub pathname: String,
	/// Query string including the leading `?`, or empty.
	pub search: String,
	/// Fragment including the leading `#`, or empty.
	pub hash: String,
}

impl NavigationIntent {
	pub fn new(pathname: impl Into<String>) -> Self {
		Self {
			pathname: pathname.into(),
			..Self::default()
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
}

impl From<&str> for NavigationIntent {
	fn from(pathname: &str) -> Self {
		Self::new(pathname)
	}
}

impl From<String> for NavigationIntent {
	fn from(pathname: String) -> Self {
		Self::new(pathname)
	}
}

/// Modifier keys held during a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
	pub shift: bool,
	pub ctrl: bool,
	pub alt: bool,
	pub meta: bool,
}

impl Modifiers {
	pub fn any(self) -> bool {
		self.shift || self.ctrl || self.alt || self.meta
	}
}

/// Payload of a click event.
#[derive(Debug, Clone)]
pub struct ClickDetail {
	/// Primary button is `0`.
	pub button: i16,
	pub modifiers: Modifiers,
	/// The element that was clicked.
	pub target: Element,
	/// Event path, innermost element first.
	pub path: Vec<Element>,
}

impl ClickDetail {
	/// A plain primary-button click on `target`, with the composed path built
	/// from its ancestors.
	pub fn primary(target: &Element) -> Self {
		let mut path = vec![target.clone()];
		let mut current = target.parent();
		while let Some(element) = current {
			current = element.parent();
			path.push(element);
		}
		Self {
			button: 0,
			modifiers: Modifiers::default(),
			target: target.clone(),
			path,
		}
	}

	pub fn with_button(mut self, button: i16) -> Self {
		self.button = button;
		self
	}

	pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
		self.modifiers = modifiers;
		self
	}
}

/// Payload of an `error` event.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
	pub error: RouteError,
	pub pathname: String,
	pub search: String,
	pub hash: String,
	/// The context the render failed in, when known.
	pub context: Option<ResolutionContext>,
}

/// Event payloads.
#[derive(Debug, Clone)]
pub enum EventData {
	Go(NavigationIntent),
	PopState { state: Option<String> },
	Click(ClickDetail),
	LocationChanged(RouterLocation),
	Error(Box<ErrorDetail>),
}

/// A dispatched event.
#[derive(Debug)]
pub struct Event {
	data: EventData,
	cancelable: bool,
	default_prevented: Cell<bool>,
}

impl Event {
	fn new(data: EventData, cancelable: bool) -> Self {
		Self {
			data,
			cancelable,
			default_prevented: Cell::new(false),
		}
	}

	/// A cancelable `go` event.
	pub fn go(intent: NavigationIntent) -> Self {
		Self::new(EventData::Go(intent), true)
	}

	pub fn pop_state(state: Option<&str>) -> Self {
		Self::new(
			EventData::PopState {
				state: state.map(String::from),
			},
			false,
		)
	}

	/// A cancelable `click` event.
	pub fn click(detail: ClickDetail) -> Self {
		Self::new(EventData::Click(detail), true)
	}

	pub fn location_changed(location: RouterLocation) -> Self {
		Self::new(EventData::LocationChanged(location), false)
	}

	pub fn error(detail: ErrorDetail) -> Self {
		Self::new(EventData::Error(Box::new(detail)), false)
	}

	pub fn kind(&self) -> EventKind {
		match &self.data {
			EventData::Go(_) => EventKind::Go,
			EventData::PopState { .. } => EventKind::PopState,
			EventData::Click(_) => EventKind::Click,
			EventData::LocationChanged(_) => EventKind::LocationChanged,
			EventData::Error(_) => EventKind::Error,
		}
	}

	pub fn data(&self) -> &EventData {
		&self.data
	}

	pub fn is_cancelable(&self) -> bool {
		self.cancelable
	}

	/// Marks the event as handled. Ignored for non-cancelable events.
	pub fn prevent_default(&self) {
		if self.cancelable {
			self.default_prevented.set(true);
		}
	}

	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}
}

pub(crate) type Listener = Rc<dyn Fn(&Event)>;
