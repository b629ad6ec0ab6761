//! The global scope: location, history, events and scrolling.

use super::document::Document;
use super::element::Element;
use super::events::{ClickDetail, Event, EventKind, Listener, ListenerId, NavigationIntent};
use super::history::{History, HistoryEntry};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use url::Url;

/// Parts of a URL as exposed by `window.location` and anchor elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowLocation {
	pub href: String,
	/// Scheme, host and non-default port.
	pub origin: String,
	pub pathname: String,
	pub search: String,
	pub hash: String,
}

impl From<&Url> for WindowLocation {
	fn from(url: &Url) -> Self {
		Self {
			href: url.as_str().to_string(),
			origin: url.origin().ascii_serialization(),
			pathname: url.path().to_string(),
			search: url.query().map(|q| format!("?{q}")).unwrap_or_default(),
			hash: url.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
		}
	}
}

impl From<&WindowLocation> for NavigationIntent {
	fn from(location: &WindowLocation) -> Self {
		NavigationIntent {
			pathname: location.pathname.clone(),
			search: location.search.clone(),
			hash: location.hash.clone(),
		}
	}
}

/// Shared handle to a window.
#[derive(Clone)]
pub struct Window {
	inner: Rc<WindowInner>,
}

/// Non-owning window handle, for listeners installed on the window itself.
#[derive(Clone)]
pub struct WeakWindow {
	inner: Weak<WindowInner>,
}

impl WeakWindow {
	pub fn upgrade(&self) -> Option<Window> {
		self.inner.upgrade().map(|inner| Window { inner })
	}
}

struct WindowInner {
	document: Document,
	history: RefCell<History>,
	listeners: RefCell<Vec<(ListenerId, EventKind, Listener)>>,
	next_listener: Cell<u64>,
	scroll: Cell<(f64, f64)>,
}

impl Window {
	/// Opens a window at `url` with a fresh document.
	///
	/// # Errors
	///
	/// Returns the parse error when `url` is not absolute.
	pub fn new(url: &str) -> Result<Self, url::ParseError> {
		Ok(Self::with_document(Url::parse(url)?, Document::new()))
	}

	pub fn with_document(url: Url, document: Document) -> Self {
		Self {
			inner: Rc::new(WindowInner {
				document,
				history: RefCell::new(History::new(url)),
				listeners: RefCell::new(Vec::new()),
				next_listener: Cell::new(1),
				scroll: Cell::new((0.0, 0.0)),
			}),
		}
	}

	pub fn downgrade(&self) -> WeakWindow {
		WeakWindow {
			inner: Rc::downgrade(&self.inner),
		}
	}

	pub fn document(&self) -> Document {
		self.inner.document.clone()
	}

	pub fn url(&self) -> Url {
		self.inner.history.borrow().current().url.clone()
	}

	pub fn href(&self) -> String {
		self.url().to_string()
	}

	pub fn location(&self) -> WindowLocation {
		WindowLocation::from(&self.inner.history.borrow().current().url)
	}

	/// Resolves `href` against the current URL.
	pub fn resolve_url(&self, href: &str) -> Result<Url, url::ParseError> {
		self.url().join(href)
	}

	// History

	pub fn history_len(&self) -> usize {
		self.inner.history.borrow().len()
	}

	pub fn history_state(&self) -> Option<String> {
		self.inner.history.borrow().current().state.clone()
	}

	/// Adds a history entry for `url` without dispatching any event.
	pub fn push_state(&self, state: Option<&str>, url: &str) -> Result<(), url::ParseError> {
		let entry = self.history_entry(state, url)?;
		self.inner.history.borrow_mut().push(entry);
		Ok(())
	}

	/// Replaces the current history entry without dispatching any event.
	pub fn replace_state(&self, state: Option<&str>, url: &str) -> Result<(), url::ParseError> {
		let entry = self.history_entry(state, url)?;
		self.inner.history.borrow_mut().replace(entry);
		Ok(())
	}

	fn history_entry(&self, state: Option<&str>, url: &str) -> Result<HistoryEntry, url::ParseError> {
		Ok(HistoryEntry {
			url: self.resolve_url(url)?,
			state: state.map(String::from),
		})
	}

	pub fn back(&self) {
		self.go(-1);
	}

	pub fn forward(&self) {
		self.go(1);
	}

	/// Traverses history by `delta` and dispatches `popstate` with the state
	/// of the entry it lands on.
	pub fn go(&self, delta: isize) {
		let state = {
			let mut history = self.inner.history.borrow_mut();
			match history.go(delta) {
				Some(entry) => entry.state.clone(),
				None => return,
			}
		};
		self.dispatch_event(&Event::pop_state(state.as_deref()));
	}

	// Events

	pub fn add_event_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
	where
		F: Fn(&Event) + 'static,
	{
		let id = ListenerId(self.inner.next_listener.get());
		self.inner.next_listener.set(id.0 + 1);
		self.inner
			.listeners
			.borrow_mut()
			.push((id, kind, Rc::new(listener)));
		id
	}

	/// Returns `false` when `id` was not registered.
	pub fn remove_event_listener(&self, id: ListenerId) -> bool {
		let mut listeners = self.inner.listeners.borrow_mut();
		let before = listeners.len();
		listeners.retain(|(listener_id, _, _)| *listener_id != id);
		listeners.len() != before
	}

	/// Calls every listener registered for the event's kind, in registration
	/// order. Listeners may register or remove listeners and dispatch further
	/// events. Returns `false` when a listener prevented the default action.
	pub fn dispatch_event(&self, event: &Event) -> bool {
		let kind = event.kind();
		let listeners: Vec<Listener> = self
			.inner
			.listeners
			.borrow()
			.iter()
			.filter(|(_, k, _)| *k == kind)
			.map(|(_, _, listener)| Rc::clone(listener))
			.collect();
		tracing::trace!(event = kind.as_str(), listeners = listeners.len(), "Dispatching event");
		for listener in listeners {
			listener(event);
		}
		!event.default_prevented()
	}

	/// Dispatches a primary-button click on `target`. Returns `false` when a
	/// listener prevented the default action.
	pub fn click(&self, target: &Element) -> bool {
		self.dispatch_event(&Event::click(ClickDetail::primary(target)))
	}

	// Scrolling

	pub fn scroll_to(&self, x: f64, y: f64) {
		self.inner.scroll.set((x, y));
	}

	pub fn scroll_position(&self) -> (f64, f64) {
		self.inner.scroll.get()
	}
}

impl fmt::Debug for Window {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Window")
			.field("href", &self.href())
			.field("history", &self.history_len())
			.field("listeners", &self.inner.listeners.borrow().len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::events::EventData;
	use rstest::{fixture, rstest};
	use std::cell::RefCell;

	#[fixture]
	fn window() -> Window {
		Window::new("http://localhost:8080/start?x=1#top").expect("Valid URL")
	}

	#[rstest]
	fn test_location_parts(window: Window) {
		// Act
		let location = window.location();

		// Assert
		assert_eq!(location.origin, "http://localhost:8080");
		assert_eq!(location.pathname, "/start");
		assert_eq!(location.search, "?x=1");
		assert_eq!(location.hash, "#top");
	}

	#[rstest]
	fn test_default_port_is_dropped_from_origin() {
		// Arrange
		let window = Window::new("https://example.com:443/").expect("Valid URL");

		// Act & Assert
		assert_eq!(window.location().origin, "https://example.com");
	}

	#[rstest]
	fn test_push_state_is_silent_and_back_dispatches(window: Window) {
		// Arrange
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&seen);
		window.add_event_listener(EventKind::PopState, move |event| {
			if let EventData::PopState { state } = event.data() {
				sink.borrow_mut().push(state.clone());
			}
		});

		// Act
		window.push_state(Some("first"), "/a").expect("Valid URL");
		window.push_state(None, "/b").expect("Valid URL");
		let after_push = seen.borrow().len();
		window.back();

		// Assert
		assert_eq!(after_push, 0);
		assert_eq!(*seen.borrow(), vec![Some("first".to_string())]);
		assert_eq!(window.location().pathname, "/a");
	}

	#[rstest]
	fn test_removed_listener_is_not_called(window: Window) {
		// Arrange
		let calls = Rc::new(Cell::new(0));
		let counter = Rc::clone(&calls);
		let id = window.add_event_listener(EventKind::Go, move |_| counter.set(counter.get() + 1));

		// Act
		let removed = window.remove_event_listener(id);
		window.dispatch_event(&Event::go(NavigationIntent::new("/")));

		// Assert
		assert!(removed);
		assert_eq!(calls.get(), 0);
	}

	#[rstest]
	fn test_dispatch_reports_prevented_default(window: Window) {
		// Arrange
		window.add_event_listener(EventKind::Go, |event| event.prevent_default());

		// Act
		let proceed = window.dispatch_event(&Event::go(NavigationIntent::new("/")));

		// Assert
		assert!(!proceed);
	}
}
