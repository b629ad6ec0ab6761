//! Navigation triggers: sources of `go` events.
//!
//! A trigger watches the window for user intent (link clicks, history
//! traversal) and reports it through a [`Dispatch`] callback, which fires
//! the cancelable `go` event routers listen for.

use crate::dom::{
	Event, EventData, EventKind, ListenerId, NavigationIntent, ROUTER_IGNORE_STATE, WeakWindow,
	Window, WindowLocation,
};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Reports a navigation intent. Returns `true` when a router handled it.
pub type Dispatch = Rc<dyn Fn(NavigationIntent) -> bool>;

/// A source of navigation intents.
pub trait NavigationTrigger {
	/// Starts listening on `window`.
	fn activate(&self, window: &Window, dispatch: Dispatch);

	/// Stops listening on `window`.
	fn deactivate(&self, window: &Window);
}

/// Fires a cancelable `go` event. Returns `true` when a listener handled it.
pub fn fire_go(window: &Window, intent: NavigationIntent) -> bool {
	!window.dispatch_event(&Event::go(intent))
}

/// A dispatch that fires `go` on `window`.
pub(crate) fn go_dispatch(window: &Window) -> Dispatch {
	let window: WeakWindow = window.downgrade();
	Rc::new(move |intent| {
		window
			.upgrade()
			.is_some_and(|window| fire_go(&window, intent))
	})
}

/// The default set: clicks and history traversal.
pub fn default_triggers() -> Vec<Rc<dyn NavigationTrigger>> {
	vec![
		Rc::new(ClickTrigger::default()),
		Rc::new(PopStateTrigger::default()),
	]
}

/// Turns same-origin link clicks into navigations.
#[derive(Default)]
pub struct ClickTrigger {
	listener: Cell<Option<ListenerId>>,
}

impl NavigationTrigger for ClickTrigger {
	fn activate(&self, window: &Window, dispatch: Dispatch) {
		self.deactivate(window);
		let weak = window.downgrade();
		let id = window.add_event_listener(EventKind::Click, move |event| {
			if let Some(window) = weak.upgrade() {
				handle_click(&window, event, &dispatch);
			}
		});
		self.listener.set(Some(id));
	}

	fn deactivate(&self, window: &Window) {
		if let Some(id) = self.listener.take() {
			window.remove_event_listener(id);
		}
	}
}

impl fmt::Debug for ClickTrigger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClickTrigger")
			.field("active", &self.listener.get().is_some())
			.finish()
	}
}

fn handle_click(window: &Window, event: &Event, dispatch: &Dispatch) {
	let EventData::Click(click) = event.data() else {
		return;
	};
	if event.default_prevented() || click.button != 0 || click.modifiers.any() {
		return;
	}

	let anchor = click
		.path
		.iter()
		.find(|element| element.local_name() == "a")
		.cloned()
		.or_else(|| click.target.closest("a"));
	let Some(anchor) = anchor else {
		return;
	};

	if anchor
		.get_attribute("target")
		.is_some_and(|target| !target.is_empty() && !target.eq_ignore_ascii_case("_self"))
	{
		return;
	}
	if anchor.has_attribute("download") || anchor.has_attribute("router-ignore") {
		return;
	}

	let Some(href) = anchor.get_attribute("href") else {
		return;
	};
	let Ok(url) = window.resolve_url(&href) else {
		tracing::debug!(%href, "Ignoring click on a link with an unparsable href");
		return;
	};
	let link = WindowLocation::from(&url);
	let current = window.location();

	if link.pathname == current.pathname && !link.hash.is_empty() {
		return;
	}
	if link.origin != current.origin {
		return;
	}

	if dispatch(NavigationIntent::from(&link)) {
		event.prevent_default();
		window.scroll_to(0.0, 0.0);
	}
}

/// Turns history traversal into navigations.
#[derive(Default)]
pub struct PopStateTrigger {
	listener: Cell<Option<ListenerId>>,
}

impl NavigationTrigger for PopStateTrigger {
	fn activate(&self, window: &Window, dispatch: Dispatch) {
		self.deactivate(window);
		let weak = window.downgrade();
		let id = window.add_event_listener(EventKind::PopState, move |event| {
			let EventData::PopState { state } = event.data() else {
				return;
			};
			if state.as_deref() == Some(ROUTER_IGNORE_STATE) {
				return;
			}
			if let Some(window) = weak.upgrade() {
				dispatch(NavigationIntent::from(&window.location()));
			}
		});
		self.listener.set(Some(id));
	}

	fn deactivate(&self, window: &Window) {
		if let Some(id) = self.listener.take() {
			window.remove_event_listener(id);
		}
	}
}

impl fmt::Debug for PopStateTrigger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PopStateTrigger")
			.field("active", &self.listener.get().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::{ClickDetail, Element, Modifiers};
	use rstest::{fixture, rstest};
	use std::cell::RefCell;

	struct Harness {
		window: Window,
		seen: Rc<RefCell<Vec<NavigationIntent>>>,
		trigger: ClickTrigger,
	}

	#[fixture]
	fn harness() -> Harness {
		let window = Window::new("http://localhost/current").expect("Valid URL");
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&seen);
		let trigger = ClickTrigger::default();
		trigger.activate(
			&window,
			Rc::new(move |intent| {
				sink.borrow_mut().push(intent);
				true
			}),
		);
		Harness {
			window,
			seen,
			trigger,
		}
	}

	fn link(href: &str) -> Element {
		let anchor = Element::new("a");
		anchor.set_attribute("href", href);
		anchor
	}

	#[rstest]
	fn test_same_origin_click_dispatches(harness: Harness) {
		// Arrange
		let anchor = link("/users?page=2");
		let label = Element::new("span");
		anchor.append_child(&label);
		harness.window.scroll_to(0.0, 300.0);

		// Act
		let proceed = harness.window.click(&label);

		// Assert
		assert!(!proceed);
		assert_eq!(
			*harness.seen.borrow(),
			vec![NavigationIntent::new("/users").with_search("?page=2")]
		);
		assert_eq!(harness.window.scroll_position(), (0.0, 0.0));
	}

	#[rstest]
	#[case::external(link("https://example.com/users"))]
	#[case::hash_only(link("/current#section"))]
	#[case::no_href(Element::new("a"))]
	fn test_ignored_links(harness: Harness, #[case] anchor: Element) {
		// Act
		let proceed = harness.window.click(&anchor);

		// Assert
		assert!(proceed);
		assert!(harness.seen.borrow().is_empty());
	}

	#[rstest]
	#[case("target", "_blank")]
	#[case("download", "")]
	#[case("router-ignore", "")]
	fn test_ignored_attributes(harness: Harness, #[case] name: &str, #[case] value: &str) {
		// Arrange
		let anchor = link("/users");
		anchor.set_attribute(name, value);

		// Act
		harness.window.click(&anchor);

		// Assert
		assert!(harness.seen.borrow().is_empty());
	}

	#[rstest]
	fn test_modified_and_secondary_clicks_ignored(harness: Harness) {
		// Arrange
		let anchor = link("/users");
		let ctrl = ClickDetail::primary(&anchor).with_modifiers(Modifiers {
			ctrl: true,
			..Modifiers::default()
		});
		let middle = ClickDetail::primary(&anchor).with_button(1);

		// Act
		harness.window.dispatch_event(&Event::click(ctrl));
		harness.window.dispatch_event(&Event::click(middle));

		// Assert
		assert!(harness.seen.borrow().is_empty());
	}

	#[rstest]
	fn test_deactivated_trigger_ignores_clicks(harness: Harness) {
		// Arrange
		harness.trigger.deactivate(&harness.window);

		// Act
		harness.window.click(&link("/users"));

		// Assert
		assert!(harness.seen.borrow().is_empty());
	}

	#[rstest]
	fn test_popstate_skips_router_state() {
		// Arrange
		let window = Window::new("http://localhost/").expect("Valid URL");
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&seen);
		let trigger = PopStateTrigger::default();
		trigger.activate(
			&window,
			Rc::new(move |intent: NavigationIntent| {
				sink.borrow_mut().push(intent.pathname);
				true
			}),
		);
		window.push_state(None, "/a").expect("Valid URL");

		// Act
		window.dispatch_event(&Event::pop_state(Some(ROUTER_IGNORE_STATE)));
		window.back();

		// Assert
		assert_eq!(*seen.borrow(), vec!["/".to_string()]);
	}
}
