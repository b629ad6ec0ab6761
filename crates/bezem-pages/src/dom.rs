//! In-memory DOM platform the router drives.
//!
//! Provides the small part of the browser object model that navigation
//! needs: element trees with identity, a document with a component registry,
//! and a window with session history, typed events and scrolling.

pub mod document;
pub mod element;
pub mod events;
pub mod history;
pub mod window;

pub use document::{ComponentFactory, Document};
pub use element::{Element, NodeId};
pub use events::{
	ClickDetail, ErrorDetail, Event, EventData, EventKind, ListenerId, Modifiers, NavigationIntent,
	ROUTER_IGNORE_STATE,
};
pub use history::{History, HistoryEntry};
pub use window::{WeakWindow, Window, WindowLocation};
