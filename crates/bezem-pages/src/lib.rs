//! Bezem Pages - nested route resolution and navigation lifecycle
//!
//! The runtime half of the bezem client-side router. Path patterns come from
//! `bezem-urls`; this crate matches them as a tree and drives navigation.
//!
//! ## Architecture
//!
//! - [`dom`]: in-memory platform the router drives (elements, document,
//!   window, session history, events)
//! - [`router`]: route configuration, the route tree and its match cursor,
//!   the [`Resolver`](router::Resolver), and the [`Router`](router::Router)
//!   navigation controller with guards, transitions, script bundles and
//!   navigation triggers
//!
//! Navigation is single-threaded. Futures are `!Send` and run on a local
//! executor such as [`futures::executor::LocalPool`].

pub mod dom;
pub mod router;

pub use dom::{Document, Element, Event, EventKind, NavigationIntent, Window};
pub use router::{
	ActionResult, Commands, Lifecycle, ResolutionContext, Resolver, Route, RouteError, Router,
	RouterLocation, RouterOptions, RouterSettings,
};
