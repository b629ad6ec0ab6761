//! Client-side routing.
//!
//! Routes form a tree. A [`Resolver`] walks the routes matching a pathname
//! depth-first; a [`Router`] renders the result into an outlet element and
//! keeps it in sync with the window location.
//!
//! ## Example
//!
//! ```
//! use bezem_pages::dom::{Element, Window};
//! use bezem_pages::router::{Route, Router, RouterOptions};
//! use futures::executor::block_on;
//!
//! let window = Window::new("http://localhost/users/7").unwrap();
//! let outlet = Element::new("main");
//! let router = Router::new(Some(outlet.clone()), &window, RouterOptions::new()).unwrap();
//!
//! let ready = router
//!     .set_routes(vec![Route::new("/users/:id").component("x-user")], false)
//!     .unwrap();
//! let location = block_on(ready).unwrap().unwrap();
//!
//! assert_eq!(location.params["id"].as_str(), Some("7"));
//! assert_eq!(outlet.first_child().unwrap().local_name(), "x-user");
//! ```

pub mod animation;
pub mod bundle;
pub mod context;
pub mod core;
pub mod error;
pub mod generation;
pub mod lifecycle;
pub mod location;
pub mod resolver;
pub mod route;
pub mod settings;
pub mod tree;
pub mod triggers;

pub use animation::{Animator, CssAnimator};
pub use bundle::{BundleCache, HeadScriptLoader, LoadFuture, ScriptKind, ScriptLoader};
pub use context::{
	ActionResult, Chain, ChainEntry, Commands, ContextId, NextOutcome, Redirect, ResolutionContext,
	RouteResult,
};
pub use self::core::{RenderFuture, RenderOutcome, Router};
pub use error::{MAX_REDIRECT_COUNT, RouteError, RouterResult, ValidationError};
pub use generation::RenderToken;
pub use lifecycle::{
	BeforeEnterCommands, BeforeLeaveCommands, GuardFuture, GuardOutcome, Lifecycle, proceed,
};
pub use location::RouterLocation;
pub use resolver::{
	ErrorHandler, Resolution, ResolutionFuture, ResolveRouteFn, Resolver, ResolverOptions,
	default_resolve_route,
};
pub use route::{ActionFn, ActionFuture, Animate, Bundle, Children, ChildrenFn, ChildrenFuture, Route};
pub use settings::{RouterOptions, RouterSettings, SettingsError, TriggerSettings};
pub use tree::{MatchCursor, RouteId, RouteMatch, RouteRef, RouteTree, join_paths};
pub use triggers::{
	ClickTrigger, Dispatch, NavigationTrigger, PopStateTrigger, default_triggers, fire_go,
};
