//! # Bezem
//!
//! Client-side routing for single-page applications.
//!
//! Bezem maps URL pathnames onto a tree of routes, resolves the matching
//! chain asynchronously and renders it into an outlet element, keeping the
//! window history in sync.
//!
//! ## Crates
//!
//! - [`urls`] - path patterns: compile, match and build pathnames
//! - [`pages`] - route tree, resolver and navigation controller
//!
//! ## Feature Flags
//!
//! - `pages` (default) - the routing layer. Without it only the path pattern
//!   engine is available.
//!
//! ## Quick Example
//!
//! ```
//! # #[cfg(feature = "pages")]
//! # {
//! use bezem::prelude::*;
//! use futures::executor::block_on;
//!
//! let window = Window::new("http://localhost/posts/12").unwrap();
//! let outlet = Element::new("main");
//! let router = Router::new(Some(outlet.clone()), &window, RouterOptions::new()).unwrap();
//!
//! let ready = router
//!     .set_routes(
//!         vec![Route::new("/posts").children(vec![Route::new("/:id").component("x-post")])],
//!         false,
//!     )
//!     .unwrap();
//! let location = block_on(ready).unwrap().unwrap();
//!
//! assert_eq!(location.params["id"].as_str(), Some("12"));
//! assert_eq!(router.url_for_path("/posts/:id", &params([("id", "3")])).unwrap(), "/posts/3");
//! # }
//! ```

#[cfg(feature = "pages")]
pub mod pages;
pub mod urls;

pub use bezem_urls::{ParamValue, Params, PatternError, match_path, params};

#[cfg(feature = "pages")]
pub use bezem_pages::{
	ActionResult, Commands, Element, Lifecycle, Resolver, Route, RouteError, Router,
	RouterLocation, RouterOptions, RouterSettings, Window,
};

/// Common imports.
pub mod prelude {
	pub use bezem_urls::{Params, build_path, match_path, params};

	#[cfg(feature = "pages")]
	pub use bezem_pages::dom::{Document, Element, Window};
	#[cfg(feature = "pages")]
	pub use bezem_pages::router::{
		ActionResult, Animate, BeforeEnterCommands, BeforeLeaveCommands, Bundle, Commands,
		GuardFuture, Lifecycle, ResolutionContext, Resolver, Route, RouteError, Router,
		RouterLocation, RouterOptions, RouterSettings,
	};
}
