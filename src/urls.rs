//! Path patterns
//!
//! Compiles route path patterns (`/users/:id`, `/files/:path*`,
//! `/(\d+)`), matches pathnames against them and builds pathnames back from
//! parameters.
//!
//! A nested match inherits the keys and parameters of its parent:
//!
//! ```
//! use bezem::urls::{Params, match_path};
//!
//! let parent = match_path("/users/:id", "/users/42/posts", false, &[], &Params::new())
//!     .unwrap()
//!     .unwrap();
//! let child = match_path("/posts", "/posts", true, &parent.keys, &parent.params)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(parent.path, "/users/42");
//! assert_eq!(child.params["id"].as_str(), Some("42"));
//! ```

pub use bezem_urls::*;
