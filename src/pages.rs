//! Client-side routing
//!
//! Route trees, asynchronous resolution and the navigation controller, on
//! top of a small in-memory document model.
//!
//! ## Architecture
//!
//! - **Route tree**: nested routes with optional actions, redirects, bundles
//!   and lazily loaded children
//! - **Resolver**: depth-first resolution of a pathname into a route chain
//! - **Router**: renders chains into an outlet, runs lifecycle guards and
//!   keeps the window history in sync
//! - **Triggers**: link clicks and history traversal become navigations

pub use bezem_pages::*;
