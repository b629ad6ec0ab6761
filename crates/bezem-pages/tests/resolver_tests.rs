//! Resolver Integration Tests
//!
//! Resolves pathnames against nested route trees without a router.
//!
//! Test Categories:
//! - Category 1: Visit Order
//! - Category 2: Parameters

use bezem_pages::router::{ResolutionContext, Resolver, ResolverOptions, Route, RouteError};
use futures::executor::block_on;
use rstest::*;
use std::cell::RefCell;
use std::rc::Rc;

type Visits = Rc<RefCell<Vec<String>>>;

/// A route whose action records its path and then resolves or declines.
fn visiting(path: &str, visits: &Visits, tag: Option<&'static str>) -> Route {
	let visits = Rc::clone(visits);
	Route::new(path).action(move |context: ResolutionContext, commands| {
		if let Some(route) = &context.route {
			visits.borrow_mut().push(route.path().to_string());
		}
		async move { Ok(tag.map(|tag| commands.component(tag))) }
	})
}

/// A route whose action renders `tag`. A bare resolver ignores components.
fn page(path: &str, tag: &'static str) -> Route {
	Route::new(path).action(move |_, commands| async move { Ok(Some(commands.component(tag))) })
}

#[fixture]
fn visits() -> Visits {
	Visits::default()
}

fn nested(visits: &Visits) -> Resolver {
	Resolver::new(
		vec![
			visiting("/a", visits, None).children(vec![
				visiting("/b", visits, Some("x-b")),
				visiting("/c", visits, Some("x-c")),
			]),
			visiting("/d", visits, Some("x-d")),
		],
		ResolverOptions::default(),
	)
	.expect("Valid routes")
}

// ============================================================================
// Category 1: Visit Order
// ============================================================================

/// Test: parents are visited before their children
#[rstest]
fn test_parent_visited_before_child(visits: Visits) {
	// Arrange
	let resolver = nested(&visits);

	// Act
	let context = block_on(resolver.resolve("/a/c")).expect("Should resolve");

	// Assert
	assert_eq!(*visits.borrow(), vec!["/a", "/c"]);
	assert_eq!(
		context.result_element().map(|e| e.local_name().to_string()),
		Some("x-c".to_string())
	);
}

/// Test: unmatched siblings are never visited
#[rstest]
fn test_unmatched_routes_not_visited(visits: Visits) {
	// Arrange
	let resolver = nested(&visits);

	// Act
	block_on(resolver.resolve("/d")).expect("Should resolve");

	// Assert
	assert_eq!(*visits.borrow(), vec!["/d"]);
}

/// Test: a declined parent with no matching child is not found
#[rstest]
fn test_declined_parent_without_match_is_not_found(visits: Visits) {
	// Arrange
	let resolver = nested(&visits);

	// Act
	let error = block_on(resolver.resolve("/a/x")).expect_err("Should fail");

	// Assert
	assert!(matches!(error, RouteError::NotFound { ref pathname, .. } if pathname == "/a/x"));
	assert_eq!(error.code(), 404);
	assert_eq!(*visits.borrow(), vec!["/a"]);
}

// ============================================================================
// Category 2: Parameters
// ============================================================================

/// Test: parameters of every matched level are merged
#[rstest]
fn test_nested_parameters_are_merged() {
	// Arrange
	let resolver = Resolver::new(
		vec![Route::new("/users/:user").children(vec![
			page("/posts/:post", "x-post"),
		])],
		ResolverOptions::default(),
	)
	.expect("Valid routes");

	// Act
	let context = block_on(resolver.resolve("/users/ada/posts/12")).expect("Should resolve");

	// Assert
	assert_eq!(context.params["user"].as_str(), Some("ada"));
	assert_eq!(context.params["post"].as_str(), Some("12"));
}

/// Test: search and hash travel with the resolved context
#[rstest]
fn test_search_and_hash_are_kept() {
	// Arrange
	let resolver = Resolver::new(
		vec![page("/list", "x-list")],
		ResolverOptions::default(),
	)
	.expect("Valid routes");
	let request = ResolutionContext::new("/list")
		.with_search("?page=2")
		.with_hash("#top");

	// Act
	let context = block_on(resolver.resolve(request)).expect("Should resolve");

	// Assert
	assert_eq!(context.pathname, "/list");
	assert_eq!(context.search, "?page=2");
	assert_eq!(context.hash, "#top");
}

/// Test: encoded parameter values are decoded
#[rstest]
fn test_encoded_parameter_is_decoded() {
	// Arrange
	let resolver = Resolver::new(
		vec![page("/tags/:tag", "x-tag")],
		ResolverOptions::default(),
	)
	.expect("Valid routes");

	// Act
	let context = block_on(resolver.resolve("/tags/caf%C3%A9")).expect("Should resolve");

	// Assert
	assert_eq!(context.params["tag"].as_str(), Some("café"));
}
