//! Route tree snapshot and depth-first match cursor.
//!
//! Routes are attached to an arena under a synthetic root with path `""`.
//! Every attached node gets a [`RouteId`]; chain diffing and "skip this
//! route" requests compare ids, never route contents.

use super::error::ValidationError;
use super::route::{Children, Route};
use bezem_urls::{Params, PathMatch, PatternResult, Token, match_path};
use std::collections::HashMap;
use std::fmt;

/// Identity of a route node within a [`RouteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(u64);

/// A route as attached to the tree: the definition plus its position.
#[derive(Clone)]
pub struct RouteRef {
	id: RouteId,
	parent: Option<RouteId>,
	route: Route,
}

impl RouteRef {
	pub fn id(&self) -> RouteId {
		self.id
	}

	/// `None` only for the synthetic root.
	pub fn parent(&self) -> Option<RouteId> {
		self.parent
	}

	pub fn route(&self) -> &Route {
		&self.route
	}

	pub fn path(&self) -> &str {
		self.route.path()
	}

	pub fn is_root(&self) -> bool {
		self.parent.is_none()
	}
}

impl PartialEq for RouteRef {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for RouteRef {}

impl fmt::Debug for RouteRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteRef")
			.field("id", &self.id.0)
			.field("path", &self.route.path())
			.finish()
	}
}

#[derive(Debug)]
enum NodeChildren {
	Leaf,
	Static(Vec<RouteId>),
	/// Ids of the last loaded batch; empty until first loaded.
	Lazy(Vec<RouteId>),
}

#[derive(Debug)]
struct RouteNode {
	entry: RouteRef,
	children: NodeChildren,
}

/// Arena of attached routes.
#[derive(Debug)]
pub struct RouteTree {
	nodes: HashMap<RouteId, RouteNode>,
	root: RouteId,
	next_id: u64,
	names: Option<HashMap<String, Vec<RouteId>>>,
}

impl RouteTree {
	/// Builds a tree with `routes` as top-level routes.
	///
	/// # Errors
	///
	/// Fails on the first route that does not validate.
	pub fn new(routes: Vec<Route>) -> Result<Self, ValidationError> {
		let root = RouteId(0);
		let mut tree = Self {
			nodes: HashMap::new(),
			root,
			next_id: 1,
			names: None,
		};
		tree.nodes.insert(
			root,
			RouteNode {
				entry: RouteRef {
					id: root,
					parent: None,
					route: Route::new(""),
				},
				children: NodeChildren::Static(Vec::new()),
			},
		);
		tree.set_routes(routes)?;
		Ok(tree)
	}

	pub fn root(&self) -> RouteId {
		self.root
	}

	/// Replaces every top-level route. Ids are never reused across calls.
	pub fn set_routes(&mut self, routes: Vec<Route>) -> Result<(), ValidationError> {
		routes.iter().try_for_each(Route::validate)?;
		self.clear();
		let root = self.root;
		let ids = routes
			.into_iter()
			.map(|route| self.insert(route, root))
			.collect();
		if let Some(node) = self.nodes.get_mut(&root) {
			node.children = NodeChildren::Static(ids);
		}
		Ok(())
	}

	/// Removes every route below the root.
	pub fn clear(&mut self) {
		let root = self.root;
		self.nodes.retain(|id, _| *id == root);
		if let Some(node) = self.nodes.get_mut(&root) {
			node.children = NodeChildren::Static(Vec::new());
		}
		self.names = None;
	}

	/// Appends top-level routes after the existing ones.
	pub fn add_routes(&mut self, routes: Vec<Route>) -> Result<(), ValidationError> {
		routes.iter().try_for_each(Route::validate)?;
		let root = self.root;
		let ids: Vec<RouteId> = routes
			.into_iter()
			.map(|route| self.insert(route, root))
			.collect();
		if let Some(RouteNode {
			children: NodeChildren::Static(children),
			..
		}) = self.nodes.get_mut(&self.root)
		{
			children.extend(ids);
		}
		self.names = None;
		Ok(())
	}

	/// Top-level route definitions.
	pub fn routes(&self) -> Vec<Route> {
		self.child_ids(self.root)
			.iter()
			.filter_map(|id| self.nodes.get(id))
			.map(|node| node.entry.route.clone())
			.collect()
	}

	fn insert(&mut self, route: Route, parent: RouteId) -> RouteId {
		let id = RouteId(self.next_id);
		self.next_id += 1;

		let children = match route.get_children() {
			None => NodeChildren::Leaf,
			Some(Children::Lazy(_)) => NodeChildren::Lazy(Vec::new()),
			Some(Children::Routes(routes)) => NodeChildren::Static(
				routes
					.clone()
					.into_iter()
					.map(|child| self.insert(child, id))
					.collect(),
			),
		};
		self.nodes.insert(
			id,
			RouteNode {
				entry: RouteRef {
					id,
					parent: Some(parent),
					route,
				},
				children,
			},
		);
		id
	}

	fn remove_subtree(&mut self, id: RouteId) {
		if let Some(node) = self.nodes.remove(&id) {
			let children = match node.children {
				NodeChildren::Leaf => Vec::new(),
				NodeChildren::Static(ids) | NodeChildren::Lazy(ids) => ids,
			};
			for child in children {
				self.remove_subtree(child);
			}
		}
	}

	/// Installs the routes a lazy-children callback produced for `parent`.
	///
	/// Routes that were already attached under `parent` (same handle) keep
	/// their id and subtree; others are attached fresh and dropped ones are
	/// removed.
	pub fn attach_children(&mut self, parent: RouteId, routes: Vec<Route>) -> Result<(), ValidationError> {
		routes.iter().try_for_each(Route::validate)?;
		let previous = match self.nodes.get(&parent).map(|node| &node.children) {
			Some(NodeChildren::Lazy(ids)) => ids.clone(),
			_ => return Ok(()),
		};

		let mut kept = Vec::with_capacity(routes.len());
		for route in routes {
			let reused = previous.iter().copied().find(|id| {
				!kept.contains(id)
					&& self
						.nodes
						.get(id)
						.is_some_and(|node| node.entry.route.ptr_eq(&route))
			});
			let id = match reused {
				Some(id) => id,
				None => self.insert(route, parent),
			};
			kept.push(id);
		}
		for id in previous.into_iter().filter(|id| !kept.contains(id)) {
			self.remove_subtree(id);
		}

		tracing::debug!(
			parent = %self.route_ref(parent).map(|r| r.path().to_string()).unwrap_or_default(),
			children = kept.len(),
			"Lazy children attached"
		);
		if let Some(node) = self.nodes.get_mut(&parent) {
			node.children = NodeChildren::Lazy(kept);
		}
		self.names = None;
		Ok(())
	}

	pub fn route_ref(&self, id: RouteId) -> Option<&RouteRef> {
		self.nodes.get(&id).map(|node| &node.entry)
	}

	pub fn parent_of(&self, id: RouteId) -> Option<RouteId> {
		self.route_ref(id).and_then(RouteRef::parent)
	}

	/// Whether `id` may have children. Routes with lazy children count even
	/// before they load.
	pub fn has_children(&self, id: RouteId) -> bool {
		self.nodes
			.get(&id)
			.is_some_and(|node| !matches!(node.children, NodeChildren::Leaf))
	}

	/// Currently attached children of `id`.
	pub fn child_ids(&self, id: RouteId) -> &[RouteId] {
		match self.nodes.get(&id).map(|node| &node.children) {
			Some(NodeChildren::Static(ids) | NodeChildren::Lazy(ids)) => ids,
			_ => &[],
		}
	}

	/// Whether `id` lies strictly below `ancestor`.
	pub fn is_descendant(&self, id: RouteId, ancestor: RouteId) -> bool {
		let mut current = self.parent_of(id);
		while let Some(parent) = current {
			if parent == ancestor {
				return true;
			}
			current = self.parent_of(parent);
		}
		false
	}

	/// Full pattern of `id`: the non-empty paths from the root down, joined
	/// with `/`.
	pub fn full_path(&self, id: RouteId) -> String {
		let mut paths = Vec::new();
		let mut current = Some(id);
		while let Some(route) = current.and_then(|id| self.route_ref(id)) {
			paths.push(route.path());
			current = route.parent();
		}
		paths.reverse();
		join_paths(paths)
	}

	/// Looks up a route by `name`, or by component tag for unnamed routes.
	///
	/// # Errors
	///
	/// Fails when no route or more than one route carries the name.
	pub fn route_by_name(&mut self, name: &str) -> Result<RouteId, ValidationError> {
		if !self
			.names
			.as_ref()
			.is_some_and(|names| names.contains_key(name))
		{
			self.names = Some(self.index_names());
		}
		match self.names.as_ref().and_then(|names| names.get(name)) {
			Some(ids) if ids.len() == 1 => Ok(ids[0]),
			Some(ids) if ids.len() > 1 => Err(ValidationError::DuplicateName {
				name: name.to_string(),
			}),
			_ => Err(ValidationError::UnknownName {
				name: name.to_string(),
			}),
		}
	}

	fn index_names(&self) -> HashMap<String, Vec<RouteId>> {
		let mut names: HashMap<String, Vec<RouteId>> = HashMap::new();
		let mut pending = vec![self.root];
		while let Some(id) = pending.pop() {
			let Some(entry) = self.route_ref(id) else {
				continue;
			};
			let key = entry
				.route()
				.get_name()
				.or_else(|| entry.route().get_component());
			if let Some(key) = key {
				names.entry(key.to_string()).or_default().push(id);
			}
			pending.extend(self.child_ids(id).iter().rev());
		}
		names
	}
}

/// Joins route patterns the way nested routes compose: trailing and leading
/// slashes collapse to one and empty paths are skipped.
pub fn join_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
	paths.into_iter().fold(String::new(), |joined, path| {
		if path.is_empty() {
			return joined;
		}
		let head = joined.strip_suffix('/').unwrap_or(&joined);
		let tail = path.strip_prefix('/').unwrap_or(path);
		format!("{head}/{tail}")
	})
}

/// One candidate produced by a [`MatchCursor`].
#[derive(Debug, Clone)]
pub struct RouteMatch {
	pub route: RouteRef,
	/// The consumed part of the remaining pathname.
	pub path: String,
	pub keys: Vec<Token>,
	pub params: Params,
}

#[derive(Debug)]
struct Frame {
	route: RouteId,
	route_path: String,
	pathname: String,
	/// Passed on to children.
	ignore_leading_slash: bool,
	parent_keys: Vec<Token>,
	parent_params: Params,
	matched: Option<PathMatch>,
	child_index: usize,
}

impl Frame {
	fn new(
		tree: &RouteTree,
		route: RouteId,
		pathname: &str,
		ignore_leading_slash: bool,
		parent_keys: Vec<Token>,
		parent_params: Params,
	) -> Self {
		let mut route_path = tree
			.route_ref(route)
			.map(|r| r.path().to_string())
			.unwrap_or_default();
		let mut ignore = ignore_leading_slash;
		if route_path.starts_with('/') {
			if ignore {
				route_path.remove(0);
			}
			ignore = true;
		}
		Self {
			route,
			route_path,
			pathname: pathname.to_string(),
			ignore_leading_slash: ignore,
			parent_keys,
			parent_params,
			matched: None,
			child_index: 0,
		}
	}
}

/// Depth-first cursor over the routes matching a pathname.
///
/// Each call to [`next`](Self::next) yields the next matching route, parents
/// before their children. The cursor reads the tree on every step, so
/// children attached between steps are visited. Once exhausted it stays
/// exhausted.
#[derive(Debug)]
pub struct MatchCursor {
	frames: Vec<Frame>,
	exhausted: bool,
}

impl MatchCursor {
	/// Starts a traversal of `pathname` from `start`.
	pub fn new(tree: &RouteTree, start: RouteId, pathname: &str, ignore_leading_slash: bool) -> Self {
		Self {
			frames: vec![Frame::new(
				tree,
				start,
				pathname,
				ignore_leading_slash,
				Vec::new(),
				Params::new(),
			)],
			exhausted: false,
		}
	}

	/// Advances to the next match.
	///
	/// A frame for `skip` yields nothing further: neither the route itself
	/// nor any of its descendants.
	pub fn next(&mut self, tree: &RouteTree, skip: Option<RouteId>) -> PatternResult<Option<RouteMatch>> {
		if self.exhausted {
			return Ok(None);
		}
		let found = self.advance(0, tree, skip)?;
		if found.is_none() {
			self.exhausted = true;
			self.frames.clear();
		}
		Ok(found)
	}

	fn advance(
		&mut self,
		level: usize,
		tree: &RouteTree,
		skip: Option<RouteId>,
	) -> PatternResult<Option<RouteMatch>> {
		let route_id = self.frames[level].route;
		if skip == Some(route_id) {
			return Ok(None);
		}
		let Some(route) = tree.route_ref(route_id) else {
			return Ok(None);
		};
		let has_children = tree.has_children(route_id);

		if self.frames[level].matched.is_none() {
			let frame = &self.frames[level];
			let matched = match_path(
				&frame.route_path,
				&frame.pathname,
				!has_children,
				&frame.parent_keys,
				&frame.parent_params,
			)?;
			if let Some(matched) = matched {
				tracing::trace!(route = %route.path(), consumed = %matched.path, "Route matched");
				let found = RouteMatch {
					route: route.clone(),
					path: matched.path.clone(),
					keys: matched.keys.clone(),
					params: matched.params.clone(),
				};
				self.frames[level].matched = Some(matched);
				return Ok(Some(found));
			}
			return Ok(None);
		}

		let children = tree.child_ids(route_id);
		while self.frames[level].child_index < children.len() {
			if self.frames.len() == level + 1 {
				let frame = &self.frames[level];
				let Some(matched) = frame.matched.as_ref() else {
					return Ok(None);
				};
				let mut consumed = matched.path.len();
				if consumed > 0 && frame.pathname[consumed..].starts_with('/') {
					consumed += 1;
				}
				let child = Frame::new(
					tree,
					children[frame.child_index],
					&frame.pathname[consumed..],
					frame.ignore_leading_slash,
					matched.keys.clone(),
					matched.params.clone(),
				);
				self.frames.push(child);
			}
			if let Some(found) = self.advance(level + 1, tree, skip)? {
				return Ok(Some(found));
			}
			self.frames.truncate(level + 1);
			self.frames[level].child_index += 1;
		}
		Ok(None)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn leaf(path: &str) -> Route {
		Route::new(path).component("x-page")
	}

	fn collect(tree: &RouteTree, pathname: &str) -> Vec<String> {
		let mut cursor = MatchCursor::new(tree, tree.root(), pathname, false);
		let mut visited = Vec::new();
		while let Some(found) = cursor.next(tree, None).expect("Valid patterns") {
			visited.push(tree.full_path(found.route.id()));
		}
		visited
	}

	#[rstest]
	fn test_cursor_visits_parent_then_child() {
		// Arrange
		let tree = RouteTree::new(vec![Route::new("/a").children(vec![leaf("/b")])])
			.expect("Valid routes");

		// Act
		let visited = collect(&tree, "/a/b");

		// Assert
		assert_eq!(visited, vec!["", "/a", "/a/b"]);
	}

	#[rstest]
	fn test_prefix_does_not_match_partial_segment() {
		// Arrange
		let tree = RouteTree::new(vec![Route::new("/user").children(vec![leaf("")])])
			.expect("Valid routes");

		// Act
		let visited = collect(&tree, "/users");

		// Assert
		assert_eq!(visited, vec![""]);
	}

	#[rstest]
	fn test_empty_paths_are_squashed() {
		// Arrange
		let tree = RouteTree::new(vec![Route::new("").children(vec![
			Route::new("/").children(vec![leaf("/x")]),
		])])
		.expect("Valid routes");

		// Act
		let visited = collect(&tree, "/x");

		// Assert
		assert_eq!(visited.last().map(String::as_str), Some("/x"));
		assert_eq!(visited.len(), 4);
	}

	#[rstest]
	#[case("/a", true)]
	#[case("/a/", true)]
	#[case("/a/x", false)]
	fn test_empty_leaf_matches_only_empty_remainder(#[case] pathname: &str, #[case] matches: bool) {
		// Arrange
		let tree = RouteTree::new(vec![Route::new("/a").children(vec![leaf("/")])])
			.expect("Valid routes");

		// Act
		let visited = collect(&tree, pathname);

		// Assert
		assert_eq!(visited.len() == 3, matches);
	}

	#[rstest]
	fn test_siblings_tried_left_to_right() {
		// Arrange
		let tree = RouteTree::new(vec![leaf("/:any"), leaf("/fixed")]).expect("Valid routes");

		// Act
		let visited = collect(&tree, "/fixed");

		// Assert
		assert_eq!(visited, vec!["", "/:any", "/fixed"]);
	}

	#[rstest]
	fn test_child_inherits_parent_params() {
		// Arrange
		let tree = RouteTree::new(vec![
			Route::new("/org/:org").children(vec![leaf("/team/:team")]),
		])
		.expect("Valid routes");
		let mut cursor = MatchCursor::new(&tree, tree.root(), "/org/acme/team/core", false);

		// Act
		let mut last = None;
		while let Some(found) = cursor.next(&tree, None).expect("Valid patterns") {
			last = Some(found);
		}

		// Assert
		let last = last.expect("Should match");
		assert_eq!(last.params["org"].as_str(), Some("acme"));
		assert_eq!(last.params["team"].as_str(), Some("core"));
		assert_eq!(last.keys.len(), 2);
	}

	#[rstest]
	fn test_skip_prunes_subtree() {
		// Arrange
		let tree = RouteTree::new(vec![
			Route::new("/a").children(vec![leaf("/b")]),
			leaf("/a/b"),
		])
		.expect("Valid routes");
		let mut cursor = MatchCursor::new(&tree, tree.root(), "/a/b", false);
		cursor.next(&tree, None).expect("Valid patterns");
		let parent = cursor
			.next(&tree, None)
			.expect("Valid patterns")
			.expect("Should match /a");

		// Act
		let next = cursor
			.next(&tree, Some(parent.route.id()))
			.expect("Valid patterns")
			.expect("Should match sibling");

		// Assert
		assert_eq!(tree.full_path(next.route.id()), "/a/b");
		assert_eq!(next.route.parent(), Some(tree.root()));
	}

	#[rstest]
	fn test_exhausted_cursor_stays_exhausted() {
		// Arrange
		let tree = RouteTree::new(vec![leaf("/a")]).expect("Valid routes");
		let mut cursor = MatchCursor::new(&tree, tree.root(), "/b", false);
		cursor.next(&tree, None).expect("Valid patterns");
		assert!(cursor.next(&tree, None).expect("Valid patterns").is_none());

		// Act
		let again = cursor.next(&tree, None).expect("Valid patterns");

		// Assert
		assert!(again.is_none());
	}

	#[rstest]
	fn test_attach_children_reuses_ids_for_same_route() {
		// Arrange
		let child = leaf("/kid");
		let mut tree = RouteTree::new(vec![
			Route::new("/lazy").lazy_children(|_| async { Ok(Vec::new()) }),
		])
		.expect("Valid routes");
		let parent = tree.child_ids(tree.root())[0];
		tree.attach_children(parent, vec![child.clone()])
			.expect("Valid children");
		let first = tree.child_ids(parent).to_vec();

		// Act
		tree.attach_children(parent, vec![child, leaf("/other")])
			.expect("Valid children");

		// Assert
		let second = tree.child_ids(parent);
		assert_eq!(second.len(), 2);
		assert_eq!(second[0], first[0]);
	}

	#[rstest]
	fn test_route_by_name_falls_back_to_component() {
		// Arrange
		let mut tree = RouteTree::new(vec![
			Route::new("/users").children(vec![
				Route::new("/:id").name("user").component("x-user"),
				Route::new("/new").component("x-user-form"),
			]),
		])
		.expect("Valid routes");

		// Act
		let named = tree.route_by_name("user").expect("Known name");
		let by_component = tree.route_by_name("x-user-form").expect("Known component");

		// Assert
		assert_eq!(tree.full_path(named), "/users/:id");
		assert_eq!(tree.full_path(by_component), "/users/new");
	}

	#[rstest]
	fn test_route_by_name_rejects_duplicates_and_unknown() {
		// Arrange
		let mut tree = RouteTree::new(vec![
			Route::new("/a").name("dup").component("x-a"),
			Route::new("/b").name("dup").component("x-b"),
		])
		.expect("Valid routes");

		// Act & Assert
		assert_eq!(
			tree.route_by_name("dup"),
			Err(ValidationError::DuplicateName { name: "dup".into() })
		);
		assert_eq!(
			tree.route_by_name("nope"),
			Err(ValidationError::UnknownName { name: "nope".into() })
		);
	}

	#[rstest]
	fn test_clear_removes_routes_and_names() {
		// Arrange
		let mut tree = RouteTree::new(vec![
			Route::new("/a").name("a").children(vec![leaf("/b")]),
		])
		.expect("Valid routes");
		tree.route_by_name("a").expect("Known name");

		// Act
		tree.clear();

		// Assert
		assert!(tree.routes().is_empty());
		assert!(!collect(&tree, "/a/b").iter().any(|path| path == "/a"));
		assert_eq!(
			tree.route_by_name("a"),
			Err(ValidationError::UnknownName { name: "a".into() })
		);
	}

	#[rstest]
	#[case(vec!["", "/users", ":id"], "/users/:id")]
	#[case(vec!["", "/", "/about"], "/about")]
	#[case(vec!["/a/", "/b"], "/a/b")]
	#[case(vec![""], "")]
	fn test_join_paths(#[case] paths: Vec<&str>, #[case] expected: &str) {
		// Act & Assert
		assert_eq!(join_paths(paths), expected);
	}
}
