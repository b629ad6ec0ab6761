//! In-memory element nodes.

use crate::router::{Lifecycle, RouterLocation};
use futures::channel::oneshot;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

/// Shared handle to an element node.
///
/// Cloning the handle does not clone the node: two handles compare equal
/// when they refer to the same node.
#[derive(Clone)]
pub struct Element {
	inner: Rc<ElementInner>,
}

struct ElementInner {
	id: NodeId,
	local_name: String,
	attributes: RefCell<BTreeMap<String, String>>,
	classes: RefCell<Vec<String>>,
	children: RefCell<Vec<Element>>,
	parent: RefCell<Weak<ElementInner>>,
	location: RefCell<Option<RouterLocation>>,
	lifecycle: RefCell<Option<Rc<dyn Lifecycle>>>,
	created_by_router: Cell<bool>,
	added_by_router: Cell<bool>,
	animation_waiters: RefCell<Vec<oneshot::Sender<()>>>,
}

impl Element {
	/// Creates a detached element. The tag name is lower-cased.
	pub fn new(tag: &str) -> Self {
		Self {
			inner: Rc::new(ElementInner {
				id: NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)),
				local_name: tag.to_ascii_lowercase(),
				attributes: RefCell::new(BTreeMap::new()),
				classes: RefCell::new(Vec::new()),
				children: RefCell::new(Vec::new()),
				parent: RefCell::new(Weak::new()),
				location: RefCell::new(None),
				lifecycle: RefCell::new(None),
				created_by_router: Cell::new(false),
				added_by_router: Cell::new(false),
				animation_waiters: RefCell::new(Vec::new()),
			}),
		}
	}

	/// Attaches lifecycle callbacks, builder style.
	pub fn with_lifecycle(self, lifecycle: Rc<dyn Lifecycle>) -> Self {
		self.set_lifecycle(Some(lifecycle));
		self
	}

	pub fn id(&self) -> NodeId {
		self.inner.id
	}

	pub fn local_name(&self) -> &str {
		&self.inner.local_name
	}

	pub fn lifecycle(&self) -> Option<Rc<dyn Lifecycle>> {
		self.inner.lifecycle.borrow().clone()
	}

	pub fn set_lifecycle(&self, lifecycle: Option<Rc<dyn Lifecycle>>) {
		*self.inner.lifecycle.borrow_mut() = lifecycle;
	}

	/// The location last assigned by a router.
	pub fn location(&self) -> Option<RouterLocation> {
		self.inner.location.borrow().clone()
	}

	pub fn set_location(&self, location: RouterLocation) {
		*self.inner.location.borrow_mut() = Some(location);
	}

	// Attributes

	pub fn get_attribute(&self, name: &str) -> Option<String> {
		self.inner
			.attributes
			.borrow()
			.get(&name.to_ascii_lowercase())
			.cloned()
	}

	pub fn has_attribute(&self, name: &str) -> bool {
		self.inner
			.attributes
			.borrow()
			.contains_key(&name.to_ascii_lowercase())
	}

	pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
		self.inner
			.attributes
			.borrow_mut()
			.insert(name.to_ascii_lowercase(), value.into());
	}

	pub fn remove_attribute(&self, name: &str) {
		self.inner
			.attributes
			.borrow_mut()
			.remove(&name.to_ascii_lowercase());
	}

	// Classes

	pub fn add_class(&self, class: &str) {
		let mut classes = self.inner.classes.borrow_mut();
		if !classes.iter().any(|c| c == class) {
			classes.push(class.to_string());
		}
	}

	pub fn remove_class(&self, class: &str) {
		self.inner.classes.borrow_mut().retain(|c| c != class);
	}

	pub fn has_class(&self, class: &str) -> bool {
		self.inner.classes.borrow().iter().any(|c| c == class)
	}

	pub fn classes(&self) -> Vec<String> {
		self.inner.classes.borrow().clone()
	}

	// Tree

	pub fn parent(&self) -> Option<Element> {
		self.inner
			.parent
			.borrow()
			.upgrade()
			.map(|inner| Element { inner })
	}

	/// Snapshot of the child list.
	pub fn children(&self) -> Vec<Element> {
		self.inner.children.borrow().clone()
	}

	pub fn first_child(&self) -> Option<Element> {
		self.inner.children.borrow().first().cloned()
	}

	pub fn child_count(&self) -> usize {
		self.inner.children.borrow().len()
	}

	/// Appends `child`, detaching it from its current parent first.
	///
	/// Appending an ancestor of `self` (or `self`) is ignored.
	pub fn append_child(&self, child: &Element) {
		if child.contains(self) {
			tracing::warn!(
				parent = %self.local_name(),
				child = %child.local_name(),
				"Refusing to append an ancestor as a child"
			);
			return;
		}
		child.remove();
		*child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
		self.inner.children.borrow_mut().push(child.clone());
	}

	/// Removes `child` from this element. Returns `false` when it was not a
	/// child.
	pub fn remove_child(&self, child: &Element) -> bool {
		let mut children = self.inner.children.borrow_mut();
		let Some(index) = children.iter().position(|c| c == child) else {
			return false;
		};
		children.remove(index);
		*child.inner.parent.borrow_mut() = Weak::new();
		true
	}

	/// Detaches this element from its parent.
	pub fn remove(&self) {
		if let Some(parent) = self.parent() {
			parent.remove_child(self);
		}
	}

	/// Detaches every child.
	pub fn remove_children(&self) {
		let children = std::mem::take(&mut *self.inner.children.borrow_mut());
		for child in children {
			*child.inner.parent.borrow_mut() = Weak::new();
		}
	}

	/// Whether `other` is this element or one of its descendants.
	pub fn contains(&self, other: &Element) -> bool {
		let mut current = Some(other.clone());
		while let Some(element) = current {
			if element == *self {
				return true;
			}
			current = element.parent();
		}
		false
	}

	/// The nearest inclusive ancestor with the given tag name.
	pub fn closest(&self, tag: &str) -> Option<Element> {
		let mut current = Some(self.clone());
		while let Some(element) = current {
			if element.local_name().eq_ignore_ascii_case(tag) {
				return Some(element);
			}
			current = element.parent();
		}
		None
	}

	// Router bookkeeping

	pub(crate) fn mark_created_by_router(&self) {
		self.inner.created_by_router.set(true);
	}

	/// Whether a router created this element from a component tag.
	pub fn is_created_by_router(&self) -> bool {
		self.inner.created_by_router.get()
	}

	pub(crate) fn mark_added_by_router(&self) {
		self.inner.added_by_router.set(true);
	}

	/// Whether a router attached this element below an outlet.
	pub fn is_added_by_router(&self) -> bool {
		self.inner.added_by_router.get()
	}

	// Animation

	/// Resolves on the next [`dispatch_animation_end`](Self::dispatch_animation_end).
	pub fn animation_end(&self) -> oneshot::Receiver<()> {
		let (sender, receiver) = oneshot::channel();
		self.inner.animation_waiters.borrow_mut().push(sender);
		receiver
	}

	/// Signals that a running CSS animation finished.
	pub fn dispatch_animation_end(&self) {
		let waiters = std::mem::take(&mut *self.inner.animation_waiters.borrow_mut());
		for waiter in waiters {
			let _ = waiter.send(());
		}
	}

	/// Serializes the subtree as HTML-like markup.
	pub fn to_html(&self) -> String {
		let mut html = format!("<{}", self.local_name());
		for (name, value) in self.inner.attributes.borrow().iter() {
			html.push_str(&format!(" {name}=\"{value}\""));
		}
		let classes = self.inner.classes.borrow();
		if !classes.is_empty() {
			html.push_str(&format!(" class=\"{}\"", classes.join(" ")));
		}
		html.push('>');
		for child in self.inner.children.borrow().iter() {
			html.push_str(&child.to_html());
		}
		html.push_str(&format!("</{}>", self.local_name()));
		html
	}
}

impl PartialEq for Element {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Eq for Element {}

impl Hash for Element {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.inner.id.hash(state);
	}
}

impl fmt::Debug for Element {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Element")
			.field("id", &self.inner.id.0)
			.field("local_name", &self.inner.local_name)
			.field("children", &self.inner.children.borrow().len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::executor::block_on;
	use rstest::rstest;

	#[rstest]
	fn test_append_child_moves_between_parents() {
		// Arrange
		let first = Element::new("div");
		let second = Element::new("div");
		let child = Element::new("SPAN");

		// Act
		first.append_child(&child);
		second.append_child(&child);

		// Assert
		assert_eq!(child.local_name(), "span");
		assert_eq!(first.child_count(), 0);
		assert_eq!(second.children(), vec![child.clone()]);
		assert_eq!(child.parent(), Some(second));
	}

	#[rstest]
	fn test_append_ancestor_is_ignored() {
		// Arrange
		let parent = Element::new("div");
		let child = Element::new("p");
		parent.append_child(&child);

		// Act
		child.append_child(&parent);

		// Assert
		assert_eq!(child.child_count(), 0);
		assert!(parent.contains(&child));
	}

	#[rstest]
	fn test_remove_children_clears_parents() {
		// Arrange
		let parent = Element::new("div");
		let a = Element::new("a");
		let b = Element::new("b");
		parent.append_child(&a);
		parent.append_child(&b);

		// Act
		parent.remove_children();

		// Assert
		assert_eq!(parent.child_count(), 0);
		assert!(a.parent().is_none());
		assert!(b.parent().is_none());
	}

	#[rstest]
	fn test_closest_finds_inclusive_ancestor() {
		// Arrange
		let anchor = Element::new("a");
		let span = Element::new("span");
		anchor.append_child(&span);

		// Act & Assert
		assert_eq!(span.closest("a"), Some(anchor.clone()));
		assert_eq!(anchor.closest("A"), Some(anchor));
		assert!(span.closest("nav").is_none());
	}

	#[rstest]
	fn test_to_html_serializes_subtree() {
		// Arrange
		let list = Element::new("ul");
		let item = Element::new("li");
		item.set_attribute("data-id", "1");
		item.add_class("active");
		list.append_child(&item);

		// Act
		let html = list.to_html();

		// Assert
		assert_eq!(html, "<ul><li data-id=\"1\" class=\"active\"></li></ul>");
	}

	#[rstest]
	fn test_animation_end_wakes_waiters() {
		// Arrange
		let element = Element::new("div");
		let waiter = element.animation_end();

		// Act
		element.dispatch_animation_end();

		// Assert
		assert_eq!(block_on(waiter), Ok(()));
	}

	#[rstest]
	fn test_clones_share_identity() {
		// Arrange
		let element = Element::new("div");
		let clone = element.clone();

		// Act & Assert
		assert_eq!(element, clone);
		assert_ne!(element, Element::new("div"));
	}
}
