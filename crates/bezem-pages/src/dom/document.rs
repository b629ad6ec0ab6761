//! The document: element factory, `<head>` and stylesheet rules.

use super::element::Element;
use crate::router::Lifecycle;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Builds the lifecycle callbacks for a newly created component element.
pub type ComponentFactory = Rc<dyn Fn() -> Rc<dyn Lifecycle>>;

/// Shared handle to a document.
#[derive(Clone)]
pub struct Document {
	inner: Rc<DocumentInner>,
}

struct DocumentInner {
	head: Element,
	body: Element,
	title: RefCell<String>,
	base_href: RefCell<Option<String>>,
	components: RefCell<HashMap<String, ComponentFactory>>,
	animations: RefCell<HashMap<String, String>>,
}

impl Document {
	pub fn new() -> Self {
		Self {
			inner: Rc::new(DocumentInner {
				head: Element::new("head"),
				body: Element::new("body"),
				title: RefCell::new(String::new()),
				base_href: RefCell::new(None),
				components: RefCell::new(HashMap::new()),
				animations: RefCell::new(HashMap::new()),
			}),
		}
	}

	pub fn head(&self) -> Element {
		self.inner.head.clone()
	}

	pub fn body(&self) -> Element {
		self.inner.body.clone()
	}

	pub fn title(&self) -> String {
		self.inner.title.borrow().clone()
	}

	pub fn set_title(&self, title: impl Into<String>) {
		*self.inner.title.borrow_mut() = title.into();
	}

	/// The `href` of the document's `<base>` element, if any.
	pub fn base_href(&self) -> Option<String> {
		self.inner.base_href.borrow().clone()
	}

	pub fn set_base_href(&self, href: Option<String>) {
		*self.inner.base_href.borrow_mut() = href;
	}

	/// Registers a custom element. Elements created for `tag` afterwards get
	/// the lifecycle `factory` builds.
	pub fn define<F>(&self, tag: &str, factory: F)
	where
		F: Fn() -> Rc<dyn Lifecycle> + 'static,
	{
		self.inner
			.components
			.borrow_mut()
			.insert(tag.to_ascii_lowercase(), Rc::new(factory));
	}

	pub fn is_defined(&self, tag: &str) -> bool {
		self.inner
			.components
			.borrow()
			.contains_key(&tag.to_ascii_lowercase())
	}

	/// Creates an element, upgrading it when `tag` was [`define`](Self::define)d.
	pub fn create_element(&self, tag: &str) -> Element {
		let element = Element::new(tag);
		let factory = self
			.inner
			.components
			.borrow()
			.get(element.local_name())
			.cloned();
		if let Some(factory) = factory {
			element.set_lifecycle(Some(factory()));
		}
		element
	}

	/// Declares that elements carrying `class` run the CSS animation `name`.
	pub fn add_animation_rule(&self, class: &str, name: &str) {
		self.inner
			.animations
			.borrow_mut()
			.insert(class.to_string(), name.to_string());
	}

	/// Computed `animation-name` of `element`.
	pub fn animation_name(&self, element: &Element) -> Option<String> {
		let animations = self.inner.animations.borrow();
		element
			.classes()
			.iter()
			.rev()
			.find_map(|class| animations.get(class).cloned())
	}

	pub fn will_animate(&self, element: &Element) -> bool {
		self.animation_name(element)
			.is_some_and(|name| !name.is_empty() && name != "none")
	}
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Document")
			.field("title", &self.inner.title.borrow())
			.field("base_href", &self.inner.base_href.borrow())
			.field("components", &self.inner.components.borrow().len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::router::Lifecycle;
	use rstest::rstest;

	struct Page;

	impl Lifecycle for Page {}

	#[rstest]
	fn test_create_element_upgrades_defined_tags() {
		// Arrange
		let document = Document::new();
		document.define("x-page", || Rc::new(Page));

		// Act
		let page = document.create_element("X-Page");
		let plain = document.create_element("div");

		// Assert
		assert!(page.lifecycle().is_some());
		assert!(plain.lifecycle().is_none());
	}

	#[rstest]
	#[case("fade", "fade-out", true)]
	#[case("fade", "none", false)]
	fn test_will_animate_follows_rules(
		#[case] class: &str,
		#[case] animation: &str,
		#[case] expected: bool,
	) {
		// Arrange
		let document = Document::new();
		document.add_animation_rule(class, animation);
		let element = Element::new("div");
		element.add_class(class);

		// Act & Assert
		assert_eq!(document.will_animate(&element), expected);
	}

	#[rstest]
	fn test_element_without_rule_does_not_animate() {
		// Arrange
		let document = Document::new();
		let element = Element::new("div");
		element.add_class("leaving");

		// Act & Assert
		assert!(!document.will_animate(&element));
	}
}
