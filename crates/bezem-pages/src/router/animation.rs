//! Enter and leave transitions.

use crate::dom::{Document, Element};
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};

/// Runs a transition on an element.
pub trait Animator {
	/// Applies `class` to `element` and resolves once the transition ends.
	fn animate(&self, element: &Element, class: &str) -> LocalBoxFuture<'static, ()>;
}

/// Transitions driven by CSS animations declared on the document.
///
/// When the class starts an animation the element is taken out of flow
/// until the animation ends; otherwise the class is removed right away.
#[derive(Debug, Clone)]
pub struct CssAnimator {
	document: Document,
}

impl CssAnimator {
	pub fn new(document: Document) -> Self {
		Self { document }
	}
}

impl Animator for CssAnimator {
	fn animate(&self, element: &Element, class: &str) -> LocalBoxFuture<'static, ()> {
		element.add_class(class);
		if !self.document.will_animate(element) {
			element.remove_class(class);
			return future::ready(()).boxed_local();
		}

		element.set_attribute("style", "position: absolute");
		let finished = element.animation_end();
		let element = element.clone();
		let class = class.to_string();
		async move {
			// A dropped sender means the element went away mid-animation.
			let _ = finished.await;
			element.remove_class(&class);
			element.remove_attribute("style");
		}
		.boxed_local()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::executor::LocalPool;
	use futures::task::LocalSpawnExt;
	use rstest::rstest;
	use std::cell::Cell;
	use std::rc::Rc;

	#[rstest]
	fn test_without_rule_completes_immediately() {
		// Arrange
		let animator = CssAnimator::new(Document::new());
		let element = Element::new("div");

		// Act
		futures::executor::block_on(animator.animate(&element, "entering"));

		// Assert
		assert!(!element.has_class("entering"));
	}

	#[rstest]
	fn test_waits_for_animation_end() {
		// Arrange
		let document = Document::new();
		document.add_animation_rule("leaving", "fade-out");
		let animator = CssAnimator::new(document);
		let element = Element::new("div");
		let done = Rc::new(Cell::new(false));
		let mut pool = LocalPool::new();
		let flag = Rc::clone(&done);
		let animation = animator.animate(&element, "leaving");
		pool.spawner()
			.spawn_local(async move {
				animation.await;
				flag.set(true);
			})
			.expect("Spawn");

		// Act
		pool.run_until_stalled();
		let before_end = (done.get(), element.has_class("leaving"));
		element.dispatch_animation_end();
		pool.run_until_stalled();

		// Assert
		assert_eq!(before_end, (false, true));
		assert!(done.get());
		assert!(!element.has_class("leaving"));
		assert!(!element.has_attribute("style"));
	}
}
