//! Render generations.
//!
//! Every render takes a token from the router's [`RenderGeneration`].
//! Each suspension point asks [`RenderGeneration::is_latest`] before touching
//! shared state, so a superseded render stops having effects.

use std::cell::Cell;

/// Identifies one render. Tokens increase strictly per router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderToken(u64);

impl RenderToken {
	pub fn value(self) -> u64 {
		self.0
	}

	/// Whether this is the router's first render.
	pub fn is_first(self) -> bool {
		self.0 == 1
	}
}

#[derive(Debug, Default)]
pub(crate) struct RenderGeneration {
	last_started: Cell<u64>,
}

impl RenderGeneration {
	pub(crate) fn begin(&self) -> RenderToken {
		let next = self.last_started.get() + 1;
		self.last_started.set(next);
		RenderToken(next)
	}

	/// Work that is not bound to a render is always current.
	pub(crate) fn is_latest(&self, token: Option<RenderToken>) -> bool {
		token.is_none_or(|token| token.0 == self.last_started.get())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_newer_render_supersedes_older() {
		// Arrange
		let generation = RenderGeneration::default();
		let first = generation.begin();

		// Act
		let second = generation.begin();

		// Assert
		assert!(first.is_first());
		assert!(!generation.is_latest(Some(first)));
		assert!(generation.is_latest(Some(second)));
		assert!(generation.is_latest(None));
	}
}
