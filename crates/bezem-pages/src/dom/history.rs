//! Session history stack.

use url::Url;

/// One session history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
	pub url: Url,
	pub state: Option<String>,
}

/// Linear history with a cursor, as kept by a browsing context.
///
/// Pushing discards every entry after the current one.
#[derive(Debug, Clone)]
pub struct History {
	entries: Vec<HistoryEntry>,
	index: usize,
}

impl History {
	pub fn new(url: Url) -> Self {
		Self {
			entries: vec![HistoryEntry { url, state: None }],
			index: 0,
		}
	}

	pub fn current(&self) -> &HistoryEntry {
		&self.entries[self.index]
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub fn push(&mut self, entry: HistoryEntry) {
		self.entries.truncate(self.index + 1);
		self.entries.push(entry);
		self.index = self.entries.len() - 1;
	}

	pub fn replace(&mut self, entry: HistoryEntry) {
		self.entries[self.index] = entry;
	}

	/// Moves the cursor by `delta`. Returns the new current entry, or `None`
	/// (leaving the cursor alone) when the target is out of range or `delta`
	/// is zero.
	pub fn go(&mut self, delta: isize) -> Option<&HistoryEntry> {
		if delta == 0 {
			return None;
		}
		let target = self.index.checked_add_signed(delta)?;
		if target >= self.entries.len() {
			return None;
		}
		self.index = target;
		Some(&self.entries[target])
	}
}
