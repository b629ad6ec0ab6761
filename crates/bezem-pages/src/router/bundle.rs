//! Script bundles loaded before a route resolves.

use super::route::Bundle;
use crate::dom::Document;
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture, Shared};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// How a script is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
	Classic,
	Module,
	NoModule,
}

/// Future returned by a [`ScriptLoader`]. The error is a human-readable
/// reason.
pub type LoadFuture = LocalBoxFuture<'static, Result<(), String>>;

/// Loads a script by source URL.
pub trait ScriptLoader {
	fn load(&self, src: &str, kind: ScriptKind) -> LoadFuture;
}

/// Appends `<script>` elements to the document head.
///
/// A script already present in the head is not added twice.
#[derive(Debug, Clone)]
pub struct HeadScriptLoader {
	document: Document,
}

impl HeadScriptLoader {
	pub fn new(document: Document) -> Self {
		Self { document }
	}
}

impl ScriptLoader for HeadScriptLoader {
	fn load(&self, src: &str, kind: ScriptKind) -> LoadFuture {
		let head = self.document.head();
		let present = head.children().iter().any(|element| {
			element.local_name() == "script" && element.get_attribute("src").as_deref() == Some(src)
		});
		if !present {
			let script = self.document.create_element("script");
			script.set_attribute("src", src);
			script.set_attribute("async", "");
			match kind {
				ScriptKind::Module => script.set_attribute("type", "module"),
				ScriptKind::NoModule => script.set_attribute("nomodule", ""),
				ScriptKind::Classic => {}
			}
			head.append_child(&script);
			tracing::debug!(src, ?kind, "Script appended to head");
		}
		future::ready(Ok(())).boxed_local()
	}
}

type PendingLoads = RefCell<HashMap<String, Shared<LoadFuture>>>;

/// Deduplicates script loads by source URL.
///
/// Concurrent and later requests for one source share a single load. A
/// failed load is forgotten so that it can be retried.
pub struct BundleCache {
	loader: Rc<dyn ScriptLoader>,
	loads: Rc<PendingLoads>,
}

impl BundleCache {
	pub fn new(loader: Rc<dyn ScriptLoader>) -> Self {
		Self {
			loader,
			loads: Rc::new(RefCell::new(HashMap::new())),
		}
	}

	/// Loads `src` once.
	pub fn load_script(&self, src: &str, kind: ScriptKind) -> Shared<LoadFuture> {
		if let Some(load) = self.loads.borrow().get(src) {
			return load.clone();
		}

		let load = self.loader.load(src, kind);
		let loads: Weak<PendingLoads> = Rc::downgrade(&self.loads);
		let key = src.to_string();
		let shared = async move {
			let result = load.await;
			if result.is_err()
				&& let Some(loads) = loads.upgrade()
			{
				loads.borrow_mut().remove(&key);
			}
			result
		}
		.boxed_local()
		.shared();
		self.loads
			.borrow_mut()
			.insert(src.to_string(), shared.clone());
		shared
	}

	/// Loads a route bundle. For split bundles the first variant to finish
	/// decides.
	pub fn load_bundle(&self, bundle: &Bundle) -> LoadFuture {
		match bundle {
			Bundle::Script(src) => self.load_script(src, ScriptKind::Classic).boxed_local(),
			Bundle::Split { module, nomodule } => {
				let module = module
					.as_deref()
					.map(|src| self.load_script(src, ScriptKind::Module));
				let nomodule = nomodule
					.as_deref()
					.map(|src| self.load_script(src, ScriptKind::NoModule));
				match (module, nomodule) {
					(Some(module), Some(nomodule)) => future::select(module, nomodule)
						.map(|either| either.factor_first().0)
						.boxed_local(),
					(Some(only), None) | (None, Some(only)) => only.boxed_local(),
					(None, None) => future::ready(Ok(())).boxed_local(),
				}
			}
		}
	}
}

impl fmt::Debug for BundleCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BundleCache")
			.field("loads", &self.loads.borrow().len())
			.finish()
	}
}
