//! Router configuration: programmatic options and TOML settings.

use super::animation::Animator;
use super::bundle::ScriptLoader;
use super::context::RouteResult;
use super::error::RouteError;
use super::resolver::ErrorHandler;
use super::triggers::{ClickTrigger, NavigationTrigger, PopStateTrigger};
use futures::task::LocalSpawn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

/// Failure to load [`RouterSettings`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
	#[error("Failed to read router settings: {0}")]
	Io(#[from] std::io::Error),

	#[error("Failed to parse router settings: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Declarative router settings.
///
/// ```
/// use bezem_pages::router::RouterSettings;
///
/// let settings = RouterSettings::from_toml_str(
///     r#"
/// base_url = "/app/"
///
/// [triggers]
/// popstate = false
/// "#,
/// )
/// .unwrap();
/// assert_eq!(settings.base_url.as_deref(), Some("/app/"));
/// assert!(settings.triggers.click);
/// assert!(!settings.triggers.popstate);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
	/// Base URL the application is mounted under. Defaults to the document's
	/// `<base href>`.
	pub base_url: Option<String>,
	pub triggers: TriggerSettings,
}

/// Which built-in navigation triggers to activate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSettings {
	pub click: bool,
	pub popstate: bool,
}

impl Default for TriggerSettings {
	fn default() -> Self {
		Self {
			click: true,
			popstate: true,
		}
	}
}

impl RouterSettings {
	/// Parses settings from a TOML document.
	///
	/// # Errors
	///
	/// Returns [`SettingsError::Parse`] for malformed TOML or mistyped fields.
	pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(content)?)
	}

	/// Reads and parses a TOML settings file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	pub fn into_options(self) -> RouterOptions {
		let mut options = RouterOptions::new();
		options.base_url = self.base_url;
		if self.triggers != TriggerSettings::default() {
			let mut triggers: Vec<Rc<dyn NavigationTrigger>> = Vec::new();
			if self.triggers.click {
				triggers.push(Rc::new(ClickTrigger::default()));
			}
			if self.triggers.popstate {
				triggers.push(Rc::new(PopStateTrigger::default()));
			}
			options.triggers = Some(triggers);
		}
		options
	}
}

/// Options for [`Router::new`](super::Router::new).
#[derive(Clone, Default)]
pub struct RouterOptions {
	pub(crate) base_url: Option<String>,
	pub(crate) error_handler: Option<ErrorHandler>,
	pub(crate) spawner: Option<Rc<dyn LocalSpawn>>,
	pub(crate) animator: Option<Rc<dyn Animator>>,
	pub(crate) script_loader: Option<Rc<dyn ScriptLoader>>,
	/// `None` selects the default triggers.
	pub(crate) triggers: Option<Vec<Rc<dyn NavigationTrigger>>>,
}

impl RouterOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = Some(base_url.into());
		self
	}

	/// Shows the handler's result instead of failing a render.
	pub fn error_handler<F>(mut self, handler: F) -> Self
	where
		F: Fn(&RouteError) -> RouteResult + 'static,
	{
		self.error_handler = Some(Rc::new(handler));
		self
	}

	/// Spawns every render, so navigations started by events make progress
	/// without anyone awaiting them.
	pub fn spawner(mut self, spawner: impl LocalSpawn + 'static) -> Self {
		self.spawner = Some(Rc::new(spawner));
		self
	}

	/// Replaces the CSS animator.
	pub fn animator(mut self, animator: impl Animator + 'static) -> Self {
		self.animator = Some(Rc::new(animator));
		self
	}

	/// Replaces the `<script>`-appending bundle loader.
	pub fn script_loader(mut self, loader: impl ScriptLoader + 'static) -> Self {
		self.script_loader = Some(Rc::new(loader));
		self
	}

	pub fn triggers(mut self, triggers: Vec<Rc<dyn NavigationTrigger>>) -> Self {
		self.triggers = Some(triggers);
		self
	}

	/// Navigates only on explicit `render` calls.
	pub fn no_triggers(self) -> Self {
		self.triggers(Vec::new())
	}
}

impl fmt::Debug for RouterOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouterOptions")
			.field("base_url", &self.base_url)
			.field("error_handler", &self.error_handler.is_some())
			.field("spawner", &self.spawner.is_some())
			.field("animator", &self.animator.is_some())
			.field("script_loader", &self.script_loader.is_some())
			.field("triggers", &self.triggers.as_ref().map(Vec::len))
			.finish()
	}
}
