//! Route configuration.

use super::context::{ActionResult, Commands, ResolutionContext};
use super::error::{RouteError, ValidationError};
use bezem_urls::compile_route_path;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Future returned by a route action.
pub type ActionFuture = LocalBoxFuture<'static, Result<Option<ActionResult>, RouteError>>;

/// A route action: called with the resolution context and the commands
/// available to it.
pub type ActionFn = Rc<dyn Fn(ResolutionContext, Commands) -> ActionFuture>;

/// Future returned by a lazy-children callback.
pub type ChildrenFuture = LocalBoxFuture<'static, Result<Vec<Route>, RouteError>>;

/// Produces a route's children when the route is resolved.
pub type ChildrenFn = Rc<dyn Fn(ResolutionContext) -> ChildrenFuture>;

/// Child routes, given up front or produced on resolution.
#[derive(Clone)]
pub enum Children {
	Routes(Vec<Route>),
	Lazy(ChildrenFn),
}

impl fmt::Debug for Children {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Routes(routes) => f.debug_tuple("Routes").field(routes).finish(),
			Self::Lazy(_) => f.write_str("Lazy(..)"),
		}
	}
}

/// Script loaded before a route resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bundle {
	/// A classic script; must be a `.js` source.
	Script(String),
	/// Module and legacy builds. The first to load wins.
	Split {
		module: Option<String>,
		nomodule: Option<String>,
	},
}

impl fmt::Display for Bundle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Script(src) => f.write_str(src),
			Self::Split { module, nomodule } => {
				let sources: Vec<&str> = module.iter().chain(nomodule).map(String::as_str).collect();
				f.write_str(&sources.join(" | "))
			}
		}
	}
}

/// Transition classes for the content swapped below a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Animate {
	/// `entering` and `leaving`.
	Default,
	/// Custom class names. Absent ones fall back to the defaults.
	Custom {
		enter: Option<String>,
		leave: Option<String>,
	},
}

impl Animate {
	pub const ENTER_CLASS: &'static str = "entering";
	pub const LEAVE_CLASS: &'static str = "leaving";

	pub fn enter_class(&self) -> &str {
		match self {
			Self::Custom {
				enter: Some(class), ..
			} => class,
			_ => Self::ENTER_CLASS,
		}
	}

	pub fn leave_class(&self) -> &str {
		match self {
			Self::Custom {
				leave: Some(class), ..
			} => class,
			_ => Self::LEAVE_CLASS,
		}
	}
}

#[derive(Clone, Default)]
struct RouteDef {
	path: String,
	name: Option<String>,
	component: Option<String>,
	redirect: Option<String>,
	action: Option<ActionFn>,
	children: Option<Children>,
	bundle: Option<Bundle>,
	animate: Option<Animate>,
}

/// A route definition.
///
/// `Route` is a cheap handle: clones share one definition, and the route
/// tree recognises a re-attached clone as the same route.
///
/// # Examples
///
/// ```
/// use bezem_pages::router::Route;
///
/// let routes = Route::new("/users")
///     .component("x-user-layout")
///     .children(vec![
///         Route::new("").component("x-user-list"),
///         Route::new("/:id").name("user").component("x-user-profile"),
///     ]);
/// assert_eq!(routes.path(), "/users");
/// ```
#[derive(Clone)]
pub struct Route {
	def: Rc<RouteDef>,
}

impl Route {
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			def: Rc::new(RouteDef {
				path: path.into(),
				..RouteDef::default()
			}),
		}
	}

	fn def_mut(&mut self) -> &mut RouteDef {
		Rc::make_mut(&mut self.def)
	}

	/// Name used by `url_for_name`.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.def_mut().name = Some(name.into());
		self
	}

	/// Tag of the element created when the route resolves.
	pub fn component(mut self, tag: impl Into<String>) -> Self {
		self.def_mut().component = Some(tag.into());
		self
	}

	/// Pattern to redirect to, built with the route's parameters.
	pub fn redirect(mut self, pathname: impl Into<String>) -> Self {
		self.def_mut().redirect = Some(pathname.into());
		self
	}

	pub fn action<F, Fut>(mut self, action: F) -> Self
	where
		F: Fn(ResolutionContext, Commands) -> Fut + 'static,
		Fut: Future<Output = Result<Option<ActionResult>, RouteError>> + 'static,
	{
		self.def_mut().action = Some(Rc::new(move |context, commands| {
			action(context, commands).boxed_local()
		}));
		self
	}

	pub fn children(mut self, children: Vec<Route>) -> Self {
		self.def_mut().children = Some(Children::Routes(children));
		self
	}

	/// Children produced each time the route is resolved.
	pub fn lazy_children<F, Fut>(mut self, load: F) -> Self
	where
		F: Fn(ResolutionContext) -> Fut + 'static,
		Fut: Future<Output = Result<Vec<Route>, RouteError>> + 'static,
	{
		self.def_mut().children = Some(Children::Lazy(Rc::new(move |context| {
			load(context).boxed_local()
		})));
		self
	}

	pub fn bundle(mut self, bundle: Bundle) -> Self {
		self.def_mut().bundle = Some(bundle);
		self
	}

	pub fn animate(mut self, animate: Animate) -> Self {
		self.def_mut().animate = Some(animate);
		self
	}

	pub fn path(&self) -> &str {
		&self.def.path
	}

	pub fn get_name(&self) -> Option<&str> {
		self.def.name.as_deref()
	}

	pub fn get_component(&self) -> Option<&str> {
		self.def.component.as_deref()
	}

	pub fn get_redirect(&self) -> Option<&str> {
		self.def.redirect.as_deref()
	}

	pub fn get_action(&self) -> Option<&ActionFn> {
		self.def.action.as_ref()
	}

	pub fn get_children(&self) -> Option<&Children> {
		self.def.children.as_ref()
	}

	pub fn get_bundle(&self) -> Option<&Bundle> {
		self.def.bundle.as_ref()
	}

	pub fn get_animate(&self) -> Option<&Animate> {
		self.def.animate.as_ref()
	}

	/// Whether both handles share one definition.
	pub fn ptr_eq(&self, other: &Route) -> bool {
		Rc::ptr_eq(&self.def, &other.def)
	}

	/// Checks this route and its static children.
	///
	/// # Errors
	///
	/// Fails when a route has no way to produce a result, has a malformed
	/// bundle, or has a path that does not compile.
	pub fn validate(&self) -> Result<(), ValidationError> {
		let def = &self.def;
		if def.action.is_none()
			&& def.children.is_none()
			&& def.component.is_none()
			&& def.redirect.is_none()
			&& def.bundle.is_none()
		{
			return Err(ValidationError::MissingResolution {
				path: def.path.clone(),
			});
		}

		match &def.bundle {
			Some(Bundle::Script(src)) if !src.ends_with(".js") => {
				return Err(ValidationError::UnsupportedBundle { src: src.clone() });
			}
			Some(Bundle::Split {
				module: None,
				nomodule: None,
			}) => {
				return Err(ValidationError::EmptyBundle {
					path: def.path.clone(),
				});
			}
			_ => {}
		}

		if def.redirect.is_some() {
			let overridden = [
				("bundle", def.bundle.is_some()),
				("component", def.component.is_some()),
			];
			for (property, _) in overridden.iter().filter(|(_, present)| *present) {
				tracing::warn!(
					"Route config \"{}\" has both \"redirect\" and \"{property}\" properties, and \"redirect\" will always override the latter. Did you mean to only use \"{property}\"?",
					def.path
				);
			}
		}

		compile_route_path(&def.path, def.children.is_none())?;

		if let Some(Children::Routes(children)) = &def.children {
			children.iter().try_for_each(Route::validate)?;
		}
		Ok(())
	}
}

impl fmt::Debug for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("path", &self.def.path)
			.field("name", &self.def.name)
			.field("component", &self.def.component)
			.field("redirect", &self.def.redirect)
			.field("action", &self.def.action.is_some())
			.field("children", &self.def.children)
			.field("bundle", &self.def.bundle)
			.finish()
	}
}
