//! Object construction.
//!
//! Object actions and object filters are declared by class name. Turning a
//! class name plus properties into an instance is the job of an
//! [`ObjectFactory`]. The dispatcher never inspects the instance type; it
//! only asks the resulting [`Component`] for the capability it needs, and a
//! component without it is a configuration error.
//!
//! [`Registry`] is the stock factory: a table of constructors keyed by class
//! name, with helpers that apply properties by deserializing them into the
//! instance type.
//!
//! ```rust,ignore
//! #[derive(Deserialize)]
//! struct OutputCache {
//!     #[serde(default)]
//!     duration: u32,
//! }
//!
//! impl Filter<SiteController> for OutputCache { /* ... */ }
//!
//! let registry = Registry::new()
//!     .filter::<OutputCache>("OutputCache")
//!     .action::<CaptchaAction>("CaptchaAction");
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;

use crate::action::ActionObject;
use crate::controller::Controller;
use crate::declaration::ObjectSpec;
use crate::error::ConfigError;
use crate::filter::Filter;

/// Where an object is being constructed.
pub enum Origin<'a, C> {
    /// As the action `id` of `controller`
    Action {
        /// The owning controller
        controller: &'a C,
        /// The action id being resolved
        id: &'a str,
    },
    /// As a filter in a chain for `controller`
    Filter {
        /// The owning controller
        controller: &'a C,
    },
}

impl<'a, C> Origin<'a, C> {
    /// The owning controller.
    pub fn controller(&self) -> &'a C {
        match *self {
            Origin::Action { controller, .. } | Origin::Filter { controller } => controller,
        }
    }

    /// The action id, when constructing an action.
    pub fn action_id(&self) -> Option<&'a str> {
        match *self {
            Origin::Action { id, .. } => Some(id),
            Origin::Filter { .. } => None,
        }
    }
}

impl<C> Clone for Origin<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Origin<'_, C> {}

/// A constructed instance, tagged by capability.
pub enum Component<C: Controller> {
    /// Can run as an action
    Action(Box<dyn ActionObject<C>>),
    /// Can sit in a filter chain
    Filter(Box<dyn Filter<C>>),
    /// Neither
    Other(Box<dyn Any>),
}

impl<C: Controller> Component<C> {
    /// Short capability name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Action(_) => "action",
            Component::Filter(_) => "filter",
            Component::Other(_) => "other",
        }
    }

    /// Asserts the action capability.
    pub fn into_action(self, class: &str) -> Result<Box<dyn ActionObject<C>>, ConfigError> {
        match self {
            Component::Action(action) => Ok(action),
            _ => Err(ConfigError::NotAnAction {
                class: class.to_string(),
            }),
        }
    }

    /// Asserts the filter capability.
    pub fn into_filter(self, class: &str) -> Result<Box<dyn Filter<C>>, ConfigError> {
        match self {
            Component::Filter(filter) => Ok(filter),
            _ => Err(ConfigError::NotAFilter {
                class: class.to_string(),
            }),
        }
    }
}

impl<C: Controller> fmt::Debug for Component<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component::{}", self.kind())
    }
}

/// Builds instances from class specs.
pub trait ObjectFactory<C: Controller> {
    /// Constructs the object described by `spec`, with its properties applied.
    fn construct(
        &self,
        spec: &ObjectSpec,
        origin: Origin<'_, C>,
    ) -> Result<Component<C>, ConfigError>;
}

type Constructor<C> = Rc<dyn Fn(&ObjectSpec, Origin<'_, C>) -> Result<Component<C>, ConfigError>>;

/// A class-name keyed table of constructors.
pub struct Registry<C: Controller> {
    constructors: HashMap<String, Constructor<C>>,
}

impl<C: Controller> Registry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers a raw constructor for `class`.
    pub fn register<F>(mut self, class: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ObjectSpec, Origin<'_, C>) -> Result<Component<C>, ConfigError> + 'static,
    {
        self.constructors.insert(class.into(), Rc::new(f));
        self
    }

    /// Registers a filter type whose properties deserialize into it.
    ///
    /// Construction fails on a property the type does not declare.
    pub fn filter<F>(self, class: impl Into<String>) -> Self
    where
        F: Filter<C> + DeserializeOwned + 'static,
    {
        self.register(class, |spec, _origin| {
            let filter: F = spec.deserialize_into()?;
            Ok(Component::Filter(Box::new(filter)))
        })
    }

    /// Registers an action type whose properties deserialize into it.
    pub fn action<A>(self, class: impl Into<String>) -> Self
    where
        A: ActionObject<C> + DeserializeOwned + 'static,
    {
        self.register(class, |spec, _origin| {
            let action: A = spec.deserialize_into()?;
            Ok(Component::Action(Box::new(action)))
        })
    }

    /// Registers a type that is neither an action nor a filter.
    pub fn other<T>(self, class: impl Into<String>) -> Self
    where
        T: DeserializeOwned + 'static,
    {
        self.register(class, |spec, _origin| {
            let value: T = spec.deserialize_into()?;
            Ok(Component::Other(Box::new(value)))
        })
    }

    /// Returns true if `class` is registered.
    pub fn contains(&self, class: &str) -> bool {
        self.constructors.contains_key(class)
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl<C: Controller> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Controller> ObjectFactory<C> for Registry<C> {
    fn construct(
        &self,
        spec: &ObjectSpec,
        origin: Origin<'_, C>,
    ) -> Result<Component<C>, ConfigError> {
        let constructor = self
            .constructors
            .get(spec.class())
            .ok_or_else(|| ConfigError::UnknownClass {
                class: spec.class().to_string(),
            })?;
        constructor(spec, origin)
    }
}

impl<C: Controller> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.constructors.keys().collect();
        classes.sort();
        f.debug_struct("Registry").field("classes", &classes).finish()
    }
}
