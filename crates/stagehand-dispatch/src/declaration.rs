//! Filter and action declarations.
//!
//! Controllers declare filters as a list of [`FilterDecl`]s and object actions
//! as an [`ActionMap`]. This module parses those declarations into typed
//! specs before anything is instantiated.
//!
//! # Filter grammar
//!
//! ```text
//! NAME                      applies to every action
//! NAME + ACTION ACTION ...  applies only to the listed actions
//! NAME - ACTION ACTION ...  applies to every action except the listed ones
//! ```
//!
//! A string declaration names an inline filter. A structured declaration is
//! a map whose `class` entry uses the same grammar; every other entry is a
//! property applied to the constructed filter:
//!
//! ```rust
//! use serde_json::json;
//! use stagehand_dispatch::{FilterDecl, FilterSpec, FilterTarget};
//!
//! let decl = FilterDecl::from_value(json!({"class": "OutputCache + list", "duration": 300}))
//!     .unwrap();
//! let spec = FilterSpec::parse(&decl).unwrap();
//!
//! assert!(spec.applies_to("list"));
//! assert!(!spec.applies_to("view"));
//! match spec.target() {
//!     FilterTarget::Object(object) => assert_eq!(object.class(), "OutputCache"),
//!     FilterTarget::Inline(_) => unreachable!(),
//! }
//! ```
//!
//! Action names in a scope list are separated by whitespace (commas are
//! accepted too) and match case-insensitively as whole words.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::ConfigError;

/// Which actions a filter declaration applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// Every action
    #[default]
    Always,
    /// Only the listed actions (lowercased)
    Include(BTreeSet<String>),
    /// Every action except the listed ones (lowercased)
    Exclude(BTreeSet<String>),
}

impl Scope {
    /// Returns true if a filter with this scope runs for `action_id`.
    pub fn applies_to(&self, action_id: &str) -> bool {
        match self {
            Scope::Always => true,
            Scope::Include(names) => names.contains(&action_id.to_lowercase()),
            Scope::Exclude(names) => !names.contains(&action_id.to_lowercase()),
        }
    }
}

/// Splits `name [+|- actions]` into the bare name and its scope.
///
/// The first `+` wins; a `-` is only an operator when there is no `+`.
pub(crate) fn split_scope(token: &str) -> (&str, Scope) {
    let Some(pos) = token.find('+').or_else(|| token.find('-')) else {
        return (token.trim(), Scope::Always);
    };

    let names: BTreeSet<String> = token[pos + 1..]
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect();

    let scope = if token.as_bytes()[pos] == b'+' {
        Scope::Include(names)
    } else {
        Scope::Exclude(names)
    };

    (token[..pos].trim(), scope)
}

/// A class name plus the properties to apply once it is constructed.
///
/// Deserializes from either a bare class string or a map with a `class`
/// entry; every other map entry becomes a property.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct ObjectSpec {
    class: String,
    properties: Map<String, Value>,
}

impl ObjectSpec {
    /// Creates a spec with no properties.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: Map::new(),
        }
    }

    /// Adds a property.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Parses a bare class string or a `{"class": ..., ...}` map.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::String(class) => Ok(Self::new(class)),
            Value::Object(mut map) => {
                let class = take_class(&mut map)?;
                Ok(Self {
                    class,
                    properties: map,
                })
            }
            other => Err(ConfigError::InvalidDeclaration(format!(
                "expected a class name or a map with a class entry, got {}",
                other
            ))),
        }
    }

    /// The class token.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Properties to apply after construction.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Builds an instance of `T` by deserializing the properties into it.
    ///
    /// A property that `T` does not consume is rejected with
    /// [`ConfigError::UnknownProperty`].
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let mut unknown = Vec::new();
        let value = Value::Object(self.properties.clone());
        let instance: T = serde_ignored::deserialize(value, |path| unknown.push(path.to_string()))
            .map_err(|source| ConfigError::InvalidProperties {
                class: self.class.clone(),
                source,
            })?;

        match unknown.into_iter().next() {
            Some(property) => Err(ConfigError::UnknownProperty {
                class: self.class.clone(),
                property,
            }),
            None => Ok(instance),
        }
    }
}

impl TryFrom<Value> for ObjectSpec {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<&str> for ObjectSpec {
    fn from(class: &str) -> Self {
        Self::new(class)
    }
}

impl From<String> for ObjectSpec {
    fn from(class: String) -> Self {
        Self::new(class)
    }
}

fn take_class(map: &mut Map<String, Value>) -> Result<String, ConfigError> {
    match map.remove("class") {
        None => Err(ConfigError::MissingFilterClass),
        Some(Value::String(class)) => Ok(class),
        Some(other) => Err(ConfigError::InvalidClass(other)),
    }
}

/// One entry of a controller's filter list, before parsing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterDecl {
    /// `"name [+|- actions]"`: an inline filter
    Inline(String),
    /// `{"class": "Class [+|- actions]", "prop": value, ...}`: an object filter
    Object(Map<String, Value>),
}

impl FilterDecl {
    /// Starts a structured declaration for `class` (which may carry a scope).
    pub fn class(class: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("class".into(), Value::String(class.into()));
        FilterDecl::Object(map)
    }

    /// Adds a property to a structured declaration.
    ///
    /// Inline declarations carry no properties; they are returned unchanged.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let FilterDecl::Object(map) = &mut self {
            map.insert(name.into(), value.into());
        }
        self
    }

    /// Converts a JSON value (string or map) into a declaration.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::String(s) => Ok(FilterDecl::Inline(s)),
            Value::Object(map) => Ok(FilterDecl::Object(map)),
            other => Err(ConfigError::InvalidDeclaration(format!(
                "a filter must be a string or a map, got {}",
                other
            ))),
        }
    }
}

impl From<&str> for FilterDecl {
    fn from(s: &str) -> Self {
        FilterDecl::Inline(s.to_string())
    }
}

impl From<String> for FilterDecl {
    fn from(s: String) -> Self {
        FilterDecl::Inline(s)
    }
}

/// What a parsed filter declaration instantiates.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterTarget {
    /// A controller filter method, by name
    Inline(String),
    /// An object built by the factory
    Object(ObjectSpec),
}

/// A parsed filter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    target: FilterTarget,
    scope: Scope,
}

impl FilterSpec {
    /// Parses a declaration without deciding whether it applies.
    ///
    /// A structured declaration without `class` is an error even when its
    /// scope would exclude the current action.
    pub fn parse(decl: &FilterDecl) -> Result<Self, ConfigError> {
        match decl {
            FilterDecl::Inline(token) => {
                let (name, scope) = split_scope(token);
                Ok(Self {
                    target: FilterTarget::Inline(name.to_string()),
                    scope,
                })
            }
            FilterDecl::Object(map) => {
                let mut properties = map.clone();
                let class = take_class(&mut properties)?;
                let (name, scope) = split_scope(&class);
                Ok(Self {
                    target: FilterTarget::Object(ObjectSpec {
                        class: name.to_string(),
                        properties,
                    }),
                    scope,
                })
            }
        }
    }

    /// Parses a declaration for one dispatch.
    ///
    /// Returns `None` when the scope excludes `action_id`.
    pub fn parse_for(decl: &FilterDecl, action_id: &str) -> Result<Option<Self>, ConfigError> {
        let spec = Self::parse(decl)?;
        if spec.applies_to(action_id) {
            Ok(Some(spec))
        } else {
            trace!(filter = spec.name(), action = action_id, "filter skipped by scope");
            Ok(None)
        }
    }

    /// The inline method name or the object class.
    pub fn name(&self) -> &str {
        match &self.target {
            FilterTarget::Inline(name) => name,
            FilterTarget::Object(spec) => spec.class(),
        }
    }

    /// What to instantiate.
    pub fn target(&self) -> &FilterTarget {
        &self.target
    }

    /// Which actions this filter applies to.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns true if the filter runs for `action_id`.
    pub fn applies_to(&self, action_id: &str) -> bool {
        self.scope.applies_to(action_id)
    }
}

/// A controller's table of object actions, keyed by action id.
///
/// Deserializes from a map whose values are class strings or structured
/// specs. Keys match exactly.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ActionMap {
    entries: BTreeMap<String, ObjectSpec>,
}

impl ActionMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    pub fn action(mut self, id: impl Into<String>, spec: impl Into<ObjectSpec>) -> Self {
        self.entries.insert(id.into(), spec.into());
        self
    }

    /// Inserts an entry, returning the previous one.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        spec: impl Into<ObjectSpec>,
    ) -> Option<ObjectSpec> {
        self.entries.insert(id.into(), spec.into())
    }

    /// Looks up the spec for `id`.
    pub fn get(&self, id: &str) -> Option<&ObjectSpec> {
        self.entries.get(id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(id, spec)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObjectSpec)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
