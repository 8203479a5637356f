//! Parameter binding.
//!
//! Handlers declare their formal parameters up front as a list of [`Param`]
//! descriptors. At dispatch time [`bind`] matches the request's named values
//! against those descriptors and produces positional [`Args`], or rejects the
//! whole binding with a [`BindError`].
//!
//! # Rules
//!
//! For each formal parameter, in declaration order:
//!
//! 1. If a value with that name is present (and not `null`):
//!    - a [`ParamKind::List`] formal takes arrays and objects as-is and wraps
//!      a scalar into a one-element array;
//!    - a [`ParamKind::Scalar`] formal takes scalars only; a composite value
//!      rejects the binding.
//! 2. Otherwise the declared default is used.
//! 3. Otherwise the binding is rejected.
//!
//! ```rust
//! use serde_json::json;
//! use stagehand_dispatch::{bind, Param, Params};
//!
//! let formal = [Param::required("a"), Param::optional("b", json!(5))];
//! let mut values = Params::new();
//! values.insert("a".into(), json!(3));
//!
//! let args = bind(&formal, &values).unwrap();
//! assert_eq!(args.values(), &[json!(3), json!(5)]);
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BindError;

/// Named request parameters.
pub type Params = serde_json::Map<String, Value>;

/// The shape a formal parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamKind {
    /// A single non-composite value
    #[default]
    Scalar,
    /// An array (or map); scalars are wrapped
    List,
}

/// Descriptor for one formal parameter of a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    kind: ParamKind,
    default: Option<Value>,
}

impl Param {
    /// A scalar parameter with no default.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Scalar,
            default: None,
        }
    }

    /// A scalar parameter with a default value.
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Scalar,
            default: Some(default.into()),
        }
    }

    /// A list parameter with no default.
    pub fn list(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::List,
            default: None,
        }
    }

    /// A list parameter with a default value.
    pub fn list_or(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::List,
            default: Some(default.into()),
        }
    }

    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The accepted shape.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// The default value, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Returns true if the value is an array or an object.
pub fn is_composite(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

/// Binds named values to formal parameters.
///
/// Returns the positional arguments, or the reason the binding was rejected.
/// Rejection is an ordinary outcome: the dispatcher maps it to a 400 response.
pub fn bind(formal: &[Param], values: &Params) -> Result<Args, BindError> {
    let mut args = Args::with_capacity(formal.len());

    for param in formal {
        let provided = values.get(&param.name).filter(|v| !v.is_null());

        let value = match (provided, param.kind) {
            (Some(v), ParamKind::List) if is_composite(v) => v.clone(),
            (Some(v), ParamKind::List) => Value::Array(vec![v.clone()]),
            (Some(v), ParamKind::Scalar) if is_composite(v) => {
                return Err(BindError::NotScalar(param.name.clone()));
            }
            (Some(v), ParamKind::Scalar) => v.clone(),
            (None, _) => match &param.default {
                Some(default) => default.clone(),
                None => return Err(BindError::Missing(param.name.clone())),
            },
        };

        args.push(param.name.clone(), value);
    }

    Ok(args)
}

/// Positional arguments produced by [`bind`].
///
/// Each argument keeps the name of the formal it was bound to, so handlers
/// can read arguments either by position or by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    names: Vec<String>,
    values: Vec<Value>,
}

impl Args {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_capacity(n: usize) -> Self {
        Self {
            names: Vec::with_capacity(n),
            values: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, name: String, value: Value) {
        self.names.push(name);
        self.values.push(value);
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The raw positional values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The raw value at `index`.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// The raw value bound to the formal named `name`.
    pub fn named(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    /// Deserializes the argument at `index`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> anyhow::Result<T> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("no argument at position {}", index))?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("argument {} has the wrong type: {}", index, e))
    }

    /// Deserializes the argument bound to the formal named `name`.
    pub fn get_named<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .named(name)
            .ok_or_else(|| anyhow::anyhow!("no argument named \"{}\"", name))?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("argument \"{}\" has the wrong type: {}", name, e))
    }

    /// Consumes the list, returning the positional values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
