//! Declarative controller configuration.
//!
//! Controllers can keep their filter declarations and action map in a data
//! file instead of code. Both JSON and YAML are accepted:
//!
//! ```yaml
//! filters:
//!   - accessControl - login
//!   - class: OutputCache + list view
//!     duration: 300
//! actions:
//!   captcha: CaptchaAction
//!   upload:
//!     class: UploadAction
//!     max_size: 1048576
//! ```
//!
//! A controller then returns `config.filters.clone()` from
//! [`Controller::filters`](crate::Controller::filters) and
//! `config.actions.clone()` from [`Controller::actions`](crate::Controller::actions).

use serde::Deserialize;
use serde_json::Value;

use crate::declaration::{ActionMap, FilterDecl, FilterSpec};
use crate::error::ConfigError;

/// Filter declarations and object actions for one controller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ControllerConfig {
    /// Filter declarations, in execution order
    #[serde(default)]
    pub filters: Vec<FilterDecl>,
    /// Object actions keyed by action id
    #[serde(default)]
    pub actions: ActionMap,
}

impl ControllerConfig {
    /// Parses a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Converts an already-parsed value.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every filter declaration parses.
    ///
    /// Catches a structured filter without `class` at load time rather than
    /// on the first dispatch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for decl in &self.filters {
            FilterSpec::parse(decl)?;
        }
        Ok(())
    }
}
