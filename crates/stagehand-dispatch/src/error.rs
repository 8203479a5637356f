//! Error types for dispatch.
//!
//! Errors fall into two groups:
//!
//! - **Configuration errors** ([`ConfigError`]): broken wiring such as a filter
//!   declaration without a class, an inline filter with no matching method, or
//!   a mapped action that cannot run. These are development-time defects and
//!   propagate straight out of [`Dispatcher::run`](crate::Dispatcher::run).
//! - **Request errors**: a missing action or parameters that cannot be bound.
//!   These are expected on any request and map to 404 and 400 respectively.
//!
//! A filter that declines to continue the chain is not an error at all.

use thiserror::Error;

/// Errors caused by malformed filter or action configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A structured filter declaration has no `class` entry.
    #[error("the first element in a filter configuration must be the filter class")]
    MissingFilterClass,

    /// A `class` entry is present but is not a string.
    #[error("filter or action class must be a string, got {0}")]
    InvalidClass(serde_json::Value),

    /// A declaration is neither a string nor a map.
    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),

    /// An inline filter names a method the controller does not expose.
    #[error(
        "filter \"{filter}\" is invalid: controller \"{controller}\" has no such filter method"
    )]
    InvalidFilterMethod {
        /// The declared filter name
        filter: String,
        /// The controller id
        controller: String,
    },

    /// A mapped action was constructed but cannot run.
    #[error("action class {class} must implement the run capability")]
    NotAnAction {
        /// The class that was constructed
        class: String,
    },

    /// Something that is not a filter was offered to a filter chain.
    #[error("filter chain can only take filters, {class} is not one")]
    NotAFilter {
        /// The class that was constructed
        class: String,
    },

    /// The object factory does not know the class.
    #[error("unknown class \"{class}\"")]
    UnknownClass {
        /// The class that was requested
        class: String,
    },

    /// Properties could not be applied to a constructed instance.
    #[error("invalid properties for class \"{class}\": {source}")]
    InvalidProperties {
        /// The class being constructed
        class: String,
        /// The deserialization failure
        #[source]
        source: serde_json::Error,
    },

    /// A property does not exist on the constructed class.
    #[error("class \"{class}\" has no property \"{property}\"")]
    UnknownProperty {
        /// The class being constructed
        class: String,
        /// Path of the unrecognized property
        property: String,
    },

    /// A filter's init hook failed.
    #[error("filter \"{filter}\" failed to initialize: {message}")]
    FilterInit {
        /// The filter name
        filter: String,
        /// Why initialization failed
        message: String,
    },

    /// A controller configuration document could not be parsed.
    #[error("failed to parse controller configuration: {0}")]
    Parse(String),
}

/// Why the parameter binder rejected a set of request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// A required parameter has no value and no default.
    #[error("missing required parameter \"{0}\"")]
    Missing(String),

    /// A scalar parameter received a composite value.
    #[error("parameter \"{0}\" expects a scalar value")]
    NotScalar(String),
}

impl BindError {
    /// Returns the name of the offending parameter.
    pub fn param(&self) -> &str {
        match self {
            BindError::Missing(name) | BindError::NotScalar(name) => name,
        }
    }
}

/// Errors surfaced by a dispatch call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Neither an inline handler nor an action map entry matched.
    #[error("unable to find the requested action \"{id}\"")]
    MissingAction {
        /// The requested action id (or the default action when it was empty)
        id: String,
    },

    /// The request parameters could not be bound to the action.
    #[error("invalid parameters for action \"{action}\": {reason}")]
    InvalidParams {
        /// The action id
        action: String,
        /// The binder's rejection reason
        #[source]
        reason: BindError,
    },

    /// Broken filter or action configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An action handler or filter failed.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl DispatchError {
    /// Returns the HTTP status class this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::MissingAction { .. } => 404,
            DispatchError::InvalidParams { .. } => 400,
            DispatchError::Config(_) | DispatchError::Handler(_) => 500,
        }
    }

    /// Returns the message suitable for a response body.
    ///
    /// Binder and resolver internals are never included.
    pub fn public_message(&self) -> String {
        match self {
            DispatchError::MissingAction { id } => format!(
                "The system is unable to find the requested action \"{}\".",
                id
            ),
            DispatchError::InvalidParams { .. } => "Your request is invalid.".to_string(),
            DispatchError::Config(_) | DispatchError::Handler(_) => {
                "Internal server error.".to_string()
            }
        }
    }

    /// Returns true for errors caused by the request rather than the setup.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            DispatchError::MissingAction { .. } | DispatchError::InvalidParams { .. }
        )
    }
}

/// Result alias used by filters and the chain.
pub type DispatchResult<T = ()> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let missing = DispatchError::MissingAction { id: "foo".into() };
        assert_eq!(missing.status(), 404);
        assert!(missing.is_request_error());

        let invalid = DispatchError::InvalidParams {
            action: "view".into(),
            reason: BindError::Missing("id".into()),
        };
        assert_eq!(invalid.status(), 400);
        assert!(invalid.is_request_error());

        let config: DispatchError = ConfigError::MissingFilterClass.into();
        assert_eq!(config.status(), 500);
        assert!(!config.is_request_error());
    }

    #[test]
    fn test_public_message_hides_binder_detail() {
        let invalid = DispatchError::InvalidParams {
            action: "view".into(),
            reason: BindError::NotScalar("secret_field".into()),
        };
        assert_eq!(invalid.public_message(), "Your request is invalid.");
        assert!(!invalid.public_message().contains("secret_field"));
    }

    #[test]
    fn test_missing_action_message() {
        let err = DispatchError::MissingAction { id: "list".into() };
        assert_eq!(
            err.public_message(),
            "The system is unable to find the requested action \"list\"."
        );
    }

    #[test]
    fn test_bind_error_param() {
        assert_eq!(BindError::Missing("a".into()).param(), "a");
        assert_eq!(BindError::NotScalar("b".into()).param(), "b");
    }
}
