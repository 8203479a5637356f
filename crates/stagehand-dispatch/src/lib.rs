//! Action resolution and filter chain dispatch for controller-based web
//! frameworks.
//!
//! `stagehand-dispatch` is the request-dispatch core that sits between a
//! router and application controllers. Given a controller, an action id and
//! the request parameters it:
//!
//! 1. resolves the id to an inline action or an object action,
//! 2. runs the controller's before-action hooks,
//! 3. builds the filter chain that applies to the action and runs it,
//!    binding the request parameters to the action's formal parameters,
//! 4. runs the after-action hooks over the captured output.
//!
//! It does not route URLs, render templates or speak HTTP. Failures carry
//! an HTTP status class ([`DispatchError::status`]) for the surrounding
//! framework to use.
//!
//! # Features
//!
//! - **Inline and object actions**: controller methods registered in a
//!   [`Methods`] table, or classes listed in an [`ActionMap`] and built by an
//!   [`ObjectFactory`]
//! - **Scoped filters**: `"accessControl - login"`, `{"class": "OutputCache + list", ...}`
//! - **Parameter binding**: typed [`Param`] descriptors instead of reflection
//! - **Hooks**: before/after action, on the controller and on the [`Dispatcher`]
//! - **Configuration**: filter lists and action maps from JSON or YAML
//!
//! # Example
//!
//! ```rust
//! use std::fmt::Write;
//! use serde_json::json;
//! use stagehand_dispatch::{Controller, Dispatcher, FilterDecl, Methods, Param};
//!
//! struct PostController {
//!     guest: bool,
//! }
//!
//! impl Controller for PostController {
//!     fn id(&self) -> &str {
//!         "post"
//!     }
//!
//!     fn methods() -> Methods<Self> {
//!         Methods::<Self>::new()
//!             .action("view", &[Param::required("id")], |_, out, args| {
//!                 let id: u64 = args.get(0)?;
//!                 write!(out, "post #{}", id)?;
//!                 Ok(())
//!             })
//!             .filter("accessControl", |chain, params| {
//!                 if !chain.controller().guest {
//!                     chain.run(params)?;
//!                 }
//!                 Ok(())
//!             })
//!     }
//!
//!     fn filters(&self) -> Vec<FilterDecl> {
//!         vec!["accessControl + view".into()]
//!     }
//! }
//!
//! let dispatcher = Dispatcher::<PostController>::new();
//! let params = json!({"id": 42}).as_object().cloned().unwrap();
//!
//! let result = dispatcher
//!     .run(&mut PostController { guest: false }, "view", &params)
//!     .unwrap();
//! assert_eq!(result.output(), Some("post #42"));
//!
//! let err = dispatcher
//!     .run(&mut PostController { guest: false }, "view", &Default::default())
//!     .unwrap_err();
//! assert_eq!(err.status(), 400);
//! ```
//!
//! # Logging
//!
//! The crate emits `tracing` events (resolution, filter runs, binding
//! rejections) and never installs a subscriber.

// Core modules
mod action;
mod chain;
mod config;
mod controller;
mod declaration;
mod dispatcher;
mod error;
mod factory;
mod filter;
mod hooks;
mod output;
mod params;

// Re-export core types
pub use action::{is_reserved, resolve, Action, ActionObject, RESERVED_ACTION_ID};

pub use chain::FilterChain;

pub use config::ControllerConfig;

pub use controller::{ActionFn, Controller, FilterFn, InlineMethod, Methods};

pub use declaration::{ActionMap, FilterDecl, FilterSpec, FilterTarget, ObjectSpec, Scope};

pub use dispatcher::{DispatchContext, Dispatched, Dispatcher, DispatcherBuilder};

pub use error::{BindError, ConfigError, DispatchError, DispatchResult};

pub use factory::{Component, ObjectFactory, Origin, Registry};

pub use filter::{Filter, FnFilter, InlineFilter};

pub use hooks::{AfterActionFn, BeforeActionFn, Hooks};

pub use output::OutputBuffer;

pub use params::{bind, is_composite, Args, Param, ParamKind, Params};
