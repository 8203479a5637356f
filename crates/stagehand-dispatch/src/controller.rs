//! The controller contract.
//!
//! A controller groups related actions. It supplies:
//!
//! - a static [`Methods`] table: its inline actions (with their parameter
//!   descriptors) and its inline filter methods;
//! - its filter declarations ([`Controller::filters`]);
//! - its object action map ([`Controller::actions`]);
//! - optional before/after hooks.
//!
//! # Example
//!
//! ```rust
//! use std::fmt::Write;
//! use stagehand_dispatch::{Controller, FilterDecl, Methods, Param};
//!
//! struct PostController {
//!     logged_in: bool,
//! }
//!
//! impl Controller for PostController {
//!     fn id(&self) -> &str {
//!         "post"
//!     }
//!
//!     fn methods() -> Methods<Self> {
//!         Methods::<Self>::new()
//!             .action("view", &[Param::required("id")], |_ctrl, out, args| {
//!                 let id: u64 = args.get(0)?;
//!                 write!(out, "post #{}", id)?;
//!                 Ok(())
//!             })
//!             .filter("accessControl", |chain, params| {
//!                 if chain.controller().logged_in {
//!                     chain.run(params)?;
//!                 }
//!                 Ok(())
//!             })
//!     }
//!
//!     fn filters(&self) -> Vec<FilterDecl> {
//!         vec!["accessControl - login".into()]
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::action::Action;
use crate::chain::FilterChain;
use crate::declaration::{ActionMap, FilterDecl};
use crate::error::DispatchResult;
use crate::output::OutputBuffer;
use crate::params::{Args, Param, Params};

/// Handler for an inline action.
///
/// Receives the controller, the output capture and the bound arguments.
pub type ActionFn<C> = Rc<dyn Fn(&mut C, &mut OutputBuffer, Args) -> anyhow::Result<()>>;

/// Handler for an inline filter.
///
/// Must call `chain.run(params)` for execution to continue.
pub type FilterFn<C> = Rc<dyn Fn(&mut FilterChain<'_, C>, &Params) -> DispatchResult>;

/// A named group of actions.
pub trait Controller: Sized + 'static {
    /// The controller id, used in logs and error messages.
    fn id(&self) -> &str;

    /// The inline action and filter methods.
    ///
    /// Called once when a [`Dispatcher`](crate::Dispatcher) is created.
    fn methods() -> Methods<Self>;

    /// Filter declarations, in execution order.
    fn filters(&self) -> Vec<FilterDecl> {
        Vec::new()
    }

    /// Object actions keyed by action id.
    fn actions(&self) -> ActionMap {
        ActionMap::new()
    }

    /// The action reported when an empty action id is requested.
    fn default_action(&self) -> &str {
        "index"
    }

    /// Runs before any filter or the action. Returning false aborts the dispatch.
    fn before_action(&mut self, _action: &Action<Self>) -> bool {
        true
    }

    /// Runs after the chain with the captured output.
    fn after_action(&mut self, _action: &Action<Self>, _output: &mut OutputBuffer) {}
}

/// An inline action: its parameter descriptors plus the handler.
pub struct InlineMethod<C> {
    params: Vec<Param>,
    handler: ActionFn<C>,
}

impl<C> InlineMethod<C> {
    /// The formal parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// The handler.
    pub fn handler(&self) -> &ActionFn<C> {
        &self.handler
    }
}

impl<C> Clone for InlineMethod<C> {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<C> fmt::Debug for InlineMethod<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineMethod")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A controller's inline action and filter methods.
///
/// Names are matched case-insensitively.
pub struct Methods<C: Controller> {
    actions: HashMap<String, InlineMethod<C>>,
    filters: HashMap<String, FilterFn<C>>,
}

impl<C: Controller> Methods<C> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            filters: HashMap::new(),
        }
    }

    /// Registers an inline action.
    ///
    /// An action with no parameters is invoked directly, skipping binding.
    pub fn action<F>(mut self, name: &str, params: &[Param], f: F) -> Self
    where
        F: Fn(&mut C, &mut OutputBuffer, Args) -> anyhow::Result<()> + 'static,
    {
        self.actions.insert(
            name.to_lowercase(),
            InlineMethod {
                params: params.to_vec(),
                handler: Rc::new(f),
            },
        );
        self
    }

    /// Registers an inline filter method.
    pub fn filter<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut FilterChain<'_, C>, &Params) -> DispatchResult + 'static,
    {
        self.filters.insert(name.to_lowercase(), Rc::new(f));
        self
    }

    /// Looks up an inline action.
    pub fn find_action(&self, name: &str) -> Option<&InlineMethod<C>> {
        self.actions.get(&name.to_lowercase())
    }

    /// Looks up an inline filter.
    pub fn find_filter(&self, name: &str) -> Option<&FilterFn<C>> {
        self.filters.get(&name.to_lowercase())
    }

    /// Returns true if an inline action named `name` exists.
    pub fn has_action(&self, name: &str) -> bool {
        self.find_action(name).is_some()
    }

    /// Returns true if an inline filter named `name` exists.
    pub fn has_filter(&self, name: &str) -> bool {
        self.find_filter(name).is_some()
    }
}

impl<C: Controller> Default for Methods<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Controller> fmt::Debug for Methods<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.actions.keys().collect();
        actions.sort();
        let mut filters: Vec<_> = self.filters.keys().collect();
        filters.sort();
        f.debug_struct("Methods")
            .field("actions", &actions)
            .field("filters", &filters)
            .finish()
    }
}
