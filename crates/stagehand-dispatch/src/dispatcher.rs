//! The dispatch loop.
//!
//! [`Dispatcher::run`] composes everything else for one request:
//!
//! ```text
//! resolve action            ── none → DispatchError::MissingAction (404)
//!   → before-action hooks   ── false → Dispatched::Aborted
//!   → filter chain (or the action directly when no filters are declared)
//!       → bind params       ── rejected → DispatchError::InvalidParams (400)
//!       → action
//!   → after-action hooks
//!   → Dispatched::Completed { output }
//! ```
//!
//! The dispatcher owns the controller's [`Methods`] table and a dispatch
//! context holding exactly two collaborators: the [`ObjectFactory`] and the
//! [`Hooks`]. It keeps no per-request state; every chain, action and output
//! buffer lives only for the duration of one `run` call.

use std::fmt;

use tracing::debug;

use crate::action::{resolve, Action};
use crate::chain::FilterChain;
use crate::controller::{Controller, Methods};
use crate::error::{ConfigError, DispatchError, DispatchResult};
use crate::factory::{ObjectFactory, Registry};
use crate::hooks::Hooks;
use crate::output::OutputBuffer;
use crate::params::Params;

/// Outcome of a dispatch that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The chain ran; contains the captured output after the after-action hooks
    Completed {
        /// The response body
        output: String,
    },
    /// A before-action hook returned false; nothing ran
    Aborted,
}

impl Dispatched {
    /// Returns true if the chain ran.
    pub fn is_completed(&self) -> bool {
        matches!(self, Dispatched::Completed { .. })
    }

    /// Returns true if a before-action hook aborted the dispatch.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Dispatched::Aborted)
    }

    /// Returns the output if completed, or None otherwise.
    pub fn output(&self) -> Option<&str> {
        match self {
            Dispatched::Completed { output } => Some(output),
            Dispatched::Aborted => None,
        }
    }

    /// Consumes the outcome, returning the output if completed.
    pub fn into_output(self) -> Option<String> {
        match self {
            Dispatched::Completed { output } => Some(output),
            Dispatched::Aborted => None,
        }
    }
}

/// The collaborators a dispatcher reaches outside the controller.
pub struct DispatchContext<C: Controller> {
    factory: Box<dyn ObjectFactory<C>>,
    hooks: Hooks<C>,
}

impl<C: Controller> DispatchContext<C> {
    /// The object factory.
    pub fn factory(&self) -> &dyn ObjectFactory<C> {
        self.factory.as_ref()
    }

    /// The dispatcher-level hooks.
    pub fn hooks(&self) -> &Hooks<C> {
        &self.hooks
    }
}

impl<C: Controller> fmt::Debug for DispatchContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Dispatches action ids to a controller type.
///
/// # Example
///
/// ```rust
/// use stagehand_dispatch::{Controller, Dispatcher, Methods, Params};
///
/// struct SiteController;
///
/// impl Controller for SiteController {
///     fn id(&self) -> &str {
///         "site"
///     }
///
///     fn methods() -> Methods<Self> {
///         Methods::<Self>::new().action("index", &[], |_, out, _| {
///             out.push_str("welcome");
///             Ok(())
///         })
///     }
/// }
///
/// let dispatcher = Dispatcher::<SiteController>::new();
/// let result = dispatcher
///     .run(&mut SiteController, "index", &Params::new())
///     .unwrap();
/// assert_eq!(result.output(), Some("welcome"));
/// ```
pub struct Dispatcher<C: Controller> {
    methods: Methods<C>,
    context: DispatchContext<C>,
}

impl<C: Controller> Dispatcher<C> {
    /// Creates a dispatcher with an empty [`Registry`] and no extra hooks.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder.
    pub fn builder() -> DispatcherBuilder<C> {
        DispatcherBuilder::new()
    }

    /// The controller's inline methods.
    pub fn methods(&self) -> &Methods<C> {
        &self.methods
    }

    /// The dispatch context.
    pub fn context(&self) -> &DispatchContext<C> {
        &self.context
    }

    /// Resolves `id` against `controller` without running anything.
    pub fn create_action(
        &self,
        controller: &C,
        id: &str,
    ) -> Result<Option<Action<C>>, ConfigError> {
        resolve(controller, &self.methods, self.context.factory(), id)
    }

    /// Dispatches `id` on `controller` with request `params`.
    ///
    /// Missing actions and rejected parameter bindings are request errors
    /// (see [`DispatchError::status`]); configuration errors propagate as
    /// [`DispatchError::Config`].
    pub fn run(&self, controller: &mut C, id: &str, params: &Params) -> DispatchResult<Dispatched> {
        let Some(mut action) = self.create_action(controller, id)? else {
            return Err(self.missing_action(controller, id));
        };
        debug!(controller = controller.id(), action = action.id(), "dispatching");

        if !self.before_action(controller, &action) {
            debug!(
                controller = controller.id(),
                action = action.id(),
                "dispatch aborted by before-action hook"
            );
            return Ok(Dispatched::Aborted);
        }

        let mut output = OutputBuffer::new();
        self.run_action_with_filters(controller, &mut action, &mut output, params)?;

        controller.after_action(&action, &mut output);
        self.context.hooks.run_after_action(controller, &action, &mut output);

        Ok(Dispatched::Completed {
            output: output.into_string(),
        })
    }

    /// Runs `action` through the controller's filters for it.
    ///
    /// Without applicable declarations the action runs directly.
    pub fn run_action_with_filters(
        &self,
        controller: &mut C,
        action: &mut Action<C>,
        output: &mut OutputBuffer,
        params: &Params,
    ) -> DispatchResult {
        let decls = controller.filters();
        if decls.is_empty() {
            return action.run_with_params(controller, output, params);
        }

        let mut chain = FilterChain::create(
            controller,
            action,
            output,
            &decls,
            &self.methods,
            self.context.factory(),
        )?;
        chain.run(params)
    }

    fn before_action(&self, controller: &mut C, action: &Action<C>) -> bool {
        controller.before_action(action) && self.context.hooks.run_before_action(controller, action)
    }

    fn missing_action(&self, controller: &C, id: &str) -> DispatchError {
        let id = if id.is_empty() {
            controller.default_action()
        } else {
            id
        };
        debug!(controller = controller.id(), action = id, "action not found");
        DispatchError::MissingAction { id: id.to_string() }
    }
}

impl<C: Controller> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Controller> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("methods", &self.methods)
            .field("context", &self.context)
            .finish()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder<C: Controller> {
    factory: Option<Box<dyn ObjectFactory<C>>>,
    hooks: Hooks<C>,
}

impl<C: Controller> DispatcherBuilder<C> {
    /// Creates a builder with no factory and no hooks.
    pub fn new() -> Self {
        Self {
            factory: None,
            hooks: Hooks::new(),
        }
    }

    /// Sets the object factory.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: ObjectFactory<C> + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Adds a before-action hook, run after the controller's own.
    pub fn before_action<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C, &Action<C>) -> bool + 'static,
    {
        self.hooks = self.hooks.before_action(f);
        self
    }

    /// Adds an after-action hook, run after the controller's own.
    pub fn after_action<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C, &Action<C>, &mut OutputBuffer) + 'static,
    {
        self.hooks = self.hooks.after_action(f);
        self
    }

    /// Replaces the hooks.
    pub fn hooks(mut self, hooks: Hooks<C>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Builds the dispatcher, collecting the controller's inline methods.
    pub fn build(self) -> Dispatcher<C> {
        let factory: Box<dyn ObjectFactory<C>> = match self.factory {
            Some(factory) => factory,
            None => Box::new(Registry::<C>::new()),
        };
        Dispatcher {
            methods: C::methods(),
            context: DispatchContext {
                factory,
                hooks: self.hooks,
            },
        }
    }
}

impl<C: Controller> Default for DispatcherBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
