//! Actions and action resolution.
//!
//! An [`Action`] is the unit a request is dispatched to. It is either
//! inline (a handler registered in the controller's [`Methods`] table) or an
//! object built by the [`ObjectFactory`] from the controller's
//! [`ActionMap`](crate::ActionMap). Both kinds bind request parameters the
//! same way before running.
//!
//! [`resolve`] maps an action id to an action:
//!
//! 1. an inline method with that name, unless the id is empty or reserved;
//! 2. otherwise an entry in the action map;
//! 3. otherwise nothing.
//!
//! An object action learns its id through [`ActionObject::init`].

use std::fmt;

use tracing::debug;

use crate::controller::{Controller, InlineMethod, Methods};
use crate::error::{ConfigError, DispatchError, DispatchResult};
use crate::factory::{ObjectFactory, Origin};
use crate::output::OutputBuffer;
use crate::params::{bind, Args, Param, Params};

/// Action id that never resolves to an inline method.
pub const RESERVED_ACTION_ID: &str = "s";

/// Returns true if `id` cannot name an inline action.
pub fn is_reserved(id: &str) -> bool {
    id.is_empty() || id.eq_ignore_ascii_case(RESERVED_ACTION_ID)
}

/// An action implemented as an object.
///
/// Objects are built fresh for each dispatch, so `run` may keep state in
/// `self`.
pub trait ActionObject<C: Controller> {
    /// The formal parameters of [`run`](Self::run). None by default.
    fn params(&self) -> Vec<Param> {
        Vec::new()
    }

    /// Called once after construction with the action id it was resolved
    /// for. An error fails the dispatch.
    fn init(&mut self, id: &str) -> Result<(), ConfigError> {
        let _ = id;
        Ok(())
    }

    /// Runs the action with bound arguments.
    fn run(
        &mut self,
        controller: &mut C,
        output: &mut OutputBuffer,
        args: Args,
    ) -> anyhow::Result<()>;
}

enum ActionKind<C: Controller> {
    Inline(InlineMethod<C>),
    Object {
        class: String,
        object: Box<dyn ActionObject<C>>,
    },
}

/// A resolved action, ready to run.
pub struct Action<C: Controller> {
    id: String,
    controller_id: String,
    kind: ActionKind<C>,
}

impl<C: Controller> Action<C> {
    /// Wraps an inline method.
    pub fn inline(
        id: impl Into<String>,
        controller_id: impl Into<String>,
        method: InlineMethod<C>,
    ) -> Self {
        Self {
            id: id.into(),
            controller_id: controller_id.into(),
            kind: ActionKind::Inline(method),
        }
    }

    /// Wraps a constructed action object.
    pub fn object(
        id: impl Into<String>,
        controller_id: impl Into<String>,
        class: impl Into<String>,
        object: Box<dyn ActionObject<C>>,
    ) -> Self {
        Self {
            id: id.into(),
            controller_id: controller_id.into(),
            kind: ActionKind::Object {
                class: class.into(),
                object,
            },
        }
    }

    /// The action id as requested.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the owning controller.
    pub fn controller_id(&self) -> &str {
        &self.controller_id
    }

    /// Returns true for inline actions.
    pub fn is_inline(&self) -> bool {
        matches!(self.kind, ActionKind::Inline(_))
    }

    /// The class of an object action.
    pub fn class(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Inline(_) => None,
            ActionKind::Object { class, .. } => Some(class),
        }
    }

    /// The formal parameters.
    pub fn params(&self) -> Vec<Param> {
        match &self.kind {
            ActionKind::Inline(method) => method.params().to_vec(),
            ActionKind::Object { object, .. } => object.params(),
        }
    }

    /// Binds `params` and runs the action.
    ///
    /// An action without formal parameters is invoked directly. A rejected
    /// binding fails with [`DispatchError::InvalidParams`] without running
    /// anything.
    pub fn run_with_params(
        &mut self,
        controller: &mut C,
        output: &mut OutputBuffer,
        params: &Params,
    ) -> DispatchResult {
        let formal = self.params();
        let args = if formal.is_empty() {
            Args::new()
        } else {
            bind(&formal, params).map_err(|reason| {
                debug!(action = %self.id, param = reason.param(), "parameter binding rejected");
                DispatchError::InvalidParams {
                    action: self.id.clone(),
                    reason,
                }
            })?
        };

        debug!(action = %self.id, args = args.len(), "running action");
        let result = match &mut self.kind {
            ActionKind::Inline(method) => (method.handler())(controller, output, args),
            ActionKind::Object { object, .. } => object.run(controller, output, args),
        };
        result.map_err(DispatchError::Handler)
    }
}

impl<C: Controller> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("controller", &self.controller_id)
            .field("class", &self.class())
            .finish()
    }
}

/// Resolves `id` against a controller.
///
/// Returns `Ok(None)` when no action matches. Constructing an object action
/// can fail, for example when the class does not have the action capability.
pub fn resolve<C: Controller>(
    controller: &C,
    methods: &Methods<C>,
    factory: &dyn ObjectFactory<C>,
    id: &str,
) -> Result<Option<Action<C>>, ConfigError> {
    if !is_reserved(id) {
        if let Some(method) = methods.find_action(id) {
            debug!(controller = controller.id(), action = id, "resolved inline action");
            return Ok(Some(Action::inline(id, controller.id(), method.clone())));
        }
    }

    let actions = controller.actions();
    let Some(spec) = actions.get(id) else {
        return Ok(None);
    };

    let component = factory.construct(spec, Origin::Action { controller, id })?;
    let mut object = component.into_action(spec.class())?;
    object.init(id)?;
    debug!(
        controller = controller.id(),
        action = id,
        class = spec.class(),
        "resolved object action"
    );
    Ok(Some(Action::object(id, controller.id(), spec.class(), object)))
}
