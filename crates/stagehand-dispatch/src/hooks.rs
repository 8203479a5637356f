//! Hook system for before/after action execution.
//!
//! Hooks let an application run code around every action a dispatcher runs,
//! without touching controllers. They sit outside the filter chain:
//!
//! ```text
//! resolved action
//!   → BEFORE-ACTION HOOKS ← (controller's own, then the dispatcher's)
//!   → filter chain
//!       → action
//!   → AFTER-ACTION HOOKS  ← (output post-processing)
//! ```
//!
//! # Hook Points
//!
//! - Before-action: receives the controller and the action. Returning false
//!   aborts the dispatch; no filter, action or after hook runs.
//!
//! - After-action: receives the controller, the action and the captured
//!   output, which it may modify. Runs whenever the chain returned normally,
//!   including when a filter stopped it.

use std::fmt;
use std::rc::Rc;

use crate::action::Action;
use crate::controller::Controller;
use crate::output::OutputBuffer;

/// Type alias for before-action hook functions.
pub type BeforeActionFn<C> = Rc<dyn Fn(&mut C, &Action<C>) -> bool>;

/// Type alias for after-action hook functions.
pub type AfterActionFn<C> = Rc<dyn Fn(&mut C, &Action<C>, &mut OutputBuffer)>;

/// Hooks run by a dispatcher around every action, in registration order.
pub struct Hooks<C: Controller> {
    before_action: Vec<BeforeActionFn<C>>,
    after_action: Vec<AfterActionFn<C>>,
}

impl<C: Controller> Hooks<C> {
    /// Creates a new empty hooks configuration.
    pub fn new() -> Self {
        Self {
            before_action: Vec::new(),
            after_action: Vec::new(),
        }
    }

    /// Returns true if no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.before_action.is_empty() && self.after_action.is_empty()
    }

    /// Adds a before-action hook.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let hooks = Hooks::<AdminController>::new()
    ///     .before_action(|ctrl, _action| ctrl.user.is_admin());
    /// ```
    pub fn before_action<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C, &Action<C>) -> bool + 'static,
    {
        self.before_action.push(Rc::new(f));
        self
    }

    /// Adds an after-action hook.
    pub fn after_action<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut C, &Action<C>, &mut OutputBuffer) + 'static,
    {
        self.after_action.push(Rc::new(f));
        self
    }

    /// Runs before-action hooks until one returns false.
    pub fn run_before_action(&self, controller: &mut C, action: &Action<C>) -> bool {
        self.before_action.iter().all(|hook| hook(controller, action))
    }

    /// Runs all after-action hooks.
    pub fn run_after_action(
        &self,
        controller: &mut C,
        action: &Action<C>,
        output: &mut OutputBuffer,
    ) {
        for hook in &self.after_action {
            hook(controller, action, output);
        }
    }
}

impl<C: Controller> Default for Hooks<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Controller> Clone for Hooks<C> {
    fn clone(&self) -> Self {
        Self {
            before_action: self.before_action.clone(),
            after_action: self.after_action.clone(),
        }
    }
}

impl<C: Controller> fmt::Debug for Hooks<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_action_count", &self.before_action.len())
            .field("after_action_count", &self.after_action.len())
            .finish()
    }
}
