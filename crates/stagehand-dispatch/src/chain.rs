//! Filter chain execution.
//!
//! A [`FilterChain`] holds the filters that apply to one action and a cursor
//! into them. Each call to [`FilterChain::run`] advances the cursor: it
//! either applies the next filter, which is expected to call `run` again to
//! continue, or, once every filter has been applied, runs the action itself.
//!
//! ```text
//! run → filter[0].apply
//!         └ run → filter[1].apply
//!                   └ run → action
//!                   post 1
//!         post 0
//! ```
//!
//! A chain with `n` filters that all continue makes `n + 1` calls to `run`.
//! A filter that does not call `run` stops the chain silently; the caller
//! sees a successful dispatch with whatever output was produced so far.

use std::fmt;

use tracing::{debug, warn};

use crate::action::Action;
use crate::controller::{Controller, Methods};
use crate::declaration::{FilterDecl, FilterSpec, FilterTarget};
use crate::error::{ConfigError, DispatchResult};
use crate::factory::{Component, ObjectFactory, Origin};
use crate::filter::{Filter, InlineFilter};
use crate::output::OutputBuffer;
use crate::params::Params;

/// The filters applying to one action, plus the execution cursor.
pub struct FilterChain<'a, C: Controller> {
    controller: &'a mut C,
    action: &'a mut Action<C>,
    output: &'a mut OutputBuffer,
    // A filter is taken out of its slot while it is being applied.
    filters: Vec<Option<Box<dyn Filter<C>>>>,
    names: Vec<String>,
    index: usize,
    action_ran: bool,
}

impl<'a, C: Controller> FilterChain<'a, C> {
    /// Creates an empty chain for `action`.
    pub fn new(
        controller: &'a mut C,
        action: &'a mut Action<C>,
        output: &'a mut OutputBuffer,
    ) -> Self {
        Self {
            controller,
            action,
            output,
            filters: Vec::new(),
            names: Vec::new(),
            index: 0,
            action_ran: false,
        }
    }

    /// Builds the chain for `action` from the controller's declarations.
    ///
    /// Declarations whose scope excludes the action are skipped. Every
    /// declaration is still parsed, so a malformed one fails regardless of
    /// scope. Object filters are built by `factory` and must have the filter
    /// capability; each filter's [`Filter::init`] runs before it is added.
    pub fn create(
        controller: &'a mut C,
        action: &'a mut Action<C>,
        output: &'a mut OutputBuffer,
        decls: &[FilterDecl],
        methods: &Methods<C>,
        factory: &dyn ObjectFactory<C>,
    ) -> Result<Self, ConfigError> {
        let mut built = Vec::with_capacity(decls.len());
        for decl in decls {
            let Some(spec) = FilterSpec::parse_for(decl, action.id())? else {
                continue;
            };

            let mut filter: Box<dyn Filter<C>> = match spec.target() {
                FilterTarget::Inline(name) => {
                    Box::new(InlineFilter::create(methods, controller.id(), name)?)
                }
                FilterTarget::Object(object) => factory
                    .construct(object, Origin::Filter { controller: &*controller })?
                    .into_filter(object.class())?,
            };
            filter.init()?;
            built.push((spec.name().to_string(), filter));
        }

        let mut chain = Self::new(controller, action, output);
        for (name, filter) in built {
            chain.push_named(name, filter);
        }
        debug!(
            controller = chain.controller.id(),
            action = chain.action.id(),
            filters = chain.len(),
            "filter chain created"
        );
        Ok(chain)
    }

    /// Appends a filter.
    pub fn push(&mut self, filter: Box<dyn Filter<C>>) {
        let name = filter.name().to_string();
        self.push_named(name, filter);
    }

    fn push_named(&mut self, name: String, filter: Box<dyn Filter<C>>) {
        self.filters.push(Some(filter));
        self.names.push(name);
    }

    /// Appends a constructed component, which must be a filter.
    pub fn insert_component(
        &mut self,
        component: Component<C>,
        class: &str,
    ) -> Result<(), ConfigError> {
        let filter = component.into_filter(class)?;
        self.push_named(class.to_string(), filter);
        Ok(())
    }

    /// Applies the next filter, or runs the action once every filter has
    /// been applied.
    ///
    /// Once the action has run, further calls past the last filter do
    /// nothing.
    pub fn run(&mut self, params: &Params) -> DispatchResult {
        if self.index < self.filters.len() {
            let index = self.index;
            self.index += 1;

            let Some(mut filter) = self.filters[index].take() else {
                return Ok(());
            };
            debug!(
                filter = %self.names[index],
                action = self.action.id(),
                index,
                "running filter"
            );
            let result = filter.apply(self, params);
            self.filters[index] = Some(filter);
            return result;
        }

        if self.action_ran {
            warn!(action = self.action.id(), "action already ran, ignoring repeated chain run");
            return Ok(());
        }
        self.action_ran = true;
        self.action
            .run_with_params(&mut *self.controller, &mut *self.output, params)
    }

    /// The controller.
    pub fn controller(&self) -> &C {
        &*self.controller
    }

    /// The controller, mutably.
    pub fn controller_mut(&mut self) -> &mut C {
        &mut *self.controller
    }

    /// The action this chain wraps.
    pub fn action(&self) -> &Action<C> {
        &*self.action
    }

    /// Output captured so far.
    pub fn output(&self) -> &OutputBuffer {
        &*self.output
    }

    /// Output captured so far, mutably.
    pub fn output_mut(&mut self) -> &mut OutputBuffer {
        &mut *self.output
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter names, in execution order.
    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Index of the next filter to apply.
    pub fn filter_index(&self) -> usize {
        self.index
    }

    /// Returns true once the action has run.
    pub fn action_ran(&self) -> bool {
        self.action_ran
    }
}

impl<C: Controller> fmt::Debug for FilterChain<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("action", &self.action.id())
            .field("filters", &self.names)
            .field("index", &self.index)
            .field("action_ran", &self.action_ran)
            .finish()
    }
}
