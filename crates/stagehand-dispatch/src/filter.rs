//! The filter contract.
//!
//! A filter wraps action execution. It runs when the chain reaches it and
//! decides whether execution continues by calling [`FilterChain::run`]
//! again. The default [`Filter::apply`] does the common thing:
//!
//! ```text
//! pre_filter() == true  →  chain.run()  →  post_filter()
//! pre_filter() == false →  stop (silently; nothing later runs)
//! ```
//!
//! Because every filter calls into the rest of the chain from inside its own
//! `apply`, post-filters run in reverse order of pre-filters.
//!
//! There are two kinds of filters:
//!
//! - [`InlineFilter`]: a named filter method registered in the controller's
//!   [`Methods`] table. The method receives the chain and must call
//!   `chain.run(params)` itself if the action should execute.
//! - Object filters: any type implementing [`Filter`], usually built by the
//!   [`ObjectFactory`](crate::ObjectFactory) from a structured declaration.

use std::fmt;

use crate::chain::FilterChain;
use crate::controller::{Controller, FilterFn, Methods};
use crate::error::{ConfigError, DispatchResult};
use crate::params::Params;

/// A unit of pre/post logic around an action.
pub trait Filter<C: Controller> {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once after construction and property application, before the
    /// filter joins a chain.
    fn init(&mut self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Performs the filtering.
    ///
    /// Implementations that override this must call `chain.run(params)` if
    /// the action should execute.
    fn apply(&mut self, chain: &mut FilterChain<'_, C>, params: &Params) -> DispatchResult {
        if self.pre_filter(chain) {
            chain.run(params)?;
            self.post_filter(chain);
        }
        Ok(())
    }

    /// Runs before the rest of the chain. Returning false halts the chain.
    fn pre_filter(&mut self, _chain: &mut FilterChain<'_, C>) -> bool {
        true
    }

    /// Runs after the rest of the chain (and the action) completed.
    fn post_filter(&mut self, _chain: &mut FilterChain<'_, C>) {}
}

/// A filter backed by a controller filter method.
pub struct InlineFilter<C: Controller> {
    name: String,
    method: FilterFn<C>,
}

impl<C: Controller> InlineFilter<C> {
    /// Looks up the filter method `name` in the controller's method table.
    ///
    /// Fails with [`ConfigError::InvalidFilterMethod`] if there is none.
    pub fn create(
        methods: &Methods<C>,
        controller_id: &str,
        name: &str,
    ) -> Result<Self, ConfigError> {
        match methods.find_filter(name) {
            Some(method) => Ok(Self {
                name: name.to_string(),
                method: method.clone(),
            }),
            None => Err(ConfigError::InvalidFilterMethod {
                filter: name.to_string(),
                controller: controller_id.to_string(),
            }),
        }
    }
}

impl<C: Controller> Filter<C> for InlineFilter<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, chain: &mut FilterChain<'_, C>, params: &Params) -> DispatchResult {
        (self.method)(chain, params)
    }
}

impl<C: Controller> fmt::Debug for InlineFilter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

type PreFn<C> = Box<dyn FnMut(&mut FilterChain<'_, C>) -> bool>;
type PostFn<C> = Box<dyn FnMut(&mut FilterChain<'_, C>)>;

/// A filter built from closures.
///
/// # Example
///
/// ```rust,ignore
/// let audit = FnFilter::new("audit")
///     .pre(|chain| chain.controller().is_authenticated())
///     .post(|chain| chain.output_mut().push_str("<!-- audited -->"));
/// ```
pub struct FnFilter<C: Controller> {
    name: String,
    pre: Option<PreFn<C>>,
    post: Option<PostFn<C>>,
}

impl<C: Controller> FnFilter<C> {
    /// Creates a filter that passes everything through.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pre: None,
            post: None,
        }
    }

    /// Sets the pre-filter.
    pub fn pre<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut FilterChain<'_, C>) -> bool + 'static,
    {
        self.pre = Some(Box::new(f));
        self
    }

    /// Sets the post-filter.
    pub fn post<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut FilterChain<'_, C>) + 'static,
    {
        self.post = Some(Box::new(f));
        self
    }
}

impl<C: Controller> Filter<C> for FnFilter<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_filter(&mut self, chain: &mut FilterChain<'_, C>) -> bool {
        match &mut self.pre {
            Some(pre) => pre(chain),
            None => true,
        }
    }

    fn post_filter(&mut self, chain: &mut FilterChain<'_, C>) {
        if let Some(post) = &mut self.post {
            post(chain);
        }
    }
}

impl<C: Controller> fmt::Debug for FnFilter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFilter")
            .field("name", &self.name)
            .field("has_pre", &self.pre.is_some())
            .field("has_post", &self.post.is_some())
            .finish()
    }
}
