//! End-to-end dispatch tests against a small blog controller.

use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::json;
use stagehand_dispatch::{
    Action, ActionMap, ActionObject, Args, Component, ConfigError, Controller, DispatchError,
    Dispatched, Dispatcher, Filter, FilterChain, FilterDecl, Methods, ObjectSpec, OutputBuffer,
    Param, Params, Registry,
};

// ============================================================================
// Fixtures
// ============================================================================

type Journal = Rc<RefCell<Vec<String>>>;

struct BlogController {
    journal: Journal,
    filters: Vec<FilterDecl>,
    actions: ActionMap,
}

impl BlogController {
    fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            filters: Vec::new(),
            actions: ActionMap::new()
                .action("feed", ObjectSpec::new("FeedAction").property("limit", 2))
                .action("index", "FeedAction")
                .action("latest", "FeedAction")
                .action("s", "SearchAction")
                .action("sidebar", "Widget")
                .action("cache", ObjectSpec::new("TraceFilter").property("label", "c")),
        }
    }

    fn with_filters(mut self, filters: Vec<FilterDecl>) -> Self {
        self.filters = filters;
        self
    }

    fn note(&self, entry: impl Into<String>) {
        self.journal.borrow_mut().push(entry.into());
    }
}

impl Controller for BlogController {
    fn id(&self) -> &str {
        "blog"
    }

    fn methods() -> Methods<Self> {
        Methods::<Self>::new()
            .action("index", &[], |ctrl, out, _| {
                ctrl.note("action:index");
                out.push_str("inline index");
                Ok(())
            })
            .action("s", &[], |ctrl, _, _| {
                ctrl.note("action:inline-s");
                Ok(())
            })
            .action(
                "archive",
                &[Param::required("year"), Param::optional("month", 1)],
                |ctrl, out, args| {
                    ctrl.note("action:archive");
                    let year: u32 = args.get(0)?;
                    let month: u32 = args.get_named("month")?;
                    write!(out, "{}-{:02}", year, month)?;
                    Ok(())
                },
            )
            .action("tagged", &[Param::list("tags")], |_, out, args| {
                let tags: Vec<String> = args.get(0)?;
                out.push_str(&tags.join(","));
                Ok(())
            })
            .filter("ajaxOnly", |chain, params| {
                chain.controller().note("filter:ajaxOnly");
                chain.run(params)
            })
    }

    fn filters(&self) -> Vec<FilterDecl> {
        self.filters.clone()
    }

    fn actions(&self) -> ActionMap {
        self.actions.clone()
    }

    fn before_action(&mut self, action: &Action<Self>) -> bool {
        self.note(format!("before:{}", action.id()));
        true
    }

    fn after_action(&mut self, action: &Action<Self>, _output: &mut OutputBuffer) {
        self.note(format!("after:{}", action.id()));
    }
}

#[derive(Deserialize)]
struct FeedAction {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(skip)]
    id: String,
}

fn default_limit() -> usize {
    10
}

impl ActionObject<BlogController> for FeedAction {
    fn init(&mut self, id: &str) -> Result<(), ConfigError> {
        self.id = id.to_string();
        Ok(())
    }

    fn run(
        &mut self,
        ctrl: &mut BlogController,
        out: &mut OutputBuffer,
        _: Args,
    ) -> anyhow::Result<()> {
        ctrl.note(format!("action:{}", self.id));
        write!(out, "feed of {}", self.limit)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct SearchAction {}

impl ActionObject<BlogController> for SearchAction {
    fn params(&self) -> Vec<Param> {
        vec![Param::required("q")]
    }

    fn run(
        &mut self,
        ctrl: &mut BlogController,
        out: &mut OutputBuffer,
        args: Args,
    ) -> anyhow::Result<()> {
        ctrl.note("action:search");
        let q: String = args.get(0)?;
        write!(out, "results for {}", q)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct Widget {}

#[derive(Deserialize)]
struct TraceFilter {
    label: String,
    #[serde(default = "yes")]
    pass: bool,
}

fn yes() -> bool {
    true
}

impl Filter<BlogController> for TraceFilter {
    fn name(&self) -> &str {
        &self.label
    }

    fn pre_filter(&mut self, chain: &mut FilterChain<'_, BlogController>) -> bool {
        chain.controller().note(format!("pre:{}", self.label));
        self.pass
    }

    fn post_filter(&mut self, chain: &mut FilterChain<'_, BlogController>) {
        chain.controller().note(format!("post:{}", self.label));
    }
}

#[derive(Deserialize)]
struct QuotaFilter {
    limit: u32,
    #[serde(skip)]
    remaining: u32,
}

impl Filter<BlogController> for QuotaFilter {
    fn init(&mut self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::FilterInit {
                filter: "quota".into(),
                message: "limit must be positive".into(),
            });
        }
        self.remaining = self.limit;
        Ok(())
    }

    fn pre_filter(&mut self, chain: &mut FilterChain<'_, BlogController>) -> bool {
        chain.controller().note(format!("quota:{}", self.remaining));
        self.remaining > 0
    }
}

fn registry() -> Registry<BlogController> {
    Registry::<BlogController>::new()
        .action::<FeedAction>("FeedAction")
        .action::<SearchAction>("SearchAction")
        .filter::<TraceFilter>("TraceFilter")
        .filter::<QuotaFilter>("QuotaFilter")
        .other::<Widget>("Widget")
}

fn dispatcher() -> Dispatcher<BlogController> {
    Dispatcher::<BlogController>::builder()
        .factory(registry())
        .build()
}

fn params(value: serde_json::Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

fn trace(label: &str) -> FilterDecl {
    FilterDecl::class("TraceFilter").property("label", label)
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_object_action_runs_with_hooks_once_each() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal);

    let result = dispatcher().run(&mut blog, "feed", &Params::new()).unwrap();

    assert_eq!(result.output(), Some("feed of 2"));
    assert_eq!(entries(&journal), vec!["before:feed", "action:feed", "after:feed"]);
}

#[test]
fn test_object_action_sees_requested_id() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal);

    let result = dispatcher().run(&mut blog, "latest", &Params::new()).unwrap();

    assert_eq!(result.output(), Some("feed of 10"));
    assert_eq!(
        entries(&journal),
        vec!["before:latest", "action:latest", "after:latest"]
    );
}

#[test]
fn test_missing_action_fires_no_hooks() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal);

    let err = dispatcher().run(&mut blog, "nope", &Params::new()).unwrap_err();

    assert_eq!(err.status(), 404);
    assert!(err.is_request_error());
    assert!(entries(&journal).is_empty());
}

#[test]
fn test_inline_wins_over_action_map() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal);

    let result = dispatcher().run(&mut blog, "index", &Params::new()).unwrap();

    assert_eq!(result.output(), Some("inline index"));
    assert!(entries(&journal).contains(&"action:index".to_string()));
}

#[test]
fn test_reserved_id_resolves_from_action_map() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal);

    let result = dispatcher()
        .run(&mut blog, "s", &params(json!({"q": "rust"})))
        .unwrap();

    assert_eq!(result.output(), Some("results for rust"));
    assert!(!entries(&journal).contains(&"action:inline-s".to_string()));
}

#[test]
fn test_mapped_class_without_run_capability() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal);

    let err = dispatcher().run(&mut blog, "sidebar", &Params::new()).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Config(ConfigError::NotAnAction { ref class }) if class == "Widget"
    ));
    assert_eq!(err.status(), 500);

    let err = dispatcher().run(&mut blog, "cache", &Params::new()).unwrap_err();
    assert!(matches!(err, DispatchError::Config(ConfigError::NotAnAction { .. })));
}

// ============================================================================
// Parameter binding
// ============================================================================

#[test]
fn test_binding_defaults_and_lists() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal);
    let dispatcher = dispatcher();

    let result = dispatcher
        .run(&mut blog, "archive", &params(json!({"year": 2024})))
        .unwrap();
    assert_eq!(result.output(), Some("2024-01"));

    let result = dispatcher
        .run(&mut blog, "tagged", &params(json!({"tags": "rust"})))
        .unwrap();
    assert_eq!(result.output(), Some("rust"));
}

#[test]
fn test_invalid_params_is_bad_request() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal).with_filters(vec![trace("outer")]);

    let err = dispatcher()
        .run(&mut blog, "archive", &params(json!({"year": [2024]})))
        .unwrap_err();

    assert_eq!(err.status(), 400);
    assert_eq!(err.public_message(), "Your request is invalid.");
    assert_eq!(entries(&journal), vec!["before:archive", "pre:outer"]);
}

// ============================================================================
// Filter chain
// ============================================================================

#[test]
fn test_filters_nest_around_action() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal).with_filters(vec![
        trace("a"),
        "ajaxOnly".into(),
        trace("b"),
    ]);

    dispatcher().run(&mut blog, "feed", &Params::new()).unwrap();

    assert_eq!(
        entries(&journal),
        vec![
            "before:feed",
            "pre:a",
            "filter:ajaxOnly",
            "pre:b",
            "action:feed",
            "post:b",
            "post:a",
            "after:feed",
        ]
    );
}

#[test]
fn test_short_circuit_is_silent() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal).with_filters(vec![
        trace("a"),
        trace("gate").property("pass", false),
        trace("never"),
    ]);

    let result = dispatcher().run(&mut blog, "feed", &Params::new()).unwrap();

    assert_eq!(result, Dispatched::Completed { output: String::new() });
    assert_eq!(
        entries(&journal),
        vec!["before:feed", "pre:a", "pre:gate", "post:a", "after:feed"]
    );
}

#[test]
fn test_scope_selects_filters() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal).with_filters(vec![
        FilterDecl::class("TraceFilter + Feed").property("label", "only-feed"),
        FilterDecl::class("TraceFilter - feed").property("label", "not-feed"),
        "ajaxOnly + index archive".into(),
    ]);

    dispatcher().run(&mut blog, "feed", &Params::new()).unwrap();

    let log = entries(&journal);
    assert!(log.contains(&"pre:only-feed".to_string()));
    assert!(!log.contains(&"pre:not-feed".to_string()));
    assert!(!log.contains(&"filter:ajaxOnly".to_string()));
}

#[test]
fn test_unknown_inline_filter() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal).with_filters(vec!["postOnly".into()]);

    let err = dispatcher().run(&mut blog, "feed", &Params::new()).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Config(ConfigError::InvalidFilterMethod { ref filter, ref controller })
            if filter == "postOnly" && controller == "blog"
    ));
}

#[test]
fn test_structured_filter_without_class() {
    let journal = Journal::default();
    let decl = FilterDecl::from_value(json!({"label": "x"})).unwrap();
    let mut blog = BlogController::new(&journal).with_filters(vec![decl]);

    let err = dispatcher().run(&mut blog, "feed", &Params::new()).unwrap_err();
    assert!(matches!(err, DispatchError::Config(ConfigError::MissingFilterClass)));
}

#[test]
fn test_misspelled_filter_property_rejected() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal)
        .with_filters(vec![trace("a").property("pas", false)]);

    let err = dispatcher().run(&mut blog, "feed", &Params::new()).unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Config(ConfigError::UnknownProperty { ref class, ref property })
            if class == "TraceFilter" && property == "pas"
    ));
    assert_eq!(err.status(), 500);
    assert_eq!(entries(&journal), vec!["before:feed"]);
}

#[test]
fn test_misspelled_action_property_rejected() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal);
    blog.actions
        .insert("feed", ObjectSpec::new("FeedAction").property("limt", 2));

    let err = dispatcher().run(&mut blog, "feed", &Params::new()).unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Config(ConfigError::UnknownProperty { ref property, .. })
            if property == "limt"
    ));
    assert!(entries(&journal).is_empty());
}

#[test]
fn test_filter_init_runs_before_chain() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal)
        .with_filters(vec![FilterDecl::class("QuotaFilter").property("limit", 3)]);

    let result = dispatcher().run(&mut blog, "feed", &Params::new()).unwrap();

    assert_eq!(result.output(), Some("feed of 2"));
    assert_eq!(
        entries(&journal),
        vec!["before:feed", "quota:3", "action:feed", "after:feed"]
    );
}

#[test]
fn test_filter_init_failure_stops_dispatch() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal).with_filters(vec![
        trace("a"),
        FilterDecl::class("QuotaFilter").property("limit", 0),
    ]);

    let err = dispatcher().run(&mut blog, "feed", &Params::new()).unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Config(ConfigError::FilterInit { ref filter, .. }) if filter == "quota"
    ));
    assert_eq!(err.status(), 500);
    assert_eq!(entries(&journal), vec!["before:feed"]);
}

#[test]
fn test_non_filter_class_in_filter_list() {
    let journal = Journal::default();
    let mut blog =
        BlogController::new(&journal).with_filters(vec![FilterDecl::class("FeedAction")]);

    let err = dispatcher().run(&mut blog, "feed", &Params::new()).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Config(ConfigError::NotAFilter { ref class }) if class == "FeedAction"
    ));
}

// ============================================================================
// Hooks
// ============================================================================

#[test]
fn test_dispatcher_before_hook_aborts() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal).with_filters(vec![trace("a")]);
    let dispatcher = Dispatcher::<BlogController>::builder()
        .factory(registry())
        .before_action(|_, action| action.id() != "feed")
        .build();

    let result = dispatcher.run(&mut blog, "feed", &Params::new()).unwrap();

    assert!(result.is_aborted());
    assert_eq!(entries(&journal), vec!["before:feed"]);
}

#[test]
fn test_after_hook_rewrites_output() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal);
    let dispatcher = Dispatcher::<BlogController>::builder()
        .factory(registry())
        .after_action(|_, _, out| {
            let body = out.take();
            write!(out, "<main>{}</main>", body).ok();
        })
        .build();

    let result = dispatcher.run(&mut blog, "feed", &Params::new()).unwrap();
    assert_eq!(result.into_output().as_deref(), Some("<main>feed of 2</main>"));
}

#[test]
fn test_custom_component_rejected_by_chain() {
    let journal = Journal::default();
    let mut blog = BlogController::new(&journal);
    let dispatcher = dispatcher();
    let mut action = dispatcher.create_action(&blog, "feed").unwrap().unwrap();
    let mut out = OutputBuffer::new();
    let mut chain = FilterChain::new(&mut blog, &mut action, &mut out);

    let err = chain
        .insert_component(Component::Other(Box::new(Widget {})), "Widget")
        .unwrap_err();
    assert!(matches!(err, ConfigError::NotAFilter { .. }));
    assert!(chain.is_empty());

    chain.run(&Params::new()).unwrap();
    assert_eq!(out.as_str(), "feed of 2");
}
