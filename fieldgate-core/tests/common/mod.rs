//! Common test utilities shared across test files.
//!
//! Items here may not be used by all test files, hence the module-level allow.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use fieldgate_core::{Document, Guard, GuardEvent, GuardHook, Node, RuleRegistry, RuleSet, Schema};
use futures::FutureExt;
use serde_json::{json, Value};

// ===== Context =====

/// Caller context used throughout the tests
#[derive(Debug, Clone, Copy)]
pub struct TestCtx {
    pub has_right0: bool,
}

impl TestCtx {
    pub fn with_right() -> Self {
        Self { has_right0: true }
    }

    pub fn without_right() -> Self {
        Self { has_right0: false }
    }
}

// ===== Schemas =====

/// `Model`: plain fields plus a nested group
pub fn model_schema() -> Arc<Schema> {
    Schema::builder("Model")
        .field("_id")
        .field("ppte")
        .field("ppte2")
        .field("ppte3")
        .field("nested.ppte")
        .field("nested.ppte2")
        .build()
}

/// `TopModel`: references to `Model`, populated by the tests
pub fn top_model_schema() -> Arc<Schema> {
    Schema::builder("TopModel")
        .reference("populatePpte")
        .reference("populatePpteArray")
        .build()
}

/// `WithNestedArray`: an array of embedded `Model` documents
pub fn with_nested_array_schema() -> Arc<Schema> {
    Schema::builder("WithNestedArray")
        .embedded_array("nested", model_schema())
        .build()
}

// ===== Documents =====

pub fn sample_model_json() -> Value {
    json!({
        "_id": 1,
        "ppte": "ppte",
        "ppte2": "ppte2",
        "ppte3": "ppte3",
        "nested": {"ppte": "p", "ppte2": "p2"}
    })
}

/// A persisted `Model` with every field set and nothing modified
pub fn sample_model() -> Document {
    Document::hydrate(&model_schema(), sample_model_json())
}

// ===== Rules =====

/// Exposure rules mixing fixed, sync and async rules
pub fn model_expose_rules() -> RuleSet<TestCtx> {
    RuleSet::<TestCtx>::new()
        .expose("ppte", false)
        .expose_async("ppte2", |_, ctx| async move { Ok(!ctx.has_right0) }.boxed())
        .expose_if("ppte3", |_, ctx| ctx.has_right0)
        .expose("nested.ppte", false)
}

/// Modification rules mixing fixed, sync and async rules
pub fn model_modification_rules() -> RuleSet<TestCtx> {
    RuleSet::<TestCtx>::new()
        .allow_modification("ppte", false)
        .allow_modification_async("ppte2", |_, ctx| {
            async move {
                tokio::task::yield_now().await;
                Ok(ctx.has_right0)
            }
            .boxed()
        })
        .allow_modification_if("ppte3", |_, ctx| !ctx.has_right0)
        .allow_modification("nested.ppte", false)
}

/// A guard over a fresh registry holding `rules` for `schema`
pub fn guard_with(schema: &str, rules: RuleSet<TestCtx>) -> Guard<TestCtx> {
    let registry = Arc::new(RuleRegistry::new());
    registry.add_rule(schema, rules);
    Guard::new(registry)
}

pub fn record(doc: Document) -> Node {
    Node::record(doc)
}

// ===== Event Collection =====

/// Hook that records every event it sees
#[derive(Clone, Default)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<GuardEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GuardEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl GuardHook for EventCollector {
    fn on_event(&self, event: &GuardEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
