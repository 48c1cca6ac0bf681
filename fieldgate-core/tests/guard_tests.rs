mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{model_schema, record, sample_model, EventCollector, TestCtx};
use fieldgate_core::{
    Error, Guard, GuardEvent, Predicate, PredicateError, Record, RuleManifest, RuleRegistry,
    RuleSet, SchemaId, DEFAULT_MAX_CONCURRENT_CHECKS,
};
use futures::FutureExt;
use serde_json::json;

/// Allows a command only on records whose `_id` is below a limit
struct IdBelow(i64);

#[async_trait]
impl Predicate<TestCtx> for IdBelow {
    async fn evaluate(&self, record: &dyn Record, ctx: &TestCtx) -> Result<bool, PredicateError> {
        let id = record
            .get("_id")
            .and_then(|node| match node {
                fieldgate_core::Node::Scalar(value) => value.as_i64(),
                _ => None,
            })
            .ok_or_else(|| PredicateError::from("record has no numeric _id"))?;
        Ok(ctx.has_right0 && id < self.0)
    }
}

// ===== Command Authorizer =====

#[tokio::test]
async fn test_allows_without_rules() {
    let guard = Guard::new(Arc::new(RuleRegistry::<TestCtx>::new()));
    assert!(guard
        .allows(&TestCtx::without_right(), &sample_model(), "command")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_allows_with_rules() {
    let registry = Arc::new(RuleRegistry::new());
    registry.add_rule(
        "Model",
        RuleSet::<TestCtx>::new()
            .allow_command_async("truthy", |_, _| async { Ok(true) }.boxed())
            .allow_command_if("falsy", |_, _| false)
            .allow_command("archive", IdBelow(10)),
    );
    let guard = Guard::new(registry);
    let ctx = TestCtx::with_right();
    let model = sample_model();

    assert!(guard.allows(&ctx, &model, "truthy").await.unwrap());
    assert!(!guard.allows(&ctx, &model, "falsy").await.unwrap());
    assert!(guard.allows(&ctx, &model, "unknownCommand").await.unwrap());
    assert!(guard.allows(&ctx, &model, "archive").await.unwrap());
    assert!(!guard
        .allows(&TestCtx::without_right(), &model, "archive")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_command_predicate_errors_propagate() {
    let registry = Arc::new(RuleRegistry::new());
    let rules = RuleSet::new().allow_command("archive", IdBelow(10));
    registry.add_rule("Model", rules);
    let guard = Guard::new(registry);
    let events = EventCollector::new();
    guard.add_hook(events.clone());

    let without_id = fieldgate_core::Document::hydrate(&model_schema(), json!({"ppte": "x"}));
    let err = guard
        .allows(&TestCtx::with_right(), &without_id, "archive")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Predicate(PredicateError::Custom(_))));
    assert!(err.to_string().contains("record has no numeric _id"));
    assert_eq!(
        events.events(),
        vec![GuardEvent::PredicateFailed {
            schema: SchemaId::new("Model"),
            error: "record has no numeric _id".to_string(),
        }]
    );
}

// ===== Access Gate =====

#[tokio::test]
async fn test_access_rules() {
    let registry = Arc::new(RuleRegistry::new());
    let guard = Guard::new(Arc::clone(&registry));
    let model = sample_model();
    let (granted, denied) = (TestCtx::with_right(), TestCtx::without_right());

    assert!(guard.access(&denied, &model).await.unwrap());

    let rules = RuleSet::<TestCtx>::new().access_if(|_, ctx| ctx.has_right0);
    registry.add_rule("Model", rules);
    assert!(guard.access(&granted, &model).await.unwrap());
    assert!(!guard.access(&denied, &model).await.unwrap());

    registry.add_rule("Model", RuleSet::new().access(true));
    assert!(guard.access(&denied, &model).await.unwrap());
}

// ===== Registry =====

#[tokio::test]
async fn test_rules_added_in_separate_calls_are_merged() {
    let registry = Arc::new(RuleRegistry::new());
    registry.add_rule("Model", RuleSet::<TestCtx>::new().expose("ppte", false));
    registry.add_rule("Model", RuleSet::new().expose("ppte2", false));
    let guard = Guard::new(Arc::clone(&registry));

    let exposed = guard
        .expose(&TestCtx::with_right(), &record(sample_model()))
        .await
        .unwrap();
    assert!(exposed.get("ppte").is_none());
    assert!(exposed.get("ppte2").is_none());
    assert_eq!(exposed["ppte3"], json!("ppte3"));

    // A later registration overrides the same key
    registry.add_rule("Model", RuleSet::new().expose("ppte", true));
    let exposed = guard
        .expose(&TestCtx::with_right(), &record(sample_model()))
        .await
        .unwrap();
    assert_eq!(exposed["ppte"], json!("ppte"));
    assert!(exposed.get("ppte2").is_none());
}

#[tokio::test]
async fn test_registry_is_shared_between_guards() {
    let registry = Arc::new(RuleRegistry::new());
    registry.add_rule("Model", RuleSet::<TestCtx>::new().access(false));

    let strict = Guard::new(Arc::clone(&registry));
    let relaxed = Guard::builder(Arc::clone(&registry))
        .max_concurrent_checks(2)
        .build();

    assert!(Arc::ptr_eq(strict.registry(), relaxed.registry()));
    assert_eq!(
        strict.max_concurrent_checks(),
        DEFAULT_MAX_CONCURRENT_CHECKS
    );
    assert_eq!(relaxed.max_concurrent_checks(), 2);

    let err = relaxed
        .expose(&TestCtx::with_right(), &record(sample_model()))
        .await
        .unwrap_err();
    assert!(err.is_access_denied());
}

// ===== Manifest =====

#[tokio::test]
async fn test_manifest_rules_apply() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("rules.json");
    std::fs::write(
        &path,
        r#"{
            "Model": {
                "expose": { "ppte": false, "nested.ppte": false },
                "allowsModification": { "_id": false }
            }
        }"#,
    )
    .unwrap();

    let registry = Arc::new(RuleRegistry::new());
    registry.add_rule(
        "Model",
        RuleSet::<TestCtx>::new().expose_if("ppte3", |_, ctx| ctx.has_right0),
    );
    registry.load_manifest(&RuleManifest::from_file(&path).unwrap());
    let guard = Guard::new(registry);

    let exposed = guard
        .expose(&TestCtx::without_right(), &record(sample_model()))
        .await
        .unwrap();
    assert_eq!(
        exposed,
        json!({"_id": 1, "ppte2": "ppte2", "nested": {"ppte2": "p2"}})
    );

    let mut model = sample_model();
    model.set("_id", json!(7));
    let check = guard
        .allows_modification(&TestCtx::with_right(), &model)
        .await
        .unwrap();
    assert_eq!(check.forbidden_paths, vec!["_id"]);
}
