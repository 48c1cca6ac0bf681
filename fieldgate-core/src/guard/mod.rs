//! Rule evaluation over the document graph.
//!
//! [`Guard`] answers four questions for a caller context:
//!
//! - [`Guard::access`]: may the caller access this record at all?
//! - [`Guard::expose`]: which fields of this value may the caller see?
//! - [`Guard::allows_modification`]: were the changes made to this record permitted?
//! - [`Guard::allows`]: may the caller run this command on this record?
//!
//! Every decision defaults to permit when no rule says otherwise.

mod expose;
mod modification;

pub use modification::ModificationCheck;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::document::{Record, SchemaId};
use crate::error::{Error, PredicateError, Result};
use crate::events::{GuardEvent, GuardHook};
use crate::registry::RuleRegistry;
use crate::rule::{Rule, RuleSet};

/// Default limit on sibling checks evaluated concurrently at one level
pub const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 16;

/// Evaluates registered rules against records.
///
/// The registry is passed in explicitly and may be shared by several
/// guards. A guard carries no per-call state, so one instance can serve
/// concurrent calls with different contexts.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use fieldgate_core::{Document, Guard, Node, RuleRegistry, RuleSet, Schema};
/// use serde_json::json;
///
/// struct Ctx {
///     admin: bool,
/// }
///
/// # tokio_test::block_on(async {
/// let schema = Schema::builder("User").field("name").field("email").build();
///
/// let registry = Arc::new(RuleRegistry::<Ctx>::new());
/// registry.add_rule("User", RuleSet::<Ctx>::new().expose_if("email", |_, ctx| ctx.admin));
///
/// let guard = Guard::new(registry);
/// let user = Node::record(Document::hydrate(&schema, json!({"name": "ada", "email": "a@b.c"})));
///
/// let visible = guard.expose(&Ctx { admin: false }, &user).await.unwrap();
/// assert_eq!(visible, json!({"name": "ada"}));
/// # });
/// ```
pub struct Guard<C> {
    registry: Arc<RuleRegistry<C>>,
    max_concurrent_checks: usize,
    hooks: RwLock<Vec<Arc<dyn GuardHook>>>,
}

impl<C: Send + Sync> Guard<C> {
    /// Create a guard with default settings.
    pub fn new(registry: Arc<RuleRegistry<C>>) -> Self {
        Self::builder(registry).build()
    }

    pub fn builder(registry: Arc<RuleRegistry<C>>) -> GuardBuilder<C> {
        GuardBuilder::new(registry)
    }

    /// The registry this guard reads rules from.
    pub fn registry(&self) -> &Arc<RuleRegistry<C>> {
        &self.registry
    }

    pub fn max_concurrent_checks(&self) -> usize {
        self.max_concurrent_checks
    }

    /// Add an event hook to observe decisions
    pub fn add_hook(&self, hook: impl GuardHook + 'static) {
        self.hooks.write().push(Arc::new(hook));
    }

    /// Decide whether the caller may access `record` at all.
    ///
    /// Without an access rule the answer is `true`. Predicate failures are
    /// returned as [`Error::Predicate`].
    pub async fn access(&self, ctx: &C, record: &dyn Record) -> Result<bool> {
        let rules = self.registry.get_rule(&record.schema_id());
        self.check_access(ctx, record, rules.as_deref()).await
    }

    /// Access decision against a rule set the caller already looked up.
    async fn check_access(
        &self,
        ctx: &C,
        record: &dyn Record,
        rules: Option<&RuleSet<C>>,
    ) -> Result<bool> {
        let Some(rule) = rules.and_then(|rules| rules.access_rule_ref()) else {
            return Ok(true);
        };
        self.evaluate_rule(rule, record, ctx).await
    }

    /// Decide whether the caller may run `command` on `record`.
    ///
    /// Commands without a registered predicate are allowed.
    pub async fn allows(&self, ctx: &C, record: &dyn Record, command: &str) -> Result<bool> {
        let schema = record.schema_id();
        let predicate = self
            .registry
            .get_rule(&schema)
            .and_then(|rules| rules.command(command).cloned());
        let Some(predicate) = predicate else {
            return Ok(true);
        };

        let allowed = predicate
            .evaluate(record, ctx)
            .await
            .map_err(|err| self.predicate_failed(&schema, err))?;

        if !allowed {
            log::debug!("command '{}' denied on {}", command, schema);
            self.emit_event(GuardEvent::CommandDenied {
                schema,
                command: command.to_string(),
            });
        }
        Ok(allowed)
    }

    /// Evaluate a rule, reporting predicate failures.
    async fn evaluate_rule(&self, rule: &Rule<C>, record: &dyn Record, ctx: &C) -> Result<bool> {
        rule.evaluate(record, ctx)
            .await
            .map_err(|err| self.predicate_failed(&record.schema_id(), err))
    }

    fn predicate_failed(&self, schema: &SchemaId, err: PredicateError) -> Error {
        log::warn!("rule predicate failed on {}: {}", schema, err);
        self.emit_event(GuardEvent::PredicateFailed {
            schema: schema.clone(),
            error: err.to_string(),
        });
        Error::Predicate(err)
    }

    /// Emit an event to all registered hooks
    pub(crate) fn emit_event(&self, event: GuardEvent) {
        let hooks = self.hooks.read();
        for hook in hooks.iter() {
            hook.on_event(&event);
        }
    }
}

/// Builder for [`Guard`]
pub struct GuardBuilder<C> {
    registry: Arc<RuleRegistry<C>>,
    max_concurrent_checks: usize,
    hooks: Vec<Arc<dyn GuardHook>>,
}

impl<C: Send + Sync> GuardBuilder<C> {
    pub fn new(registry: Arc<RuleRegistry<C>>) -> Self {
        Self {
            registry,
            max_concurrent_checks: DEFAULT_MAX_CONCURRENT_CHECKS,
            hooks: Vec::new(),
        }
    }

    /// Limit how many sibling checks run concurrently at each level.
    ///
    /// Values below 1 are treated as 1.
    pub fn max_concurrent_checks(mut self, limit: usize) -> Self {
        self.max_concurrent_checks = limit.max(1);
        self
    }

    pub fn with_hook(mut self, hook: impl GuardHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn build(self) -> Guard<C> {
        Guard {
            registry: self.registry,
            max_concurrent_checks: self.max_concurrent_checks,
            hooks: RwLock::new(self.hooks),
        }
    }
}
