//! Rules and rule sets.
//!
//! A [`RuleSet`] bundles four independent sections for one schema:
//!
//! | Section | Keyed by | Decides |
//! |---------|----------|---------|
//! | `expose` | field path | whether the field appears in exposed output |
//! | `allows_modification` | field path | whether the field may be changed |
//! | `allows` | command name | whether the command may run |
//! | `access` | - | whether the record may be accessed at all |
//!
//! Anything not mentioned is permitted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::document::Record;
use crate::error::PredicateError;

/// Caller-supplied decision logic.
///
/// Predicates receive the record being evaluated and the caller context.
/// They must not depend on shared mutable state: sibling predicates run
/// concurrently.
///
/// ```rust
/// use async_trait::async_trait;
/// use fieldgate_core::{Predicate, PredicateError, Record};
///
/// struct Admin;
///
/// struct IsAdmin;
///
/// #[async_trait]
/// impl Predicate<Admin> for IsAdmin {
///     async fn evaluate(
///         &self,
///         _record: &dyn Record,
///         _ctx: &Admin,
///     ) -> Result<bool, PredicateError> {
///         Ok(true)
///     }
/// }
/// ```
#[async_trait]
pub trait Predicate<C>: Send + Sync {
    /// Decide for `record` under `ctx`.
    async fn evaluate(&self, record: &dyn Record, ctx: &C) -> Result<bool, PredicateError>;
}

/// Adapts a synchronous closure.
struct SyncFn<F>(F);

#[async_trait]
impl<C, F> Predicate<C> for SyncFn<F>
where
    C: Send + Sync,
    F: Fn(&dyn Record, &C) -> bool + Send + Sync,
{
    async fn evaluate(&self, record: &dyn Record, ctx: &C) -> Result<bool, PredicateError> {
        Ok((self.0)(record, ctx))
    }
}

/// Adapts a closure returning a boxed future.
struct AsyncFn<F>(F);

#[async_trait]
impl<C, F> Predicate<C> for AsyncFn<F>
where
    C: Send + Sync,
    F: for<'a> Fn(&'a dyn Record, &'a C) -> BoxFuture<'a, Result<bool, PredicateError>>
        + Send
        + Sync,
{
    async fn evaluate(&self, record: &dyn Record, ctx: &C) -> Result<bool, PredicateError> {
        (self.0)(record, ctx).await
    }
}

/// A field or access rule: a fixed answer or a predicate.
pub enum Rule<C> {
    /// Same answer for every record and context
    Fixed(bool),
    /// Decided per call by the predicate
    Predicate(Arc<dyn Predicate<C>>),
}

impl<C: Send + Sync> Rule<C> {
    /// Rule backed by a [`Predicate`] implementation.
    pub fn predicate(predicate: impl Predicate<C> + 'static) -> Self {
        Self::Predicate(Arc::new(predicate))
    }

    /// Rule backed by a synchronous closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&dyn Record, &C) -> bool + Send + Sync + 'static,
    {
        Self::predicate(SyncFn(f))
    }

    /// Rule backed by an async closure returning a boxed future.
    pub fn from_async<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a dyn Record, &'a C) -> BoxFuture<'a, Result<bool, PredicateError>>
            + Send
            + Sync
            + 'static,
    {
        Self::predicate(AsyncFn(f))
    }

    /// Evaluate the rule. Fixed rules answer without suspending.
    pub async fn evaluate(&self, record: &dyn Record, ctx: &C) -> Result<bool, PredicateError> {
        match self {
            Rule::Fixed(value) => Ok(*value),
            Rule::Predicate(predicate) => predicate.evaluate(record, ctx).await,
        }
    }
}

// Manual impls: deriving would require `C: Clone` / `C: Debug`.
impl<C> Clone for Rule<C> {
    fn clone(&self) -> Self {
        match self {
            Rule::Fixed(value) => Rule::Fixed(*value),
            Rule::Predicate(predicate) => Rule::Predicate(Arc::clone(predicate)),
        }
    }
}

impl<C> fmt::Debug for Rule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Rule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl<C> From<bool> for Rule<C> {
    fn from(value: bool) -> Self {
        Rule::Fixed(value)
    }
}

/// Rules registered for one schema.
///
/// Built fluently and handed to [`crate::RuleRegistry::add_rule`]:
///
/// ```rust
/// use fieldgate_core::RuleSet;
/// use futures::FutureExt;
///
/// struct Ctx {
///     admin: bool,
/// }
///
/// let rules = RuleSet::<Ctx>::new()
///     .expose("password", false)
///     .expose_if("email", |_record, ctx| ctx.admin)
///     .expose_async("notes", |_record, ctx| async move { Ok(ctx.admin) }.boxed())
///     .allow_modification("_id", false)
///     .allow_command_if("archive", |_record, ctx| ctx.admin)
///     .access(true);
///
/// assert!(rules.expose_rule_for("password").is_some());
/// assert!(rules.command("archive").is_some());
/// ```
pub struct RuleSet<C> {
    expose: HashMap<String, Rule<C>>,
    allows_modification: HashMap<String, Rule<C>>,
    allows: HashMap<String, Arc<dyn Predicate<C>>>,
    access: Option<Rule<C>>,
}

impl<C: Send + Sync> RuleSet<C> {
    /// Create an empty rule set (permits everything).
    pub fn new() -> Self {
        Self {
            expose: HashMap::new(),
            allows_modification: HashMap::new(),
            allows: HashMap::new(),
            access: None,
        }
    }

    // ===== expose =====

    /// Show or hide a field unconditionally.
    pub fn expose(self, path: impl Into<String>, visible: bool) -> Self {
        self.expose_rule(path, Rule::Fixed(visible))
    }

    /// Show a field when the closure returns true.
    pub fn expose_if<F>(self, path: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn Record, &C) -> bool + Send + Sync + 'static,
    {
        self.expose_rule(path, Rule::from_fn(f))
    }

    /// Show a field when the future resolves to true.
    pub fn expose_async<F>(self, path: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a dyn Record, &'a C) -> BoxFuture<'a, Result<bool, PredicateError>>
            + Send
            + Sync
            + 'static,
    {
        self.expose_rule(path, Rule::from_async(f))
    }

    /// Show a field according to a prebuilt [`Rule`].
    pub fn expose_rule(mut self, path: impl Into<String>, rule: Rule<C>) -> Self {
        self.expose.insert(path.into(), rule);
        self
    }

    // ===== allows_modification =====

    /// Permit or forbid changes to a field unconditionally.
    pub fn allow_modification(self, path: impl Into<String>, allowed: bool) -> Self {
        self.allow_modification_rule(path, Rule::Fixed(allowed))
    }

    /// Permit changes to a field unless the closure returns false.
    pub fn allow_modification_if<F>(self, path: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn Record, &C) -> bool + Send + Sync + 'static,
    {
        self.allow_modification_rule(path, Rule::from_fn(f))
    }

    /// Permit changes to a field unless the future resolves to false.
    pub fn allow_modification_async<F>(self, path: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a dyn Record, &'a C) -> BoxFuture<'a, Result<bool, PredicateError>>
            + Send
            + Sync
            + 'static,
    {
        self.allow_modification_rule(path, Rule::from_async(f))
    }

    /// Permit changes to a field according to a prebuilt [`Rule`].
    pub fn allow_modification_rule(mut self, path: impl Into<String>, rule: Rule<C>) -> Self {
        self.allows_modification.insert(path.into(), rule);
        self
    }

    // ===== allows (commands) =====

    /// Guard a command with a [`Predicate`] implementation.
    pub fn allow_command(
        mut self,
        command: impl Into<String>,
        predicate: impl Predicate<C> + 'static,
    ) -> Self {
        self.allows.insert(command.into(), Arc::new(predicate));
        self
    }

    /// Guard a command with a synchronous closure.
    pub fn allow_command_if<F>(self, command: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn Record, &C) -> bool + Send + Sync + 'static,
    {
        self.allow_command(command, SyncFn(f))
    }

    /// Guard a command with an async closure.
    pub fn allow_command_async<F>(self, command: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a dyn Record, &'a C) -> BoxFuture<'a, Result<bool, PredicateError>>
            + Send
            + Sync
            + 'static,
    {
        self.allow_command(command, AsyncFn(f))
    }

    // ===== access =====

    /// Grant or refuse access to every record of the schema.
    pub fn access(self, allowed: bool) -> Self {
        self.access_rule(Rule::Fixed(allowed))
    }

    /// Grant access when the closure returns true.
    pub fn access_if<F>(self, f: F) -> Self
    where
        F: Fn(&dyn Record, &C) -> bool + Send + Sync + 'static,
    {
        self.access_rule(Rule::from_fn(f))
    }

    /// Grant access when the future resolves to true.
    pub fn access_async<F>(self, f: F) -> Self
    where
        F: for<'a> Fn(&'a dyn Record, &'a C) -> BoxFuture<'a, Result<bool, PredicateError>>
            + Send
            + Sync
            + 'static,
    {
        self.access_rule(Rule::from_async(f))
    }

    /// Gate access with a prebuilt [`Rule`], replacing any earlier one.
    pub fn access_rule(mut self, rule: Rule<C>) -> Self {
        self.access = Some(rule);
        self
    }
}

impl<C> RuleSet<C> {
    /// The `expose` rule declared for exactly `path`.
    pub fn expose_rule_for(&self, path: &str) -> Option<&Rule<C>> {
        self.expose.get(path)
    }

    /// The `allows_modification` rule declared for exactly `path`.
    pub fn modification_rule_for(&self, path: &str) -> Option<&Rule<C>> {
        self.allows_modification.get(path)
    }

    /// The predicate guarding command `name`.
    pub fn command(&self, name: &str) -> Option<&Arc<dyn Predicate<C>>> {
        self.allows.get(name)
    }

    /// The record-level access rule, if one was declared.
    pub fn access_rule_ref(&self) -> Option<&Rule<C>> {
        self.access.as_ref()
    }

    /// Returns true if no section holds any rule
    pub fn is_empty(&self) -> bool {
        self.expose.is_empty()
            && self.allows_modification.is_empty()
            && self.allows.is_empty()
            && self.access.is_none()
    }

    /// Deep-merge a newer rule set into this one.
    ///
    /// Keys present on only one side are kept. On overlapping keys the
    /// newer rule replaces the older one. An access rule is replaced only
    /// when the newer set declares one.
    pub fn merge(&mut self, newer: RuleSet<C>) {
        self.expose.extend(newer.expose);
        self.allows_modification.extend(newer.allows_modification);
        self.allows.extend(newer.allows);
        if newer.access.is_some() {
            self.access = newer.access;
        }
    }
}

impl<C: Send + Sync> Default for RuleSet<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for RuleSet<C> {
    fn clone(&self) -> Self {
        Self {
            expose: self.expose.clone(),
            allows_modification: self.allows_modification.clone(),
            allows: self.allows.clone(),
            access: self.access.clone(),
        }
    }
}

impl<C> fmt::Debug for RuleSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut commands: Vec<_> = self.allows.keys().collect();
        commands.sort();
        f.debug_struct("RuleSet")
            .field("expose", &self.expose)
            .field("allows_modification", &self.allows_modification)
            .field("allows", &commands)
            .field("access", &self.access)
            .finish()
    }
}
