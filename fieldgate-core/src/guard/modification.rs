use std::collections::HashSet;

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;

use super::Guard;
use crate::document::Record;
use crate::error::Result;
use crate::events::GuardEvent;
use crate::rule::RuleSet;
use crate::tree::PATH_SEPARATOR;

/// Outcome of [`Guard::allows_modification`].
///
/// A refusal is an ordinary answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModificationCheck {
    /// True when no modified path is forbidden
    pub allowed: bool,
    /// Modified paths that were not permitted, in modification order
    pub forbidden_paths: Vec<String>,
}

impl ModificationCheck {
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

impl<C: Send + Sync> Guard<C> {
    /// Check the pending modifications of `record` against its
    /// `allows_modification` rules.
    ///
    /// Every declared path is judged, then the record's modified paths are
    /// compared against the permitted ones. A path holding a sequence of
    /// records is permitted only if every element passes its own check.
    pub async fn allows_modification(
        &self,
        ctx: &C,
        record: &dyn Record,
    ) -> Result<ModificationCheck> {
        self.check_modification(ctx, record).await
    }

    fn check_modification<'a>(
        &'a self,
        ctx: &'a C,
        record: &'a dyn Record,
    ) -> BoxFuture<'a, Result<ModificationCheck>> {
        async move {
            let schema = record.schema_id();
            let rules = self.registry.get_rule(&schema);
            let paths = record.paths();

            let checks: Vec<_> = paths
                .iter()
                .map(|path| {
                    self.allows_path_modification(ctx, record, rules.as_deref(), path)
                        .boxed()
                })
                .collect();

            let verdicts: Vec<bool> = stream::iter(checks)
                .buffered(self.max_concurrent_checks)
                .try_collect()
                .await?;

            let permitted: HashSet<&str> = paths
                .iter()
                .zip(verdicts)
                .filter_map(|(path, allowed)| allowed.then_some(path.as_str()))
                .collect();

            let modified = record.modified_paths();
            let forbidden_paths: Vec<String> = modified
                .iter()
                .filter(|path| !is_permitted(path, &paths, &modified, &permitted))
                .cloned()
                .collect();

            if !forbidden_paths.is_empty() {
                log::debug!("forbidden changes on {}: {:?}", schema, forbidden_paths);
                self.emit_event(GuardEvent::ModificationForbidden {
                    schema,
                    paths: forbidden_paths.clone(),
                });
            }

            Ok(ModificationCheck {
                allowed: forbidden_paths.is_empty(),
                forbidden_paths,
            })
        }
        .boxed()
    }

    async fn allows_path_modification(
        &self,
        ctx: &C,
        record: &dyn Record,
        rules: Option<&RuleSet<C>>,
        path: &str,
    ) -> Result<bool> {
        if let Some(elements) = record.get(path).and_then(|node| node.record_sequence()) {
            let checks: Vec<_> = elements
                .iter()
                .map(|element| self.check_modification(ctx, element.as_ref()))
                .collect();

            let results: Vec<ModificationCheck> = stream::iter(checks)
                .buffered(self.max_concurrent_checks)
                .try_collect()
                .await?;

            return Ok(results.iter().all(ModificationCheck::is_allowed));
        }

        let Some(rule) = rules.and_then(|rules| rules.modification_rule_for(path)) else {
            return Ok(true);
        };
        self.evaluate_rule(rule, record, ctx).await
    }
}

/// Whether a modified path is covered by the permitted declared paths.
///
/// A path below a declared one (`shipping.city` under `shipping`) follows
/// its nearest declared ancestor. An undeclared path that groups declared
/// ones (`nested` over `nested.ppte`) is permitted when every modified
/// declared path beneath it is permitted, and at least one was modified.
fn is_permitted(
    path: &str,
    declared: &[String],
    modified: &[String],
    permitted: &HashSet<&str>,
) -> bool {
    if permitted.contains(path) {
        return true;
    }
    if declared.iter().any(|d| d == path) {
        return false;
    }
    if let Some(ancestor) = declared_ancestor(path, declared) {
        return permitted.contains(ancestor);
    }

    let mut beneath = declared
        .iter()
        .filter(|d| {
            d.strip_prefix(path)
                .is_some_and(|rest| rest.starts_with(PATH_SEPARATOR))
        })
        .filter(|d| modified.contains(*d))
        .peekable();

    beneath.peek().is_some() && beneath.all(|d| permitted.contains(d.as_str()))
}

/// Longest declared path that is a strict prefix of `path`.
fn declared_ancestor<'a>(path: &'a str, declared: &[String]) -> Option<&'a str> {
    path.match_indices(PATH_SEPARATOR)
        .map(|(end, _)| &path[..end])
        .rfind(|prefix| declared.iter().any(|d| d == prefix))
}
