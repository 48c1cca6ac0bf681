use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use serde_json::Value;

use super::Guard;
use crate::document::{Node, Record};
use crate::error::{Error, Result};
use crate::events::GuardEvent;
use crate::rule::RuleSet;
use crate::tree::{merge_trees, tree_object};

impl<C: Send + Sync> Guard<C> {
    /// Build the view of `node` the caller is allowed to see.
    ///
    /// Records are filtered field by field with their schema's `expose`
    /// rules after passing the access gate. Maps and sequences are walked
    /// structurally and scalars are returned unchanged.
    ///
    /// Fails with [`Error::AccessDenied`] if the access gate refuses any
    /// record reached during the walk, and with [`Error::Predicate`] if a
    /// predicate fails. No partial view is returned in either case.
    pub async fn expose(&self, ctx: &C, node: &Node) -> Result<Value> {
        self.expose_node(ctx, node).await
    }

    /// [`Guard::expose`] for a record the caller already holds.
    pub async fn expose_record(&self, ctx: &C, record: &dyn Record) -> Result<Value> {
        self.expose_fields(ctx, record).await
    }

    fn expose_node<'a>(&'a self, ctx: &'a C, node: &'a Node) -> BoxFuture<'a, Result<Value>> {
        async move {
            match node {
                Node::Record(record) => self.expose_fields(ctx, record.as_ref()).await,
                Node::Map(map) => {
                    let exposures: Vec<_> = map
                        .values()
                        .map(|value| self.expose_node(ctx, value))
                        .collect();

                    let values: Vec<Value> = stream::iter(exposures)
                        .buffered(self.max_concurrent_checks)
                        .try_collect()
                        .await?;

                    Ok(Value::Object(map.keys().cloned().zip(values).collect()))
                }
                Node::Sequence(items) => {
                    let exposures: Vec<_> = items
                        .iter()
                        .map(|item| self.expose_node(ctx, item))
                        .collect();

                    let values: Vec<Value> = stream::iter(exposures)
                        .buffered(self.max_concurrent_checks)
                        .try_collect()
                        .await?;

                    Ok(Value::Array(values))
                }
                Node::Scalar(value) => Ok(value.clone()),
            }
        }
        .boxed()
    }

    async fn expose_fields(&self, ctx: &C, record: &dyn Record) -> Result<Value> {
        let schema = record.schema_id();
        // Access and field rules come from the same registry snapshot
        let rules = self.registry.get_rule(&schema);
        let rules = rules.as_deref();

        if !self.check_access(ctx, record, rules).await? {
            log::warn!("access denied to {}", schema);
            self.emit_event(GuardEvent::AccessDenied {
                schema: schema.clone(),
            });
            return Err(Error::AccessDenied {
                schema,
                message: None,
            });
        }

        let paths = record.paths();

        // Paths are checked concurrently; each yields its own subtree
        let checks: Vec<_> = paths
            .iter()
            .map(|path| self.expose_path(ctx, record, rules, path).boxed())
            .collect();

        let trees: Vec<Option<Value>> = stream::iter(checks)
            .buffered(self.max_concurrent_checks)
            .try_collect()
            .await?;

        Ok(merge_trees(trees.into_iter().flatten()))
    }

    /// Subtree for one declared path, or `None` if hidden or unset.
    async fn expose_path(
        &self,
        ctx: &C,
        record: &dyn Record,
        rules: Option<&RuleSet<C>>,
        path: &str,
    ) -> Result<Option<Value>> {
        if !self.is_exposed(ctx, record, rules, path).await? {
            return Ok(None);
        }
        let Some(node) = record.get(path) else {
            return Ok(None);
        };

        let value = self.expose_node(ctx, &node).await?;
        Ok(Some(tree_object(path, value)))
    }

    async fn is_exposed(
        &self,
        ctx: &C,
        record: &dyn Record,
        rules: Option<&RuleSet<C>>,
        path: &str,
    ) -> Result<bool> {
        let Some(rule) = rules.and_then(|rules| rules.expose_rule_for(path)) else {
            return Ok(true);
        };

        let visible = self.evaluate_rule(rule, record, ctx).await?;
        if !visible {
            log::debug!("hiding '{}' on {}", path, record.schema_id());
            self.emit_event(GuardEvent::FieldHidden {
                schema: record.schema_id(),
                path: path.to_string(),
            });
        }
        Ok(visible)
    }
}
