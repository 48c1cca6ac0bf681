//! # Fieldgate
//!
//! Field-level authorization for schema-bearing documents.
//!
//! Rules are registered per schema and evaluated against a caller context
//! to decide what a caller may see, change or do with a record.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use fieldgate_core::{Document, Guard, Node, RuleRegistry, RuleSet, Schema};
//! use serde_json::json;
//!
//! struct Ctx {
//!     has_right0: bool,
//! }
//!
//! # tokio_test::block_on(async {
//! let schema = Schema::builder("Model")
//!     .field("_id")
//!     .field("ppte")
//!     .field("nested.ppte")
//!     .field("nested.ppte2")
//!     .build();
//!
//! let registry = Arc::new(RuleRegistry::<Ctx>::new());
//! registry.add_rule(
//!     "Model",
//!     RuleSet::<Ctx>::new()
//!         .expose("nested.ppte", false)
//!         .expose_if("ppte", |_, ctx| ctx.has_right0)
//!         .allow_modification("_id", false),
//! );
//!
//! let guard = Guard::new(registry);
//! let ctx = Ctx { has_right0: false };
//!
//! let model = Document::hydrate(
//!     &schema,
//!     json!({"_id": 1, "ppte": "x", "nested": {"ppte": "p", "ppte2": "q"}}),
//! );
//! let visible = guard.expose(&ctx, &Node::record(model.clone())).await.unwrap();
//! assert_eq!(visible, json!({"_id": 1, "nested": {"ppte2": "q"}}));
//!
//! let mut changed = model;
//! changed.set("_id", json!(2));
//! let check = guard.allows_modification(&ctx, &changed).await.unwrap();
//! assert_eq!(check.forbidden_paths, vec!["_id"]);
//! # });
//! ```
//!
//! ## Rules
//!
//! A [`RuleSet`] has four sections: `expose` and `allows_modification`
//! (keyed by field path), `allows` (keyed by command name) and `access`.
//! Each rule is a fixed boolean or a [`Predicate`] over the record and the
//! caller context. Anything without a rule is permitted.
//!
//! Fixed rules can also be loaded from JSON, see [`RuleManifest`].
//!
//! ## Documents
//!
//! The evaluators work on [`Node`] values. Implement [`Record`] for your
//! document type; [`Document`] is a JSON-backed implementation.
//!
//! ## Observability
//!
//! Decisions are logged through the `log` facade. Denials and predicate
//! failures are also delivered to any [`GuardHook`] added to the guard.

pub mod document;
pub mod error;
pub mod events;
pub mod guard;
pub mod registry;
pub mod rule;
pub mod tree;

pub use document::{Document, FieldKind, Node, Record, Schema, SchemaBuilder, SchemaId};
pub use error::{Error, ManifestError, PredicateError, Result};
pub use events::{GuardEvent, GuardHook};
pub use guard::{Guard, GuardBuilder, ModificationCheck, DEFAULT_MAX_CONCURRENT_CHECKS};
pub use registry::{RuleManifest, RuleRegistry, SchemaManifest};
pub use rule::{Predicate, Rule, RuleSet};
