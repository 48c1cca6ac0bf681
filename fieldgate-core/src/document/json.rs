//! JSON-backed reference implementation of [`Record`].
//!
//! [`Document`] plays the part of a schema-bearing document store: it knows
//! its declared paths, hydrates embedded documents from their sub-schemas
//! and tracks which paths were modified since it was loaded.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::{Node, Record, SchemaId};
use crate::tree::PATH_SEPARATOR;

/// How a declared field is hydrated from JSON.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Plain value; objects and arrays become maps and sequences
    Value,
    /// Single embedded document
    Embedded(Arc<Schema>),
    /// Array of embedded documents
    EmbeddedArray(Arc<Schema>),
    /// Reference to another document; holds an id until populated
    Reference,
}

/// Declared shape of a [`Document`].
#[derive(Debug)]
pub struct Schema {
    id: SchemaId,
    fields: Vec<(String, FieldKind)>,
}

impl Schema {
    /// Start declaring a schema.
    pub fn builder(id: impl Into<SchemaId>) -> SchemaBuilder {
        SchemaBuilder {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    /// Declared paths, in declaration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(path, _)| path.as_str())
    }

    pub fn field_kind(&self, path: &str) -> Option<&FieldKind> {
        self.fields
            .iter()
            .find(|(declared, _)| declared == path)
            .map(|(_, kind)| kind)
    }
}

/// Builder for [`Schema`].
///
/// ```rust
/// use fieldgate_core::Schema;
///
/// let item = Schema::builder("Item").field("name").build();
/// let order = Schema::builder("Order")
///     .field("_id")
///     .field("shipping.address")
///     .embedded_array("items", item)
///     .reference("customer")
///     .build();
///
/// assert_eq!(order.paths().count(), 4);
/// ```
pub struct SchemaBuilder {
    id: SchemaId,
    fields: Vec<(String, FieldKind)>,
}

impl SchemaBuilder {
    /// Declare a plain value field. Dot-paths declare nested leaves.
    pub fn field(self, path: impl Into<String>) -> Self {
        self.declare(path, FieldKind::Value)
    }

    /// Declare a single embedded document.
    pub fn embedded(self, path: impl Into<String>, schema: Arc<Schema>) -> Self {
        self.declare(path, FieldKind::Embedded(schema))
    }

    /// Declare an array of embedded documents.
    pub fn embedded_array(self, path: impl Into<String>, schema: Arc<Schema>) -> Self {
        self.declare(path, FieldKind::EmbeddedArray(schema))
    }

    /// Declare a reference to another document (or an array of them).
    pub fn reference(self, path: impl Into<String>) -> Self {
        self.declare(path, FieldKind::Reference)
    }

    fn declare(mut self, path: impl Into<String>, kind: FieldKind) -> Self {
        let path = path.into();
        self.fields.retain(|(declared, _)| *declared != path);
        self.fields.push((path, kind));
        self
    }

    pub fn build(self) -> Arc<Schema> {
        Arc::new(Schema {
            id: self.id,
            fields: self.fields,
        })
    }
}

/// A schema-bearing JSON document.
///
/// ```rust
/// use fieldgate_core::{Document, Record, Schema};
/// use serde_json::json;
///
/// let schema = Schema::builder("Model").field("ppte").field("nested.ppte").build();
///
/// // New documents count every assigned field as modified
/// let doc = Document::from_json(&schema, json!({"nested": {"ppte": "p"}}));
/// assert_eq!(doc.modified_paths(), vec!["nested", "nested.ppte"]);
///
/// // Hydrated documents start clean
/// let mut doc = Document::hydrate(&schema, json!({"ppte": "x"}));
/// assert!(doc.modified_paths().is_empty());
/// doc.set("ppte", json!("y"));
/// assert_eq!(doc.modified_paths(), vec!["ppte"]);
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    schema: Arc<Schema>,
    data: BTreeMap<String, Node>,
    modified: Vec<String>,
}

impl Document {
    /// Create an empty document with nothing modified.
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            data: BTreeMap::new(),
            modified: Vec::new(),
        }
    }

    /// Create a new (unsaved) document from JSON.
    ///
    /// Every declared field that receives a value is marked modified.
    pub fn from_json(schema: &Arc<Schema>, value: Value) -> Self {
        let mut doc = Self::new(schema);
        doc.assign(&value, true);
        doc
    }

    /// Load a document from its persisted JSON. Nothing is marked modified.
    pub fn hydrate(schema: &Arc<Schema>, value: Value) -> Self {
        let mut doc = Self::new(schema);
        doc.assign(&value, false);
        doc
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Assign a value and mark the path modified.
    ///
    /// Setting an undeclared prefix of declared paths (`nested` when
    /// `nested.ppte` is declared) assigns each declared leaf below it.
    /// Other undeclared paths are ignored.
    pub fn set(&mut self, path: &str, value: Value) {
        if let Some(kind) = self.schema.field_kind(path).cloned() {
            let node = hydrate_field(&kind, value, true);
            insert_at(&mut self.data, path, node);
            self.mark_modified(path);
            return;
        }

        let prefix = format!("{}{}", path, PATH_SEPARATOR);
        let leaves: Vec<String> = self
            .schema
            .paths()
            .filter(|declared| declared.starts_with(&prefix))
            .map(str::to_string)
            .collect();
        if leaves.is_empty() {
            log::debug!("undeclared path '{}' on {}", path, self.schema.id());
            return;
        }
        for leaf in leaves {
            if let Some(leaf_value) = lookup(&value, &leaf[prefix.len()..]) {
                self.set(&leaf, leaf_value.clone());
            }
        }
    }

    /// Append an embedded document to the array at `path`.
    pub fn push(&mut self, path: &str, doc: Document) {
        let mut items = match self.get(path) {
            Some(Node::Sequence(items)) => items,
            _ => Vec::new(),
        };
        items.push(Node::record(doc));
        insert_at(&mut self.data, path, Node::Sequence(items));
        self.mark_modified(path);
    }

    /// Replace a reference with the populated document(s).
    ///
    /// Populating does not count as a modification.
    pub fn populate(&mut self, path: &str, node: impl Into<Node>) {
        insert_at(&mut self.data, path, node.into());
    }

    /// Record `path` and its ancestor prefixes as modified.
    pub fn mark_modified(&mut self, path: &str) {
        let mut end = 0;
        for segment in path.split(PATH_SEPARATOR) {
            end += segment.len();
            let prefix = &path[..end];
            if !self.modified.iter().any(|p| p == prefix) {
                self.modified.push(prefix.to_string());
            }
            end += PATH_SEPARATOR.len_utf8();
        }
    }

    /// Forget all modifications, as after a save.
    pub fn clear_modified(&mut self) {
        self.modified.clear();
    }

    fn assign(&mut self, value: &Value, track: bool) {
        let declared: Vec<(String, FieldKind)> = self.schema.fields.clone();
        for (path, kind) in declared {
            let Some(field_value) = lookup(value, &path) else {
                continue;
            };
            let node = hydrate_field(&kind, field_value.clone(), track);
            insert_at(&mut self.data, &path, node);
            if track {
                self.mark_modified(&path);
            }
        }
    }
}

impl Record for Document {
    fn schema_id(&self) -> SchemaId {
        self.schema.id().clone()
    }

    fn paths(&self) -> Vec<String> {
        self.schema.paths().map(str::to_string).collect()
    }

    fn get(&self, path: &str) -> Option<Node> {
        let mut segments = path.split(PATH_SEPARATOR);
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            match current {
                Node::Map(map) => current = map.get(segment)?,
                _ => return None,
            }
        }
        Some(current.clone())
    }

    fn modified_paths(&self) -> Vec<String> {
        self.modified.clone()
    }
}

fn hydrate_field(kind: &FieldKind, value: Value, track: bool) -> Node {
    let child = |schema: &Arc<Schema>, value: Value| -> Node {
        if !value.is_object() {
            return Node::from(value);
        }
        if track {
            Node::record(Document::from_json(schema, value))
        } else {
            Node::record(Document::hydrate(schema, value))
        }
    };

    match (kind, value) {
        (FieldKind::Embedded(schema), value) => child(schema, value),
        (FieldKind::EmbeddedArray(schema), Value::Array(items)) => {
            Node::Sequence(items.into_iter().map(|item| child(schema, item)).collect())
        }
        (_, value) => Node::from(value),
    }
}

/// Find the JSON value at a dot-path, walking nested objects.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split(PATH_SEPARATOR)
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

fn insert_at(data: &mut BTreeMap<String, Node>, path: &str, node: Node) {
    match path.split_once(PATH_SEPARATOR) {
        None => {
            data.insert(path.to_string(), node);
        }
        Some((head, rest)) => {
            let entry = data
                .entry(head.to_string())
                .or_insert_with(|| Node::Map(BTreeMap::new()));
            if !matches!(entry, Node::Map(_)) {
                *entry = Node::Map(BTreeMap::new());
            }
            if let Node::Map(children) = entry {
                insert_at(children, rest, node);
            }
        }
    }
}
