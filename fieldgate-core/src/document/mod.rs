//! The document graph as seen by the evaluators.
//!
//! A host's storage layer is adapted once, at the boundary, into [`Node`]s.
//! Evaluators only ever match on the node variant; they never inspect the
//! host's own types.
//!
//! - **[`Record`]**: a schema-bearing document (trait, implemented by the host)
//! - **[`Node`]**: record, plain map, sequence or scalar
//! - **[`SchemaId`]**: registry key identifying a record's shape
//! - **[`Document`]**: a JSON-backed [`Record`] used by tests and demos

mod json;

pub use json::{Document, FieldKind, Schema, SchemaBuilder};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Opaque identity of a record's shape.
///
/// Cheap to clone; compared and hashed by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaId(Arc<str>);

impl SchemaId {
    /// Create a schema identity from a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name this identity was created with.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SchemaId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A schema-bearing document with named, addressable fields.
///
/// Implement this for the host's document type. Paths use `.` as the
/// nesting separator; a path such as `nested.ppte` must resolve through
/// [`Record::get`] on its own.
pub trait Record: Send + Sync + fmt::Debug {
    /// Identity used to look up this record's rules.
    fn schema_id(&self) -> SchemaId;

    /// Declared top-level field paths, in declaration order.
    fn paths(&self) -> Vec<String>;

    /// Value held at `path`, or `None` if the field is unset.
    fn get(&self, path: &str) -> Option<Node>;

    /// Paths whose values differ from the persisted baseline.
    fn modified_paths(&self) -> Vec<String>;
}

/// A value in the document graph.
#[derive(Debug, Clone)]
pub enum Node {
    /// Schema-bearing document (embedded, array element or populated reference)
    Record(Arc<dyn Record>),
    /// Plain keyed container with no schema
    Map(BTreeMap<String, Node>),
    /// Ordered list
    Sequence(Vec<Node>),
    /// Terminal value, including `null`
    Scalar(Value),
}

impl Node {
    /// Wrap a record.
    pub fn record(record: impl Record + 'static) -> Self {
        Self::Record(Arc::new(record))
    }

    /// The `null` scalar.
    pub fn null() -> Self {
        Self::Scalar(Value::Null)
    }

    /// Returns true if this node is a record
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    /// Get the record if this is a Record variant
    pub fn as_record(&self) -> Option<&Arc<dyn Record>> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Get the elements if this is a Sequence variant
    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Collect the elements of a non-empty sequence made only of records.
    ///
    /// Returns `None` for anything else, including an empty sequence.
    pub fn record_sequence(&self) -> Option<Vec<Arc<dyn Record>>> {
        let items = self.as_sequence()?;
        if items.is_empty() {
            return None;
        }
        items.iter().map(|item| item.as_record().cloned()).collect()
    }
}

impl From<Value> for Node {
    /// Objects become plain maps, arrays become sequences.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
            Value::Array(items) => Self::Sequence(items.into_iter().map(Node::from).collect()),
            scalar => Self::Scalar(scalar),
        }
    }
}

impl<R: Record + 'static> From<Arc<R>> for Node {
    fn from(record: Arc<R>) -> Self {
        Self::Record(record)
    }
}
