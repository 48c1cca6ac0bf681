//! Static rules loaded from JSON.
//!
//! Fixed (boolean) rules can be kept in a configuration file instead of
//! code. Predicates and command rules still have to be registered in code.
//!
//! ```json
//! {
//!   "Model": {
//!     "expose": { "ppte": false, "nested.ppte": false },
//!     "allowsModification": { "_id": false },
//!     "access": true
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::rule::RuleSet;

/// Fixed rules for one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaManifest {
    /// Field path to visibility
    #[serde(default)]
    pub expose: BTreeMap<String, bool>,

    /// Field path to modification permission
    #[serde(default)]
    pub allows_modification: BTreeMap<String, bool>,

    /// Record-level access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<bool>,
}

impl SchemaManifest {
    /// Convert into a rule set for any context type.
    pub fn to_rule_set<C: Send + Sync>(&self) -> RuleSet<C> {
        let mut rules = RuleSet::new();
        for (path, visible) in &self.expose {
            rules = rules.expose(path.clone(), *visible);
        }
        for (path, allowed) in &self.allows_modification {
            rules = rules.allow_modification(path.clone(), *allowed);
        }
        if let Some(access) = self.access {
            rules = rules.access(access);
        }
        rules
    }
}

/// Fixed rules for many schemas, keyed by schema name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleManifest {
    schemas: BTreeMap<String, SchemaManifest>,
}

impl RuleManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a manifest file. An empty file is an empty manifest.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::from_json_str(&contents)
    }

    pub fn get(&self, schema: &str) -> Option<&SchemaManifest> {
        self.schemas.get(schema)
    }

    /// Add or replace the entry for a schema.
    pub fn insert(&mut self, schema: impl Into<String>, entry: SchemaManifest) {
        self.schemas.insert(schema.into(), entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaManifest)> {
        self.schemas.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
