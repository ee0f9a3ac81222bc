//! Database metadata consumed by native queries.
//!
//! The query facade only needs a handful of facts about the target database:
//! its engine, its feature flags, the caller's native permissions and its
//! tables. [`MetadataProvider`] abstracts where those come from; [`Metadata`]
//! is a plain in-memory implementation that can be loaded from JSON:
//!
//! ```json
//! {
//!   "databases": [
//!     { "id": 1, "name": "Sample", "engine": "postgres",
//!       "features": ["native-parameters"], "native_permissions": "write",
//!       "tables": [{ "id": 10, "name": "orders" }] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Identifier of a database.
pub type DatabaseId = u64;

/// Feature flag of databases that can bind native query parameters.
pub const NATIVE_PARAMETERS_FEATURE: &str = "native-parameters";

/// Native query permission level of the current user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativePermissions {
    Write,
    #[default]
    None,
}

/// A table of a database, as needed to pick a default collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub id: u64,
    pub name: String,
}

/// A database and its capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub id: DatabaseId,
    #[serde(default)]
    pub name: String,
    pub engine: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub native_permissions: NativePermissions,
    #[serde(default)]
    pub tables: Vec<TableSummary>,
}

impl Database {
    pub fn new(id: DatabaseId, engine: impl Into<String>) -> Self {
        Self {
            id,
            name: String::new(),
            engine: engine.into(),
            features: Vec::new(),
            native_permissions: NativePermissions::None,
            tables: Vec::new(),
        }
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    pub fn with_native_permissions(mut self, permissions: NativePermissions) -> Self {
        self.native_permissions = permissions;
        self
    }

    pub fn with_table(mut self, id: u64, name: impl Into<String>) -> Self {
        self.tables.push(TableSummary {
            id,
            name: name.into(),
        });
        self
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Read-only access to database metadata.
pub trait MetadataProvider: Send + Sync {
    fn database(&self, id: DatabaseId) -> Option<&Database>;
}

/// In-memory metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "MetadataFile", into = "MetadataFile")]
pub struct Metadata {
    databases: HashMap<DatabaseId, Database>,
}

impl Metadata {
    pub fn new(databases: impl IntoIterator<Item = Database>) -> Self {
        Self {
            databases: databases.into_iter().map(|db| (db.id, db)).collect(),
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.databases.insert(database.id, database);
        self
    }

    /// Stand-in metadata for a document loaded on its own: the database it
    /// names, if any, is assumed to support `feature`. No database means no
    /// metadata.
    pub fn assumed(database: Option<DatabaseId>, feature: impl Into<String>) -> Self {
        match database {
            Some(id) => {
                Self::default().with_database(Database::new(id, "unknown").with_feature(feature))
            }
            None => Self::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn databases(&self) -> impl Iterator<Item = &Database> {
        self.databases.values()
    }
}

impl MetadataProvider for Metadata {
    fn database(&self, id: DatabaseId) -> Option<&Database> {
        self.databases.get(&id)
    }
}

#[derive(Serialize, Deserialize)]
struct MetadataFile {
    #[serde(default)]
    databases: Vec<Database>,
}

impl From<MetadataFile> for Metadata {
    fn from(file: MetadataFile) -> Self {
        Metadata::new(file.databases)
    }
}

impl From<Metadata> for MetadataFile {
    fn from(metadata: Metadata) -> Self {
        let mut databases: Vec<Database> = metadata.databases.into_values().collect();
        databases.sort_by_key(|db| db.id);
        MetadataFile { databases }
    }
}
