//! Persisted shape of a native query.
//!
//! ```json
//! {
//!   "database": 1,
//!   "type": "native",
//!   "native": {
//!     "query": "select * from orders where id = {{id}}",
//!     "template-tags": { "id": { "id": "…", "name": "id", "display-name": "ID", "type": "number" } }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metadata::DatabaseId;
use crate::tag::TemplateTags;

/// Query type marker. Only native queries are modelled here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Native,
}

/// The native part of the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeBody {
    #[serde(default)]
    pub query: String,

    #[serde(rename = "template-tags", default)]
    pub template_tags: TemplateTags,

    /// Collection (table) for engines that query one collection at a time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// A native dataset query document.
///
/// The default value is the template for a new query: no database, empty
/// text and no tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeDatasetQuery {
    #[serde(default)]
    pub database: Option<DatabaseId>,

    #[serde(rename = "type", default)]
    pub query_type: QueryType,

    #[serde(default)]
    pub native: NativeBody,
}

impl NativeDatasetQuery {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
