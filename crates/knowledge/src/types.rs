//! Document and collection types.

use civic_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Sentinel rendered for a field the record does not carry.
pub const MISSING_FIELD: &str = "N/A";

/// One of the two independently maintained document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Municipal-council decisions
    Legislative,
    /// Public-service descriptions
    Service,
}

impl Collection {
    /// Both collections, in the order they are reported.
    pub const ALL: [Collection; 2] = [Collection::Legislative, Collection::Service];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Legislative => "legislative",
            Collection::Service => "service",
        }
    }

    /// Parse a collection name (case-insensitive).
    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "legislative" | "hcl" => Ok(Collection::Legislative),
            "service" | "services" => Ok(Collection::Service),
            _ => Err(AppError::Knowledge(format!(
                "Unknown collection: {}. Supported: legislative, service",
                s
            ))),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single record of a collection.
///
/// Fields keep the column order of the source. A record whose embedding is
/// missing or malformed still counts as loaded; it is only skipped by ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier, unique within the collection
    pub id: String,

    /// Owning collection
    pub collection: Collection,

    /// Named text fields in source order
    pub fields: Vec<(String, String)>,

    /// Precomputed embedding
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    pub fn new(id: impl Into<String>, collection: Collection) -> Self {
        Self {
            id: id.into(),
            collection,
            fields: Vec::new(),
            embedding: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Value of a named field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of a named field, or the `N/A` sentinel.
    pub fn field_or_missing(&self, name: &str) -> &str {
        match self.field(name) {
            Some(value) if !value.trim().is_empty() => value,
            _ => MISSING_FIELD,
        }
    }
}

/// A document paired with its similarity to a query.
#[derive(Debug, Clone)]
pub struct RankedDocument {
    pub document: Arc<Document>,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_parse() {
        assert_eq!(Collection::parse("Legislative").unwrap(), Collection::Legislative);
        assert_eq!(Collection::parse("hcl").unwrap(), Collection::Legislative);
        assert_eq!(Collection::parse("services").unwrap(), Collection::Service);
        assert!(Collection::parse("mongo").is_err());
    }

    #[test]
    fn test_collection_serde() {
        let json = serde_json::to_string(&Collection::Service).unwrap();
        assert_eq!(json, "\"service\"");
    }

    #[test]
    fn test_field_lookup() {
        let doc = Document::new("0", Collection::Legislative)
            .with_field("HCL", "155/2009")
            .with_field("dataAdoptarii", "  ");

        assert_eq!(doc.field("HCL"), Some("155/2009"));
        assert_eq!(doc.field_or_missing("HCL"), "155/2009");
        assert_eq!(doc.field_or_missing("dataAdoptarii"), MISSING_FIELD);
        assert_eq!(doc.field_or_missing("motivatie_articole"), MISSING_FIELD);
    }
}
