//! Context blocks handed to the answer generator.

use crate::types::{Collection, Document, RankedDocument};

/// `(field name, label)` pairs for council decisions.
pub const LEGISLATIVE_LAYOUT: &[(&str, &str)] = &[
    ("HCL", "Decision"),
    ("dataAdoptarii", "Adoption date"),
    ("motivatie_articole", "Rationale and articles"),
];

/// `(field name, label)` pairs for public services.
pub const SERVICE_LAYOUT: &[(&str, &str)] = &[
    ("service_id", "Service ID"),
    ("name", "Name"),
    ("url", "URL"),
    ("Lista_mentiuni", "Mentions"),
    ("QuerryHCL", "Linked decisions"),
    ("Service_text", "Service text"),
];

/// Field layout of a collection.
pub fn layout(collection: Collection) -> &'static [(&'static str, &'static str)] {
    match collection {
        Collection::Legislative => LEGISLATIVE_LAYOUT,
        Collection::Service => SERVICE_LAYOUT,
    }
}

/// Render one document as `Label: value` lines.
pub fn format_document(document: &Document) -> String {
    layout(document.collection)
        .iter()
        .map(|(field, label)| format!("{}: {}", label, document.field_or_missing(field)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render documents in order, one block each, separated by a blank line.
pub fn format(documents: &[RankedDocument]) -> String {
    documents
        .iter()
        .map(|ranked| format_document(&ranked.document))
        .collect::<Vec<_>>()
        .join("\n\n")
}
