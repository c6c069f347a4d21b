//! Document sources for the collections.
//!
//! The CSV source reads one record per row. Every column except the
//! embedding column becomes a field, in header order; the embedding column
//! holds a text-encoded list such as `[0.12, -0.03, ...]`.

use crate::types::{Collection, Document};
use civic_core::config::CollectionConfig;
use civic_core::{AppError, AppResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Embedding column name used by the published datasets.
pub const DEFAULT_EMBEDDING_COLUMN: &str = "embedings";

/// Fallback embedding column name.
pub const FALLBACK_EMBEDDING_COLUMN: &str = "embedding";

/// Identifier column used when present.
pub const DEFAULT_ID_COLUMN: &str = "_id";

/// A place documents are loaded from.
pub trait DocumentSource: Send + Sync + std::fmt::Debug {
    /// Short label for logs and stats.
    fn describe(&self) -> String;

    /// Read every document of the collection.
    fn load(&self, collection: Collection) -> AppResult<Vec<Document>>;
}

/// CSV file source.
#[derive(Debug, Clone)]
pub struct CsvDocumentSource {
    path: PathBuf,
    embedding_column: Option<String>,
    id_column: Option<String>,
}

impl CsvDocumentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            embedding_column: None,
            id_column: None,
        }
    }

    pub fn from_config(config: &CollectionConfig) -> Self {
        Self {
            path: config.source.clone(),
            embedding_column: config.embedding_column.clone(),
            id_column: config.id_column.clone(),
        }
    }

    pub fn with_embedding_column(mut self, column: impl Into<String>) -> Self {
        self.embedding_column = Some(column.into());
        self
    }

    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
        headers.iter().position(|h| h.trim() == name)
    }

    fn embedding_index(&self, headers: &csv::StringRecord) -> Option<usize> {
        match &self.embedding_column {
            Some(name) => Self::find_column(headers, name),
            None => Self::find_column(headers, DEFAULT_EMBEDDING_COLUMN)
                .or_else(|| Self::find_column(headers, FALLBACK_EMBEDDING_COLUMN)),
        }
    }
}

/// Parse a text-encoded vector; `None` when the cell is empty.
pub fn parse_embedding(raw: &str) -> Option<Result<Vec<f32>, serde_json::Error>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(serde_json::from_str::<Vec<f32>>(raw))
}

impl DocumentSource for CsvDocumentSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self, collection: Collection) -> AppResult<Vec<Document>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| {
                AppError::Knowledge(format!("Failed to open {:?}: {}", self.path, e))
            })?;

        let headers = reader
            .headers()
            .map_err(|e| AppError::Knowledge(format!("Failed to read CSV header: {}", e)))?
            .clone();

        let embedding_idx = self.embedding_index(&headers);
        if embedding_idx.is_none() {
            tracing::warn!(
                "No embedding column in {:?}; '{}' documents cannot be ranked",
                self.path,
                collection
            );
        }
        let id_column = self.id_column.as_deref().unwrap_or(DEFAULT_ID_COLUMN);
        let id_idx = Self::find_column(&headers, id_column);

        let mut rows = Vec::new();
        for (row, record) in reader.records().enumerate() {
            match record {
                Ok(record) => rows.push((row, record)),
                Err(e) => {
                    tracing::warn!("Skipping unreadable row {} in {:?}: {}", row, self.path, e);
                }
            }
        }

        let explicit_id = |record: &csv::StringRecord| {
            id_idx
                .and_then(|idx| record.get(idx))
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        };
        let mut ids =
            DocumentIds::new(rows.iter().filter_map(|(_, record)| explicit_id(record)));

        let mut documents = Vec::with_capacity(rows.len());
        let mut malformed = 0usize;

        for (row, record) in rows {
            let id = ids.assign(explicit_id(&record), row);
            if let Some(wanted) = explicit_id(&record).filter(|wanted| *wanted != id) {
                tracing::warn!(
                    "Duplicate {} id '{}' in {:?}, using '{}'",
                    collection,
                    wanted,
                    self.path,
                    id
                );
            }

            let mut document = Document::new(id, collection);
            for (idx, value) in record.iter().enumerate() {
                if Some(idx) == embedding_idx {
                    continue;
                }
                let name = headers.get(idx).unwrap_or_default().trim();
                document.fields.push((name.to_string(), value.to_string()));
            }

            if let Some(raw) = embedding_idx.and_then(|idx| record.get(idx)) {
                match parse_embedding(raw) {
                    Some(Ok(embedding)) => document.embedding = Some(embedding),
                    Some(Err(e)) => {
                        malformed += 1;
                        tracing::warn!(
                            "Malformed embedding for {} document {}: {}",
                            collection,
                            document.id,
                            e
                        );
                    }
                    None => {
                        tracing::debug!("{} document {} has no embedding", collection, document.id)
                    }
                }
            }

            documents.push(document);
        }

        tracing::info!(
            "Loaded {} {} documents from {:?} ({} malformed embeddings)",
            documents.len(),
            collection,
            self.path,
            malformed
        );

        Ok(documents)
    }
}

/// Keeps document ids unique within one load.
///
/// Explicit ids are reserved up front so a generated id (the row index)
/// never takes one that appears later in the file.
struct DocumentIds {
    reserved: HashSet<String>,
    used: HashSet<String>,
}

impl DocumentIds {
    fn new(explicit: impl IntoIterator<Item = String>) -> Self {
        Self {
            reserved: explicit.into_iter().collect(),
            used: HashSet::new(),
        }
    }

    fn assign(&mut self, explicit: Option<String>, row: usize) -> String {
        let base = match explicit {
            Some(id) if !self.used.contains(&id) => {
                self.used.insert(id.clone());
                return id;
            }
            Some(id) => id,
            None => row.to_string(),
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while self.used.contains(&candidate) || self.reserved.contains(&candidate) {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// In-memory source, replaceable at runtime.
#[derive(Debug, Default)]
pub struct InMemorySource {
    documents: RwLock<Vec<Document>>,
}

impl InMemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Replace the documents served by the next load.
    pub fn replace(&self, documents: Vec<Document>) -> AppResult<()> {
        let mut guard = self
            .documents
            .write()
            .map_err(|_| AppError::Knowledge("In-memory source lock poisoned".to_string()))?;
        *guard = documents;
        Ok(())
    }
}

impl DocumentSource for InMemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn load(&self, collection: Collection) -> AppResult<Vec<Document>> {
        let guard = self
            .documents
            .read()
            .map_err(|_| AppError::Knowledge("In-memory source lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .cloned()
            .map(|mut doc| {
                doc.collection = collection;
                doc
            })
            .collect())
    }
}
