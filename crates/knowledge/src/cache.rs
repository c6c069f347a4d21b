//! Per-collection in-memory document cache.
//!
//! Each collection holds an immutable [`CollectionSnapshot`] behind an `Arc`.
//! Readers clone the `Arc` and keep using it even while a reload swaps in a
//! replacement. Population is serialized per collection by an async mutex,
//! so concurrent first requests trigger a single read of the source.

use crate::loader::DocumentSource;
use crate::types::{Collection, Document};
use chrono::{DateTime, Utc};
use civic_core::{AppError, AppResult};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Immutable view of one collection as loaded.
#[derive(Debug)]
pub struct CollectionSnapshot {
    pub collection: Collection,
    /// Every loaded record, in source order
    pub documents: Vec<Arc<Document>>,
    /// Records whose embedding has the collection dimension, in source order
    pub rankable: Vec<Arc<Document>>,
    /// Collection embedding dimension
    pub dimension: Option<usize>,
    pub loaded_at: DateTime<Utc>,
    pub source: String,
}

impl CollectionSnapshot {
    /// Build a snapshot, fixing the collection dimension.
    ///
    /// The dimension is the configured one when given, otherwise the most
    /// frequent embedding length (ties go to the length seen first).
    pub fn build(
        collection: Collection,
        documents: Vec<Document>,
        configured_dimension: Option<usize>,
        source: impl Into<String>,
    ) -> Self {
        let documents: Vec<Arc<Document>> = documents.into_iter().map(Arc::new).collect();
        let dimension = configured_dimension.or_else(|| infer_dimension(&documents));

        let rankable: Vec<Arc<Document>> = documents
            .iter()
            .filter(|doc| match (&doc.embedding, dimension) {
                (Some(embedding), Some(dim)) => embedding.len() == dim,
                _ => false,
            })
            .cloned()
            .collect();

        let excluded = documents.len() - rankable.len();
        if excluded > 0 {
            tracing::warn!(
                "{} of {} {} documents have no embedding of dimension {:?} and are excluded from ranking",
                excluded,
                documents.len(),
                collection,
                dimension
            );
        }

        Self {
            collection,
            documents,
            rankable,
            dimension,
            loaded_at: Utc::now(),
            source: source.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            collection: self.collection,
            loaded: true,
            documents: self.documents.len(),
            rankable: self.rankable.len(),
            dimension: self.dimension,
            loaded_at: Some(self.loaded_at),
            source: self.source.clone(),
        }
    }
}

fn infer_dimension(documents: &[Arc<Document>]) -> Option<usize> {
    // (length, count) in first-seen order
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for len in documents
        .iter()
        .filter_map(|doc| doc.embedding.as_ref().map(Vec::len))
        .filter(|len| *len > 0)
    {
        match counts.iter_mut().find(|(l, _)| *l == len) {
            Some((_, count)) => *count += 1,
            None => counts.push((len, 1)),
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (len, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((len, count));
        }
    }
    best.map(|(len, _)| len)
}

/// Cache statistics for one collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub collection: Collection,
    pub loaded: bool,
    pub documents: usize,
    pub rankable: usize,
    pub dimension: Option<usize>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub source: String,
}

#[derive(Debug)]
struct Slot {
    source: Arc<dyn DocumentSource>,
    dimension: Option<usize>,
    snapshot: RwLock<Option<Arc<CollectionSnapshot>>>,
    load_guard: Mutex<()>,
}

impl Slot {
    fn current(&self) -> AppResult<Option<Arc<CollectionSnapshot>>> {
        let guard = self
            .snapshot
            .read()
            .map_err(|_| AppError::Knowledge("Document cache lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn store(&self, snapshot: Arc<CollectionSnapshot>) -> AppResult<()> {
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| AppError::Knowledge("Document cache lock poisoned".to_string()))?;
        *guard = Some(snapshot);
        Ok(())
    }

    /// A populated snapshot that can be reused without reading the source.
    fn reusable(&self) -> AppResult<Option<Arc<CollectionSnapshot>>> {
        Ok(self.current()?.filter(|snapshot| !snapshot.is_empty()))
    }
}

/// Shared cache of both collections.
#[derive(Debug, Default)]
pub struct DocumentCache {
    slots: HashMap<Collection, Slot>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the source of a collection and its expected dimension.
    pub fn with_source(
        mut self,
        collection: Collection,
        source: Arc<dyn DocumentSource>,
        dimension: Option<usize>,
    ) -> Self {
        self.slots.insert(
            collection,
            Slot {
                source,
                dimension,
                snapshot: RwLock::new(None),
                load_guard: Mutex::new(()),
            },
        );
        self
    }

    fn slot(&self, collection: Collection) -> AppResult<&Slot> {
        self.slots.get(&collection).ok_or_else(|| {
            AppError::Knowledge(format!("No document source registered for '{}'", collection))
        })
    }

    /// Load if empty, otherwise reuse.
    pub async fn load(&self, collection: Collection) -> AppResult<Arc<CollectionSnapshot>> {
        self.load_with(collection, false).await
    }

    /// Force a reload, atomically replacing the current snapshot.
    pub async fn reload(&self, collection: Collection) -> AppResult<Arc<CollectionSnapshot>> {
        self.load_with(collection, true).await
    }

    /// Load a collection, reading the source when `force` is set or when
    /// nothing has been loaded yet.
    ///
    /// An unreadable source yields an empty snapshot, never an error; an
    /// empty snapshot is read again on the next unforced load.
    pub async fn load_with(
        &self,
        collection: Collection,
        force: bool,
    ) -> AppResult<Arc<CollectionSnapshot>> {
        let slot = self.slot(collection)?;

        if !force {
            if let Some(snapshot) = slot.reusable()? {
                return Ok(snapshot);
            }
        }

        let _guard = slot.load_guard.lock().await;

        // Another task may have populated it while we waited
        if !force {
            if let Some(snapshot) = slot.reusable()? {
                return Ok(snapshot);
            }
        }

        let source = Arc::clone(&slot.source);
        let label = source.describe();
        let documents = match tokio::task::spawn_blocking(move || source.load(collection)).await {
            Ok(Ok(documents)) => documents,
            Ok(Err(e)) => {
                tracing::error!("Failed to load {} documents from {}: {}", collection, label, e);
                Vec::new()
            }
            Err(e) => {
                tracing::error!("Loader task for {} panicked: {}", collection, e);
                Vec::new()
            }
        };

        let snapshot = Arc::new(CollectionSnapshot::build(
            collection,
            documents,
            slot.dimension,
            label,
        ));
        slot.store(Arc::clone(&snapshot))?;

        tracing::info!(
            "Cached {} {} documents ({} rankable, dimension {:?})",
            snapshot.len(),
            collection,
            snapshot.rankable.len(),
            snapshot.dimension
        );

        Ok(snapshot)
    }

    /// Populate every registered collection.
    pub async fn preload(&self) -> AppResult<()> {
        for collection in self.collections() {
            self.load(collection).await?;
        }
        Ok(())
    }

    /// Reload every registered collection.
    pub async fn reload_all(&self) -> AppResult<Vec<CollectionStats>> {
        let mut stats = Vec::new();
        for collection in self.collections() {
            stats.push(self.reload(collection).await?.stats());
        }
        Ok(stats)
    }

    /// Registered collections in reporting order.
    pub fn collections(&self) -> Vec<Collection> {
        Collection::ALL
            .into_iter()
            .filter(|c| self.slots.contains_key(c))
            .collect()
    }

    /// Current stats without triggering a load.
    pub fn stats(&self) -> AppResult<Vec<CollectionStats>> {
        let mut stats = Vec::new();
        for collection in self.collections() {
            let slot = self.slot(collection)?;
            stats.push(match slot.current()? {
                Some(snapshot) => snapshot.stats(),
                None => CollectionStats {
                    collection,
                    loaded: false,
                    documents: 0,
                    rankable: 0,
                    dimension: slot.dimension,
                    loaded_at: None,
                    source: slot.source.describe(),
                },
            });
        }
        Ok(stats)
    }
}
