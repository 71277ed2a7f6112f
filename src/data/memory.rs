//! In-memory document store
//!
//! Used for tests and `database.backend = "memory"`. Contents are lost on
//! restart.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{
    Direction, Document, DocumentStore, Fields, Query, WriteBatch, WriteOp, already_exists,
    compare_values, missing_document,
};
use crate::error::AppError;
use crate::metrics::observe_store_op;

type Collections = HashMap<String, BTreeMap<String, Fields>>;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Sort, apply the cursor and the limit to filtered documents.
fn arrange(query: &Query, mut documents: Vec<Document>) -> Vec<Document> {
    if let Some((field, direction)) = &query.order_by {
        documents.retain(|document| document.fields.contains_key(field));

        let key_order = |a: &Document, b: &Document| {
            let ordering = compare_values(&a.fields[field], &b.fields[field])
                .then_with(|| a.id.cmp(&b.id));
            match direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        };
        documents.sort_by(key_order);

        if let Some((after_value, after_id)) = &query.start_after {
            documents.retain(|document| {
                let ordering = compare_values(&document.fields[field], after_value)
                    .then_with(|| document.id.as_str().cmp(after_id.as_str()));
                match direction {
                    Direction::Ascending => ordering == Ordering::Greater,
                    Direction::Descending => ordering == Ordering::Less,
                }
            });
        }
    }

    if let Some(limit) = query.limit {
        documents.truncate(limit);
    }
    documents
}

/// Pending per-document writes of one batch; `None` marks a deletion.
type Staged = HashMap<(String, String), Option<Fields>>;

/// A document as the batch currently sees it.
fn staged_view<'a>(
    collections: &'a Collections,
    staged: &'a Staged,
    key: &(String, String),
) -> Option<&'a Fields> {
    match staged.get(key) {
        Some(pending) => pending.as_ref(),
        None => collections
            .get(&key.0)
            .and_then(|documents| documents.get(&key.1)),
    }
}

/// Apply one write on top of the store without touching it.
fn stage(collections: &Collections, staged: &mut Staged, op: WriteOp) -> Result<(), AppError> {
    match op {
        WriteOp::Create {
            collection,
            id,
            fields,
        } => {
            let key = (collection, id);
            if staged_view(collections, staged, &key).is_some() {
                return Err(already_exists(&key.0, &key.1));
            }
            staged.insert(key, Some(fields));
        }
        WriteOp::Set {
            collection,
            id,
            fields,
        } => {
            staged.insert((collection, id), Some(fields));
        }
        WriteOp::Update {
            collection,
            id,
            patch,
        } => {
            let key = (collection, id);
            let mut document = staged_view(collections, staged, &key)
                .cloned()
                .ok_or_else(|| missing_document(&key.0, &key.1))?;
            patch.apply(&mut document);
            staged.insert(key, Some(document));
        }
        WriteOp::Delete { collection, id } => {
            staged.insert((collection, id), None);
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, AppError> {
        let started = Instant::now();
        query.validate()?;

        let matching = {
            let collections = self.collections.read().await;
            collections
                .get(&query.collection)
                .map(|documents| {
                    documents
                        .iter()
                        .filter(|(_, fields)| query.matches(fields))
                        .map(|(id, fields)| Document {
                            id: id.clone(),
                            fields: fields.clone(),
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };

        let documents = arrange(query, matching);
        observe_store_op(self.backend(), "query", true, started.elapsed());
        Ok(documents)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), AppError> {
        if batch.is_empty() {
            return Ok(());
        }
        let started = Instant::now();

        let mut collections = self.collections.write().await;

        let mut staged = Staged::new();
        let outcome = batch
            .ops()
            .iter()
            .cloned()
            .try_for_each(|op| stage(&collections, &mut staged, op));

        observe_store_op(self.backend(), "commit", outcome.is_ok(), started.elapsed());
        outcome?;

        for ((name, id), pending) in staged {
            match pending {
                Some(fields) => {
                    collections.entry(name).or_default().insert(id, fields);
                }
                None => {
                    if let Some(documents) = collections.get_mut(&name) {
                        documents.remove(&id);
                        if documents.is_empty() {
                            collections.remove(&name);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn count(&self, query: &Query) -> Result<usize, AppError> {
        query.validate()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&query.collection)
            .map(|documents| {
                documents
                    .values()
                    .filter(|fields| query.matches(fields))
                    .count()
            })
            .unwrap_or(0))
    }
}
