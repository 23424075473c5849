//! In-memory storage implementation for document stores.
//!
//! This module provides a simple in-memory backend that keeps each table as a
//! list of BSON documents in insertion order, guarded by an async-safe
//! read-write lock.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};
use tracing::debug;

use docbit_core::{
    backend::{FindOne, ResultSet, StoreBackend, StoreBackendBuilder, WriteOptions},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query},
    schema::{ID_FIELD, Schema},
};

use crate::evaluator::{DocumentEvaluator, compare_documents, lookup};

type Table = Vec<Document>;
type StoreMap = HashMap<String, Table>;


/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait to provide a fully functional
/// document store that operates entirely in memory using async-aware read-write locks.
/// Write options are accepted and ignored; every write is immediately visible.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Queries scan all documents in a table (no indexing). Uniqueness is therefore only
/// enforced by record validation, never by the store itself.
///
/// # Example
///
/// ```ignore
/// use docbit_memory::InMemoryStore;
/// use docbit::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = DocumentStore::new(InMemoryStore::new());
///     let users = store.model::<User>()?;
///
///     users.create(doc! { "email": "ann@example.com" }).await?;
///     assert_eq!(users.total_count().await?, 1);
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// The main storage map: table name -> documents
    tables: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Names of the tables holding at least one document.
    pub async fn table_names(&self) -> Vec<String> {
        self.tables
            .read()
            .await
            .iter()
            .filter(|(_, table)| !table.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn has_id(document: &Document, id: &ObjectId) -> bool {
    matches!(document.get(ID_FIELD), Some(Bson::ObjectId(stored)) if stored == id)
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn save(&self, schema: &Schema, document: Document, _options: WriteOptions) -> DocumentStoreResult<()> {
        let id = match document.get(ID_FIELD) {
            Some(Bson::ObjectId(id)) => *id,
            _ => return Err(DocumentStoreError::InvalidDocument(format!("document saved to {} has no _id", schema.table_name()))),
        };

        let mut tables = self.tables.write().await;
        let table = tables
            .entry(schema.table_name().to_string())
            .or_default();

        match table.iter_mut().find(|stored| has_id(stored, &id)) {
            Some(stored) => *stored = document,
            None => table.push(document),
        }
        debug!(table = %schema.table_name(), %id, "saved document");

        Ok(())
    }

    async fn update(&self, schema: &Schema, filter: Expr, changes: Document, _options: WriteOptions) -> DocumentStoreResult<u64> {
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(schema.table_name()) else {
            return Ok(0);
        };

        let mut matched = 0;
        for document in table.iter_mut() {
            if DocumentEvaluator::new(document).evaluate(&filter)? {
                for (field, value) in &changes {
                    document.insert(field.clone(), value.clone());
                }
                matched += 1;
            }
        }
        debug!(table = %schema.table_name(), matched, "updated documents");

        Ok(matched)
    }

    async fn remove(&self, schema: &Schema, id: &ObjectId, _options: WriteOptions) -> DocumentStoreResult<()> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(schema.table_name());

        let position = table
            .as_ref()
            .and_then(|table| table.iter().position(|stored| has_id(stored, id)));

        match (table, position) {
            (Some(table), Some(position)) => {
                table.remove(position);
                debug!(table = %schema.table_name(), %id, "removed document");
                Ok(())
            },
            _ => Err(DocumentStoreError::DocumentNotFound(id.to_hex(), schema.table_name().to_string())),
        }
    }

    async fn find_one(&self, schema: &Schema, criteria: FindOne) -> DocumentStoreResult<Option<Document>> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(schema.table_name()) else {
            return Ok(None);
        };

        let filter = criteria.to_filter();
        for document in table {
            let matched = match &filter {
                Some(filter) => DocumentEvaluator::new(document).evaluate(filter)?,
                None => true,
            };

            if matched {
                return Ok(Some(document.clone()));
            }
        }

        Ok(None)
    }

    async fn find(&self, schema: &Schema, query: Query) -> DocumentStoreResult<ResultSet> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(schema.table_name()) else {
            return Ok(ResultSet::default());
        };

        let mut matched = DocumentEvaluator::filter_documents(table, query.filter.as_ref())?;

        if !query.sort.is_empty() {
            matched.sort_by(|left, right| compare_documents(left, right, &query.sort));
        }

        let count = matched.len() as u64;
        let documents = matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect::<Vec<_>>();
        debug!(table = %schema.table_name(), count, returned = documents.len(), "ran query");

        Ok(ResultSet { count, documents })
    }

    async fn count(&self, schema: &Schema, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(schema.table_name()) else {
            return Ok(0);
        };

        Ok(DocumentEvaluator::filter_documents(table, filter.as_ref())?.len() as u64)
    }

    async fn distinct(&self, schema: &Schema, field: &str) -> DocumentStoreResult<Vec<Bson>> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(schema.table_name()) else {
            return Ok(vec![]);
        };

        let mut values: Vec<Bson> = Vec::new();
        for document in table {
            let found = match lookup(document, field) {
                Some(Bson::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
                None => continue,
            };

            for value in found {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }

        Ok(values)
    }

    async fn ensure_indexes(&self, _schema: &Schema) -> DocumentStoreResult<()> {
        // In-memory store does not support indexing (no-op)
        Ok(())
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docbit_memory::InMemoryStore;
/// use docbit::backend::StoreBackendBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder().build().await.unwrap();
/// }
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docbit_core::{
        field::Field,
        query::{Filter, Sort},
    };

    fn schema() -> Schema {
        Schema::builder("Post")
            .field("title", Field::string())
            .field("tags", Field::array())
            .build()
            .unwrap()
    }

    async fn seeded() -> (InMemoryStore, Schema, Vec<ObjectId>) {
        let store = InMemoryStore::new();
        let schema = schema();
        let mut ids = Vec::new();

        for (title, tags) in [("b", vec!["rust"]), ("a", vec!["db", "rust"]), ("c", vec![])] {
            let id = ObjectId::new();
            store
                .save(&schema, doc! { "_id": id, "title": title, "tags": tags }, WriteOptions::default())
                .await
                .unwrap();
            ids.push(id);
        }

        (store, schema, ids)
    }

    #[tokio::test]
    async fn save_upserts_by_identifier() {
        let (store, schema, ids) = seeded().await;

        store
            .save(&schema, doc! { "_id": ids[0], "title": "B" }, WriteOptions::default())
            .await
            .unwrap();

        assert_eq!(store.count(&schema, None).await.unwrap(), 3);
        let stored = store.find_one(&schema, FindOne::by_id(ids[0])).await.unwrap().unwrap();
        assert_eq!(stored.get_str("title").unwrap(), "B");
        assert!(stored.get("tags").is_none());
    }

    #[tokio::test]
    async fn save_requires_identifier() {
        let store = InMemoryStore::new();

        assert!(store.save(&schema(), doc! { "title": "x" }, WriteOptions::default()).await.is_err());
    }

    #[tokio::test]
    async fn update_sets_fields_on_matches() {
        let (store, schema, _) = seeded().await;

        let matched = store
            .update(&schema, Filter::eq("tags", "rust"), doc! { "hot": true }, WriteOptions::default())
            .await
            .unwrap();

        assert_eq!(matched, 2);
        assert_eq!(store.count(&schema, Some(Filter::eq("hot", true))).await.unwrap(), 2);
        assert_eq!(store.count(&schema, Some(Filter::eq("title", "a"))).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_missing_document_fails() {
        let (store, schema, ids) = seeded().await;

        store.remove(&schema, &ids[1], WriteOptions::default()).await.unwrap();
        let err = store.remove(&schema, &ids[1], WriteOptions::default()).await.unwrap_err();

        assert!(matches!(err, DocumentStoreError::DocumentNotFound(_, table) if table == "posts"));
        assert_eq!(store.count(&schema, None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn find_sorts_and_windows_but_counts_all_matches() {
        let (store, schema, _) = seeded().await;

        let result = store
            .find(&schema, Query::builder().sort("title desc").offset(1).limit(1).build())
            .await
            .unwrap();

        assert_eq!(result.count, 3);
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.documents[0].get_str("title").unwrap(), "b");

        let natural = store.find(&schema, Query::new()).await.unwrap();
        let titles = natural
            .documents
            .iter()
            .map(|document| document.get_str("title").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["b", "a", "c"]);

        let sorted = store
            .find(&schema, Query { sort: vec![Sort::asc("title")], ..Query::default() })
            .await
            .unwrap();
        assert_eq!(sorted.documents[0].get_str("title").unwrap(), "a");
    }

    #[tokio::test]
    async fn distinct_flattens_arrays() {
        let (store, schema, _) = seeded().await;

        let tags = store.distinct(&schema, "tags").await.unwrap();

        assert_eq!(tags, vec![Bson::from("rust"), Bson::from("db")]);
    }

    #[tokio::test]
    async fn unknown_table_is_empty() {
        let store = InMemoryStore::builder().build().await.unwrap();
        let schema = schema();

        assert_eq!(store.count(&schema, None).await.unwrap(), 0);
        assert!(store.find_one(&schema, FindOne::default()).await.unwrap().is_none());
        assert!(store.table_names().await.is_empty());
    }
}
