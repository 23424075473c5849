//! Storage backend abstraction for the document mapper.
//!
//! The mapper never talks to a datastore itself. Every persistence operation is delegated
//! to a [`StoreBackend`], parameterized by the document type's [`Schema`] (which carries
//! the table name, registry, uniqueness keys and index specs).
//!
//! # Overview
//!
//! | Operation        | Purpose                                                    |
//! |------------------|------------------------------------------------------------|
//! | `save`           | full upsert of a document, keyed by its `_id`              |
//! | `update`         | partial update of every document matching a filter         |
//! | `remove`         | removal by identifier                                      |
//! | `find_one`       | first document matching an identifier and/or filter        |
//! | `find`           | filtered, sorted, paginated scan                           |
//! | `count`          | number of documents matching a filter                      |
//! | `distinct`       | distinct values of one field                               |
//! | `ensure_indexes` | create the schema's indexes and unique constraints         |
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`; the mapper issues at most one outstanding call
//! per logical operation and leaves pooling and request serialization to the backend.
//!
//! # Error Handling
//!
//! Backend failures are returned unmodified to the caller. The mapper never retries.

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    query::{Expr, Filter, Query},
    schema::{ID_FIELD, Schema},
};

/// Options accepted by every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Whether the caller wants a durability-acknowledged write.
    pub safe: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { safe: true }
    }
}

impl WriteOptions {
    /// Fire-and-forget write.
    pub fn unacknowledged() -> Self {
        Self { safe: false }
    }
}

/// Lookup criteria for [`StoreBackend::find_one`]. Identifier and filter combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOne {
    pub id: Option<ObjectId>,
    pub filter: Option<Expr>,
}

impl FindOne {
    pub fn by_id(id: ObjectId) -> Self {
        Self { id: Some(id), filter: None }
    }

    pub fn by_filter(filter: Expr) -> Self {
        Self { id: None, filter: Some(filter) }
    }

    /// The combined filter, or `None` to match any document.
    pub fn to_filter(&self) -> Option<Expr> {
        let by_id = self.id.map(|id| Filter::eq(ID_FIELD, id));

        match (by_id, self.filter.clone()) {
            (Some(by_id), Some(filter)) => Some(by_id.and(filter)),
            (by_id, filter) => by_id.or(filter),
        }
    }
}

/// Documents returned by [`StoreBackend::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Number of documents matching the filter, ignoring offset and limit.
    pub count: u64,
    /// The documents of the requested window.
    pub documents: Vec<Document>,
}

/// Abstract interface for document storage backends.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts or replaces `document` (which carries its `_id`) in the schema's table.
    async fn save(
        &self,
        schema: &Schema,
        document: Document,
        options: WriteOptions,
    ) -> DocumentStoreResult<()>;

    /// Sets the fields of `changes` on every document matching `filter`.
    ///
    /// Returns the number of matched documents.
    async fn update(
        &self,
        schema: &Schema,
        filter: Expr,
        changes: Document,
        options: WriteOptions,
    ) -> DocumentStoreResult<u64>;

    /// Removes the document with the given identifier.
    async fn remove(
        &self,
        schema: &Schema,
        id: &ObjectId,
        options: WriteOptions,
    ) -> DocumentStoreResult<()>;

    /// Returns the first document matching `lookup`, if any.
    async fn find_one(
        &self,
        schema: &Schema,
        lookup: FindOne,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Runs a query against the schema's table.
    async fn find(&self, schema: &Schema, query: Query) -> DocumentStoreResult<ResultSet>;

    /// Counts documents matching `filter`, or every document when `None`.
    async fn count(&self, schema: &Schema, filter: Option<Expr>) -> DocumentStoreResult<u64>;

    /// Returns the distinct values stored under `field`.
    async fn distinct(&self, schema: &Schema, field: &str) -> DocumentStoreResult<Vec<Bson>>;

    /// Creates the schema's indexes and a unique index per uniqueness key.
    ///
    /// Backends without index support may treat this as a no-op.
    async fn ensure_indexes(&self, schema: &Schema) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_one_combines_id_and_filter() {
        let id = ObjectId::new();

        assert_eq!(FindOne::default().to_filter(), None);
        assert_eq!(FindOne::by_id(id).to_filter(), Some(Filter::eq(ID_FIELD, id)));
        assert_eq!(
            FindOne {
                id: Some(id),
                filter: Some(Filter::eq("email", "a@b.io")),
            }
            .to_filter(),
            Some(Expr::And(vec![Filter::eq(ID_FIELD, id), Filter::eq("email", "a@b.io")]))
        );
    }
}
