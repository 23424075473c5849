//! Class-level operations for one document type.
//!
//! A [`Collection`] pairs a [`Schema`] with a borrowed backend. It is obtained from
//! [`DocumentStore::collection`](crate::store::DocumentStore::collection) or
//! [`DocumentStore::model`](crate::store::DocumentStore::model) and hands out
//! [`Record`]s hydrated from the store.
//!
//! # Example
//!
//! ```ignore
//! use docbit::prelude::*;
//!
//! let users = store.collection(schema);
//! let ann = users.create(doc! { "email": "ann@example.com" }).await?;
//!
//! let found = users
//!     .find(Query::builder().sort("createdAt desc").limit(10).build())
//!     .await?;
//! ```

use bson::{Bson, Document, oid::ObjectId};
use std::{str::FromStr, sync::Arc};
use tracing::debug;

use crate::{
    backend::{FindOne, ResultSet, StoreBackend},
    error::{DocumentStoreError, DocumentStoreResult},
    page::{PageRequest, Paginated, PaginationAdapter, PaginationConfig, TotalStrategy},
    query::{Expr, Query},
    record::{Record, SaveOptions},
    schema::Schema,
};

/// A document type bound to a storage backend.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    schema: Arc<Schema>,
    backend: &'a B,
    config: PaginationConfig,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(schema: Arc<Schema>, backend: &'a B, config: PaginationConfig) -> Self {
        Self { schema, backend, config }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn table_name(&self) -> &str {
        self.schema.table_name()
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    /// Creates a record without touching the store.
    pub fn build(&self, fields: Document) -> DocumentStoreResult<Record> {
        Record::new(Arc::clone(&self.schema), fields)
    }

    /// Creates a record and saves it with default options.
    ///
    /// The record is returned even when validation failed; check
    /// [`Record::errors`] to tell.
    pub async fn create(&self, fields: Document) -> DocumentStoreResult<Record> {
        let mut record = self.build(fields)?;
        record
            .save(self.backend, SaveOptions::default())
            .await?;

        Ok(record)
    }

    /// Number of documents in the table.
    pub async fn total_count(&self) -> DocumentStoreResult<u64> {
        self.backend.count(&self.schema, None).await
    }

    /// Number of documents matching `filter`.
    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .count(&self.schema, filter)
            .await
    }

    pub async fn distinct(&self, field: &str) -> DocumentStoreResult<Vec<Bson>> {
        self.backend
            .distinct(&self.schema, field)
            .await
    }

    pub async fn find_one(&self, lookup: FindOne) -> DocumentStoreResult<Option<Record>> {
        self.backend
            .find_one(&self.schema, lookup)
            .await?
            .map(|document| Record::hydrate(Arc::clone(&self.schema), document))
            .transpose()
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DocumentStoreResult<Option<Record>> {
        self.find_one(FindOne::by_id(id)).await
    }

    /// Looks a record up by the hex form of its identifier.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::InvalidId`] if `id` is not a valid object identifier.
    pub async fn find_by_id_str(&self, id: &str) -> DocumentStoreResult<Option<Record>> {
        let id = ObjectId::from_str(id).map_err(|_| DocumentStoreError::InvalidId(id.to_string()))?;
        self.find_by_id(id).await
    }

    /// Runs `query` and hydrates every returned document.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<Record>> {
        let result = self.find_result(query).await?;
        self.hydrate_all(result.documents)
    }

    /// Runs `query` and returns the raw result set, match count included.
    pub async fn find_result(&self, query: Query) -> DocumentStoreResult<ResultSet> {
        self.backend.find(&self.schema, query).await
    }

    /// Runs `query` for one page and describes the page with `adapter`.
    ///
    /// The query's own limit and offset are replaced by the page window.
    pub async fn paginate<A>(
        &self,
        query: Query,
        request: &PageRequest,
        adapter: &A,
    ) -> DocumentStoreResult<Paginated<A::Output>>
    where
        A: PaginationAdapter,
    {
        let per_page = request.resolved_per_page(&self.config);
        let skip = request.skip(&self.config);

        let query = Query {
            limit: Some(per_page),
            offset: Some(skip),
            ..query
        };
        let result = self.find_result(query).await?;

        let total = match request.total_strategy() {
            TotalStrategy::All => self.total_count().await?,
            TotalStrategy::Docs => result.count,
            TotalStrategy::Fixed(total) => total,
        };
        debug!(table = %self.table_name(), page = request.page(), per_page, found = result.count, total, "paginating");

        let args = request.to_args(&self.config, result.count, total);

        Ok(Paginated {
            records: self.hydrate_all(result.documents)?,
            pagination: adapter.paginate(&args),
            skip,
        })
    }

    /// Creates the schema's indexes and uniqueness constraints in the store.
    pub async fn ensure_indexes(&self) -> DocumentStoreResult<()> {
        self.backend
            .ensure_indexes(&self.schema)
            .await
    }

    fn hydrate_all(&self, documents: Vec<Document>) -> DocumentStoreResult<Vec<Record>> {
        documents
            .into_iter()
            .map(|document| Record::hydrate(Arc::clone(&self.schema), document))
            .collect()
    }
}
