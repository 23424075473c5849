//! MongoDB implementation of the document store backend.

use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, doc, oid::ObjectId};
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    options::{Acknowledgment, ClientOptions, FindOptions, IndexOptions, WriteConcern},
};
use tracing::debug;
use docbit_core::{
    backend::{FindOne, ResultSet, StoreBackend, StoreBackendBuilder, WriteOptions},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query, QueryVisitor, Sort},
    schema::{ID_FIELD, Schema, key_components},
};

use crate::query::MongoQueryTranslator;


fn backend_error(e: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(e.to_string())
}

fn write_concern(options: WriteOptions) -> WriteConcern {
    WriteConcern::builder()
        .w(Acknowledgment::Nodes(if options.safe { 1 } else { 0 }))
        .build()
}

/// Window and ordering of a query. Out-of-range limits and offsets saturate.
fn find_options(query: &Query) -> FindOptions {
    let mut options = FindOptions::default();

    if let Some(limit) = query.limit {
        options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    if let Some(skip) = query.offset {
        options.skip = Some(u64::try_from(skip).unwrap_or(u64::MAX));
    }
    if !query.sort.is_empty() {
        options.sort = Some(MongoQueryTranslator::keys(&query.sort));
    }

    options
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, schema: &Schema) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(schema.table_name())
    }

    /// Index models for the schema: one per index spec, one unique index per uniqueness key.
    pub(crate) fn index_models(schema: &Schema) -> Vec<IndexModel> {
        let indexes = schema
            .index_fields()
            .iter()
            .map(|spec| IndexModel::builder()
                .keys(MongoQueryTranslator::keys(spec))
                .build()
            );

        let unique = schema
            .unique_fields()
            .iter()
            .map(|key| IndexModel::builder()
                .keys(MongoQueryTranslator::keys(
                    &key_components(key)
                        .map(Sort::asc)
                        .collect::<Vec<_>>()
                ))
                .options(
                    IndexOptions::builder()
                    .unique(true)
                    .build()
                )
                .build()
            );

        indexes.chain(unique).collect()
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn save(&self, schema: &Schema, document: Document, options: WriteOptions) -> DocumentStoreResult<()> {
        let id = match document.get(ID_FIELD) {
            Some(Bson::ObjectId(id)) => *id,
            _ => return Err(DocumentStoreError::InvalidDocument(format!("document saved to {} has no _id", schema.table_name()))),
        };

        self.get_collection(schema)
            .replace_one(doc! { ID_FIELD: id }, document)
            .upsert(true)
            .write_concern(write_concern(options))
            .await
            .map_err(backend_error)?;
        debug!(table = %schema.table_name(), %id, safe = options.safe, "saved document");

        Ok(())
    }

    async fn update(&self, schema: &Schema, filter: Expr, changes: Document, options: WriteOptions) -> DocumentStoreResult<u64> {
        let result = self.get_collection(schema)
            .update_many(
                MongoQueryTranslator.visit_expr(&filter)?,
                doc! { "$set": changes },
            )
            .write_concern(write_concern(options))
            .await
            .map_err(backend_error)?;
        debug!(table = %schema.table_name(), matched = result.matched_count, "updated documents");

        Ok(result.matched_count)
    }

    async fn remove(&self, schema: &Schema, id: &ObjectId, options: WriteOptions) -> DocumentStoreResult<()> {
        let result = self.get_collection(schema)
            .delete_one(doc! { ID_FIELD: *id })
            .write_concern(write_concern(options))
            .await
            .map_err(backend_error)?;

        // Unacknowledged writes always report zero deletions.
        if options.safe && result.deleted_count == 0 {
            return Err(DocumentStoreError::DocumentNotFound(id.to_hex(), schema.table_name().to_string()));
        }
        debug!(table = %schema.table_name(), %id, "removed document");

        Ok(())
    }

    async fn find_one(&self, schema: &Schema, criteria: FindOne) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(schema)
            .find_one(MongoQueryTranslator::filter(criteria.to_filter().as_ref())?)
            .await
            .map_err(backend_error)
    }

    async fn find(&self, schema: &Schema, query: Query) -> DocumentStoreResult<ResultSet> {
        let filter = MongoQueryTranslator::filter(query.filter.as_ref())?;
        let options = find_options(&query);

        let collection = self.get_collection(schema);
        let count = collection
            .count_documents(filter.clone())
            .await
            .map_err(backend_error)?;

        let documents = collection
            .find(filter)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?;
        debug!(table = %schema.table_name(), count, returned = documents.len(), "ran query");

        Ok(ResultSet { count, documents })
    }

    async fn count(&self, schema: &Schema, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.get_collection(schema)
            .count_documents(MongoQueryTranslator::filter(filter.as_ref())?)
            .await
            .map_err(backend_error)
    }

    async fn distinct(&self, schema: &Schema, field: &str) -> DocumentStoreResult<Vec<Bson>> {
        self.get_collection(schema)
            .distinct(field, doc! {})
            .await
            .map_err(backend_error)
    }

    async fn ensure_indexes(&self, schema: &Schema) -> DocumentStoreResult<()> {
        let models = Self::index_models(schema);
        if models.is_empty() {
            return Ok(());
        }

        self.get_collection(schema)
            .create_indexes(models)
            .await
            .map_err(backend_error)?;
        debug!(table = %schema.table_name(), "ensured indexes");

        Ok(())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
