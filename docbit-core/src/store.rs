//! Main document store interface.
//!
//! [`DocumentStore`] owns a backend and the pagination settings shared by every
//! [`Collection`] it hands out.
//!
//! # Example
//!
//! ```ignore
//! use docbit::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend).with_config(config);
//! let users = store.model::<User>()?;
//! users.ensure_indexes().await?;
//! ```

use std::sync::Arc;

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::DocumentStoreResult,
    model::Model,
    page::PaginationConfig,
    schema::Schema,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    config: PaginationConfig,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend and default settings.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: PaginationConfig::default(),
        }
    }

    /// Replaces the pagination settings inherited by collections.
    pub fn with_config(mut self, config: PaginationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets the collection of documents described by `schema`.
    pub fn collection(&self, schema: Arc<Schema>) -> Collection<'_, B> {
        Collection::new(schema, &self.backend, self.config.clone())
    }

    /// Gets the collection of a typed model, building its schema on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the model's schema declaration is invalid.
    pub fn model<M: Model>(&self) -> DocumentStoreResult<Collection<'_, B>> {
        Ok(self.collection(M::schema()?))
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// This consumes the store and should be called when no longer needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}
