//! Main docbit crate: a schema-driven document mapper over pluggable document stores.
//!
//! This crate is the primary entry point for users of the docbit framework.
//! It re-exports the core types and functionality from the sub-crates and provides
//! access to the storage backends.
//!
//! # Features
//!
//! - **Declarative schemas** - Fields with type markers, defaults, uniqueness keys and indexes
//! - **Record lifecycle** - New/loaded records, uniqueness validation, save, partial update and removal
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//! - **Pagination** - Page windows computed from page requests and store counts
//!
//! # Quick Start
//!
//! ```ignore
//! use docbit::{prelude::*, memory::InMemoryStore};
//!
//! struct User;
//!
//! impl Model for User {
//!     const CLASS_NAME: &'static str = "User";
//!
//!     fn declare(schema: SchemaBuilder) -> SchemaBuilder {
//!         schema
//!             .field("email", Field::string().unique())
//!             .field("name", Field::string().index("asc"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.model::<User>()?;
//!
//!     let ann = users.create(doc! { "email": "ann@example.com", "name": "Ann" }).await?;
//!     assert_eq!(ann.is_valid(), Some(true));
//!
//!     // Uniqueness is case-insensitive by default.
//!     let dup = users.create(doc! { "email": "ANN@example.com" }).await?;
//!     assert_eq!(dup.is_valid(), Some(false));
//!
//!     let page = users
//!         .paginate(Query::new(), &PageRequest::new(1).per_page(20), &LinkWindow)
//!         .await?;
//!     println!("{:?}", page.pagination);
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docbit_core::{backend, collection, error, field, model, page, query, record, schema, sort, spec, store};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docbit_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbit_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
