//! A schema-driven document mapper over pluggable document stores.
//!
//! This crate is the core of the docbit project and provides:
//!
//! - **Field descriptors** ([`field`]) - Type markers, uniqueness and index declarations
//! - **Schemas** ([`schema`]) - Per-type metadata built once from field declarations
//! - **Typed models** ([`model`]) - Statically declared, process-wide cached schemas
//! - **Records** ([`record`]) - Document instances with validation and persistence
//! - **Uniqueness specs** ([`spec`]) - Match criteria derived from uniqueness keys
//! - **Sort expressions** ([`sort`]) - Parsing of `"field dir, ...; ..."` expressions
//! - **Query and filtering API** ([`query`]) - Backend-neutral filter AST
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Collections** ([`collection`]) - Class-level find/count/paginate operations
//! - **Document store** ([`store`]) - Entry point owning the backend
//! - **Pagination** ([`page`]) - Page requests, settings and link windows
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docbit::prelude::*;
//!
//! let schema = Arc::new(
//!     Schema::builder("User")
//!         .field("email", Field::string().unique())
//!         .field("name", Field::string().index("asc"))
//!         .build()?,
//! );
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.collection(schema);
//!
//! let mut ann = users.build(doc! { "email": "ann@example.com", "name": "Ann" })?;
//! if !ann.save(store.backend(), SaveOptions::default()).await? {
//!     println!("{:?}", ann.errors());
//! }
//! ```

pub mod backend;
pub mod collection;
pub mod error;
pub mod field;
pub mod model;
pub mod page;
pub mod query;
pub mod record;
pub mod schema;
pub mod sort;
pub mod spec;
pub mod store;
