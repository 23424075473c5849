//! Convenient re-exports of commonly used types from docbit.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docbit::prelude::*;
//! ```
//!
//! This provides access to:
//! - Schema declaration and typed models
//! - Records and their save/validate options
//! - Store backends and builders
//! - Query construction and filtering
//! - Pagination
//! - Error types

pub use bson::{Bson, Document, doc, oid::ObjectId};

pub use docbit_core::{
    backend::{FindOne, ResultSet, StoreBackend, StoreBackendBuilder, WriteOptions},
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult, SchemaError},
    field::{Field, FieldDescriptor, FieldKind},
    model::Model,
    page::{LinkWindow, PageLabels, PageLinks, PageRequest, Paginated, PaginationAdapter, PaginationArgs, PaginationConfig, TotalStrategy},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    record::{Record, SaveOptions, ValidateOptions},
    schema::{Schema, SchemaBuilder},
    sort::{SortExpr, parse_sort},
    spec::{QuerySpec, build_spec},
    store::DocumentStore,
};
