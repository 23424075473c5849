//! Error types and result types for schema declaration and document store operations.
//!
//! Two layers of errors exist:
//!
//! - [`SchemaError`] is raised while a schema is being declared. It is a developer error
//!   and is never produced by runtime data.
//! - [`DocumentStoreError`] covers everything else: serialization, field assignment,
//!   identifier parsing and failures reported by the storage backend.
//!
//! Uniqueness conflicts found during validation are *not* errors. They are collected in
//! the record's error map (see [`Record::errors`](crate::record::Record::errors)).

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Errors raised while building a [`Schema`](crate::schema::Schema).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The class name used to derive the table name was empty.
    #[error("Schema class name must not be empty")]
    EmptyClassName,
    /// A field was declared more than once on the same schema.
    #[error("Field {0} is declared more than once")]
    DuplicateField(String),
    /// A descriptor already bound to one field name was declared under another.
    #[error("Field descriptor bound to {bound} cannot be declared as {field}")]
    FieldRebound {
        /// The name the descriptor is already bound to.
        bound: String,
        /// The name it was declared under again.
        field: String,
    },
    /// Two descriptors resolve to the same uniqueness key.
    #[error("Uniqueness key \"{key}\" is declared again by field {field}")]
    DuplicateUniqueKey {
        /// The normalized uniqueness key.
        key: String,
        /// The field carrying the redundant declaration.
        field: String,
    },
    /// A composite uniqueness key names a field that is not registered on the schema.
    #[error("Uniqueness key \"{key}\" references unknown field {component}")]
    UnknownUniqueComponent {
        /// The composite key as declared.
        key: String,
        /// The component that could not be resolved.
        component: String,
    },
    /// An index declaration could not be parsed.
    #[error("Invalid index expression \"{expression}\" on field {field}: {reason}")]
    InvalidIndex {
        /// The field carrying the index declaration.
        field: String,
        /// The raw expression.
        expression: String,
        /// Why the expression was rejected.
        reason: String,
    },
}

/// Errors produced by the strict sort-expression parser used for index declarations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortParseError {
    /// The direction word is neither an ascending nor a descending keyword.
    #[error("unknown sort direction \"{0}\"")]
    UnknownDirection(String),
    /// More than one direction word followed the field name.
    #[error("unexpected words after \"{0}\"")]
    TrailingWords(String),
}

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The schema could not be declared.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A field that is not part of the schema was assigned.
    /// The first argument is the field name, the second is the table name.
    #[error("Unknown field {0} in table {1}")]
    UnknownField(String, String),
    /// A value was rejected by the field's type marker.
    #[error("Field {field} expects {expected}, got {actual}")]
    FieldType {
        /// The field being assigned.
        field: String,
        /// The declared kind.
        expected: String,
        /// The kind of the rejected value.
        actual: String,
    },
    /// The supplied object identifier could not be parsed.
    #[error("Invalid object identifier: {0}")]
    InvalidId(String),
    /// The document violates structural expectations (e.g. missing `_id`).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The requested document was not found in the table.
    /// The first argument is the document ID, the second is the table name.
    #[error("Document not found {0} in table {1}")]
    DocumentNotFound(String, String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
