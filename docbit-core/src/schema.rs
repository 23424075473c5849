//! Schema declaration: turns a set of field descriptors into immutable metadata.
//!
//! A [`Schema`] is built exactly once per document type through a [`SchemaBuilder`] and is
//! then shared read-only (usually as `Arc<Schema>`) by every record and collection handle
//! of that type. Building a schema:
//!
//! 1. derives the table name (`lowercase(class name) + "s"`) unless one is given,
//! 2. injects the `_id` and `createdAt` fields, and `updatedAt` unless disabled,
//! 3. binds every descriptor to its field name and registers it,
//! 4. seeds the index list with `createdAt` ascending and `updatedAt` descending,
//! 5. collects the uniqueness keys,
//! 6. resolves every `index` validator into one or more index specs.
//!
//! # Example
//!
//! ```ignore
//! use docbit::{field::Field, schema::Schema};
//!
//! let schema = Schema::builder("User")
//!     .field("email", Field::string().unique())
//!     .field("rank", Field::int().index("desc"))
//!     .build()?;
//!
//! assert_eq!(schema.table_name(), "users");
//! assert_eq!(schema.unique_fields(), ["email"]);
//! ```

use std::collections::HashSet;
use tracing::debug;

use crate::{
    error::SchemaError,
    field::{Field, FieldDescriptor, IndexDecl},
    sort::{Sort, SortExpr, SortSpec},
};

/// Name of the object identifier field.
pub const ID_FIELD: &str = "_id";
/// Name of the creation timestamp field.
pub const CREATED_AT: &str = "createdAt";
/// Name of the update timestamp field.
pub const UPDATED_AT: &str = "updatedAt";

/// Immutable metadata describing one document type.
#[derive(Debug, Clone)]
pub struct Schema {
    class_name: String,
    table_name: String,
    fields: Vec<FieldDescriptor>,
    unique_fields: Vec<String>,
    index_fields: Vec<SortSpec>,
}

impl Schema {
    /// Starts declaring a schema for the document type named `class_name`.
    pub fn builder(class_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(class_name)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The storage namespace (collection) of this document type.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Registered field descriptors in registration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|field| field.name() == name)
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Uniqueness keys: single field names or composite keys exactly as declared.
    pub fn unique_fields(&self) -> &[String] {
        &self.unique_fields
    }

    /// Index specs in creation order. Duplicates are kept.
    pub fn index_fields(&self) -> &[SortSpec] {
        &self.index_fields
    }

    /// Whether records of this type carry an `updatedAt` timestamp.
    pub fn tracks_updated_at(&self) -> bool {
        self.contains_field(UPDATED_AT)
    }
}

/// Builder collecting the declaration of a [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    class_name: String,
    table_name: Option<String>,
    track_updated_at: bool,
    fields: Vec<(String, FieldDescriptor)>,
}

impl SchemaBuilder {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            table_name: None,
            track_updated_at: true,
            fields: Vec::new(),
        }
    }

    /// Overrides the derived table name.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Opts out of the injected `updatedAt` field and its index.
    pub fn without_updated_at(mut self) -> Self {
        self.track_updated_at = false;
        self
    }

    /// Declares a field.
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.push((name.into(), descriptor));
        self
    }

    /// Builds the schema.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for duplicate or rebound fields, redundant or dangling
    /// uniqueness keys and unparseable index expressions.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let class_name = self.class_name.trim().to_string();
        if class_name.is_empty() {
            return Err(SchemaError::EmptyClassName);
        }

        let table_name = self
            .table_name
            .unwrap_or_else(|| format!("{}s", class_name.to_lowercase()));

        let declared = self
            .fields
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<HashSet<_>>();

        let mut injected = vec![(ID_FIELD, Field::object_id()), (CREATED_AT, Field::string())];
        if self.track_updated_at {
            injected.push((UPDATED_AT, Field::string()));
        }

        let mut fields = injected
            .into_iter()
            .filter(|(name, _)| !declared.contains(name))
            .map(|(name, descriptor)| descriptor.bind(name))
            .collect::<Result<Vec<_>, _>>()?;

        for (name, descriptor) in self.fields {
            if fields.iter().any(|field| field.name() == name) {
                return Err(SchemaError::DuplicateField(name));
            }

            fields.push(descriptor.bind(&name)?);
        }

        let mut index_fields = vec![vec![Sort::asc(CREATED_AT)]];
        if fields.iter().any(|field| field.name() == UPDATED_AT) {
            index_fields.push(vec![Sort::desc(UPDATED_AT)]);
        }

        let unique_fields = resolve_unique_keys(&fields)?;

        for field in &fields {
            index_fields.extend(resolve_index(field)?);
        }

        debug!(
            class = %class_name,
            table = %table_name,
            fields = fields.len(),
            unique = unique_fields.len(),
            indexes = index_fields.len(),
            "built schema"
        );

        Ok(Schema {
            class_name,
            table_name,
            fields,
            unique_fields,
            index_fields,
        })
    }
}

/// Splits a composite key into trimmed, non-empty components.
pub fn key_components(key: &str) -> impl Iterator<Item = &str> {
    key.split(',')
        .map(str::trim)
        .filter(|component| !component.is_empty())
}

fn resolve_unique_keys(fields: &[FieldDescriptor]) -> Result<Vec<String>, SchemaError> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    for field in fields {
        let Some(key) = field.resolved_unique_key() else {
            continue;
        };

        for component in key_components(&key) {
            if !fields.iter().any(|other| other.name() == component) {
                return Err(SchemaError::UnknownUniqueComponent {
                    key: key.clone(),
                    component: component.to_string(),
                });
            }
        }

        let normalized = key_components(&key)
            .collect::<Vec<_>>()
            .join(",");

        if !seen.insert(normalized.clone()) {
            return Err(SchemaError::DuplicateUniqueKey {
                key: normalized,
                field: field.name().to_string(),
            });
        }

        keys.push(key);
    }

    Ok(keys)
}

fn resolve_index(field: &FieldDescriptor) -> Result<Vec<SortSpec>, SchemaError> {
    let name = field.name();

    Ok(match field.index_decl() {
        None => Vec::new(),
        Some(IndexDecl::Field) => vec![vec![Sort::asc(name)]],
        Some(IndexDecl::Direction(direction)) => vec![vec![Sort::new(name, *direction)]],
        Some(IndexDecl::Expression(expression)) => SortExpr::parse_strict(expression)
            .map_err(|err| SchemaError::InvalidIndex {
                field: name.to_string(),
                expression: expression.clone(),
                reason: err.to_string(),
            })?
            .into_groups(),
    })
}
