//! Field descriptors: the declarative half of a schema.
//!
//! A [`FieldDescriptor`] describes one document attribute: its type marker, whether it
//! takes part in a uniqueness key, whether it is indexed, and an optional default value.
//! Descriptors are created through the [`Field`] constructors and handed to a
//! [`SchemaBuilder`](crate::schema::SchemaBuilder), which binds each one to its field name.
//!
//! ```ignore
//! use docbit::field::Field;
//!
//! let email = Field::string().unique();
//! let rank = Field::int().index("desc");
//! let tenant = Field::string().unique_with("tenant, slug").index("tenant, slug desc");
//! ```

use bson::Bson;

use crate::{error::SchemaError, sort::SortDirection};

/// Type marker of a field. Assignments are checked against it.
///
/// `Null` is accepted by every kind; it stands for an absent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    Any,
    ObjectId,
    String,
    Int,
    /// Floating point; integers are accepted as well.
    Float,
    Bool,
    DateTime,
    Array,
    Document,
}

impl FieldKind {
    /// Returns `true` if `value` may be stored in a field of this kind.
    pub fn accepts(&self, value: &Bson) -> bool {
        match (self, value) {
            (_, Bson::Null) | (FieldKind::Any, _) => true,
            (FieldKind::ObjectId, Bson::ObjectId(_)) => true,
            (FieldKind::String, Bson::String(_)) => true,
            (FieldKind::Int, Bson::Int32(_) | Bson::Int64(_)) => true,
            (FieldKind::Float, Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_)) => true,
            (FieldKind::Bool, Bson::Boolean(_)) => true,
            (FieldKind::DateTime, Bson::DateTime(_)) => true,
            (FieldKind::Array, Bson::Array(_)) => true,
            (FieldKind::Document, Bson::Document(_)) => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::ObjectId => "objectid",
            FieldKind::String => "string",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Bool => "bool",
            FieldKind::DateTime => "datetime",
            FieldKind::Array => "array",
            FieldKind::Document => "document",
        }
    }
}

/// Name of the BSON type of `value`, used in assignment errors.
pub(crate) fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Null => "null",
        Bson::ObjectId(_) => "objectid",
        Bson::String(_) => "string",
        Bson::Int32(_) | Bson::Int64(_) => "int",
        Bson::Double(_) => "float",
        Bson::Boolean(_) => "bool",
        Bson::DateTime(_) => "datetime",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        _ => "other",
    }
}

/// The `unique` validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueKey {
    /// The field alone is the uniqueness key.
    Field,
    /// The field participates in a composite key given as a comma separated field list.
    Composite(String),
}

/// The `index` validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexDecl {
    /// Ascending index on the field alone.
    Field,
    /// Index on the field alone with an explicit direction.
    Direction(SortDirection),
    /// A sort expression describing one or more (composite) indexes.
    Expression(String),
}

impl From<SortDirection> for IndexDecl {
    fn from(direction: SortDirection) -> Self {
        IndexDecl::Direction(direction)
    }
}

impl From<&str> for IndexDecl {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => IndexDecl::Direction(SortDirection::Asc),
            "desc" => IndexDecl::Direction(SortDirection::Desc),
            _ => IndexDecl::Expression(value.to_string()),
        }
    }
}

impl From<String> for IndexDecl {
    fn from(value: String) -> Self {
        IndexDecl::from(value.as_str())
    }
}

/// Declaration of a single document attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    unique: Option<UniqueKey>,
    index: Option<IndexDecl>,
    default: Option<Bson>,
}

impl FieldDescriptor {
    /// Creates an unbound descriptor with no validators.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            name: String::new(),
            kind,
            unique: None,
            index: None,
            default: None,
        }
    }

    /// Uses this field alone as a uniqueness key.
    pub fn unique(mut self) -> Self {
        self.unique = Some(UniqueKey::Field);
        self
    }

    /// Declares participation in a composite uniqueness key, e.g. `"tenant, slug"`.
    pub fn unique_with(mut self, key: impl Into<String>) -> Self {
        self.unique = Some(UniqueKey::Composite(key.into()));
        self
    }

    /// Ascending index on this field alone.
    pub fn indexed(mut self) -> Self {
        self.index = Some(IndexDecl::Field);
        self
    }

    /// Index declaration: a direction (`"asc"`, `"desc"`, [`SortDirection`]) or a sort
    /// expression describing composite indexes.
    pub fn index(mut self, index: impl Into<IndexDecl>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Value stored on new records that do not supply this field.
    pub fn default_value(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// The bound field name; empty until the descriptor is registered on a schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn unique_key(&self) -> Option<&UniqueKey> {
        self.unique.as_ref()
    }

    pub fn index_decl(&self) -> Option<&IndexDecl> {
        self.index.as_ref()
    }

    pub fn default(&self) -> Option<&Bson> {
        self.default.as_ref()
    }

    /// The uniqueness key this descriptor contributes, exactly as declared.
    pub fn resolved_unique_key(&self) -> Option<String> {
        self.unique
            .as_ref()
            .map(|unique| match unique {
                UniqueKey::Field => self.name.clone(),
                UniqueKey::Composite(key) => key.clone(),
            })
    }

    /// Binds the descriptor to `name`. A descriptor bound once keeps its name.
    pub(crate) fn bind(mut self, name: &str) -> Result<Self, SchemaError> {
        if !self.name.is_empty() && self.name != name {
            return Err(SchemaError::FieldRebound {
                bound: self.name,
                field: name.to_string(),
            });
        }

        self.name = name.to_string();
        Ok(self)
    }
}

/// Constructors for field descriptors, one per type marker.
pub struct Field;

impl Field {
    pub fn any() -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::Any)
    }

    pub fn object_id() -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::ObjectId)
    }

    pub fn string() -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::String)
    }

    pub fn int() -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::Int)
    }

    pub fn float() -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::Float)
    }

    pub fn bool() -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::Bool)
    }

    pub fn datetime() -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::DateTime)
    }

    pub fn array() -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::Array)
    }

    pub fn document() -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::Document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn kinds_accept_matching_values_and_null() {
        assert!(FieldKind::String.accepts(&Bson::from("x")));
        assert!(FieldKind::String.accepts(&Bson::Null));
        assert!(!FieldKind::String.accepts(&Bson::Int32(1)));
        assert!(FieldKind::Float.accepts(&Bson::Int64(3)));
        assert!(!FieldKind::Int.accepts(&Bson::Double(1.5)));
        assert!(FieldKind::ObjectId.accepts(&Bson::ObjectId(ObjectId::new())));
        assert!(FieldKind::Document.accepts(&Bson::Document(doc! { "a": 1 })));
        assert!(FieldKind::Any.accepts(&Bson::Boolean(true)));
    }

    #[test]
    fn index_declaration_from_strings() {
        assert_eq!(IndexDecl::from("desc"), IndexDecl::Direction(SortDirection::Desc));
        assert_eq!(IndexDecl::from("ASC"), IndexDecl::Direction(SortDirection::Asc));
        assert_eq!(
            IndexDecl::from("a, b desc"),
            IndexDecl::Expression("a, b desc".to_string())
        );
    }

    #[test]
    fn descriptor_without_validators() {
        let field = Field::string();
        assert!(field.unique_key().is_none());
        assert!(field.index_decl().is_none());
        assert!(field.resolved_unique_key().is_none());
    }

    #[test]
    fn bound_descriptor_keeps_its_name() {
        let field = Field::string().unique().bind("email").unwrap();
        assert_eq!(field.resolved_unique_key().as_deref(), Some("email"));
        assert!(field.clone().bind("email").is_ok());
        assert_eq!(
            field.bind("mail"),
            Err(SchemaError::FieldRebound {
                bound: "email".to_string(),
                field: "mail".to_string(),
            })
        );
    }
}
