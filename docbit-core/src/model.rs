//! Typed document declarations.
//!
//! Implementing [`Model`] on a marker type declares a schema once for the whole
//! process; [`Model::schema`] builds it on first use and caches it.
//!
//! ```ignore
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
//! let users = store.model::<User>()?;
//! ```

use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

use crate::{
    error::DocumentStoreResult,
    schema::{Schema, SchemaBuilder},
};

static SCHEMAS: LazyLock<RwLock<HashMap<TypeId, Arc<Schema>>>> = LazyLock::new(|| RwLock::new(HashMap::new()));

/// A document type with a statically declared schema.
pub trait Model: 'static {
    /// Name the table name is derived from.
    const CLASS_NAME: &'static str;

    /// Declares the fields of the schema.
    fn declare(schema: SchemaBuilder) -> SchemaBuilder;

    /// The model's schema, built on first call and shared afterwards.
    ///
    /// # Errors
    ///
    /// Returns the schema error if the declaration is invalid. Nothing is cached in
    /// that case.
    fn schema() -> DocumentStoreResult<Arc<Schema>> {
        let type_id = TypeId::of::<Self>();

        if let Some(schema) = SCHEMAS
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(Self::declare(Schema::builder(Self::CLASS_NAME)).build()?);

        let mut schemas = SCHEMAS
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let schema = schemas.entry(type_id).or_insert(schema);

        Ok(Arc::clone(schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    struct Article;

    impl Model for Article {
        const CLASS_NAME: &'static str = "Article";

        fn declare(schema: SchemaBuilder) -> SchemaBuilder {
            schema
                .field("slug", Field::string().unique())
                .field("title", Field::string())
        }
    }

    struct Broken;

    impl Model for Broken {
        const CLASS_NAME: &'static str = "Broken";

        fn declare(schema: SchemaBuilder) -> SchemaBuilder {
            schema.field("title", Field::string().index("title sideways"))
        }
    }

    #[test]
    fn schema_is_built_once_and_shared() {
        let first = Article::schema().unwrap();
        let second = Article::schema().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.table_name(), "articles");
        assert_eq!(first.unique_fields(), ["slug".to_string()]);
    }

    #[test]
    fn invalid_declaration_is_reported() {
        assert!(Broken::schema().is_err());
        assert!(Broken::schema().is_err());
    }
}
