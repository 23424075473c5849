//! Live document instances and their validation/persistence lifecycle.
//!
//! A [`Record`] owns a field-value mapping checked against its schema's registry. Its
//! lifecycle is:
//!
//! - **new**: constructed without an `_id`; an identifier is generated and `createdAt`
//!   stamped.
//! - **loaded**: constructed with an existing `_id`.
//! - **validated**: [`Record::validate`] ran; [`Record::errors`] holds one message per
//!   conflicting uniqueness key. Invalid records are never written.
//! - **persisted**: a save or partial update succeeded; the record is no longer new.
//! - **removed**: [`Record::destroy`] consumes the record.
//!
//! Uniqueness is a best-effort check-then-act sequence. A concurrent writer can slip in
//! between the check and the write; unique indexes in the store (see
//! [`Collection::ensure_indexes`](crate::collection::Collection::ensure_indexes)) are the
//! authoritative backstop.

use bson::{Bson, Document, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{collections::BTreeMap, fmt, sync::Arc};
use tracing::{debug, warn};

use crate::{
    backend::{FindOne, StoreBackend, WriteOptions},
    error::{DocumentStoreError, DocumentStoreResult},
    field::bson_type_name,
    query::Filter,
    schema::{CREATED_AT, ID_FIELD, Schema, UPDATED_AT},
    spec::{FieldSource, build_spec},
};

/// Format of the `createdAt`/`updatedAt` timestamps.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Message recorded for a uniqueness key that collides with another document.
pub const ALREADY_TAKEN: &str = "is already taken";

/// Validation messages keyed by field name or uniqueness key.
pub type ErrorMap = BTreeMap<String, String>;

/// Current local time formatted with [`TIME_FORMAT`].
pub fn timestamp() -> String {
    chrono::Local::now()
        .format(TIME_FORMAT)
        .to_string()
}

/// Options for [`Record::validate_with`].
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Compare string values exactly instead of case-insensitively.
    pub case_sensitive: bool,
    /// Uniqueness keys to check; all of the schema's keys when `None`.
    pub fields: Option<Vec<String>>,
}

/// Options for [`Record::save`] and [`Record::save_changes`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Skip validation and treat the record as valid.
    pub skip_validation: bool,
    /// Case-sensitive uniqueness checks.
    pub case_sensitive: bool,
    /// Explicitly request an `updatedAt` refresh. Schemas registering `updatedAt` are
    /// always stamped; schemas without it never are.
    pub touch: bool,
    /// Options forwarded to the store write.
    pub write: WriteOptions,
}

impl SaveOptions {
    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn touch(mut self) -> Self {
        self.touch = true;
        self
    }

    pub fn write(mut self, write: WriteOptions) -> Self {
        self.write = write;
        self
    }
}

/// A live document of one schema.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    id: ObjectId,
    fields: Document,
    is_new: bool,
    errors: Option<ErrorMap>,
}

impl Record {
    /// Creates a record from caller-supplied field values.
    ///
    /// Without an `_id` the record is new: an identifier is generated, `createdAt` is
    /// stamped and declared defaults fill the fields the caller left out. With an `_id`
    /// the record is considered loaded.
    ///
    /// # Errors
    ///
    /// Fails if a field is not registered, a value does not fit its field's type marker
    /// or `_id` is not an object identifier.
    pub fn new(schema: Arc<Schema>, fields: Document) -> DocumentStoreResult<Self> {
        let supplied_id = match fields.get(ID_FIELD) {
            None | Some(Bson::Null) => None,
            Some(Bson::ObjectId(id)) => Some(*id),
            Some(other) => return Err(DocumentStoreError::InvalidId(other.to_string())),
        };

        let is_new = supplied_id.is_none();
        let id = supplied_id.unwrap_or_else(ObjectId::new);

        let mut record = Self {
            schema,
            id,
            fields: Document::new(),
            is_new,
            errors: None,
        };
        record.fields.insert(ID_FIELD, id);

        if is_new {
            if record.schema.contains_field(CREATED_AT) {
                record.fields.insert(CREATED_AT, timestamp());
            }

            for descriptor in record.schema.fields() {
                if let Some(default) = descriptor.default() {
                    if !fields.contains_key(descriptor.name()) {
                        record.fields.insert(descriptor.name(), default.clone());
                    }
                }
            }
        }

        for (field, value) in fields {
            if field == ID_FIELD {
                continue;
            }

            record.set(&field, value)?;
        }

        Ok(record)
    }

    /// Rebuilds a record from a document returned by the store.
    ///
    /// Fields unknown to the schema are dropped; type markers are not enforced on
    /// stored data.
    pub(crate) fn hydrate(schema: Arc<Schema>, document: Document) -> DocumentStoreResult<Self> {
        let id = match document.get(ID_FIELD) {
            Some(Bson::ObjectId(id)) => *id,
            _ => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "stored document in {} has no object identifier",
                    schema.table_name()
                )));
            }
        };

        let mut fields = Document::new();
        for (field, value) in document {
            if schema.contains_field(&field) {
                fields.insert(field, value);
            } else {
                warn!(table = %schema.table_name(), %field, "dropping field unknown to schema");
            }
        }

        Ok(Self {
            schema,
            id,
            fields,
            is_new: false,
            errors: None,
        })
    }

    /// Creates a record from any serializable value (typically a typed struct).
    pub fn from_serialize<T: Serialize>(schema: Arc<Schema>, value: &T) -> DocumentStoreResult<Self> {
        match serialize_to_bson(value)? {
            Bson::Document(fields) => Self::new(schema, fields),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "expected a document, got {}",
                bson_type_name(&other)
            ))),
        }
    }

    /// Deserializes the record's fields into a typed value.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> DocumentStoreResult<T> {
        Ok(deserialize_from_bson(Bson::Document(self.to_document()))?)
    }

    /// Converts the record's fields to JSON.
    pub fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(serde_json::to_value(&self.fields)?)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Whether the record has not been persisted yet.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Bson::as_str)
    }

    /// Assigns a field after checking it against the schema.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::UnknownField`] for unregistered fields,
    /// [`DocumentStoreError::FieldType`] for values rejected by the type marker and
    /// [`DocumentStoreError::InvalidDocument`] when reassigning `_id`.
    pub fn set(&mut self, field: &str, value: impl Into<Bson>) -> DocumentStoreResult<()> {
        let value = value.into();
        self.check_assignment(field, &value)?;
        self.fields.insert(field, value);

        Ok(())
    }

    /// Assigns every field of `source`. `_id` is never copied.
    pub fn merge<'a>(&mut self, source: impl Into<FieldSource<'a>>) -> DocumentStoreResult<()> {
        let updates = match source.into() {
            FieldSource::Raw(document) => document.clone(),
            FieldSource::Record(record) => record.to_document(),
        };

        for (field, value) in updates {
            if field != ID_FIELD {
                self.set(&field, value)?;
            }
        }

        Ok(())
    }

    /// The record's registered fields as a document, `_id` included.
    pub fn to_document(&self) -> Document {
        self.fields.clone()
    }

    /// Filters `document` down to the fields registered on the schema.
    pub fn clear_fields(&self, document: &Document) -> Document {
        document
            .iter()
            .filter(|(field, _)| self.schema.contains_field(field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }

    /// Validation messages; `None` until validation has run.
    pub fn errors(&self) -> Option<&ErrorMap> {
        self.errors.as_ref()
    }

    /// `Some(true)` if the last validation found no problems, `Some(false)` if it did,
    /// `None` if the record was never validated.
    pub fn is_valid(&self) -> Option<bool> {
        self.errors
            .as_ref()
            .map(|errors| errors.values().all(String::is_empty))
    }

    /// Validates every uniqueness key case-insensitively.
    ///
    /// Returns whether the record is valid. Store failures propagate as errors;
    /// conflicts do not.
    pub async fn validate<B>(&mut self, backend: &B) -> DocumentStoreResult<bool>
    where
        B: StoreBackend + ?Sized,
    {
        self.validate_with(backend, &ValidateOptions::default()).await
    }

    /// Resets the error map and re-runs the uniqueness checks.
    pub async fn validate_with<B>(
        &mut self,
        backend: &B,
        options: &ValidateOptions,
    ) -> DocumentStoreResult<bool>
    where
        B: StoreBackend + ?Sized,
    {
        self.errors = Some(ErrorMap::new());
        self.check_unique(backend, options.fields.as_deref(), options.case_sensitive)
            .await?;

        Ok(self.is_valid() == Some(true))
    }

    /// Looks for other documents sharing one of the given uniqueness keys and records
    /// [`ALREADY_TAKEN`] for each collision.
    ///
    /// Keys whose value is empty, or partially empty for composite keys, are skipped.
    pub async fn check_unique<B>(
        &mut self,
        backend: &B,
        fields: Option<&[String]>,
        case_sensitive: bool,
    ) -> DocumentStoreResult<()>
    where
        B: StoreBackend + ?Sized,
    {
        let keys = match fields {
            Some(fields) => fields.to_vec(),
            None => self.schema.unique_fields().to_vec(),
        };

        for key in keys {
            let Some(spec) = build_spec(&key, &*self, case_sensitive) else {
                continue;
            };

            let mut filter = spec.to_filter();
            if !self.is_new {
                filter = filter.and(Filter::ne(ID_FIELD, self.id));
            }

            let conflict = backend
                .find_one(&self.schema, FindOne::by_filter(filter))
                .await?;

            if conflict.is_some() {
                debug!(table = %self.schema.table_name(), %key, id = %self.id, "uniqueness conflict");
                self.errors
                    .get_or_insert_with(ErrorMap::new)
                    .insert(key, ALREADY_TAKEN.to_string());
            }
        }

        Ok(())
    }

    /// Validates (unless skipped), refreshes `updatedAt` and upserts the whole record.
    ///
    /// Returns `Ok(false)` without touching the store when the record is invalid;
    /// inspect [`Record::errors`] in that case.
    pub async fn save<B>(&mut self, backend: &B, options: SaveOptions) -> DocumentStoreResult<bool>
    where
        B: StoreBackend + ?Sized,
    {
        self.persist(backend, None, options).await
    }

    /// Like [`Record::save`], but writes only `changes` (plus the refreshed `updatedAt`)
    /// to the stored document. The changes are merged into the record on success.
    ///
    /// A new record, or an empty change set, falls back to assigning the changes and
    /// saving the whole record.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::DocumentNotFound`] if an acknowledged update matched no
    /// stored document. The record is left untouched in that case.
    pub async fn save_changes<B>(
        &mut self,
        backend: &B,
        changes: Document,
        options: SaveOptions,
    ) -> DocumentStoreResult<bool>
    where
        B: StoreBackend + ?Sized,
    {
        self.persist(backend, Some(changes), options).await
    }

    async fn persist<B>(
        &mut self,
        backend: &B,
        changes: Option<Document>,
        options: SaveOptions,
    ) -> DocumentStoreResult<bool>
    where
        B: StoreBackend + ?Sized,
    {
        let mut checked = Document::new();
        for (field, value) in changes.unwrap_or_default() {
            if field == ID_FIELD {
                continue;
            }
            self.check_assignment(&field, &value)?;
            checked.insert(field, value);
        }

        let partial = !checked.is_empty() && !self.is_new;
        if !partial {
            self.fields.extend(std::mem::take(&mut checked));
        }

        if options.skip_validation {
            self.errors = Some(ErrorMap::new());
        } else {
            let validate = ValidateOptions {
                case_sensitive: options.case_sensitive,
                fields: None,
            };
            self.validate_with(backend, &validate).await?;
        }

        // `updatedAt` is only ever written when the schema registers it.
        if self.schema.tracks_updated_at() {
            let target = if partial { &mut checked } else { &mut self.fields };
            target.insert(UPDATED_AT, timestamp());
        } else if options.touch {
            debug!(table = %self.schema.table_name(), "schema has no updatedAt field, ignoring touch");
        }

        if self.is_valid() != Some(true) {
            debug!(table = %self.schema.table_name(), id = %self.id, "not saving invalid record");
            return Ok(false);
        }

        if partial {
            let matched = backend
                .update(&self.schema, Filter::eq(ID_FIELD, self.id), checked.clone(), options.write)
                .await?;

            // Unacknowledged writes always report zero matches.
            if options.write.safe && matched == 0 {
                return Err(DocumentStoreError::DocumentNotFound(
                    self.id.to_hex(),
                    self.schema.table_name().to_string(),
                ));
            }
            self.fields.extend(checked);
        } else {
            backend
                .save(&self.schema, self.to_document(), options.write)
                .await?;
        }

        self.is_new = false;
        Ok(true)
    }

    /// Removes the record from the store. No validation is involved.
    ///
    /// The record is consumed; on failure, reload it from the store before retrying.
    pub async fn destroy<B>(self, backend: &B, options: WriteOptions) -> DocumentStoreResult<()>
    where
        B: StoreBackend + ?Sized,
    {
        debug!(table = %self.schema.table_name(), id = %self.id, "removing record");
        backend
            .remove(&self.schema, &self.id, options)
            .await
    }

    /// Alias of [`Record::destroy`].
    pub async fn remove<B>(self, backend: &B, options: WriteOptions) -> DocumentStoreResult<()>
    where
        B: StoreBackend + ?Sized,
    {
        self.destroy(backend, options).await
    }

    fn check_assignment(&self, field: &str, value: &Bson) -> DocumentStoreResult<()> {
        let descriptor = self.schema.field(field).ok_or_else(|| {
            DocumentStoreError::UnknownField(field.to_string(), self.schema.table_name().to_string())
        })?;

        if field == ID_FIELD && value != &Bson::ObjectId(self.id) {
            return Err(DocumentStoreError::InvalidDocument(
                "_id cannot be reassigned".to_string(),
            ));
        }

        if !descriptor.kind().accepts(value) {
            return Err(DocumentStoreError::FieldType {
                field: field.to_string(),
                expected: descriptor.kind().name().to_string(),
                actual: bson_type_name(value).to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use bson::doc;
    use serde::Deserialize;

    fn users() -> Arc<Schema> {
        Arc::new(
            Schema::builder("User")
                .field("email", Field::string().unique())
                .field("name", Field::string())
                .field("rank", Field::int().default_value(1))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn new_record_gets_identifier_and_creation_time() {
        let record = Record::new(users(), doc! { "email": "a@b.io" }).unwrap();

        assert!(record.is_new());
        assert_eq!(record.get(ID_FIELD), Some(&Bson::ObjectId(record.id())));
        assert_eq!(record.get_str(CREATED_AT).map(str::len), Some(19));
        assert_eq!(record.get("rank"), Some(&Bson::Int32(1)));
        assert_eq!(record.is_valid(), None);
        assert!(record.errors().is_none());
    }

    #[test]
    fn supplied_identifier_makes_a_loaded_record() {
        let id = ObjectId::new();
        let record = Record::new(
            users(),
            doc! { "_id": id, "email": "a@b.io", "createdAt": "2020-01-01 00:00:00" },
        )
        .unwrap();

        assert!(!record.is_new());
        assert_eq!(record.id(), id);
        assert_eq!(record.get_str(CREATED_AT), Some("2020-01-01 00:00:00"));
        assert!(record.get("rank").is_none());
    }

    #[test]
    fn non_object_identifier_is_rejected() {
        let err = Record::new(users(), doc! { "_id": "abc" }).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidId(_)));
    }

    #[test]
    fn assignments_are_checked_against_the_registry() {
        let mut record = Record::new(users(), doc! {}).unwrap();

        record.set("name", "Ann").unwrap();
        assert_eq!(record.get_str("name"), Some("Ann"));

        assert!(matches!(
            record.set("nickname", "A"),
            Err(DocumentStoreError::UnknownField(field, table)) if field == "nickname" && table == "users"
        ));
        assert!(matches!(
            record.set("rank", "first"),
            Err(DocumentStoreError::FieldType { .. })
        ));
        assert!(matches!(
            record.set(ID_FIELD, ObjectId::new()),
            Err(DocumentStoreError::InvalidDocument(_))
        ));
        record.set("name", Bson::Null).unwrap();
    }

    #[test]
    fn merge_from_raw_documents_and_records() {
        let mut record = Record::new(users(), doc! { "email": "a@b.io" }).unwrap();
        let other = Record::new(users(), doc! { "email": "c@d.io", "name": "Cid" }).unwrap();

        record.merge(&doc! { "name": "Ann", "_id": ObjectId::new() }).unwrap();
        assert_eq!(record.get_str("name"), Some("Ann"));

        let id = record.id();
        record.merge(&other).unwrap();
        assert_eq!(record.id(), id);
        assert_eq!(record.get_str("email"), Some("c@d.io"));
        assert_eq!(record.get_str("name"), Some("Cid"));

        assert!(record.merge(&doc! { "unknown": 1 }).is_err());
    }

    #[test]
    fn clear_fields_keeps_registered_fields_only() {
        let record = Record::new(users(), doc! {}).unwrap();

        assert_eq!(
            record.clear_fields(&doc! { "name": "Ann", "password": "x", "rank": 2 }),
            doc! { "name": "Ann", "rank": 2 }
        );
    }

    #[test]
    fn hydrate_drops_unknown_fields() {
        let id = ObjectId::new();
        let record = Record::hydrate(users(), doc! { "_id": id, "email": "a@b.io", "legacy": true }).unwrap();

        assert!(!record.is_new());
        assert!(record.get("legacy").is_none());
        assert!(Record::hydrate(users(), doc! { "email": "a@b.io" }).is_err());
    }

    #[test]
    fn serde_round_trip_through_typed_struct() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct User {
            email: String,
            name: String,
        }

        let user = User {
            email: "a@b.io".to_string(),
            name: "Ann".to_string(),
        };
        let record = Record::from_serialize(users(), &user).unwrap();

        assert!(record.is_new());
        assert_eq!(record.deserialize_into::<User>().unwrap(), user);
        assert_eq!(record.to_json().unwrap()["name"], "Ann");
    }
}
