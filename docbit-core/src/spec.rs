//! Query specs built from uniqueness keys.
//!
//! [`build_spec`] reads the value of a (possibly composite) key from a source document and
//! produces the match criteria a uniqueness check hands to the store. Values are matched
//! either exactly or, when case sensitivity is not requested, with an anchored and fully
//! escaped case-insensitive pattern.
//!
//! An empty or absent component makes the whole key unenforceable, so no spec is built.

use bson::{Bson, Document};

use crate::{
    query::{Expr, Filter},
    record::Record,
    schema::key_components,
};

/// Where field values are read from: a raw mapping or a live record.
#[derive(Debug, Clone, Copy)]
pub enum FieldSource<'a> {
    Raw(&'a Document),
    Record(&'a Record),
}

impl<'a> FieldSource<'a> {
    pub fn get(&self, field: &str) -> Option<&'a Bson> {
        match self {
            FieldSource::Raw(document) => document.get(field),
            FieldSource::Record(record) => record.get(field),
        }
    }
}

impl<'a> From<&'a Document> for FieldSource<'a> {
    fn from(document: &'a Document) -> Self {
        FieldSource::Raw(document)
    }
}

impl<'a> From<&'a Record> for FieldSource<'a> {
    fn from(record: &'a Record) -> Self {
        FieldSource::Record(record)
    }
}

/// Match criterion for one field of a spec.
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    /// The stored value must equal this value.
    Exact(Bson),
    /// The stored string must match this anchored pattern, ignoring case.
    Pattern(String),
}

/// Field-to-match mapping produced by [`build_spec`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    matches: Vec<(String, Match)>,
}

impl QuerySpec {
    pub fn get(&self, field: &str) -> Option<&Match> {
        self.matches
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, criterion)| criterion)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.matches
            .iter()
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Converts the spec into a filter expression (a conjunction for composite keys).
    pub fn to_filter(&self) -> Expr {
        let mut exprs = self
            .matches
            .iter()
            .map(|(field, criterion)| match criterion {
                Match::Exact(value) => Filter::eq(field.as_str(), value.clone()),
                Match::Pattern(pattern) => Filter::matches_ignore_case(field.as_str(), pattern.as_str()),
            })
            .collect::<Vec<_>>();

        if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::And(exprs)
        }
    }
}

/// Returns `true` for absent-like values: null, empty strings, arrays and documents.
pub fn is_empty_value(value: &Bson) -> bool {
    match value {
        Bson::Null => true,
        Bson::String(s) => s.is_empty(),
        Bson::Array(items) => items.is_empty(),
        Bson::Document(document) => document.is_empty(),
        _ => false,
    }
}

/// Normalizes a value into a match criterion.
///
/// Strings become anchored, escaped, case-insensitive patterns unless `case_sensitive`
/// is set. Other values always match exactly. Empty values yield `None`.
pub fn normalize_value(value: Option<&Bson>, case_sensitive: bool) -> Option<Match> {
    let value = value.filter(|value| !is_empty_value(value))?;

    Some(match value {
        Bson::String(s) if !case_sensitive => Match::Pattern(format!("^{}$", regex::escape(s))),
        _ => Match::Exact(value.clone()),
    })
}

/// Builds the spec for `field` (a single name or a comma separated composite key)
/// from `source`. Returns `None` if any component is empty or absent.
pub fn build_spec<'a>(
    field: &str,
    source: impl Into<FieldSource<'a>>,
    case_sensitive: bool,
) -> Option<QuerySpec> {
    let source = source.into();
    let mut matches = Vec::new();

    for component in key_components(field) {
        let criterion = normalize_value(source.get(component), case_sensitive)?;
        matches.push((component.to_string(), criterion));
    }

    if matches.is_empty() {
        return None;
    }

    Some(QuerySpec { matches })
}
