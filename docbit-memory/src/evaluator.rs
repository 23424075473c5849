//! Query expression evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for query expressions,
//! enabling filtering, pattern matching and ordering of BSON documents.
//! Field names may be dotted paths into embedded documents.

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use regex::{Regex, RegexBuilder};
use std::{cmp::Ordering, collections::HashMap};

use docbit_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position in the cross-type sort order (null, numbers, strings, documents,
    /// arrays, identifiers, booleans, dates).
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Whether `self` equals `other`, or holds it as an element when `self` is an array.
    fn matches(&self, other: &Comparable<'a>) -> bool {
        match self {
            Comparable::Array(items) if !matches!(other, Comparable::Array(_)) => {
                items.iter().any(|item| item == other)
            },
            _ => self == other,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a possibly dotted field path inside `document`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Total order over optional values used for sorting; missing fields sort as null.
pub(crate) fn compare_values(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    let left = left.map_or(Comparable::Null, Comparable::from);
    let right = right.map_or(Comparable::Null, Comparable::from);

    left.rank()
        .cmp(&right.rank())
        .then_with(|| {
            left.partial_cmp(&right)
                .unwrap_or(Ordering::Equal)
        })
}

/// Compares two documents key by key.
pub(crate) fn compare_documents(left: &Document, right: &Document, sort: &[Sort]) -> Ordering {
    for key in sort {
        let ordering = compare_values(lookup(left, &key.field), lookup(right, &key.field));
        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns the documents matching `expr`, or all of them when `expr` is `None`.
    ///
    /// # Errors
    ///
    /// Fails if a pattern in `expr` is not a valid regular expression.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        expr: Option<&Expr>,
    ) -> DocumentStoreResult<Vec<&'a Document>> {
        let mut matched = Vec::new();

        for document in documents {
            let keep = match expr {
                Some(expr) => DocumentEvaluator::new(document).evaluate(expr)?,
                None => true,
            };

            if keep {
                matched.push(document);
            }
        }

        Ok(matched)
    }
}

fn compile(pattern: &str, case_insensitive: bool) -> DocumentStoreResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| DocumentStoreError::Backend(format!("invalid pattern {pattern}: {e}")))
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = lookup(self.document, field) else {
            // Missing fields only satisfy negative operators.
            return Ok(matches!(op, FieldOp::Ne | FieldOp::NoneOf));
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        match op {
            FieldOp::Eq => Ok(left.matches(&right)),
            FieldOp::Ne => Ok(!left.matches(&right)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                Ok(match left.partial_cmp(&right) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                })
            },
            FieldOp::AnyOf | FieldOp::NoneOf => {
                let found = match &right {
                    Comparable::Array(values) => values.iter().any(|candidate| left.matches(candidate)),
                    single_value => left.matches(single_value),
                };

                Ok(if *op == FieldOp::AnyOf { found } else { !found })
            },
        }
    }

    fn visit_pattern(
        &mut self,
        field: &str,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self::Output, Self::Error> {
        let regex = compile(pattern, case_insensitive)?;

        Ok(match lookup(self.document, field) {
            Some(Bson::String(value)) => regex.is_match(value),
            Some(Bson::Array(items)) => items
                .iter()
                .filter_map(Bson::as_str)
                .any(|item| regex.is_match(item)),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docbit_core::query::Filter;

    fn eval(document: &Document, expr: Expr) -> bool {
        DocumentEvaluator::new(document)
            .evaluate(&expr)
            .unwrap()
    }

    #[test]
    fn comparisons_normalize_numbers() {
        let document = doc! { "rank": 3, "score": 2.5 };

        assert!(eval(&document, Filter::eq("rank", 3.0)));
        assert!(eval(&document, Filter::gt("rank", 2_i64)));
        assert!(eval(&document, Filter::lte("score", 2.5)));
        assert!(!eval(&document, Filter::lt("rank", "4")));
    }

    #[test]
    fn missing_fields_satisfy_only_negations() {
        let document = doc! { "name": "Ann" };

        assert!(!eval(&document, Filter::eq("email", "x")));
        assert!(eval(&document, Filter::ne("email", "x")));
        assert!(eval(&document, Filter::none_of("email", vec!["x"])));
        assert!(eval(&document, Filter::not_exists("email")));
    }

    #[test]
    fn equality_reaches_into_arrays() {
        let document = doc! { "tags": ["rust", "db"] };

        assert!(eval(&document, Filter::eq("tags", "db")));
        assert!(eval(&document, Filter::any_of("tags", vec!["go", "rust"])));
        assert!(!eval(&document, Filter::none_of("tags", vec!["rust"])));
    }

    #[test]
    fn object_identifiers_compare() {
        let id = ObjectId::new();
        let document = doc! { "_id": id };

        assert!(eval(&document, Filter::eq("_id", id)));
        assert!(eval(&document, Filter::ne("_id", ObjectId::new())));
    }

    #[test]
    fn patterns_honor_case_flag() {
        let document = doc! { "email": "Ann@Example.com" };

        assert!(eval(&document, Filter::matches_ignore_case("email", "^ann@example\\.com$")));
        assert!(!eval(&document, Filter::matches("email", "^ann@example\\.com$")));
        assert!(DocumentEvaluator::new(&document)
            .evaluate(&Filter::matches("email", "("))
            .is_err());
    }

    #[test]
    fn dotted_paths_resolve_embedded_documents() {
        let document = doc! { "profile": { "city": "Oslo" } };

        assert!(eval(&document, Filter::eq("profile.city", "Oslo")));
        assert!(eval(&document, Filter::exists("profile.city")));
        assert!(!eval(&document, Filter::exists("profile.zip")));
    }

    #[test]
    fn ordering_puts_missing_values_first() {
        let a = doc! { "rank": 1, "name": "b" };
        let b = doc! { "rank": 1, "name": "a" };
        let c = doc! { "name": "c" };

        let sort = [Sort::desc("rank"), Sort::asc("name")];
        let mut documents = vec![&c, &a, &b];
        documents.sort_by(|left, right| compare_documents(left, right, &sort));

        assert_eq!(documents, vec![&b, &a, &c]);
    }
}
