//! Sort expressions and the compact textual sort syntax.
//!
//! A sort expression is a comma separated list of field names, each optionally followed
//! by a direction word. Groups of independent sorts are separated by `;`:
//!
//! ```ignore
//! use docbit::sort::{SortExpr, Sort};
//!
//! assert_eq!(
//!     SortExpr::parse("rank desc, name"),
//!     SortExpr::Single(vec![Sort::desc("rank"), Sort::asc("name")]),
//! );
//! assert_eq!(
//!     SortExpr::parse("email; rank desc"),
//!     SortExpr::Groups(vec![vec![Sort::asc("email")], vec![Sort::desc("rank")]]),
//! );
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SortParseError;

/// Sort direction for query results and index keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// Resolves a direction word permissively: any word containing `desc`
    /// (case-insensitive) is descending, everything else is ascending.
    pub fn from_word(word: &str) -> Self {
        if word.to_ascii_lowercase().contains("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    /// The numeric form used by MongoDB-style sort and index documents.
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// A single sort key: which field to sort by and in which direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// An ordered list of sort keys, e.g. one (possibly composite) index.
pub type SortSpec = Vec<Sort>;

/// The normalized result of parsing a sort expression.
///
/// A single group normalizes to [`SortExpr::Single`], several `;`-separated groups
/// normalize to [`SortExpr::Groups`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortExpr {
    Single(SortSpec),
    Groups(Vec<SortSpec>),
}

impl SortExpr {
    /// Parses a sort expression permissively.
    ///
    /// This never fails: unknown direction words select ascending order, words after
    /// the direction word are ignored, and empty tokens or groups are skipped.
    pub fn parse(expr: &str) -> Self {
        let mut groups = Vec::new();

        for group in expr.split(';') {
            let keys = group
                .split(',')
                .filter_map(|token| {
                    let mut words = token.split_whitespace();
                    let field = words.next()?;
                    let direction = words
                        .next()
                        .map(SortDirection::from_word)
                        .unwrap_or_default();

                    Some(Sort::new(field, direction))
                })
                .collect::<SortSpec>();

            if !keys.is_empty() {
                groups.push(keys);
            }
        }

        Self::from_groups(groups)
    }

    /// Parses a sort expression, rejecting direction words other than
    /// `asc`/`ascending`/`desc`/`descending` and tokens with more than one direction word.
    pub fn parse_strict(expr: &str) -> Result<Self, SortParseError> {
        let mut groups = Vec::new();

        for group in expr.split(';') {
            let mut keys = SortSpec::new();

            for token in group.split(',') {
                let mut words = token.split_whitespace();
                let Some(field) = words.next() else {
                    continue;
                };

                let direction = match words.next() {
                    None => SortDirection::Asc,
                    Some(word) => match word.to_ascii_lowercase().as_str() {
                        "asc" | "ascending" => SortDirection::Asc,
                        "desc" | "descending" => SortDirection::Desc,
                        _ => return Err(SortParseError::UnknownDirection(word.to_string())),
                    },
                };

                if words.next().is_some() {
                    return Err(SortParseError::TrailingWords(token.trim().to_string()));
                }

                keys.push(Sort::new(field, direction));
            }

            if !keys.is_empty() {
                groups.push(keys);
            }
        }

        Ok(Self::from_groups(groups))
    }

    fn from_groups(mut groups: Vec<SortSpec>) -> Self {
        match groups.len() {
            0 => SortExpr::Single(SortSpec::new()),
            1 => SortExpr::Single(groups.remove(0)),
            _ => SortExpr::Groups(groups),
        }
    }

    /// Returns `true` when the expression holds no sort keys at all.
    pub fn is_empty(&self) -> bool {
        match self {
            SortExpr::Single(keys) => keys.is_empty(),
            SortExpr::Groups(groups) => groups.iter().all(Vec::is_empty),
        }
    }

    /// Returns every group as its own sort spec.
    pub fn into_groups(self) -> Vec<SortSpec> {
        match self {
            SortExpr::Single(keys) if keys.is_empty() => Vec::new(),
            SortExpr::Single(keys) => vec![keys],
            SortExpr::Groups(groups) => groups,
        }
    }

    /// Concatenates all groups into one ordered sort spec.
    pub fn flatten(self) -> SortSpec {
        self.into_groups()
            .into_iter()
            .flatten()
            .collect()
    }
}

impl From<&str> for SortExpr {
    fn from(expr: &str) -> Self {
        SortExpr::parse(expr)
    }
}

impl From<String> for SortExpr {
    fn from(expr: String) -> Self {
        SortExpr::parse(&expr)
    }
}

impl From<SortSpec> for SortExpr {
    fn from(keys: SortSpec) -> Self {
        SortExpr::Single(keys)
    }
}

impl From<Vec<SortSpec>> for SortExpr {
    fn from(groups: Vec<SortSpec>) -> Self {
        SortExpr::Groups(groups)
    }
}

/// Normalizes anything sort-like into a [`SortExpr`].
///
/// Strings are parsed permissively; already structured specs pass through unchanged.
pub fn parse_sort(expr: impl Into<SortExpr>) -> SortExpr {
    expr.into()
}
