//! Query model: an immutable description of one SELECT, INSERT, UPDATE or
//! DELETE against a table, plus the builder that assembles it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::error::QueryError;
use crate::types::{IntoRecord, Record};

/// The operation a [`Query`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Select,
    Update,
    Delete,
    Insert,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryKind::Select => "SELECT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
            QueryKind::Insert => "INSERT",
        })
    }
}

impl FromStr for QueryKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SELECT" => Ok(QueryKind::Select),
            "UPDATE" => Ok(QueryKind::Update),
            "DELETE" => Ok(QueryKind::Delete),
            "INSERT" => Ok(QueryKind::Insert),
            _ => Err(QueryError::UndefinedKind(s.to_string())),
        }
    }
}

/// Column labels a SELECT projects onto. Empty means every column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    labels: Vec<String>,
}

impl Target {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_all(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Row-matching function. Defaults to matching every row.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Record) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(f: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Match the row whose primary key equals `key`.
    pub fn key_equals(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move |r| r.primary_key() == key)
    }

    /// Match rows whose field at `index` equals `value`.
    pub fn field_equals(index: usize, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(move |r| r.field(index) == Some(value.as_str()))
    }

    pub fn matches(&self, record: &Record) -> bool {
        (self.0)(record)
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Rows written by INSERT and UPDATE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayLoad {
    rows: Vec<Record>,
}

impl PayLoad {
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A fully built query. Immutable; construct it with [`QueryBuilder`].
#[derive(Debug, Clone)]
pub struct Query {
    kind: QueryKind,
    target: Target,
    predicate: Predicate,
    payload: PayLoad,
}

impl Query {
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn payload(&self) -> &PayLoad {
        &self.payload
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.kind)?;
        if self.target.is_all() {
            f.write_str("*")?;
        } else {
            f.write_str(&self.target.labels.join(" "))?;
        }
        f.write_str(" WHERE predicate ")?;
        if self.payload.is_empty() {
            f.write_str("WITH EMPTY PAYLOAD")
        } else {
            write!(f, "ON PAYLOAD ({} rows)", self.payload.len())
        }
    }
}

/// Builder for [`Query`].
///
/// ```
/// use rowfile_core::query::{Predicate, QueryBuilder};
///
/// let query = QueryBuilder::select()
///     .target(["name"])
///     .filter(Predicate::key_equals("2"))
///     .build();
/// assert_eq!(query.to_string(), "SELECT name WHERE predicate WITH EMPTY PAYLOAD");
/// ```
#[derive(Debug)]
pub struct QueryBuilder {
    kind: QueryKind,
    labels: Vec<String>,
    predicate: Predicate,
    rows: Vec<Record>,
}

impl QueryBuilder {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            labels: Vec::new(),
            predicate: Predicate::always(),
            rows: Vec::new(),
        }
    }

    pub fn select() -> Self {
        Self::new(QueryKind::Select)
    }

    pub fn insert() -> Self {
        Self::new(QueryKind::Insert)
    }

    pub fn update() -> Self {
        Self::new(QueryKind::Update)
    }

    pub fn delete() -> Self {
        Self::new(QueryKind::Delete)
    }

    /// Set the column labels to project (SELECT only).
    pub fn target<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the row predicate from a closure.
    pub fn predicate(self, f: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        self.filter(Predicate::new(f))
    }

    /// Set the row predicate.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Replace the payload with `rows`.
    pub fn payload<I, R>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoRecord,
    {
        self.rows = rows.into_iter().map(IntoRecord::into_record).collect();
        self
    }

    /// Append one row to the payload.
    pub fn row(mut self, row: impl IntoRecord) -> Self {
        self.rows.push(row.into_record());
        self
    }

    /// Finish the query. No validation happens here; the table reports
    /// missing payloads or unknown columns when the query runs.
    pub fn build(self) -> Query {
        let query = Query {
            kind: self.kind,
            target: Target {
                labels: self.labels,
            },
            predicate: self.predicate,
            payload: PayLoad { rows: self.rows },
        };
        debug!(query = %query, "query built");
        query
    }
}
