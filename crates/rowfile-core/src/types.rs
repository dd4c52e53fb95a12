//! Core types: records, row locations, and mutation reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One stored row: an ordered list of string fields.
///
/// Field 0 is the primary key. No schema is enforced; callers keep field
/// order in line with the table's declared columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// The primary key (field 0), or `""` for a record with no fields.
    pub fn primary_key(&self) -> &str {
        self.field(0).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keep only the fields at `indexes`, in that order.
    ///
    /// An empty index list keeps every field. Indexes past the end of the
    /// record are skipped.
    pub fn project(&self, indexes: &[usize]) -> Record {
        if indexes.is_empty() {
            return self.clone();
        }
        Record::new(
            indexes
                .iter()
                .filter_map(|&i| self.fields.get(i).cloned())
                .collect(),
        )
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.fields.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Record::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Anything that can be stored as a row: an ordered field list whose first
/// field is the primary key.
///
/// Domain types implement this instead of the storage layer knowing about
/// them.
pub trait IntoRecord {
    fn into_record(self) -> Record;
}

impl IntoRecord for Record {
    fn into_record(self) -> Record {
        self
    }
}

impl IntoRecord for Vec<String> {
    fn into_record(self) -> Record {
        Record::new(self)
    }
}

impl IntoRecord for Vec<&str> {
    fn into_record(self) -> Record {
        self.into_iter().collect()
    }
}

impl<const N: usize> IntoRecord for [&str; N] {
    fn into_record(self) -> Record {
        self.into_iter().collect()
    }
}

/// Where a key's row lives in the table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLocation {
    /// 0-based physical line number.
    pub line: usize,
    /// Byte offset of the start of the line.
    pub offset: u64,
}

/// Why a row in a mutation batch was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// INSERT of a key that is already stored.
    KeyCollision,
    /// UPDATE of a key that is not stored.
    KeyNotFound,
    /// A record with no fields has no primary key.
    EmptyRecord,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::KeyCollision => f.write_str("key collision"),
            RejectReason::KeyNotFound => f.write_str("primary key not found"),
            RejectReason::EmptyRecord => f.write_str("empty record"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub key: String,
    pub reason: RejectReason,
}

/// Outcome of a mutating operation. Rejected rows are skipped; the rest of
/// the batch still applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    /// Rows inserted, updated or deleted.
    pub written: usize,
    pub rejected: Vec<Rejection>,
}

impl MutationReport {
    pub(crate) fn reject(&mut self, key: impl Into<String>, reason: RejectReason) {
        self.rejected.push(Rejection {
            key: key.into(),
            reason,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}
