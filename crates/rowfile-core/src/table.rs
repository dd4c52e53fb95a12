//! Table: a cursor bound to a name and a declared column list, executing
//! [`Query`] values against it.

use serde::Serialize;
use tracing::{debug, warn};

use crate::cursor::Cursor;
use crate::encoding::{DelimitedCodec, RecordCodec};
use crate::error::{Error, QueryError, Result};
use crate::query::{Predicate, Query, QueryBuilder, QueryKind};
use crate::types::{IntoRecord, MutationReport, Record};

/// Result of [`Table::execute_query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutput {
    /// Matched (and projected) rows of a SELECT.
    Rows(Vec<Record>),
    /// Outcome of an INSERT, UPDATE or DELETE.
    Mutation(MutationReport),
}

impl QueryOutput {
    /// The selected rows, or `None` for a mutation.
    pub fn into_rows(self) -> Option<Vec<Record>> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            QueryOutput::Mutation(_) => None,
        }
    }

    /// The mutation report, or `None` for a SELECT.
    pub fn into_report(self) -> Option<MutationReport> {
        match self {
            QueryOutput::Rows(_) => None,
            QueryOutput::Mutation(report) => Some(report),
        }
    }
}

pub struct Table<C = DelimitedCodec> {
    cursor: Cursor<C>,
    columns: Vec<String>,
    name: String,
}

impl<C: RecordCodec> Table<C> {
    pub fn new<I, S>(cursor: Cursor<C>, columns: I, name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cursor,
            columns: columns.into_iter().map(Into::into).collect(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cursor(&self) -> &Cursor<C> {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor<C> {
        &mut self.cursor
    }

    pub fn into_cursor(self) -> Cursor<C> {
        self.cursor
    }

    /// Resolve column labels to positions, in label order. Each label maps
    /// to the first column with that name; repeated labels repeat the index.
    pub fn column_indexes(&self, labels: &[String]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|label| {
                self.columns
                    .iter()
                    .position(|c| c == label)
                    .ok_or_else(|| Error::from(QueryError::UnknownColumn(label.clone())))
            })
            .collect()
    }

    /// Run `query` against this table.
    pub fn execute_query(&mut self, query: &Query) -> Result<QueryOutput> {
        debug!(table = %self.name, query = %query, "executing query");

        match query.kind() {
            QueryKind::Select => {
                let indexes = self.column_indexes(query.target().labels())?;
                let predicate = query.predicate();
                let rows = self
                    .cursor
                    .filter_fields(&indexes, |r| predicate.matches(r))?;
                Ok(QueryOutput::Rows(rows))
            }
            QueryKind::Insert => {
                self.require_payload(query)?;
                let report = self
                    .cursor
                    .insert_rows(query.payload().rows().iter().cloned())?;
                Ok(QueryOutput::Mutation(report))
            }
            QueryKind::Update => {
                self.require_payload(query)?;
                let mut report = MutationReport::default();
                for row in query.payload().rows() {
                    match self.cursor.update_row(row.clone())? {
                        None => report.written += 1,
                        Some(reason) => report.reject(row.primary_key(), reason),
                    }
                }
                Ok(QueryOutput::Mutation(report))
            }
            QueryKind::Delete => {
                let predicate = query.predicate();
                let removed = self.cursor.delete_rows(|r| predicate.matches(r))?;
                Ok(QueryOutput::Mutation(MutationReport {
                    written: removed,
                    rejected: Vec::new(),
                }))
            }
        }
    }

    /// SELECT `labels` (empty = all columns) from rows matching `predicate`.
    pub fn select<S: Into<String>>(
        &mut self,
        labels: impl IntoIterator<Item = S>,
        predicate: Predicate,
    ) -> Result<Vec<Record>> {
        let query = QueryBuilder::select()
            .target(labels)
            .filter(predicate)
            .build();
        Ok(self.execute_query(&query)?.into_rows().unwrap_or_default())
    }

    /// INSERT `rows`.
    pub fn insert<R: IntoRecord>(
        &mut self,
        rows: impl IntoIterator<Item = R>,
    ) -> Result<MutationReport> {
        let query = QueryBuilder::insert().payload(rows).build();
        Ok(self.execute_query(&query)?.into_report().unwrap_or_default())
    }

    /// UPDATE the stored rows sharing a primary key with `rows`.
    pub fn update<R: IntoRecord>(
        &mut self,
        rows: impl IntoIterator<Item = R>,
    ) -> Result<MutationReport> {
        let query = QueryBuilder::update().payload(rows).build();
        Ok(self.execute_query(&query)?.into_report().unwrap_or_default())
    }

    /// DELETE the rows matching `predicate`.
    pub fn delete(&mut self, predicate: Predicate) -> Result<MutationReport> {
        let query = QueryBuilder::delete().filter(predicate).build();
        Ok(self.execute_query(&query)?.into_report().unwrap_or_default())
    }

    /// Predicate matching rows whose `column` equals `value`.
    pub fn column_equals(&self, column: &str, value: impl Into<String>) -> Result<Predicate> {
        let index = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| QueryError::UnknownColumn(column.to_string()))?;
        Ok(Predicate::field_equals(index, value))
    }

    fn require_payload(&self, query: &Query) -> Result<()> {
        if query.payload().is_empty() {
            warn!(table = %self.name, kind = %query.kind(), "query has no payload");
            return Err(QueryError::EmptyPayload {
                kind: query.kind(),
                table: self.name.clone(),
            }
            .into());
        }
        Ok(())
    }
}
