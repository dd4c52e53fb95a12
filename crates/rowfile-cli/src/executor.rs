use rowfile_core::error::Result;
use rowfile_core::query::{Predicate, Query, QueryBuilder};
use rowfile_core::table::Table;
use rowfile_core::types::{MutationReport, Record};

use crate::commands::{Command, RowFilter};

/// Structured result from executing a command.
#[derive(Debug)]
pub enum CommandResult {
    /// Rows returned by SELECT.
    Rows {
        columns: Vec<String>,
        rows: Vec<Record>,
    },
    /// Outcome of INSERT, UPDATE or DELETE.
    Mutation {
        action: &'static str,
        report: MutationReport,
    },
    /// Primary keys (KEYS).
    Keys(Vec<String>),
    /// Raw file content (DUMP).
    Dump(String),
}

/// Turn a command into a query (or direct cursor call) and run it.
pub fn execute(table: &mut Table, cmd: Command) -> Result<CommandResult> {
    match cmd {
        Command::Select { columns, filter } => {
            let predicate = predicate_for(table, &filter)?;
            let query = QueryBuilder::select()
                .target(columns.iter().cloned())
                .filter(predicate)
                .build();
            let rows = table.execute_query(&query)?.into_rows().unwrap_or_default();
            let columns = if columns.is_empty() {
                table.columns().to_vec()
            } else {
                columns
            };
            Ok(CommandResult::Rows { columns, rows })
        }
        Command::Insert { fields } => {
            let query = QueryBuilder::insert().row(fields).build();
            mutation("inserted", table, &query)
        }
        Command::Update { fields } => {
            let query = QueryBuilder::update().row(fields).build();
            mutation("updated", table, &query)
        }
        Command::Delete { filter, all } => {
            let predicate = if all {
                Predicate::always()
            } else if filter.is_empty() {
                // Without a filter, DELETE needs an explicit --all.
                return Ok(CommandResult::Mutation {
                    action: "deleted",
                    report: MutationReport::default(),
                });
            } else {
                predicate_for(table, &filter)?
            };
            let query = QueryBuilder::delete().filter(predicate).build();
            mutation("deleted", table, &query)
        }
        Command::Keys => Ok(CommandResult::Keys(table.cursor().primary_keys())),
        Command::Dump => Ok(CommandResult::Dump(
            table.cursor_mut().store_mut().content()?,
        )),
    }
}

/// Run a mutating query and flush the file to disk before reporting.
fn mutation(action: &'static str, table: &mut Table, query: &Query) -> Result<CommandResult> {
    let report = table.execute_query(query)?.into_report().unwrap_or_default();
    if report.written > 0 {
        table.cursor_mut().store_mut().sync()?;
    }
    Ok(CommandResult::Mutation { action, report })
}

fn predicate_for(table: &Table, filter: &RowFilter) -> Result<Predicate> {
    match (&filter.key, &filter.condition) {
        (Some(key), _) => Ok(Predicate::key_equals(key.clone())),
        (None, Some((column, value))) => table.column_equals(column, value.clone()),
        (None, None) => Ok(Predicate::always()),
    }
}
