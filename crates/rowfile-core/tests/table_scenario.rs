//! End-to-end tests: a `{id, name}` table driven only through queries.

use rowfile_core::error::{Error, StorageError};
use rowfile_core::types::RejectReason;
use rowfile_core::{
    Cursor, FormatDescriptor, IntoRecord, LineStore, Predicate, QueryBuilder, QueryOutput, Table,
};
use tempfile::tempdir;

fn open_table(path: &std::path::Path) -> Table {
    let store = LineStore::open(path).unwrap();
    let cursor = Cursor::open(store, FormatDescriptor::default()).unwrap();
    Table::new(cursor, ["id", "name"], "people")
}

/// Drop the table's cursor and scan the file again from scratch.
fn reconstruct(table: Table) -> Table {
    let store = table.into_cursor().into_store();
    let cursor = Cursor::open(store, FormatDescriptor::default()).unwrap();
    Table::new(cursor, ["id", "name"], "people")
}

fn rows(output: QueryOutput) -> Vec<Vec<String>> {
    output
        .into_rows()
        .expect("expected a SELECT result")
        .into_iter()
        .map(|r| r.into_fields())
        .collect()
}

#[test]
fn test_alice_bob_scenario() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.txt");
    let mut table = open_table(&path);

    let insert = QueryBuilder::insert()
        .row(["1", "Alice"])
        .row(["2", "Bob"])
        .build();
    let report = table.execute_query(&insert).unwrap().into_report().unwrap();
    assert_eq!(report.written, 2);

    let select_two = QueryBuilder::select()
        .predicate(|r| r.field(0) == Some("2"))
        .build();
    assert_eq!(rows(table.execute_query(&select_two).unwrap()), vec![vec!["2", "Bob"]]);

    let update = QueryBuilder::update().row(["2", "Robert"]).build();
    table.execute_query(&update).unwrap();

    let mut table = reconstruct(table);
    assert_eq!(
        rows(table.execute_query(&select_two).unwrap()),
        vec![vec!["2", "Robert"]]
    );

    let delete = QueryBuilder::delete()
        .filter(Predicate::key_equals("1"))
        .build();
    table.execute_query(&delete).unwrap();

    let mut table = reconstruct(table);
    let select_all = QueryBuilder::select().build();
    assert_eq!(
        rows(table.execute_query(&select_all).unwrap()),
        vec![vec!["2", "Robert"]]
    );

    drop(table);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "2,Robert\n");
}

#[test]
fn test_update_visible_on_live_table() {
    let dir = tempdir().unwrap();
    let mut table = open_table(&dir.path().join("people.txt"));

    table.insert([["1", "Alice"], ["2", "Bob"], ["3", "Carol"]]).unwrap();
    table.delete(Predicate::key_equals("1")).unwrap();

    // Without reopening: the index was rebuilt by the delete, so the update
    // lands on Carol's current line.
    let report = table.update([["3", "Caroline"]]).unwrap();
    assert_eq!(report.written, 1);

    let all = table.select(Vec::<String>::new(), Predicate::always()).unwrap();
    assert_eq!(
        all,
        vec![["2", "Bob"].into_record(), ["3", "Caroline"].into_record()]
    );
}

#[test]
fn test_key_uniqueness_across_sessions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.txt");

    {
        let mut table = open_table(&path);
        table.insert([["1", "Alice"]]).unwrap();
    }

    let mut table = open_table(&path);
    let report = table.insert([["1", "Impostor"], ["2", "Bob"]]).unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(report.rejected[0].reason, RejectReason::KeyCollision);
    assert_eq!(table.cursor().len(), 2);

    let alice = table.select(["name"], Predicate::key_equals("1")).unwrap();
    assert_eq!(alice, vec![["Alice"].into_record()]);
}

#[test]
fn test_delete_then_select_returns_nothing() {
    let dir = tempdir().unwrap();
    let mut table = open_table(&dir.path().join("people.txt"));
    table
        .insert((0..20).map(|i| vec![i.to_string(), format!("name{}", i % 3)]))
        .unwrap();

    let name0 = table.column_equals("name", "name0").unwrap();
    let report = table.delete(name0.clone()).unwrap();
    assert_eq!(report.written, 7);

    let mut table = reconstruct(table);
    assert!(table.select(["id"], name0).unwrap().is_empty());
    assert_eq!(table.cursor().len(), 13);
}

#[test]
fn test_fields_with_separators_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.txt");
    let mut table = open_table(&path);

    table.insert([["1", "Doe, Jane\nsecond line"]]).unwrap();
    let mut table = reconstruct(table);

    let back = table.select(["name"], Predicate::key_equals("1")).unwrap();
    assert_eq!(back, vec![["Doe, Jane\nsecond line"].into_record()]);
}

#[test]
fn test_second_table_on_same_file_is_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.txt");
    let _table = open_table(&path);

    match LineStore::open(&path) {
        Err(StorageError::FileLocked) => {}
        other => panic!("expected FileLocked, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_custom_format_from_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.psv");
    let format = FormatDescriptor::from_json_str(
        r#"{"column_separator": "|", "column_substitute": "\\p", "row_substitute": "\\n"}"#,
    )
    .unwrap();

    let store = LineStore::open(&path).unwrap();
    let cursor = Cursor::open(store, format.clone()).unwrap();
    let mut table = Table::new(cursor, ["id", "name"], "people");
    table.insert([["1", "a|b"]]).unwrap();

    let store = table.into_cursor().into_store();
    let mut cursor = Cursor::open(store, format).unwrap();
    assert_eq!(cursor.store_mut().content().unwrap(), "1|a\\pb\n");
    assert_eq!(cursor.get("1").unwrap(), Some(["1", "a|b"].into_record()));
}

#[test]
fn test_errors_convert_to_top_level() {
    let dir = tempdir().unwrap();
    let mut table = open_table(&dir.path().join("people.txt"));
    let err = table
        .execute_query(&QueryBuilder::select().target(["age"]).build())
        .unwrap_err();
    assert!(matches!(err, Error::Query(_)));
    assert_eq!(err.to_string(), "unknown column: age");
}
