//! Cursor: one table file plus its in-memory primary-key index.
//!
//! The index maps each primary key to the physical line (and byte offset)
//! holding its row. It is built by a full scan when the cursor is opened
//! and rebuilt after every operation that moves lines around, so a stored
//! line number is always the key's current physical line.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::encoding::{DelimitedCodec, FormatDescriptor, RecordCodec};
use crate::error::Result;
use crate::storage::LineStore;
use crate::types::{IntoRecord, MutationReport, Record, RejectReason, RowLocation};

pub struct Cursor<C = DelimitedCodec> {
    store: LineStore,
    codec: C,
    format: FormatDescriptor,
    index: HashMap<String, RowLocation>,
    /// Physical lines in the file, indexed or not.
    line_count: usize,
    /// File length if every line carried its row separator.
    terminated_len: u64,
}

impl Cursor<DelimitedCodec> {
    /// Open a cursor over `store` using the delimited text codec.
    pub fn open(store: LineStore, format: FormatDescriptor) -> Result<Self> {
        Self::with_codec(store, DelimitedCodec, format)
    }
}

impl<C: RecordCodec> Cursor<C> {
    /// Open a cursor with a custom codec. Validates the format and scans the
    /// whole file once to build the index.
    pub fn with_codec(store: LineStore, codec: C, format: FormatDescriptor) -> Result<Self> {
        format.validate()?;

        let mut cursor = Self {
            store,
            codec,
            format,
            index: HashMap::new(),
            line_count: 0,
            terminated_len: 0,
        };
        cursor.reindex()?;

        info!(
            path = %cursor.store.path().display(),
            rows = cursor.index.len(),
            lines = cursor.line_count,
            "cursor opened"
        );
        Ok(cursor)
    }

    /// Rebuild the primary-key index from the file.
    ///
    /// Every physical line advances the line counter. Blank lines are not
    /// indexed. If a key appears on more than one line the later line wins.
    pub fn reindex(&mut self) -> Result<()> {
        self.index.clear();
        self.store.move_to_begin()?;

        let sep_len = self.format.row_separator.len() as u64;
        let mut line = String::new();
        let mut ordinal = 0;
        let mut offset = 0u64;

        while self.store.next_line(&mut line, &self.format.row_separator)? {
            if !line.is_empty() {
                let record = self.codec.deserialize(&line, &self.format);
                let key = record.primary_key().to_string();
                let location = RowLocation {
                    line: ordinal,
                    offset,
                };
                if let Some(prev) = self.index.insert(key, location) {
                    warn!(
                        key = record.primary_key(),
                        first = prev.line + 1,
                        line = ordinal + 1,
                        "duplicate primary key in table file; later line wins"
                    );
                }
            }
            ordinal += 1;
            offset += line.len() as u64 + sep_len;
        }

        self.line_count = ordinal;
        self.terminated_len = offset;
        self.store.move_to_begin()?;
        debug!(rows = self.index.len(), lines = ordinal, "index rebuilt");
        Ok(())
    }

    /// Whether a row with this primary key is stored.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Location of the row with this primary key.
    pub fn location(&self, key: &str) -> Option<RowLocation> {
        self.index.get(key).copied()
    }

    /// All stored primary keys in file order.
    pub fn primary_keys(&self) -> Vec<String> {
        let mut keys: Vec<(&String, &RowLocation)> = self.index.iter().collect();
        keys.sort_by_key(|(_, loc)| loc.line);
        keys.into_iter().map(|(k, _)| k.clone()).collect()
    }

    /// Number of indexed rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of physical lines, including blank ones.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    pub fn store_mut(&mut self) -> &mut LineStore {
        &mut self.store
    }

    /// Give back the underlying store, e.g. to open a fresh cursor on it.
    pub fn into_store(self) -> LineStore {
        self.store
    }

    /// Fetch one row by primary key without scanning.
    pub fn get(&mut self, key: &str) -> Result<Option<Record>> {
        let Some(location) = self.location(key) else {
            return Ok(None);
        };

        self.store.move_to_offset(location.offset)?;
        let mut line = String::new();
        let found = self.store.next_line(&mut line, &self.format.row_separator)?;
        self.store.move_to_begin()?;

        Ok(found.then(|| self.codec.deserialize(&line, &self.format)))
    }

    /// Scan every row in file order and return the ones matching
    /// `predicate`, projected onto `column_indexes` (empty = all columns).
    pub fn filter_fields(
        &mut self,
        column_indexes: &[usize],
        predicate: impl Fn(&Record) -> bool,
    ) -> Result<Vec<Record>> {
        self.store.move_to_begin()?;

        let mut rows = Vec::new();
        let mut line = String::new();
        let mut scanned = 0usize;
        while self.store.next_line(&mut line, &self.format.row_separator)? {
            if line.is_empty() {
                continue;
            }
            scanned += 1;
            let record = self.codec.deserialize(&line, &self.format);
            if predicate(&record) {
                rows.push(record.project(column_indexes));
            }
        }

        debug!(scanned, matched = rows.len(), "scan complete");
        Ok(rows)
    }

    /// Append rows whose primary key is not stored yet.
    ///
    /// A row whose key is already present (or appeared earlier in the same
    /// batch) is rejected and left out; the rest of the batch still goes in,
    /// in order.
    pub fn insert_rows<I, R>(&mut self, records: I) -> Result<MutationReport>
    where
        I: IntoIterator<Item = R>,
        R: IntoRecord,
    {
        let mut report = MutationReport::default();

        for record in records.into_iter().map(IntoRecord::into_record) {
            if is_blank(&record) {
                warn!("empty record; insert skipped");
                report.reject("", RejectReason::EmptyRecord);
                continue;
            }

            let key = record.primary_key();
            if self.index.contains_key(key) {
                warn!(key, "key collision; insert skipped");
                report.reject(key, RejectReason::KeyCollision);
                continue;
            }

            self.terminate_last_line()?;
            let line = self.codec.serialize(&record, &self.format);
            let offset = self.store.put_line(&line)?;

            self.index.insert(
                key.to_string(),
                RowLocation {
                    line: self.line_count,
                    offset,
                },
            );
            self.line_count += 1;
            self.terminated_len = offset + line.len() as u64;
            report.written += 1;
        }

        self.store.move_to_begin()?;
        info!(
            written = report.written,
            rejected = report.rejected.len(),
            "rows inserted"
        );
        Ok(report)
    }

    /// Replace the stored row that has the same primary key as `record`.
    ///
    /// Returns the reason nothing was written (`KeyNotFound` or
    /// `EmptyRecord`), or `None` once the row is replaced.
    pub fn update_row(&mut self, record: impl IntoRecord) -> Result<Option<RejectReason>> {
        let record = record.into_record();
        if is_blank(&record) {
            warn!("empty record; update skipped");
            return Ok(Some(RejectReason::EmptyRecord));
        }
        let Some(location) = self.location(record.primary_key()) else {
            warn!(key = record.primary_key(), "primary key not found; update skipped");
            return Ok(Some(RejectReason::KeyNotFound));
        };

        let line = self.codec.serialize(&record, &self.format);
        let body = line
            .strip_suffix(self.format.row_separator.as_str())
            .unwrap_or(&line);

        self.store.move_to_begin()?;
        self.store
            .overwrite_line(location.line + 1, body, &self.format.row_separator)?;

        // Byte offsets of later rows shift when the row changes length.
        self.reindex()?;
        debug!(key = record.primary_key(), line = location.line + 1, "row updated");
        Ok(None)
    }

    /// Delete every row matching `predicate`.
    ///
    /// The file is reopened and read into one snapshot; survivors are written
    /// back in a single pass and the index is rebuilt. Returns the number of
    /// rows removed.
    pub fn delete_rows(&mut self, predicate: impl Fn(&Record) -> bool) -> Result<usize> {
        self.store.reopen()?;
        let lines = self.store.read_all_lines(&self.format.row_separator)?;
        let before = lines.len();

        let survivors: Vec<String> = lines
            .into_iter()
            .filter(|line| {
                line.is_empty() || !predicate(&self.codec.deserialize(line, &self.format))
            })
            .collect();
        let removed = before - survivors.len();

        if removed > 0 {
            self.store
                .rewrite_lines(&survivors, &self.format.row_separator)?;
        }
        self.reindex()?;

        info!(removed, remaining = self.index.len(), "rows deleted");
        Ok(removed)
    }

    /// Delete one row by primary key. Returns `Ok(false)` if the key is not
    /// stored.
    pub fn delete_key(&mut self, key: &str) -> Result<bool> {
        let Some(location) = self.location(key) else {
            return Ok(false);
        };

        let deleted = self
            .store
            .delete_line(location.line + 1, &self.format.row_separator)?;
        self.reindex()?;
        Ok(deleted)
    }

    /// Make sure an unterminated last line gets its separator before
    /// anything is appended after it.
    fn terminate_last_line(&mut self) -> Result<()> {
        let len = self.store.len()?;
        if len > 0 && len < self.terminated_len {
            self.store.put_line(&self.format.row_separator)?;
        }
        Ok(())
    }
}

/// A record that would serialize to an empty line cannot be read back.
fn is_blank(record: &Record) -> bool {
    record.is_empty() || (record.len() == 1 && record.primary_key().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    fn open_with(content: &str) -> (TempDir, Cursor) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.txt");
        std::fs::write(&path, content).unwrap();
        let store = LineStore::open(&path).unwrap();
        (dir, Cursor::open(store, FormatDescriptor::default()).unwrap())
    }

    fn reopen(cursor: Cursor) -> Cursor {
        Cursor::open(cursor.into_store(), FormatDescriptor::default()).unwrap()
    }

    fn all(cursor: &mut Cursor) -> Vec<Vec<String>> {
        cursor
            .filter_fields(&[], |_| true)
            .unwrap()
            .into_iter()
            .map(Record::into_fields)
            .collect()
    }

    fn content(cursor: &mut Cursor) -> String {
        cursor.store_mut().content().unwrap()
    }

    #[test]
    fn test_open_builds_index() {
        let (_dir, cursor) = open_with("1,Alice\n2,Bob\n");
        assert_eq!(cursor.len(), 2);
        assert!(cursor.contains_key("1"));
        assert!(cursor.contains_key("2"));
        assert!(!cursor.contains_key("3"));
        assert_eq!(
            cursor.location("2"),
            Some(RowLocation { line: 1, offset: 8 })
        );
        assert_eq!(cursor.primary_keys(), vec!["1", "2"]);
    }

    #[test]
    fn test_index_counts_physical_lines() {
        let (_dir, cursor) = open_with("1,a\n\n3,c\nsolo\n");
        assert_eq!(cursor.line_count(), 4);
        assert_eq!(cursor.location("3").unwrap().line, 2);
        // A line without a column separator is a one-field row.
        assert_eq!(cursor.location("solo").unwrap().line, 3);
        assert_eq!(cursor.len(), 3);
    }

    #[test]
    fn test_index_key_is_desanitized() {
        let (_dir, cursor) = open_with("a<'>b,x\n");
        assert!(cursor.contains_key("a,b"));
    }

    #[test]
    fn test_duplicate_key_later_line_wins() {
        let (_dir, cursor) = open_with("1,old\n1,new\n");
        assert_eq!(cursor.len(), 1);
        assert_eq!(cursor.location("1").unwrap().line, 1);
    }

    #[test]
    fn test_invalid_format_rejected() {
        let dir = tempdir().unwrap();
        let store = LineStore::open(dir.path().join("t.txt")).unwrap();
        let format = FormatDescriptor {
            column_separator: "\n".to_string(),
            ..Default::default()
        };
        match Cursor::open(store, format) {
            Err(crate::error::Error::Format(_)) => {}
            Err(other) => panic!("expected Format error, got {other:?}"),
            Ok(_) => panic!("expected Format error, got a cursor"),
        }
    }

    #[test]
    fn test_insert_and_select() {
        let (_dir, mut cursor) = open_with("");
        let report = cursor
            .insert_rows([["1", "Alice"], ["2", "Bob"]])
            .unwrap();
        assert_eq!(report.written, 2);
        assert!(report.is_clean());
        assert_eq!(content(&mut cursor), "1,Alice\n2,Bob\n");

        let rows = cursor
            .filter_fields(&[1], |r| r.primary_key() == "2")
            .unwrap();
        assert_eq!(rows, vec![["Bob"].into_record()]);
    }

    #[test]
    fn test_insert_collision_skips_row() {
        let (_dir, mut cursor) = open_with("1,Alice\n");
        let report = cursor
            .insert_rows([["1", "Mallory"], ["2", "Bob"], ["2", "Bobby"]])
            .unwrap();

        assert_eq!(report.written, 1);
        assert_eq!(report.rejected.len(), 2);
        assert!(
            report
                .rejected
                .iter()
                .all(|r| r.reason == RejectReason::KeyCollision)
        );
        assert_eq!(report.rejected[0].key, "1");
        assert_eq!(report.rejected[1].key, "2");
        assert_eq!(cursor.len(), 2);
        assert_eq!(content(&mut cursor), "1,Alice\n2,Bob\n");
    }

    #[test]
    fn test_insert_rejects_blank_records() {
        let (_dir, mut cursor) = open_with("");
        let report = cursor
            .insert_rows([Record::default(), [""].into_record(), ["", "x"].into_record()])
            .unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(report.rejected.len(), 2);
        assert!(
            report
                .rejected
                .iter()
                .all(|r| r.reason == RejectReason::EmptyRecord)
        );
        assert!(cursor.contains_key(""));
    }

    #[test]
    fn test_insert_after_unterminated_line() {
        let (_dir, mut cursor) = open_with("1,a");
        cursor.insert_rows([["2", "b"]]).unwrap();
        assert_eq!(content(&mut cursor), "1,a\n2,b\n");

        let cursor = reopen(cursor);
        assert_eq!(cursor.location("2"), Some(RowLocation { line: 1, offset: 4 }));
    }

    #[test]
    fn test_insert_index_matches_fresh_scan() {
        let (_dir, mut cursor) = open_with("1,a\n\n");
        cursor.insert_rows([["2", "b"], ["3", "c"]]).unwrap();
        let live: Vec<_> = ["1", "2", "3"].iter().map(|k| cursor.location(k)).collect();

        let cursor = reopen(cursor);
        let fresh: Vec<_> = ["1", "2", "3"].iter().map(|k| cursor.location(k)).collect();
        assert_eq!(live, fresh);
    }

    #[test]
    fn test_get_by_key() {
        let (_dir, mut cursor) = open_with("1,Alice\n2,Bob\n3,Carol\n");
        assert_eq!(cursor.get("2").unwrap(), Some(["2", "Bob"].into_record()));
        assert_eq!(cursor.get("9").unwrap(), None);
    }

    #[test]
    fn test_filter_preserves_file_order_and_projects() {
        let (_dir, mut cursor) = open_with("3,c,x\n1,a,y\n2,b,x\n");
        let rows = cursor
            .filter_fields(&[1, 0], |r| r.field(2) == Some("x"))
            .unwrap();
        assert_eq!(rows, vec![["c", "3"].into_record(), ["b", "2"].into_record()]);
    }

    #[test]
    fn test_update_row() {
        let (_dir, mut cursor) = open_with("1,Alice\n2,Bob\n3,Carol\n");
        assert_eq!(cursor.update_row(["2", "Robert"]).unwrap(), None);
        assert_eq!(content(&mut cursor), "1,Alice\n2,Robert\n3,Carol\n");

        // Offsets of later rows follow the longer line.
        assert_eq!(cursor.get("3").unwrap(), Some(["3", "Carol"].into_record()));

        let mut cursor = reopen(cursor);
        let rows = cursor.filter_fields(&[], |r| r.primary_key() == "2").unwrap();
        assert_eq!(rows, vec![["2", "Robert"].into_record()]);
    }

    #[test]
    fn test_update_missing_key_is_noop() {
        let (_dir, mut cursor) = open_with("1,Alice\n");
        assert_eq!(
            cursor.update_row(["9", "Nobody"]).unwrap(),
            Some(RejectReason::KeyNotFound)
        );
        assert_eq!(content(&mut cursor), "1,Alice\n");
    }

    #[test]
    fn test_update_blank_record_keeps_row() {
        let (_dir, mut cursor) = open_with("");
        cursor.insert_rows([["", "x"], ["2", "b"]]).unwrap();

        assert_eq!(
            cursor.update_row([""]).unwrap(),
            Some(RejectReason::EmptyRecord)
        );
        assert_eq!(
            cursor.update_row(Record::default()).unwrap(),
            Some(RejectReason::EmptyRecord)
        );
        assert!(cursor.contains_key(""));
        assert_eq!(content(&mut cursor), ",x\n2,b\n");
        assert_eq!(cursor.get("").unwrap(), Some(["", "x"].into_record()));
    }

    #[test]
    fn test_update_escapes_separators() {
        let (_dir, mut cursor) = open_with("1,Alice\n");
        cursor.update_row(["1", "Smith, Alice"]).unwrap();
        assert_eq!(content(&mut cursor), "1,Smith<'> Alice\n");
        assert_eq!(
            cursor.get("1").unwrap(),
            Some(["1", "Smith, Alice"].into_record())
        );
    }

    #[test]
    fn test_delete_rows_multiple_matches() {
        let (_dir, mut cursor) = open_with("1,x\n2,y\n3,x\n4,x\n5,y\n");
        let removed = cursor.delete_rows(|r| r.field(1) == Some("x")).unwrap();
        assert_eq!(removed, 3);
        assert_eq!(content(&mut cursor), "2,y\n5,y\n");

        // The index follows the new layout immediately.
        assert!(!cursor.contains_key("1"));
        assert_eq!(cursor.location("5").unwrap().line, 1);
        assert_eq!(cursor.update_row(["5", "z"]).unwrap(), None);
        assert_eq!(content(&mut cursor), "2,y\n5,z\n");
    }

    #[test]
    fn test_delete_then_select_on_fresh_cursor() {
        let (_dir, mut cursor) = open_with("1,a\n2,b\n");
        cursor.delete_rows(|r| r.primary_key() == "1").unwrap();

        let mut cursor = reopen(cursor);
        let gone = cursor.filter_fields(&[], |r| r.primary_key() == "1").unwrap();
        assert!(gone.is_empty());
        assert_eq!(all(&mut cursor), vec![vec!["2", "b"]]);
    }

    #[test]
    fn test_delete_nothing_leaves_file() {
        let (_dir, mut cursor) = open_with("1,a\n");
        assert_eq!(cursor.delete_rows(|_| false).unwrap(), 0);
        assert_eq!(content(&mut cursor), "1,a\n");
    }

    #[test]
    fn test_delete_key() {
        let (_dir, mut cursor) = open_with("1,a\n2,b\n3,c\n");
        assert!(cursor.delete_key("2").unwrap());
        assert!(!cursor.delete_key("2").unwrap());
        assert_eq!(content(&mut cursor), "1,a\n3,c\n");
        assert_eq!(cursor.location("3").unwrap().line, 1);
    }

    #[test]
    fn test_round_trip_through_file() {
        let (_dir, mut cursor) = open_with("");
        let tricky = ["k1", "comma, inside", "new\nline", ""].into_record();
        cursor.insert_rows([tricky.clone()]).unwrap();

        let mut cursor = reopen(cursor);
        assert_eq!(cursor.get("k1").unwrap(), Some(tricky));
    }

    struct UpperCodec;

    impl RecordCodec for UpperCodec {
        fn serialize(&self, record: &Record, format: &FormatDescriptor) -> String {
            DelimitedCodec
                .serialize(record, format)
                .to_uppercase()
        }

        fn deserialize(&self, line: &str, format: &FormatDescriptor) -> Record {
            DelimitedCodec.deserialize(line, format)
        }
    }

    #[test]
    fn test_custom_codec() {
        let dir = tempdir().unwrap();
        let store = LineStore::open(dir.path().join("t.txt")).unwrap();
        let mut cursor =
            Cursor::with_codec(store, UpperCodec, FormatDescriptor::default()).unwrap();
        cursor.insert_rows([["a", "b"]]).unwrap();
        assert_eq!(cursor.store_mut().content().unwrap(), "A,B\n");
    }
}
