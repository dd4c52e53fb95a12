use crate::types::Record;

use super::RecordCodec;
use super::format::FormatDescriptor;

/// Separator-delimited text lines, one record per line.
///
/// Separators inside a field are replaced by their substitute tokens on the
/// way out and restored on the way in.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedCodec;

impl RecordCodec for DelimitedCodec {
    fn serialize(&self, record: &Record, format: &FormatDescriptor) -> String {
        let mut line = record
            .fields()
            .iter()
            .map(|field| sanitize_field(field, format))
            .collect::<Vec<_>>()
            .join(format.column_separator.as_str());
        line.push_str(&format.row_separator);
        line
    }

    fn deserialize(&self, line: &str, format: &FormatDescriptor) -> Record {
        line.split(format.column_separator.as_str())
            .map(|token| desanitize_field(token, format))
            .collect()
    }
}

/// Replace separators with substitutes: column separator first, then row.
pub fn sanitize_field(field: &str, format: &FormatDescriptor) -> String {
    field
        .replace(&format.column_separator, &format.column_substitute)
        .replace(&format.row_separator, &format.row_substitute)
}

/// Undo [`sanitize_field`] in mirrored order: row substitute first, then
/// column.
pub fn desanitize_field(field: &str, format: &FormatDescriptor) -> String {
    field
        .replace(&format.row_substitute, &format.row_separator)
        .replace(&format.column_substitute, &format.column_separator)
}
