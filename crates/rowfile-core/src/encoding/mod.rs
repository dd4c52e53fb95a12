//! Record encoding: the line format descriptor and record codecs.

pub mod delimited;
pub mod format;

pub use delimited::{DelimitedCodec, desanitize_field, sanitize_field};
pub use format::FormatDescriptor;

use crate::types::Record;

/// Converts records to and from single text lines.
///
/// `serialize` returns the line including its row separator; `deserialize`
/// takes a line with the separator already stripped.
pub trait RecordCodec {
    fn serialize(&self, record: &Record, format: &FormatDescriptor) -> String;
    fn deserialize(&self, line: &str, format: &FormatDescriptor) -> Record;
}
