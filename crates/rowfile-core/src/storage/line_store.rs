use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StorageError;

use super::lock::TableLock;

/// Line-oriented access to one table file.
///
/// Reads go through a buffered reader whose position is the "read cursor";
/// appends always land at the end of the file. Replacing or deleting a line
/// rewrites the file, which is O(file size) per call.
///
/// A `LineStore` holds an exclusive advisory lock on its file for as long as
/// it lives, so at most one store per table file exists at a time.
pub struct LineStore {
    path: PathBuf,
    reader: BufReader<File>,
    _lock: TableLock,
}

impl LineStore {
    /// Open the table file at `path`, creating it if absent.
    ///
    /// The read cursor starts at the beginning of the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let file = open_data_file(path)?;
        let lock = TableLock::try_exclusive(path)?;
        debug!(path = %path.display(), "line store opened");

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            _lock: lock,
        })
    }

    /// Drop the current handle and open the file again. The read cursor is
    /// reset to the start of the file.
    pub fn reopen(&mut self) -> Result<(), StorageError> {
        let file = open_data_file(&self.path)?;
        self.reader = BufReader::new(file);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the file in bytes.
    pub fn len(&self) -> Result<u64, StorageError> {
        Ok(self.reader.get_ref().metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Byte offset of the read cursor.
    pub fn position(&mut self) -> Result<u64, StorageError> {
        Ok(self.reader.stream_position()?)
    }

    /// Read the next line into `out` (without its separator).
    ///
    /// Returns `Ok(false)` at end of file. A final line with no trailing
    /// separator is still returned.
    pub fn next_line(
        &mut self,
        out: &mut String,
        row_separator: &str,
    ) -> Result<bool, StorageError> {
        out.clear();
        let offset = self.reader.stream_position()?;
        let mut buf = Vec::new();
        if !read_until_separator(&mut self.reader, row_separator.as_bytes(), &mut buf)? {
            return Ok(false);
        }
        *out = String::from_utf8(buf).map_err(|_| StorageError::InvalidUtf8 { offset })?;
        Ok(true)
    }

    /// Append raw text at the end of the file. Returns the byte offset the
    /// text was written at. No escaping or validation is performed.
    pub fn put_line(&mut self, text: &str) -> Result<u64, StorageError> {
        let offset = self.reader.seek(SeekFrom::End(0))?;
        let file = self.reader.get_mut();
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(offset)
    }

    /// Replace one line of the file.
    ///
    /// `line_number` is 1-based and counts from the current read position:
    /// the rest of the file is captured, the line is replaced in that slice,
    /// and the slice is written back in place. The read position is restored
    /// afterwards, including on failure.
    pub fn overwrite_line(
        &mut self,
        line_number: usize,
        new_text: &str,
        row_separator: &str,
    ) -> Result<(), StorageError> {
        let origin = self.position()?;

        let mut rest = String::new();
        self.reader.read_to_string(&mut rest)?;
        let mut lines = split_lines(&rest, row_separator);

        if line_number == 0 || line_number > lines.len() {
            self.move_to_offset(origin)?;
            return Err(StorageError::LineOutOfBounds {
                line: line_number,
                count: lines.len(),
            });
        }

        lines[line_number - 1] = new_text.to_string();
        self.write_from(origin, join_lines(&lines, row_separator).as_bytes())?;
        debug!(line = line_number, origin, "line overwritten");
        Ok(())
    }

    /// Remove the line with 1-based number `line_number`, counting from the
    /// start of the file.
    ///
    /// Returns `Ok(false)` without writing when the file has no such line.
    /// The read cursor is left at the start of the file.
    pub fn delete_line(
        &mut self,
        line_number: usize,
        row_separator: &str,
    ) -> Result<bool, StorageError> {
        let mut lines = self.read_all_lines(row_separator)?;
        if line_number == 0 || line_number > lines.len() {
            self.move_to_begin()?;
            return Ok(false);
        }

        let removed = lines.remove(line_number - 1);
        debug!(line = line_number, removed = %removed, "line deleted");
        self.rewrite_lines(&lines, row_separator)?;
        Ok(true)
    }

    /// Replace the whole file with `lines`, each terminated by the separator.
    /// The read cursor is left at the start of the file.
    pub fn rewrite_lines(
        &mut self,
        lines: &[String],
        row_separator: &str,
    ) -> Result<(), StorageError> {
        self.write_from(0, join_lines(lines, row_separator).as_bytes())
    }

    /// Rewind and read every line of the file.
    pub fn read_all_lines(&mut self, row_separator: &str) -> Result<Vec<String>, StorageError> {
        self.move_to_begin()?;
        let mut lines = Vec::new();
        let mut line = String::new();
        while self.next_line(&mut line, row_separator)? {
            lines.push(std::mem::take(&mut line));
        }
        Ok(lines)
    }

    pub fn move_to_begin(&mut self) -> Result<(), StorageError> {
        self.reader.rewind()?;
        Ok(())
    }

    /// Move the read cursor to the end of the file, returning the file size.
    pub fn move_to_end(&mut self) -> Result<u64, StorageError> {
        Ok(self.reader.seek(SeekFrom::End(0))?)
    }

    pub fn move_to_offset(&mut self, offset: u64) -> Result<(), StorageError> {
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Rewind and return the whole file as one string.
    pub fn content(&mut self) -> Result<String, StorageError> {
        self.move_to_begin()?;
        let mut buf = String::new();
        self.reader.read_to_string(&mut buf)?;
        Ok(buf)
    }

    /// Fsync the underlying file.
    pub fn sync(&self) -> Result<(), StorageError> {
        self.reader.get_ref().sync_all()?;
        Ok(())
    }

    /// Write `bytes` at `offset`, truncate the file right after them and
    /// leave the read cursor at `offset`.
    fn write_from(&mut self, offset: u64, bytes: &[u8]) -> Result<(), StorageError> {
        let file = self.reader.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        file.set_len(offset + bytes.len() as u64)?;
        file.flush()?;
        // Seeking through the reader discards its now-stale buffer.
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

fn open_data_file(path: &Path) -> Result<File, StorageError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Read bytes up to and including `sep`, leaving the separator off `buf`.
/// Returns `false` only when nothing was left to read.
fn read_until_separator<R: BufRead>(
    reader: &mut R,
    sep: &[u8],
    buf: &mut Vec<u8>,
) -> io::Result<bool> {
    let Some(&last) = sep.last() else {
        reader.read_to_end(buf)?;
        return Ok(!buf.is_empty());
    };

    loop {
        let n = reader.read_until(last, buf)?;
        if n == 0 {
            return Ok(!buf.is_empty());
        }
        if buf.ends_with(sep) {
            buf.truncate(buf.len() - sep.len());
            return Ok(true);
        }
        if buf.last() != Some(&last) {
            // EOF inside an unterminated final line.
            return Ok(true);
        }
    }
}

/// Split text into lines the same way `next_line` would read them.
pub(crate) fn split_lines(text: &str, sep: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if sep.is_empty() {
        return vec![text.to_string()];
    }
    let body = text.strip_suffix(sep).unwrap_or(text);
    body.split(sep).map(str::to_string).collect()
}

fn join_lines(lines: &[String], sep: &str) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.len() + sep.len()).sum());
    for line in lines {
        out.push_str(line);
        out.push_str(sep);
    }
    out
}
