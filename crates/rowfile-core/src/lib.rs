//! # rowfile
//!
//! A minimal row store: every table is one text file holding one serialized
//! record per line, with an in-memory primary-key index rebuilt by a full
//! scan whenever the table is opened.
//!
//! The layers, leaf first:
//!
//! - [`storage::LineStore`]: line-oriented reads, appends and whole-file
//!   line rewrites over one locked file.
//! - [`encoding`]: the separator/substitute line format and record codecs.
//! - [`cursor::Cursor`]: the primary-key index plus select, insert, update
//!   and delete.
//! - [`table::Table`]: binds a cursor to column names and runs [`query::Query`]
//!   values built with [`query::QueryBuilder`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use rowfile_core::cursor::Cursor;
//! use rowfile_core::encoding::FormatDescriptor;
//! use rowfile_core::query::{Predicate, QueryBuilder};
//! use rowfile_core::storage::LineStore;
//! use rowfile_core::table::Table;
//!
//! let store = LineStore::open("users.txt").unwrap();
//! let cursor = Cursor::open(store, FormatDescriptor::default()).unwrap();
//! let mut users = Table::new(cursor, ["id", "name"], "users");
//!
//! users.insert([["1", "Alice"], ["2", "Bob"]]).unwrap();
//!
//! let query = QueryBuilder::select()
//!     .target(["name"])
//!     .filter(Predicate::key_equals("2"))
//!     .build();
//! let rows = users.execute_query(&query).unwrap().into_rows().unwrap();
//! assert_eq!(rows[0].fields(), ["Bob"]);
//! ```
//!
//! Every file-touching operation takes `&mut self`; a table is owned by one
//! caller at a time, and the store's advisory lock keeps a second store off
//! the same file.

pub mod cursor;
pub mod encoding;
pub mod error;
pub mod query;
pub mod storage;
pub mod table;
pub mod types;

pub use cursor::Cursor;
pub use encoding::{DelimitedCodec, FormatDescriptor, RecordCodec};
pub use error::{Error, Result};
pub use query::{Predicate, Query, QueryBuilder, QueryKind};
pub use storage::LineStore;
pub use table::{QueryOutput, Table};
pub use types::{IntoRecord, MutationReport, Record};
