//! Storage layer: line-oriented table files and their advisory locks.

pub mod line_store;
pub mod lock;

pub use line_store::LineStore;
pub use lock::TableLock;
