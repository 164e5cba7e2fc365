//! Table descriptors and the coordinator that fans a row change out to its
//! bindings (spec.md §4.3). This crate depends on `pgcache-data` for the
//! projection engine and stays decoupled from any specific database driver
//! via [`RowSource`]; `pgcache-listener` supplies the `tokio-postgres`
//! implementation and drives [`Table::dispatch`] from its receive loop.
#![deny(missing_docs)]

mod deserialize;
mod row_source;
mod table;

pub use deserialize::decode;
pub use row_source::RowSource;
pub use table::{BigColumns, Table, TableEvent};
