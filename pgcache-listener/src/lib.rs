//! The change listener: maintains the trigger-installing and LISTEN
//! connections, owns the single receive loop, and dispatches each incoming
//! notification to the subscribed table's coordinator (spec.md §4.4).
#![deny(missing_docs)]

mod config;
mod listener;
mod row_source;
mod trigger;

pub use config::ListenerConfig;
pub use listener::{Dispatch, Listener, TableState};
pub use row_source::PoolRowSource;
pub use trigger::{check_projection, drop_trigger_sql, function_sql, notify_projection, table_trigger_sql};
