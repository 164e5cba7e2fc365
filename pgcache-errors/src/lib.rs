//! Error types shared across the pgcache crates.
//!
//! Each concern gets its own enum so that callers can match on the kind of
//! failure without downcasting; [`Error`] is the union returned from the
//! public entry points ([`Listener::add_table`], `Data` construction, and
//! so on).

use thiserror::Error;

/// A configuration-time failure discovered by the binding validator
/// (spec.md §4.2 / §8 S5).
///
/// Most of the checks spec.md's source assigns to a runtime validator
/// (key/value field type assignability, hook method signatures, unique-key
/// field kind) are, under this crate's closure-based re-architecture
/// (SPEC_FULL.md §4.2, §3), enforced by the Rust compiler at the call site
/// instead: a [`Binding`](../pgcache_data/index.html) is built from typed
/// closures, so a mismatched field type or hook signature is a compile
/// error, not a value this enum can represent. The one check that remains
/// a genuine runtime concern — the target container reference actually
/// being set — is [`NullTarget`](BindingError::NullTarget).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BindingError {
    /// `target` was null (an unset container reference).
    #[error("binding target for table `{table}` is not set")]
    NullTarget {
        /// The table the binding belongs to.
        table: String,
    },
}

/// A failure deserializing a notification payload into a row (spec.md §7:
/// "logged; the single event is dropped; state unchanged").
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// The payload's column-keyed JSON object couldn't be translated into
    /// the row type: a required column was missing, a value had the
    /// wrong type, or the payload wasn't a JSON object at all. `serde`'s
    /// own error text names the offending field, satisfying spec.md §7's
    /// "the single event is dropped; state unchanged" disposition with an
    /// actionable message.
    #[error("notification for table `{table}` could not be decoded: {source}")]
    Malformed {
        /// The table the notification is for.
        table: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// A failure reloading a table from `loadSql` (spec.md §4.3 / §7).
///
/// `pgcache-client`'s `Table` queries through the driver-agnostic
/// `RowSource` boundary, so the underlying error is boxed rather than
/// named as a concrete `tokio_postgres::Error` — the same decoupling
/// `RowSource` itself draws (see `pgcache-client/src/row_source.rs`).
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The reload query itself failed.
    #[error("reload query for table `{table}` failed after {query_ms}ms: {source}")]
    Query {
        /// The table being reloaded.
        table: String,
        /// How long the query ran before failing.
        query_ms: u128,
        /// The underlying driver error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The `bigColumns` secondary query failed.
    #[error("bigColumns query for table `{table}` failed: {source}")]
    BigColumns {
        /// The table being reloaded.
        table: String,
        /// The underlying driver error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A failure installing server-side setup (spec.md §4.5 / §7: "returned
/// from Add; partial state rolled back by dropping the trigger"). Sources
/// are boxed for the same reason as [`ReloadError`]'s: both a pool
/// checkout failure and a query failure can land here, and `pgcache-errors`
/// has no reason to know which concrete driver crate produced either.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Installing the shared stored procedure or per-table trigger failed.
    #[error("installing trigger for table `{table}` failed: {source}")]
    Trigger {
        /// The table the trigger is for.
        table: String,
        /// The underlying driver error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Subscribing to the notification channel failed.
    #[error("subscribing to channel `{channel}` failed: {source}")]
    Listen {
        /// The channel name.
        channel: String,
        /// The underlying driver error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `table` was already subscribed (spec.md §4.4 step 2: "reject
    /// duplicate subscription").
    #[error("table `{table}` is already subscribed")]
    DuplicateSubscription {
        /// The table's qualified name.
        table: String,
    },

    /// A setup operation didn't complete within its 3-second deadline
    /// (spec.md §5).
    #[error("setup operation `{operation}` for table `{table}` timed out")]
    Timeout {
        /// Which setup step timed out (`install_function`, `install_trigger`,
        /// `ping`, …).
        operation: &'static str,
        /// The table the operation was for.
        table: String,
    },
}

/// The union of every error this crate's public entry points can return.
#[derive(Debug, Error)]
pub enum Error {
    /// A binding failed validation at table-add time.
    #[error(transparent)]
    Configuration(#[from] BindingError),

    /// Server-side setup (trigger install, channel subscribe) failed.
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// A notification payload couldn't be deserialized.
    #[error(transparent)]
    Deserialize(#[from] DeserializeError),

    /// A reload query failed.
    #[error(transparent)]
    Reload(#[from] ReloadError),
}

/// Convenience alias matching the source's `(T, error)` return convention.
pub type Result<T> = std::result::Result<T, Error>;
