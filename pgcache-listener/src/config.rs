//! [`ListenerConfig`]: the setup timeout, keepalive interval, and
//! trigger-installing pool size a host can override, each overridable by
//! CLI flag or environment variable in the style of the rest of this
//! workspace's host-facing options structs.

use std::time::Duration;

use clap::Parser;

/// Tunables for one [`crate::Listener`]. The connection string itself is
/// supplied separately as a `tokio_postgres::Config` to `Listener::connect`,
/// matching how a deployment's upstream URL is kept out of this struct and
/// parsed as its own argument.
#[derive(Parser, Debug, Clone)]
pub struct ListenerConfig {
    /// Deadline, in milliseconds, for any single setup operation (connect,
    /// install trigger, checkout a DDL connection, `LISTEN`).
    #[arg(long, env = "PGCACHE_SETUP_TIMEOUT_MS", default_value = "3000")]
    pub setup_timeout_ms: u64,

    /// Idle interval, in seconds, between keepalive pings on the
    /// notification connection.
    #[arg(long, env = "PGCACHE_KEEPALIVE_INTERVAL_SECS", default_value = "60")]
    pub keepalive_interval_secs: u64,

    /// Maximum size of the trigger-installing connection pool.
    #[arg(long, env = "PGCACHE_DDL_POOL_SIZE", default_value = "1")]
    pub ddl_pool_size: usize,
}

impl ListenerConfig {
    /// [`Self::setup_timeout_ms`] as a [`Duration`].
    pub fn setup_timeout(&self) -> Duration {
        Duration::from_millis(self.setup_timeout_ms)
    }

    /// [`Self::keepalive_interval_secs`] as a [`Duration`].
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        ListenerConfig {
            setup_timeout_ms: 3000,
            keepalive_interval_secs: 60,
            ddl_pool_size: 1,
        }
    }
}
