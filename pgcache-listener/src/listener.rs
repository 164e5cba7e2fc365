//! The `Listener`: one dedicated notification connection, one receive-loop
//! task, and the subscription state machine per table (spec.md §4.4).
//! Grounded on the source's `pglistener.Listener` (`listener.go`): a single
//! goroutine reading `pq.Notification`s from a `*pq.Listener`, dispatching
//! real notifications by channel and a synthetic `"init"` extra to run the
//! initial load, with a one-minute idle ping and a nil notification meaning
//! connection loss.

use std::collections::HashMap;
use std::future::poll_fn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use pgcache_client::{Table, TableEvent};
use pgcache_errors::{Result, SetupError};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, timeout};
use tokio_postgres::{AsyncMessage, Config as PgConfig, NoTls};
use tracing::{error, info, warn};

use crate::config::ListenerConfig;
use crate::trigger;

/// A type-erased handle to one table coordinator's event hooks, so
/// [`Listener`] can hold tables of different row types in one registry.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Forward one event to the coordinator (spec.md §4.3).
    async fn dispatch(&self, event: TableEvent) -> Result<()>;
}

#[async_trait]
impl<R, S> Dispatch for Table<R, S>
where
    R: serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
    S: pgcache_client::RowSource + 'static,
{
    async fn dispatch(&self, event: TableEvent) -> Result<()> {
        Table::dispatch(self, event).await
    }
}

/// Per-table subscription state (spec.md §4.4: "unsubscribed → subscribing
/// → loading → ready", plus "ready → degraded → loading → ready" on
/// connection loss).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// Trigger install and channel subscription are in flight.
    Subscribing,
    /// Subscribed; the initial (or a connection-loss) reload is running.
    Loading,
    /// Caught up; serving notifications normally.
    Ready,
    /// A connection-loss sentinel was observed; awaiting reload.
    Degraded,
}

struct Registration {
    dispatch: Arc<dyn Dispatch>,
    state: TableState,
    init_signal: Option<oneshot::Sender<()>>,
}

enum Event {
    Notification(tokio_postgres::Notification),
    Init(String),
    ConnLoss,
}

#[derive(Deserialize)]
struct NotifyPayload {
    action: String,
    old: Option<Map<String, Value>>,
    new: Option<Map<String, Value>>,
}

/// Owns the trigger-installing pool and the dedicated LISTEN connection for
/// one database, and the receive loop dispatching to every subscribed
/// table's coordinator.
pub struct Listener {
    ddl_pool: Pool,
    notify_client: Arc<tokio_postgres::Client>,
    tables: Mutex<HashMap<String, Registration>>,
    function_installed: AtomicBool,
    tx: mpsc::UnboundedSender<Event>,
    config: ListenerConfig,
}

impl Listener {
    /// Connect the trigger-installing pool and the dedicated LISTEN
    /// connection using [`ListenerConfig::default`], and spawn the receive
    /// loop.
    pub async fn connect(pg_config: PgConfig) -> Result<Arc<Listener>> {
        Listener::connect_with(pg_config, ListenerConfig::default()).await
    }

    /// Like [`Listener::connect`], with an explicit [`ListenerConfig`]
    /// (setup timeout, keepalive interval, DDL pool size — spec.md §5's
    /// "max-open=1, max-idle=1" made a host-tunable default here).
    pub async fn connect_with(pg_config: PgConfig, config: ListenerConfig) -> Result<Arc<Listener>> {
        let manager = Manager::from_config(
            pg_config.clone(),
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let ddl_pool = Pool::builder(manager)
            .max_size(config.ddl_pool_size)
            .build()
            .expect("pool builder config is always valid here");

        let (notify_client, mut connection) = timeout(config.setup_timeout(), pg_config.connect(NoTls))
            .await
            .map_err(|_| SetupError::Timeout {
                operation: "connect",
                table: String::new(),
            })?
            .map_err(|source| SetupError::Listen {
                channel: String::new(),
                source: Box::new(source),
            })?;
        let notify_client = Arc::new(notify_client);

        let (tx, rx) = mpsc::unbounded_channel();
        let relay_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match poll_fn(|cx| connection.poll_message(cx)).await {
                    Some(Ok(AsyncMessage::Notification(n))) => {
                        if relay_tx.send(Event::Notification(n)).is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "notification connection error, treating as connection loss");
                        let _ = relay_tx.send(Event::ConnLoss);
                    }
                    None => {
                        let _ = relay_tx.send(Event::ConnLoss);
                        break;
                    }
                }
            }
        });

        let listener = Arc::new(Listener {
            ddl_pool,
            notify_client,
            tables: Mutex::new(HashMap::new()),
            function_installed: AtomicBool::new(false),
            tx,
            config,
        });
        listener.clone().spawn_receive_loop(rx);
        Ok(listener)
    }

    /// A `deadpool-postgres` pool suitable for a [`Table`]'s `RowSource`,
    /// sharing this listener's trigger-installing pool.
    pub fn ddl_pool(&self) -> Pool {
        self.ddl_pool.clone()
    }

    /// Subscribe `table` (spec.md §4.4 steps 1–7). Installs the shared
    /// function (once) and the per-table trigger projecting
    /// `columns_to_notify`/`columns_to_check`, subscribes to
    /// `pgnotify_<schema>.<table>`, and blocks until the synthetic initial
    /// load (dispatched through `dispatch`) completes. If the `LISTEN`
    /// fails, the trigger just installed is dropped and the registration
    /// removed before the error is returned (spec.md §7), so a retry of the
    /// same table doesn't hit `DuplicateSubscription`.
    pub async fn add_table(
        &self,
        table: &str,
        columns_to_notify: &[&str],
        columns_to_check: &[&str],
        dispatch: Arc<dyn Dispatch>,
    ) -> Result<()> {
        let qualified = qualify_table(table);

        {
            let tables = self.tables.lock().unwrap();
            if tables.contains_key(&qualified) {
                return Err(SetupError::DuplicateSubscription { table: qualified }.into());
            }
        }

        self.ensure_function_installed(&qualified).await?;

        let notify_projection = trigger::notify_projection(columns_to_notify);
        let check_projection = trigger::check_projection(columns_to_check);
        let trigger_sql = trigger::table_trigger_sql(&qualified, &notify_projection, &check_projection);
        self.run_ddl(&qualified, &trigger_sql).await?;

        let (init_tx, init_rx) = oneshot::channel();
        self.tables.lock().unwrap().insert(
            qualified.clone(),
            Registration {
                dispatch,
                state: TableState::Subscribing,
                init_signal: Some(init_tx),
            },
        );

        let channel = channel_name(&qualified);
        if let Err(err) = timeout(self.config.setup_timeout(), self.notify_client.batch_execute(&format!("LISTEN \"{channel}\"")))
            .await
            .map_err(|_| SetupError::Timeout {
                operation: "listen",
                table: qualified.clone(),
            })
            .and_then(|inner| {
                inner.map_err(|source| SetupError::Listen {
                    channel: channel.clone(),
                    source: Box::new(source),
                })
            })
        {
            // LISTEN never took effect, so nothing is driving this table's
            // state; roll back the trigger and the registration rather than
            // leave both stuck (spec.md §7: "partial state rolled back by
            // dropping the trigger").
            self.tables.lock().unwrap().remove(&qualified);
            if let Err(drop_err) = self.run_ddl(&qualified, &trigger::drop_trigger_sql(&qualified)).await {
                error!(table = %qualified, error = %drop_err, "failed to roll back trigger after LISTEN failure");
            }
            return Err(err.into());
        }

        if self.tx.send(Event::Init(qualified.clone())).is_err() {
            warn!(table = %qualified, "receive loop is gone, init will never run");
        }

        let _ = init_rx.await;
        Ok(())
    }

    /// Drop the subscription for `table` on the database side.
    pub async fn unlisten(&self, table: &str) -> Result<()> {
        let qualified = qualify_table(table);
        let channel = channel_name(&qualified);
        self.notify_client
            .batch_execute(&format!("UNLISTEN \"{channel}\""))
            .await
            .map_err(|source| SetupError::Listen {
                channel,
                source: Box::new(source),
            })?;
        self.tables.lock().unwrap().remove(&qualified);
        Ok(())
    }

    /// Tear down every subscription on this connection.
    pub async fn unlisten_all(&self) -> Result<()> {
        self.notify_client
            .batch_execute("UNLISTEN *")
            .await
            .map_err(|source| SetupError::Listen {
                channel: "*".to_string(),
                source: Box::new(source),
            })?;
        self.tables.lock().unwrap().clear();
        Ok(())
    }

    async fn ensure_function_installed(&self, table: &str) -> Result<()> {
        if self.function_installed.load(Ordering::Acquire) {
            return Ok(());
        }
        self.run_ddl(table, &trigger::function_sql()).await?;
        self.function_installed.store(true, Ordering::Release);
        Ok(())
    }

    async fn run_ddl(&self, table: &str, sql: &str) -> Result<()> {
        let client = timeout(self.config.setup_timeout(), self.ddl_pool.get())
            .await
            .map_err(|_| SetupError::Timeout {
                operation: "checkout_ddl_connection",
                table: table.to_string(),
            })?
            .map_err(|source| SetupError::Trigger {
                table: table.to_string(),
                source: Box::new(source),
            })?;
        timeout(self.config.setup_timeout(), client.batch_execute(sql))
            .await
            .map_err(|_| SetupError::Timeout {
                operation: "install_trigger",
                table: table.to_string(),
            })?
            .map_err(|source| SetupError::Trigger {
                table: table.to_string(),
                source: Box::new(source),
            })?;
        Ok(())
    }

    fn spawn_receive_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<Event>) {
        tokio::spawn(async move {
            let mut keepalive = interval(self.config.keepalive_interval());
            keepalive.tick().await; // the first tick fires immediately; discard it
            loop {
                tokio::select! {
                    event = rx.recv() => {
                        match event {
                            Some(Event::Notification(n)) => self.handle_notification(n).await,
                            Some(Event::Init(table)) => self.handle_init(&table).await,
                            Some(Event::ConnLoss) => self.handle_conn_loss().await,
                            None => break,
                        }
                    }
                    _ = keepalive.tick() => self.ping().await,
                }
            }
        });
    }

    async fn handle_notification(&self, notification: tokio_postgres::Notification) {
        let table = notification.channel().trim_start_matches("pgnotify_").to_string();
        let Some(dispatch) = self.dispatch_for(&table) else {
            error!(channel = notification.channel(), "notification for unregistered table");
            return;
        };

        let payload: NotifyPayload = match serde_json::from_str(notification.payload()) {
            Ok(payload) => payload,
            Err(err) => {
                error!(table = %table, error = %err, "malformed notification payload");
                return;
            }
        };

        let event = match payload.action.as_str() {
            "INSERT" => payload.new.map(TableEvent::Create),
            "UPDATE" => match (payload.old, payload.new) {
                (Some(old), Some(new)) => Some(TableEvent::Update(old, new)),
                _ => None,
            },
            "DELETE" => payload.old.map(TableEvent::Delete),
            other => {
                error!(table = %table, action = other, "unexpected notification action");
                None
            }
        };

        if let Some(event) = event {
            if let Err(err) = dispatch.dispatch(event).await {
                error!(table = %table, error = %err, "dispatch failed");
            }
        }
    }

    async fn handle_init(&self, table: &str) {
        let Some(dispatch) = self.dispatch_for(table) else {
            error!(table, "init for unregistered table");
            return;
        };
        self.set_state(table, TableState::Loading);
        let result = dispatch.dispatch(TableEvent::Init).await;
        match &result {
            Ok(()) => {
                info!(table, "initial load complete");
                self.set_state(table, TableState::Ready);
            }
            Err(err) => error!(table, error = %err, "initial load failed"),
        }
        if let Some(signal) = self.tables.lock().unwrap().get_mut(table).and_then(|r| r.init_signal.take()) {
            let _ = signal.send(());
        }
    }

    async fn handle_conn_loss(&self) {
        let registrations: Vec<(String, Arc<dyn Dispatch>)> = {
            let mut tables = self.tables.lock().unwrap();
            for registration in tables.values_mut() {
                registration.state = TableState::Degraded;
            }
            tables.iter().map(|(name, r)| (name.clone(), r.dispatch.clone())).collect()
        };
        for (table, dispatch) in registrations {
            self.set_state(&table, TableState::Loading);
            match dispatch.dispatch(TableEvent::ConnLoss).await {
                Ok(()) => self.set_state(&table, TableState::Ready),
                Err(err) => error!(table = %table, error = %err, "connection-loss reload failed"),
            }
        }
    }

    async fn ping(&self) {
        if let Err(err) = self.notify_client.batch_execute("SELECT 1").await {
            warn!(error = %err, "keepalive ping failed");
        }
    }

    fn dispatch_for(&self, table: &str) -> Option<Arc<dyn Dispatch>> {
        self.tables.lock().unwrap().get(table).map(|r| r.dispatch.clone())
    }

    fn set_state(&self, table: &str, state: TableState) {
        if let Some(registration) = self.tables.lock().unwrap().get_mut(table) {
            registration.state = state;
        }
    }
}

/// Qualify `table` to `schema.name`, defaulting to `public` when
/// unqualified (spec.md §4.4 step 1).
fn qualify_table(table: &str) -> String {
    if table.contains('.') {
        table.to_string()
    } else {
        format!("public.{table}")
    }
}

/// The notification channel name for an already-qualified table (spec.md
/// §6: `pgnotify_<schema>.<name>`).
fn channel_name(qualified_table: &str) -> String {
    format!("pgnotify_{qualified_table}")
}
