// ABOUTME: Connection manager owning the single logical store connection and its reconnect loop
// ABOUTME: Classifies runtime failures, reconnects after a fixed delay and publishes fatal errors

use crate::client::config::GatewayConnectionConfig;
use crate::client::error::{ErrorClass, GatewayError, GatewayResult, StoreError};
use crate::client::keepalive::{HealthConfig, HealthMonitor};
use crate::client::traits::{LogSink, StoreBackend, StoreConnection};
use crate::client::types::{ConnectionEvent, ConnectionState, ConnectionStatus, Verbosity};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::Level;

/// Store connection lifecycle
///
/// The manager owns one logical connection and keeps it alive for the
/// lifetime of the process. A single background task (the supervisor) drives
/// the state machine:
///
/// ```text
/// Disconnected --initialize--> Connecting --success--> Connected
///      Connected --lost--> Reconnecting --delay--> Connecting
///      Connecting --failure--> Reconnecting
/// ```
///
/// ## Failure handling
///
/// - A failed connect attempt is logged and retried after the configured
///   fixed `delay`. There is no backoff and no attempt limit.
/// - While connected, the connection is probed every `health_interval`.
///   Failures reported by the probe or by the query adapter are classified:
///   a lost connection goes back through `Reconnecting`; anything else is
///   fatal, published through [`ConnectionManager::fatal`], and stops the
///   supervisor with the state set back to `Disconnected`.
/// - The reconnect delay is a sleep inside the supervisor loop, so at most one
///   reconnect is ever pending. Failures that arrive while reconnecting belong
///   to a superseded connection and are ignored.
///
/// Queries are never buffered or replayed across a reconnect.
pub struct ConnectionManager<B: StoreBackend> {
    shared: Arc<Shared<B::Connection>>,
    supervisor: JoinHandle<()>,
}

/// A connection handed out to the query adapter, tagged with the connect
/// attempt that produced it
pub(crate) struct Live<C> {
    pub generation: u64,
    pub conn: Arc<C>,
}

impl<C> Clone for Live<C> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            conn: Arc::clone(&self.conn),
        }
    }
}

/// Unrecoverable failure published by the supervisor
#[derive(Debug, Clone)]
pub struct FatalError {
    pub uid: String,
    pub error: Arc<StoreError>,
}

impl From<FatalError> for GatewayError {
    fn from(fatal: FatalError) -> Self {
        GatewayError::Fatal {
            uid: fatal.uid,
            source: fatal.error,
        }
    }
}

struct RuntimeReport {
    generation: u64,
    error: StoreError,
}

struct Shared<C> {
    config: GatewayConnectionConfig,
    uid: String,
    verbosity: Verbosity,
    log: Arc<dyn LogSink>,
    live: RwLock<Option<Live<C>>>,
    state_tx: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ConnectionEvent>,
    fatal_tx: watch::Sender<Option<FatalError>>,
    reports: mpsc::UnboundedSender<RuntimeReport>,
    connect_attempts: AtomicU32,
    reconnects_scheduled: AtomicU32,
    last_error: Mutex<Option<String>>,
}

impl<C> Shared<C> {
    fn log(&self, level: Level, message: &str) {
        self.log.log(level, message);
    }

    fn transition(&self, to: ConnectionState) {
        let from = self.state_tx.send_replace(to);
        if from == to {
            return;
        }
        // Every transition reaches the sink; verbosity only raises its level.
        let level = if self.verbosity >= Verbosity::Transitions {
            Level::INFO
        } else {
            Level::DEBUG
        };
        self.log(level, &format!("{}: state {from} -> {to}", self.uid));
        let _ = self.events.send(ConnectionEvent { from, to });
    }

    fn set_live(&self, live: Option<Live<C>>) {
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = live;
    }

    fn record_error(&self, message: String) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
    }
}

impl<B: StoreBackend> ConnectionManager<B> {
    /// Start managing a connection to the store described by `config`
    ///
    /// Returns immediately. The first connect attempt runs on a background
    /// task; its outcome is observable through [`state`](Self::state),
    /// [`subscribe`](Self::subscribe) and the log sink. Must be called from
    /// within a Tokio runtime.
    pub fn initialize(
        config: GatewayConnectionConfig,
        backend: B,
        log: Arc<dyn LogSink>,
    ) -> GatewayResult<Self> {
        config.validate()?;

        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(64);
        let (fatal_tx, _) = watch::channel(None);
        let (reports, reports_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            uid: config.uid(),
            verbosity: config.verbosity(),
            config,
            log,
            live: RwLock::new(None),
            state_tx,
            events,
            fatal_tx,
            reports,
            connect_attempts: AtomicU32::new(0),
            reconnects_scheduled: AtomicU32::new(0),
            last_error: Mutex::new(None),
        });

        let supervisor = tokio::spawn(supervise(backend, Arc::clone(&shared), reports_rx));

        Ok(Self { shared, supervisor })
    }

    /// Stable identifier of the managed connection
    pub fn uid(&self) -> &str {
        &self.shared.uid
    }

    pub fn config(&self) -> &GatewayConnectionConfig {
        &self.shared.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Receiver that always holds the current state
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Stream of state transitions from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            uid: self.shared.uid.clone(),
            state: self.state(),
            connect_attempts: self.shared.connect_attempts.load(Ordering::Relaxed),
            reconnects_scheduled: self.shared.reconnects_scheduled.load(Ordering::Relaxed),
            last_error: self
                .shared
                .last_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    /// Wait until the supervisor gives up on an unclassified failure
    ///
    /// Hosts typically select on this next to their own work and terminate
    /// when it resolves. Pending forever while the connection is recoverable.
    pub async fn fatal(&self) -> GatewayError {
        let mut rx = self.shared.fatal_tx.subscribe();
        loop {
            if let Some(fatal) = rx.borrow_and_update().clone() {
                return fatal.into();
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Current live connection, or `NotConnected` while (re)connecting
    pub(crate) fn live(&self) -> Result<Live<B::Connection>, StoreError> {
        self.shared
            .live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| StoreError::NotConnected(self.shared.uid.clone()))
    }

    /// Hand a failure observed on a live connection to the supervisor
    pub(crate) fn report(&self, generation: u64, error: StoreError) {
        let _ = self.shared.reports.send(RuntimeReport { generation, error });
    }

    pub(crate) fn verbosity(&self) -> Verbosity {
        self.shared.verbosity
    }

    pub(crate) fn log(&self, level: Level, message: &str) {
        self.shared.log(level, message);
    }
}

impl<B: StoreBackend> Drop for ConnectionManager<B> {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

enum Outcome {
    Lost(String),
    Fatal(StoreError),
}

fn classify(error: StoreError) -> Outcome {
    match error.class() {
        ErrorClass::ConnectionLost => Outcome::Lost(error.to_string()),
        ErrorClass::Query | ErrorClass::Unclassified => Outcome::Fatal(error),
    }
}

async fn supervise<B: StoreBackend>(
    backend: B,
    shared: Arc<Shared<B::Connection>>,
    mut reports: mpsc::UnboundedReceiver<RuntimeReport>,
) {
    let mut generation: u64 = 0;

    loop {
        shared.transition(ConnectionState::Connecting);
        shared.connect_attempts.fetch_add(1, Ordering::Relaxed);

        match backend.connect(&shared.config).await {
            Ok(conn) => {
                generation += 1;
                let conn = Arc::new(conn);
                shared.set_live(Some(Live {
                    generation,
                    conn: Arc::clone(&conn),
                }));
                shared.transition(ConnectionState::Connected);
                shared.log(Level::INFO, &format!("Connected to {}", shared.uid));

                let outcome = watch_connection(&shared, conn.as_ref(), generation, &mut reports).await;
                shared.set_live(None);

                match outcome {
                    Outcome::Lost(reason) => {
                        shared.log(
                            Level::WARN,
                            &format!("Connection to {} lost: {reason}", shared.uid),
                        );
                        shared.record_error(reason);
                    }
                    Outcome::Fatal(error) => {
                        shared.log(
                            Level::ERROR,
                            &format!("Unrecoverable error on {}: {error}", shared.uid),
                        );
                        shared.record_error(error.to_string());
                        shared.transition(ConnectionState::Disconnected);
                        shared.fatal_tx.send_replace(Some(FatalError {
                            uid: shared.uid.clone(),
                            error: Arc::new(error),
                        }));
                        return;
                    }
                }
            }
            Err(error) => {
                shared.log(
                    Level::ERROR,
                    &format!("Connection to {} failed: {error}", shared.uid),
                );
                shared.record_error(error.to_string());
            }
        }

        shared.transition(ConnectionState::Reconnecting);
        shared.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
        shared.log(
            Level::INFO,
            &format!(
                "Reconnecting to {} in {}s",
                shared.uid,
                shared.config.delay.as_secs_f64()
            ),
        );
        time::sleep(shared.config.delay).await;
    }
}

/// Probe a live connection and wait for it to fail
async fn watch_connection<C: StoreConnection>(
    shared: &Shared<C>,
    conn: &C,
    generation: u64,
    reports: &mut mpsc::UnboundedReceiver<RuntimeReport>,
) -> Outcome {
    let mut health = HealthMonitor::new(HealthConfig::new(
        shared.config.health_interval,
        shared.config.retry,
    ));
    let mut ticker = time::interval_at(Instant::now() + health.interval(), health.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                health.on_probe_sent();
                match time::timeout(health.timeout(), conn.ping()).await {
                    Ok(Ok(())) => health.on_probe_answered(),
                    Ok(Err(error)) => return classify(error),
                    Err(_) => {
                        health.on_probe_timeout();
                        if health.is_connection_failed() {
                            return Outcome::Lost(format!(
                                "{} consecutive health probes timed out",
                                health.status().consecutive_misses
                            ));
                        }
                    }
                }
            }
            Some(report) = reports.recv() => {
                // Reports from a superseded connection are stale.
                if report.generation == generation {
                    return classify(report.error);
                }
            }
        }
    }
}
