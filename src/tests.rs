//! Integration tests for the query adapter running against the in-memory store

use crate::client::*;
use crate::codec;
use crate::store::MemoryBackend;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::Level;

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Log sink that keeps every message for inspection
    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<(Level, String)>>,
    }

    impl RecordingSink {
        fn lines(&self) -> Vec<(Level, String)> {
            self.lines.lock().unwrap().clone()
        }

        fn contains(&self, level: Level, needle: &str) -> bool {
            self.lines()
                .iter()
                .any(|(l, line)| *l == level && line.contains(needle))
        }
    }

    impl LogSink for RecordingSink {
        fn log(&self, level: Level, message: &str) {
            self.lines.lock().unwrap().push((level, message.to_string()));
        }
    }

    fn config() -> GatewayConnectionConfig {
        GatewayConnectionConfig::new("memory", "smsd", "smsd", "secret")
            .with_delay(Duration::from_secs(10))
            .with_health_interval(Duration::from_secs(30))
    }

    fn start(
        backend: &MemoryBackend,
        config: GatewayConnectionConfig,
        sink: &Arc<RecordingSink>,
    ) -> QueryAdapter<MemoryBackend> {
        AdapterBuilder::new(config)
            .log_sink(sink.clone())
            .connect(backend.clone())
            .unwrap()
    }

    fn failed_on_connection<T>(result: &GatewayResult<T>) -> bool {
        match result {
            Err(GatewayError::Query(error)) => error.is_connection_lost(),
            _ => false,
        }
    }

    async fn wait_for(adapter: &QueryAdapter<MemoryBackend>, state: ConnectionState) {
        let mut rx = adapter.manager().watch_state();
        rx.wait_for(|s| *s == state).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_to_inserts_daemon_row() {
        let backend = MemoryBackend::new();
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(&backend, config(), &sink);
        wait_for(&adapter, ConnectionState::Connected).await;

        let result = adapter
            .send_to(&SmsCommand::new("612345678", "hi"))
            .await
            .unwrap();
        assert_eq!(result.affected_rows, 1);

        let outbox = backend.outbox();
        assert_eq!(outbox.len(), 1);
        let (id, row) = &outbox[0];
        assert_eq!(*id, result.id);
        assert_eq!(row.destination_number, "+612345678");
        assert!(!row.multi_part);
        assert_eq!(row.relative_validity, 255);
        assert_eq!(row.class, -1);
        assert_eq!(row.text, codec::encode("hi").unwrap());
        assert_eq!(row.creator_id, "+612345678");

        assert!(adapter.check_by_id(result.id).await.unwrap());
        assert!(!adapter.check_by_id(result.id + 1).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_from_respects_sender_and_limit() {
        let backend = MemoryBackend::new();
        for i in 0..4 {
            backend.push_inbox("+33611111111", &format!("fix {i}"));
            backend.push_inbox("+33622222222", &format!("other {i}"));
        }
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(&backend, config(), &sink);
        wait_for(&adapter, ConnectionState::Connected).await;

        for limit in [0, 1, 3, 10] {
            let rows = adapter.get_from("+33611111111", Some(limit)).await.unwrap();
            assert!(rows.len() <= limit as usize);
            assert!(rows.iter().all(|r| r.sender_number == "+33611111111"));
            assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        }
        assert_eq!(adapter.get_from("+33611111111", None).await.unwrap().len(), 4);
        assert_eq!(adapter.get_all(None).await.unwrap().len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_del_by_id() {
        let backend = MemoryBackend::new();
        let id = backend.push_inbox("+33611111111", "ack");
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(&backend, config(), &sink);
        wait_for(&adapter, ConnectionState::Connected).await;

        assert_eq!(adapter.del_by_id(id).await.unwrap(), 1);
        assert_eq!(adapter.del_by_id(id).await.unwrap(), 0);
        assert_eq!(adapter.del_by_id(9999).await.unwrap(), 0);
        assert!(backend.inbox().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_while_reconnecting_fails_without_queueing() {
        let backend = MemoryBackend::new();
        backend.refuse_connects(1);
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(&backend, config(), &sink);
        wait_for(&adapter, ConnectionState::Reconnecting).await;

        let err = adapter
            .send_to(&SmsCommand::new("612345678", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Query(StoreError::NotConnected(_))));

        wait_for(&adapter, ConnectionState::Connected).await;
        // Nothing was replayed after reconnecting
        assert!(backend.outbox().is_empty());
        assert_eq!(adapter.manager().status().reconnects_scheduled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_connection_fails_query_and_triggers_reconnect() {
        let backend = MemoryBackend::new();
        backend.push_inbox("+33611111111", "hello");
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(&backend, config(), &sink);
        wait_for(&adapter, ConnectionState::Connected).await;

        backend.drop_connections();
        let start = Instant::now();
        let err = adapter.get_all(None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Query(StoreError::ConnectionLost(_))));

        // The failed query reported the loss; no health probe was needed
        wait_for(&adapter, ConnectionState::Reconnecting).await;
        assert!(start.elapsed() < Duration::from_secs(1));

        wait_for(&adapter, ConnectionState::Connected).await;
        assert_eq!(adapter.get_all(None).await.unwrap().len(), 1);
        assert!(sink.contains(Level::WARN, "Connection to mysql://smsd@memory:3306/smsd lost"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_to_while_disconnected_encodes_but_inserts_nothing() {
        let backend = MemoryBackend::new();
        backend.refuse_connects(u32::MAX);
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(&backend, config(), &sink);
        let command = SmsCommand::new("0612345678", "Zürich");

        // The row is built without a connection
        let record = adapter.build_outbox(&command).unwrap();
        assert_eq!(record.destination_number, "0612345678");
        assert_eq!(codec::decode(&record.text).unwrap(), "Zürich");

        // but the insert itself needs one
        let err = adapter.send_to(&command).await.unwrap_err();
        assert!(matches!(err, GatewayError::Query(StoreError::NotConnected(_))));
        assert!(backend.outbox().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failures_schedule_one_reconnect() {
        let backend = MemoryBackend::new();
        backend.push_inbox("+33611111111", "hello");
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(
            &backend,
            config().with_health_interval(Duration::from_secs(1)),
            &sink,
        );
        wait_for(&adapter, ConnectionState::Connected).await;

        backend.drop_connections();
        // The queries below land on the same instant as the first health probe
        tokio::time::sleep(Duration::from_secs(1)).await;
        let (a, b, c) = tokio::join!(
            adapter.get_all(None),
            adapter.get_from("+33611111111", None),
            adapter.del_by_id(1),
        );
        assert!(failed_on_connection(&a));
        assert!(failed_on_connection(&b));
        assert!(failed_on_connection(&c));

        tokio::time::sleep(Duration::from_secs(25)).await;
        let status = adapter.manager().status();
        assert_eq!(status.state, ConnectionState::Connected);
        assert_eq!(status.reconnects_scheduled, 1);
        assert_eq!(status.connect_attempts, 2);
        assert_eq!(backend.connect_attempts(), 2);

        let lost = sink
            .lines()
            .iter()
            .filter(|(level, line)| *level == Level::WARN && line.contains("lost"))
            .count();
        assert_eq!(lost, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_transition_reaches_sink_when_quiet() {
        let backend = MemoryBackend::new();
        backend.refuse_connects(1);
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(&backend, config().with_debug(0), &sink);
        let mut events = adapter.manager().subscribe();
        wait_for(&adapter, ConnectionState::Connected).await;

        let mut seen = 0;
        while let Ok(event) = events.try_recv() {
            let line = format!("state {} -> {}", event.from, event.to);
            assert!(sink.contains(Level::DEBUG, &line), "missing {line:?}");
            seen += 1;
        }
        assert_eq!(seen, 4);
        assert!(sink.contains(Level::DEBUG, "state disconnected -> connecting"));
        assert!(sink.contains(Level::DEBUG, "state reconnecting -> connecting"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_and_failure_logging() {
        let backend = MemoryBackend::new();
        backend.refuse_connects(1);
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(&backend, config().with_debug(1), &sink);
        wait_for(&adapter, ConnectionState::Connected).await;

        assert!(sink.contains(Level::ERROR, "Connection to mysql://smsd@memory:3306/smsd failed"));
        assert!(sink.contains(Level::INFO, "Reconnecting to mysql://smsd@memory:3306/smsd in 10s"));
        assert!(sink.contains(Level::INFO, "Connected to mysql://smsd@memory:3306/smsd"));
        assert!(sink.contains(Level::INFO, "state connecting -> reconnecting"));
        // No query text below debug level 2
        adapter.get_all(None).await.unwrap();
        assert!(!sink.contains(Level::DEBUG, "query:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_text_logged_at_high_verbosity() {
        let backend = MemoryBackend::new();
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(&backend, config().with_debug(2), &sink);
        wait_for(&adapter, ConnectionState::Connected).await;

        adapter.get_from("+33611111111", Some(5)).await.unwrap();
        let rendered = "SELECT ID, ReceivingDateTime, SMSCNumber, SenderNumber, TextDecoded \
             FROM inbox WHERE SenderNumber = '+33611111111' ORDER BY ID ASC LIMIT 5";
        assert!(sink.contains(Level::DEBUG, &format!("query: {rendered}")));
        assert!(sink.contains(Level::DEBUG, &format!("query done: {rendered}: 0 rows")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_query_logs_failure() {
        let backend = MemoryBackend::new();
        backend.refuse_connects(1);
        let sink = Arc::new(RecordingSink::default());
        let adapter = start(&backend, config().with_debug(2), &sink);
        wait_for(&adapter, ConnectionState::Reconnecting).await;

        adapter.del_by_id(7).await.unwrap_err();
        assert!(sink.contains(Level::DEBUG, "query: DELETE FROM inbox WHERE ID = 7"));
        assert!(sink.contains(
            Level::DEBUG,
            "query failed: DELETE FROM inbox WHERE ID = 7: not connected to mysql://smsd@memory:3306/smsd"
        ));
    }
}
