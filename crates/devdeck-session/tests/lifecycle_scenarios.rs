//! End-to-end lifecycle scenarios through the full session wiring.
//!
//! These tests drive a `Session` the way a host adapter would: commands go
//! through the manager, asynchronous confirmations arrive over the attached
//! event feed, and log delivery runs through the stream controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use devdeck_core::config::SessionConfig;
use devdeck_core::domain::{DeliveryMode, LogChannel, LogEntry, ProcessPhase};
use devdeck_core::events::{BuildStatus, HostEvent};
use devdeck_core::ports::{
    HostError, NoopSink, ProcessHostPort, RunningProcess, SessionEventSink, SpawnAck,
};
use devdeck_session::Session;
use tokio::sync::mpsc;

/// Host stub: acknowledges every command, refuses live log streams (so the
/// controller exercises the pull path), and serves a canned history.
#[derive(Default)]
struct ScriptedHost {
    refuse_streams: bool,
    stream_stopped: AtomicBool,
}

#[async_trait]
impl ProcessHostPort for ScriptedHost {
    async fn start_process(&self, _id: &str) -> Result<SpawnAck, HostError> {
        Ok(SpawnAck {
            pid: 100,
            port: Some(3000),
        })
    }

    async fn stop_process(&self, _id: &str) -> Result<(), HostError> {
        Ok(())
    }

    async fn restart_process(&self, _id: &str) -> Result<SpawnAck, HostError> {
        Ok(SpawnAck {
            pid: 101,
            port: Some(3000),
        })
    }

    async fn list_running(&self) -> Result<Vec<RunningProcess>, HostError> {
        Ok(vec![])
    }

    async fn start_log_stream(
        &self,
        _source: &str,
        _channel: LogChannel,
    ) -> Result<bool, HostError> {
        Ok(!self.refuse_streams)
    }

    async fn stop_log_stream(&self, _source: &str, _channel: LogChannel) -> Result<bool, HostError> {
        self.stream_stopped.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn fetch_log_history(
        &self,
        source: &str,
        channel: LogChannel,
        _max_lines: usize,
    ) -> Result<Vec<LogEntry>, HostError> {
        Ok(vec![LogEntry::new(source, channel, "from history")])
    }

    async fn clear_log_history(&self, _source: &str, _channel: LogChannel) -> Result<(), HostError> {
        Ok(())
    }
}

async fn session_with(
    host: ScriptedHost,
    config: SessionConfig,
) -> (Session, mpsc::Sender<HostEvent>) {
    let session = Session::new(
        Arc::new(host),
        Arc::new(NoopSink::new()) as Arc<dyn SessionEventSink>,
        config,
    );
    let (tx, rx) = mpsc::channel(64);
    session.attach(rx).await;
    (session, tx)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

#[tokio::test]
async fn build_sequence_ends_launched_and_settled() {
    let (session, tx) = session_with(ScriptedHost::default(), SessionConfig::default()).await;

    session.manager().start("p1").await.unwrap();
    for status in [
        BuildStatus::Compiling,
        BuildStatus::Compiled,
        BuildStatus::Launched,
    ] {
        tx.send(HostEvent::build_status(
            "p1",
            status,
            (status == BuildStatus::Launched).then(|| "port 3000".to_string()),
        ))
        .await
        .unwrap();
    }
    settle().await;

    let snapshot = session.manager().snapshot("p1").await.unwrap();
    assert_eq!(snapshot.phase, ProcessPhase::Launched);
    assert!(!snapshot.transient);
    assert_eq!(snapshot.pid, Some(100));
    assert_eq!(snapshot.port, Some(3000));

    session.shutdown().await;
}

#[tokio::test]
async fn silent_host_trips_the_safety_timeout() {
    let config = SessionConfig::default().with_safety_timeout_ms(50);
    let (session, _tx) = session_with(ScriptedHost::default(), config).await;

    session.manager().start("p2").await.unwrap();
    assert!(session.manager().is_transient("p2").await);

    tokio::time::sleep(Duration::from_millis(150)).await;

    let snapshot = session.manager().snapshot("p2").await.unwrap();
    assert!(!snapshot.transient);
    assert!(snapshot.stalled);
    // The phase is whatever it was at timeout, never a fabricated success.
    assert_eq!(snapshot.phase, ProcessPhase::Starting);

    session.shutdown().await;
}

#[tokio::test]
async fn crash_after_launch_removes_the_record() {
    let (session, tx) = session_with(ScriptedHost::default(), SessionConfig::default()).await;

    session.manager().start("p1").await.unwrap();
    tx.send(HostEvent::build_status("p1", BuildStatus::Launched, None))
        .await
        .unwrap();
    settle().await;

    // The process dies on its own; the host notices.
    tx.send(HostEvent::process_stopped("p1")).await.unwrap();
    settle().await;

    assert!(session.manager().snapshot("p1").await.is_none());
    session.shutdown().await;
}

#[tokio::test]
async fn refused_stream_polls_history_into_the_buffer() {
    let config = SessionConfig::default().with_poll_interval_ms(25);
    let (session, _tx) = session_with(
        ScriptedHost {
            refuse_streams: true,
            ..ScriptedHost::default()
        },
        config,
    )
    .await;

    let mode = session
        .streams()
        .subscribe("daemon", LogChannel::Stdout)
        .await;
    assert_eq!(mode, DeliveryMode::Pull);

    tokio::time::sleep(Duration::from_millis(80)).await;
    let entries = session.service_logs().entries("daemon", LogChannel::Stdout);
    assert!(!entries.is_empty());
    assert_eq!(entries[0].text, "from history");

    session.shutdown().await;
}

#[tokio::test]
async fn shutdown_releases_host_side_streams() {
    let host = Arc::new(ScriptedHost::default());
    let session = Session::new(
        Arc::clone(&host) as Arc<dyn ProcessHostPort>,
        Arc::new(NoopSink::new()),
        SessionConfig::default(),
    );

    let mode = session
        .streams()
        .subscribe("daemon", LogChannel::Stdout)
        .await;
    assert_eq!(mode, DeliveryMode::Push);

    session.shutdown().await;
    assert!(host.stream_stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn sustained_output_keeps_only_the_newest_entries() {
    let config = SessionConfig::default().with_process_log_capacity(1000);
    let (session, tx) = session_with(ScriptedHost::default(), config).await;

    for i in 1..=1500 {
        tx.send(HostEvent::process_log(
            "p1",
            i.to_string(),
            LogChannel::Stdout,
        ))
        .await
        .unwrap();
    }
    settle().await;

    let entries = session.process_logs().entries("p1", LogChannel::Stdout);
    assert_eq!(entries.len(), 1000);
    assert_eq!(entries.first().unwrap().text, "501");
    assert_eq!(entries.last().unwrap().text, "1500");

    session.shutdown().await;
}
