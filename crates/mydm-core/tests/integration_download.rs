//! End-to-end engine tests against a local range-capable HTTP server.
//!
//! Each test drives the public `DownloadManager` API and observes the
//! event channel, the registry snapshots, and the download directory.

mod common;

use std::path::Path;
use std::time::Duration;

use common::range_server::{self, ServerOptions};
use mydm_core::engine::DownloadManager;
use mydm_core::events::{event_channel, Event, EventSender};
use mydm_core::registry::DownloadStatus;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const EVENT_TIMEOUT: Duration = Duration::from_secs(30);

fn test_body(len: usize) -> Vec<u8> {
    (0u8..=255).cycle().take(len).collect()
}

fn manager(segments: usize) -> (DownloadManager, EventSender, UnboundedReceiver<Event>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let (events, rx) = event_channel();
    let m = DownloadManager::new(dir.path().to_path_buf(), segments, events.clone()).unwrap();
    (m, events, rx, dir)
}

async fn next_event(rx: &mut UnboundedReceiver<Event>) -> Event {
    timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Collects events until the `complete` for `id`, returning everything seen.
async fn events_until_complete(rx: &mut UnboundedReceiver<Event>, id: &str) -> Vec<Event> {
    let mut seen = Vec::new();
    loop {
        let ev = next_event(rx).await;
        let done = matches!(&ev, Event::Complete { id: got, .. } if got.as_str() == id);
        seen.push(ev);
        if done {
            return seen;
        }
    }
}

fn sidecars_present(final_path: &Path, count: usize) -> bool {
    (0..count).any(|i| {
        let mut os = final_path.as_os_str().to_os_string();
        os.push(format!(".part{i}"));
        Path::new(&os).exists()
    })
}

#[tokio::test]
async fn small_file_downloads_with_a_single_get() {
    let body = test_body(512 * 1024);
    let server = range_server::start(body.clone());
    let (m, _events, mut rx, dir) = manager(8);

    let id = m.start_download(&server.url, None);
    assert!(matches!(next_event(&mut rx).await, Event::Started { id: got } if got == id));

    let seen = events_until_complete(&mut rx, &id).await;
    let progress: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            Event::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(!progress.is_empty(), "expected at least one progress event");
    assert!(progress.iter().all(|p| (1..=100).contains(p)));

    match seen.last().unwrap() {
        Event::Complete { filename, file, percent, .. } => {
            assert_eq!(filename, "file.bin");
            assert_eq!(*percent, 100);
            assert_eq!(std::fs::read(file).unwrap(), body);
        }
        other => panic!("expected complete, got {:?}", other),
    }

    // Below 1 MiB the engine must not split: exactly one GET, no Range.
    let gets = server.gets();
    assert_eq!(gets.len(), 1);
    assert!(gets[0].range.is_none());

    let final_path = dir.path().join("file.bin");
    assert_eq!(std::fs::metadata(&final_path).unwrap().len(), 512 * 1024);
    assert!(!sidecars_present(&final_path, 8));
}

#[tokio::test]
async fn sixteen_mib_file_splits_into_eight_ranges() {
    let body = test_body(16 * 1024 * 1024);
    let server = range_server::start(body.clone());
    let (m, _events, mut rx, dir) = manager(8);

    let id = m.start_download(&server.url, None);
    assert!(matches!(next_event(&mut rx).await, Event::Started { .. }));
    let seen = events_until_complete(&mut rx, &id).await;

    // percent is monotonically non-decreasing per download.
    let percents: Vec<u32> = seen
        .iter()
        .filter_map(|e| match e {
            Event::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));

    let mut ranges: Vec<String> = server
        .gets()
        .into_iter()
        .map(|r| r.range.expect("every segmented GET carries a Range"))
        .collect();
    ranges.sort_by_key(|r| {
        r.trim_start_matches("bytes=")
            .split('-')
            .next()
            .unwrap()
            .parse::<u64>()
            .unwrap()
    });
    assert_eq!(
        ranges,
        vec![
            "bytes=0-2097151",
            "bytes=2097152-4194303",
            "bytes=4194304-6291455",
            "bytes=6291456-8388607",
            "bytes=8388608-10485759",
            "bytes=10485760-12582911",
            "bytes=12582912-14680063",
            "bytes=14680064-16777215",
        ]
    );

    let final_path = dir.path().join("file.bin");
    assert_eq!(std::fs::read(&final_path).unwrap(), body);
    assert!(!sidecars_present(&final_path, 8));

    let record = m.status(&id).unwrap();
    assert_eq!(record.status, DownloadStatus::Complete);
    assert_eq!(record.downloaded, body.len() as u64);
    assert_eq!(record.num_segments, 8);
}

#[tokio::test]
async fn cancel_mid_flight_removes_all_sidecars() {
    let body = test_body(4 * 1024 * 1024);
    let server = range_server::start_with_options(
        body,
        ServerOptions {
            throttle: Some((64 * 1024, Duration::from_millis(25))),
            ..Default::default()
        },
    );
    let (m, _events, mut rx, dir) = manager(8);

    let id = m.start_download(&server.url, None);
    assert!(matches!(next_event(&mut rx).await, Event::Started { .. }));

    // Wait for the first progress report, then pull the plug.
    loop {
        if matches!(next_event(&mut rx).await, Event::Progress { .. }) {
            break;
        }
    }
    m.cancel(&id);
    assert!(matches!(next_event(&mut rx).await, Event::Cancelled { id: got } if got == id));

    // The coordinator notices the flag, drains its workers, and cleans up.
    let final_path = dir.path().join("file.bin");
    let deadline = std::time::Instant::now() + EVENT_TIMEOUT;
    loop {
        let record = m.status(&id).unwrap();
        if record.status == DownloadStatus::Cancelled
            && !sidecars_present(&final_path, 8)
            && !final_path.exists()
        {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "cleanup did not finish in time"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // The ack was the terminal event; nothing terminal may follow it.
    tokio::time::sleep(Duration::from_millis(500)).await;
    while let Ok(ev) = rx.try_recv() {
        assert!(
            !matches!(ev, Event::Complete { .. } | Event::Error { .. }),
            "unexpected event after cancel: {:?}",
            ev
        );
    }
}

#[tokio::test]
async fn pause_stops_progress_and_resume_finishes() {
    let body = test_body(512 * 1024);
    let server = range_server::start_with_options(
        body.clone(),
        ServerOptions {
            throttle: Some((32 * 1024, Duration::from_millis(50))),
            ..Default::default()
        },
    );
    let (m, _events, mut rx, dir) = manager(8);

    let id = m.start_download(&server.url, None);
    assert!(matches!(next_event(&mut rx).await, Event::Started { .. }));
    loop {
        if matches!(next_event(&mut rx).await, Event::Progress { .. }) {
            break;
        }
    }

    m.pause(&id);
    assert!(matches!(next_event(&mut rx).await, Event::Paused { id: got } if got == id));
    assert_eq!(m.status(&id).unwrap().status, DownloadStatus::Paused);

    // Let in-flight chunk reports settle, then demand silence.
    tokio::time::sleep(Duration::from_millis(500)).await;
    while rx.try_recv().is_ok() {}
    assert!(
        timeout(Duration::from_secs(1), rx.recv()).await.is_err(),
        "no events may arrive while paused"
    );

    m.resume(&id);
    assert!(matches!(next_event(&mut rx).await, Event::Resumed { id: got } if got == id));

    let seen = events_until_complete(&mut rx, &id).await;
    assert!(matches!(seen.last().unwrap(), Event::Complete { .. }));
    assert_eq!(
        std::fs::read(dir.path().join("file.bin")).unwrap(),
        body
    );
}

#[tokio::test]
async fn probe_failure_emits_error_and_touches_nothing() {
    let server = range_server::start_with_options(
        Vec::new(),
        ServerOptions {
            status: 404,
            ..Default::default()
        },
    );
    let (m, _events, mut rx, dir) = manager(8);

    let id = m.start_download(&server.url, None);
    assert!(matches!(next_event(&mut rx).await, Event::Started { .. }));
    match next_event(&mut rx).await {
        Event::Error { id: got, error } => {
            assert_eq!(got.as_deref(), Some(id.as_str()));
            assert!(
                error.starts_with("Failed to get file info:"),
                "unexpected error text: {error}"
            );
        }
        other => panic!("expected error event, got {:?}", other),
    }

    assert_eq!(m.status(&id).unwrap().status, DownloadStatus::Error);
    assert!(server.gets().is_empty(), "no GET may follow a failed probe");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn existing_complete_file_skips_all_network_fetches() {
    let body = test_body(2 * 1024 * 1024);
    let server = range_server::start(body.clone());
    let (m, _events, mut rx, dir) = manager(8);
    std::fs::write(dir.path().join("file.bin"), &body).unwrap();

    let id = m.start_download(&server.url, None);
    assert!(matches!(next_event(&mut rx).await, Event::Started { .. }));
    match next_event(&mut rx).await {
        Event::Complete { id: got, percent, .. } => {
            assert_eq!(got, id);
            assert_eq!(percent, 100);
        }
        other => panic!("expected immediate complete, got {:?}", other),
    }

    assert_eq!(server.heads().len(), 1);
    assert!(server.gets().is_empty(), "pre-flight hit must not fetch");
    assert_eq!(m.status(&id).unwrap().downloaded, body.len() as u64);
}

#[tokio::test]
async fn duplicate_download_reuses_the_running_transfer() {
    let body = test_body(2 * 1024 * 1024);
    let server = range_server::start_with_options(
        body,
        ServerOptions {
            throttle: Some((128 * 1024, Duration::from_millis(10))),
            ..Default::default()
        },
    );
    let (m, _events, mut rx, _dir) = manager(4);

    let first = m.start_download(&server.url, None);
    let second = m.start_download(&server.url, None);
    assert_eq!(first, second);

    // Both commands ack, but only one transfer probes and fetches.
    assert!(matches!(next_event(&mut rx).await, Event::Started { .. }));
    assert!(matches!(next_event(&mut rx).await, Event::Started { .. }));
    let seen = events_until_complete(&mut rx, &first).await;
    let completes = seen
        .iter()
        .filter(|e| matches!(e, Event::Complete { .. }))
        .count();
    assert_eq!(completes, 1);
    assert_eq!(server.heads().len(), 1);
    assert_eq!(server.gets().len(), 4);
}
