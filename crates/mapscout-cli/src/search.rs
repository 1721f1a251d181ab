//! `search` command: runs one session against Chromium and streams records
//! to a JSON-lines file.

use std::fs::File;
use std::future::Future;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mapscout_core::{AppConfig, PlaceRecord};
use mapscout_scraper::{
    ChannelObserver, ChromiumBrowser, LaunchOptions, SearchQuery, SearchSession, SessionEvent,
    StopHandle,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// `mapscout-20261018-141503.jsonl`
pub(crate) fn default_output_path(now: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!("mapscout-{}.jsonl", now.format("%Y%m%d-%H%M%S")))
}

/// Writes one record as a single JSON line in delivered-row form.
pub(crate) fn write_row<W: Write>(writer: &mut W, record: &PlaceRecord) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *writer, &record.to_row())?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Drains session events until completion, printing statuses and writing
/// records. Returns the number of records written.
async fn consume_events<W: Write>(
    mut rx: UnboundedReceiver<SessionEvent>,
    writer: &mut W,
) -> anyhow::Result<usize> {
    let mut written = 0;
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::Status(message) => eprintln!("{message}"),
            SessionEvent::Record(record) => {
                write_row(writer, &record)?;
                writer.flush()?;
                written += 1;
            }
            SessionEvent::Complete => break,
        }
    }
    Ok(written)
}

/// Awaits the browser launch and only then creates the output file, so a
/// failed launch leaves nothing on disk.
async fn launch_then_create<T, E, F>(launch: F, path: &Path) -> anyhow::Result<(T, BufWriter<File>)>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let launched = launch
        .await
        .map_err(|e| anyhow::anyhow!("failed to launch browser: {e}"))?;
    let file = create_output(path)?;
    Ok((launched, BufWriter::new(file)))
}

/// First interrupt requests a cooperative stop. Returns `true` when a second
/// interrupt arrives, meaning the caller should exit without waiting.
async fn watch_interrupts<F, Fut>(mut next_signal: F, stop: StopHandle) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    eprintln!("Stopping... press Ctrl-C again to exit immediately");
    stop.stop();
    next_signal().await.is_ok()
}

/// Runs a full search session, stopping cooperatively on Ctrl-C and exiting
/// on a second Ctrl-C.
///
/// # Errors
///
/// Returns an error if the browser fails to launch or the output file cannot
/// be created or written. Failures inside the session are reported as status
/// lines, not errors.
pub(crate) async fn run_search(
    config: &AppConfig,
    query: &SearchQuery,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let path = output.unwrap_or_else(|| default_output_path(Utc::now()));
    let (browser, mut writer) = launch_then_create(
        ChromiumBrowser::launch(&LaunchOptions::from_config(config)),
        &path,
    )
    .await?;

    let session = SearchSession::new(config.session.clone());
    tracing::info!(session_id = %session.id(), output = %path.display(), "session created");

    let stop = session.stop_handle();
    let ctrl_c = tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, stop).await {
            tracing::warn!("second interrupt; exiting without waiting for in-flight work");
            std::process::exit(130);
        }
    });

    let (observer, rx) = ChannelObserver::new();
    let (report, written) = tokio::join!(
        session.run(&browser, query, &observer),
        consume_events(rx, &mut writer)
    );
    ctrl_c.abort();
    browser.shutdown().await;

    let written = written?;
    writer.flush()?;
    tracing::info!(
        discovered = report.discovered,
        written,
        cancelled = report.cancelled,
        "session finished"
    );
    println!("{written} records written to {}", path.display());
    Ok(())
}

fn create_output(path: &Path) -> anyhow::Result<File> {
    File::create(path).map_err(|e| anyhow::anyhow!("cannot create {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::TimeZone;
    use mapscout_core::SessionConfig;
    use mapscout_scraper::SessionObserver;
    use tempfile::tempdir;

    use super::*;

    fn record() -> PlaceRecord {
        PlaceRecord {
            name: Some("Al Noor Bakery".to_string()),
            phone: None,
            address: Some("King Fahd Rd".to_string()),
            website: None,
            emails: vec!["info@alnoor.sa".to_string()],
            socials: Vec::new(),
            latitude: Some(24.7),
            longitude: Some(46.6),
            rating: None,
            source_url: "https://www.google.com/maps/place/Al+Noor".to_string(),
        }
    }

    #[test]
    fn default_output_path_is_timestamped() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 14, 15, 3).unwrap();
        assert_eq!(
            default_output_path(now),
            PathBuf::from("mapscout-20261018-141503.jsonl")
        );
    }

    #[test]
    fn rows_are_single_json_lines_with_markers() {
        let mut buf = Vec::new();
        write_row(&mut buf, &record()).unwrap();
        write_row(&mut buf, &record()).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let row: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(row["phone"], "N/A");
        assert_eq!(row["emails"], "info@alnoor.sa");
        assert_eq!(row["url"], "https://www.google.com/maps/place/Al+Noor");
    }

    #[tokio::test]
    async fn consume_stops_at_completion() {
        let (observer, rx) = ChannelObserver::new();
        observer.on_status("Searching: bakery".to_string());
        observer.on_record(record());
        observer.on_complete();
        observer.on_record(record());

        let mut buf = Vec::new();
        let written = consume_events(rx, &mut buf).await.unwrap();
        assert_eq!(written, 1, "events after completion are ignored");
    }

    #[tokio::test]
    async fn failed_launch_leaves_no_output_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.jsonl");

        let result = launch_then_create(async { Err::<(), _>("no chromium binary") }, &path).await;

        let err = result.err().expect("launch failure is an error");
        assert!(err.to_string().contains("failed to launch browser"));
        assert!(!path.exists(), "no file written before launch succeeds");
    }

    #[tokio::test]
    async fn successful_launch_creates_output_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.jsonl");

        let (launched, _writer) = launch_then_create(async { Ok::<_, String>(7) }, &path)
            .await
            .unwrap();

        assert_eq!(launched, 7);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn second_interrupt_requests_immediate_exit() {
        let stop = SearchSession::new(SessionConfig::default()).stop_handle();
        let force = watch_interrupts(|| async { Ok(()) }, stop.clone()).await;

        assert!(stop.is_stopped());
        assert!(force);
    }

    #[tokio::test]
    async fn single_interrupt_only_stops_the_session() {
        let stop = SearchSession::new(SessionConfig::default()).stop_handle();
        let signals = Arc::new(AtomicUsize::new(0));
        let next_signal = || {
            let signals = Arc::clone(&signals);
            async move {
                if signals.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(())
                } else {
                    std::future::pending().await
                }
            }
        };

        let watched = tokio::time::timeout(
            Duration::from_millis(100),
            watch_interrupts(next_signal, stop.clone()),
        )
        .await;

        assert!(watched.is_err(), "still waiting for a second interrupt");
        assert!(stop.is_stopped());
    }
}
