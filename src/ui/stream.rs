//! Headless front ends: print drained events as text or JSON lines.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::core::{FileEvent, Session};

const SLEEP_STEP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    Text,
    Json,
}

/// Starts monitoring and prints new events every refresh interval until
/// `running` is cleared, then stops the watcher and flushes what is left.
pub fn run_stream<W: Write>(
    session: &mut Session,
    format: StreamFormat,
    running: &AtomicBool,
    out: &mut W,
) -> Result<()> {
    session.start_monitoring().context("Failed to start monitoring")?;

    if format == StreamFormat::Text {
        if let Some(folder) = session.folder() {
            writeln!(out, "Watching: {}", folder.display())?;
            writeln!(out, "Press Ctrl+C to quit")?;
            writeln!(out, "---")?;
        }
    }

    let mut last_poll = Instant::now();
    while running.load(Ordering::SeqCst) {
        thread::sleep(SLEEP_STEP.min(session.refresh_interval()));
        if last_poll.elapsed() < session.refresh_interval() {
            continue;
        }
        last_poll = Instant::now();

        let batch = session.poll_batch();
        write_events(&batch, format, out)?;
    }

    let leftover = session.stop_and_drain().context("Failed to stop monitoring")?;
    write_events(&leftover, format, out)?;
    Ok(())
}

/// Writes `events` in the chosen format, one per line.
pub fn write_events<W: Write>(
    events: &[FileEvent],
    format: StreamFormat,
    out: &mut W,
) -> Result<()> {
    for event in events {
        match format {
            StreamFormat::Json => writeln!(out, "{}", serde_json::to_string(event)?)?,
            StreamFormat::Text => writeln!(out, "{}", event)?,
        }
    }
    out.flush()?;
    Ok(())
}
