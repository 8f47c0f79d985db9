use std::fs;
use std::path::Path;
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::runtime::SessionEvent;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Blocks the calling thread, turning every content change of `path` into
/// an edit event. Returns once the session stops listening.
pub fn run_file_watch(
    path: &Path,
    mut last: String,
    events: mpsc::Sender<SessionEvent>,
) -> Result<()> {
    let (tx, rx) = std_mpsc::channel::<notify::Result<Event>>();
    let mut watcher = PollWatcher::new(
        move |result| {
            let _ = tx.send(result);
        },
        Config::default().with_poll_interval(POLL_INTERVAL),
    )
    .context("failed to initialize file watcher")?;

    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", path.display()))?;

    tracing::info!(path = %path.display(), "watching source file");

    for result in rx {
        if let Err(err) = result {
            tracing::warn!(error = ?err, "watch event error");
            continue;
        }

        match read_change(path, &last) {
            Ok(Some(text)) => {
                last.clone_from(&text);
                if events.blocking_send(SessionEvent::Edit(text)).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to read watched file"
            ),
        }
    }

    Ok(())
}

/// New file contents, or `None` when they match `last`.
pub fn read_change(path: &Path, last: &str) -> std::io::Result<Option<String>> {
    let text = fs::read_to_string(path)?;
    Ok((text != last).then_some(text))
}
