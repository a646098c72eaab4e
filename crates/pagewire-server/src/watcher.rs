//! File watching for live reload.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// A page file was modified
    PageModified(PathBuf),

    /// A shared fragment (partial, component, layout) was modified
    PartialModified(PathBuf),

    /// Any other source file was modified
    AssetModified(PathBuf),

    /// File was created
    Created(PathBuf),

    /// File was deleted
    Deleted(PathBuf),
}

impl WatchEvent {
    /// Path the event refers to.
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::PageModified(p)
            | WatchEvent::PartialModified(p)
            | WatchEvent::AssetModified(p)
            | WatchEvent::Created(p)
            | WatchEvent::Deleted(p) => p,
        }
    }
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher for the given paths.
    ///
    /// Files below any of `partial_dirs` are reported as partials. Returns the
    /// watcher and a channel to receive events.
    pub fn new(
        paths: &[PathBuf],
        partial_dirs: Vec<PathBuf>,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            }
        }

        std::thread::spawn(move || {
            let mut last_event_time = std::time::Instant::now();
            let debounce_duration = Duration::from_millis(100);

            while let Ok(event) = sync_rx.recv() {
                // Debounce rapid events
                let now = std::time::Instant::now();
                if now.duration_since(last_event_time) < debounce_duration {
                    continue;
                }
                last_event_time = now;

                for path in event.paths {
                    if let Some(e) = classify_event(&path, &event.kind, &partial_dirs) {
                        let _ = async_tx.blocking_send(e);
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Classify a notify event into a WatchEvent.
fn classify_event(
    path: &Path,
    kind: &notify::EventKind,
    partial_dirs: &[PathBuf],
) -> Option<WatchEvent> {
    use notify::EventKind;

    let path = path.to_path_buf();
    let is_html = path.extension().and_then(|e| e.to_str()) == Some("html");

    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created(path)),
        EventKind::Remove(_) => Some(WatchEvent::Deleted(path)),
        EventKind::Modify(_) => {
            if partial_dirs.iter().any(|dir| path.starts_with(dir)) {
                Some(WatchEvent::PartialModified(path))
            } else if is_html {
                Some(WatchEvent::PageModified(path))
            } else {
                Some(WatchEvent::AssetModified(path))
            }
        }
        _ => None,
    }
}
