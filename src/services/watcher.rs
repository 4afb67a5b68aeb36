use crate::error::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::debug;

/// Non-recursive watch on one directory. Events are coalesced: callers only
/// learn that something changed, then re-list the directory themselves.
pub struct DirWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<()>,
}

impl DirWatcher {
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<()>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
                        let _ = tx.send(());
                    }
                    _ => {}
                }
            }
        })?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;
        debug!("Watching {}", path.display());

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Waits up to `timeout` for a change. Returns true if one arrived.
    pub fn wait(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => {
                while self.rx.try_recv().is_ok() {}
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                // Backend is gone; behave like a plain sleep.
                std::thread::sleep(timeout);
                false
            }
        }
    }
}
