use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

const LIVE_CAPACITY: usize = 256;

/// Append-only buffer of server console lines, shared with the host.
///
/// Every pushed line is kept and also broadcast to live subscribers.
/// Clones share the same buffer.
#[derive(Clone)]
pub struct ConsoleSink {
    lines: Arc<Mutex<Vec<String>>>,
    live_tx: broadcast::Sender<String>,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSink {
    pub fn new() -> Self {
        let (live_tx, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            lines: Arc::new(Mutex::new(vec![])),
            live_tx,
        }
    }

    fn guard(&self) -> MutexGuard<'_, Vec<String>> {
        // a panicking pusher cannot leave a Vec half-written
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        let mut lines = self.guard();
        let _ = self.live_tx.send(line.clone());
        lines.push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Lines pushed from now on. Slow receivers see `Lagged`, the buffer stays complete.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.live_tx.subscribe()
    }
}
