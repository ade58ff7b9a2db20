// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native event channel.
//
// Opened once per bridge. A single task drains the host's event stream,
// decodes each record and hands it to the handler in arrival order.
// Records that cannot be decoded are logged and dropped; they never stop
// the stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use admob_core::error::{AdMobError, Result};
use admob_core::events::NativeEvent;

use crate::traits::{EventSink, NativeHost};

/// Receives every decoded event, one at a time.
pub type EventHandler = Arc<dyn Fn(NativeEvent) + Send + Sync>;

struct Counters {
    processed: watch::Sender<u64>,
    dropped: AtomicU64,
}

pub struct NativeEventChannel {
    task: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl Default for NativeEventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeEventChannel {
    pub fn new() -> Self {
        let (processed, _) = watch::channel(0);
        Self {
            task: Mutex::new(None),
            counters: Arc::new(Counters {
                processed,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Open the channel against `host`. Returns `Ok(false)` if it was
    /// already open; the handler is then ignored.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, host: &dyn NativeHost, handler: EventHandler) -> Result<bool> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            debug!("event channel already open");
            return Ok(false);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AdMobError::Bridge(format!("event channel needs a tokio runtime: {e}")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        host.subscribe(EventSink::new(tx))?;

        let counters = Arc::clone(&self.counters);
        *task = Some(runtime.spawn(drain(rx, handler, counters)));
        info!(platform = host.platform_name(), "native event channel open");
        Ok(true)
    }

    pub fn is_open(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Records taken off the stream so far, decoded or not.
    pub fn processed(&self) -> u64 {
        *self.counters.processed.borrow()
    }

    /// Records that could not be decoded.
    pub fn dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    /// Wait until at least `count` records have been processed.
    pub async fn wait_processed(&self, count: u64) {
        let mut rx = self.counters.processed.subscribe();
        // The sender lives in `self`, so this only ends by reaching `count`.
        let _ = rx.wait_for(|n| *n >= count).await;
    }
}

impl Drop for NativeEventChannel {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

async fn drain(
    mut rx: mpsc::UnboundedReceiver<serde_json::Value>,
    handler: EventHandler,
    counters: Arc<Counters>,
) {
    while let Some(raw) = rx.recv().await {
        match NativeEvent::from_wire(&raw) {
            Ok(event) => {
                debug!(kind = %event.kind, instance = ?event.instance_id, "native event");
                handler(event);
            }
            Err(e) => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "dropping native event");
            }
        }
        counters.processed.send_modify(|n| *n += 1);
    }
    debug!("native event stream ended");
}
