// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The seam between the bridge and whatever embeds the native ad SDK.
//
// A host receives commands together with a single-use reply handle, and
// pushes raw event records into an event sink. Everything above this trait
// is platform-agnostic.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use admob_core::error::Result;
use admob_core::types::Command;

/// Raw outcome reported by a host: success payload or failure payload.
/// Failure payloads are normalized by the call channel.
pub type HostReply = std::result::Result<Value, Value>;

/// The native side of the bridge.
pub trait NativeHost: Send + Sync {
    /// Human-readable platform name (e.g. "Android", "Loopback").
    fn platform_name(&self) -> &str;

    /// Execute one command. The host must resolve `reply` at most once;
    /// the handle is consumed by resolution so a second reply cannot be
    /// expressed. Dropping it unresolved fails the pending call.
    fn exec(&self, command: Command, reply: ReplyHandle);

    /// Start delivering native events into `sink`. Called at most once per
    /// bridge.
    fn subscribe(&self, sink: EventSink) -> Result<()>;
}

/// Single-use reply slot for one command.
#[derive(Debug)]
pub struct ReplyHandle {
    command: String,
    tx: oneshot::Sender<HostReply>,
}

impl ReplyHandle {
    pub(crate) fn new(command: String, tx: oneshot::Sender<HostReply>) -> Self {
        Self { command, tx }
    }

    /// Name of the command this handle answers.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn success(self, payload: Value) {
        self.resolve(Ok(payload));
    }

    pub fn failure(self, payload: Value) {
        self.resolve(Err(payload));
    }

    /// Deliver the outcome. A caller that stopped waiting is not an error.
    pub fn resolve(self, reply: HostReply) {
        if self.tx.send(reply).is_err() {
            tracing::debug!(command = %self.command, "reply arrived after caller gave up");
        }
    }
}

/// Write side of the native event stream.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Value>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Value>) -> Self {
        Self { tx }
    }

    /// Push one raw event record. Returns `false` once the bridge is gone.
    pub fn emit(&self, raw: Value) -> bool {
        self.tx.send(raw).is_ok()
    }
}
