// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process host for tests, benches, and the demo binary.
//
// Records every command, answers according to a script, and plays back
// events the way a real SDK would. Events emitted before anyone subscribes
// are queued and flushed on subscription.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

use admob_core::error::Result;
use admob_core::events::NativeEvent;
use admob_core::types::Command;

use crate::traits::{EventSink, HostReply, NativeHost, ReplyHandle};

/// What the loopback host does with one command.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// `None` parks the call until the test resolves it by hand.
    pub reply: Option<HostReply>,
    /// Raw event records emitted after the reply.
    pub events: Vec<Value>,
}

impl Script {
    pub fn park() -> Self {
        Self::default()
    }

    pub fn ack() -> Self {
        Self::reply(Ok(Value::Null))
    }

    pub fn reply(reply: HostReply) -> Self {
        Self {
            reply: Some(reply),
            events: Vec::new(),
        }
    }

    pub fn then_emit(mut self, raw: Value) -> Self {
        self.events.push(raw);
        self
    }
}

/// A command the host has not answered yet.
#[derive(Debug)]
pub struct PendingCall {
    pub command: Command,
    pub reply: ReplyHandle,
}

type Responder = dyn Fn(&Command) -> Script + Send + Sync;

#[derive(Default)]
struct LoopbackState {
    log: Vec<Command>,
    pending: Vec<PendingCall>,
    sink: Option<EventSink>,
    queued: Vec<Value>,
    subscriptions: u32,
}

pub struct LoopbackHost {
    state: Mutex<LoopbackState>,
    responder: Box<Responder>,
}

impl LoopbackHost {
    /// Park every call; the test answers through [`take_pending`](Self::take_pending).
    pub fn manual() -> Self {
        Self::scripted(|_| Script::park())
    }

    /// Acknowledge every call with `null`.
    pub fn acking() -> Self {
        Self::scripted(|_| Script::ack())
    }

    pub fn scripted(responder: impl Fn(&Command) -> Script + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(LoopbackState::default()),
            responder: Box::new(responder),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every command received, in order.
    pub fn commands(&self) -> Vec<Command> {
        self.lock().log.clone()
    }

    /// How many commands named `name` were received.
    pub fn count(&self, name: &str) -> usize {
        self.lock().log.iter().filter(|c| c.name == name).count()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn take_pending(&self) -> Vec<PendingCall> {
        std::mem::take(&mut self.lock().pending)
    }

    /// Remove the oldest parked call named `name`.
    pub fn take_pending_named(&self, name: &str) -> Option<PendingCall> {
        let mut state = self.lock();
        let idx = state.pending.iter().position(|p| p.command.name == name)?;
        Some(state.pending.remove(idx))
    }

    /// Deliver a raw event record, or queue it until someone subscribes.
    pub fn emit(&self, raw: Value) {
        let mut state = self.lock();
        match &state.sink {
            Some(sink) => {
                if !sink.emit(raw) {
                    debug!("event dropped: bridge is gone");
                }
            }
            None => state.queued.push(raw),
        }
    }

    pub fn emit_event(&self, event: &NativeEvent) {
        self.emit(event.to_wire());
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock().sink.is_some()
    }

    pub fn subscriptions(&self) -> u32 {
        self.lock().subscriptions
    }
}

impl NativeHost for LoopbackHost {
    fn platform_name(&self) -> &str {
        "Loopback"
    }

    fn exec(&self, command: Command, reply: ReplyHandle) {
        let Script { reply: outcome, events } = (self.responder)(&command);
        {
            let mut state = self.lock();
            state.log.push(command.clone());
            match outcome {
                Some(outcome) => {
                    drop(state);
                    reply.resolve(outcome);
                }
                None => state.pending.push(PendingCall { command, reply }),
            }
        }
        for raw in events {
            self.emit(raw);
        }
    }

    fn subscribe(&self, sink: EventSink) -> Result<()> {
        let mut state = self.lock();
        for raw in std::mem::take(&mut state.queued) {
            sink.emit(raw);
        }
        state.sink = Some(sink);
        state.subscriptions += 1;
        debug!(subscriptions = state.subscriptions, "loopback subscribed");
        Ok(())
    }
}
