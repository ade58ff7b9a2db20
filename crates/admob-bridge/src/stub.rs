// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host for platforms without an embedded ad SDK.
//
// Every command fails with `platformUnavailable`; the event stream stays
// open but silent.

use std::sync::Mutex;

use serde_json::json;

use admob_core::error::Result;
use admob_core::types::Command;

use crate::traits::{EventSink, NativeHost, ReplyHandle};

/// Error code reported for every command.
pub const PLATFORM_UNAVAILABLE: &str = "platformUnavailable";

#[derive(Default)]
pub struct StubHost {
    sink: Mutex<Option<EventSink>>,
}

impl StubHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NativeHost for StubHost {
    fn platform_name(&self) -> &str {
        "Stub"
    }

    fn exec(&self, command: Command, reply: ReplyHandle) {
        tracing::warn!(command = %command.name, "StubHost: no native ad SDK on this platform");
        reply.failure(json!({
            "code": PLATFORM_UNAVAILABLE,
            "message": format!("`{}` is not available on this platform", command.name),
        }));
    }

    fn subscribe(&self, sink: EventSink) -> Result<()> {
        tracing::warn!("StubHost: event stream open, no events will be delivered");
        *self.sink.lock().unwrap_or_else(|e| e.into_inner()) = Some(sink);
        Ok(())
    }
}
