// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native call channel: one command in, exactly one outcome out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use admob_core::error::{AdMobError, CommandError, Result};
use admob_core::types::Command;

use crate::traits::{NativeHost, ReplyHandle};

/// Issues commands to a [`NativeHost`] and awaits their outcome.
///
/// Each call owns its own reply slot, so concurrent calls resolve
/// independently and in any order.
pub struct NativeCallChannel {
    host: Arc<dyn NativeHost>,
    issued: AtomicU64,
}

impl NativeCallChannel {
    pub fn new(host: Arc<dyn NativeHost>) -> Self {
        Self {
            host,
            issued: AtomicU64::new(0),
        }
    }

    pub fn host(&self) -> &Arc<dyn NativeHost> {
        &self.host
    }

    /// Send `command` and wait for the host's single reply.
    ///
    /// Success yields the host's payload (possibly `null`). A failure
    /// payload becomes [`AdMobError::Command`]; a reply handle dropped
    /// without an answer becomes [`AdMobError::Bridge`].
    #[instrument(skip(self), fields(command = %command.name))]
    pub async fn call(&self, command: Command) -> Result<Value> {
        if command.name.trim().is_empty() {
            return Err(AdMobError::InvalidCommand(
                "command name must not be empty".into(),
            ));
        }

        let name = command.name.clone();
        let (tx, rx) = oneshot::channel();
        self.issued.fetch_add(1, Ordering::Relaxed);
        debug!(args = command.args.len(), "issuing native command");
        self.host.exec(command, ReplyHandle::new(name.clone(), tx));

        match rx.await {
            Ok(Ok(payload)) => {
                debug!("native command succeeded");
                Ok(payload)
            }
            Ok(Err(raw)) => {
                let err = CommandError::from_host(&raw);
                warn!(error = %err, "native command failed");
                Err(err.into())
            }
            Err(_) => Err(AdMobError::Bridge(format!(
                "host dropped reply to `{name}` without answering"
            ))),
        }
    }

    pub async fn call_named(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.call(Command::new(name, args)).await
    }

    /// Total commands handed to the host.
    pub fn calls_issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}
