// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One ad object as seen by the app.

use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::instrument;

use admob_core::config::AdMobConfig;
use admob_core::error::Result;
use admob_core::events::{AdEvent, EventKind};
use admob_core::types::{AdSnapshot, AdState, AdType, Command, InstanceId, actions};

use crate::facade::Shared;
use crate::lifecycle::Request;
use crate::registry::ListenerId;

/// A live ad of one format, bound to an ad unit.
///
/// Dropping the value (or calling [`dispose`](Self::dispose)) removes it
/// from event routing; the host-side ad is not touched.
pub struct AdInstance {
    id: InstanceId,
    ad_type: AdType,
    ad_unit_id: String,
    shared: Arc<Shared>,
}

/// Clears the in-flight marker if the caller drops a pending request.
struct RequestGuard<'a> {
    ad: &'a AdInstance,
    request: Request,
    armed: bool,
}

impl RequestGuard<'_> {
    fn finish(mut self, succeeded: bool) {
        self.armed = false;
        self.ad
            .shared
            .registry
            .finish_request(&self.ad.id, self.request, succeeded);
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.ad.shared.registry.abandon_request(&self.ad.id, self.request);
        }
    }
}

impl AdInstance {
    pub(crate) fn new(
        shared: Arc<Shared>,
        ad_type: AdType,
        ad_unit_id: String,
        id: InstanceId,
    ) -> Result<Self> {
        shared.registry.register(id.clone(), ad_type, ad_unit_id.clone())?;
        Ok(Self {
            id,
            ad_type,
            ad_unit_id,
            shared,
        })
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn ad_type(&self) -> AdType {
        self.ad_type
    }

    pub fn ad_unit_id(&self) -> &str {
        &self.ad_unit_id
    }

    pub fn state(&self) -> AdState {
        self.shared
            .registry
            .state(&self.id)
            .unwrap_or(AdState::Unloaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == AdState::Loaded
    }

    pub fn snapshot(&self) -> Option<AdSnapshot> {
        self.shared.registry.snapshot(&self.id)
    }

    /// The configuration applied by the most recent successful `configure`.
    pub fn configuration(&self) -> Option<Arc<AdMobConfig>> {
        self.shared.configuration()
    }

    /// Register `handler` for `kind`. Handlers run on the event task, in
    /// registration order.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&AdEvent) + Send + Sync + 'static,
    {
        self.shared
            .registry
            .add_listener(&self.id, kind, Arc::new(handler))
    }

    /// Remove one listener. Returns whether it was registered.
    pub fn off(&self, kind: EventKind, listener: ListenerId) -> bool {
        self.shared.registry.remove_listener(&self.id, kind, listener)
    }

    /// Request an ad from the network. Resolves with the host's ack; the
    /// outcome of the fill arrives later as `loaded` or `failed_to_load`.
    #[instrument(skip(self), fields(instance = %self.id, ad_type = %self.ad_type))]
    pub async fn load(&self) -> Result<Value> {
        let command = Command::new(
            actions::LOAD,
            vec![
                json!(self.ad_type.as_str()),
                json!(self.id.as_str()),
                json!(self.ad_unit_id),
            ],
        );
        self.request(Request::Load, command).await
    }

    /// Present a loaded ad.
    #[instrument(skip(self), fields(instance = %self.id, ad_type = %self.ad_type))]
    pub async fn show(&self) -> Result<Value> {
        let command = Command::new(actions::SHOW, vec![json!(self.id.as_str())]);
        self.request(Request::Show, command).await
    }

    /// Take an inline ad off screen; it stays loaded.
    #[instrument(skip(self), fields(instance = %self.id, ad_type = %self.ad_type))]
    pub async fn hide(&self) -> Result<Value> {
        let command = Command::new(actions::HIDE, vec![json!(self.id.as_str())]);
        self.request(Request::Hide, command).await
    }

    async fn request(&self, request: Request, command: Command) -> Result<Value> {
        if let Err(e) = self.shared.ensure_started() {
            // A state error is the more useful answer (e.g. NotReady for show).
            self.shared.registry.check_request(&self.id, request)?;
            return Err(e);
        }
        self.shared.registry.begin_request(&self.id, request)?;
        let guard = RequestGuard {
            ad: self,
            request,
            armed: true,
        };
        let outcome = self.shared.calls.call(command).await;
        guard.finish(outcome.is_ok());
        outcome
    }

    /// Stop routing events to this ad.
    pub fn dispose(self) {}
}

impl Drop for AdInstance {
    fn drop(&mut self) {
        self.shared.registry.unregister(&self.id);
    }
}

impl fmt::Debug for AdInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdInstance")
            .field("id", &self.id)
            .field("ad_type", &self.ad_type)
            .field("ad_unit_id", &self.ad_unit_id)
            .field("state", &self.state())
            .finish()
    }
}
