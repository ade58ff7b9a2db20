// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live ad instances, their listeners, and event routing.
//
// State changes happen under the registry lock; listeners are collected
// under the lock and invoked after it is released, so a listener may call
// back into its ad (register listeners, read state) without deadlocking.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use admob_core::config::RoutingPolicy;
use admob_core::error::{AdMobError, Result};
use admob_core::events::{AdEvent, EventKind, NativeEvent};
use admob_core::types::{AdSnapshot, AdState, AdType, InstanceId};

use crate::lifecycle::{self, EventOutcome, Request};

/// Callback registered on an ad instance.
pub type Listener = Arc<dyn Fn(&AdEvent) + Send + Sync>;

/// Token returned by registration, used to remove that listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct AdSlot {
    ad_type: AdType,
    ad_unit_id: String,
    state: AdState,
    /// Construction order; the lowest live value per type is the default.
    seq: u64,
    updated_at: DateTime<Utc>,
    load_in_flight: bool,
    listeners: HashMap<EventKind, Vec<(ListenerId, Listener)>>,
}

impl AdSlot {
    fn set_state(&mut self, id: &InstanceId, to: AdState, cause: &str) {
        if self.state != to {
            info!(
                instance = %id,
                ad_type = %self.ad_type,
                from = %self.state,
                %to,
                cause,
                "ad state changed"
            );
            self.state = to;
            self.updated_at = Utc::now();
        }
    }

    fn snapshot(&self, id: &InstanceId) -> AdSnapshot {
        AdSnapshot {
            id: id.clone(),
            ad_type: self.ad_type,
            ad_unit_id: self.ad_unit_id.clone(),
            state: self.state,
            updated_at: self.updated_at,
            load_in_flight: self.load_in_flight,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    slots: HashMap<InstanceId, AdSlot>,
    next_seq: u64,
    next_listener: u64,
}

impl RegistryState {
    fn default_instance(&self, ad_type: AdType) -> Option<&InstanceId> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.ad_type == ad_type)
            .min_by_key(|(_, slot)| slot.seq)
            .map(|(id, _)| id)
    }
}

/// Rewarded-interstitial kinds share the generic listener buckets.
fn listener_bucket(kind: EventKind) -> EventKind {
    match kind {
        EventKind::RewardedInterstitialLoaded => EventKind::Loaded,
        EventKind::RewardedInterstitialFailed => EventKind::FailedToLoad,
        other => other,
    }
}

pub struct AdRegistry {
    state: Mutex<RegistryState>,
    policy: RoutingPolicy,
}

impl AdRegistry {
    pub fn new(policy: RoutingPolicy) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, id: InstanceId, ad_type: AdType, ad_unit_id: String) -> Result<()> {
        let mut state = self.lock();
        if state.slots.contains_key(&id) {
            return Err(AdMobError::InvalidCommand(format!(
                "ad instance id `{id}` is already in use"
            )));
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        debug!(instance = %id, %ad_type, seq, "ad registered");
        state.slots.insert(
            id,
            AdSlot {
                ad_type,
                ad_unit_id,
                state: AdState::Unloaded,
                seq,
                updated_at: Utc::now(),
                load_in_flight: false,
                listeners: HashMap::new(),
            },
        );
        Ok(())
    }

    pub fn unregister(&self, id: &InstanceId) -> bool {
        let removed = self.lock().slots.remove(id).is_some();
        if removed {
            debug!(instance = %id, "ad unregistered");
        }
        removed
    }

    pub fn live(&self) -> usize {
        self.lock().slots.len()
    }

    /// Earliest-constructed live instance of `ad_type`.
    pub fn default_instance(&self, ad_type: AdType) -> Option<InstanceId> {
        self.lock().default_instance(ad_type).cloned()
    }

    pub fn snapshot(&self, id: &InstanceId) -> Option<AdSnapshot> {
        self.lock().slots.get(id).map(|slot| slot.snapshot(id))
    }

    pub fn state(&self, id: &InstanceId) -> Option<AdState> {
        self.lock().slots.get(id).map(|slot| slot.state)
    }

    /// Register `listener`. An id that is not live gets a token that
    /// matches nothing.
    pub fn add_listener(&self, id: &InstanceId, kind: EventKind, listener: Listener) -> ListenerId {
        let mut state = self.lock();
        let lid = ListenerId(state.next_listener);
        state.next_listener += 1;
        match state.slots.get_mut(id) {
            Some(slot) => slot
                .listeners
                .entry(listener_bucket(kind))
                .or_default()
                .push((lid, listener)),
            None => warn!(instance = %id, %kind, "listener added to an unregistered ad"),
        }
        lid
    }

    pub fn remove_listener(&self, id: &InstanceId, kind: EventKind, lid: ListenerId) -> bool {
        let mut state = self.lock();
        let Some(list) = state
            .slots
            .get_mut(id)
            .and_then(|slot| slot.listeners.get_mut(&listener_bucket(kind)))
        else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != lid);
        list.len() != before
    }

    /// Validate a caller request without applying it.
    pub fn check_request(&self, id: &InstanceId, request: Request) -> Result<AdState> {
        let state = self.lock();
        let slot = state
            .slots
            .get(id)
            .ok_or_else(|| AdMobError::Bridge(format!("ad `{id}` is no longer registered")))?;
        lifecycle::on_request(slot.ad_type, slot.state, request, slot.load_in_flight)
    }

    /// Validate and apply a caller request. Returns the state it moved to.
    pub fn begin_request(&self, id: &InstanceId, request: Request) -> Result<AdState> {
        let mut state = self.lock();
        let slot = state
            .slots
            .get_mut(id)
            .ok_or_else(|| AdMobError::Bridge(format!("ad `{id}` is no longer registered")))?;
        let to = lifecycle::on_request(slot.ad_type, slot.state, request, slot.load_in_flight)?;
        slot.set_state(id, to, request.as_str());
        if request == Request::Load {
            slot.load_in_flight = true;
        }
        Ok(to)
    }

    /// Record the host's answer to a request started with
    /// [`begin_request`](Self::begin_request).
    pub fn finish_request(&self, id: &InstanceId, request: Request, succeeded: bool) {
        let mut state = self.lock();
        let Some(slot) = state.slots.get_mut(id) else {
            return;
        };
        if request == Request::Load {
            slot.load_in_flight = false;
        }
        if !succeeded {
            if let Some(to) = lifecycle::on_command_failed(slot.ad_type, slot.state, request) {
                slot.set_state(id, to, "command failed");
            }
        }
    }

    /// The caller stopped waiting; clear bookkeeping without judging the outcome.
    pub fn abandon_request(&self, id: &InstanceId, request: Request) {
        if request != Request::Load {
            return;
        }
        if let Some(slot) = self.lock().slots.get_mut(id) {
            slot.load_in_flight = false;
        }
    }

    fn route(&self, state: &RegistryState, event: &NativeEvent) -> Vec<InstanceId> {
        if let Some(id) = &event.instance_id {
            if let Some(slot) = state.slots.get(id) {
                if let Some(hint) = event.ad_type.filter(|t| *t != slot.ad_type) {
                    let err = AdMobError::Routing(format!(
                        "`{}` names {hint} but `{id}` is {}",
                        event.kind, slot.ad_type
                    ));
                    warn!(error = %err, "event not delivered");
                    return Vec::new();
                }
                return vec![id.clone()];
            }
            let err = AdMobError::Routing(format!("no live ad with id `{id}`"));
            warn!(error = %err, kind = %event.kind, "event not delivered");
            return Vec::new();
        }

        let types: Vec<AdType> = match event.ad_type {
            Some(ad_type) => vec![ad_type],
            None => AdType::ALL.to_vec(),
        };
        match self.policy {
            RoutingPolicy::DefaultInstance => types
                .into_iter()
                .filter_map(|t| state.default_instance(t).cloned())
                .collect(),
            RoutingPolicy::AllInstances => {
                let mut targets: Vec<(&InstanceId, u64)> = state
                    .slots
                    .iter()
                    .filter(|(_, slot)| types.contains(&slot.ad_type))
                    .map(|(id, slot)| (id, slot.seq))
                    .collect();
                targets.sort_by_key(|(_, seq)| *seq);
                targets.into_iter().map(|(id, _)| id.clone()).collect()
            }
        }
    }

    /// Route one native event, apply it, and run the listeners of every
    /// instance that accepted it. Returns how many instances accepted it.
    pub fn dispatch(&self, event: &NativeEvent) -> usize {
        let deliveries: Vec<(InstanceId, AdEvent, Vec<Listener>)> = {
            let mut state = self.lock();
            let targets = self.route(&state, event);
            let mut deliveries = Vec::with_capacity(targets.len());
            for id in targets {
                let Some(slot) = state.slots.get_mut(&id) else {
                    continue;
                };
                match lifecycle::on_event(slot.ad_type, slot.state, event.kind) {
                    EventOutcome::Transition { to } => slot.set_state(&id, to, event.kind.as_str()),
                    EventOutcome::Notify => {}
                    EventOutcome::Discard => {
                        debug!(
                            instance = %id,
                            kind = %event.kind,
                            state = %slot.state,
                            "event discarded"
                        );
                        continue;
                    }
                }
                let ad_event = AdEvent::from_native(event);
                let listeners = slot
                    .listeners
                    .get(&ad_event.kind())
                    .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
                    .unwrap_or_default();
                deliveries.push((id, ad_event, listeners));
            }
            deliveries
        };

        let accepted = deliveries.len();
        for (id, ad_event, listeners) in deliveries {
            for listener in listeners {
                if catch_unwind(AssertUnwindSafe(|| listener(&ad_event))).is_err() {
                    error!(instance = %id, kind = %ad_event.kind(), "ad listener panicked");
                }
            }
        }
        accepted
    }
}
