// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// AdMob facade: the single entry point an app holds.
//
// Owns the call channel, the event channel, and the ad registry. Cloning
// is cheap and every clone drives the same bridge.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use admob_core::config::{AdMobConfig, BridgeSettings};
use admob_core::error::{AdMobError, Result};
use admob_core::events::{EventKind, NativeEvent};
use admob_core::types::{AdOptions, AdType, Command, InstanceId, actions};

use crate::ad::AdInstance;
use crate::channel::NativeCallChannel;
use crate::event_channel::NativeEventChannel;
use crate::registry::AdRegistry;
use crate::traits::NativeHost;

/// Payload of the most recent `ready` event.
#[derive(Debug, Clone)]
pub struct ReadyInfo {
    pub payload: Option<Value>,
    pub received_at: DateTime<Utc>,
}

pub(crate) struct Shared {
    pub(crate) calls: NativeCallChannel,
    pub(crate) events: NativeEventChannel,
    pub(crate) registry: Arc<AdRegistry>,
    config: RwLock<Option<Arc<AdMobConfig>>>,
    ready: Arc<RwLock<Option<ReadyInfo>>>,
    settings: BridgeSettings,
}

impl Shared {
    pub(crate) fn ensure_started(&self) -> Result<()> {
        if self.events.is_open() {
            Ok(())
        } else {
            Err(AdMobError::NotStarted)
        }
    }

    pub(crate) fn configuration(&self) -> Option<Arc<AdMobConfig>> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn handle_event(registry: &AdRegistry, ready: &RwLock<Option<ReadyInfo>>, event: NativeEvent) {
    if event.kind == EventKind::Ready {
        info!(payload = ?event.payload, "native SDK ready");
        *ready.write().unwrap_or_else(PoisonError::into_inner) = Some(ReadyInfo {
            payload: event.payload.clone(),
            received_at: Utc::now(),
        });
    }
    let accepted = registry.dispatch(&event);
    debug!(kind = %event.kind, accepted, "event dispatched");
}

/// Bridge to the native AdMob SDK.
#[derive(Clone)]
pub struct AdMob {
    shared: Arc<Shared>,
}

impl AdMob {
    pub fn new(host: Arc<dyn NativeHost>) -> Self {
        Self::with_settings(host, BridgeSettings::default())
    }

    pub fn with_settings(host: Arc<dyn NativeHost>, settings: BridgeSettings) -> Self {
        info!(
            platform = host.platform_name(),
            routing = ?settings.routing_policy,
            "AdMob bridge created"
        );
        Self {
            shared: Arc::new(Shared {
                calls: NativeCallChannel::new(host),
                events: NativeEventChannel::new(),
                registry: Arc::new(AdRegistry::new(settings.routing_policy)),
                config: RwLock::new(None),
                ready: Arc::new(RwLock::new(None)),
                settings,
            }),
        }
    }

    pub fn platform_name(&self) -> &str {
        self.shared.calls.host().platform_name()
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.shared.settings
    }

    /// Apply SDK request configuration. The stored configuration is only
    /// replaced once the host accepts it.
    #[instrument(skip(self, config))]
    pub async fn configure(&self, config: AdMobConfig) -> Result<Value> {
        config.validate()?;
        let args = vec![serde_json::to_value(&config)?];
        let payload = self.shared.calls.call_named(actions::CONFIGURE, args).await?;
        *self
            .shared
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(config));
        info!("configuration applied");
        Ok(payload)
    }

    pub fn configuration(&self) -> Option<Arc<AdMobConfig>> {
        self.shared.configuration()
    }

    /// Start the SDK and open the event channel. Safe to call again; the
    /// channel is only opened once.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<Value> {
        let payload = self
            .shared
            .calls
            .call(Command::new(actions::START, Vec::new()))
            .await?;

        let registry = Arc::clone(&self.shared.registry);
        let ready = Arc::clone(&self.shared.ready);
        let opened = self.shared.events.subscribe(
            self.shared.calls.host().as_ref(),
            Arc::new(move |event: NativeEvent| handle_event(&registry, &ready, event)),
        )?;
        if opened {
            info!(platform = self.platform_name(), "AdMob started");
        }
        Ok(payload)
    }

    pub fn is_started(&self) -> bool {
        self.shared.events.is_open()
    }

    /// Whether the host has reported `ready` since start.
    pub fn is_ready(&self) -> bool {
        self.ready_info().is_some()
    }

    pub fn ready_info(&self) -> Option<ReadyInfo> {
        self.shared
            .ready
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn ready_payload(&self) -> Option<Value> {
        self.ready_info().and_then(|info| info.payload)
    }

    pub async fn set_app_muted(&self, muted: bool) -> Result<Value> {
        self.shared
            .calls
            .call_named(actions::SET_APP_MUTED, vec![json!(muted)])
            .await
    }

    pub async fn set_app_volume(&self, volume: f32) -> Result<Value> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(AdMobError::InvalidCommand(format!(
                "app volume must be within 0.0..=1.0, got {volume}"
            )));
        }
        self.shared
            .calls
            .call_named(actions::SET_APP_VOLUME, vec![json!(volume)])
            .await
    }

    /// Construct an ad of any format.
    pub fn create_ad(&self, ad_type: AdType, options: impl Into<AdOptions>) -> Result<AdInstance> {
        let options = options.into();
        if options.ad_unit_id.trim().is_empty() {
            return Err(AdMobError::InvalidCommand(format!(
                "{ad_type} ad needs an ad unit id"
            )));
        }
        let id = options.id.unwrap_or_else(InstanceId::generate);
        AdInstance::new(Arc::clone(&self.shared), ad_type, options.ad_unit_id, id)
    }

    pub fn app_open_ad(&self, options: impl Into<AdOptions>) -> Result<AdInstance> {
        self.create_ad(AdType::AppOpen, options)
    }

    pub fn banner_ad(&self, options: impl Into<AdOptions>) -> Result<AdInstance> {
        self.create_ad(AdType::Banner, options)
    }

    pub fn interstitial_ad(&self, options: impl Into<AdOptions>) -> Result<AdInstance> {
        self.create_ad(AdType::Interstitial, options)
    }

    pub fn native_ad(&self, options: impl Into<AdOptions>) -> Result<AdInstance> {
        self.create_ad(AdType::Native, options)
    }

    pub fn rewarded_ad(&self, options: impl Into<AdOptions>) -> Result<AdInstance> {
        self.create_ad(AdType::Rewarded, options)
    }

    pub fn rewarded_interstitial_ad(&self, options: impl Into<AdOptions>) -> Result<AdInstance> {
        self.create_ad(AdType::RewardedInterstitial, options)
    }

    pub fn web_view_ad(&self, options: impl Into<AdOptions>) -> Result<AdInstance> {
        self.create_ad(AdType::WebView, options)
    }

    pub fn live_instances(&self) -> usize {
        self.shared.registry.live()
    }

    /// Native event records processed so far.
    pub fn events_processed(&self) -> u64 {
        self.shared.events.processed()
    }

    /// Wait until the event task has processed `count` records.
    pub async fn wait_events(&self, count: u64) {
        self.shared.events.wait_processed(count).await;
    }

    pub fn calls_issued(&self) -> u64 {
        self.shared.calls.calls_issued()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::{LoopbackHost, Script};
    use admob_core::config::RoutingPolicy;
    use admob_core::error::{CommandError, ErrorCode};
    use admob_core::events::AdEvent;
    use admob_core::types::AdState;
    use std::sync::Mutex;

    type Seen = Arc<Mutex<Vec<String>>>;

    fn record(ad: &AdInstance, kinds: &[EventKind]) -> Seen {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        for &kind in kinds {
            let seen = Arc::clone(&seen);
            ad.on(kind, move |event: &AdEvent| {
                seen.lock().expect("lock").push(event.kind().to_string());
            });
        }
        seen
    }

    async fn started(host: Arc<LoopbackHost>) -> AdMob {
        let admob = AdMob::new(host);
        admob.start().await.expect("start");
        admob
    }

    #[tokio::test]
    async fn interstitial_fires_loaded_then_closed_once() {
        let host = Arc::new(LoopbackHost::acking());
        let admob = started(host.clone()).await;
        let ad = admob
            .interstitial_ad(AdOptions::new("ca-app-pub-3940256099942544/1033173712").with_id("X"))
            .expect("ad");
        let seen = record(&ad, &[EventKind::Loaded, EventKind::Closed]);

        ad.load().await.expect("load");
        host.emit(json!({"type": "loaded", "instanceId": "X"}));
        admob.wait_events(1).await;
        assert!(ad.is_loaded());

        ad.show().await.expect("show");
        host.emit(json!({"type": "opened", "instanceId": "X"}));
        host.emit(json!({"type": "closed", "instanceId": "X"}));
        host.emit(json!({"type": "closed", "instanceId": "X"}));
        admob.wait_events(4).await;

        assert_eq!(ad.state(), AdState::Closed);
        assert_eq!(*seen.lock().expect("lock"), vec!["loaded", "closed"]);

        let load = &host.commands()[1];
        assert_eq!(load.name, "load");
        assert_eq!(
            load.args,
            vec![
                json!("interstitial"),
                json!("X"),
                json!("ca-app-pub-3940256099942544/1033173712")
            ]
        );
    }

    #[tokio::test]
    async fn failed_to_load_carries_the_error_and_allows_reload() {
        let host = Arc::new(LoopbackHost::acking());
        let admob = started(host.clone()).await;
        let ad = admob.rewarded_ad(AdOptions::new("unit").with_id("R")).expect("ad");

        let errors = Arc::new(Mutex::new(Vec::new()));
        {
            let errors = Arc::clone(&errors);
            ad.on(EventKind::FailedToLoad, move |event| {
                if let AdEvent::FailedToLoad(e) = event {
                    errors.lock().expect("lock").push(e.clone());
                }
            });
        }

        ad.load().await.expect("load");
        host.emit(json!({
            "type": "failedToLoad",
            "instanceId": "R",
            "payload": {"code": 3, "message": "no fill"}
        }));
        admob.wait_events(1).await;

        assert_eq!(ad.state(), AdState::Failed);
        assert_eq!(
            *errors.lock().expect("lock"),
            vec![CommandError::new(ErrorCode::Numeric(3), "no fill")]
        );

        ad.load().await.expect("reload");
        assert_eq!(ad.state(), AdState::Loading);
        assert_eq!(host.count("load"), 2);
    }

    #[tokio::test]
    async fn id_less_ready_goes_to_the_default_instance() {
        let host = Arc::new(LoopbackHost::acking());
        let admob = started(host.clone()).await;
        let first = admob.app_open_ad("unit-a").expect("first");
        let second = admob.app_open_ad("unit-b").expect("second");
        let seen_first = record(&first, &[EventKind::Ready]);
        let seen_second = record(&second, &[EventKind::Ready]);

        host.emit(json!({"type": "ready", "payload": {"isRunningInTestLab": false}}));
        admob.wait_events(1).await;
        assert_eq!(seen_first.lock().expect("lock").len(), 1);
        assert!(seen_second.lock().expect("lock").is_empty());
        assert!(admob.is_ready());
        assert_eq!(
            admob.ready_payload(),
            Some(json!({"isRunningInTestLab": false}))
        );

        first.dispose();
        host.emit(json!({"type": "ready"}));
        admob.wait_events(2).await;
        assert_eq!(seen_second.lock().expect("lock").len(), 1);
        assert_eq!(admob.live_instances(), 1);
    }

    #[tokio::test]
    async fn all_instances_policy_delivers_id_less_events_to_every_ad() {
        let host = Arc::new(LoopbackHost::acking());
        let settings = BridgeSettings {
            routing_policy: RoutingPolicy::AllInstances,
            ..BridgeSettings::default()
        };
        let admob = AdMob::with_settings(host.clone(), settings);
        assert_eq!(admob.settings().routing_policy, RoutingPolicy::AllInstances);
        admob.start().await.expect("start");
        let a = admob.app_open_ad("unit-a").expect("a");
        let b = admob.app_open_ad("unit-b").expect("b");
        let seen_a = record(&a, &[EventKind::Ready]);
        let seen_b = record(&b, &[EventKind::Ready]);

        host.emit(json!({"type": "ready"}));
        admob.wait_events(1).await;
        assert_eq!(seen_a.lock().expect("lock").len(), 1);
        assert_eq!(seen_b.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn show_before_loaded_is_rejected_without_a_command() {
        let host = Arc::new(LoopbackHost::acking());
        let admob = started(host.clone()).await;
        let ad = admob.interstitial_ad("unit").expect("ad");

        let err = ad.show().await.expect_err("not ready");
        assert!(matches!(err, AdMobError::NotReady { state: AdState::Unloaded }));
        assert_eq!(host.count("show"), 0);
    }

    #[tokio::test]
    async fn second_load_while_loading_is_rejected() {
        let host = Arc::new(LoopbackHost::acking());
        let admob = started(host.clone()).await;
        let ad = admob.interstitial_ad("unit").expect("ad");

        ad.load().await.expect("load");
        assert!(matches!(ad.load().await, Err(AdMobError::AlreadyLoading)));
        assert_eq!(host.count("load"), 1);
    }

    #[tokio::test]
    async fn load_while_ack_is_pending_is_rejected() {
        let host = Arc::new(LoopbackHost::scripted(|cmd| match cmd.name.as_str() {
            "load" => Script::park(),
            _ => Script::ack(),
        }));
        let admob = started(host.clone()).await;
        let ad = Arc::new(admob.interstitial_ad(AdOptions::new("unit").with_id("P")).expect("ad"));

        let first = tokio::spawn({
            let ad = Arc::clone(&ad);
            async move { ad.load().await }
        });
        while host.pending_len() == 0 {
            tokio::task::yield_now().await;
        }

        // A failed fill lands before the ack: the ad is Failed but the
        // first load has not been answered yet.
        host.emit(json!({"type": "failedToLoad", "instanceId": "P"}));
        admob.wait_events(1).await;
        assert_eq!(ad.state(), AdState::Failed);
        assert!(matches!(ad.load().await, Err(AdMobError::AlreadyLoading)));

        host.take_pending_named("load").expect("parked").reply.success(Value::Null);
        first.await.expect("join").expect("first load");
        assert!(!ad.snapshot().expect("snapshot").load_in_flight);
        assert_eq!(host.count("load"), 1);
    }

    #[tokio::test]
    async fn failed_load_command_moves_to_failed_without_listeners() {
        let host = Arc::new(LoopbackHost::scripted(|cmd| match cmd.name.as_str() {
            "load" => Script::reply(Err(json!({"code": 1, "message": "invalid request"}))),
            _ => Script::ack(),
        }));
        let admob = started(host).await;
        let ad = admob.interstitial_ad("unit").expect("ad");
        let seen = record(&ad, &[EventKind::FailedToLoad]);

        let err = ad.load().await.expect_err("rejected");
        assert_eq!(err.command_error().map(|e| e.code.clone()), Some(ErrorCode::Numeric(1)));
        assert_eq!(ad.state(), AdState::Failed);
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn failed_show_command_reverts_inline_ads_to_loaded() {
        let host = Arc::new(LoopbackHost::scripted(|cmd| match cmd.name.as_str() {
            "show" => Script::reply(Err(json!({"message": "no view"}))),
            _ => Script::ack(),
        }));
        let admob = started(host.clone()).await;
        let banner = admob.banner_ad(AdOptions::new("unit").with_id("B")).expect("banner");

        banner.load().await.expect("load");
        host.emit(json!({"type": "banner_load", "instanceId": "B"}));
        admob.wait_events(1).await;
        assert!(banner.is_loaded());

        assert!(banner.show().await.is_err());
        assert_eq!(banner.state(), AdState::Loaded);
    }

    #[tokio::test]
    async fn failed_hide_command_keeps_banner_showing() {
        let host = Arc::new(LoopbackHost::scripted(|cmd| match cmd.name.as_str() {
            "hide" => Script::reply(Err(json!({"message": "view detached"}))),
            _ => Script::ack(),
        }));
        let admob = started(host.clone()).await;
        let banner = admob.banner_ad(AdOptions::new("unit").with_id("B")).expect("banner");

        banner.load().await.expect("load");
        host.emit_event(&NativeEvent::for_instance(EventKind::Loaded, "B".into()));
        admob.wait_events(1).await;
        banner.show().await.expect("show");
        assert_eq!(banner.state(), AdState::Showing);

        assert!(banner.hide().await.is_err());
        assert_eq!(banner.state(), AdState::Showing);
        assert_eq!(host.count("hide"), 1);
    }

    #[tokio::test]
    async fn banner_show_hide_round_trip() {
        let host = Arc::new(LoopbackHost::acking());
        let admob = started(host.clone()).await;
        let banner = admob.banner_ad(AdOptions::new("unit").with_id("B")).expect("banner");

        assert!(matches!(
            banner.hide().await,
            Err(AdMobError::InvalidState { request: "hide", .. })
        ));
        banner.load().await.expect("load");
        host.emit(json!({"type": "loaded", "instanceId": "B"}));
        admob.wait_events(1).await;

        banner.show().await.expect("show");
        assert_eq!(banner.state(), AdState::Showing);
        banner.hide().await.expect("hide");
        assert_eq!(banner.state(), AdState::Loaded);
        assert_eq!(host.count("hide"), 1);
    }

    #[tokio::test]
    async fn requests_before_start_are_rejected() {
        let host = Arc::new(LoopbackHost::acking());
        let admob = AdMob::new(host.clone());
        let ad = admob.interstitial_ad("unit").expect("ad");

        assert!(matches!(ad.load().await, Err(AdMobError::NotStarted)));
        assert!(matches!(ad.show().await, Err(AdMobError::NotReady { .. })));
        assert_eq!(ad.state(), AdState::Unloaded);
        assert!(host.commands().is_empty());
    }

    #[tokio::test]
    async fn configure_failure_keeps_the_previous_configuration() {
        let reject = Arc::new(Mutex::new(false));
        let host = {
            let reject = Arc::clone(&reject);
            Arc::new(LoopbackHost::scripted(move |cmd| {
                if cmd.name == "configure" && *reject.lock().expect("lock") {
                    Script::reply(Err(json!({"code": "invalidConfig", "message": "nope"})))
                } else {
                    Script::ack()
                }
            }))
        };
        let admob = AdMob::new(host.clone());

        let first = AdMobConfig {
            app_muted: Some(true),
            ..AdMobConfig::default()
        };
        admob.configure(first.clone()).await.expect("configure");
        assert_eq!(host.commands()[0].args, vec![json!({"appMuted": true})]);

        *reject.lock().expect("lock") = true;
        let second = AdMobConfig {
            app_volume: Some(0.5),
            ..AdMobConfig::default()
        };
        assert!(admob.configure(second).await.is_err());
        assert_eq!(admob.configuration().as_deref(), Some(&first));

        let invalid = AdMobConfig {
            app_volume: Some(2.0),
            ..AdMobConfig::default()
        };
        assert!(matches!(
            admob.configure(invalid).await,
            Err(AdMobError::InvalidCommand(_))
        ));
        assert_eq!(host.count("configure"), 2);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let host = Arc::new(LoopbackHost::acking());
        let admob = AdMob::new(host.clone());
        admob.start().await.expect("first");
        admob.clone().start().await.expect("second");
        assert_eq!(host.subscriptions(), 1);
        assert_eq!(host.count("start"), 2);
        assert!(admob.is_started());
    }

    #[tokio::test]
    async fn rejected_start_leaves_the_channel_closed() {
        let host = Arc::new(LoopbackHost::scripted(|_| {
            Script::reply(Err(json!("SDK init failed")))
        }));
        let admob = AdMob::new(host.clone());
        let err = admob.start().await.expect_err("start fails");
        assert_eq!(err.command_error().map(|e| e.code.is_bridge()), Some(true));
        assert!(!admob.is_started());
        assert_eq!(host.subscriptions(), 0);
    }

    #[tokio::test]
    async fn events_before_start_are_delivered_after_start() {
        let host = Arc::new(LoopbackHost::acking());
        host.emit(json!({"type": "ready"}));
        let admob = AdMob::new(host.clone());
        assert!(!admob.is_ready());
        admob.start().await.expect("start");
        admob.wait_events(1).await;
        assert!(admob.is_ready());
    }

    #[tokio::test]
    async fn rewarded_flow_grants_reward() {
        let host = Arc::new(LoopbackHost::acking());
        let admob = started(host.clone()).await;
        let ad = admob
            .rewarded_interstitial_ad(AdOptions::new("unit").with_id("RI"))
            .expect("ad");
        let rewards = Arc::new(Mutex::new(Vec::new()));
        {
            let rewards = Arc::clone(&rewards);
            ad.on(EventKind::Rewarded, move |event| {
                if let AdEvent::Rewarded(r) = event {
                    rewards.lock().expect("lock").push(r.amount);
                }
            });
        }

        ad.load().await.expect("load");
        host.emit(json!({"type": "rewardedInterstitialLoaded", "instanceId": "RI"}));
        admob.wait_events(1).await;
        ad.show().await.expect("show");
        host.emit(json!({
            "type": "rewarded",
            "instanceId": "RI",
            "payload": {"reward": {"type": "coins", "amount": 5}}
        }));
        host.emit(json!({"type": "closed", "instanceId": "RI"}));
        admob.wait_events(3).await;

        assert_eq!(*rewards.lock().expect("lock"), vec![5]);
        assert_eq!(ad.state(), AdState::Closed);
    }

    #[tokio::test]
    async fn duplicate_instance_ids_are_rejected() {
        let admob = AdMob::new(Arc::new(LoopbackHost::acking()));
        let _a = admob.banner_ad(AdOptions::new("u").with_id("same")).expect("first");
        assert!(matches!(
            admob.native_ad(AdOptions::new("u").with_id("same")),
            Err(AdMobError::InvalidCommand(_))
        ));
        assert!(matches!(admob.web_view_ad(""), Err(AdMobError::InvalidCommand(_))));
    }

    #[tokio::test]
    async fn app_audio_commands() {
        let host = Arc::new(LoopbackHost::acking());
        let admob = AdMob::new(host.clone());
        admob.set_app_muted(true).await.expect("mute");
        admob.set_app_volume(0.25).await.expect("volume");
        assert!(admob.set_app_volume(-1.0).await.is_err());
        let names: Vec<String> = host.commands().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["setAppMuted", "setAppVolume"]);
    }
}
