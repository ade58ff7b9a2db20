// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// AdMob bridge demo
//
// Entry point. Initialises logging, loads bridge settings, and walks the
// interstitial, rewarded, and banner flows against a scripted loopback host
// that answers the way the mobile SDK plugins do.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use admob_bridge::{AdInstance, AdMob, Events, LoopbackHost, Script};
use admob_core::human_errors::humanize_error;
use admob_core::types::{AdState, Command, actions};
use admob_core::{AdEvent, AdMobConfig, AdMobError, AdOptions, BridgeSettings, MaxAdContentRating};

const TEST_INTERSTITIAL: &str = "ca-app-pub-3940256099942544/1033173712";
const TEST_REWARDED: &str = "ca-app-pub-3940256099942544/5224354917";
const TEST_BANNER: &str = "ca-app-pub-3940256099942544/6300978111";

/// Replies and events a real plugin would produce for `command`.
fn plugin_script(command: &Command) -> Script {
    let instance = command.args.first().cloned().unwrap_or(Value::Null);
    match command.name.as_str() {
        actions::START => Script::reply(Ok(json!({"version": env!("CARGO_PKG_VERSION")})))
            .then_emit(json!({"type": "admob.ready", "data": {"isRunningInTestLab": false}})),
        actions::LOAD => {
            let id = command.args.get(1).cloned().unwrap_or(Value::Null);
            Script::ack().then_emit(json!({"type": "loaded", "instanceId": id}))
        }
        actions::SHOW => Script::ack()
            .then_emit(json!({"type": "opened", "instanceId": instance}))
            .then_emit(json!({"type": "impression", "instanceId": instance}))
            .then_emit(json!({
                "type": "rewarded",
                "instanceId": instance,
                "payload": {"reward": {"type": "coins", "amount": 10}}
            }))
            .then_emit(json!({"type": "closed", "instanceId": instance})),
        _ => Script::ack(),
    }
}

async fn wait_for_state(ad: &AdInstance, state: AdState) -> Result<(), AdMobError> {
    let settle = async {
        while ad.state() != state {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), settle)
        .await
        .map_err(|_| AdMobError::Bridge(format!("{} never reached {state}", ad.id())))
}

fn log_events(ad: &AdInstance) {
    // Rewarded-interstitial kinds share the generic buckets.
    for kind in Events::ALL.into_iter().filter(|k| k.implied_ad_type().is_none()) {
        let id = ad.id().clone();
        ad.on(kind, move |event: &AdEvent| match event {
            AdEvent::Rewarded(reward) => {
                tracing::info!(
                    ad = %id,
                    kind = %reward.reward_type,
                    amount = reward.amount,
                    "reward granted"
                )
            }
            other => tracing::info!(ad = %id, event = %other.kind(), "ad event"),
        });
    }
}

async fn run(admob: &AdMob) -> Result<(), AdMobError> {
    admob
        .configure(AdMobConfig {
            max_ad_content_rating: Some(MaxAdContentRating::G),
            tag_for_child_directed_treatment: Some(true),
            test_device_ids: vec!["EMULATOR".into()],
            ..AdMobConfig::default()
        })
        .await?;
    let started = admob.start().await?;
    tracing::info!(
        platform = admob.platform_name(),
        routing = ?admob.settings().routing_policy,
        %started,
        "SDK started"
    );

    // Interstitial: load, show, close.
    let interstitial = admob.interstitial_ad(TEST_INTERSTITIAL)?;
    log_events(&interstitial);
    if let Err(e) = interstitial.show().await {
        let human = humanize_error(&e);
        tracing::warn!(error = %e, suggestion = %human.suggestion, "{}", human.message);
    }
    interstitial.load().await?;
    wait_for_state(&interstitial, AdState::Loaded).await?;
    interstitial.show().await?;
    wait_for_state(&interstitial, AdState::Closed).await?;

    // Rewarded: the reward arrives before the close.
    let rewarded = admob.rewarded_ad(AdOptions::new(TEST_REWARDED).with_id("rewarded-main"))?;
    log_events(&rewarded);
    rewarded.load().await?;
    wait_for_state(&rewarded, AdState::Loaded).await?;
    rewarded.show().await?;
    wait_for_state(&rewarded, AdState::Closed).await?;

    // Banner: inline, ignores `closed`, toggles with hide/show.
    let banner = admob.banner_ad(TEST_BANNER)?;
    log_events(&banner);
    banner.load().await?;
    wait_for_state(&banner, AdState::Loaded).await?;
    banner.show().await?;
    banner.hide().await?;
    tracing::info!(state = %banner.state(), "banner hidden");

    admob.set_app_muted(true).await?;
    tracing::info!(
        ready = admob.is_ready(),
        live = admob.live_instances(),
        calls = admob.calls_issued(),
        events = admob.events_processed(),
        "walkthrough finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let settings = match std::env::args().nth(1) {
        Some(path) => BridgeSettings::load(&path),
        None => Ok(BridgeSettings::default()),
    };
    let (settings, settings_err) = match settings {
        Ok(s) => (s, None),
        Err(e) => (BridgeSettings::default(), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_filter)),
        )
        .init();

    if let Some(e) = settings_err {
        tracing::error!(error = %e, "settings unreadable, using defaults");
    }
    tracing::info!("AdMob demo starting");

    let host = Arc::new(LoopbackHost::scripted(plugin_script));
    let admob = AdMob::with_settings(host, settings);

    if let Err(e) = run(&admob).await {
        let human = humanize_error(&e);
        tracing::error!(error = %e, suggestion = %human.suggestion, "{}", human.message);
        std::process::exit(1);
    }
}
