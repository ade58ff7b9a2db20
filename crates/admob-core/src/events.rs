// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native event vocabulary and the wire format the host delivers it in.
//
// Hosts are inconsistent about naming: some send canonical snake names
// (`failed_to_load`), some camelCase (`failedToLoad`), and the older plugin
// builds send ad-qualified names (`interstitial_load`, `admob.ad.dismiss`).
// Everything is normalized to snake_case before matching.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AdMobError, CommandError, Result};
use crate::types::{AdType, InstanceId};

/// Enumerated category of a native-originated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Ready,
    Loaded,
    FailedToLoad,
    Opened,
    Closed,
    Clicked,
    Impression,
    Rewarded,
    ShowFailed,
    RewardedInterstitialLoaded,
    RewardedInterstitialFailed,
    AutoStart,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::Ready,
        EventKind::Loaded,
        EventKind::FailedToLoad,
        EventKind::Opened,
        EventKind::Closed,
        EventKind::Clicked,
        EventKind::Impression,
        EventKind::Rewarded,
        EventKind::ShowFailed,
        EventKind::RewardedInterstitialLoaded,
        EventKind::RewardedInterstitialFailed,
        EventKind::AutoStart,
    ];

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Loaded => "loaded",
            Self::FailedToLoad => "failed_to_load",
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Clicked => "clicked",
            Self::Impression => "impression",
            Self::Rewarded => "rewarded",
            Self::ShowFailed => "show_failed",
            Self::RewardedInterstitialLoaded => "rewarded_interstitial_loaded",
            Self::RewardedInterstitialFailed => "rewarded_interstitial_failed",
            Self::AutoStart => "auto_start",
        }
    }

    /// Host-wide signals that do not belong to one ad's lifecycle.
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Ready | Self::AutoStart)
    }

    /// Ad type implied by the event name itself.
    pub fn implied_ad_type(&self) -> Option<AdType> {
        match self {
            Self::RewardedInterstitialLoaded | Self::RewardedInterstitialFailed => {
                Some(AdType::RewardedInterstitial)
            }
            _ => None,
        }
    }

    fn from_canonical(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Short action names used by ad-qualified legacy events.
    fn from_action(action: &str) -> Option<Self> {
        match action {
            "load" => Some(Self::Loaded),
            "load_fail" | "loadfail" | "load_failed" => Some(Self::FailedToLoad),
            "show" | "open" => Some(Self::Opened),
            "show_fail" | "showfail" => Some(Self::ShowFailed),
            "dismiss" | "close" => Some(Self::Closed),
            "click" => Some(Self::Clicked),
            "reward" => Some(Self::Rewarded),
            "impression" => Some(Self::Impression),
            other => Self::from_canonical(other),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase snake_case form of a wire `type` string.
fn normalize_type_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;
    for ch in raw.trim().chars() {
        match ch {
            '.' | '-' | ' ' | '_' => {
                if !out.is_empty() && !out.ends_with('_') {
                    out.push('_');
                }
                prev_lower = false;
            }
            c if c.is_ascii_uppercase() => {
                if prev_lower && !out.ends_with('_') {
                    out.push('_');
                }
                out.push(c.to_ascii_lowercase());
                prev_lower = false;
            }
            c => {
                out.push(c);
                prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            }
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Prefixes tried longest-first so `rewarded_interstitial_*` is not read as
/// `rewarded` + `interstitial_*`.
const QUALIFIED_PREFIXES: [(&str, AdType); 10] = [
    ("rewarded_interstitial", AdType::RewardedInterstitial),
    ("rewardedinterstitial", AdType::RewardedInterstitial),
    ("interstitial", AdType::Interstitial),
    ("app_open", AdType::AppOpen),
    ("appopen", AdType::AppOpen),
    ("rewarded", AdType::Rewarded),
    ("web_view", AdType::WebView),
    ("webview", AdType::WebView),
    ("banner", AdType::Banner),
    ("native", AdType::Native),
];

/// Parse a wire `type` string into its kind and, for ad-qualified names,
/// the ad type it names.
pub fn parse_event_type(raw: &str) -> Option<(EventKind, Option<AdType>)> {
    let name = normalize_type_name(raw);
    let name = name
        .strip_prefix("admob_")
        .or_else(|| name.strip_prefix("ad_mob_"))
        .unwrap_or(&name);

    if let Some(kind) = EventKind::from_canonical(name) {
        return Some((kind, kind.implied_ad_type()));
    }

    if let Some(action) = name.strip_prefix("ad_") {
        return EventKind::from_action(action).map(|kind| (kind, kind.implied_ad_type()));
    }

    for (prefix, ad_type) in QUALIFIED_PREFIXES {
        if let Some(action) = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return EventKind::from_action(action).map(|kind| (kind, Some(ad_type)));
        }
    }

    EventKind::from_action(name).map(|kind| (kind, kind.implied_ad_type()))
}

/// One event record as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEvent {
    pub kind: EventKind,
    pub instance_id: Option<InstanceId>,
    pub ad_type: Option<AdType>,
    pub payload: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, alias = "id")]
    instance_id: Option<WireId>,
    #[serde(default, alias = "data")]
    payload: Option<Value>,
}

impl NativeEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            instance_id: None,
            ad_type: kind.implied_ad_type(),
            payload: None,
        }
    }

    pub fn for_instance(kind: EventKind, id: InstanceId) -> Self {
        Self {
            instance_id: Some(id),
            ..Self::new(kind)
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_ad_type(mut self, ad_type: AdType) -> Self {
        self.ad_type = Some(ad_type);
        self
    }

    /// Decode a raw host record. Failures are routing errors: the caller
    /// is expected to log and drop them.
    pub fn from_wire(raw: &Value) -> Result<Self> {
        let wire: WireEvent = serde_json::from_value(raw.clone())
            .map_err(|e| AdMobError::Routing(format!("malformed event {raw}: {e}")))?;

        let (kind, ad_type) = parse_event_type(&wire.kind)
            .ok_or_else(|| AdMobError::Routing(format!("unknown event type `{}`", wire.kind)))?;

        let instance_id = match wire.instance_id {
            Some(WireId::Text(text)) if text.is_empty() => None,
            Some(WireId::Text(text)) => Some(InstanceId::new(text)),
            Some(WireId::Number(n)) => Some(InstanceId::new(n.to_string())),
            None => None,
        };

        let payload = wire.payload.filter(|p| !p.is_null());

        Ok(Self {
            kind,
            instance_id,
            ad_type,
            payload,
        })
    }

    /// Encode in the shape hosts deliver.
    pub fn to_wire(&self) -> Value {
        let mut value = json!({ "type": self.wire_type() });
        if let Some(id) = &self.instance_id {
            value["instanceId"] = json!(id.as_str());
        }
        if let Some(payload) = &self.payload {
            value["payload"] = payload.clone();
        }
        value
    }

    fn wire_type(&self) -> String {
        match self.ad_type {
            Some(ad_type) if self.kind.implied_ad_type() != Some(ad_type) => {
                format!("{}.{}", ad_type.as_str(), self.kind.as_str())
            }
            _ => self.kind.as_str().to_string(),
        }
    }
}

/// Reward granted by a rewarded format.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reward {
    #[serde(rename = "type", default)]
    pub reward_type: String,
    #[serde(default)]
    pub amount: i64,
}

impl Reward {
    /// Read a reward from a `rewarded` payload, either flat or nested
    /// under `reward`. Fields are read independently so an odd `amount`
    /// does not lose the `type`.
    pub fn from_payload(payload: Option<&Value>) -> Self {
        let Some(body) = payload.map(|p| p.get("reward").unwrap_or(p)) else {
            return Self::default();
        };
        let reward_type = body
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let amount = match body.get("amount") {
            None | Some(Value::Null) => 0,
            Some(raw) => reward_amount(raw).unwrap_or_else(|| {
                tracing::warn!(amount = %raw, %reward_type, "unreadable reward amount");
                0
            }),
        };
        Self {
            reward_type,
            amount,
        }
    }
}

/// Integer amount from a number (integral or float) or a numeric string.
fn reward_amount(raw: &Value) -> Option<i64> {
    let from_float = |f: f64| f.is_finite().then(|| f.round() as i64);
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(from_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    }
}

/// Typed event handed to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum AdEvent {
    Ready(Option<Value>),
    Loaded,
    FailedToLoad(CommandError),
    Opened,
    Closed,
    Clicked,
    Impression,
    Rewarded(Reward),
    ShowFailed(CommandError),
    AutoStart(Option<Value>),
}

impl AdEvent {
    /// Build the listener value for an accepted native event.
    pub fn from_native(event: &NativeEvent) -> Self {
        let payload = event.payload.as_ref();
        match event.kind {
            EventKind::Ready => Self::Ready(event.payload.clone()),
            EventKind::AutoStart => Self::AutoStart(event.payload.clone()),
            EventKind::Loaded | EventKind::RewardedInterstitialLoaded => Self::Loaded,
            EventKind::FailedToLoad | EventKind::RewardedInterstitialFailed => {
                Self::FailedToLoad(failure_from_payload(payload))
            }
            EventKind::Opened => Self::Opened,
            EventKind::Closed => Self::Closed,
            EventKind::Clicked => Self::Clicked,
            EventKind::Impression => Self::Impression,
            EventKind::Rewarded => Self::Rewarded(Reward::from_payload(payload)),
            EventKind::ShowFailed => Self::ShowFailed(failure_from_payload(payload)),
        }
    }

    /// The listener bucket this event is delivered to.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::Loaded => EventKind::Loaded,
            Self::FailedToLoad(_) => EventKind::FailedToLoad,
            Self::Opened => EventKind::Opened,
            Self::Closed => EventKind::Closed,
            Self::Clicked => EventKind::Clicked,
            Self::Impression => EventKind::Impression,
            Self::Rewarded(_) => EventKind::Rewarded,
            Self::ShowFailed(_) => EventKind::ShowFailed,
            Self::AutoStart(_) => EventKind::AutoStart,
        }
    }
}

fn failure_from_payload(payload: Option<&Value>) -> CommandError {
    match payload {
        Some(value) => CommandError::from_host(value.get("error").unwrap_or(value)),
        None => CommandError::bridge("ad failed without an error payload"),
    }
}
