// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the AdMob bridge.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Command names understood by the native host.
pub mod actions {
    pub const CONFIGURE: &str = "configure";
    pub const START: &str = "start";
    pub const LOAD: &str = "load";
    pub const SHOW: &str = "show";
    pub const HIDE: &str = "hide";
    pub const SET_APP_MUTED: &str = "setAppMuted";
    pub const SET_APP_VOLUME: &str = "setAppVolume";
}

/// Opaque identifier shared with the host for one ad object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// How an ad format moves through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdFormat {
    /// Presented over the app and dismissed by the user (load, show, close, reload).
    FullScreen,
    /// Mounted inside the layout; toggles between loaded and showing until removed.
    Inline,
}

/// The ad formats the bridge can construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdType {
    AppOpen,
    Banner,
    Interstitial,
    Native,
    Rewarded,
    RewardedInterstitial,
    WebView,
}

impl AdType {
    pub const ALL: [AdType; 7] = [
        AdType::AppOpen,
        AdType::Banner,
        AdType::Interstitial,
        AdType::Native,
        AdType::Rewarded,
        AdType::RewardedInterstitial,
        AdType::WebView,
    ];

    /// Wire name, used as the `adType` argument of `load` and as the
    /// prefix of ad-qualified event names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppOpen => "app_open",
            Self::Banner => "banner",
            Self::Interstitial => "interstitial",
            Self::Native => "native",
            Self::Rewarded => "rewarded",
            Self::RewardedInterstitial => "rewarded_interstitial",
            Self::WebView => "web_view",
        }
    }

    /// Parse a normalized (snake_case) wire name. Also accepts the
    /// unseparated spellings `appopen` and `webview`.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "app_open" | "appopen" => Some(Self::AppOpen),
            "banner" => Some(Self::Banner),
            "interstitial" => Some(Self::Interstitial),
            "native" => Some(Self::Native),
            "rewarded" => Some(Self::Rewarded),
            "rewarded_interstitial" | "rewardedinterstitial" => Some(Self::RewardedInterstitial),
            "web_view" | "webview" => Some(Self::WebView),
            _ => None,
        }
    }

    pub fn format(&self) -> AdFormat {
        match self {
            Self::AppOpen | Self::Interstitial | Self::Rewarded | Self::RewardedInterstitial => {
                AdFormat::FullScreen
            }
            Self::Banner | Self::Native | Self::WebView => AdFormat::Inline,
        }
    }

    /// Whether `rewarded` events are meaningful for this format.
    pub fn grants_reward(&self) -> bool {
        matches!(self, Self::Rewarded | Self::RewardedInterstitial)
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle states of one ad instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdState {
    Unloaded,
    Loading,
    Loaded,
    Showing,
    Closed,
    Failed,
}

impl AdState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Showing => "showing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named request to the native host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    pub args: Vec<Value>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} args)", self.name, self.args.len())
    }
}

/// Point-in-time view of an ad instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdSnapshot {
    pub id: InstanceId,
    pub ad_type: AdType,
    pub ad_unit_id: String,
    pub state: AdState,
    /// When the state last changed (construction time if it never has).
    pub updated_at: DateTime<Utc>,
    /// Whether a `load` command is still waiting for its ack.
    pub load_in_flight: bool,
}

/// Construction options for an ad instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdOptions {
    pub ad_unit_id: String,
    /// Identifier to share with the host; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InstanceId>,
}

impl AdOptions {
    pub fn new(ad_unit_id: impl Into<String>) -> Self {
        Self {
            ad_unit_id: ad_unit_id.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<InstanceId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<&str> for AdOptions {
    fn from(ad_unit_id: &str) -> Self {
        Self::new(ad_unit_id)
    }
}

impl From<String> for AdOptions {
    fn from(ad_unit_id: String) -> Self {
        Self::new(ad_unit_id)
    }
}
