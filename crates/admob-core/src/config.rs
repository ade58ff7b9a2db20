// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SDK request configuration and bridge settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AdMobError, Result};

/// Maximum content rating of ads the SDK may serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum MaxAdContentRating {
    G,
    PG,
    T,
    MA,
}

/// Request configuration sent with `configure`.
///
/// Immutable once applied; a later `configure` replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdMobConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_muted: Option<bool>,
    /// 0.0 (silent) to 1.0 (current device volume).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_volume: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ad_content_rating: Option<MaxAdContentRating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_app_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_for_child_directed_treatment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_for_under_age_of_consent: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_device_ids: Vec<String>,
}

impl AdMobConfig {
    /// Reject values the host would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if let Some(volume) = self.app_volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(AdMobError::InvalidCommand(format!(
                    "appVolume must be within 0.0..=1.0, got {volume}"
                )));
            }
        }
        if self.test_device_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(AdMobError::InvalidCommand(
                "testDeviceIds must not contain empty ids".into(),
            ));
        }
        Ok(())
    }
}

/// Where events without an instance id are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// Only the earliest-constructed live instance of each ad type.
    #[default]
    DefaultInstance,
    /// Every live instance of the matching ad type(s).
    AllInstances,
}

/// Ambient bridge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub routing_policy: RoutingPolicy,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            routing_policy: RoutingPolicy::DefaultInstance,
            log_filter: "info".into(),
        }
    }
}

impl BridgeSettings {
    /// Read settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(AdMobError::Bridge(format!(
                "read settings {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| AdMobError::Bridge(format!("write settings {}: {e}", path.display())))
    }
}
