// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-English descriptions of bridge and SDK failures, for logs and for
// apps that want to show something better than a numeric code.

use crate::error::{AdMobError, CommandError, ErrorCode};

/// Whether retrying later could plausibly succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or empty inventory: try again later.
    Transient,
    /// The request or the integration is wrong; retrying will not help.
    Permanent,
    /// The caller used the ad out of order (show before load, etc.).
    Misuse,
}

/// A readable failure summary.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub severity: Severity,
}

impl HumanError {
    fn new(message: &str, suggestion: &str, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            severity,
        }
    }
}

/// Describe a host-reported failure using AdMob's standard numeric codes.
pub fn describe_command_error(err: &CommandError) -> HumanError {
    match &err.code {
        ErrorCode::Numeric(0) => HumanError::new(
            "The ad SDK hit an internal error.",
            "Try loading again later.",
            Severity::Transient,
        ),
        ErrorCode::Numeric(1) => HumanError::new(
            "The ad request was invalid.",
            "Check the ad unit id and the request configuration.",
            Severity::Permanent,
        ),
        ErrorCode::Numeric(2) => HumanError::new(
            "The ad request failed because of a network problem.",
            "Check connectivity, then load again.",
            Severity::Transient,
        ),
        ErrorCode::Numeric(3) => HumanError::new(
            "No ad was available to show.",
            "This is normal for new ad units; load again later.",
            Severity::Transient,
        ),
        ErrorCode::Numeric(8) => HumanError::new(
            "The ad unit id does not belong to this app.",
            "Check the app id and ad unit id pairing.",
            Severity::Permanent,
        ),
        ErrorCode::Numeric(9) => HumanError::new(
            "Mediation did not return an ad.",
            "Load again later.",
            Severity::Transient,
        ),
        code if code.is_bridge() => HumanError {
            message: "The native host reported an unrecognised failure.".into(),
            suggestion: format!("Check the host integration. ({})", err.message),
            severity: Severity::Permanent,
        },
        _ => HumanError {
            message: "The ad SDK reported a failure.".into(),
            suggestion: format!("{} (code {})", err.message, err.code),
            severity: Severity::Transient,
        },
    }
}

/// Describe any bridge error.
pub fn humanize_error(err: &AdMobError) -> HumanError {
    match err {
        AdMobError::Command(cmd) => describe_command_error(cmd),
        AdMobError::NotStarted => HumanError::new(
            "Ads have not been started yet.",
            "Await AdMob::start() before loading ads.",
            Severity::Misuse,
        ),
        AdMobError::NotReady { .. } => HumanError::new(
            "The ad is not ready to show.",
            "Wait for the loaded event before calling show().",
            Severity::Misuse,
        ),
        AdMobError::AlreadyLoading => HumanError::new(
            "The ad is already loading.",
            "Wait for the loaded or failed event before loading again.",
            Severity::Misuse,
        ),
        AdMobError::InvalidState { request, state } => HumanError {
            message: format!("Cannot {request} right now."),
            suggestion: format!("The ad is currently {state}."),
            severity: Severity::Misuse,
        },
        AdMobError::InvalidCommand(detail) => HumanError {
            message: "The request was rejected before reaching the SDK.".into(),
            suggestion: detail.clone(),
            severity: Severity::Permanent,
        },
        AdMobError::Bridge(detail) | AdMobError::Routing(detail) => HumanError {
            message: "The native bridge had a problem.".into(),
            suggestion: detail.clone(),
            severity: Severity::Transient,
        },
        AdMobError::Serialization(e) => HumanError {
            message: "The native bridge sent data we could not read.".into(),
            suggestion: e.to_string(),
            severity: Severity::Permanent,
        },
    }
}
