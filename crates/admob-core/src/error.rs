// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the AdMob bridge.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::AdState;

/// Code substituted when the host reports a failure we cannot parse.
pub const BRIDGE_ERROR_CODE: &str = "bridgeError";

/// Error code reported by the host: AdMob's numeric codes or a named code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Numeric(i64),
    Named(String),
}

impl ErrorCode {
    pub fn bridge() -> Self {
        Self::Named(BRIDGE_ERROR_CODE.to_string())
    }

    pub fn is_bridge(&self) -> bool {
        matches!(self, Self::Named(name) if name == BRIDGE_ERROR_CODE)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(code) => write!(f, "{code}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A host-reported failure, normalized to `{code, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub code: ErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// A failure carrying the generic `bridgeError` code.
    pub fn bridge(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::bridge(), message)
    }

    /// Normalize whatever the host handed back as a failure.
    ///
    /// Accepts `{code | errorCode, message}` objects where the code is a
    /// number or a string. Everything else (bare strings, null, objects
    /// without a code) is mapped onto `bridgeError` instead of failing.
    pub fn from_host(raw: &Value) -> Self {
        match raw {
            Value::Object(map) => {
                let code = map
                    .get("code")
                    .or_else(|| map.get("errorCode"))
                    .and_then(code_from_value);
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned);

                match (code, message) {
                    (Some(code), Some(message)) => Self::new(code, message),
                    (Some(code), None) => Self::new(code, "native command failed"),
                    (None, Some(message)) => Self::bridge(message),
                    (None, None) => Self::bridge(format!("unrecognised failure payload: {raw}")),
                }
            }
            Value::String(message) => Self::bridge(message.clone()),
            other => Self::bridge(format!("unrecognised failure payload: {other}")),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

fn code_from_value(value: &Value) -> Option<ErrorCode> {
    match value {
        Value::Number(n) => n.as_i64().map(ErrorCode::Numeric),
        Value::String(s) if !s.is_empty() => Some(match s.parse::<i64>() {
            Ok(n) => ErrorCode::Numeric(n),
            Err(_) => ErrorCode::Named(s.clone()),
        }),
        _ => None,
    }
}

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum AdMobError {
    // -- Bridge / channel --
    #[error("bridge error: {0}")]
    Bridge(String),

    #[error("native event channel not started; call start() first")]
    NotStarted,

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Host-reported --
    #[error("native command failed: {0}")]
    Command(#[from] CommandError),

    // -- Lifecycle misuse --
    #[error("ad is not ready to show (state: {state})")]
    NotReady { state: AdState },

    #[error("ad is already loading")]
    AlreadyLoading,

    #[error("cannot {request} while {state}")]
    InvalidState { request: &'static str, state: AdState },

    // -- Routing (internal only) --
    #[error("unroutable native event: {0}")]
    Routing(String),
}

/// Coarse classification used for propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorFamily {
    /// Channel-level fault: malformed host response, channel not started.
    Bridge,
    /// The host reported the command as failed.
    Command,
    /// Caller misuse relative to the lifecycle state machine.
    State,
    /// Event could not be routed; absorbed, never surfaced.
    Routing,
}

impl AdMobError {
    pub fn family(&self) -> ErrorFamily {
        match self {
            Self::Bridge(_)
            | Self::NotStarted
            | Self::InvalidCommand(_)
            | Self::Serialization(_) => ErrorFamily::Bridge,
            Self::Command(_) => ErrorFamily::Command,
            Self::NotReady { .. } | Self::AlreadyLoading | Self::InvalidState { .. } => {
                ErrorFamily::State
            }
            Self::Routing(_) => ErrorFamily::Routing,
        }
    }

    /// The normalized host failure, if this is one.
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            Self::Command(err) => Some(err),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AdMobError>;
