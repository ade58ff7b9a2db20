// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// AdMob bridge — core types, event wire format, and error definitions
// shared across all crates.

pub mod config;
pub mod error;
pub mod events;
pub mod human_errors;
pub mod types;

pub use config::{AdMobConfig, BridgeSettings, MaxAdContentRating, RoutingPolicy};
pub use error::{AdMobError, CommandError, ErrorCode, ErrorFamily};
pub use events::{AdEvent, EventKind, NativeEvent, Reward};
pub use types::*;
