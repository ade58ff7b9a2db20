// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// AdMob bridge — drives a native ad SDK through a host-provided command
// and event interface.
//
// The embedding app supplies a `NativeHost` for its platform (Android
// activity, iOS view controller, WebView shell). `StubHost` covers builds
// with no SDK and `LoopbackHost` covers tests and demos.

pub mod ad;
pub mod channel;
pub mod event_channel;
pub mod facade;
pub mod lifecycle;
pub mod loopback;
pub mod registry;
pub mod stub;
pub mod traits;

pub use ad::AdInstance;
pub use channel::NativeCallChannel;
pub use event_channel::{EventHandler, NativeEventChannel};
pub use facade::{AdMob, ReadyInfo};
pub use loopback::{LoopbackHost, PendingCall, Script};
pub use registry::{Listener, ListenerId};
pub use stub::StubHost;
pub use traits::{EventSink, HostReply, NativeHost, ReplyHandle};

/// Event names accepted by [`AdInstance::on`].
pub use admob_core::EventKind as Events;
pub use admob_core::{
    AdEvent, AdMobConfig, AdMobError, AdOptions, AdState, AdType, BridgeSettings, CommandError,
    InstanceId, Reward, RoutingPolicy,
};
