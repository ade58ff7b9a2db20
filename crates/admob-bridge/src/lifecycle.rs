// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ad lifecycle transition table.
//
// Pure functions over (ad type, current state, trigger). One table serves
// every format: full-screen formats run Unloaded → Loading → Loaded →
// Showing → Closed (reloadable), inline formats toggle Loaded ⇄ Showing and
// never close. Events that do not fit the current state are discarded,
// which makes duplicated and reordered host delivery harmless.

use admob_core::error::{AdMobError, Result};
use admob_core::events::EventKind;
use admob_core::types::{AdFormat, AdState, AdType};

/// Caller-initiated triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Load,
    Show,
    Hide,
}

impl Request {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Show => "show",
            Self::Hide => "hide",
        }
    }
}

/// What a native event does to an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Accepted; the instance is now in `to` (possibly unchanged) and
    /// listeners fire.
    Transition { to: AdState },
    /// Host-wide signal: listeners fire, state untouched.
    Notify,
    /// Does not fit the current state; dropped without side effects.
    Discard,
}

/// Apply a caller request. `load_in_flight` is whether an earlier `load`
/// command is still awaiting its ack.
pub fn on_request(
    ad_type: AdType,
    state: AdState,
    request: Request,
    load_in_flight: bool,
) -> Result<AdState> {
    match request {
        Request::Load => match state {
            AdState::Loading => Err(AdMobError::AlreadyLoading),
            AdState::Loaded | AdState::Showing => Err(AdMobError::InvalidState {
                request: request.as_str(),
                state,
            }),
            AdState::Unloaded | AdState::Closed | AdState::Failed if load_in_flight => {
                Err(AdMobError::AlreadyLoading)
            }
            AdState::Unloaded | AdState::Closed | AdState::Failed => Ok(AdState::Loading),
        },
        Request::Show => match state {
            AdState::Loaded => Ok(AdState::Showing),
            state => Err(AdMobError::NotReady { state }),
        },
        Request::Hide => match (ad_type.format(), state) {
            (AdFormat::Inline, AdState::Showing) => Ok(AdState::Loaded),
            (_, state) => Err(AdMobError::InvalidState {
                request: request.as_str(),
                state,
            }),
        },
    }
}

/// State to fall back to when the command behind `request` fails, if the
/// instance is still where the request put it.
pub fn on_command_failed(ad_type: AdType, state: AdState, request: Request) -> Option<AdState> {
    match (request, state) {
        (Request::Load, AdState::Loading) => Some(AdState::Failed),
        (Request::Show, AdState::Showing) => Some(match ad_type.format() {
            AdFormat::FullScreen => AdState::Failed,
            AdFormat::Inline => AdState::Loaded,
        }),
        (Request::Hide, AdState::Loaded) => Some(AdState::Showing),
        _ => None,
    }
}

/// Apply a native event.
pub fn on_event(ad_type: AdType, state: AdState, kind: EventKind) -> EventOutcome {
    if kind.is_global() {
        return EventOutcome::Notify;
    }
    if let Some(implied) = kind.implied_ad_type() {
        if implied != ad_type {
            return EventOutcome::Discard;
        }
    }

    let format = ad_type.format();
    let next = match kind {
        EventKind::Ready | EventKind::AutoStart => None,
        EventKind::Loaded | EventKind::RewardedInterstitialLoaded => {
            (state == AdState::Loading).then_some(AdState::Loaded)
        }
        EventKind::FailedToLoad | EventKind::RewardedInterstitialFailed => {
            (state == AdState::Loading).then_some(AdState::Failed)
        }
        EventKind::Opened | EventKind::Clicked | EventKind::Impression => {
            (state == AdState::Showing).then_some(AdState::Showing)
        }
        EventKind::Rewarded => {
            (state == AdState::Showing && ad_type.grants_reward()).then_some(AdState::Showing)
        }
        EventKind::Closed => {
            (state == AdState::Showing && format == AdFormat::FullScreen).then_some(AdState::Closed)
        }
        EventKind::ShowFailed => (state == AdState::Showing).then_some(match format {
            AdFormat::FullScreen => AdState::Failed,
            AdFormat::Inline => AdState::Loaded,
        }),
    };

    match next {
        Some(to) => EventOutcome::Transition { to },
        None => EventOutcome::Discard,
    }
}

/// Whether `from → to` is an edge of the transition table for `format`.
pub fn is_edge(format: AdFormat, from: AdState, to: AdState) -> bool {
    use AdState::*;
    match (from, to) {
        (Unloaded | Failed, Loading) => true,
        (Closed, Loading) => format == AdFormat::FullScreen,
        (Loading, Loaded | Failed) => true,
        (Loaded, Showing) | (Showing, Showing) => true,
        (Showing, Closed) | (Showing, Failed) => format == AdFormat::FullScreen,
        (Showing, Loaded) => format == AdFormat::Inline,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const STATES: [AdState; 6] = [
        AdState::Unloaded,
        AdState::Loading,
        AdState::Loaded,
        AdState::Showing,
        AdState::Closed,
        AdState::Failed,
    ];

    fn run(ad_type: AdType, start: AdState, events: &[EventKind]) -> (AdState, Vec<EventKind>) {
        let mut state = start;
        let mut accepted = Vec::new();
        for &kind in events {
            if let EventOutcome::Transition { to } = on_event(ad_type, state, kind) {
                state = to;
                accepted.push(kind);
            }
        }
        (state, accepted)
    }

    fn any_ad_type() -> impl Strategy<Value = AdType> {
        prop::sample::select(AdType::ALL.to_vec())
    }

    fn any_state() -> impl Strategy<Value = AdState> {
        prop::sample::select(STATES.to_vec())
    }

    fn any_event() -> impl Strategy<Value = EventKind> {
        prop::sample::select(EventKind::ALL.to_vec())
    }

    /// Showing-phase noise plus at least one `closed`, in any order.
    fn shown_ad_events() -> impl Strategy<Value = Vec<EventKind>> {
        let noise = prop::collection::vec(
            prop::sample::select(vec![
                EventKind::Opened,
                EventKind::Impression,
                EventKind::Clicked,
                EventKind::Rewarded,
                EventKind::Loaded,
                EventKind::FailedToLoad,
                EventKind::Ready,
            ]),
            0..20,
        );
        (noise, 1usize..4).prop_flat_map(|(mut events, closes)| {
            events.extend(std::iter::repeat_n(EventKind::Closed, closes));
            Just(events).prop_shuffle()
        })
    }

    #[test]
    fn interstitial_happy_path() {
        let t = AdType::Interstitial;
        let s = on_request(t, AdState::Unloaded, Request::Load, false).expect("load");
        assert_eq!(s, AdState::Loading);
        assert_eq!(
            on_event(t, s, EventKind::Loaded),
            EventOutcome::Transition { to: AdState::Loaded }
        );
        let s = on_request(t, AdState::Loaded, Request::Show, false).expect("show");
        assert_eq!(s, AdState::Showing);
        assert_eq!(
            on_event(t, s, EventKind::Closed),
            EventOutcome::Transition { to: AdState::Closed }
        );
        assert_eq!(
            on_request(t, AdState::Closed, Request::Load, false).expect("reload"),
            AdState::Loading
        );
    }

    #[test]
    fn show_outside_loaded_is_not_ready() {
        for state in STATES.into_iter().filter(|s| *s != AdState::Loaded) {
            let err = on_request(AdType::Rewarded, state, Request::Show, false).expect_err("show");
            assert!(matches!(err, AdMobError::NotReady { state: s } if s == state));
        }
    }

    #[test]
    fn load_while_loading_or_in_flight_is_already_loading() {
        assert!(matches!(
            on_request(AdType::Interstitial, AdState::Loading, Request::Load, false),
            Err(AdMobError::AlreadyLoading)
        ));
        assert!(matches!(
            on_request(AdType::Interstitial, AdState::Failed, Request::Load, true),
            Err(AdMobError::AlreadyLoading)
        ));
        assert!(matches!(
            on_request(AdType::Interstitial, AdState::Loaded, Request::Load, false),
            Err(AdMobError::InvalidState { request: "load", .. })
        ));
    }

    #[test]
    fn banner_toggles_without_closing() {
        let t = AdType::Banner;
        assert_eq!(
            on_request(t, AdState::Loaded, Request::Show, false).expect("show"),
            AdState::Showing
        );
        assert_eq!(
            on_request(t, AdState::Showing, Request::Hide, false).expect("hide"),
            AdState::Loaded
        );
        assert_eq!(on_event(t, AdState::Showing, EventKind::Closed), EventOutcome::Discard);
        assert!(on_request(AdType::Interstitial, AdState::Showing, Request::Hide, false).is_err());
    }

    #[test]
    fn rewards_only_for_reward_formats() {
        assert_eq!(
            on_event(AdType::Interstitial, AdState::Showing, EventKind::Rewarded),
            EventOutcome::Discard
        );
        assert_eq!(
            on_event(AdType::Rewarded, AdState::Showing, EventKind::Rewarded),
            EventOutcome::Transition { to: AdState::Showing }
        );
    }

    #[test]
    fn rewarded_interstitial_events_stay_with_their_format() {
        assert_eq!(
            on_event(AdType::Interstitial, AdState::Loading, EventKind::RewardedInterstitialLoaded),
            EventOutcome::Discard
        );
        assert_eq!(
            on_event(
                AdType::RewardedInterstitial,
                AdState::Loading,
                EventKind::RewardedInterstitialFailed
            ),
            EventOutcome::Transition { to: AdState::Failed }
        );
    }

    #[test]
    fn global_events_never_move_state() {
        for ad_type in AdType::ALL {
            for state in STATES {
                assert_eq!(on_event(ad_type, state, EventKind::Ready), EventOutcome::Notify);
                assert_eq!(on_event(ad_type, state, EventKind::AutoStart), EventOutcome::Notify);
            }
        }
    }

    #[test]
    fn command_failure_rolls_back() {
        assert_eq!(
            on_command_failed(AdType::Interstitial, AdState::Loading, Request::Load),
            Some(AdState::Failed)
        );
        assert_eq!(
            on_command_failed(AdType::Interstitial, AdState::Loaded, Request::Load),
            None
        );
        assert_eq!(
            on_command_failed(AdType::Banner, AdState::Showing, Request::Show),
            Some(AdState::Loaded)
        );
        assert_eq!(
            on_command_failed(AdType::AppOpen, AdState::Showing, Request::Show),
            Some(AdState::Failed)
        );
    }

    proptest! {
        #[test]
        fn prop_every_accepted_step_is_an_edge(
            ad_type in any_ad_type(),
            start in any_state(),
            events in prop::collection::vec(any_event(), 0..40),
        ) {
            let mut state = start;
            for kind in events {
                if let EventOutcome::Transition { to } = on_event(ad_type, state, kind) {
                    prop_assert!(is_edge(ad_type.format(), state, to), "{state} -> {to} on {kind}");
                    state = to;
                }
            }
        }

        #[test]
        fn prop_discarded_events_are_noops(
            ad_type in any_ad_type(),
            start in any_state(),
            events in prop::collection::vec(any_event(), 0..40),
        ) {
            let (state, accepted) = run(ad_type, start, &events);
            let (replayed, reaccepted) = run(ad_type, start, &accepted);
            prop_assert_eq!(state, replayed);
            prop_assert_eq!(accepted, reaccepted);
        }

        #[test]
        fn prop_duplicate_delivery_changes_nothing(
            ad_type in any_ad_type(),
            start in any_state(),
            events in prop::collection::vec(any_event(), 0..40),
        ) {
            let doubled: Vec<EventKind> = events.iter().flat_map(|&e| [e, e]).collect();
            prop_assert_eq!(run(ad_type, start, &events).0, run(ad_type, start, &doubled).0);
        }

        #[test]
        fn prop_shown_ad_always_ends_closed(
            ad_type in prop::sample::select(vec![
                AdType::AppOpen,
                AdType::Interstitial,
                AdType::Rewarded,
                AdType::RewardedInterstitial,
            ]),
            events in shown_ad_events(),
        ) {
            let (state, _) = run(ad_type, AdState::Showing, &events);
            prop_assert_eq!(state, AdState::Closed);
        }
    }
}
