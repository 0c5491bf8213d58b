//! Per-state call bookkeeping
//!
//! [`CallStateProcessor`] maintains one ordered id set per coarse telephony
//! state. Mutations happen synchronously on the reporting thread, before any
//! scene event is queued, so the scene worker always observes the sets as
//! they were at submission time or later.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use tracing::debug;

use crate::call::{CallId, TelCallState, INVALID_CALL_ID};
use crate::scene::{AudioEvent, AudioSceneProcessor};

/// The coarse state buckets calls are tracked under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Active,
    Holding,
    Alerting,
    Incoming,
    Dialing,
}

fn bucket_for(state: TelCallState) -> Option<Bucket> {
    match state {
        TelCallState::Active | TelCallState::Answered => Some(Bucket::Active),
        TelCallState::Holding => Some(Bucket::Holding),
        TelCallState::Alerting => Some(Bucket::Alerting),
        TelCallState::Incoming | TelCallState::Waiting => Some(Bucket::Incoming),
        TelCallState::Dialing => Some(Bucket::Dialing),
        _ => None,
    }
}

/// Whether two telephony states are tracked in the same set
pub(crate) fn same_bucket(a: TelCallState, b: TelCallState) -> bool {
    match (bucket_for(a), bucket_for(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[derive(Debug, Default)]
struct CallSets {
    active: BTreeSet<CallId>,
    holding: BTreeSet<CallId>,
    alerting: BTreeSet<CallId>,
    incoming: BTreeSet<CallId>,
    dialing: BTreeSet<CallId>,
}

impl CallSets {
    fn set(&self, bucket: Bucket) -> &BTreeSet<CallId> {
        match bucket {
            Bucket::Active => &self.active,
            Bucket::Holding => &self.holding,
            Bucket::Alerting => &self.alerting,
            Bucket::Incoming => &self.incoming,
            Bucket::Dialing => &self.dialing,
        }
    }

    fn set_mut(&mut self, bucket: Bucket) -> &mut BTreeSet<CallId> {
        match bucket {
            Bucket::Active => &mut self.active,
            Bucket::Holding => &mut self.holding,
            Bucket::Alerting => &mut self.alerting,
            Bucket::Incoming => &mut self.incoming,
            Bucket::Dialing => &mut self.dialing,
        }
    }
}

/// Tracks which calls are in which coarse telephony state
pub struct CallStateProcessor {
    sets: Mutex<CallSets>,
    scene: AudioSceneProcessor,
}

impl CallStateProcessor {
    pub fn new(scene: AudioSceneProcessor) -> Self {
        Self {
            sets: Mutex::new(CallSets::default()),
            scene,
        }
    }

    /// Track a call under the set for `state`; duplicate adds are no-ops
    pub fn add_call(&self, call_id: CallId, state: TelCallState) {
        let Some(bucket) = bucket_for(state) else {
            return;
        };
        let mut sets = self.sets.lock();
        if sets.set_mut(bucket).insert(call_id) {
            debug!(call_id, %state, "tracking call");
        }
    }

    /// Stop tracking a call under the set for `state`; unknown ids are no-ops
    pub fn delete_call(&self, call_id: CallId, state: TelCallState) {
        let Some(bucket) = bucket_for(state) else {
            return;
        };
        let mut sets = self.sets.lock();
        if sets.set_mut(bucket).remove(&call_id) {
            debug!(call_id, %state, "untracking call");
        }
    }

    /// Number of calls currently in the set for `state`
    pub fn call_number(&self, state: TelCallState) -> usize {
        match bucket_for(state) {
            Some(bucket) => self.sets.lock().set(bucket).len(),
            None => 0,
        }
    }

    /// True when any call is tracked in any set
    pub fn has_calls(&self) -> bool {
        let sets = self.sets.lock();
        !(sets.active.is_empty()
            && sets.holding.is_empty()
            && sets.alerting.is_empty()
            && sets.incoming.is_empty()
            && sets.dialing.is_empty())
    }

    /// Whether the scene may switch into the scene for `state`
    ///
    /// True only when the set for `state` holds exactly one call and every
    /// competing set is empty. Exactly-one-and-exclusive, never "first of
    /// several".
    pub fn should_switch_state(&self, state: TelCallState) -> bool {
        let sets = self.sets.lock();
        match bucket_for(state) {
            Some(Bucket::Dialing) => {
                sets.dialing.len() == 1
                    && sets.active.is_empty()
                    && sets.incoming.is_empty()
                    && sets.alerting.is_empty()
            }
            Some(Bucket::Alerting) => {
                sets.alerting.len() == 1 && sets.active.is_empty() && sets.incoming.is_empty()
            }
            Some(Bucket::Incoming) => {
                sets.incoming.len() == 1
                    && sets.active.is_empty()
                    && sets.dialing.is_empty()
                    && sets.alerting.is_empty()
            }
            Some(Bucket::Active) => sets.active.len() == 1 && sets.incoming.is_empty(),
            Some(Bucket::Holding) => {
                sets.holding.len() == 1 && sets.active.is_empty() && sets.incoming.is_empty()
            }
            None => false,
        }
    }

    /// Queue the scene switch matching the highest-priority populated set
    ///
    /// Does nothing while an active call exists; the new-active path drives
    /// those transitions. With no calls at all the inactive switch is queued.
    pub fn update_current_call_state(&self) -> bool {
        let event = {
            let sets = self.sets.lock();
            if !sets.active.is_empty() {
                return false;
            }
            if !sets.holding.is_empty() {
                AudioEvent::SwitchHoldingState
            } else if !sets.incoming.is_empty() {
                AudioEvent::SwitchIncomingState
            } else if !sets.dialing.is_empty() {
                AudioEvent::SwitchDialingState
            } else if !sets.alerting.is_empty() {
                AudioEvent::SwitchAlertingState
            } else {
                AudioEvent::SwitchAudioInactiveState
            }
        };
        self.scene.process_event(event)
    }

    /// The call whose audio should be in the foreground
    ///
    /// Priority: active, then dialing, alerting, incoming, holding. Returns
    /// [`INVALID_CALL_ID`] when no call is tracked.
    pub fn audio_foreground_live_call(&self) -> CallId {
        let sets = self.sets.lock();
        for bucket in [
            Bucket::Active,
            Bucket::Dialing,
            Bucket::Alerting,
            Bucket::Incoming,
            Bucket::Holding,
        ] {
            if let Some(id) = sets.set(bucket).iter().next() {
                return *id;
            }
        }
        INVALID_CALL_ID
    }

    /// One currently active call, or [`INVALID_CALL_ID`]
    pub fn current_active_call(&self) -> CallId {
        self.first_call_in(TelCallState::Active)
    }

    /// The lowest call id in the set for `state`, or [`INVALID_CALL_ID`]
    pub fn first_call_in(&self, state: TelCallState) -> CallId {
        let Some(bucket) = bucket_for(state) else {
            return INVALID_CALL_ID;
        };
        self.sets
            .lock()
            .set(bucket)
            .iter()
            .next()
            .copied()
            .unwrap_or(INVALID_CALL_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::AudioSceneProcessor;

    fn processor() -> (CallStateProcessor, tokio::sync::mpsc::UnboundedReceiver<AudioEvent>) {
        let (scene, rx) = AudioSceneProcessor::channel();
        (CallStateProcessor::new(scene), rx)
    }

    #[test]
    fn add_is_idempotent() {
        let (p, _rx) = processor();
        p.add_call(1, TelCallState::Dialing);
        p.add_call(1, TelCallState::Dialing);
        assert_eq!(p.call_number(TelCallState::Dialing), 1);
    }

    #[test]
    fn delete_unknown_is_noop() {
        let (p, _rx) = processor();
        p.delete_call(42, TelCallState::Active);
        assert_eq!(p.call_number(TelCallState::Active), 0);
        assert!(!p.has_calls());
    }

    #[test]
    fn waiting_and_incoming_share_a_set() {
        let (p, _rx) = processor();
        p.add_call(1, TelCallState::Incoming);
        p.add_call(2, TelCallState::Waiting);
        assert_eq!(p.call_number(TelCallState::Incoming), 2);
        assert_eq!(p.call_number(TelCallState::Waiting), 2);
        p.delete_call(1, TelCallState::Waiting);
        assert_eq!(p.call_number(TelCallState::Incoming), 1);
    }

    #[test]
    fn answered_counts_as_active() {
        let (p, _rx) = processor();
        p.add_call(7, TelCallState::Answered);
        assert_eq!(p.call_number(TelCallState::Active), 1);
    }

    #[test]
    fn switch_to_dialing_blocked_by_competitors() {
        let (p, _rx) = processor();
        p.add_call(1, TelCallState::Dialing);
        assert!(p.should_switch_state(TelCallState::Dialing));

        p.add_call(2, TelCallState::Incoming);
        assert!(!p.should_switch_state(TelCallState::Dialing));
        p.delete_call(2, TelCallState::Incoming);

        p.add_call(3, TelCallState::Active);
        assert!(!p.should_switch_state(TelCallState::Dialing));
        p.delete_call(3, TelCallState::Active);

        p.add_call(4, TelCallState::Alerting);
        assert!(!p.should_switch_state(TelCallState::Dialing));
    }

    #[test]
    fn switch_requires_exactly_one_member() {
        let (p, _rx) = processor();
        p.add_call(1, TelCallState::Dialing);
        p.add_call(2, TelCallState::Dialing);
        assert!(!p.should_switch_state(TelCallState::Dialing));
        p.delete_call(2, TelCallState::Dialing);
        assert!(p.should_switch_state(TelCallState::Dialing));
    }

    #[test]
    fn switch_to_alerting_allowed_while_dialing_set_populated() {
        // A dialing call that just moved to alerting may still be present in
        // the dialing set when the alerting switch is evaluated.
        let (p, _rx) = processor();
        p.add_call(1, TelCallState::Dialing);
        p.add_call(1, TelCallState::Alerting);
        assert!(p.should_switch_state(TelCallState::Alerting));
    }

    #[test]
    fn switch_to_active_requires_exactly_one() {
        let (p, _rx) = processor();
        p.add_call(1, TelCallState::Active);
        assert!(p.should_switch_state(TelCallState::Active));
        p.add_call(2, TelCallState::Active);
        assert!(!p.should_switch_state(TelCallState::Active));
        p.delete_call(2, TelCallState::Active);
        p.add_call(3, TelCallState::Incoming);
        assert!(!p.should_switch_state(TelCallState::Active));
    }

    #[test]
    fn switch_to_holding_blocked_by_active_or_incoming() {
        let (p, _rx) = processor();
        p.add_call(1, TelCallState::Holding);
        assert!(p.should_switch_state(TelCallState::Holding));
        p.add_call(2, TelCallState::Incoming);
        assert!(!p.should_switch_state(TelCallState::Holding));
    }

    #[test]
    fn foreground_priority_order() {
        let (p, _rx) = processor();
        assert_eq!(p.audio_foreground_live_call(), INVALID_CALL_ID);

        p.add_call(5, TelCallState::Holding);
        assert_eq!(p.audio_foreground_live_call(), 5);
        p.add_call(4, TelCallState::Incoming);
        assert_eq!(p.audio_foreground_live_call(), 4);
        p.add_call(3, TelCallState::Alerting);
        assert_eq!(p.audio_foreground_live_call(), 3);
        p.add_call(2, TelCallState::Dialing);
        assert_eq!(p.audio_foreground_live_call(), 2);
        p.add_call(1, TelCallState::Active);
        assert_eq!(p.audio_foreground_live_call(), 1);
    }

    #[test]
    fn update_skips_while_active_call_exists() {
        let (p, mut rx) = processor();
        p.add_call(1, TelCallState::Active);
        p.add_call(2, TelCallState::Holding);
        assert!(!p.update_current_call_state());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn update_picks_highest_priority_set() {
        let (p, mut rx) = processor();
        p.add_call(1, TelCallState::Alerting);
        p.add_call(2, TelCallState::Dialing);
        p.add_call(3, TelCallState::Incoming);
        p.add_call(4, TelCallState::Holding);

        assert!(p.update_current_call_state());
        assert_eq!(rx.try_recv().unwrap(), AudioEvent::SwitchHoldingState);

        p.delete_call(4, TelCallState::Holding);
        p.update_current_call_state();
        assert_eq!(rx.try_recv().unwrap(), AudioEvent::SwitchIncomingState);

        p.delete_call(3, TelCallState::Incoming);
        p.update_current_call_state();
        assert_eq!(rx.try_recv().unwrap(), AudioEvent::SwitchDialingState);

        p.delete_call(2, TelCallState::Dialing);
        p.update_current_call_state();
        assert_eq!(rx.try_recv().unwrap(), AudioEvent::SwitchAlertingState);

        p.delete_call(1, TelCallState::Alerting);
        p.update_current_call_state();
        assert_eq!(rx.try_recv().unwrap(), AudioEvent::SwitchAudioInactiveState);
    }
}
