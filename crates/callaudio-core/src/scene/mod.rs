//! Audio scene state machine
//!
//! One scene is current at a time (inactive, dialing, alerting, incoming,
//! CS call, IMS call, holding). Components submit [`AudioEvent`]s through the
//! cheap cloneable [`AudioSceneProcessor`] handle; a single worker task
//! consumes them in submission order so every transition observes a
//! consistent snapshot of the call sets.

mod worker;

use std::fmt;

use tokio::sync::mpsc;
use tracing::warn;

pub use worker::SceneWorker;

/// Events driving the audio scene state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    // Direct switch requests
    SwitchAudioInactiveState,
    SwitchDialingState,
    SwitchAlertingState,
    SwitchIncomingState,
    SwitchCsCallState,
    SwitchImsCallState,
    SwitchHoldingState,

    // Level events describing call-set edges
    NewActiveCsCall,
    NewActiveImsCall,
    NewActiveOttCall,
    NewDialingCall,
    NewAlertingCall,
    NewIncomingCall,
    NoMoreActiveCall,
    NoMoreDialingCall,
    NoMoreAlertingCall,
    NoMoreIncomingCall,
    NoMoreHoldingCall,
}

/// The scene the worker currently occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioScene {
    Inactive,
    Dialing,
    Alerting,
    Incoming,
    CsCall,
    ImsCall,
    Holding,
}

impl fmt::Display for AudioScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inactive => "inactive",
            Self::Dialing => "dialing",
            Self::Alerting => "alerting",
            Self::Incoming => "incoming",
            Self::CsCall => "cs-call",
            Self::ImsCall => "ims-call",
            Self::Holding => "holding",
        };
        f.write_str(s)
    }
}

/// Submission handle for the scene queue
///
/// Submitting never blocks and never fails the caller; a closed queue (worker
/// shut down) is logged and reported as `false`.
#[derive(Debug, Clone)]
pub struct AudioSceneProcessor {
    tx: mpsc::UnboundedSender<AudioEvent>,
}

impl AudioSceneProcessor {
    /// Create the handle and the receiving end for the worker task
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AudioEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event for the scene worker, fire-and-forget
    pub fn process_event(&self, event: AudioEvent) -> bool {
        if self.tx.send(event).is_err() {
            warn!(?event, "scene queue closed, event dropped");
            return false;
        }
        true
    }
}
