//! Call data model shared by every audio component
//!
//! Calls are owned by the surrounding call service; this crate only sees
//! integer call handles plus attribute snapshots fetched through the
//! [`CallRegistry`] seam. State transitions arrive through the
//! [`CallStateListener`] seam, implemented by the control manager.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// Externally-assigned call handle
pub type CallId = i32;

/// Sentinel for "no call" answers from priority lookups
pub const INVALID_CALL_ID: CallId = -1;

/// Telephony state of a single call, as reported by the call service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelCallState {
    Idle,
    Dialing,
    Alerting,
    Incoming,
    Waiting,
    Active,
    Holding,
    Answered,
    Disconnecting,
    Disconnected,
}

impl fmt::Display for TelCallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Dialing => "dialing",
            Self::Alerting => "alerting",
            Self::Incoming => "incoming",
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Holding => "holding",
            Self::Answered => "answered",
            Self::Disconnecting => "disconnecting",
            Self::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Bearer technology of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallType {
    CircuitSwitched,
    Ims,
    Ott,
    Voip,
    Satellite,
    Bluetooth,
}

/// Media direction of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoState {
    VoiceOnly,
    SendOnly,
    ReceiveOnly,
    Bidirectional,
}

impl VideoState {
    /// True when the call carries video in at least one direction
    pub fn is_video(&self) -> bool {
        !matches!(self, Self::VoiceOnly)
    }
}

/// Customized-ring-signal mode of an incoming call
///
/// When the network plays the ring media itself, local ringtone rendering
/// is replaced by vibration and, under some routes, a fallback soundtone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrsType {
    #[default]
    Unspecified,
    NetworkTone,
    NetworkVideo,
}

impl CrsType {
    /// True when the network supplies the ring media for this call
    pub fn is_network_ring(&self) -> bool {
        !matches!(self, Self::Unspecified)
    }
}

/// How a call ended, used to pick the post-call tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallEndedKind {
    Normally,
    Busy,
    InvalidNumber,
    Unknown,
}

/// Snapshot of the attributes the audio core needs for one call
#[derive(Debug, Clone)]
pub struct CallAttributes {
    pub call_id: CallId,
    pub call_type: CallType,
    pub state: TelCallState,
    pub video_state: VideoState,
    pub crs_type: CrsType,
    pub is_emergency: bool,
    pub is_muted: bool,
    /// How the call ended; meaningful once the call disconnects
    pub ended: CallEndedKind,
}

impl CallAttributes {
    /// A plain voice call with everything else defaulted, for construction
    /// sites that only care about id and bearer
    pub fn voice(call_id: CallId, call_type: CallType) -> Self {
        Self {
            call_id,
            call_type,
            state: TelCallState::Idle,
            video_state: VideoState::VoiceOnly,
            crs_type: CrsType::Unspecified,
            is_emergency: false,
            is_muted: false,
            ended: CallEndedKind::Unknown,
        }
    }
}

/// Read access to the call service's call table
///
/// The audio core never owns calls; it looks attributes up by handle when a
/// decision needs them (foreground routing, CRS branch, mute bookkeeping).
pub trait CallRegistry: Send + Sync {
    /// Attributes of a call, or `None` when the service no longer knows it
    fn attributes(&self, call_id: CallId) -> Option<CallAttributes>;

    /// Record the microphone-mute flag on a call object
    fn set_muted(&self, call_id: CallId, muted: bool);
}

/// Call lifecycle notifications consumed by the audio core
///
/// Implemented by the control manager; invoked by the surrounding call
/// service whenever a call is created, destroyed, or changes state.
#[async_trait]
pub trait CallStateListener: Send + Sync {
    async fn new_call_created(&self, call: &CallAttributes);

    async fn call_destroyed(&self, call: &CallAttributes);

    async fn call_state_updated(
        &self,
        call: &CallAttributes,
        prior_state: TelCallState,
        next_state: TelCallState,
    );

    async fn video_state_updated(
        &self,
        call: &CallAttributes,
        prior_state: VideoState,
        next_state: VideoState,
    );

    /// The user answered the ringing call from a secondary surface
    async fn incoming_call_activated(&self, call: &CallAttributes);

    /// The user rejected the ringing call, optionally with an SMS reply
    async fn incoming_call_hung_up(&self, call: &CallAttributes, send_sms: bool, content: &str);
}

/// Blanket impl so `Arc<dyn CallRegistry>` works wherever a registry is needed
impl<T: CallRegistry + ?Sized> CallRegistry for Arc<T> {
    fn attributes(&self, call_id: CallId) -> Option<CallAttributes> {
        (**self).attributes(call_id)
    }

    fn set_muted(&self, call_id: CallId, muted: bool) {
        (**self).set_muted(call_id, muted)
    }
}
