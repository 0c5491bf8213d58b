//! Seams to the platform audio services
//!
//! Everything the core needs from the host platform is expressed as a trait
//! so the state machine can be driven in tests without real hardware: the
//! audio HAL facade, the renderer factory for ringtones and tones, and the
//! dialog surface used to prompt the user about rejected device switches.

use std::sync::Arc;

use async_trait::async_trait;

use crate::device::AudioDeviceType;
use crate::error::CallAudioResult;

/// Ringer mode configured by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingerMode {
    Normal,
    Vibrate,
    Silent,
}

/// Coarse audio scene reported to the platform mixer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSceneMode {
    Default,
    Ringing,
    InCall,
}

/// Facade over the platform audio HAL
#[async_trait]
pub trait AudioPlatform: Send + Sync {
    /// Current user ringer mode
    fn ringer_mode(&self) -> RingerMode;

    /// Mute or unmute the call microphone
    async fn set_microphone_mute(&self, mute: bool) -> CallAudioResult<()>;

    /// Current microphone mute flag
    fn is_microphone_muted(&self) -> bool;

    /// Start the ring vibration pattern
    async fn start_vibration(&self) -> CallAudioResult<()>;

    /// Stop any ring vibration
    async fn stop_vibration(&self) -> CallAudioResult<()>;

    /// Report the coarse audio scene to the mixer
    async fn set_audio_scene(&self, scene: AudioSceneMode) -> CallAudioResult<()>;

    /// Raise the ring/voice stream volume to an audible level if it is zero
    async fn set_volume_audible(&self);

    /// Bring up the Bluetooth SCO voice channel
    async fn activate_bluetooth_sco(&self) -> CallAudioResult<()>;

    /// Route call audio output to the given local device
    async fn select_output(&self, device: AudioDeviceType) -> CallAudioResult<()>;
}

/// Kinds of short tones the tone player can render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneKind {
    /// Local ringback while the far end is alerting
    RingbackTone,
    /// Call-waiting notification during an active call
    WaitingTone,
    /// Reminder while the remote party holds the call
    HoldingTone,
    /// Single DTMF digit
    Dtmf(char),
    /// Far end busy
    BusyTone,
    /// Call ended normally
    FinishedTone,
    /// Call ended for an unclassified reason
    UnknownTone,
    /// Dialed number invalid
    InvalidNumberTone,
}

/// A playable audio stream (ringtone, soundtone, or short tone)
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn play(&self) -> CallAudioResult<()>;

    async fn stop(&self) -> CallAudioResult<()>;

    /// Silence the stream without releasing it; a later stop still applies
    async fn mute(&self) -> CallAudioResult<()>;
}

/// Creates renderer instances on demand
///
/// Players hold the returned handles for the lifetime of one playback and
/// release them on stop, matching the create/release discipline of the
/// underlying media service.
pub trait RendererFactory: Send + Sync {
    /// The configured incoming-call ringtone
    fn ringtone(&self) -> Arc<dyn Renderer>;

    /// The dial/second-call progress soundtone
    fn soundtone(&self) -> Arc<dyn Renderer>;

    /// A short tone of the given kind
    fn tone(&self, kind: ToneKind) -> Arc<dyn Renderer>;
}

/// Surface for prompting the user when a device switch is refused
pub trait CallDialog: Send + Sync {
    /// Show the prompt identified by `reason`
    fn connect_prompt(&self, reason: &str);
}
