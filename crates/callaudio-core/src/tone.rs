//! Ringtone, soundtone, and short-tone playback
//!
//! Three players share the create/release discipline: a renderer handle is
//! acquired from the factory when playback starts and released when it stops.
//! Double starts and double stops are guarded and reported as benign
//! already-in-state conditions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::call::{CallEndedKind, CallRegistry, TelCallState, INVALID_CALL_ID};
use crate::device::AudioDeviceManager;
use crate::error::{CallAudioError, CallAudioResult};
use crate::platform::{AudioPlatform, Renderer, RendererFactory, RingerMode, ToneKind};
use crate::state::CallStateProcessor;

/// How long a DTMF digit stays audible before the renderer is stopped
const DTMF_PLAY_DURATION: Duration = Duration::from_millis(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerState {
    Stopped,
    Playing,
}

struct PlayerInner {
    state: PlayerState,
    renderer: Option<Arc<dyn Renderer>>,
}

/// One guarded playback slot
struct Player {
    name: &'static str,
    inner: tokio::sync::Mutex<PlayerInner>,
}

impl Player {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: tokio::sync::Mutex::new(PlayerInner {
                state: PlayerState::Stopped,
                renderer: None,
            }),
        }
    }

    async fn play(&self, renderer: Arc<dyn Renderer>) -> CallAudioResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.state == PlayerState::Playing {
            return Err(CallAudioError::already_in_state(self.name));
        }
        renderer.play().await?;
        inner.renderer = Some(renderer);
        inner.state = PlayerState::Playing;
        debug!(player = self.name, "playback started");
        Ok(())
    }

    async fn stop(&self) -> CallAudioResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.state == PlayerState::Stopped {
            return Err(CallAudioError::already_in_state(self.name));
        }
        if let Some(renderer) = inner.renderer.take() {
            renderer.stop().await?;
        }
        inner.state = PlayerState::Stopped;
        debug!(player = self.name, "playback stopped");
        Ok(())
    }

    /// Silence without releasing; the held renderer still answers a stop
    async fn mute(&self) -> CallAudioResult<()> {
        let inner = self.inner.lock().await;
        match &inner.renderer {
            Some(renderer) => renderer.mute().await,
            None => Err(CallAudioError::RendererMissing {
                what: self.name.to_string(),
            }),
        }
    }

    async fn is_playing(&self) -> bool {
        self.inner.lock().await.state == PlayerState::Playing
    }
}

/// Shared tone component used by the control manager and the scene worker
pub struct CallTones {
    factory: Arc<dyn RendererFactory>,
    platform: Arc<dyn AudioPlatform>,
    registry: Arc<dyn CallRegistry>,
    call_state: Arc<CallStateProcessor>,
    devices: Arc<AudioDeviceManager>,

    ring: Player,
    sound: Player,
    tone: Player,
    /// Which short tone the tone player currently renders
    current_tone: tokio::sync::Mutex<Option<ToneKind>>,

    crs_vibrating: AtomicBool,
    /// The CRS fallback borrowed the soundtone player for this ring
    crs_soundtone: AtomicBool,
}

impl CallTones {
    pub fn new(
        factory: Arc<dyn RendererFactory>,
        platform: Arc<dyn AudioPlatform>,
        registry: Arc<dyn CallRegistry>,
        call_state: Arc<CallStateProcessor>,
        devices: Arc<AudioDeviceManager>,
    ) -> Self {
        Self {
            factory,
            platform,
            registry,
            call_state,
            devices,
            ring: Player::new("ringtone"),
            sound: Player::new("soundtone"),
            tone: Player::new("tone"),
            current_tone: tokio::sync::Mutex::new(None),
            crs_vibrating: AtomicBool::new(false),
            crs_soundtone: AtomicBool::new(false),
        }
    }

    /// Start ringing for the current incoming call
    ///
    /// Plain incoming calls render the configured ringtone. When the network
    /// supplies the ring media (CRS), no ringtone is rendered locally:
    /// the device vibrates unless the ringer is silent, and a soundtone is
    /// played as fallback when the ringer is normal or an accessory would
    /// otherwise keep the user from hearing the network media.
    pub async fn play_ringtone(&self) -> CallAudioResult<()> {
        let incoming = self.call_state.first_call_in(TelCallState::Incoming);
        let crs = incoming != INVALID_CALL_ID
            && self
                .registry
                .attributes(incoming)
                .map(|call| call.crs_type.is_network_ring())
                .unwrap_or(false);
        if crs {
            return self.play_crs_ring().await;
        }
        self.platform.set_volume_audible().await;
        self.ring.play(self.factory.ringtone()).await
    }

    async fn play_crs_ring(&self) -> CallAudioResult<()> {
        let mode = self.platform.ringer_mode();
        if mode != RingerMode::Silent {
            self.platform.start_vibration().await?;
            self.crs_vibrating.store(true, Ordering::SeqCst);
        }
        if mode == RingerMode::Normal || self.devices.is_accessory_connected() {
            self.platform.set_volume_audible().await;
            self.sound.play(self.factory.soundtone()).await?;
            self.crs_soundtone.store(true, Ordering::SeqCst);
        } else {
            info!("network ring media active, no local renderer");
        }
        Ok(())
    }

    /// Stop any ring rendering, vibration included
    pub async fn stop_ringtone(&self) -> CallAudioResult<()> {
        if self.crs_vibrating.swap(false, Ordering::SeqCst) {
            self.platform.stop_vibration().await?;
        }
        if self.crs_soundtone.swap(false, Ordering::SeqCst) {
            if let Err(e) = self.sound.stop().await {
                if !e.is_benign() {
                    return Err(e);
                }
            }
        }
        match self.ring.stop().await {
            Ok(()) => Ok(()),
            Err(e) if e.is_benign() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Silence the ringer without releasing it; vibration stops outright
    pub async fn mute_ringer(&self) -> CallAudioResult<()> {
        if self.crs_vibrating.swap(false, Ordering::SeqCst) {
            self.platform.stop_vibration().await?;
        }
        match self.ring.mute().await {
            Ok(()) => Ok(()),
            Err(CallAudioError::RendererMissing { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Whether a CRS ring is currently vibrating
    pub fn is_crs_vibrating(&self) -> bool {
        self.crs_vibrating.load(Ordering::SeqCst)
    }

    /// Stop CRS vibration if running
    pub async fn stop_crs_vibration(&self) -> CallAudioResult<()> {
        if self.crs_vibrating.swap(false, Ordering::SeqCst) {
            self.platform.stop_vibration().await?;
        }
        Ok(())
    }

    /// Start the dial/second-call progress soundtone
    pub async fn play_soundtone(&self) -> CallAudioResult<()> {
        self.sound.play(self.factory.soundtone()).await
    }

    pub async fn stop_soundtone(&self) -> CallAudioResult<()> {
        self.sound.stop().await
    }

    pub async fn is_soundtone_playing(&self) -> bool {
        self.sound.is_playing().await
    }

    /// Play a short tone of the given kind on the shared tone slot
    ///
    /// A different kind replaces whatever is playing; the same kind twice is
    /// the usual double-start guard.
    pub async fn play_call_tone(&self, kind: ToneKind) -> CallAudioResult<()> {
        let mut current = self.current_tone.lock().await;
        if *current != Some(kind) && self.tone.is_playing().await {
            self.tone.stop().await?;
            *current = None;
        }
        self.platform.set_volume_audible().await;
        self.tone.play(self.factory.tone(kind)).await?;
        *current = Some(kind);
        Ok(())
    }

    /// Stop whatever short tone is playing
    pub async fn stop_call_tone(&self) -> CallAudioResult<()> {
        self.tone.stop().await?;
        *self.current_tone.lock().await = None;
        Ok(())
    }

    /// Stop the short tone only if it is of the given kind
    async fn stop_call_tone_of(&self, kind: ToneKind) -> CallAudioResult<()> {
        {
            let current = self.current_tone.lock().await;
            if *current != Some(kind) {
                return Ok(());
            }
        }
        self.stop_call_tone().await
    }

    pub async fn play_ringback(&self) -> CallAudioResult<()> {
        self.play_call_tone(ToneKind::RingbackTone).await
    }

    /// Stop the ringback tone; a different tone keeps playing
    pub async fn stop_ringback(&self) -> CallAudioResult<()> {
        self.stop_call_tone_of(ToneKind::RingbackTone).await
    }

    pub async fn play_waiting_tone(&self) -> CallAudioResult<()> {
        self.play_call_tone(ToneKind::WaitingTone).await
    }

    pub async fn stop_waiting_tone(&self) -> CallAudioResult<()> {
        self.stop_call_tone_of(ToneKind::WaitingTone).await
    }

    pub async fn play_holding_tone(&self) -> CallAudioResult<()> {
        self.play_call_tone(ToneKind::HoldingTone).await
    }

    pub async fn stop_holding_tone(&self) -> CallAudioResult<()> {
        self.stop_call_tone_of(ToneKind::HoldingTone).await
    }

    /// Render one DTMF digit for the fixed audibility window
    pub async fn play_dtmf(&self, digit: char) -> CallAudioResult<()> {
        self.play_call_tone(ToneKind::Dtmf(digit)).await?;
        tokio::time::sleep(DTMF_PLAY_DURATION).await;
        self.stop_call_tone().await
    }

    /// Play the post-call tone matching how the call ended
    pub async fn play_call_ended_tone(&self, ended: CallEndedKind) -> CallAudioResult<()> {
        let kind = match ended {
            CallEndedKind::Normally => ToneKind::FinishedTone,
            CallEndedKind::Busy => ToneKind::BusyTone,
            CallEndedKind::InvalidNumber => ToneKind::InvalidNumberTone,
            CallEndedKind::Unknown => ToneKind::UnknownTone,
        };
        if let Err(e) = self.play_call_tone(kind).await {
            warn!(?kind, error = %e, "call ended tone not played");
            return Err(e);
        }
        Ok(())
    }
}
