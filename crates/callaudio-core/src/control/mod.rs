//! Central audio orchestration
//!
//! [`AudioControlManager`] is the only component that talks to call objects.
//! It consumes call lifecycle callbacks, keeps the per-state bookkeeping
//! current, queues scene transitions, and exposes the device-selection,
//! mute, and tone API used by the rest of the call service.

mod interrupt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::call::{
    CallAttributes, CallId, CallRegistry, CallStateListener, CallType, TelCallState, VideoState,
    INVALID_CALL_ID,
};
use crate::device::{AudioDevice, AudioDeviceManager, AudioDeviceType};
use crate::distributed::DistributedCallManager;
use crate::error::{CallAudioError, CallAudioResult};
use crate::platform::{AudioPlatform, CallDialog, ToneKind};
use crate::scene::{AudioEvent, AudioSceneProcessor};
use crate::state::{same_bucket, CallStateProcessor};
use crate::tone::CallTones;

pub use interrupt::{AudioInterruptState, InterruptStateHandle};

/// Orchestrates call audio on behalf of the call service
pub struct AudioControlManager {
    registry: Arc<dyn CallRegistry>,
    platform: Arc<dyn AudioPlatform>,
    dialog: Arc<dyn CallDialog>,
    call_state: Arc<CallStateProcessor>,
    scene: AudioSceneProcessor,
    devices: Arc<AudioDeviceManager>,
    tones: Arc<CallTones>,
    distributed: Arc<DistributedCallManager>,
    interrupt: InterruptStateHandle,

    /// Calls this manager currently cares about
    total_calls: DashSet<CallId>,
    foreground_call: Mutex<CallId>,
    /// The current route was picked explicitly by the user
    device_set_by_user: AtomicBool,
}

impl AudioControlManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<dyn CallRegistry>,
        platform: Arc<dyn AudioPlatform>,
        dialog: Arc<dyn CallDialog>,
        call_state: Arc<CallStateProcessor>,
        scene: AudioSceneProcessor,
        devices: Arc<AudioDeviceManager>,
        tones: Arc<CallTones>,
        distributed: Arc<DistributedCallManager>,
        interrupt: InterruptStateHandle,
    ) -> Self {
        Self {
            registry,
            platform,
            dialog,
            call_state,
            scene,
            devices,
            tones,
            distributed,
            interrupt,
            total_calls: DashSet::new(),
            foreground_call: Mutex::new(INVALID_CALL_ID),
            device_set_by_user: AtomicBool::new(false),
        }
    }

    /// Current audio-interrupt state
    pub fn audio_interrupt_state(&self) -> AudioInterruptState {
        self.interrupt.get()
    }

    /// The call whose audio state the hardware currently reflects
    pub fn foreground_live_call(&self) -> CallId {
        *self.foreground_call.lock()
    }

    /// The route the default policy would pick right now
    pub fn get_init_audio_device_type(&self) -> AudioDeviceType {
        self.devices.init_audio_device_type()
    }

    /// Select an audio output device
    ///
    /// An earpiece request while a satellite call exists is rejected and the
    /// user is prompted instead. Selecting a local device while a distributed
    /// device carries audio relinquishes the distributed device first; the
    /// two are mutually exclusive. `is_by_user` is recorded so automatic
    /// defaulting never overrides an explicit user choice.
    pub async fn set_audio_device(
        &self,
        device: &AudioDevice,
        is_by_user: bool,
    ) -> CallAudioResult<()> {
        if device.device_type == AudioDeviceType::Earpiece && self.is_satellite_call_exists() {
            self.dialog.connect_prompt("satellite_call_earpiece_unsupported");
            return Err(CallAudioError::policy_rejected(
                "earpiece unavailable during satellite call",
            ));
        }
        self.device_set_by_user.store(is_by_user, Ordering::SeqCst);
        if !device.device_type.is_distributed() && self.distributed.is_switched_on() {
            self.distributed.switch_off_device_sync().await?;
        }
        match device.device_type {
            AudioDeviceType::Speaker
            | AudioDeviceType::Earpiece
            | AudioDeviceType::WiredHeadset => self.devices.switch_device(device.device_type).await,
            AudioDeviceType::BluetoothSco => {
                self.platform.activate_bluetooth_sco().await?;
                self.devices.switch_device(AudioDeviceType::BluetoothSco).await
            }
            t if t.is_distributed() => self.handle_distributed_audio_device(device).await,
            other => Err(CallAudioError::invalid_argument(format!(
                "unsupported audio device: {other}"
            ))),
        }
    }

    async fn handle_distributed_audio_device(&self, device: &AudioDevice) -> CallAudioResult<()> {
        if device.address.distributed_dev_id().is_empty() {
            return Err(CallAudioError::invalid_argument(
                "distributed device without device id",
            ));
        }
        self.distributed.switch_on_device_sync(device).await
    }

    /// Mute or unmute the call microphone
    ///
    /// Refused while no call exists; forced to unmute while an emergency
    /// call is up.
    pub async fn set_mute(&self, is_mute: bool) -> CallAudioResult<()> {
        if self.total_calls.is_empty() {
            return Err(CallAudioError::NoCallExists);
        }
        let mute = if self.is_emergency_call_exists() {
            false
        } else {
            is_mute
        };
        self.platform.set_microphone_mute(mute).await?;
        let foreground = self.foreground_live_call();
        if foreground != INVALID_CALL_ID {
            self.registry.set_muted(foreground, mute);
        }
        info!(mute, "microphone mute updated");
        Ok(())
    }

    /// Silence the ringer without releasing the renderer
    pub async fn mute_ringer(&self) -> CallAudioResult<()> {
        self.tones.mute_ringer().await
    }

    /// Play a single DTMF digit for the fixed audibility window
    pub async fn play_dtmf_tone(&self, digit: char) -> CallAudioResult<()> {
        let valid = digit.is_ascii_digit() || matches!(digit, '*' | '#' | 'A'..='D');
        if !valid {
            return Err(CallAudioError::invalid_argument(format!(
                "not a dtmf digit: {digit:?}"
            )));
        }
        self.tones.play_dtmf(digit).await
    }

    pub async fn play_ringtone(&self) -> CallAudioResult<()> {
        self.tones.play_ringtone().await
    }

    pub async fn stop_ringtone(&self) -> CallAudioResult<()> {
        self.tones.stop_ringtone().await
    }

    pub async fn play_sound_tone(&self) -> CallAudioResult<()> {
        self.tones.play_soundtone().await
    }

    pub async fn stop_sound_tone(&self) -> CallAudioResult<()> {
        self.tones.stop_soundtone().await
    }

    pub async fn play_call_tone(&self, kind: ToneKind) -> CallAudioResult<()> {
        self.tones.play_call_tone(kind).await
    }

    pub async fn stop_call_tone(&self) -> CallAudioResult<()> {
        self.tones.stop_call_tone().await
    }

    pub async fn play_waiting_tone(&self) -> CallAudioResult<()> {
        self.tones.play_waiting_tone().await
    }

    pub async fn stop_waiting_tone(&self) -> CallAudioResult<()> {
        self.tones.stop_waiting_tone().await
    }

    pub async fn play_holding_tone(&self) -> CallAudioResult<()> {
        self.tones.play_holding_tone().await
    }

    pub async fn stop_holding_tone(&self) -> CallAudioResult<()> {
        self.tones.stop_holding_tone().await
    }

    /// True when any tracked call carries the emergency flag
    pub fn is_emergency_call_exists(&self) -> bool {
        self.total_calls.iter().any(|id| {
            self.registry
                .attributes(*id)
                .map(|call| call.is_emergency)
                .unwrap_or(false)
        })
    }

    /// True when any tracked call is a satellite call
    pub fn is_satellite_call_exists(&self) -> bool {
        self.total_calls.iter().any(|id| {
            self.registry
                .attributes(*id)
                .map(|call| call.call_type == CallType::Satellite)
                .unwrap_or(false)
        })
    }

    fn update_foreground_live_call(&self) {
        let foreground = self.call_state.audio_foreground_live_call();
        *self.foreground_call.lock() = foreground;
        self.distributed
            .set_call_active(self.call_state.call_number(TelCallState::Active) > 0);
    }

    async fn handle_call_state_updated(
        &self,
        call: &CallAttributes,
        prior: TelCallState,
        next: TelCallState,
    ) {
        // Answering mutes the ringer but releases nothing; the scene stays
        // put until the ACTIVE report arrives.
        if next == TelCallState::Answered {
            self.call_state.delete_call(call.call_id, prior);
            if let Err(e) = self.tones.mute_ringer().await {
                warn!(error = %e, "ringer mute failed");
            }
            return;
        }
        self.handle_next_state(call, prior, next).await;
        if prior != next && !same_bucket(prior, next) {
            self.handle_prior_state(call, prior).await;
        }
    }

    async fn handle_next_state(
        &self,
        call: &CallAttributes,
        prior: TelCallState,
        next: TelCallState,
    ) {
        match next {
            TelCallState::Dialing => {
                self.call_state.add_call(call.call_id, next);
                self.interrupt.set(AudioInterruptState::Ringing);
                self.scene.process_event(AudioEvent::NewDialingCall);
            }
            TelCallState::Alerting => {
                self.call_state.add_call(call.call_id, next);
                self.interrupt.set(AudioInterruptState::Ringing);
                self.scene.process_event(AudioEvent::NewAlertingCall);
            }
            TelCallState::Incoming | TelCallState::Waiting => {
                self.call_state.add_call(call.call_id, next);
                self.interrupt.set(AudioInterruptState::Ringing);
                self.scene.process_event(AudioEvent::NewIncomingCall);
            }
            TelCallState::Active => {
                self.call_state.add_call(call.call_id, next);
                self.handle_new_active_call(call);
                self.interrupt.set(AudioInterruptState::Activated);
            }
            TelCallState::Holding => {
                self.call_state.add_call(call.call_id, next);
            }
            TelCallState::Disconnecting | TelCallState::Disconnected => {
                self.interrupt.set(AudioInterruptState::Deactivated);
                if self.tones.is_crs_vibrating() {
                    if let Err(e) = self.tones.stop_crs_vibration().await {
                        warn!(error = %e, "crs vibration stop failed");
                    }
                }
                if next == TelCallState::Disconnected
                    && matches!(
                        prior,
                        TelCallState::Active | TelCallState::Dialing | TelCallState::Holding
                    )
                {
                    if let Err(e) = self.tones.play_call_ended_tone(call.ended).await {
                        debug!(error = %e, "call ended tone not played");
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_new_active_call(&self, call: &CallAttributes) {
        let event = match call.call_type {
            CallType::CircuitSwitched | CallType::Satellite | CallType::Bluetooth => {
                AudioEvent::NewActiveCsCall
            }
            CallType::Ims => AudioEvent::NewActiveImsCall,
            CallType::Ott => AudioEvent::NewActiveOttCall,
            CallType::Voip => return,
        };
        self.scene.process_event(event);
    }

    async fn handle_prior_state(&self, call: &CallAttributes, prior: TelCallState) {
        match prior {
            TelCallState::Dialing => {
                self.call_state.delete_call(call.call_id, prior);
                if self.call_state.call_number(TelCallState::Dialing) == 0 {
                    self.stop_progress_tones().await;
                    self.scene.process_event(AudioEvent::NoMoreDialingCall);
                }
            }
            TelCallState::Alerting => {
                self.call_state.delete_call(call.call_id, prior);
                if self.call_state.call_number(TelCallState::Alerting) == 0 {
                    self.stop_progress_tones().await;
                    self.scene.process_event(AudioEvent::NoMoreAlertingCall);
                }
            }
            TelCallState::Incoming | TelCallState::Waiting => {
                self.call_state.delete_call(call.call_id, prior);
                self.process_audio_when_call_active(call).await;
                if self.call_state.call_number(TelCallState::Incoming) == 0 {
                    self.scene.process_event(AudioEvent::NoMoreIncomingCall);
                }
            }
            TelCallState::Active => {
                self.call_state.delete_call(call.call_id, prior);
                if let Err(e) = self.tones.stop_ringback().await {
                    if !e.is_benign() {
                        warn!(error = %e, "ringback stop failed");
                    }
                }
                if self.call_state.call_number(TelCallState::Active) == 0 {
                    self.scene.process_event(AudioEvent::NoMoreActiveCall);
                }
            }
            TelCallState::Holding => {
                self.call_state.delete_call(call.call_id, prior);
                if self.call_state.call_number(TelCallState::Holding) == 0 {
                    self.scene.process_event(AudioEvent::NoMoreHoldingCall);
                }
            }
            _ => {}
        }
    }

    /// Stop the dial-progress renderers (ringback and soundtone)
    async fn stop_progress_tones(&self) {
        if let Err(e) = self.tones.stop_ringback().await {
            if !e.is_benign() {
                warn!(error = %e, "ringback stop failed");
            }
        }
        if let Err(e) = self.tones.stop_soundtone().await {
            if !e.is_benign() {
                warn!(error = %e, "soundtone stop failed");
            }
        }
    }

    /// Adjustments when a ringing call just became active
    async fn process_audio_when_call_active(&self, call: &CallAttributes) {
        if !self.distributed.is_switched_on()
            && (call.video_state.is_video() || call.call_type == CallType::Satellite)
        {
            if let Err(e) = self.devices.switch_device(AudioDeviceType::Speaker).await {
                warn!(error = %e, "speaker default for video/satellite call failed");
            }
        }
        // A remaining dial attempt keeps its progress tone after the answer
        if self.call_state.call_number(TelCallState::Dialing) > 0 {
            if let Err(e) = self.tones.stop_soundtone().await {
                if !e.is_benign() {
                    warn!(error = %e, "soundtone stop failed");
                }
            }
            if let Err(e) = self.tones.play_soundtone().await {
                if !e.is_benign() {
                    warn!(error = %e, "soundtone restart failed");
                }
            }
        }
    }
}

#[async_trait]
impl CallStateListener for AudioControlManager {
    async fn new_call_created(&self, call: &CallAttributes) {
        if call.call_type == CallType::Voip {
            return;
        }
        if self.total_calls.insert(call.call_id) {
            debug!(call_id = call.call_id, "call tracked");
        }
    }

    async fn call_destroyed(&self, call: &CallAttributes) {
        if call.call_type == CallType::Voip {
            return;
        }
        if self.total_calls.remove(&call.call_id).is_none() {
            debug!(call_id = call.call_id, "destroyed call was not tracked");
            return;
        }
        self.call_state.delete_call(call.call_id, call.state);
        if !self.call_state.has_calls() {
            self.distributed.deal_disconnect_call().await;
        }
        self.update_foreground_live_call();
    }

    async fn call_state_updated(
        &self,
        call: &CallAttributes,
        prior_state: TelCallState,
        next_state: TelCallState,
    ) {
        if call.call_type == CallType::Voip {
            debug!(call_id = call.call_id, "voip call manages its own audio");
            return;
        }
        self.total_calls.insert(call.call_id);
        debug!(
            call_id = call.call_id,
            prior = %prior_state,
            next = %next_state,
            "call state updated"
        );
        self.handle_call_state_updated(call, prior_state, next_state).await;
        if next_state == TelCallState::Disconnected {
            self.total_calls.remove(&call.call_id);
        }
        self.update_foreground_live_call();
    }

    async fn video_state_updated(
        &self,
        call: &CallAttributes,
        prior_state: VideoState,
        next_state: VideoState,
    ) {
        if call.call_type == CallType::Voip || prior_state == next_state {
            return;
        }
        if !self.devices.is_audio_activated() {
            return;
        }
        // Defaulting only; an explicit user pick or an accessory wins
        if self.device_set_by_user.load(Ordering::SeqCst)
            || self.devices.is_accessory_connected()
            || self.distributed.is_switched_on()
        {
            return;
        }
        if call.call_id != self.foreground_live_call() {
            return;
        }
        if let Err(e) = self.devices.init_audio_device().await {
            warn!(error = %e, "route update on video state change failed");
        }
    }

    async fn incoming_call_activated(&self, call: &CallAttributes) {
        if self.total_calls.get(&call.call_id).is_none() {
            debug!(call_id = call.call_id, "activated call was not tracked");
            return;
        }
        if let Err(e) = self.tones.stop_ringtone().await {
            warn!(error = %e, "ringtone stop failed");
        }
        self.call_state
            .delete_call(call.call_id, TelCallState::Incoming);
        match self.platform.set_microphone_mute(false).await {
            Ok(()) => self.registry.set_muted(call.call_id, false),
            Err(e) => warn!(error = %e, "microphone unmute failed"),
        }
        self.update_foreground_live_call();
    }

    async fn incoming_call_hung_up(&self, call: &CallAttributes, send_sms: bool, _content: &str) {
        if self.total_calls.get(&call.call_id).is_none() {
            debug!(call_id = call.call_id, "hung up call was not tracked");
            return;
        }
        if let Err(e) = self.tones.stop_ringtone().await {
            warn!(error = %e, "ringtone stop failed");
        }
        self.call_state
            .delete_call(call.call_id, TelCallState::Incoming);
        debug!(call_id = call.call_id, send_sms, "incoming call hung up");
        self.update_foreground_live_call();
    }
}
