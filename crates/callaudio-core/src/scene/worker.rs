//! Scene queue consumer
//!
//! Runs on one dedicated task so scene transitions are strictly ordered.
//! Direct switch requests move the machine unconditionally; level events are
//! interpreted against the current scene and may trigger a further switch
//! synchronously on the same task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::call::TelCallState;
use crate::device::{AudioDeviceManager, DeviceEvent};
use crate::platform::{AudioPlatform, AudioSceneMode};
use crate::scene::{AudioEvent, AudioScene};
use crate::state::CallStateProcessor;
use crate::tone::CallTones;

/// Consumes the scene queue and drives scene entry actions
pub struct SceneWorker {
    scene: AudioScene,
    call_state: Arc<CallStateProcessor>,
    devices: Arc<AudioDeviceManager>,
    tones: Arc<CallTones>,
    platform: Arc<dyn AudioPlatform>,
}

impl SceneWorker {
    pub fn new(
        call_state: Arc<CallStateProcessor>,
        devices: Arc<AudioDeviceManager>,
        tones: Arc<CallTones>,
        platform: Arc<dyn AudioPlatform>,
    ) -> Self {
        Self {
            scene: AudioScene::Inactive,
            call_state,
            devices,
            tones,
            platform,
        }
    }

    /// Drain the queue until every submission handle is dropped
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<AudioEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event).await;
        }
        debug!("scene queue closed, worker exiting");
    }

    async fn handle(&mut self, event: AudioEvent) {
        debug!(?event, scene = %self.scene, "scene event");
        match event {
            AudioEvent::SwitchAudioInactiveState
            | AudioEvent::SwitchDialingState
            | AudioEvent::SwitchAlertingState
            | AudioEvent::SwitchIncomingState
            | AudioEvent::SwitchCsCallState
            | AudioEvent::SwitchImsCallState
            | AudioEvent::SwitchHoldingState => self.switch_state(event).await,
            AudioEvent::NoMoreIncomingCall => {
                if let Err(e) = self.tones.stop_ringtone().await {
                    warn!(error = %e, "ringtone stop failed");
                }
                if let Err(e) = self.tones.stop_waiting_tone().await {
                    if !e.is_benign() {
                        warn!(error = %e, "waiting tone stop failed");
                    }
                }
                self.level_event(event).await;
            }
            _ => self.level_event(event).await,
        }
    }

    async fn switch_state(&mut self, event: AudioEvent) {
        match event {
            AudioEvent::SwitchAudioInactiveState => self.enter_inactive().await,
            AudioEvent::SwitchDialingState => self.enter_dialing().await,
            AudioEvent::SwitchAlertingState => self.enter_alerting().await,
            AudioEvent::SwitchIncomingState => self.enter_incoming().await,
            AudioEvent::SwitchCsCallState => self.enter_call(AudioScene::CsCall).await,
            AudioEvent::SwitchImsCallState => self.enter_call(AudioScene::ImsCall).await,
            AudioEvent::SwitchHoldingState => self.enter_holding().await,
            _ => {}
        }
        info!(scene = %self.scene, "current audio scene");
    }

    async fn enter_inactive(&mut self) {
        if let Err(e) = self.platform.set_audio_scene(AudioSceneMode::Default).await {
            warn!(error = %e, "audio scene reset failed");
        }
        self.devices.process_event(DeviceEvent::AudioDeactivated).await;
        self.scene = AudioScene::Inactive;
    }

    async fn enter_dialing(&mut self) {
        if let Err(e) = self.tones.play_soundtone().await {
            if !e.is_benign() {
                warn!(error = %e, "soundtone start failed");
            }
        }
        self.devices.process_event(DeviceEvent::AudioActivated).await;
        self.scene = AudioScene::Dialing;
    }

    async fn enter_alerting(&mut self) {
        if let Err(e) = self.tones.play_ringback().await {
            if !e.is_benign() {
                warn!(error = %e, "ringback start failed");
            }
        }
        self.scene = AudioScene::Alerting;
    }

    async fn enter_incoming(&mut self) {
        if let Err(e) = self.platform.set_audio_scene(AudioSceneMode::Ringing).await {
            warn!(error = %e, "ringing scene set failed");
        }
        if let Err(e) = self.tones.stop_ringtone().await {
            if !e.is_benign() {
                warn!(error = %e, "ringtone reset failed");
            }
        }
        if let Err(e) = self.tones.play_ringtone().await {
            if !e.is_benign() {
                warn!(error = %e, "ringtone start failed");
            }
        }
        self.devices.process_event(DeviceEvent::AudioRinging).await;
        self.scene = AudioScene::Incoming;
    }

    async fn enter_call(&mut self, scene: AudioScene) {
        if let Err(e) = self.platform.set_audio_scene(AudioSceneMode::InCall).await {
            warn!(error = %e, "in-call scene set failed");
        }
        self.scene = scene;
    }

    async fn enter_holding(&mut self) {
        self.scene = AudioScene::Holding;
    }

    fn only_one_active(&self) -> bool {
        self.call_state.call_number(TelCallState::Active) == 1
    }

    /// Interpret a level event against the current scene
    async fn level_event(&mut self, event: AudioEvent) {
        use AudioEvent::*;
        use AudioScene::*;

        let next = match (self.scene, event) {
            (Inactive, NewDialingCall)
                if self.call_state.should_switch_state(TelCallState::Dialing) =>
            {
                Some(SwitchDialingState)
            }
            (Inactive, NewAlertingCall)
                if self.call_state.should_switch_state(TelCallState::Alerting) =>
            {
                Some(SwitchAlertingState)
            }
            (Inactive, NewIncomingCall)
                if self.call_state.should_switch_state(TelCallState::Incoming) =>
            {
                Some(SwitchIncomingState)
            }
            (Inactive | Dialing | Alerting | Incoming | Holding, NewActiveCsCall)
                if self.only_one_active() =>
            {
                Some(SwitchCsCallState)
            }
            (Inactive | Dialing | Alerting | Incoming | Holding, NewActiveImsCall)
                if self.only_one_active() =>
            {
                Some(SwitchImsCallState)
            }
            (Dialing, NewAlertingCall)
                if self.call_state.should_switch_state(TelCallState::Alerting) =>
            {
                Some(SwitchAlertingState)
            }
            (Dialing | Alerting, NewIncomingCall)
                if self.call_state.should_switch_state(TelCallState::Incoming) =>
            {
                Some(SwitchIncomingState)
            }
            (Holding, NewIncomingCall)
                if self.call_state.call_number(TelCallState::Incoming) == 1 =>
            {
                Some(SwitchIncomingState)
            }
            (CsCall | ImsCall, NewIncomingCall) => {
                if let Err(e) = self.tones.play_waiting_tone().await {
                    if !e.is_benign() {
                        warn!(error = %e, "waiting tone start failed");
                    }
                }
                None
            }
            (Dialing, NoMoreDialingCall)
            | (Alerting, NoMoreAlertingCall)
            | (Incoming, NoMoreIncomingCall)
            | (Holding, NoMoreHoldingCall)
            | (CsCall | ImsCall, NoMoreActiveCall) => {
                self.call_state.update_current_call_state();
                None
            }
            // An OTT call activates audio without a scene of its own
            (_, NewActiveOttCall) => {
                self.devices.process_event(DeviceEvent::AudioActivated).await;
                None
            }
            _ => None,
        };

        if let Some(request) = next {
            self.switch_state(request).await;
        }
    }
}
