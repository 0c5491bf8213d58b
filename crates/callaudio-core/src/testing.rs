//! Test doubles for the platform seams
//!
//! Every collaborator trait has a recording double here so the state machine
//! can be driven end to end without hardware. Doubles log their actions into
//! a shared [`Recorder`] so tests can assert on ordering, and the renderer
//! double supports an injectable delay for queue-ordering tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::call::{CallAttributes, CallId, CallRegistry, TelCallState, VideoState};
use crate::device::AudioDeviceType;
use crate::distributed::{
    DistributedCallProxy, DistributedDeviceInfo, DistributedDeviceKind, SwitchDirection,
};
use crate::error::{CallAudioError, CallAudioResult};
use crate::platform::{
    AudioPlatform, AudioSceneMode, CallDialog, Renderer, RendererFactory, RingerMode, ToneKind,
};

/// Shared ordered action log
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, action: impl Into<String>) {
        self.0.lock().push(action.into());
    }

    /// Snapshot of everything recorded so far
    pub fn actions(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Drain the log
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn contains(&self, action: &str) -> bool {
        self.0.lock().iter().any(|a| a == action)
    }
}

/// Recording [`AudioPlatform`] double
pub struct MockPlatform {
    pub actions: Recorder,
    ringer_mode: Mutex<RingerMode>,
    mic_muted: AtomicBool,
    fail_sco: AtomicBool,
}

impl MockPlatform {
    pub fn new(actions: Recorder) -> Self {
        Self {
            actions,
            ringer_mode: Mutex::new(RingerMode::Normal),
            mic_muted: AtomicBool::new(false),
            fail_sco: AtomicBool::new(false),
        }
    }

    pub fn set_ringer_mode(&self, mode: RingerMode) {
        *self.ringer_mode.lock() = mode;
    }

    pub fn fail_sco_activation(&self, fail: bool) {
        self.fail_sco.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioPlatform for MockPlatform {
    fn ringer_mode(&self) -> RingerMode {
        *self.ringer_mode.lock()
    }

    async fn set_microphone_mute(&self, mute: bool) -> CallAudioResult<()> {
        self.mic_muted.store(mute, Ordering::SeqCst);
        self.actions.record(format!("mic-mute:{mute}"));
        Ok(())
    }

    fn is_microphone_muted(&self) -> bool {
        self.mic_muted.load(Ordering::SeqCst)
    }

    async fn start_vibration(&self) -> CallAudioResult<()> {
        self.actions.record("vibration:start");
        Ok(())
    }

    async fn stop_vibration(&self) -> CallAudioResult<()> {
        self.actions.record("vibration:stop");
        Ok(())
    }

    async fn set_audio_scene(&self, scene: AudioSceneMode) -> CallAudioResult<()> {
        self.actions.record(format!("scene:{scene:?}"));
        Ok(())
    }

    async fn set_volume_audible(&self) {
        self.actions.record("volume-audible");
    }

    async fn activate_bluetooth_sco(&self) -> CallAudioResult<()> {
        if self.fail_sco.load(Ordering::SeqCst) {
            return Err(CallAudioError::platform("sco activation refused"));
        }
        self.actions.record("sco:activate");
        Ok(())
    }

    async fn select_output(&self, device: AudioDeviceType) -> CallAudioResult<()> {
        self.actions.record(format!("output:{device}"));
        Ok(())
    }
}

/// Recording [`Renderer`] double with an optional play delay
pub struct MockRenderer {
    label: String,
    actions: Recorder,
    play_delay: Option<Duration>,
    fail_play: bool,
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn play(&self) -> CallAudioResult<()> {
        if let Some(delay) = self.play_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_play {
            return Err(CallAudioError::renderer("play", self.label.clone()));
        }
        self.actions.record(format!("play:{}", self.label));
        Ok(())
    }

    async fn stop(&self) -> CallAudioResult<()> {
        self.actions.record(format!("stop:{}", self.label));
        Ok(())
    }

    async fn mute(&self) -> CallAudioResult<()> {
        self.actions.record(format!("mute:{}", self.label));
        Ok(())
    }
}

/// Recording [`RendererFactory`] double
pub struct MockRendererFactory {
    pub actions: Recorder,
    play_delay: Mutex<Option<Duration>>,
    fail_play: AtomicBool,
}

impl MockRendererFactory {
    pub fn new(actions: Recorder) -> Self {
        Self {
            actions,
            play_delay: Mutex::new(None),
            fail_play: AtomicBool::new(false),
        }
    }

    /// Delay every subsequent renderer start by `delay`
    pub fn set_play_delay(&self, delay: Duration) {
        *self.play_delay.lock() = Some(delay);
    }

    pub fn fail_next_plays(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    fn renderer(&self, label: String) -> Arc<dyn Renderer> {
        Arc::new(MockRenderer {
            label,
            actions: self.actions.clone(),
            play_delay: *self.play_delay.lock(),
            fail_play: self.fail_play.load(Ordering::SeqCst),
        })
    }
}

impl RendererFactory for MockRendererFactory {
    fn ringtone(&self) -> Arc<dyn Renderer> {
        self.renderer("ringtone".to_string())
    }

    fn soundtone(&self) -> Arc<dyn Renderer> {
        self.renderer("soundtone".to_string())
    }

    fn tone(&self, kind: ToneKind) -> Arc<dyn Renderer> {
        self.renderer(format!("tone:{kind:?}"))
    }
}

/// In-memory [`CallRegistry`] double
#[derive(Default)]
pub struct MemoryCallRegistry {
    calls: DashMap<CallId, CallAttributes>,
}

impl MemoryCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, call: CallAttributes) {
        self.calls.insert(call.call_id, call);
    }

    pub fn remove(&self, call_id: CallId) {
        self.calls.remove(&call_id);
    }

    pub fn set_state(&self, call_id: CallId, state: TelCallState) {
        if let Some(mut call) = self.calls.get_mut(&call_id) {
            call.state = state;
        }
    }

    pub fn set_video_state(&self, call_id: CallId, video_state: VideoState) {
        if let Some(mut call) = self.calls.get_mut(&call_id) {
            call.video_state = video_state;
        }
    }
}

impl CallRegistry for MemoryCallRegistry {
    fn attributes(&self, call_id: CallId) -> Option<CallAttributes> {
        self.calls.get(&call_id).map(|c| c.clone())
    }

    fn set_muted(&self, call_id: CallId, muted: bool) {
        if let Some(mut call) = self.calls.get_mut(&call_id) {
            call.is_muted = muted;
        }
    }
}

/// Recording [`CallDialog`] double
#[derive(Default)]
pub struct MockDialog {
    prompts: Mutex<Vec<String>>,
}

impl MockDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl CallDialog for MockDialog {
    fn connect_prompt(&self, reason: &str) {
        self.prompts.lock().push(reason.to_string());
    }
}

/// Recording [`DistributedCallProxy`] double
pub struct MockDistributedProxy {
    pub actions: Recorder,
    infos: DashMap<String, DistributedDeviceInfo>,
    fail_switch: AtomicBool,
}

impl MockDistributedProxy {
    pub fn new(actions: Recorder) -> Self {
        Self {
            actions,
            infos: DashMap::new(),
            fail_switch: AtomicBool::new(false),
        }
    }

    pub fn publish(&self, dev_id: &str, dev_name: &str, kind: DistributedDeviceKind) {
        self.infos.insert(
            dev_id.to_string(),
            DistributedDeviceInfo {
                dev_name: dev_name.to_string(),
                kind,
            },
        );
    }

    pub fn fail_switches(&self, fail: bool) {
        self.fail_switch.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DistributedCallProxy for MockDistributedProxy {
    async fn device_info(&self, dev_id: &str) -> CallAudioResult<DistributedDeviceInfo> {
        self.infos
            .get(dev_id)
            .map(|i| i.clone())
            .ok_or_else(|| CallAudioError::distributed(format!("unknown device: {dev_id}")))
    }

    async fn switch_device(
        &self,
        dev_id: &str,
        direction: SwitchDirection,
    ) -> CallAudioResult<()> {
        if self.fail_switch.load(Ordering::SeqCst) {
            return Err(CallAudioError::distributed("switch refused"));
        }
        self.actions.record(format!("dcall-switch:{direction:?}:{dev_id}"));
        Ok(())
    }

    async fn online_device_ids(&self) -> CallAudioResult<Vec<String>> {
        Ok(self.infos.iter().map(|e| e.key().clone()).collect())
    }
}
