//! Audio output device arbitration
//!
//! [`AudioDeviceManager`] owns accessory connectivity flags and the candidate
//! device list, reacts to activation/connectivity events, and computes the
//! default route when audio comes up or an accessory changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::call::{CallRegistry, CallType, INVALID_CALL_ID};
use crate::control::{AudioInterruptState, InterruptStateHandle};
use crate::device::{AudioDevice, AudioDeviceType};
use crate::error::{CallAudioError, CallAudioResult};
use crate::platform::AudioPlatform;
use crate::state::CallStateProcessor;

/// Activation and connectivity events handled by the device manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    AudioActivated,
    AudioRinging,
    AudioDeactivated,
    InitAudioDevice,
    WiredHeadsetConnected,
    WiredHeadsetDisconnected,
    BluetoothScoConnected,
    BluetoothScoDisconnected,
}

/// Arbitrates which audio output carries call audio
pub struct AudioDeviceManager {
    platform: Arc<dyn AudioPlatform>,
    call_state: Arc<CallStateProcessor>,
    registry: Arc<dyn CallRegistry>,
    interrupt: InterruptStateHandle,

    audio_activated: AtomicBool,
    wired_headset_connected: AtomicBool,
    bt_sco_connected: AtomicBool,
    earpiece_available: AtomicBool,

    current_device: Mutex<AudioDeviceType>,
    /// Type of the distributed device currently carrying audio, if any
    connected_distributed: Mutex<Option<AudioDeviceType>>,
    /// Candidate devices the user can pick from
    devices: Mutex<Vec<AudioDevice>>,
}

impl AudioDeviceManager {
    pub fn new(
        platform: Arc<dyn AudioPlatform>,
        call_state: Arc<CallStateProcessor>,
        registry: Arc<dyn CallRegistry>,
        interrupt: InterruptStateHandle,
    ) -> Self {
        Self {
            platform,
            call_state,
            registry,
            interrupt,
            audio_activated: AtomicBool::new(false),
            wired_headset_connected: AtomicBool::new(false),
            bt_sco_connected: AtomicBool::new(false),
            earpiece_available: AtomicBool::new(true),
            current_device: Mutex::new(AudioDeviceType::Earpiece),
            connected_distributed: Mutex::new(None),
            devices: Mutex::new(vec![AudioDevice::earpiece(), AudioDevice::speaker()]),
        }
    }

    /// Handle an activation or connectivity event; returns whether it was
    /// applied cleanly
    pub async fn process_event(&self, event: DeviceEvent) -> bool {
        debug!(?event, "device event");
        let result = match event {
            DeviceEvent::AudioActivated | DeviceEvent::AudioRinging => {
                if self.audio_activated.swap(true, Ordering::SeqCst) {
                    Ok(())
                } else {
                    self.init_audio_device().await
                }
            }
            DeviceEvent::AudioDeactivated => {
                if self.audio_activated.swap(false, Ordering::SeqCst) {
                    self.init_audio_device().await
                } else {
                    Ok(())
                }
            }
            DeviceEvent::InitAudioDevice => self.init_audio_device().await,
            DeviceEvent::WiredHeadsetConnected => {
                self.wired_headset_connected.store(true, Ordering::SeqCst);
                self.add_audio_device(AudioDevice::wired_headset());
                self.reinit_if_active().await
            }
            DeviceEvent::WiredHeadsetDisconnected => {
                self.wired_headset_connected.store(false, Ordering::SeqCst);
                self.remove_audio_device(&AudioDevice::wired_headset());
                self.reinit_if_active().await
            }
            DeviceEvent::BluetoothScoConnected => {
                self.bt_sco_connected.store(true, Ordering::SeqCst);
                self.reinit_if_active().await
            }
            DeviceEvent::BluetoothScoDisconnected => {
                self.bt_sco_connected.store(false, Ordering::SeqCst);
                self.reinit_if_active().await
            }
        };
        if let Err(e) = result {
            warn!(?event, error = %e, "device event handling failed");
            return false;
        }
        true
    }

    async fn reinit_if_active(&self) -> CallAudioResult<()> {
        if self.audio_activated.load(Ordering::SeqCst) {
            self.init_audio_device().await
        } else {
            Ok(())
        }
    }

    /// Route to the device the current policy picks
    pub async fn init_audio_device(&self) -> CallAudioResult<()> {
        let device = self.init_audio_device_type();
        self.switch_device(device).await
    }

    /// The route the default policy picks right now
    ///
    /// Priority: disabled while audio is deactivated, then a connected
    /// distributed device, Bluetooth SCO, wired headset, speaker for
    /// video/satellite foreground calls, then earpiece (speaker when no
    /// earpiece exists).
    pub fn init_audio_device_type(&self) -> AudioDeviceType {
        if self.interrupt.get() == AudioInterruptState::Deactivated {
            return AudioDeviceType::Disabled;
        }
        if let Some(distributed) = *self.connected_distributed.lock() {
            return distributed;
        }
        if self.bt_sco_connected.load(Ordering::SeqCst) {
            return AudioDeviceType::BluetoothSco;
        }
        if self.wired_headset_connected.load(Ordering::SeqCst) {
            return AudioDeviceType::WiredHeadset;
        }
        let foreground = self.call_state.audio_foreground_live_call();
        if foreground != INVALID_CALL_ID {
            if let Some(call) = self.registry.attributes(foreground) {
                if call.video_state.is_video() || call.call_type == CallType::Satellite {
                    return AudioDeviceType::Speaker;
                }
            }
        }
        if self.earpiece_available.load(Ordering::SeqCst) {
            AudioDeviceType::Earpiece
        } else {
            AudioDeviceType::Speaker
        }
    }

    /// Activate the given route
    ///
    /// Local devices are validated against connectivity before the platform
    /// switch; distributed devices only update bookkeeping, the distributed
    /// manager performs the actual remote switch.
    pub async fn switch_device(&self, device: AudioDeviceType) -> CallAudioResult<()> {
        if device.is_distributed() {
            self.set_current_audio_device(device);
            info!(%device, "audio routed to distributed device");
            return Ok(());
        }
        let available = match device {
            AudioDeviceType::Earpiece => self.earpiece_available.load(Ordering::SeqCst),
            AudioDeviceType::Speaker | AudioDeviceType::Disabled => true,
            AudioDeviceType::WiredHeadset => self.wired_headset_connected.load(Ordering::SeqCst),
            AudioDeviceType::BluetoothSco => self.bt_sco_connected.load(Ordering::SeqCst),
            _ => false,
        };
        if !available {
            return Err(CallAudioError::SwitchFailed {
                device: device.to_string(),
            });
        }
        self.platform.select_output(device).await?;
        self.set_current_audio_device(device);
        info!(%device, "audio route switched");
        Ok(())
    }

    /// Record the current route; distributed types also mark the connected
    /// distributed device, local types clear it
    pub fn set_current_audio_device(&self, device: AudioDeviceType) {
        let mut connected = self.connected_distributed.lock();
        if device.is_distributed() {
            *connected = Some(device);
        } else {
            *connected = None;
        }
        drop(connected);
        *self.current_device.lock() = device;
    }

    pub fn current_audio_device(&self) -> AudioDeviceType {
        *self.current_device.lock()
    }

    pub fn is_audio_activated(&self) -> bool {
        self.audio_activated.load(Ordering::SeqCst)
    }

    pub fn is_wired_headset_connected(&self) -> bool {
        self.wired_headset_connected.load(Ordering::SeqCst)
    }

    pub fn is_bt_sco_connected(&self) -> bool {
        self.bt_sco_connected.load(Ordering::SeqCst)
    }

    pub fn is_earpiece_available(&self) -> bool {
        self.earpiece_available.load(Ordering::SeqCst)
    }

    /// True while a distributed device carries call audio
    pub fn is_distributed_call_connected(&self) -> bool {
        self.connected_distributed.lock().is_some()
    }

    /// True while any wired/Bluetooth accessory is connected
    pub fn is_accessory_connected(&self) -> bool {
        self.is_wired_headset_connected() || self.is_bt_sco_connected()
    }

    /// Add a candidate device; duplicates are no-ops
    ///
    /// A wired headset displaces the earpiece from the candidate list while
    /// connected; removing the last headset restores it.
    pub fn add_audio_device(&self, device: AudioDevice) {
        let mut devices = self.devices.lock();
        if devices.contains(&device) {
            return;
        }
        if device.device_type == AudioDeviceType::WiredHeadset {
            devices.retain(|d| d.device_type != AudioDeviceType::Earpiece);
            self.earpiece_available.store(false, Ordering::SeqCst);
        }
        debug!(%device, "candidate device added");
        devices.push(device);
    }

    /// Remove a candidate device; unknown devices are no-ops
    pub fn remove_audio_device(&self, device: &AudioDevice) {
        let mut devices = self.devices.lock();
        let before = devices.len();
        devices.retain(|d| d != device);
        if devices.len() == before {
            return;
        }
        debug!(%device, "candidate device removed");
        if device.device_type == AudioDeviceType::WiredHeadset
            && !devices
                .iter()
                .any(|d| d.device_type == AudioDeviceType::WiredHeadset)
        {
            self.earpiece_available.store(true, Ordering::SeqCst);
            if !devices
                .iter()
                .any(|d| d.device_type == AudioDeviceType::Earpiece)
            {
                devices.push(AudioDevice::earpiece());
            }
        }
    }

    /// Snapshot of the candidate device list
    pub fn device_list(&self) -> Vec<AudioDevice> {
        self.devices.lock().clone()
    }
}
