//! Distributed call device management
//!
//! Tracks remote audio endpoints published by the companion distributed-call
//! service, switches call audio onto and off them, and keeps the local device
//! manager's candidate list in sync with what is online.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::device::{AudioDevice, AudioDeviceManager, AudioDeviceType, DeviceEvent};
use crate::error::{CallAudioError, CallAudioResult};

/// Kind of a remote endpoint as reported by the companion service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributedDeviceKind {
    Phone,
    Pad,
    Automotive,
}

impl DistributedDeviceKind {
    fn device_type(self) -> AudioDeviceType {
        match self {
            Self::Phone => AudioDeviceType::DistributedPhone,
            Self::Pad => AudioDeviceType::DistributedPad,
            Self::Automotive => AudioDeviceType::DistributedAutomotive,
        }
    }
}

/// Descriptor of one remote endpoint
#[derive(Debug, Clone)]
pub struct DistributedDeviceInfo {
    pub dev_name: String,
    pub kind: DistributedDeviceKind,
}

/// Direction of an audio handover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchDirection {
    /// Move call audio onto the remote endpoint
    ToDistributed,
    /// Bring call audio back to this device
    ToLocal,
}

/// Seam to the companion distributed-call service
#[async_trait]
pub trait DistributedCallProxy: Send + Sync {
    /// Look up the descriptor of an online endpoint
    async fn device_info(&self, dev_id: &str) -> CallAudioResult<DistributedDeviceInfo>;

    /// Hand call audio over in the given direction
    async fn switch_device(&self, dev_id: &str, direction: SwitchDirection) -> CallAudioResult<()>;

    /// Ids of endpoints currently online
    async fn online_device_ids(&self) -> CallAudioResult<Vec<String>>;
}

/// Device ids are user-linkable; log only head and tail
fn anonymize(dev_id: &str) -> String {
    let chars: Vec<char> = dev_id.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}***{tail}")
}

/// Manages remote audio endpoints and handovers
pub struct DistributedCallManager {
    proxy: Arc<dyn DistributedCallProxy>,
    devices: Arc<AudioDeviceManager>,

    online: Mutex<HashMap<String, AudioDevice>>,
    connected: Mutex<Option<AudioDevice>>,
    switched_on: AtomicBool,
    call_active: AtomicBool,
}

impl DistributedCallManager {
    pub fn new(proxy: Arc<dyn DistributedCallProxy>, devices: Arc<AudioDeviceManager>) -> Self {
        Self {
            proxy,
            devices,
            online: Mutex::new(HashMap::new()),
            connected: Mutex::new(None),
            switched_on: AtomicBool::new(false),
            call_active: AtomicBool::new(false),
        }
    }

    /// Record whether any call is currently active; automotive endpoints
    /// auto-attach only while this is set
    pub fn set_call_active(&self, active: bool) {
        self.call_active.store(active, Ordering::SeqCst);
    }

    /// Whether call audio currently lives on a remote endpoint
    pub fn is_switched_on(&self) -> bool {
        self.switched_on.load(Ordering::SeqCst)
    }

    /// The endpoint carrying audio, if any
    pub fn connected_device(&self) -> Option<AudioDevice> {
        self.connected.lock().clone()
    }

    /// Snapshot of online endpoints
    pub fn online_devices(&self) -> Vec<AudioDevice> {
        self.online.lock().values().cloned().collect()
    }

    /// A remote endpoint came online
    pub async fn on_device_online(self: &Arc<Self>, dev_id: &str) {
        let info = match self.proxy.device_info(dev_id).await {
            Ok(info) => info,
            Err(e) => {
                warn!(dev = %anonymize(dev_id), error = %e, "device info lookup failed");
                return;
            }
        };
        let device = AudioDevice::distributed(info.kind.device_type(), info.dev_name, dev_id);
        {
            let mut online = self.online.lock();
            if online.contains_key(dev_id) {
                debug!(dev = %anonymize(dev_id), "device already online");
                return;
            }
            online.insert(dev_id.to_string(), device.clone());
        }
        info!(dev = %anonymize(dev_id), kind = ?info.kind, "distributed device online");
        self.devices.add_audio_device(device.clone());

        // Automotive endpoints attach themselves when a call is up
        if info.kind == DistributedDeviceKind::Automotive
            && self.call_active.load(Ordering::SeqCst)
            && !self.is_switched_on()
        {
            if let Err(e) = self.switch_on_device_sync(&device).await {
                warn!(dev = %anonymize(dev_id), error = %e, "automotive auto-switch failed");
            }
        }
    }

    /// A remote endpoint went offline
    pub async fn on_device_offline(&self, dev_id: &str) {
        let removed = self.online.lock().remove(dev_id);
        let Some(device) = removed else {
            return;
        };
        info!(dev = %anonymize(dev_id), "distributed device offline");
        self.devices.remove_audio_device(&device);

        let was_connected = {
            let mut connected = self.connected.lock();
            let hit = connected
                .as_ref()
                .map(|c| c.address.distributed_dev_id() == dev_id)
                .unwrap_or(false);
            if hit {
                *connected = None;
            }
            hit
        };
        if was_connected {
            self.switched_on.store(false, Ordering::SeqCst);
            self.devices.process_event(DeviceEvent::InitAudioDevice).await;
        }
    }

    /// Hand audio over to the given endpoint, waiting for the result
    pub async fn switch_on_device_sync(&self, device: &AudioDevice) -> CallAudioResult<()> {
        let dev_id = device.address.distributed_dev_id();
        if dev_id.is_empty() {
            return Err(CallAudioError::invalid_argument(
                "distributed device without device id",
            ));
        }
        if self.switched_on.load(Ordering::SeqCst) {
            return Err(CallAudioError::already_in_state("distributed switch"));
        }
        self.proxy
            .switch_device(dev_id, SwitchDirection::ToDistributed)
            .await?;
        self.switched_on.store(true, Ordering::SeqCst);
        *self.connected.lock() = Some(device.clone());
        self.devices.switch_device(device.device_type).await?;
        info!(dev = %anonymize(dev_id), "call audio moved to distributed device");
        Ok(())
    }

    /// Hand audio over without waiting; failures are logged
    pub fn switch_on_device(self: &Arc<Self>, device: AudioDevice) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.switch_on_device_sync(&device).await {
                if !e.is_benign() {
                    warn!(error = %e, "distributed switch-on failed");
                }
            }
        });
    }

    /// Bring audio back to this device, waiting for the result
    pub async fn switch_off_device_sync(&self) -> CallAudioResult<()> {
        if !self.switched_on.load(Ordering::SeqCst) {
            return Ok(());
        }
        let dev_id = {
            let connected = self.connected.lock();
            connected
                .as_ref()
                .map(|c| c.address.distributed_dev_id().to_string())
                .unwrap_or_default()
        };
        if dev_id.is_empty() {
            self.switched_on.store(false, Ordering::SeqCst);
            return Err(CallAudioError::distributed("connected device has no id"));
        }
        self.proxy
            .switch_device(&dev_id, SwitchDirection::ToLocal)
            .await?;
        self.switched_on.store(false, Ordering::SeqCst);
        *self.connected.lock() = None;
        self.devices.process_event(DeviceEvent::InitAudioDevice).await;
        info!(dev = %anonymize(&dev_id), "call audio back on local device");
        Ok(())
    }

    /// Bring audio back without waiting; failures are logged
    pub fn switch_off_device(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.switch_off_device_sync().await {
                warn!(error = %e, "distributed switch-off failed");
            }
        });
    }

    /// All calls ended; release any remote routing
    pub async fn deal_disconnect_call(&self) {
        self.set_call_active(false);
        if self.is_switched_on() {
            if let Err(e) = self.switch_off_device_sync().await {
                warn!(error = %e, "switch-off on disconnect failed");
            }
        }
    }

    /// Companion service came up; import its online endpoints
    pub async fn on_service_connected(self: &Arc<Self>) {
        match self.proxy.online_device_ids().await {
            Ok(ids) => {
                for id in ids {
                    self.on_device_online(&id).await;
                }
            }
            Err(e) => warn!(error = %e, "online device enumeration failed"),
        }
    }

    /// Companion service died; drop everything and restore local routing
    pub async fn on_service_died(&self) {
        let devices: Vec<AudioDevice> = {
            let mut online = self.online.lock();
            online.drain().map(|(_, d)| d).collect()
        };
        for device in &devices {
            self.devices.remove_audio_device(device);
        }
        let was_switched_on = self.switched_on.swap(false, Ordering::SeqCst);
        *self.connected.lock() = None;
        if was_switched_on || !devices.is_empty() {
            self.devices.process_event(DeviceEvent::InitAudioDevice).await;
        }
        warn!("distributed call service unavailable, registry cleared");
    }
}
