//! Service wiring
//!
//! [`AudioServiceContext`] constructs the whole audio core once at service
//! start and owns the scene worker task. Components receive their
//! collaborators explicitly; there are no global instances.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::call::CallRegistry;
use crate::control::{AudioControlManager, InterruptStateHandle};
use crate::device::AudioDeviceManager;
use crate::distributed::{DistributedCallManager, DistributedCallProxy};
use crate::platform::{AudioPlatform, CallDialog, RendererFactory};
use crate::scene::{AudioSceneProcessor, SceneWorker};
use crate::state::CallStateProcessor;
use crate::tone::CallTones;

/// The collaborators the host service must supply
pub struct ExternalServices {
    pub registry: Arc<dyn CallRegistry>,
    pub platform: Arc<dyn AudioPlatform>,
    pub renderers: Arc<dyn RendererFactory>,
    pub dialog: Arc<dyn CallDialog>,
    pub distributed: Arc<dyn DistributedCallProxy>,
}

/// Owns one fully wired audio core instance
pub struct AudioServiceContext {
    control: Arc<AudioControlManager>,
    call_state: Arc<CallStateProcessor>,
    devices: Arc<AudioDeviceManager>,
    tones: Arc<CallTones>,
    distributed: Arc<DistributedCallManager>,
    scene: AudioSceneProcessor,
    worker: JoinHandle<()>,
}

impl AudioServiceContext {
    /// Wire the core and spawn the scene worker
    ///
    /// Must run inside a tokio runtime.
    pub fn new(services: ExternalServices) -> Self {
        let ExternalServices {
            registry,
            platform,
            renderers,
            dialog,
            distributed: proxy,
        } = services;

        let (scene, scene_rx) = AudioSceneProcessor::channel();
        let interrupt = InterruptStateHandle::new();
        let call_state = Arc::new(CallStateProcessor::new(scene.clone()));
        let devices = Arc::new(AudioDeviceManager::new(
            Arc::clone(&platform),
            Arc::clone(&call_state),
            Arc::clone(&registry),
            interrupt.clone(),
        ));
        let tones = Arc::new(CallTones::new(
            renderers,
            Arc::clone(&platform),
            Arc::clone(&registry),
            Arc::clone(&call_state),
            Arc::clone(&devices),
        ));
        let distributed = Arc::new(DistributedCallManager::new(proxy, Arc::clone(&devices)));
        let control = Arc::new(AudioControlManager::new(
            registry,
            Arc::clone(&platform),
            dialog,
            Arc::clone(&call_state),
            scene.clone(),
            Arc::clone(&devices),
            Arc::clone(&tones),
            Arc::clone(&distributed),
            interrupt,
        ));

        let worker = SceneWorker::new(
            Arc::clone(&call_state),
            Arc::clone(&devices),
            Arc::clone(&tones),
            platform,
        );
        let worker = tokio::spawn(worker.run(scene_rx));

        Self {
            control,
            call_state,
            devices,
            tones,
            distributed,
            scene,
            worker,
        }
    }

    pub fn control(&self) -> &Arc<AudioControlManager> {
        &self.control
    }

    pub fn call_state(&self) -> &Arc<CallStateProcessor> {
        &self.call_state
    }

    pub fn devices(&self) -> &Arc<AudioDeviceManager> {
        &self.devices
    }

    pub fn tones(&self) -> &Arc<CallTones> {
        &self.tones
    }

    pub fn distributed(&self) -> &Arc<DistributedCallManager> {
        &self.distributed
    }

    pub fn scene(&self) -> &AudioSceneProcessor {
        &self.scene
    }

    /// Stop the scene worker; queued transitions that have not started are
    /// dropped
    pub fn shutdown(self) {
        self.worker.abort();
    }
}
