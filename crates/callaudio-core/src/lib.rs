//! # callaudio-core
//!
//! Call-state and audio-routing core for a telephony call service.
//!
//! The crate tracks which calls are in which telephony state, drives an
//! audio scene state machine (ringtone, ringback, soundtone, in-call) over a
//! strictly ordered single-consumer queue, arbitrates the active output
//! device across local accessories and distributed (remote) endpoints, and
//! exposes the mute/tone/device-selection API the rest of the service calls.
//!
//! ## Architecture
//!
//! - [`control::AudioControlManager`] — orchestrator; consumes call
//!   lifecycle callbacks and owns the public audio API
//! - [`state::CallStateProcessor`] — per-state call id bookkeeping
//! - [`scene`] — the scene state machine and its worker task
//! - [`tone::CallTones`] — ringtone/soundtone/short-tone players
//! - [`device::AudioDeviceManager`] — output device arbitration
//! - [`distributed::DistributedCallManager`] — remote endpoint handovers
//! - [`context::AudioServiceContext`] — one-shot wiring at service start
//!
//! The host service supplies the platform seams in [`platform`] (audio HAL
//! facade, renderer factory, user dialog) plus a call registry and a
//! distributed-call proxy; recording doubles for all of them live in
//! [`testing`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use callaudio_core::context::{AudioServiceContext, ExternalServices};
//! use callaudio_core::testing::{
//!     MemoryCallRegistry, MockDialog, MockDistributedProxy, MockPlatform,
//!     MockRendererFactory, Recorder,
//! };
//!
//! # #[tokio::main] async fn main() {
//! let actions = Recorder::new();
//! let context = AudioServiceContext::new(ExternalServices {
//!     registry: Arc::new(MemoryCallRegistry::new()),
//!     platform: Arc::new(MockPlatform::new(actions.clone())),
//!     renderers: Arc::new(MockRendererFactory::new(actions.clone())),
//!     dialog: Arc::new(MockDialog::new()),
//!     distributed: Arc::new(MockDistributedProxy::new(actions.clone())),
//! });
//! let _control = context.control();
//! # }
//! ```

pub mod call;
pub mod context;
pub mod control;
pub mod device;
pub mod distributed;
pub mod error;
pub mod platform;
pub mod scene;
pub mod state;
pub mod testing;
pub mod tone;

pub use call::{
    CallAttributes, CallEndedKind, CallId, CallRegistry, CallStateListener, CallType, CrsType,
    TelCallState, VideoState, INVALID_CALL_ID,
};
pub use context::{AudioServiceContext, ExternalServices};
pub use control::{AudioControlManager, AudioInterruptState, InterruptStateHandle};
pub use device::{
    AudioDevice, AudioDeviceManager, AudioDeviceType, DeviceAddress, DeviceEvent,
    DistributedDeviceId,
};
pub use distributed::{
    DistributedCallManager, DistributedCallProxy, DistributedDeviceInfo, DistributedDeviceKind,
    SwitchDirection,
};
pub use error::{CallAudioError, CallAudioResult};
pub use platform::{
    AudioPlatform, AudioSceneMode, CallDialog, Renderer, RendererFactory, RingerMode, ToneKind,
};
pub use scene::{AudioEvent, AudioScene, AudioSceneProcessor, SceneWorker};
pub use state::CallStateProcessor;
pub use tone::CallTones;
