//! Shared audio-interrupt state
//!
//! Written by the control manager as call transitions arrive, read by the
//! device manager when the default-route policy runs.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Coarse audio activity the call service currently drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AudioInterruptState {
    Deactivated = 0,
    Ringing = 1,
    Activated = 2,
}

/// Cheap cloneable handle to the shared interrupt state
#[derive(Debug, Clone)]
pub struct InterruptStateHandle(Arc<AtomicU8>);

impl InterruptStateHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(AudioInterruptState::Deactivated as u8)))
    }

    pub fn set(&self, state: AudioInterruptState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    pub fn get(&self) -> AudioInterruptState {
        match self.0.load(Ordering::SeqCst) {
            1 => AudioInterruptState::Ringing,
            2 => AudioInterruptState::Activated,
            _ => AudioInterruptState::Deactivated,
        }
    }
}

impl Default for InterruptStateHandle {
    fn default() -> Self {
        Self::new()
    }
}
