//! Shared harness for integration tests

use std::sync::Arc;
use std::time::Duration;

use callaudio_core::context::{AudioServiceContext, ExternalServices};
use callaudio_core::testing::{
    MemoryCallRegistry, MockDialog, MockDistributedProxy, MockPlatform, MockRendererFactory,
    Recorder,
};
use callaudio_core::{CallAttributes, CallId, CallType};

pub struct Harness {
    pub context: AudioServiceContext,
    pub registry: Arc<MemoryCallRegistry>,
    pub platform: Arc<MockPlatform>,
    pub factory: Arc<MockRendererFactory>,
    pub dialog: Arc<MockDialog>,
    pub proxy: Arc<MockDistributedProxy>,
    pub actions: Recorder,
}

pub fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let actions = Recorder::new();
    let registry = Arc::new(MemoryCallRegistry::new());
    let platform = Arc::new(MockPlatform::new(actions.clone()));
    let factory = Arc::new(MockRendererFactory::new(actions.clone()));
    let dialog = Arc::new(MockDialog::new());
    let proxy = Arc::new(MockDistributedProxy::new(actions.clone()));
    let context = AudioServiceContext::new(ExternalServices {
        registry: registry.clone(),
        platform: platform.clone(),
        renderers: factory.clone(),
        dialog: dialog.clone(),
        distributed: proxy.clone(),
    });
    Harness {
        context,
        registry,
        platform,
        factory,
        dialog,
        proxy,
        actions,
    }
}

/// Let the scene worker drain its queue
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub fn call(call_id: CallId, call_type: CallType) -> CallAttributes {
    CallAttributes::voice(call_id, call_type)
}

/// Index of the first action equal to `needle`, panicking when absent
pub fn position(actions: &[String], needle: &str) -> usize {
    actions
        .iter()
        .position(|a| a == needle)
        .unwrap_or_else(|| panic!("action {needle:?} not found in {actions:?}"))
}
