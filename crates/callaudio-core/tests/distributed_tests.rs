//! Distributed endpoint lifecycle and handover behavior

mod common;

use callaudio_core::{
    AudioDevice, AudioDeviceType, CallAudioError, DistributedDeviceKind,
};
use common::harness;

fn pad_device() -> AudioDevice {
    AudioDevice::distributed(AudioDeviceType::DistributedPad, "pad", "deviceAAA111")
}

#[tokio::test]
async fn online_device_becomes_a_candidate_and_carries_audio() {
    let h = harness();
    let distributed = h.context.distributed().clone();
    h.proxy.publish("deviceAAA111", "pad", DistributedDeviceKind::Pad);

    distributed.on_device_online("deviceAAA111").await;
    assert!(h
        .context
        .devices()
        .device_list()
        .iter()
        .any(|d| d.device_type == AudioDeviceType::DistributedPad));

    h.context
        .control()
        .set_audio_device(&pad_device(), true)
        .await
        .unwrap();
    assert!(distributed.is_switched_on());
    assert_eq!(
        h.context.devices().current_audio_device(),
        AudioDeviceType::DistributedPad
    );
    assert!(h
        .actions
        .contains("dcall-switch:ToDistributed:deviceAAA111"));
}

#[tokio::test]
async fn local_selection_relinquishes_distributed_device_first() {
    let h = harness();
    let distributed = h.context.distributed().clone();
    h.proxy.publish("deviceAAA111", "pad", DistributedDeviceKind::Pad);
    distributed.on_device_online("deviceAAA111").await;
    h.context
        .control()
        .set_audio_device(&pad_device(), true)
        .await
        .unwrap();

    h.context
        .control()
        .set_audio_device(&AudioDevice::speaker(), true)
        .await
        .unwrap();
    assert!(!distributed.is_switched_on());
    let actions = h.actions.actions();
    let off = common::position(&actions, "dcall-switch:ToLocal:deviceAAA111");
    let local = common::position(&actions, "output:speaker");
    assert!(off < local);
}

#[tokio::test]
async fn offline_of_connected_device_restores_local_route() {
    let h = harness();
    let distributed = h.context.distributed().clone();
    h.proxy.publish("deviceAAA111", "pad", DistributedDeviceKind::Pad);
    distributed.on_device_online("deviceAAA111").await;
    h.context
        .control()
        .set_audio_device(&pad_device(), true)
        .await
        .unwrap();

    distributed.on_device_offline("deviceAAA111").await;
    assert!(!distributed.is_switched_on());
    assert!(distributed.connected_device().is_none());
    // no call is up, so the restored local route is the disabled one
    assert_eq!(
        h.context.devices().current_audio_device(),
        AudioDeviceType::Disabled
    );
}

#[tokio::test]
async fn automotive_endpoint_auto_attaches_during_active_call() {
    let h = harness();
    let distributed = h.context.distributed().clone();
    h.proxy
        .publish("carHU000999", "head-unit", DistributedDeviceKind::Automotive);

    // without an active call nothing happens
    distributed.on_device_online("carHU000999").await;
    assert!(!distributed.is_switched_on());
    distributed.on_device_offline("carHU000999").await;

    distributed.set_call_active(true);
    distributed.on_device_online("carHU000999").await;
    assert!(distributed.is_switched_on());
    assert!(h.actions.contains("dcall-switch:ToDistributed:carHU000999"));
}

#[tokio::test]
async fn distributed_device_without_id_is_rejected() {
    let h = harness();
    let bogus = AudioDevice::new(AudioDeviceType::DistributedPad);
    let err = h
        .context
        .control()
        .set_audio_device(&bogus, true)
        .await
        .unwrap_err();
    assert!(matches!(err, CallAudioError::InvalidArgument { .. }));
}

#[tokio::test]
async fn failed_handover_leaves_no_partial_state() {
    let h = harness();
    let distributed = h.context.distributed().clone();
    h.proxy.publish("deviceAAA111", "pad", DistributedDeviceKind::Pad);
    distributed.on_device_online("deviceAAA111").await;
    h.proxy.fail_switches(true);

    assert!(distributed
        .switch_on_device_sync(&pad_device())
        .await
        .is_err());
    assert!(!distributed.is_switched_on());
    assert!(distributed.connected_device().is_none());
}

#[tokio::test]
async fn service_death_clears_registry_and_candidates() {
    let h = harness();
    let distributed = h.context.distributed().clone();
    h.proxy.publish("deviceAAA111", "pad", DistributedDeviceKind::Pad);
    h.proxy
        .publish("deviceBBB222", "phone", DistributedDeviceKind::Phone);
    distributed.on_service_connected().await;
    assert_eq!(distributed.online_devices().len(), 2);

    distributed.on_service_died().await;
    assert!(distributed.online_devices().is_empty());
    assert!(!distributed.is_switched_on());
    assert!(!h
        .context
        .devices()
        .device_list()
        .iter()
        .any(|d| d.device_type.is_distributed()));
}
