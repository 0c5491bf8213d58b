//! Call lifecycle flows through the whole core

mod common;

use callaudio_core::{
    AudioDevice, AudioDeviceType, AudioInterruptState, CallAudioError, CallEndedKind,
    CallRegistry, CallStateListener, CallType, TelCallState, VideoState,
};
use common::{call, harness, position, settle};

#[tokio::test]
async fn cs_call_lifecycle_drives_scenes_and_tones() {
    let h = harness();
    let control = h.context.control().clone();
    let mut c1 = call(1, CallType::CircuitSwitched);

    c1.state = TelCallState::Dialing;
    h.registry.insert(c1.clone());
    control.new_call_created(&c1).await;
    control
        .call_state_updated(&c1, TelCallState::Idle, TelCallState::Dialing)
        .await;
    assert_eq!(h.context.call_state().call_number(TelCallState::Dialing), 1);
    assert_eq!(control.audio_interrupt_state(), AudioInterruptState::Ringing);
    settle().await;
    let actions = h.actions.actions();
    assert!(actions.contains(&"play:soundtone".to_string()));
    assert!(actions.contains(&"output:earpiece".to_string()));

    c1.state = TelCallState::Alerting;
    h.registry.set_state(1, TelCallState::Alerting);
    control
        .call_state_updated(&c1, TelCallState::Dialing, TelCallState::Alerting)
        .await;
    assert_eq!(h.context.call_state().call_number(TelCallState::Dialing), 0);
    assert_eq!(h.context.call_state().call_number(TelCallState::Alerting), 1);
    settle().await;
    let actions = h.actions.actions();
    assert!(actions.contains(&"stop:soundtone".to_string()));
    assert!(position(&actions, "play:soundtone") < position(&actions, "play:tone:RingbackTone"));

    c1.state = TelCallState::Active;
    h.registry.set_state(1, TelCallState::Active);
    control
        .call_state_updated(&c1, TelCallState::Alerting, TelCallState::Active)
        .await;
    assert_eq!(h.context.call_state().call_number(TelCallState::Alerting), 0);
    assert_eq!(h.context.call_state().call_number(TelCallState::Active), 1);
    assert_eq!(
        control.audio_interrupt_state(),
        AudioInterruptState::Activated
    );
    settle().await;
    let actions = h.actions.actions();
    assert!(actions.contains(&"stop:tone:RingbackTone".to_string()));
    assert!(actions.contains(&"scene:InCall".to_string()));

    c1.state = TelCallState::Disconnected;
    c1.ended = CallEndedKind::Normally;
    control
        .call_state_updated(&c1, TelCallState::Active, TelCallState::Disconnected)
        .await;
    assert_eq!(h.context.call_state().call_number(TelCallState::Active), 0);
    assert_eq!(
        control.audio_interrupt_state(),
        AudioInterruptState::Deactivated
    );
    settle().await;
    let actions = h.actions.actions();
    assert!(actions.contains(&"play:tone:FinishedTone".to_string()));
    assert!(actions.contains(&"scene:Default".to_string()));
    assert!(actions.contains(&"output:disabled".to_string()));
}

#[tokio::test]
async fn ringback_plays_again_after_an_earlier_call_disconnected() {
    let h = harness();
    let control = h.context.control().clone();

    let mut c1 = call(1, CallType::CircuitSwitched);
    c1.state = TelCallState::Dialing;
    h.registry.insert(c1.clone());
    control.new_call_created(&c1).await;
    control
        .call_state_updated(&c1, TelCallState::Idle, TelCallState::Dialing)
        .await;
    settle().await;
    c1.state = TelCallState::Active;
    h.registry.set_state(1, TelCallState::Active);
    control
        .call_state_updated(&c1, TelCallState::Dialing, TelCallState::Active)
        .await;
    settle().await;
    c1.state = TelCallState::Disconnected;
    c1.ended = CallEndedKind::Normally;
    control
        .call_state_updated(&c1, TelCallState::Active, TelCallState::Disconnected)
        .await;
    settle().await;
    assert!(h.actions.contains("play:tone:FinishedTone"));
    h.actions.take();

    // the ended tone must not keep the tone slot hostage
    let mut c2 = call(2, CallType::CircuitSwitched);
    c2.state = TelCallState::Dialing;
    h.registry.insert(c2.clone());
    control.new_call_created(&c2).await;
    control
        .call_state_updated(&c2, TelCallState::Idle, TelCallState::Dialing)
        .await;
    settle().await;
    c2.state = TelCallState::Alerting;
    h.registry.set_state(2, TelCallState::Alerting);
    control
        .call_state_updated(&c2, TelCallState::Dialing, TelCallState::Alerting)
        .await;
    settle().await;
    assert!(h.actions.contains("play:tone:RingbackTone"));
}

#[tokio::test]
async fn answering_mutes_ringer_without_scene_change() {
    let h = harness();
    let control = h.context.control().clone();
    let mut c1 = call(1, CallType::Ims);

    c1.state = TelCallState::Incoming;
    h.registry.insert(c1.clone());
    control.new_call_created(&c1).await;
    control
        .call_state_updated(&c1, TelCallState::Idle, TelCallState::Incoming)
        .await;
    settle().await;
    assert!(h.actions.contains("play:ringtone"));
    h.actions.take();

    c1.state = TelCallState::Answered;
    h.registry.set_state(1, TelCallState::Answered);
    control
        .call_state_updated(&c1, TelCallState::Incoming, TelCallState::Answered)
        .await;
    assert_eq!(h.context.call_state().call_number(TelCallState::Incoming), 0);
    settle().await;
    let actions = h.actions.actions();
    assert!(actions.contains(&"mute:ringtone".to_string()));
    // no renderer restart and no scene movement
    assert!(actions.iter().all(|a| !a.starts_with("play:")));
    assert!(actions.iter().all(|a| !a.starts_with("scene:")));

    // the muted renderer is still held; a later stop applies
    control.stop_ringtone().await.unwrap();
    assert!(h.actions.contains("stop:ringtone"));
}

#[tokio::test]
async fn earpiece_rejected_during_satellite_call() {
    let h = harness();
    let control = h.context.control().clone();
    let mut c1 = call(1, CallType::Satellite);
    c1.state = TelCallState::Active;
    h.registry.insert(c1.clone());
    control.new_call_created(&c1).await;

    let err = control
        .set_audio_device(&AudioDevice::earpiece(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, CallAudioError::PolicyRejected { .. }));
    assert_eq!(
        h.dialog.prompts(),
        vec!["satellite_call_earpiece_unsupported".to_string()]
    );
    assert!(!h.actions.contains("output:earpiece"));

    control
        .set_audio_device(&AudioDevice::speaker(), false)
        .await
        .unwrap();
    assert!(h.actions.contains("output:speaker"));
}

#[tokio::test]
async fn video_call_defaults_to_speaker() {
    let h = harness();
    let control = h.context.control().clone();
    let mut c1 = call(1, CallType::Ims);
    c1.state = TelCallState::Active;
    c1.video_state = VideoState::Bidirectional;
    h.registry.insert(c1.clone());
    control.new_call_created(&c1).await;
    control
        .call_state_updated(&c1, TelCallState::Idle, TelCallState::Active)
        .await;

    // earpiece is physically available, but the foreground call carries video
    assert_eq!(
        control.get_init_audio_device_type(),
        AudioDeviceType::Speaker
    );
}

#[tokio::test]
async fn mute_refused_without_calls_and_forced_off_for_emergency() {
    let h = harness();
    let control = h.context.control().clone();
    assert!(matches!(
        control.set_mute(true).await.unwrap_err(),
        CallAudioError::NoCallExists
    ));

    let mut c1 = call(1, CallType::CircuitSwitched);
    c1.state = TelCallState::Active;
    c1.is_emergency = true;
    h.registry.insert(c1.clone());
    control.new_call_created(&c1).await;
    control
        .call_state_updated(&c1, TelCallState::Idle, TelCallState::Active)
        .await;

    control.set_mute(true).await.unwrap();
    assert!(h.actions.contains("mic-mute:false"));
    assert!(!h.registry.attributes(1).unwrap().is_muted);
}

#[tokio::test]
async fn second_incoming_call_plays_waiting_tone() {
    let h = harness();
    let control = h.context.control().clone();
    let mut c1 = call(1, CallType::CircuitSwitched);
    c1.state = TelCallState::Active;
    h.registry.insert(c1.clone());
    control.new_call_created(&c1).await;
    control
        .call_state_updated(&c1, TelCallState::Idle, TelCallState::Active)
        .await;
    settle().await;
    h.actions.take();

    let mut c2 = call(2, CallType::CircuitSwitched);
    c2.state = TelCallState::Waiting;
    h.registry.insert(c2.clone());
    control.new_call_created(&c2).await;
    control
        .call_state_updated(&c2, TelCallState::Idle, TelCallState::Waiting)
        .await;
    settle().await;
    let actions = h.actions.actions();
    assert!(actions.contains(&"play:tone:WaitingTone".to_string()));
    assert!(!actions.contains(&"play:ringtone".to_string()));
}

#[tokio::test]
async fn dtmf_digit_is_played_then_stopped() {
    let h = harness();
    let control = h.context.control().clone();
    control.play_dtmf_tone('5').await.unwrap();
    let actions = h.actions.actions();
    assert!(
        position(&actions, "play:tone:Dtmf('5')") < position(&actions, "stop:tone:Dtmf('5')")
    );

    assert!(matches!(
        control.play_dtmf_tone('x').await.unwrap_err(),
        CallAudioError::InvalidArgument { .. }
    ));
}

#[tokio::test]
async fn hangup_of_unknown_call_leaves_the_ringing_call_alone() {
    let h = harness();
    let control = h.context.control().clone();
    let mut c1 = call(1, CallType::Ims);
    c1.state = TelCallState::Incoming;
    h.registry.insert(c1.clone());
    control.new_call_created(&c1).await;
    control
        .call_state_updated(&c1, TelCallState::Idle, TelCallState::Incoming)
        .await;
    settle().await;
    h.actions.take();

    let c2 = call(2, CallType::Ims);
    control.incoming_call_hung_up(&c2, false, "").await;
    assert!(!h.actions.contains("stop:ringtone"));
    assert_eq!(h.context.call_state().call_number(TelCallState::Incoming), 1);
}

#[tokio::test]
async fn incoming_call_activated_stops_ringtone_and_unmutes() {
    let h = harness();
    let control = h.context.control().clone();
    let mut c1 = call(1, CallType::Ims);
    c1.state = TelCallState::Incoming;
    c1.is_muted = true;
    h.registry.insert(c1.clone());
    control.new_call_created(&c1).await;
    control
        .call_state_updated(&c1, TelCallState::Idle, TelCallState::Incoming)
        .await;
    settle().await;
    h.actions.take();

    control.incoming_call_activated(&c1).await;
    assert_eq!(h.context.call_state().call_number(TelCallState::Incoming), 0);
    assert!(h.actions.contains("stop:ringtone"));
    assert!(h.actions.contains("mic-mute:false"));
    assert!(!h.registry.attributes(1).unwrap().is_muted);
}
