// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration, Instant};

use super::*;
use crate::config::Config;
use crate::emergency::{EmergencyState, Trigger};
use crate::error::SafetyError;
use crate::incident::IncidentKind;
use crate::schedule::{FixedClock, TimeOfDay};
use crate::sensors::{MonitorStatus, SensorKind};
use crate::settings::SettingsUpdate;
use crate::sos::{
    ContactUpdate, DeniedLocationProvider, FixedLocationProvider, Location, LocationProvider, MessagingChannel,
    RecordingChannel,
};

struct Harness {
    handle: EngineHandle,
    events: broadcast::Receiver<Event>,
    channel: Arc<RecordingChannel>,
    clock: FixedClock,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    fn start(locator: Arc<dyn LocationProvider>) -> Self {
        let channel = Arc::new(RecordingChannel::new());
        Self::start_with(channel.clone(), channel, locator)
    }

    fn start_with(
        channel: Arc<RecordingChannel>,
        messenger: Arc<dyn MessagingChannel>,
        locator: Arc<dyn LocationProvider>,
    ) -> Self {
        let clock = FixedClock::new(t("12:00"));
        let services = Services {
            messenger,
            locator,
            clock: Arc::new(clock.clone()),
        };
        let engine = Engine::new(Config::default(), services).unwrap();
        let handle = engine.handle();
        let events = handle.subscribe();
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(engine.run(shutdown_rx));

        Self { handle, events, channel, clock, shutdown, task }
    }

    fn monitoring(locator: Arc<dyn LocationProvider>) -> Self {
        Self::start(locator).armed()
    }

    fn armed(self) -> Self {
        self.handle
            .update_settings(SettingsUpdate::default().monitoring(true).vibration(true))
            .unwrap();
        self
    }

    async fn next_event(&mut self) -> EventPayload {
        timeout(Duration::from_secs(120), self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event bus closed")
            .payload
    }

    async fn next_state(&mut self) -> EmergencyState {
        loop {
            if let EventPayload::StateChanged(state) = self.next_event().await {
                return state;
            }
        }
    }

    async fn states_until(&mut self, last: EmergencyState) -> Vec<EmergencyState> {
        let mut states = Vec::new();
        loop {
            let state = self.next_state().await;
            states.push(state);
            if state == last {
                return states;
            }
        }
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        self.task.await.unwrap().unwrap();
    }
}

/// Answers after three seconds, inside the location timeout
struct SlowLocationProvider;

#[async_trait]
impl LocationProvider for SlowLocationProvider {
    async fn current_location(&self) -> anyhow::Result<Location> {
        sleep(Duration::from_secs(3)).await;
        Ok(Location::new(48.8584, 2.2945))
    }
}

/// Transport whose send never completes
struct HangingChannel;

#[async_trait]
impl MessagingChannel for HangingChannel {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn send(&self, _recipient: &str, _body: &str) -> anyhow::Result<()> {
        std::future::pending().await
    }
}

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn loud() -> f64 {
    95.0
}

#[tokio::test(start_paused = true)]
async fn test_detection_reaches_countdown_in_one_step() {
    let mut h = Harness::monitoring(Arc::new(DeniedLocationProvider));
    h.handle.submit_sample(SensorKind::Sound, loud()).unwrap();

    let states = h.states_until(EmergencyState::CountingDown(10)).await;
    assert_eq!(states, vec![EmergencyState::Detected, EmergencyState::CountingDown(10)]);

    let incidents = h.handle.incidents();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].kind, IncidentKind::Sound);
    assert_eq!(incidents[0].level, Some(loud()));

    h.handle.resolve_safe().await.unwrap();
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_countdown_expiry_sends_sos() {
    let mut h = Harness::monitoring(Arc::new(DeniedLocationProvider));
    h.handle.add_contact("Mom", "+1555", "");
    h.handle.update_settings(SettingsUpdate::default().silent(true)).unwrap();

    let started = Instant::now();
    h.handle.submit_sample(SensorKind::Sound, loud()).unwrap();
    let states = h.states_until(EmergencyState::Idle).await;

    let mut expected = vec![EmergencyState::Detected];
    expected.extend((0..=10).rev().map(EmergencyState::CountingDown));
    expected.push(EmergencyState::Sent);
    expected.push(EmergencyState::Idle);
    assert_eq!(states, expected);

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));

    assert_eq!(h.channel.sent().len(), 1);
    assert_eq!(h.channel.sent()[0].recipient, "+1555");
    assert_eq!(h.handle.incidents().iter().filter(|e| e.kind == IncidentKind::Sos).count(), 1);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_silent_mode_still_raises_silent_alarm() {
    let mut h = Harness::monitoring(Arc::new(DeniedLocationProvider));
    h.handle.update_settings(SettingsUpdate::default().silent(true)).unwrap();
    h.handle.submit_sample(SensorKind::Sound, loud()).unwrap();

    loop {
        if let EventPayload::Alarm { trigger, silent } = h.next_event().await {
            assert_eq!(trigger, Trigger::Sensor(SensorKind::Sound));
            assert!(silent);
            break;
        }
    }
    h.handle.resolve_safe().await.unwrap();
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_resolve_safe_never_sends() {
    let mut h = Harness::monitoring(Arc::new(DeniedLocationProvider));
    h.handle.add_contact("Mom", "+1555", "");
    h.handle.submit_sample(SensorKind::Vibration, 30.0).unwrap();

    h.states_until(EmergencyState::CountingDown(7)).await;
    h.handle.resolve_safe().await.unwrap();
    assert_eq!(
        h.states_until(EmergencyState::Idle).await,
        vec![EmergencyState::Resolved, EmergencyState::Idle]
    );

    sleep(Duration::from_secs(15)).await;
    while let Ok(event) = h.events.try_recv() {
        assert!(!matches!(event.payload, EventPayload::StateChanged(_)), "late transition after resolve");
    }

    let incidents = h.handle.incidents();
    assert_eq!(incidents.len(), 2);
    assert!(incidents.iter().all(|e| e.kind == IncidentKind::Vibration));
    assert!(incidents[1].details.contains("7s remaining"));
    assert!(h.channel.sent().is_empty());
    assert_eq!(h.handle.state(), EmergencyState::Idle);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_send_now_includes_location() {
    let location = Location::new(51.5007, -0.1246);
    let mut h = Harness::monitoring(Arc::new(FixedLocationProvider::new(location)));
    h.handle.add_contact("Mom", "+1555", "");
    h.handle.add_contact("No phone", "", "np@example.com");
    h.handle.submit_sample(SensorKind::Sound, loud()).unwrap();
    h.states_until(EmergencyState::CountingDown(10)).await;

    let report = h.handle.send_now().await.unwrap();
    assert_eq!(report.location, Some(location));
    assert_eq!(report.skipped, 1);
    assert!(report.message.contains("51.500700,-0.124600"));
    assert_eq!(
        h.states_until(EmergencyState::Idle).await,
        vec![EmergencyState::Sent, EmergencyState::Idle]
    );
    assert_eq!(h.handle.incidents().iter().filter(|e| e.kind == IncidentKind::Sos).count(), 1);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_panic_from_idle() {
    let mut h = Harness::start(Arc::new(DeniedLocationProvider));
    h.handle.add_contact("Dad", "+1666", "");

    let report = h.handle.report_manual_panic().await.unwrap();
    assert!(report.location.is_none());
    assert_eq!(report.recipients, vec!["+1666".to_string()]);
    assert_eq!(
        h.states_until(EmergencyState::Idle).await,
        vec![EmergencyState::Sent, EmergencyState::Idle]
    );
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_usable_contacts_still_returns_to_idle() {
    let mut h = Harness::start(Arc::new(DeniedLocationProvider));
    h.handle.add_contact("Email only", "", "x@example.com");

    let err = h.handle.report_manual_panic().await.unwrap_err();
    assert_eq!(err, SafetyError::NoUsableContacts);
    assert_eq!(h.states_until(EmergencyState::Idle).await.last(), Some(&EmergencyState::Idle));
    assert_eq!(h.handle.incident_count(), 0);
    assert_eq!(h.handle.state(), EmergencyState::Idle);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_second_detector_is_ignored_during_episode() {
    let mut h = Harness::monitoring(Arc::new(DeniedLocationProvider));
    h.handle.submit_sample(SensorKind::Sound, loud()).unwrap();
    h.handle.submit_sample(SensorKind::Vibration, 30.0).unwrap();
    h.states_until(EmergencyState::CountingDown(9)).await;

    let incidents = h.handle.incidents();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].kind, IncidentKind::Sound);

    h.handle.resolve_safe().await.unwrap();
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_actions_without_emergency_are_rejected() {
    let h = Harness::start(Arc::new(DeniedLocationProvider));
    assert_eq!(h.handle.resolve_safe().await.unwrap_err(), SafetyError::NoActiveEmergency);
    assert_eq!(h.handle.send_now().await.unwrap_err(), SafetyError::NoActiveEmergency);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_disarmed_engine_ignores_loud_samples() {
    let h = Harness::start(Arc::new(DeniedLocationProvider));
    h.handle.submit_sample(SensorKind::Sound, 120.0).unwrap();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(h.handle.state(), EmergencyState::Idle);
    assert_eq!(h.handle.incident_count(), 0);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_sensor_failure_and_recovery() {
    let mut h = Harness::monitoring(Arc::new(DeniedLocationProvider));
    h.handle.report_sensor_failure(SensorKind::Sound, "microphone permission revoked").unwrap();

    loop {
        if let EventPayload::SensorStatus { kind: SensorKind::Sound, status: MonitorStatus::Unavailable, reason } =
            h.next_event().await
        {
            assert_eq!(reason.as_deref(), Some("microphone permission revoked"));
            break;
        }
    }

    h.handle.submit_sample(SensorKind::Sound, loud()).unwrap();
    loop {
        if let EventPayload::SensorStatus { kind: SensorKind::Sound, status, .. } = h.next_event().await {
            assert_eq!(status, MonitorStatus::Armed);
            break;
        }
    }
    assert_eq!(h.next_state().await, EmergencyState::Detected);
    h.handle.resolve_safe().await.unwrap();
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_schedule_window_drives_monitoring() {
    let mut h = Harness::start(Arc::new(DeniedLocationProvider));
    h.clock.set(t("23:00"));
    h.handle
        .update_settings(SettingsUpdate::default().schedule(true, "22:00", "06:00"))
        .unwrap();

    loop {
        if let EventPayload::MonitoringChanged { enabled, by_schedule } = h.next_event().await {
            assert!(enabled && by_schedule);
            break;
        }
    }
    assert!(h.handle.settings().monitoring_enabled);

    h.clock.set(t("07:00"));
    loop {
        if let EventPayload::MonitoringChanged { enabled, by_schedule } = h.next_event().await {
            assert!(!enabled && by_schedule);
            break;
        }
    }
    assert!(!h.handle.settings().monitoring_enabled);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_hanging_transport_does_not_stall_engine() {
    let channel = Arc::new(RecordingChannel::new());
    let mut h = Harness::start_with(channel, Arc::new(HangingChannel), Arc::new(DeniedLocationProvider)).armed();
    h.handle.add_contact("Mom", "+1555", "");

    let report = timeout(Duration::from_secs(60), h.handle.report_manual_panic())
        .await
        .expect("dispatch never finished")
        .unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(
        h.states_until(EmergencyState::Idle).await,
        vec![EmergencyState::Sent, EmergencyState::Idle]
    );

    h.handle.submit_sample(SensorKind::Sound, loud()).unwrap();
    assert_eq!(
        h.states_until(EmergencyState::CountingDown(10)).await,
        vec![EmergencyState::Detected, EmergencyState::CountingDown(10)]
    );
    h.handle.resolve_safe().await.unwrap();
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_detection_during_location_wait_runs_after_idle() {
    let mut h = Harness::monitoring(Arc::new(SlowLocationProvider));
    h.handle.add_contact("Mom", "+1555", "");

    let handle = h.handle.clone();
    let panic = tokio::spawn(async move { handle.report_manual_panic().await });

    sleep(Duration::from_millis(500)).await;
    h.handle.submit_sample(SensorKind::Sound, loud()).unwrap();

    assert_eq!(
        h.states_until(EmergencyState::CountingDown(10)).await,
        vec![
            EmergencyState::Sent,
            EmergencyState::Idle,
            EmergencyState::Detected,
            EmergencyState::CountingDown(10),
        ]
    );

    let report = panic.await.unwrap().unwrap();
    assert_eq!(report.location, Some(Location::new(48.8584, 2.2945)));
    assert!(h.channel.sent()[0].body.contains("48.858400,2.294500"));

    let kinds: Vec<IncidentKind> = h.handle.incidents().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![IncidentKind::Sos, IncidentKind::Sound]);

    h.handle.resolve_safe().await.unwrap();
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_contact_edits_reach_the_next_dispatch() {
    let h = Harness::start(Arc::new(DeniedLocationProvider));
    let mut state = h.handle.watch_state();
    let old = h.handle.add_contact("Old", "+1000", "");
    let kept = h.handle.add_contact("Kept", "", "");

    h.handle.update_contact(kept.id(), ContactUpdate::default().phone("+1222")).unwrap();
    h.handle.remove_contact(old.id()).unwrap();
    assert_eq!(h.handle.remove_contact(old.id()).unwrap_err(), SafetyError::NotFound(old.id().to_string()));

    let report = h.handle.report_manual_panic().await.unwrap();
    assert_eq!(report.recipients, vec!["+1222".to_string()]);
    assert_eq!(h.channel.sent()[0].recipient, "+1222");

    state.changed().await.unwrap();
    assert_eq!(*state.borrow_and_update(), EmergencyState::Idle);
    h.stop().await;
}
