// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Safety engine - single reaction loop over sensor, timer, and user events

use std::sync::Arc;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use anyhow::Result;
use tracing::{info, warn, error, debug};

use super::{Command, EngineHandle, EventBus, EventPayload};
use crate::config::Config;
use crate::emergency::{EmergencyState, EmergencyStateMachine, Trigger};
use crate::error::{SafetyError, SafetyResult};
use crate::incident::{IncidentKind, IncidentLog};
use crate::schedule::{ScheduleGate, SystemClock, WallClock};
use crate::sensors::{Detection, MonitorOutcome, SensorKind, SensorMonitor, SensorReading};
use crate::settings::SafetySettings;
use crate::sos::{
    ContactRegistry, DeniedLocationProvider, DispatchReport, FixedLocationProvider, LocationProvider,
    LogMessagingChannel, MessagingChannel, SosDispatcher,
};

/// External collaborators the engine talks to
#[derive(Clone)]
pub struct Services {
    /// Outbound SOS transport
    pub messenger: Arc<dyn MessagingChannel>,
    /// One-shot location fixes
    pub locator: Arc<dyn LocationProvider>,
    /// Time of day for the schedule
    pub clock: Arc<dyn WallClock>,
}

impl Services {
    /// Log-only messaging, config-provided location, system clock
    pub fn headless(config: &Config) -> Self {
        let locator: Arc<dyn LocationProvider> = match config.sos.location {
            Some(location) => Arc::new(FixedLocationProvider::new(location)),
            None => Arc::new(DeniedLocationProvider),
        };
        Self {
            messenger: Arc::new(LogMessagingChannel),
            locator,
            clock: Arc::new(SystemClock),
        }
    }
}

/// Owns the emergency state, the sensor monitors, and the countdown
pub struct Engine {
    config: Arc<Config>,
    commands: mpsc::UnboundedReceiver<Command>,
    handle: EngineHandle,
    core: EngineCore,
}

struct EngineCore {
    settings: Arc<RwLock<SafetySettings>>,
    contacts: ContactRegistry,
    log: IncidentLog,
    bus: Arc<EventBus>,
    state_tx: watch::Sender<EmergencyState>,
    machine: EmergencyStateMachine,
    sound: SensorMonitor,
    vibration: SensorMonitor,
    gate: ScheduleGate,
    dispatcher: SosDispatcher,
}

impl Engine {
    /// Validate `config` and wire the engine; nothing runs until [`Engine::run`]
    pub fn new(config: Config, services: Services) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let (command_tx, commands) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(EmergencyState::Idle);
        let settings = Arc::new(RwLock::new(SafetySettings::default()));
        let contacts = ContactRegistry::new();
        let log = IncidentLog::new();
        let bus = Arc::new(EventBus::new(config.engine.event_capacity));

        let dispatcher = SosDispatcher::new(
            config.sos.clone(),
            config.engine.location_timeout(),
            config.engine.send_timeout(),
            services.messenger,
            services.locator,
            log.clone(),
        );

        let core = EngineCore {
            settings: settings.clone(),
            contacts: contacts.clone(),
            log: log.clone(),
            bus: bus.clone(),
            state_tx,
            machine: EmergencyStateMachine::new(command_tx.clone()),
            sound: SensorMonitor::new(SensorKind::Sound, config.thresholds.for_kind(SensorKind::Sound)),
            vibration: SensorMonitor::new(SensorKind::Vibration, config.thresholds.for_kind(SensorKind::Vibration)),
            gate: ScheduleGate::new(services.clock),
            dispatcher,
        };

        let handle = EngineHandle {
            commands: command_tx,
            state: state_rx,
            settings,
            contacts,
            log,
            bus,
        };

        Ok(Self {
            config,
            commands,
            handle,
            core,
        })
    }

    /// A handle for the UI and sensor integrations
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Run until shutdown is signalled or requested through a handle
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let Engine { config, mut commands, handle, mut core } = self;
        // Commands are only sent by handles; keep ours from holding the queue open
        drop(handle);

        info!("Starting safety engine...");
        let mut schedule_check = interval(config.engine.schedule_check_interval());
        schedule_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Safety engine shutting down...");
                    break;
                }
                command = commands.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => {
                            info!("Safety engine shutting down...");
                            break;
                        }
                        Some(command) => core.handle(command).await,
                    }
                }
                _ = schedule_check.tick() => {
                    core.evaluate_schedule();
                }
            }
        }

        core.abort_episode();
        info!("Safety engine stopped");
        Ok(())
    }
}

impl EngineCore {
    async fn handle(&mut self, command: Command) {
        match command {
            Command::Sample(reading) => self.on_sample(reading),
            Command::SensorFailed { kind, reason } => self.on_sensor_failed(kind, &reason),
            Command::Tick { episode } => self.on_tick(episode).await,
            Command::SettingsChanged { schedule } => {
                if schedule {
                    self.evaluate_schedule();
                }
                self.sync_monitors();
            }
            Command::ResolveSafe { reply } => {
                let _ = reply.send(self.resolve_safe());
            }
            Command::SendNow { reply } => {
                let result = self.send_now().await;
                let _ = reply.send(result);
            }
            Command::ManualPanic { reply } => {
                let result = self.manual_panic().await;
                let _ = reply.send(result);
            }
            Command::Shutdown => {}
        }
    }

    fn publish_state(&self, state: EmergencyState) {
        self.state_tx.send_replace(state);
        self.bus.publish(EventPayload::StateChanged(state));
    }

    fn monitor_mut(&mut self, kind: SensorKind) -> &mut SensorMonitor {
        match kind {
            SensorKind::Sound => &mut self.sound,
            SensorKind::Vibration => &mut self.vibration,
        }
    }

    fn sync_monitors(&mut self) {
        let settings = self.settings.read().clone();
        for kind in [SensorKind::Sound, SensorKind::Vibration] {
            if let Some(status) = self.monitor_mut(kind).sync(&settings) {
                self.bus.publish(EventPayload::SensorStatus { kind, status, reason: None });
            }
        }
    }

    fn evaluate_schedule(&mut self) {
        let changed = {
            let mut settings = self.settings.write();
            self.gate.evaluate(&mut settings)
        };

        if let Some(enabled) = changed {
            info!("Monitoring {} by schedule", if enabled { "enabled" } else { "disabled" });
            self.bus.publish(EventPayload::MonitoringChanged { enabled, by_schedule: true });
            self.sync_monitors();
        }
    }

    fn on_sample(&mut self, reading: SensorReading) {
        let settings = self.settings.read().clone();
        let kind = reading.kind;
        let monitor = self.monitor_mut(kind);
        let before = monitor.status();
        let outcome = monitor.observe(reading.value, &settings);
        let after = monitor.status();

        if before != after {
            self.bus.publish(EventPayload::SensorStatus { kind, status: after, reason: None });
        }

        match outcome {
            MonitorOutcome::Detected(detection) | MonitorOutcome::RecoveredAndDetected(detection) => {
                self.on_detection(detection, &settings);
            }
            MonitorOutcome::Idle | MonitorOutcome::Recovered => {}
        }
    }

    fn on_sensor_failed(&mut self, kind: SensorKind, reason: &str) {
        if let Some(SafetyError::SensorUnavailable { reason, .. }) = self.monitor_mut(kind).mark_unavailable(reason) {
            let status = self.monitor_mut(kind).status();
            self.bus.publish(EventPayload::SensorStatus { kind, status, reason: Some(reason) });
        }
    }

    fn on_detection(&mut self, detection: Detection, settings: &SafetySettings) {
        if !self.machine.detect(detection.kind) {
            debug!("{} ignored: episode {} still active", detection.describe(), self.machine.episode());
            return;
        }

        let entry = self.log.append(detection.kind.into(), detection.describe(), Some(detection.level));
        info!("⚠️  {}", entry.details);
        self.bus.publish(EventPayload::IncidentLogged(entry));
        self.bus.publish(EventPayload::Detection(detection.clone()));
        self.publish_state(EmergencyState::Detected);
        self.bus.publish(EventPayload::Alarm {
            trigger: Trigger::Sensor(detection.kind),
            silent: settings.silent_mode,
        });

        match self.machine.start_countdown() {
            Ok(state) => self.publish_state(state),
            Err(e) => error!("Could not start countdown: {}", e),
        }
    }

    async fn on_tick(&mut self, episode: u64) {
        let Some(state) = self.machine.tick(episode) else {
            return;
        };
        self.publish_state(state);

        if state == EmergencyState::CountingDown(0) {
            match self.machine.expire() {
                Ok(trigger) => {
                    info!("Countdown expired for {}, sending SOS", trigger);
                    self.publish_state(EmergencyState::Sent);
                    if let Err(e) = self.dispatch().await {
                        warn!("Automatic SOS failed: {}", e);
                    }
                }
                Err(e) => error!("Countdown expiry rejected: {}", e),
            }
        }
    }

    fn resolve_safe(&mut self) -> SafetyResult<()> {
        let (trigger, remaining) = self.machine.resolve()?;
        self.publish_state(EmergencyState::Resolved);

        if let Trigger::Sensor(kind) = trigger {
            let details = format!("Marked safe by user with {}s remaining", remaining);
            let entry = self.log.append(IncidentKind::from(kind), details, None);
            self.bus.publish(EventPayload::IncidentLogged(entry));
        }

        info!("User confirmed safe, episode {} closed", self.machine.episode());
        self.finish();
        Ok(())
    }

    async fn send_now(&mut self) -> SafetyResult<DispatchReport> {
        let trigger = self.machine.send_now()?;
        info!("Send now requested during {}", trigger);
        self.publish_state(EmergencyState::Sent);
        self.dispatch().await
    }

    async fn manual_panic(&mut self) -> SafetyResult<DispatchReport> {
        let settings = self.settings.read().clone();
        let was_idle = self.machine.is_idle();
        let trigger = self.machine.panic()?;
        info!("🆘 Manual panic ({})", trigger);
        if was_idle {
            self.bus.publish(EventPayload::Alarm { trigger, silent: settings.silent_mode });
        }
        self.publish_state(EmergencyState::Sent);
        self.dispatch().await
    }

    /// Location-then-dispatch, and back to `Idle` whatever the outcome
    async fn dispatch(&mut self) -> SafetyResult<DispatchReport> {
        let contacts = self.contacts.list();
        let result = self.dispatcher.dispatch_with_location(&contacts).await;

        match &result {
            Ok(report) => {
                self.bus.publish(EventPayload::IncidentLogged(report.entry.clone()));
                self.bus.publish(EventPayload::Dispatched(report.clone()));
            }
            Err(e) => {
                error!("SOS dispatch failed: {}", e);
                self.bus.publish(EventPayload::DispatchFailed { reason: e.to_string() });
            }
        }

        self.finish();
        result
    }

    fn finish(&mut self) {
        match self.machine.finish() {
            Ok(state) => self.publish_state(state),
            Err(e) => error!("Could not close episode: {}", e),
        }
    }

    /// Cancel a running countdown on shutdown
    fn abort_episode(&mut self) {
        if self.machine.state().remaining().is_none() {
            return;
        }
        warn!("Shutting down during {}, countdown cancelled", self.machine.state());
        if self.machine.resolve().is_ok() {
            self.publish_state(EmergencyState::Resolved);
            self.finish();
        }
    }
}
