use std::time::Duration;

use luminary_rt::{Fired, Scheduler, TimerSlot};

use crate::device::{negotiate, Actuator, Capability, HapticDescriptor, RumbleEffect};
use crate::error::HapticError;
use crate::hub::DeviceEvent;
use crate::pattern::{beat_interval, HapticPattern, PatternParams, HEARTBEAT_ECHO_DELAY};

/// Timers the haptic engine schedules on its owner's scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HapticTimer {
    /// Repeating pulse of DEFAULT, WAVE and CRYSTAL.
    Pulse,
    /// Self-rescheduling primary beat of HEARTBEAT.
    Beat,
    /// Secondary thump that trails each beat.
    Echo,
}

struct ActiveDevice {
    descriptor: HapticDescriptor,
    actuator: Box<dyn Actuator>,
}

/// Drives the connected dual-rumble device with the selected pattern.
///
/// The engine holds one primary and one secondary timer slot. Every
/// reconfiguration clears both before arming anything, so timers from two
/// patterns are never live together. Timer callbacks read the current heart
/// rate and parameters when they fire.
pub struct HapticEngine {
    device: Option<ActiveDevice>,
    pattern: HapticPattern,
    params: PatternParams,
    heart_rate: f32,
    active: bool,
    primary: TimerSlot,
    secondary: TimerSlot,
    armed_period: Option<Duration>,
    pulses: u64,
}

impl Default for HapticEngine {
    fn default() -> Self {
        Self {
            device: None,
            pattern: HapticPattern::default(),
            params: PatternParams::default(),
            heart_rate: 70.0,
            active: false,
            primary: TimerSlot::Stopped,
            secondary: TimerSlot::Stopped,
            armed_period: None,
            pulses: 0,
        }
    }
}

impl HapticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a usable device is connected.
    pub fn is_ready(&self) -> bool {
        self.device.is_some()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device
            .as_ref()
            .map(|device| device.descriptor.id.as_str())
    }

    /// Whether the session wants haptics running (playing and enabled).
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pattern(&self) -> HapticPattern {
        self.pattern
    }

    pub fn params(&self) -> PatternParams {
        self.params
    }

    /// Number of live timers held by the engine (0 to 2).
    pub fn live_timers(&self) -> usize {
        self.primary.is_running() as usize + self.secondary.is_running() as usize
    }

    /// Effects sent to the device since creation.
    pub fn pulses_sent(&self) -> u64 {
        self.pulses
    }

    /// Applies a hot-plug notification.
    pub fn handle_event<K: From<HapticTimer>>(
        &mut self,
        scheduler: &mut Scheduler<K>,
        event: DeviceEvent,
    ) {
        match event {
            DeviceEvent::Connected {
                descriptor,
                actuator,
            } => self.connect(scheduler, descriptor, actuator),
            DeviceEvent::Disconnected { id } => self.disconnect(scheduler, &id),
        }
    }

    /// Adopts a newly discovered device if it negotiates as dual rumble.
    pub fn connect<K: From<HapticTimer>>(
        &mut self,
        scheduler: &mut Scheduler<K>,
        descriptor: HapticDescriptor,
        actuator: Box<dyn Actuator>,
    ) {
        let Capability::Available(actuator) = negotiate(&descriptor, actuator) else {
            return;
        };
        tracing::info!(id = %descriptor.id, name = %descriptor.name, "haptic device connected");
        self.stop_device();
        self.device = Some(ActiveDevice {
            descriptor,
            actuator,
        });
        self.enter(scheduler);
    }

    /// Drops the device if `id` is the one in use.
    pub fn disconnect<K>(&mut self, scheduler: &mut Scheduler<K>, id: &str) {
        if self.device_id() != Some(id) {
            return;
        }
        tracing::info!(%id, "haptic device disconnected");
        self.clear_timers(scheduler);
        self.stop_device();
        self.device = None;
    }

    /// Replaces every input and re-enters the pattern state machine.
    pub fn configure<K: From<HapticTimer>>(
        &mut self,
        scheduler: &mut Scheduler<K>,
        active: bool,
        pattern: HapticPattern,
        params: PatternParams,
    ) {
        self.active = active;
        self.pattern = pattern;
        self.params = params;
        self.enter(scheduler);
    }

    /// Records the latest heart rate. DEFAULT re-arms when its beat period
    /// changes; HEARTBEAT picks the new rate up on its next beat.
    pub fn set_heart_rate<K: From<HapticTimer>>(
        &mut self,
        scheduler: &mut Scheduler<K>,
        heart_rate: f32,
    ) {
        self.heart_rate = heart_rate;
        if self.pattern == HapticPattern::Default
            && self.primary.is_running()
            && self.armed_period != Some(beat_interval(heart_rate))
        {
            self.enter(scheduler);
        }
    }

    /// Clears every timer and stops the device.
    pub fn disable<K>(&mut self, scheduler: &mut Scheduler<K>) {
        self.active = false;
        self.clear_timers(scheduler);
        self.stop_device();
    }

    fn clear_timers<K>(&mut self, scheduler: &mut Scheduler<K>) {
        self.primary.clear(scheduler);
        self.secondary.clear(scheduler);
        self.armed_period = None;
    }

    fn enter<K: From<HapticTimer>>(&mut self, scheduler: &mut Scheduler<K>) {
        self.clear_timers(scheduler);
        if !self.active {
            self.stop_device();
            return;
        }
        if self.device.is_none() {
            return;
        }

        let period = match self.pattern {
            HapticPattern::Default => Some(beat_interval(self.heart_rate)),
            HapticPattern::Wave => Some(self.params.wave_period()),
            HapticPattern::Crystal => Some(crate::pattern::CRYSTAL_PERIOD),
            HapticPattern::Heartbeat => None,
        };
        match period {
            Some(period) => {
                self.primary
                    .arm_repeating(scheduler, period, HapticTimer::Pulse.into());
                self.armed_period = Some(period);
            }
            None => self.beat(scheduler),
        }
        tracing::debug!(pattern = %self.pattern, "haptic pattern armed");
    }

    fn beat<K: From<HapticTimer>>(&mut self, scheduler: &mut Scheduler<K>) {
        if !self.play(scheduler, self.params.thump()) {
            return;
        }
        self.secondary
            .arm_once(scheduler, HEARTBEAT_ECHO_DELAY, HapticTimer::Echo.into());
        self.primary.arm_once(
            scheduler,
            beat_interval(self.heart_rate),
            HapticTimer::Beat.into(),
        );
    }

    /// Handles a fired haptic timer. Timers no longer held by a slot are
    /// ignored.
    pub fn on_timer<K: From<HapticTimer>>(
        &mut self,
        scheduler: &mut Scheduler<K>,
        fired: &Fired<K>,
        timer: HapticTimer,
    ) {
        match timer {
            HapticTimer::Pulse => {
                if !self.primary.acknowledge(fired) {
                    return;
                }
                if let Some(effect) = self.params.pulse(self.pattern) {
                    self.play(scheduler, effect);
                }
            }
            HapticTimer::Beat => {
                if !self.primary.acknowledge(fired) {
                    return;
                }
                self.beat(scheduler);
            }
            HapticTimer::Echo => {
                if !self.secondary.acknowledge(fired) {
                    return;
                }
                self.play(scheduler, self.params.echo());
            }
        }
    }

    /// Sends one effect. A device that reports itself disconnected is
    /// dropped along with every timer; returns whether a device remains.
    fn play<K>(&mut self, scheduler: &mut Scheduler<K>, effect: RumbleEffect) -> bool {
        let Some(device) = self.device.as_mut() else {
            return false;
        };
        match device.actuator.play_effect(&effect) {
            Ok(()) => {
                self.pulses += 1;
                true
            }
            Err(HapticError::Disconnected(reason)) => {
                tracing::warn!(id = %device.descriptor.id, %reason, "haptic device lost");
                self.clear_timers(scheduler);
                self.device = None;
                false
            }
        }
    }

    fn stop_device(&mut self) {
        if let Some(device) = self.device.as_mut() {
            if let Err(err) = device.actuator.reset() {
                tracing::warn!(id = %device.descriptor.id, %err, "haptic reset failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ActuatorCall, EffectLog, RecordingActuator};

    fn run(engine: &mut HapticEngine, scheduler: &mut Scheduler<HapticTimer>, until: Duration) {
        while let Some(fired) = scheduler.pop_due(until) {
            let kind = fired.kind;
            engine.on_timer(scheduler, &fired, kind);
        }
    }

    fn connected() -> (HapticEngine, Scheduler<HapticTimer>, EffectLog) {
        let mut engine = HapticEngine::new();
        let mut scheduler = Scheduler::new();
        let log = EffectLog::new();
        engine.connect(
            &mut scheduler,
            HapticDescriptor::dual_rumble("pad"),
            Box::new(RecordingActuator::new(log.clone())),
        );
        (engine, scheduler, log)
    }

    #[test]
    fn default_pulses_once_per_beat() {
        let (mut engine, mut scheduler, log) = connected();
        engine.set_heart_rate(&mut scheduler, 60.0);
        engine.configure(&mut scheduler, true, HapticPattern::Default, PatternParams::default());
        assert!(log.effects().is_empty());

        run(&mut engine, &mut scheduler, Duration::from_millis(3_500));
        assert_eq!(log.effects().len(), 3);
        assert_eq!(engine.live_timers(), 1);
    }

    #[test]
    fn heartbeat_fires_immediately_then_echoes() {
        let (mut engine, mut scheduler, log) = connected();
        engine.set_heart_rate(&mut scheduler, 60.0);
        engine.configure(&mut scheduler, true, HapticPattern::Heartbeat, PatternParams::default());
        assert_eq!(log.effects().len(), 1);
        assert_eq!(engine.live_timers(), 2);

        run(&mut engine, &mut scheduler, Duration::from_millis(120));
        let effects = log.effects();
        assert_eq!(effects.len(), 2);
        assert!((effects[1].strong() - 0.7).abs() < 1e-6);
        assert_eq!(engine.live_timers(), 1);

        run(&mut engine, &mut scheduler, Duration::from_millis(1_000));
        assert_eq!(log.effects().len(), 3);
        assert_eq!(engine.live_timers(), 2);
    }

    #[test]
    fn device_failing_mid_cycle_is_dropped() {
        let (mut engine, mut scheduler, log) = connected();
        engine.configure(
            &mut scheduler,
            true,
            HapticPattern::Wave,
            PatternParams::default(),
        );
        assert_eq!(engine.live_timers(), 1);

        log.unplug();
        run(&mut engine, &mut scheduler, Duration::from_millis(500));
        assert!(!engine.is_ready());
        assert_eq!(engine.live_timers(), 0);
        assert_eq!(scheduler.live_count(), 0);
        assert_eq!(engine.pulses_sent(), 0);
    }

    #[test]
    fn disabling_clears_timers_and_resets() {
        let (mut engine, mut scheduler, log) = connected();
        engine.configure(&mut scheduler, true, HapticPattern::Heartbeat, PatternParams::default());
        engine.disable(&mut scheduler);
        assert_eq!(engine.live_timers(), 0);
        assert_eq!(scheduler.live_count(), 0);
        assert_eq!(log.calls().last(), Some(&ActuatorCall::Reset));
    }

    #[test]
    fn no_device_means_no_timers() {
        let mut engine = HapticEngine::new();
        let mut scheduler: Scheduler<HapticTimer> = Scheduler::new();
        engine.configure(&mut scheduler, true, HapticPattern::Crystal, PatternParams::default());
        assert_eq!(scheduler.live_count(), 0);
        assert!(!engine.is_ready());
    }

    #[test]
    fn default_rearms_only_when_period_changes() {
        let (mut engine, mut scheduler, _log) = connected();
        engine.configure(&mut scheduler, true, HapticPattern::Default, PatternParams::default());
        let first = engine.primary.id();
        engine.set_heart_rate(&mut scheduler, 70.0);
        assert_eq!(engine.primary.id(), first);
        engine.set_heart_rate(&mut scheduler, 90.0);
        assert_ne!(engine.primary.id(), first);
        assert_eq!(scheduler.live_count(), 1);
    }
}
