use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::HapticError;

/// Shortest effect a device is asked to play.
pub const MIN_EFFECT_DURATION: Duration = Duration::from_millis(1);

/// Actuator hardware reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorKind {
    /// Two independently driven motors, strong and weak.
    DualRumble,
    /// Single-motor vibration.
    Vibration,
    None,
}

/// Identity of a discovered device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HapticDescriptor {
    pub id: String,
    pub name: String,
    pub actuator: ActuatorKind,
}

impl HapticDescriptor {
    pub fn dual_rumble(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            actuator: ActuatorKind::DualRumble,
        }
    }
}

/// One dual-rumble effect request. Magnitudes are always within `[0, 1]`
/// and the duration is never shorter than [`MIN_EFFECT_DURATION`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RumbleEffect {
    strong: f32,
    weak: f32,
    duration: Duration,
}

impl RumbleEffect {
    pub fn new(strong: f32, weak: f32, duration: Duration) -> Self {
        Self {
            strong: clamp_magnitude(strong),
            weak: clamp_magnitude(weak),
            duration: duration.max(MIN_EFFECT_DURATION),
        }
    }

    /// Same magnitude on both motors.
    pub fn uniform(magnitude: f32, duration: Duration) -> Self {
        Self::new(magnitude, magnitude, duration)
    }

    /// Zero-magnitude effect that overrides whatever is playing.
    pub fn silence() -> Self {
        Self::new(0.0, 0.0, MIN_EFFECT_DURATION)
    }

    pub fn strong(&self) -> f32 {
        self.strong
    }

    pub fn weak(&self) -> f32 {
        self.weak
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_silent(&self) -> bool {
        self.strong == 0.0 && self.weak == 0.0
    }
}

fn clamp_magnitude(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Output half of a connected haptic device.
pub trait Actuator: Send {
    fn play_effect(&mut self, effect: &RumbleEffect) -> Result<(), HapticError>;

    /// Stops any running effect. Devices without a native reset get a
    /// zero-magnitude effect instead.
    fn reset(&mut self) -> Result<(), HapticError> {
        self.play_effect(&RumbleEffect::silence())
    }
}

/// Result of probing a device once at discovery time.
pub enum Capability {
    Available(Box<dyn Actuator>),
    Unavailable,
}

impl Capability {
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Available(_) => f.write_str("Available"),
            Capability::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Only dual-rumble devices are driven.
pub fn negotiate(descriptor: &HapticDescriptor, actuator: Box<dyn Actuator>) -> Capability {
    match descriptor.actuator {
        ActuatorKind::DualRumble => Capability::Available(actuator),
        other => {
            tracing::debug!(id = %descriptor.id, ?other, "ignoring device without dual rumble");
            Capability::Unavailable
        }
    }
}

/// Actuator that only logs what it is asked to play.
#[derive(Debug, Clone)]
pub struct LoggingActuator {
    id: String,
}

impl LoggingActuator {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Actuator for LoggingActuator {
    fn play_effect(&mut self, effect: &RumbleEffect) -> Result<(), HapticError> {
        tracing::debug!(
            device = %self.id,
            strong = effect.strong(),
            weak = effect.weak(),
            duration_ms = effect.duration().as_millis() as u64,
            "rumble"
        );
        Ok(())
    }

    fn reset(&mut self) -> Result<(), HapticError> {
        tracing::debug!(device = %self.id, "rumble reset");
        Ok(())
    }
}

/// Request received by a [`RecordingActuator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCall {
    Effect(RumbleEffect),
    Reset,
}

/// Shared list of calls made on recording actuators.
#[derive(Debug, Clone, Default)]
pub struct EffectLog {
    calls: Arc<Mutex<Vec<ActuatorCall>>>,
    unplugged: Arc<AtomicBool>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.calls.lock().clone()
    }

    pub fn effects(&self) -> Vec<RumbleEffect> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ActuatorCall::Effect(effect) => Some(*effect),
                ActuatorCall::Reset => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Makes every actuator sharing this log fail with
    /// [`HapticError::Disconnected`] from now on.
    pub fn unplug(&self) {
        self.unplugged.store(true, Ordering::SeqCst);
    }

    pub fn is_unplugged(&self) -> bool {
        self.unplugged.load(Ordering::SeqCst)
    }

    fn push(&self, call: ActuatorCall) -> Result<(), HapticError> {
        if self.is_unplugged() {
            return Err(HapticError::Disconnected("recording".into()));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

/// Actuator that records every call into an [`EffectLog`].
#[derive(Debug, Clone)]
pub struct RecordingActuator {
    log: EffectLog,
    native_reset: bool,
}

impl RecordingActuator {
    pub fn new(log: EffectLog) -> Self {
        Self {
            log,
            native_reset: true,
        }
    }

    /// Behaves like a device without a native reset.
    pub fn without_reset(log: EffectLog) -> Self {
        Self {
            log,
            native_reset: false,
        }
    }
}

impl Actuator for RecordingActuator {
    fn play_effect(&mut self, effect: &RumbleEffect) -> Result<(), HapticError> {
        self.log.push(ActuatorCall::Effect(*effect))
    }

    fn reset(&mut self) -> Result<(), HapticError> {
        if self.native_reset {
            self.log.push(ActuatorCall::Reset)
        } else {
            self.play_effect(&RumbleEffect::silence())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_are_clamped() {
        let effect = RumbleEffect::new(1.7, -0.2, Duration::ZERO);
        assert_eq!(effect.strong(), 1.0);
        assert_eq!(effect.weak(), 0.0);
        assert_eq!(effect.duration(), MIN_EFFECT_DURATION);

        let nan = RumbleEffect::uniform(f32::NAN, Duration::from_millis(5));
        assert!(nan.is_silent());
    }

    #[test]
    fn only_dual_rumble_is_available() {
        let log = EffectLog::new();
        let rumble = HapticDescriptor::dual_rumble("pad-0");
        let mut vibration = rumble.clone();
        vibration.actuator = ActuatorKind::Vibration;

        assert!(negotiate(&rumble, Box::new(RecordingActuator::new(log.clone()))).is_available());
        assert!(!negotiate(&vibration, Box::new(RecordingActuator::new(log))).is_available());
    }

    #[test]
    fn reset_falls_back_to_silence() {
        let log = EffectLog::new();
        let mut actuator = RecordingActuator::without_reset(log.clone());
        actuator.reset().unwrap();
        assert_eq!(log.calls(), vec![ActuatorCall::Effect(RumbleEffect::silence())]);
    }

    #[test]
    fn unplugged_log_rejects_calls() {
        let log = EffectLog::new();
        let mut actuator = RecordingActuator::new(log.clone());
        log.unplug();
        assert!(matches!(
            actuator.play_effect(&RumbleEffect::uniform(0.5, Duration::from_millis(10))),
            Err(HapticError::Disconnected(_))
        ));
        assert!(actuator.reset().is_err());
        assert!(log.is_empty());
    }
}
