//! Haptic output for Luminary sessions.
//!
//! Devices are reported through a [`HapticHub`] and negotiated once; only
//! dual-rumble devices are driven. [`HapticEngine`] runs one of the four
//! [`HapticPattern`]s on timers owned by the caller's scheduler.

pub mod device;
pub mod engine;
pub mod error;
pub mod hub;
pub mod pattern;

pub use device::{
    negotiate, Actuator, ActuatorCall, ActuatorKind, Capability, EffectLog, HapticDescriptor,
    LoggingActuator, RecordingActuator, RumbleEffect, MIN_EFFECT_DURATION,
};
pub use engine::{HapticEngine, HapticTimer};
pub use error::HapticError;
pub use hub::{DeviceEvent, HapticHub};
pub use pattern::{beat_interval, HapticPattern, PatternParams, UnknownPattern};
