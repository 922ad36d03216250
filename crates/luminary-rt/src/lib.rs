//! Cooperative timer scheduling for Luminary sessions.
//!
//! Every periodic or deferred activity in a session (signal ticks, haptic
//! pulses, chime intervals, render frames) is a timer on one [`Scheduler`].
//! Timers carry a caller-defined kind instead of a closure, so the owner
//! dispatches them and re-reads its current state at fire time.

mod scheduler;
mod slot;

pub use scheduler::{Fired, Scheduler, TimerId, MIN_PERIOD};
pub use slot::TimerSlot;
