//! Luminary Signal Engine
//! ======================
//! A synthetic heart-rate random walk and the pure classification that maps a
//! heart rate onto one of three affect states. Each state owns a static
//! profile (colour, tone, PEMF intensity, affirmations) that the output
//! channels read to stay coherent with the simulated physiology.

pub mod profile;
pub mod state;
pub mod walk;

pub use profile::{Frequencies, StateProfile};
pub use state::{classify, AffectState};
pub use walk::{HeartRateWalk, SignalTick, BASELINE_BPM, TICK_PERIOD};
