//! Session orchestration for Luminary.
//!
//! A [`Session`] owns the heart-rate walk, the [`luminary_engine::ToneEngine`],
//! the [`luminary_haptics::HapticEngine`] and the
//! [`luminary_visual::VisualEngine`], wires [`SessionCommand`]s to them and
//! persists user [`Settings`] through a [`PreferenceStore`].

pub mod command;
pub mod config;
pub mod session;
pub mod settings;

pub use command::{parse_frequencies, IntensityChannel, ManualMode, SessionCommand};
pub use config::{SessionConfig, CHIME_PERIOD};
pub use session::{
    Session, SessionSnapshot, TimerKind, CUSTOM_TONES_MESSAGE, DEFAULT_PEMF_INTENSITY,
    DEFAULT_TONE_INTENSITY, MANUAL_PEMF_MESSAGE, MANUAL_TONE_MESSAGE, WELCOME_MESSAGE,
};
pub use settings::{FileStore, MemoryStore, PreferenceStore, Settings, SettingsError, SETTINGS_KEY};
