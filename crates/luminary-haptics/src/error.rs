use thiserror::Error;

#[derive(Debug, Error)]
pub enum HapticError {
    #[error("haptic device `{0}` is disconnected")]
    Disconnected(String),
}
