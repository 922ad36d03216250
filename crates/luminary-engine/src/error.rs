use thiserror::Error;

pub type Result<T> = std::result::Result<T, AudioError>;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("unsupported output configuration")]
    UnsupportedConfiguration,
    #[error("audio stream error: {0}")]
    Stream(String),
}
