use thiserror::Error;

/// Main player error type
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),
}

impl PlayerError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::Audio(err) => err.user_message(),
            PlayerError::File(err) => Self::format_file_error(err),
            PlayerError::Playback(err) => err.user_message(),
            PlayerError::Config(err) => format!("Configuration problem: {}", err),
            PlayerError::Parse(err) => format!("Command error: {}", err),
        }
    }

    fn format_file_error(err: &std::io::Error) -> String {
        match err.kind() {
            std::io::ErrorKind::NotFound => "File or directory not found".to_string(),
            std::io::ErrorKind::PermissionDenied => {
                "Permission denied - cannot access file".to_string()
            }
            _ => format!("File system error: {}", err),
        }
    }
}

/// Audio output errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Device not found: {device}")]
    DeviceNotFound { device: String },

    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Audio initialization failed: {0}")]
    InitializationFailed(String),
}

impl AudioError {
    pub fn user_message(&self) -> String {
        match self {
            AudioError::DeviceNotFound { device } => {
                format!(
                    "Audio device '{}' is not available or has been disconnected",
                    device
                )
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Audio format '{}' is not supported", format)
            }
            AudioError::StreamError(msg) => {
                format!("Audio playback interrupted: {}", msg)
            }
            AudioError::InitializationFailed(msg) => {
                format!("Failed to initialize audio system: {}", msg)
            }
        }
    }
}

/// Transport errors for playlist operations
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no track selected")]
    NoTrackSelected,

    #[error("audio output error: {0}")]
    Output(#[from] AudioError),
}

impl PlaybackError {
    pub fn user_message(&self) -> String {
        match self {
            PlaybackError::NoTrackSelected => {
                "No track is selected - load a track first".to_string()
            }
            PlaybackError::Output(err) => err.user_message(),
        }
    }
}

/// Track loading errors. These are logged and recovered with a placeholder
/// buffer rather than surfaced to the caller of add/load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetch failed for '{locator}': {reason}")]
    Fetch { locator: String, reason: String },

    #[error("decode failed for '{locator}': {reason}")]
    Decode { locator: String, reason: String },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine configuration directory")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    SerializationError(#[from] toml::ser::Error),
}
