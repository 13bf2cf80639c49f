// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// These constants provide a single source of truth for error codes
/// reported by the playback engine.
///
/// Error code range: 1001-1009
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Output device could not be opened for playback
    pub const STREAM_OPEN_FAILED: i32 = 1001;

    /// Requested output device does not exist
    pub const DEVICE_NOT_FOUND: i32 = 1002;

    /// Audio buffer is malformed (zero rate, zero channels, ragged frames)
    pub const INVALID_BUFFER: i32 = 1003;

    /// Requested playback range is empty or inverted
    pub const INVALID_RANGE: i32 = 1004;

    /// No buffer loaded before play()
    pub const NO_BUFFER: i32 = 1005;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1006;

    /// Audio stream disconnected or failed after start
    pub const STREAM_FAILURE: i32 = 1007;

    /// Host audio subsystem error
    pub const HARDWARE_ERROR: i32 = 1008;

    /// Playback thread could not be spawned
    pub const THREAD_SPAWN_FAILED: i32 = 1009;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=PlaybackEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover playback engine operations including device access,
/// stream management and transport requests.
///
/// Error code ranges: 1001-1009
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Failed to open audio stream (the device error surfaced by play())
    StreamOpenFailed { reason: String },

    /// Named output device is not available on the host
    DeviceNotFound { name: String },

    /// Buffer cannot be played as given
    InvalidBuffer { reason: String },

    /// Start/end bounds select no audio
    InvalidRange { start: f64, end: f64 },

    /// play() called before load_buffer()
    NoBuffer,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Stream failed after it was started
    StreamFailure { reason: String },

    /// Hardware error occurred
    HardwareError { details: String },

    /// Playback thread could not be spawned
    ThreadSpawnFailed { reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::DeviceNotFound { .. } => AudioErrorCodes::DEVICE_NOT_FOUND,
            AudioError::InvalidBuffer { .. } => AudioErrorCodes::INVALID_BUFFER,
            AudioError::InvalidRange { .. } => AudioErrorCodes::INVALID_RANGE,
            AudioError::NoBuffer => AudioErrorCodes::NO_BUFFER,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::ThreadSpawnFailed { .. } => AudioErrorCodes::THREAD_SPAWN_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::DeviceNotFound { name } => {
                format!("Output device not found: {}", name)
            }
            AudioError::InvalidBuffer { reason } => {
                format!("Invalid audio buffer: {}", reason)
            }
            AudioError::InvalidRange { start, end } => {
                format!("Invalid playback range: {}s..{}s", start, end)
            }
            AudioError::NoBuffer => {
                "No audio buffer loaded. Call load_buffer() first.".to_string()
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::ThreadSpawnFailed { reason } => {
                format!("Failed to spawn playback thread: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        AudioError::InvalidBuffer {
            reason: err.to_string(),
        }
    }
}
