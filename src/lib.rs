// Spiny - spectrogram similarity scoring and audio playback
// NSIM comparison of feature matrices plus a lock-free playback engine

// Module declarations
pub mod audio;
pub mod coefficients;
pub mod config;
pub mod engine;
pub mod error;
pub mod similarity;

// Re-exports for convenience
pub use audio::{AudioBuffer, PlaybackEvent};
pub use config::AppConfig;
pub use engine::{PlaybackEngine, PlaybackStatus};
pub use error::{AudioError, CoefficientError, SimilarityError};
pub use similarity::{compute, Matrix, Nsim, SimilarityResult};

/// Install a `tracing` subscriber reading `RUST_LOG` (default `info`).
///
/// `log` records from library code are forwarded through the same
/// subscriber. Calling this more than once is harmless.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
