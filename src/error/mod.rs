// Error types for the spiny comparison and playback library
//
// This module defines custom error types for playback, similarity and
// coefficient I/O operations, providing structured error handling with
// stable numeric codes for callers that surface them in a status bar or log.

mod audio;
mod similarity;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use similarity::{
    log_similarity_error, CoefficientError, CoefficientErrorCodes, MatrixSide, SimilarityError,
    SimilarityErrorCodes,
};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
