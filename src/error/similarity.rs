// Similarity and coefficient error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Similarity error code constants
///
/// Error code range: 3001-3003
pub struct SimilarityErrorCodes {}

impl SimilarityErrorCodes {
    /// Reference and degraded matrices differ in shape
    pub const SHAPE_MISMATCH: i32 = 3001;

    /// A matrix contains NaN or infinity
    pub const INVALID_VALUE: i32 = 3002;

    /// A matrix is smaller than the 3x3 window
    pub const DIMENSION_TOO_SMALL: i32 = 3003;
}

/// Coefficient file error code constants
///
/// Error code range: 3101-3104
pub struct CoefficientErrorCodes {}

impl CoefficientErrorCodes {
    /// File could not be read or written
    pub const IO: i32 = 3101;

    /// Frame dimension of zero requested
    pub const INVALID_DIMENSION: i32 = 3102;

    /// File length is not a whole number of frames
    pub const TRUNCATED_FILE: i32 = 3103;

    /// Bin selection outside the frame dimension
    pub const INVALID_BIN_RANGE: i32 = 3104;
}

/// Log a similarity error with structured context
pub fn log_similarity_error(err: &SimilarityError, context: &str) {
    error!(
        "Similarity error in {}: code={}, component=Nsim, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Which input of a comparison an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixSide {
    Reference,
    Other,
}

impl fmt::Display for MatrixSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixSide::Reference => write!(f, "reference"),
            MatrixSide::Other => write!(f, "other"),
        }
    }
}

/// Errors raised by the NSIM computation
///
/// All of these are raised synchronously before any arithmetic happens.
#[derive(Debug, Clone, PartialEq)]
pub enum SimilarityError {
    /// Inputs must share (rows, cols)
    ShapeMismatch {
        reference: (usize, usize),
        other: (usize, usize),
    },

    /// Non-finite value found at the given cell
    InvalidValue {
        side: MatrixSide,
        row: usize,
        col: usize,
    },

    /// Valid 3x3 convolution would leave nothing
    DimensionTooSmall { rows: usize, cols: usize },
}

impl ErrorCode for SimilarityError {
    fn code(&self) -> i32 {
        match self {
            SimilarityError::ShapeMismatch { .. } => SimilarityErrorCodes::SHAPE_MISMATCH,
            SimilarityError::InvalidValue { .. } => SimilarityErrorCodes::INVALID_VALUE,
            SimilarityError::DimensionTooSmall { .. } => SimilarityErrorCodes::DIMENSION_TOO_SMALL,
        }
    }

    fn message(&self) -> String {
        match self {
            SimilarityError::ShapeMismatch { reference, other } => format!(
                "Shape mismatch: reference is {}x{}, other is {}x{}",
                reference.0, reference.1, other.0, other.1
            ),
            SimilarityError::InvalidValue { side, row, col } => {
                format!("Non-finite value in {} matrix at ({}, {})", side, row, col)
            }
            SimilarityError::DimensionTooSmall { rows, cols } => format!(
                "Matrix must be at least 3x3 for NSIM (got {}x{})",
                rows, cols
            ),
        }
    }
}

impl fmt::Display for SimilarityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SimilarityError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SimilarityError {}

/// Errors raised while reading, writing or slicing coefficient matrices
#[derive(Debug, Clone, PartialEq)]
pub enum CoefficientError {
    /// Underlying file error
    Io { details: String },

    /// `dim` must be positive
    InvalidDimension { dim: usize },

    /// Byte length does not divide into `dim`-wide f32 frames
    TruncatedFile { bytes: usize, dim: usize },

    /// Column range is empty or past the last bin
    InvalidBinRange { start: usize, end: usize, dim: usize },
}

impl ErrorCode for CoefficientError {
    fn code(&self) -> i32 {
        match self {
            CoefficientError::Io { .. } => CoefficientErrorCodes::IO,
            CoefficientError::InvalidDimension { .. } => CoefficientErrorCodes::INVALID_DIMENSION,
            CoefficientError::TruncatedFile { .. } => CoefficientErrorCodes::TRUNCATED_FILE,
            CoefficientError::InvalidBinRange { .. } => CoefficientErrorCodes::INVALID_BIN_RANGE,
        }
    }

    fn message(&self) -> String {
        match self {
            CoefficientError::Io { details } => format!("Coefficient file error: {}", details),
            CoefficientError::InvalidDimension { dim } => {
                format!("Frame dimension must be greater than 0 (got {})", dim)
            }
            CoefficientError::TruncatedFile { bytes, dim } => format!(
                "File size {} bytes is not a multiple of {} float32 bins",
                bytes, dim
            ),
            CoefficientError::InvalidBinRange { start, end, dim } => format!(
                "Bin range {}..{} is invalid for dimension {}",
                start, end, dim
            ),
        }
    }
}

impl fmt::Display for CoefficientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CoefficientError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CoefficientError {}

impl From<std::io::Error> for CoefficientError {
    fn from(err: std::io::Error) -> Self {
        CoefficientError::Io {
            details: err.to_string(),
        }
    }
}
