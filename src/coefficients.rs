//! Raw coefficient files
//!
//! Feature extractors upstream write matrices as headerless little-endian
//! float32 streams, frame after frame. These helpers read them back into a
//! [`Matrix`], align two matrices on a common frame count and optionally keep a
//! band of bins before comparison.

use std::fs;
use std::path::Path;

use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::CoefficientError;
use crate::similarity::Matrix;

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Load a raw float32 coefficient file shaped `(len / dim, dim)`.
pub fn load_coefficients<P: AsRef<Path>>(path: P, dim: usize) -> Result<Matrix, CoefficientError> {
    if dim == 0 {
        return Err(CoefficientError::InvalidDimension { dim });
    }
    let bytes = fs::read(&path)?;
    let matrix = parse_coefficients(&bytes, dim)?;
    log::info!(
        "[Coefficients] Loaded {:?}: {} frames x {} bins",
        path.as_ref(),
        matrix.nrows(),
        dim
    );
    Ok(matrix)
}

/// Decode a little-endian float32 byte stream into frames of `dim` bins.
pub fn parse_coefficients(bytes: &[u8], dim: usize) -> Result<Matrix, CoefficientError> {
    if dim == 0 {
        return Err(CoefficientError::InvalidDimension { dim });
    }
    if bytes.len() % (F32_BYTES * dim) != 0 {
        return Err(CoefficientError::TruncatedFile {
            bytes: bytes.len(),
            dim,
        });
    }

    let values: Vec<f64> = bytes
        .chunks_exact(F32_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64)
        .collect();
    let frames = values.len() / dim;

    Array2::from_shape_vec((frames, dim), values).map_err(|e| CoefficientError::Io {
        details: e.to_string(),
    })
}

/// Write a matrix (typically a similarity map) as raw little-endian float32.
pub fn write_map<P: AsRef<Path>>(path: P, matrix: &ArrayView2<f64>) -> Result<(), CoefficientError> {
    let mut bytes = Vec::with_capacity(matrix.len() * F32_BYTES);
    for &v in matrix.iter() {
        bytes.extend_from_slice(&(v as f32).to_le_bytes());
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Slice both matrices to their common leading frame count.
pub fn truncate_to_common(a: &ArrayView2<f64>, b: &ArrayView2<f64>) -> (Matrix, Matrix) {
    let frames = a.nrows().min(b.nrows());
    if a.nrows() != b.nrows() {
        log::debug!(
            "[Coefficients] Truncating to {} common frames ({} vs {})",
            frames,
            a.nrows(),
            b.nrows()
        );
    }
    (
        a.slice(s![..frames, ..]).to_owned(),
        b.slice(s![..frames, ..]).to_owned(),
    )
}

/// Half-open column range `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinRange {
    pub start: usize,
    pub end: usize,
}

impl BinRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Resolve optional CLI bounds against the matrix dimension.
    pub fn resolve(start: Option<usize>, end: Option<usize>, dim: usize) -> Result<Self, CoefficientError> {
        let range = Self::new(start.unwrap_or(0), end.unwrap_or(dim));
        range.validate(dim)?;
        Ok(range)
    }

    fn validate(&self, dim: usize) -> Result<(), CoefficientError> {
        if self.start >= self.end || self.end > dim {
            return Err(CoefficientError::InvalidBinRange {
                start: self.start,
                end: self.end,
                dim,
            });
        }
        Ok(())
    }

    pub fn is_full(&self, dim: usize) -> bool {
        self.start == 0 && self.end == dim
    }
}

/// Keep only the bins in `range`.
pub fn select_bins(matrix: &ArrayView2<f64>, range: BinRange) -> Result<Matrix, CoefficientError> {
    range.validate(matrix.ncols())?;
    Ok(matrix.slice(s![.., range.start..range.end]).to_owned())
}
