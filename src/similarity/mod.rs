//! NSIM - Neurogram Similarity Index Measure
//!
//! Compares two equally shaped feature matrices (rows = frames, columns =
//! bins) with an SSIM-style local statistic computed over a 3x3 weighting
//! window. The result is a scalar score plus a per-cell map that is two rows
//! and two columns smaller than the inputs (valid convolution).
//!
//! Key properties:
//! - Pure and deterministic: no state, safe to call from any thread
//! - Symmetric in its two inputs
//! - Zero-variance regions are stabilised by the C1/C2 constants, so two
//!   all-zero matrices score exactly 1.0
//!
//! Inputs are validated up front: mismatched shapes, matrices smaller than
//! the window and non-finite values are rejected before any arithmetic.

mod summary;
pub mod window;

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{log_similarity_error, MatrixSide, SimilarityError};

pub use summary::MapSummary;
pub use window::{normalized_window, rotate_180, smooth, NSIM_WINDOW};

/// A feature matrix: rows are time frames, columns are feature bins.
pub type Matrix = Array2<f64>;

/// Dynamic range constant used to derive the stabilisers
pub const DYNAMIC_RANGE: f64 = 160.0;

/// Luminance stabiliser, `(0.01 L)^2`
pub const C1: f64 = (0.01 * DYNAMIC_RANGE) * (0.01 * DYNAMIC_RANGE);

/// Structure stabiliser, `(0.03 L)^2 / 2`
pub const C2: f64 = (0.03 * DYNAMIC_RANGE) * (0.03 * DYNAMIC_RANGE) / 2.0;

/// Minimum rows/columns for the valid convolution to produce output
pub const MIN_DIMENSION: usize = 3;

/// Result of one comparison
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    /// Mean of the similarity map
    pub score: f64,
    /// Per-cell similarity, shape `(rows - 2, cols - 2)`
    pub map: Matrix,
}

impl SimilarityResult {
    /// Mean similarity of each map row (one value per frame).
    pub fn frame_profile(&self) -> Array1<f64> {
        frame_profile(&self.map.view())
    }

    /// Summary statistics of the map at the given threshold.
    pub fn summary(&self, threshold: f64) -> MapSummary {
        MapSummary::from_map(&self.map.view(), threshold)
    }
}

/// NSIM comparator holding the rotated weighting window
#[derive(Debug, Clone)]
pub struct Nsim {
    window: Array2<f64>,
}

impl Nsim {
    pub fn new() -> Self {
        Self {
            window: rotate_180(&normalized_window()),
        }
    }

    /// The (normalised, rotated) window used for every convolution.
    pub fn window(&self) -> &Array2<f64> {
        &self.window
    }

    /// Compare `reference` against `other`.
    ///
    /// # Errors
    /// - `ShapeMismatch` if the shapes differ
    /// - `DimensionTooSmall` if either axis is shorter than 3
    /// - `InvalidValue` if any cell is NaN or infinite
    pub fn compute(
        &self,
        reference: ArrayView2<f64>,
        other: ArrayView2<f64>,
    ) -> Result<SimilarityResult, SimilarityError> {
        if let Err(err) = validate(&reference, &other) {
            log_similarity_error(&err, "Nsim::compute");
            return Err(err);
        }

        let w = &self.window;

        // Local means
        let m_r = window::convolve_valid(&reference, w);
        let m_d = window::convolve_valid(&other, w);
        let m_r_sq = &m_r * &m_r;
        let m_d_sq = &m_d * &m_d;
        let m_r_m_d = &m_r * &m_d;

        // Local variances and covariance
        let var_r = window::convolve_valid(&(&reference * &reference).view(), w) - &m_r_sq;
        let var_d = window::convolve_valid(&(&other * &other).view(), w) - &m_d_sq;
        let cov = window::convolve_valid(&(&reference * &other).view(), w) - &m_r_m_d;

        // Cancellation can leave tiny negative variances; keep their sign.
        let s_r = var_r.mapv(signed_sqrt);
        let s_d = var_d.mapv(signed_sqrt);

        let luminance = (&m_r_m_d * 2.0 + C1) / (&m_r_sq + &m_d_sq + C1);
        let structure = (cov + C2) / (&s_r * &s_d + C2);

        let map = luminance * structure;
        let score = map.sum() / map.len() as f64;

        log::debug!(
            "[Nsim] compared {:?} matrices, score={:.6}",
            reference.dim(),
            score
        );

        Ok(SimilarityResult { score, map })
    }
}

impl Default for Nsim {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two matrices with a default [`Nsim`].
pub fn compute(
    reference: ArrayView2<f64>,
    other: ArrayView2<f64>,
) -> Result<SimilarityResult, SimilarityError> {
    Nsim::new().compute(reference, other)
}

/// Mean of each row of a similarity map.
pub fn frame_profile(map: &ArrayView2<f64>) -> Array1<f64> {
    map.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(0))
}

/// `sign(v) * sqrt(|v|)` with `sign(0) = 0`.
#[inline]
fn signed_sqrt(v: f64) -> f64 {
    if v > 0.0 {
        v.sqrt()
    } else if v < 0.0 {
        -(-v).sqrt()
    } else {
        0.0
    }
}

fn validate(reference: &ArrayView2<f64>, other: &ArrayView2<f64>) -> Result<(), SimilarityError> {
    if reference.dim() != other.dim() {
        return Err(SimilarityError::ShapeMismatch {
            reference: reference.dim(),
            other: other.dim(),
        });
    }

    let (rows, cols) = reference.dim();
    if rows < MIN_DIMENSION || cols < MIN_DIMENSION {
        return Err(SimilarityError::DimensionTooSmall { rows, cols });
    }

    for (side, matrix) in [(MatrixSide::Reference, reference), (MatrixSide::Other, other)] {
        if let Some(((row, col), _)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(SimilarityError::InvalidValue { side, row, col });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
