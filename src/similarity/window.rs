//! Weighting window and 2-D convolution helpers
//!
//! The window is a 3x3 Gaussian (std 0.5) approximation. Convolutions are
//! computed as a sum of shifted views, one `scaled_add` per kernel tap, so the
//! cost is `taps × rows × cols` with contiguous inner loops.

use ndarray::{s, Array2, ArrayView2};

/// Raw (unnormalised) 3x3 weighting window
pub const NSIM_WINDOW: [[f64; 3]; 3] = [
    [0.0113, 0.0838, 0.0113],
    [0.0838, 0.6193, 0.0838],
    [0.0113, 0.0838, 0.0113],
];

/// The weighting window normalised to sum to 1.0.
pub fn normalized_window() -> Array2<f64> {
    let window = Array2::from_shape_fn((3, 3), |(i, j)| NSIM_WINDOW[i][j]);
    let total = window.sum();
    window / total
}

/// Rotate a kernel by 180 degrees (flip both axes).
pub fn rotate_180(kernel: &Array2<f64>) -> Array2<f64> {
    kernel.slice(s![..;-1, ..;-1]).to_owned()
}

/// Valid-mode 2-D convolution.
///
/// The kernel is flipped as in a true convolution, so convolving with a
/// pre-rotated kernel yields a correlation (MATLAB `filter2`). Output shape is
/// `(rows - kr + 1, cols - kc + 1)`; callers must ensure the input is at least
/// as large as the kernel.
pub fn convolve_valid(input: &ArrayView2<f64>, kernel: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = input.dim();
    let (kr, kc) = kernel.dim();
    let out_rows = rows + 1 - kr;
    let out_cols = cols + 1 - kc;

    let mut out = Array2::<f64>::zeros((out_rows, out_cols));
    for ((a, b), &weight) in kernel.indexed_iter() {
        let row = kr - 1 - a;
        let col = kc - 1 - b;
        let shifted = input.slice(s![row..row + out_rows, col..col + out_cols]);
        out.scaled_add(weight, &shifted);
    }
    out
}

/// Same-size convolution with zero padding outside the matrix.
///
/// Used to pre-smooth feature matrices with the normalised window before a
/// comparison. The kernel must have odd dimensions.
pub fn convolve_same(input: &ArrayView2<f64>, kernel: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = input.dim();
    let (kr, kc) = kernel.dim();
    let (pad_r, pad_c) = (kr / 2, kc / 2);

    let mut padded = Array2::<f64>::zeros((rows + 2 * pad_r, cols + 2 * pad_c));
    padded
        .slice_mut(s![pad_r..pad_r + rows, pad_c..pad_c + cols])
        .assign(input);

    convolve_valid(&padded.view(), kernel)
}

/// Smooth a matrix with the normalised NSIM window (zero-padded, same size).
pub fn smooth(input: &ArrayView2<f64>) -> Array2<f64> {
    convolve_same(input, &normalized_window())
}
