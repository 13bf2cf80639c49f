use super::*;
use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(0.0..100.0))
}

#[test]
fn test_constants() {
    assert!((C1 - 2.56).abs() < 1e-12);
    assert!((C2 - 11.52).abs() < 1e-12);
}

#[test]
fn test_self_similarity_scores_one() {
    let m = random_matrix(50, 20, 7);
    let result = compute(m.view(), m.view()).unwrap();
    assert!(
        (result.score - 1.0).abs() < 1e-9,
        "self-similarity should be ~1.0, got {}",
        result.score
    );
}

#[test]
fn test_map_shape_shrinks_by_two() {
    let shapes = [(3, 3), (4, 3), (10, 40), (257, 5)];
    for (i, &(rows, cols)) in shapes.iter().enumerate() {
        let a = random_matrix(rows, cols, i as u64);
        let b = random_matrix(rows, cols, 100 + i as u64);
        let result = compute(a.view(), b.view()).unwrap();
        assert_eq!(result.map.dim(), (rows - 2, cols - 2));
    }
}

#[test]
fn test_symmetry() {
    let a = random_matrix(30, 12, 1);
    let b = random_matrix(30, 12, 2);
    let ab = compute(a.view(), b.view()).unwrap();
    let ba = compute(b.view(), a.view()).unwrap();
    assert!((ab.score - ba.score).abs() < 1e-12);
}

#[test]
fn test_determinism() {
    let a = random_matrix(25, 9, 3);
    let b = random_matrix(25, 9, 4);
    let nsim = Nsim::new();
    let first = nsim.compute(a.view(), b.view()).unwrap();
    let second = nsim.compute(a.view(), b.view()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_different_inputs_score_below_one() {
    let a = random_matrix(40, 10, 5);
    let b = random_matrix(40, 10, 6);
    let result = compute(a.view(), b.view()).unwrap();
    assert!(result.score < 1.0);
}

#[test]
fn test_small_counting_matrix() {
    let m = array![
        [1.0, 2.0, 3.0],
        [4.0, 5.0, 6.0],
        [7.0, 8.0, 9.0],
        [10.0, 11.0, 12.0]
    ];
    let result = compute(m.view(), m.view()).unwrap();
    assert_eq!(result.map.dim(), (2, 1));
    assert!((result.score - 1.0).abs() < 1e-9);
}

#[test]
fn test_all_zero_matrices_score_exactly_one() {
    let zeros = Array2::<f64>::zeros((5, 5));
    let result = compute(zeros.view(), zeros.view()).unwrap();
    assert_eq!(result.map.dim(), (3, 3));
    assert_eq!(result.score, 1.0);
    assert!(result.map.iter().all(|&v| v == 1.0));
}

#[test]
fn test_constant_offset_lowers_luminance_only() {
    let a = Array2::<f64>::from_elem((6, 6), 10.0);
    let b = Array2::<f64>::from_elem((6, 6), 20.0);
    let result = compute(a.view(), b.view()).unwrap();

    // Flat regions: structure term is C2/C2, luminance is (2ab+C1)/(a²+b²+C1).
    let expected = (2.0 * 10.0 * 20.0 + C1) / (100.0 + 400.0 + C1);
    for &v in result.map.iter() {
        assert!((v - expected).abs() < 1e-9);
    }
}

#[test]
fn test_shape_mismatch_rejected() {
    let a = Array2::<f64>::zeros((5, 4));
    let b = Array2::<f64>::zeros((6, 4));
    let err = compute(a.view(), b.view()).unwrap_err();
    assert_eq!(
        err,
        SimilarityError::ShapeMismatch {
            reference: (5, 4),
            other: (6, 4)
        }
    );
}

#[test]
fn test_too_small_rejected() {
    let a = Array2::<f64>::zeros((2, 10));
    let err = compute(a.view(), a.view()).unwrap_err();
    assert_eq!(err, SimilarityError::DimensionTooSmall { rows: 2, cols: 10 });

    let empty = Array2::<f64>::zeros((0, 0));
    assert!(compute(empty.view(), empty.view()).is_err());
}

#[test]
fn test_non_finite_rejected() {
    let a = Array2::<f64>::zeros((4, 4));
    let mut b = Array2::<f64>::zeros((4, 4));
    b[[2, 3]] = f64::NAN;
    let err = compute(a.view(), b.view()).unwrap_err();
    assert_eq!(
        err,
        SimilarityError::InvalidValue {
            side: MatrixSide::Other,
            row: 2,
            col: 3
        }
    );

    let mut c = Array2::<f64>::zeros((4, 4));
    c[[0, 1]] = f64::INFINITY;
    let err = compute(c.view(), a.view()).unwrap_err();
    assert!(matches!(
        err,
        SimilarityError::InvalidValue {
            side: MatrixSide::Reference,
            ..
        }
    ));
}

#[test]
fn test_signed_sqrt() {
    assert_eq!(signed_sqrt(4.0), 2.0);
    assert_eq!(signed_sqrt(-9.0), -3.0);
    assert_eq!(signed_sqrt(0.0), 0.0);
}

#[test]
fn test_frame_profile_length_matches_map_rows() {
    let a = random_matrix(12, 8, 11);
    let b = random_matrix(12, 8, 12);
    let result = compute(a.view(), b.view()).unwrap();
    let profile = result.frame_profile();
    assert_eq!(profile.len(), 10);
    let mean_of_profile = profile.sum() / profile.len() as f64;
    assert!((mean_of_profile - result.score).abs() < 1e-9);
}

#[test]
fn test_summary_of_self_comparison() {
    let a = random_matrix(12, 8, 13);
    let result = compute(a.view(), a.view()).unwrap();
    let summary = result.summary(0.99);
    assert_eq!(summary.proportion_at_or_above, 100.0);
    assert!(summary.masked_mean.is_none());
}

#[test]
fn test_smoothing_then_compare_is_still_self_similar() {
    let a = random_matrix(20, 6, 14);
    let smoothed = smooth(&a.view());
    assert_eq!(smoothed.dim(), a.dim());
    let result = compute(smoothed.view(), smoothed.view()).unwrap();
    assert!((result.score - 1.0).abs() < 1e-9);
}
