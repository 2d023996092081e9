//! Orthonormal DCT-II

use ndarray::Array2;

/// DCT-II basis with orthonormal scaling, shape (n_out, n_in).
///
/// `basis.dot(x)` over a column of `n_in` values yields the first `n_out`
/// coefficients.
pub fn dct_ortho_basis(n_out: usize, n_in: usize) -> Array2<f32> {
    let n = n_in as f64;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        let angle = std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n);
        (scale * angle.cos()) as f32
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_dc_component() {
        let basis = dct_ortho_basis(4, 16);
        let x = Array1::from_elem(16, 1.0f32);
        let y = basis.dot(&x);
        assert!((y[0] - 4.0).abs() < 1e-5);
        for k in 1..4 {
            assert!(y[k].abs() < 1e-5);
        }
    }

    #[test]
    fn test_orthonormal_rows() {
        let basis = dct_ortho_basis(8, 8);
        let gram = basis.dot(&basis.t());
        for i in 0..8 {
            for j in 0..8 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-5);
            }
        }
    }
}
