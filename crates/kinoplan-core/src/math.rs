//! Polynomial utilities.
//!
//! Polynomials are represented as coefficient slices in ascending powers:
//! `c[j]` multiplies `t^j`. Real roots are extracted from the eigenvalues of
//! the companion matrix, which keeps one code path for every degree the
//! trajectory types produce.

use nalgebra::DMatrix;

/// Evaluate a polynomial at `x` (Horner form).
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Coefficients of the first derivative.
pub fn polyder(coeffs: &[f64]) -> Vec<f64> {
    if coeffs.len() <= 1 {
        return Vec::new();
    }
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(j, &c)| j as f64 * c)
        .collect()
}

/// `∫₀ᵗ p(s)² ds` for the polynomial with the given coefficients.
pub fn poly_sq_integral(coeffs: &[f64], t: f64) -> f64 {
    let mut total = 0.0;
    for (j, &cj) in coeffs.iter().enumerate() {
        for (k, &ck) in coeffs.iter().enumerate() {
            let p = (j + k + 1) as f64;
            total += cj * ck * t.powi(j as i32 + k as i32 + 1) / p;
        }
    }
    total
}

/// All real roots of the polynomial, in no particular order.
///
/// Leading coefficients that are negligible relative to the largest
/// coefficient are dropped before the degree is decided.
pub fn real_roots(coeffs: &[f64]) -> Vec<f64> {
    let max_abs = coeffs.iter().fold(0.0f64, |m, c| m.max(c.abs()));
    if max_abs == 0.0 {
        return Vec::new();
    }
    let trim_tol = 1e-12 * max_abs;
    let mut n = coeffs.len();
    while n > 0 && coeffs[n - 1].abs() <= trim_tol {
        n -= 1;
    }
    let c = &coeffs[..n];

    match c.len() {
        0 | 1 => Vec::new(),
        2 => vec![-c[0] / c[1]],
        3 => {
            let (a, b, cc) = (c[2], c[1], c[0]);
            let disc = b * b - 4.0 * a * cc;
            if disc < 0.0 {
                Vec::new()
            } else {
                let sq = disc.sqrt();
                vec![(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)]
            }
        }
        _ => companion_roots(c),
    }
}

/// Real roots restricted to the closed interval `[lo, hi]`.
pub fn real_roots_in(coeffs: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    real_roots(coeffs)
        .into_iter()
        .filter(|r| *r >= lo && *r <= hi)
        .collect()
}

fn companion_roots(c: &[f64]) -> Vec<f64> {
    let n = c.len() - 1;
    let lead = c[n];
    let companion = DMatrix::from_fn(n, n, |i, j| {
        if j == n - 1 {
            -c[i] / lead
        } else if i == j + 1 {
            1.0
        } else {
            0.0
        }
    });
    companion
        .complex_eigenvalues()
        .iter()
        .filter(|e| e.im.abs() <= 1e-8 * (1.0 + e.re.abs()))
        .map(|e| e.re)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_polyval() {
        // 1 + 2t + 3t²
        assert_relative_eq!(polyval(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_relative_eq!(polyval(&[], 2.0), 0.0);
    }

    #[test]
    fn test_polyder() {
        assert_eq!(polyder(&[1.0, 2.0, 3.0]), vec![2.0, 6.0]);
        assert!(polyder(&[5.0]).is_empty());
    }

    #[test]
    fn test_poly_sq_integral_constant() {
        // ∫₀² 3² = 18
        assert_relative_eq!(poly_sq_integral(&[3.0], 2.0), 18.0);
    }

    #[test]
    fn test_poly_sq_integral_linear() {
        // ∫₀¹ t² = 1/3
        assert_relative_eq!(poly_sq_integral(&[0.0, 1.0], 1.0), 1.0 / 3.0);
    }

    #[test]
    fn test_linear_root() {
        let r = real_roots(&[-6.0, 2.0]);
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r[0], 3.0);
    }

    #[test]
    fn test_quadratic_roots() {
        // (t-1)(t-4) = 4 - 5t + t²
        let mut r = real_roots(&[4.0, -5.0, 1.0]);
        r.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(r[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(r[1], 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_real_quadratic_roots() {
        assert!(real_roots(&[1.0, 0.0, 1.0]).is_empty());
    }

    #[test]
    fn test_sextic_roots() {
        // (t-2)(t+3)(t²+1)(t²+t+1) expanded:
        // roots at 2 and -3, four complex roots discarded
        let poly = {
            // multiply factors numerically
            let mut p = vec![1.0];
            for factor in [
                vec![-2.0, 1.0],
                vec![3.0, 1.0],
                vec![1.0, 0.0, 1.0],
                vec![1.0, 1.0, 1.0],
            ] {
                let mut q = vec![0.0; p.len() + factor.len() - 1];
                for (i, a) in p.iter().enumerate() {
                    for (j, b) in factor.iter().enumerate() {
                        q[i + j] += a * b;
                    }
                }
                p = q;
            }
            p
        };
        let mut r = real_roots(&poly);
        r.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(r.len(), 2);
        assert_relative_eq!(r[0], -3.0, epsilon = 1e-6);
        assert_relative_eq!(r[1], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_trailing_zero_trim() {
        // 2t - 6 with two zero leading coefficients
        let r = real_roots(&[-6.0, 2.0, 0.0, 0.0]);
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r[0], 3.0);
    }

    #[test]
    fn test_roots_in_interval() {
        let r = real_roots_in(&[4.0, -5.0, 1.0], 0.0, 2.0);
        assert_eq!(r.len(), 1);
        assert_relative_eq!(r[0], 1.0, epsilon = 1e-9);
    }
}
