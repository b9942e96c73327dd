//! Real roots of real polynomials.

use accel_core::Candidates;
use nalgebra::DMatrix;

/// Imaginary parts below this (relative) threshold count as real.
const IMAG_TOLERANCE: f64 = 1e-8;
/// Roots closer than this (relative) are the same root.
const DEDUP_TOLERANCE: f64 = 1e-9;
const NEWTON_STEPS: usize = 4;

/// Evaluate a polynomial with coefficients in decreasing powers.
pub fn evaluate(coef: &[f64], x: f64) -> f64 {
    coef.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Evaluate a polynomial and its first derivative.
fn evaluate_with_derivative(coef: &[f64], x: f64) -> (f64, f64) {
    let mut p = 0.0;
    let mut dp = 0.0;
    for &c in coef {
        dp = dp * x + p;
        p = p * x + c;
    }
    (p, dp)
}

/// Distinct real roots of the polynomial with coefficients `coef`
/// (decreasing powers), in ascending order.
///
/// Complex roots are discarded. A constant polynomial has no roots, even
/// the zero polynomial. Degrees one and two are solved in closed form;
/// higher degrees use the eigenvalues of the companion matrix, polished
/// with a few Newton steps.
pub fn real_roots(coef: &[f64]) -> Candidates {
    let scale = coef.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Candidates::new();
    }
    // Only exact zeros lower the degree; a tiny leading term still owns a
    // (large) root.
    let start = coef.iter().position(|c| *c != 0.0).unwrap_or(coef.len());
    let mut trimmed = &coef[start..];

    let mut roots = Candidates::new();
    // Trailing zeros are roots at the origin.
    while trimmed.len() > 1 && trimmed[trimmed.len() - 1] == 0.0 {
        roots.push(0.0);
        trimmed = &trimmed[..trimmed.len() - 1];
    }

    match trimmed {
        [] | [_] => {}
        [a, b] => roots.push(-b / a),
        [a, b, c] => quadratic_roots(*a, *b, *c, &mut roots),
        _ => companion_roots(trimmed, &mut roots),
    }

    roots.sort_by(f64::total_cmp);
    dedup_roots(&mut roots);
    roots
}

fn quadratic_roots(a: f64, b: f64, c: f64, roots: &mut Candidates) {
    let disc = b * b - 4.0 * a * c;
    let tol = 1e-12 * (b * b).max((4.0 * a * c).abs());
    if disc.abs() <= tol {
        roots.push(-b / (2.0 * a));
    } else if disc > 0.0 {
        // Numerically stable form: avoids cancellation between -b and sqrt.
        let q = -0.5 * (b + b.signum() * disc.sqrt());
        roots.push(q / a);
        if q != 0.0 {
            roots.push(c / q);
        }
    }
}

fn companion_roots(coef: &[f64], roots: &mut Candidates) {
    let n = coef.len() - 1;
    let lead = coef[0];
    let mut companion = DMatrix::<f64>::zeros(n, n);
    for j in 0..n {
        companion[(0, j)] = -coef[j + 1] / lead;
    }
    for i in 1..n {
        companion[(i, i - 1)] = 1.0;
    }
    for eig in companion.complex_eigenvalues().iter() {
        if eig.im.abs() <= IMAG_TOLERANCE * eig.re.abs().max(1.0) {
            roots.push(polish(coef, eig.re));
        }
    }
}

fn polish(coef: &[f64], mut x: f64) -> f64 {
    for _ in 0..NEWTON_STEPS {
        let (p, dp) = evaluate_with_derivative(coef, x);
        if p == 0.0 || dp == 0.0 {
            break;
        }
        let next = x - p / dp;
        if !next.is_finite() {
            break;
        }
        x = next;
    }
    x
}

/// Remove near-duplicates from a sorted root list.
pub(crate) fn dedup_roots(roots: &mut Candidates) {
    roots.dedup_by(|b, a| (*b - *a).abs() <= DEDUP_TOLERANCE * a.abs().max(1.0));
}
