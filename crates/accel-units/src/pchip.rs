//! Piecewise cubic Hermite interpolating polynomial (PCHIP) conversion.

use accel_core::{Candidates, UnitsError};
use smallvec::smallvec;

use crate::roots::{dedup_roots, evaluate, real_roots};
use crate::unitconv::{ConversionCore, UnitConv};

/// Values this many ulps apart count as the same knot value.
const KNOT_ULPS: f64 = 4.0;
/// Extrapolated roots closer to an end knot than this fraction of the
/// piece width are that knot.
const EXTRAPOLATION_MARGIN: f64 = 1e-6;
/// Relative size below which a piece's cubic or quadratic term is dropped.
const NEGLIGIBLE_TERM: f64 = 1e-12;

/// A monotone cubic interpolant through `(x, y)` knots.
///
/// Slopes follow Fritsch & Butland: weighted harmonic means of the
/// neighbouring secants in the interior, zero at local extrema, and a
/// one-sided three-point estimate at the ends, clamped to preserve
/// monotonicity. Outside the knot range the end pieces are extrapolated.
#[derive(Clone, Debug)]
pub struct Pchip {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl Pchip {
    /// Build the interpolant. `x` must be strictly increasing.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, UnitsError> {
        if x.len() != y.len() {
            return Err(UnitsError::InvalidModel {
                reason: format!("{} x knots but {} y knots", x.len(), y.len()),
            });
        }
        if x.len() < 2 {
            return Err(UnitsError::InvalidModel {
                reason: "at least two knots are required".into(),
            });
        }
        if x.iter().chain(&y).any(|v| !v.is_finite()) {
            return Err(UnitsError::InvalidModel {
                reason: "knots must be finite".into(),
            });
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(UnitsError::InvalidModel {
                reason: format!("x knots {x:?} must be strictly increasing"),
            });
        }
        let slopes = find_slopes(&x, &y);
        Ok(Self { x, y, slopes })
    }

    /// The x knots.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// The y knots.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Index of the piece used to evaluate at `x`.
    fn piece(&self, x: f64) -> usize {
        let last = self.x.len() - 2;
        // Number of interior knots at or below x.
        self.x[1..=last].partition_point(|&k| k <= x).min(last)
    }

    /// Evaluate the interpolant at `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        let k = self.piece(x);
        let h = self.x[k + 1] - self.x[k];
        let s = (x - self.x[k]) / h;
        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        h00 * self.y[k] + h10 * h * self.slopes[k] + h01 * self.y[k + 1] + h11 * h * self.slopes[k + 1]
    }

    /// Cubic coefficients of piece `k` in the local offset `t = x - x[k]`,
    /// decreasing powers. Terms that cannot move the piece by more than
    /// rounding noise over its width are dropped.
    fn piece_coefficients(&self, k: usize) -> [f64; 4] {
        let h = self.x[k + 1] - self.x[k];
        let m = (self.y[k + 1] - self.y[k]) / h;
        let (d0, d1) = (self.slopes[k], self.slopes[k + 1]);
        let mut c3 = (d0 + d1 - 2.0 * m) / (h * h);
        let mut c2 = (3.0 * m - 2.0 * d0 - d1) / h;
        let span = d0.abs() * h + c2.abs() * h * h + c3.abs() * h * h * h;
        if c3.abs() * h * h * h <= NEGLIGIBLE_TERM * span {
            c3 = 0.0;
        }
        if c2.abs() * h * h <= NEGLIGIBLE_TERM * span {
            c2 = 0.0;
        }
        [c3, c2, d0, self.y[k]]
    }

    /// Every `x` where the interpolant equals `target`, ascending and
    /// deduplicated. The end pieces contribute extrapolated roots.
    ///
    /// A target on a knot value yields that knot exactly. Each piece is
    /// monotone, so a piece whose end values bracket the target holds
    /// exactly one crossing, found by bisection.
    pub fn solve(&self, target: f64) -> Candidates {
        let pieces = self.x.len() - 1;
        let mut roots: Candidates = self
            .x
            .iter()
            .zip(&self.y)
            .filter(|(_, y)| same_value(**y, target))
            .map(|(x, _)| *x)
            .collect();
        for k in 0..pieces {
            let h = self.x[k + 1] - self.x[k];
            let coef = self.piece_coefficients(k);
            let (y0, y1) = (self.y[k], self.y[k + 1]);
            let on_knot = same_value(y0, target) || same_value(y1, target);
            if !on_knot && (y0 < target) != (y1 < target) {
                roots.push(self.x[k] + bisect(&coef, h, target));
            }

            let margin = EXTRAPOLATION_MARGIN * h;
            let first = k == 0;
            let last = k == pieces - 1;
            if first || last {
                let mut shifted = coef;
                shifted[3] -= target;
                for t in real_roots(&shifted) {
                    if (first && t < -margin) || (last && t > h + margin) {
                        roots.push(self.x[k] + t);
                    }
                }
            }
        }
        roots.sort_by(f64::total_cmp);
        dedup_roots(&mut roots);
        roots
    }
}

/// Whether `a` and `b` differ by no more than a few ulps.
fn same_value(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= KNOT_ULPS * f64::EPSILON * a.abs().max(b.abs())
}

/// Offset in `[0, h]` where the cubic `coef` crosses `target`, given that
/// its values at the two ends lie on opposite sides of it.
fn bisect(coef: &[f64], h: f64, target: f64) -> f64 {
    let below_at_start = evaluate(coef, 0.0) < target;
    let (mut lo, mut hi) = (0.0, h);
    loop {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            return mid;
        }
        if (evaluate(coef, mid) < target) == below_at_start {
            lo = mid;
        } else {
            hi = mid;
        }
    }
}

fn find_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let m: Vec<f64> = y
        .windows(2)
        .zip(&h)
        .map(|(w, h)| (w[1] - w[0]) / h)
        .collect();
    if m.len() == 1 {
        return vec![m[0], m[0]];
    }
    let n = x.len();
    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        let (m0, m1) = (m[k - 1], m[k]);
        if m0 == 0.0 || m1 == 0.0 || m0.signum() != m1.signum() {
            continue;
        }
        let w1 = 2.0 * h[k] + h[k - 1];
        let w2 = h[k] + 2.0 * h[k - 1];
        d[k] = (w1 + w2) / (w1 / m0 + w2 / m1);
    }
    d[0] = edge_slope(h[0], h[1], m[0], m[1]);
    d[n - 1] = edge_slope(h[n - 2], h[n - 3], m[n - 2], m[n - 3]);
    d
}

fn edge_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

/// Three-valued sign: zero maps to zero.
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Converts through a monotone cubic interpolant of calibration data.
///
/// `x` knots are engineering values and `y` knots physics values. Unless
/// limits are set explicitly they default to the first and last `x` knot,
/// so extrapolation is disallowed out of the box.
///
/// # Examples
///
/// ```
/// use accel_units::{PchipUnitConv, UnitConv};
///
/// let uc = PchipUnitConv::new(vec![1.0, 3.0], vec![1.0, 3.0]).unwrap();
/// assert_eq!(uc.eng_to_phys(2.0).unwrap(), 2.0);
/// assert!(uc.eng_to_phys(4.0).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct PchipUnitConv {
    core: ConversionCore,
    pp: Pchip,
}

impl PchipUnitConv {
    /// Build from knots.
    ///
    /// Returns [`UnitsError::InvalidModel`] if `x` is not strictly
    /// increasing or `y` is not strictly monotonic (increasing or
    /// decreasing).
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, UnitsError> {
        let pp = Pchip::new(x, y)?;
        let increasing = pp.y.windows(2).all(|w| w[1] > w[0]);
        let decreasing = pp.y.windows(2).all(|w| w[1] < w[0]);
        if !(increasing || decreasing) {
            return Err(UnitsError::InvalidModel {
                reason: format!(
                    "y knots {:?} must be monotonically increasing or decreasing",
                    pp.y
                ),
            });
        }
        let mut core = ConversionCore::new();
        core.set_limits(pp.x.first().copied(), pp.x.last().copied())?;
        Ok(Self { core, pp })
    }

    /// The underlying interpolant.
    pub fn interpolant(&self) -> &Pchip {
        &self.pp
    }
}

impl UnitConv for PchipUnitConv {
    fn type_name(&self) -> &'static str {
        "PchipUnitConv"
    }

    fn core(&self) -> &ConversionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ConversionCore {
        &mut self.core
    }

    fn raw_eng_to_phys(&self, value: f64) -> Candidates {
        smallvec![self.pp.evaluate(value)]
    }

    fn raw_phys_to_eng(&self, value: f64) -> Candidates {
        self.pp.solve(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_core::Units;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn round4(v: f64) -> f64 {
        (v * 1e4).round() / 1e4
    }

    #[test]
    fn two_points_to_physics() {
        let uc = PchipUnitConv::new(vec![1.0, 3.0], vec![1.0, 3.0]).unwrap();
        assert_eq!(uc.eng_to_phys(1.0).unwrap(), 1.0);
        assert_eq!(uc.eng_to_phys(2.0).unwrap(), 2.0);
        assert_eq!(uc.eng_to_phys(3.0).unwrap(), 3.0);
    }

    #[test]
    fn three_points_to_physics() {
        let uc = PchipUnitConv::new(vec![1.0, 3.0, 5.0], vec![1.0, 3.0, 6.0]).unwrap();
        assert_eq!(uc.eng_to_phys(1.0).unwrap(), 1.0);
        assert_eq!(round4(uc.eng_to_phys(2.0).unwrap()), 1.8875);
        assert_eq!(uc.eng_to_phys(3.0).unwrap(), 3.0);
        assert_eq!(round4(uc.eng_to_phys(4.0).unwrap()), 4.3625);
        assert_eq!(uc.eng_to_phys(5.0).unwrap(), 6.0);
    }

    #[test]
    fn two_points_to_machine() {
        let uc = PchipUnitConv::new(vec![1.0, 3.0], vec![1.0, 3.0]).unwrap();
        assert_eq!(uc.phys_to_eng(1.0).unwrap(), 1.0);
        assert_eq!(uc.phys_to_eng(1.5).unwrap(), 1.5);
    }

    #[test]
    fn three_points_inverse_matches_forward() {
        let uc = PchipUnitConv::new(vec![1.0, 3.0, 5.0], vec![1.0, 3.0, 6.0]).unwrap();
        for eng in [1.0, 1.5, 2.0, 3.0, 4.0, 4.75, 5.0] {
            let phys = uc.eng_to_phys(eng).unwrap();
            let back = uc.phys_to_eng(phys).unwrap();
            assert!((back - eng).abs() < 1e-9, "{eng} -> {phys} -> {back}");
        }
    }

    #[test]
    fn x_not_increasing_rejected() {
        assert!(PchipUnitConv::new(vec![1.0, 3.0, 2.0], vec![1.0, 2.0, 3.0]).is_err());
        assert!(PchipUnitConv::new(vec![-1.0, -2.0, -3.0], vec![-1.0, -2.0, -3.0]).is_err());
    }

    #[test]
    fn y_not_monotonic_rejected() {
        let err = PchipUnitConv::new(vec![1.0, 2.0, 3.0], vec![1.0, 3.0, 2.0]).unwrap_err();
        assert!(matches!(err, UnitsError::InvalidModel { .. }));
    }

    #[test]
    fn decreasing_y_accepted() {
        let uc = PchipUnitConv::new(vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]).unwrap();
        assert_eq!(uc.eng_to_phys(2.0).unwrap(), -2.0);
        assert!((uc.phys_to_eng(-2.5).unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn malformed_knots_rejected() {
        assert!(PchipUnitConv::new(vec![1.0], vec![1.0]).is_err());
        assert!(PchipUnitConv::new(vec![1.0, 2.0], vec![1.0]).is_err());
        assert!(PchipUnitConv::new(vec![1.0, f64::INFINITY], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn limits_default_to_knot_range() {
        let uc = PchipUnitConv::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(
            uc.get_conversion_limits(Units::Eng).unwrap(),
            (Some(1.0), Some(3.0))
        );
        assert!(uc.eng_to_phys(0.5).is_err());
        assert!(uc.eng_to_phys(3.5).is_err());
    }

    #[test]
    fn solution_outside_bounds_rejected() {
        // Linear, but the root is 0, outside the calibrated range.
        let uc = PchipUnitConv::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]).unwrap();
        let err = uc.phys_to_eng(0.0).unwrap_err();
        assert!(matches!(err, UnitsError::NoSolutionWithinLimits { .. }));
    }

    #[test]
    fn widened_limits_allow_extrapolation() {
        let uc = PchipUnitConv::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_limits(Some(-1.0), None)
            .unwrap();
        assert!(uc.phys_to_eng(0.0).unwrap().abs() < 1e-12);
        assert!((uc.eng_to_phys(4.0).unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn additional_functions_applied() {
        let uc = PchipUnitConv::new(vec![2.0, 4.0], vec![2.0, 4.0])
            .unwrap()
            .with_transforms(Arc::new(|v| v * 2.0), Arc::new(|v| v / 2.0));
        assert_eq!(uc.eng_to_phys(2.0).unwrap(), 4.0);
        assert_eq!(uc.eng_to_phys(3.0).unwrap(), 6.0);
        assert_eq!(uc.phys_to_eng(4.0).unwrap(), 2.0);
        assert_eq!(uc.phys_to_eng(6.0).unwrap(), 3.0);
    }

    #[test]
    fn knot_roots_not_duplicated() {
        let pp = Pchip::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 4.0, 9.0]).unwrap();
        let in_range: Vec<f64> = pp
            .solve(1.0)
            .into_iter()
            .filter(|r| (0.0..=3.0).contains(r))
            .collect();
        assert_eq!(in_range, vec![1.0]);

        let uc = PchipUnitConv::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 4.0, 9.0]).unwrap();
        assert_eq!(uc.phys_to_eng(1.0).unwrap(), 1.0);
        assert_eq!(uc.phys_to_eng(9.0).unwrap(), 3.0);
    }

    #[test]
    fn extrapolated_end_pieces_contribute_roots() {
        let pp = Pchip::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 4.0, 9.0]).unwrap();
        // The first piece, extended to the left, crosses 1.0 again at 1 - sqrt(3).
        let roots = pp.solve(1.0);
        assert!(roots.iter().any(|r| (r - (1.0 - 3f64.sqrt())).abs() < 1e-9), "{roots:?}");
    }

    #[test]
    fn flat_segment_gets_zero_slope() {
        let pp = Pchip::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 1.0]).unwrap();
        assert_eq!(pp.slopes[1], 0.0);
        // Monotone: never overshoots the plateau.
        for i in 0..=20 {
            let v = pp.evaluate(i as f64 / 10.0);
            assert!(v <= 1.0 + 1e-12, "{v}");
        }
    }

    #[test]
    fn end_knots_invert_exactly_with_flat_end_slope() {
        let uc = PchipUnitConv::new(vec![0.0, 2.0, 5.0, 9.0], vec![0.0, 0.37, 3.55, 3.75]).unwrap();
        let slopes = &uc.interpolant().slopes;
        assert_eq!(slopes[slopes.len() - 1], 0.0);
        assert_eq!(uc.eng_to_phys(9.0).unwrap(), 3.75);
        assert_eq!(uc.phys_to_eng(3.75).unwrap(), 9.0);
        assert_eq!(uc.phys_to_eng(0.0).unwrap(), 0.0);
        // Just inside the flat end the crossing is still unique.
        let near_end = uc.eng_to_phys(8.999).unwrap();
        assert!((uc.phys_to_eng(near_end).unwrap() - 8.999).abs() < 1e-9);
    }

    #[test]
    fn decreasing_end_knots_invert_exactly() {
        let uc = PchipUnitConv::new(vec![0.0, 2.0, 5.0, 9.0], vec![5.0, 4.0, 1.0, 0.0]).unwrap();
        assert_eq!(uc.phys_to_eng(5.0).unwrap(), 0.0);
        assert_eq!(uc.phys_to_eng(0.0).unwrap(), 9.0);
        assert_eq!(uc.phys_to_eng(4.0).unwrap(), 2.0);
    }

    proptest! {
        #[test]
        fn increasing_knots_round_trip(
            steps in prop::collection::vec((0.1f64..3.0, 0.1f64..3.0), 2..8),
            frac in 0.0f64..1.0,
        ) {
            let mut x = vec![0.0];
            let mut y = vec![0.0];
            for (dx, dy) in &steps {
                x.push(x.last().unwrap() + dx);
                y.push(y.last().unwrap() + dy);
            }
            let uc = PchipUnitConv::new(x.clone(), y).unwrap();
            let eng = x[0] + frac * (x[x.len() - 1] - x[0]);
            let phys = uc.eng_to_phys(eng).unwrap();
            let back = uc.phys_to_eng(phys).unwrap();
            // Near a flat end the inverse is ill-conditioned, so compare in
            // physics units.
            let residual = uc.eng_to_phys(back).unwrap() - phys;
            prop_assert!(residual.abs() < 1e-10 * phys.abs().max(1.0), "{eng} -> {phys} -> {back}");
        }

        #[test]
        fn end_knots_round_trip_exactly(
            steps in prop::collection::vec((0.1f64..3.0, 0.01f64..3.0), 2..8),
        ) {
            let mut x = vec![0.0];
            let mut y = vec![0.0];
            for (dx, dy) in &steps {
                x.push(x.last().unwrap() + dx);
                y.push(y.last().unwrap() + dy);
            }
            let uc = PchipUnitConv::new(x.clone(), y.clone()).unwrap();
            for (xk, yk) in x.iter().zip(&y) {
                prop_assert_eq!(uc.eng_to_phys(*xk).unwrap(), *yk);
                prop_assert_eq!(uc.phys_to_eng(*yk).unwrap(), *xk);
            }
        }
    }
}
