// ⭕ Radius Scaler - area-proportional symbol sizing

use crate::error::InvalidRadiusInput;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const DEFAULT_SCALE_FACTOR: f64 = 0.4;

/// Added to every radius so zero-value symbols stay clickable.
pub const MIN_RADIUS: f64 = 3.0;

/// Maps an attribute value to a symbol radius so that symbol *area* grows
/// linearly with the value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusScaler {
    pub scale_factor: f64,
}

impl Default for RadiusScaler {
    fn default() -> Self {
        RadiusScaler {
            scale_factor: DEFAULT_SCALE_FACTOR,
        }
    }
}

impl RadiusScaler {
    pub fn new(scale_factor: f64) -> Self {
        RadiusScaler { scale_factor }
    }

    /// `sqrt(value * scale_factor / π) + 3`, or an error when the scaled
    /// area has no real square root (negative, NaN, infinite). A bad
    /// `scale_factor` fails the same way as a bad value.
    pub fn checked_radius(&self, value: f64) -> Result<f64, InvalidRadiusInput> {
        if !value.is_finite() || value < 0.0 {
            return Err(InvalidRadiusInput(value));
        }
        let area = value * self.scale_factor;
        if !area.is_finite() || area < 0.0 {
            return Err(InvalidRadiusInput(value));
        }
        Ok((area / PI).sqrt() + MIN_RADIUS)
    }

    /// Like [`checked_radius`](Self::checked_radius) but invalid input
    /// collapses to the minimum dot.
    pub fn radius(&self, value: f64) -> f64 {
        self.checked_radius(value).unwrap_or_else(|err| {
            tracing::trace!(%err, "clamping to minimum radius");
            MIN_RADIUS
        })
    }
}

/// Radius with the default scale factor.
pub fn radius(value: f64) -> f64 {
    RadiusScaler::default().radius(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_is_floor() {
        assert_eq!(radius(0.0), 3.0);
    }

    #[test]
    fn test_negative_is_degenerate_dot() {
        assert_eq!(radius(-5.0), 3.0);
        assert_eq!(
            RadiusScaler::default().checked_radius(-5.0),
            Err(InvalidRadiusInput(-5.0))
        );
    }

    #[test]
    fn test_non_finite_is_degenerate_dot() {
        assert_eq!(radius(f64::NAN), 3.0);
        assert_eq!(radius(f64::INFINITY), 3.0);
    }

    #[test]
    fn test_bad_scale_factor_is_degenerate_dot() {
        for factor in [-0.4, f64::NAN, f64::INFINITY] {
            let scaler = RadiusScaler::new(factor);
            assert_eq!(scaler.checked_radius(100.0), Err(InvalidRadiusInput(100.0)));
            assert_eq!(scaler.radius(100.0), MIN_RADIUS);
        }
        // 0 * ∞ is NaN
        assert_eq!(RadiusScaler::new(f64::INFINITY).radius(0.0), MIN_RADIUS);
    }

    #[test]
    fn test_known_value() {
        // sqrt(320 / π) + 3
        let r = radius(800.0);
        assert!((r - 13.092).abs() < 1e-3, "got {}", r);
    }

    #[test]
    fn test_custom_scale_factor() {
        let scaler = RadiusScaler::new(1.0);
        let expected = (100.0 / PI).sqrt() + 3.0;
        assert!((scaler.radius(100.0) - expected).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_monotonic_for_non_negative(a in 0.0f64..1e9, b in 0.0f64..1e9) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(radius(hi) >= radius(lo));
        }

        #[test]
        fn prop_never_nan(v in proptest::num::f64::ANY) {
            let r = radius(v);
            prop_assert!(!r.is_nan());
            prop_assert!(r >= MIN_RADIUS);
        }

        #[test]
        fn prop_never_nan_for_any_factor(factor in proptest::num::f64::ANY, v in proptest::num::f64::ANY) {
            let r = RadiusScaler::new(factor).radius(v);
            prop_assert!(!r.is_nan());
            prop_assert!(r >= MIN_RADIUS);
        }
    }
}
