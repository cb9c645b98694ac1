//! Response-latency curves.

use std::f64::consts::LN_2;

use infrank_core::weights::ResponseCurve;

/// Multiplier in `[0, 1]` for a median response latency.
///
/// Faster responses never score lower than slower ones. `hours` is expected
/// to be finite and non-negative; anything else is treated as the slowest
/// possible response.
pub fn response_factor(curve: ResponseCurve, hours: f64) -> f64 {
    if !hours.is_finite() || hours < 0.0 {
        return 0.0;
    }
    let factor = match curve {
        ResponseCurve::Linear { horizon_hours } => 1.0 - hours / horizon_hours,
        ResponseCurve::HalfLife { half_life_hours } => (-hours / half_life_hours * LN_2).exp(),
    };
    if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LINEAR: ResponseCurve = ResponseCurve::Linear { horizon_hours: 48.0 };
    const HALF_LIFE: ResponseCurve = ResponseCurve::HalfLife { half_life_hours: 12.0 };

    #[test]
    fn instant_response_is_full_credit() {
        assert_eq!(response_factor(LINEAR, 0.0), 1.0);
        assert_eq!(response_factor(HALF_LIFE, 0.0), 1.0);
    }

    #[test]
    fn linear_curve_points() {
        assert_eq!(response_factor(LINEAR, 6.0), 0.875);
        assert_eq!(response_factor(LINEAR, 24.0), 0.5);
        assert_eq!(response_factor(LINEAR, 48.0), 0.0);
        assert_eq!(response_factor(LINEAR, 500.0), 0.0);
    }

    #[test]
    fn half_life_halves() {
        assert!((response_factor(HALF_LIFE, 12.0) - 0.5).abs() < 1e-12);
        assert!((response_factor(HALF_LIFE, 24.0) - 0.25).abs() < 1e-12);
        assert!(response_factor(HALF_LIFE, 10_000.0) >= 0.0);
    }

    #[test]
    fn invalid_hours_earn_nothing() {
        assert_eq!(response_factor(LINEAR, f64::NAN), 0.0);
        assert_eq!(response_factor(LINEAR, -1.0), 0.0);
        assert_eq!(response_factor(HALF_LIFE, f64::INFINITY), 0.0);
    }

    proptest! {
        #[test]
        fn curves_bounded(hours in 0.0f64..1e9) {
            for curve in [LINEAR, HALF_LIFE] {
                let f = response_factor(curve, hours);
                prop_assert!((0.0..=1.0).contains(&f), "{curve:?} at {hours}h gave {f}");
            }
        }

        #[test]
        fn curves_non_increasing(a in 0.0f64..1e4, b in 0.0f64..1e4) {
            let (fast, slow) = if a <= b { (a, b) } else { (b, a) };
            for curve in [LINEAR, HALF_LIFE] {
                prop_assert!(response_factor(curve, fast) >= response_factor(curve, slow));
            }
        }
    }
}
