//! Win-probability model: logistic transform from a centipawn evaluation to
//! an expected-score percentage.

/// Scale factor of the logistic curve, tuned so that +100cp is roughly a
/// 60% expected score.
const LOGISTIC_SCALE: f64 = 0.004;

/// Expected score for the side the evaluation favors, in percent.
///
/// Strictly increasing in `cp`, exactly 50.0 at 0, asymptotic to 0 and 100.
pub fn win_probability(cp: i32) -> f64 {
    50.0 + 50.0 * (2.0 / (1.0 + (-LOGISTIC_SCALE * f64::from(cp)).exp()) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn even_position_is_fifty_percent() {
        assert_eq!(win_probability(0), 50.0);
    }

    #[test]
    fn saturates_at_the_extremes() {
        assert!(win_probability(10_000) > 99.0);
        assert!(win_probability(-10_000) < 1.0);
    }

    #[test]
    fn symmetric_around_even() {
        for cp in [1, 50, 300, 1200] {
            let up = win_probability(cp) - 50.0;
            let down = 50.0 - win_probability(-cp);
            assert!((up - down).abs() < 1e-9, "asymmetry at {cp}");
        }
    }

    proptest! {
        #[test]
        fn monotonically_non_decreasing(cp in -30_000i32..30_000) {
            prop_assert!(win_probability(cp) <= win_probability(cp + 1));
        }

        #[test]
        fn stays_in_range(cp in i32::MIN..i32::MAX) {
            let p = win_probability(cp);
            prop_assert!((0.0..=100.0).contains(&p));
        }
    }
}
