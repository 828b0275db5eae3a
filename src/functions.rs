pub fn mean(xs: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0;
    let mut total = 0.0;
    for x in xs {
        count += 1;
        total += x;
    }
    assert_ne!(count, 0);
    total / count as f64
}

/// Residual sum of squares of `ys` around their mean. Empty input yields `0.0`.
pub fn rss(ys: impl Iterator<Item = f64> + Clone) -> f64 {
    if ys.clone().next().is_none() {
        return 0.0;
    }
    let m = mean(ys.clone());
    ys.map(|y| (y - m).powi(2)).sum()
}

/// Mean of `(prediction - truth)^2` over `(prediction, truth)` pairs.
pub fn mean_squared_error(pairs: impl Iterator<Item = (f64, f64)>) -> f64 {
    mean(pairs.map(|(p, y)| (p - y).powi(2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_of_empty_is_zero() {
        assert_eq!(rss(std::iter::empty()), 0.0);
    }

    #[test]
    fn rss_is_zero_iff_constant() {
        assert_eq!(rss([3.5, 3.5, 3.5].iter().copied()), 0.0);
        assert_eq!(rss([7.0].iter().copied()), 0.0);
        assert!(rss([1.0, 2.0].iter().copied()) > 0.0);
    }

    #[test]
    fn rss_matches_hand_computation() {
        // mean = 25, deviations = -15, -5, 5, 15
        assert_eq!(rss([10.0, 20.0, 30.0, 40.0].iter().copied()), 500.0);
        assert!(rss([-1.0, 4.0, 0.5, 100.0].iter().copied()) >= 0.0);
    }

    #[test]
    fn mean_squared_error_works() {
        let pairs = [(1.0, 1.0), (2.0, 4.0), (0.0, -2.0)];
        assert_eq!(mean_squared_error(pairs.iter().copied()), 8.0 / 3.0);
        assert_eq!(mean_squared_error([(5.0, 5.0)].iter().copied()), 0.0);
    }

    #[test]
    fn mean_works() {
        assert_eq!(mean([1.0, 2.0, 3.0, 6.0].iter().copied()), 3.0);
    }
}
