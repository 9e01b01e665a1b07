//! Pairwise Pearson correlation of return series.

use std::collections::HashMap;

use rd_types::{ReturnSeries, RiskError, RiskResult};

/// Correlation of two assets' returns over the timestamps both share.
///
/// Entries present in only one series, or non-finite on either side, are
/// discarded before the coefficient is computed.
pub fn correlation(a: &ReturnSeries, b: &ReturnSeries) -> RiskResult<f64> {
    let by_time: HashMap<_, f64> = b.points().iter().copied().collect();

    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .points()
        .iter()
        .filter_map(|(ts, x)| by_time.get(ts).map(|y| (*x, *y)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();

    pearson(&xs, &ys)
}

/// Pearson coefficient of two co-indexed slices of equal length.
pub fn pearson(xs: &[f64], ys: &[f64]) -> RiskResult<f64> {
    if xs.len() != ys.len() {
        return Err(RiskError::UndefinedCorrelation {
            reason: format!("series lengths differ ({} vs {})", xs.len(), ys.len()),
        });
    }
    let n = xs.len();
    if n < 2 {
        return Err(RiskError::UndefinedCorrelation {
            reason: format!("need at least 2 aligned points, got {n}"),
        });
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut sq_x = 0.0;
    let mut sq_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
        sq_x += x * x;
        sq_y += y * y;
    }

    // A constant series leaves only rounding residue relative to its magnitude.
    if var_x <= f64::EPSILON * sq_x || var_y <= f64::EPSILON * sq_y {
        return Err(RiskError::UndefinedCorrelation {
            reason: "one of the series has zero variance".to_string(),
        });
    }

    Ok((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn a() -> ReturnSeries {
        ReturnSeries::from_values(&[0.01, 0.02, -0.01, 0.03, 0.0])
    }

    fn b() -> ReturnSeries {
        ReturnSeries::from_values(&[0.02, 0.01, -0.02, 0.02, 0.01])
    }

    #[test]
    fn symmetric() {
        let ab = correlation(&a(), &b()).unwrap();
        let ba = correlation(&b(), &a()).unwrap();
        assert!((ab - ba).abs() < 1e-12);
        assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn self_correlation_is_one() {
        let c = correlation(&a(), &a()).unwrap();
        assert!((c - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_series_is_minus_one() {
        let neg = ReturnSeries::from_values(&[-0.01, -0.02, 0.01, -0.03, 0.0]);
        let c = correlation(&a(), &neg).unwrap();
        assert!((c + 1.0).abs() < 1e-12);
    }

    #[test]
    fn aligns_on_shared_timestamps() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let day = |i: i64| start + Duration::days(i);

        // Day 2 is missing from `y`, day 4 missing from `x`.
        let x = ReturnSeries::new(vec![(day(0), 0.01), (day(1), 0.02), (day(2), 0.5), (day(3), 0.03)]);
        let y = ReturnSeries::new(vec![(day(0), 0.02), (day(1), 0.04), (day(3), 0.06), (day(4), 0.9)]);

        let c = correlation(&x, &y).unwrap();
        assert!((c - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_variance_is_undefined() {
        let flat = ReturnSeries::from_values(&[0.0; 5]);
        assert!(matches!(
            correlation(&a(), &flat),
            Err(RiskError::UndefinedCorrelation { .. })
        ));
    }

    #[test]
    fn constant_nonzero_returns_are_undefined() {
        for value in [0.1, 0.01, -0.037, 1e-9] {
            let flat = ReturnSeries::from_values(&[value; 7]);
            assert!(
                matches!(
                    correlation(&a(), &flat),
                    Err(RiskError::UndefinedCorrelation { .. })
                ),
                "constant {value} produced a coefficient"
            );
            assert!(matches!(
                correlation(&flat, &a()),
                Err(RiskError::UndefinedCorrelation { .. })
            ));
        }
    }

    #[test]
    fn too_few_aligned_points_is_undefined() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let x = ReturnSeries::new(vec![(start, 0.01), (start + Duration::days(1), 0.02)]);
        let y = ReturnSeries::new(vec![(start, 0.03), (start + Duration::days(2), 0.01)]);
        assert!(matches!(
            correlation(&x, &y),
            Err(RiskError::UndefinedCorrelation { .. })
        ));
    }

    #[test]
    fn pearson_rejects_mismatched_lengths() {
        assert!(pearson(&[1.0, 2.0], &[1.0]).is_err());
    }
}
