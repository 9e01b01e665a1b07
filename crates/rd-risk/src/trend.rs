//! Ordinary-least-squares trend extrapolation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use rd_types::{PriceSeries, RiskError, RiskResult};

/// Disclaimer every consumer of a projection must surface.
pub const PROJECTION_ADVISORY: &str = "Linear extrapolation of the historical trend only. \
No confidence interval, mean reversion or seasonality is modelled; this is not a forecast \
and not financial advice.";

/// One extrapolated price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub timestamp: DateTime<Utc>,
    pub predicted_price: f64,
}

/// A fitted trend line together with its extrapolated points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendProjection {
    /// Fitted price at index 0.
    pub intercept: f64,
    /// Price change per observation index.
    pub slope: f64,
    pub points: Vec<ProjectionPoint>,
    pub advisory: String,
}

/// Fits `price = a + b·t` over the observation index `t = 0..n-1`.
pub struct TrendProjector;

impl TrendProjector {
    /// Fit the trend and extrapolate `horizon_days` daily points past the
    /// last observation.
    ///
    /// Missing prices are left out of the fit but still occupy their index.
    pub fn fit(prices: &PriceSeries, horizon_days: usize) -> RiskResult<TrendProjection> {
        if horizon_days < 1 {
            return Err(RiskError::invalid("horizon_days", "must be at least 1"));
        }

        let samples: Vec<(f64, f64)> = prices
            .points()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.has_price())
            .map(|(t, p)| (t as f64, p.price))
            .collect();
        if samples.len() < 2 {
            return Err(RiskError::insufficient("trend projection", 2, samples.len()));
        }
        let last = match prices.last_timestamp() {
            Some(ts) => ts,
            None => return Err(RiskError::insufficient("trend projection", 2, 0)),
        };

        let horizon_end = i64::try_from(horizon_days)
            .ok()
            .and_then(Duration::try_days)
            .and_then(|span| last.checked_add_signed(span));
        if horizon_end.is_none() {
            return Err(RiskError::invalid(
                "horizon_days",
                format!("{horizon_days} days past {last} is outside the supported date range"),
            ));
        }

        let (intercept, slope) = least_squares(&samples);
        let n = prices.len();

        let points = (0..horizon_days)
            // In range: bounded by `horizon_end`.
            .map(|k| ProjectionPoint {
                timestamp: last + Duration::days(k as i64 + 1),
                predicted_price: intercept + slope * (n + k) as f64,
            })
            .collect();

        Ok(TrendProjection {
            intercept,
            slope,
            points,
            advisory: PROJECTION_ADVISORY.to_string(),
        })
    }
}

/// Extrapolated points only; see [`TrendProjector::fit`].
pub fn project(prices: &PriceSeries, horizon_days: usize) -> RiskResult<Vec<ProjectionPoint>> {
    Ok(TrendProjector::fit(prices, horizon_days)?.points)
}

/// `(intercept, slope)` of the least-squares line through `samples`.
/// The `t` values are distinct, so the denominator is positive for 2+ samples.
fn least_squares(samples: &[(f64, f64)]) -> (f64, f64) {
    let n = samples.len() as f64;
    let mean_t = samples.iter().map(|(t, _)| t).sum::<f64>() / n;
    let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (sxy, sxx) = samples.iter().fold((0.0, 0.0), |(sxy, sxx), (t, y)| {
        let dt = t - mean_t;
        (sxy + dt * (y - mean_y), sxx + dt * dt)
    });

    let slope = sxy / sxx;
    (mean_y - slope * mean_t, slope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rd_types::{AssetId, PricePoint};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::daily(AssetId::new("bitcoin"), start(), prices)
    }

    #[test]
    fn perfect_line_is_extended() {
        let fit = TrendProjector::fit(&series(&[10.0, 12.0, 14.0, 16.0]), 3).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 10.0).abs() < 1e-12);

        let predicted: Vec<f64> = fit.points.iter().map(|p| p.predicted_price).collect();
        for (got, want) in predicted.iter().zip([18.0, 20.0, 22.0]) {
            assert!((got - want).abs() < 1e-9);
        }
        assert_eq!(fit.advisory, PROJECTION_ADVISORY);
    }

    #[test]
    fn horizon_length_and_daily_timestamps() {
        let s = series(&[100.0, 102.0, 101.0, 105.0, 103.0]);
        for h in [1, 7, 30] {
            let points = project(&s, h).unwrap();
            assert_eq!(points.len(), h);
            assert_eq!(points[0].timestamp, s.last_timestamp().unwrap() + Duration::days(1));
            for pair in points.windows(2) {
                assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::days(1));
            }
        }
    }

    #[test]
    fn flat_prices_project_flat() {
        let points = project(&series(&[50.0; 6]), 4).unwrap();
        assert!(points.iter().all(|p| (p.predicted_price - 50.0).abs() < 1e-9));
    }

    #[test]
    fn missing_prices_keep_their_index() {
        let s = series(&[10.0, f64::NAN, 14.0, 16.0]);
        let fit = TrendProjector::fit(&s, 1).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.points[0].predicted_price - 18.0).abs() < 1e-9);
    }

    #[test]
    fn timestamps_follow_irregular_history() {
        let points = vec![
            PricePoint::new(start(), 1.0, 0.0),
            PricePoint::new(start() + Duration::hours(36), 2.0, 0.0),
        ];
        let s = PriceSeries::new(AssetId::new("x"), points).unwrap();
        let projected = project(&s, 2).unwrap();
        assert_eq!(projected[0].timestamp, start() + Duration::hours(60));
    }

    #[test]
    fn zero_horizon_is_invalid() {
        assert!(matches!(
            project(&series(&[1.0, 2.0]), 0),
            Err(RiskError::InvalidParameter { name: "horizon_days", .. })
        ));
    }

    #[test]
    fn horizon_beyond_date_range_is_invalid() {
        let s = series(&[100.0, 101.0, 102.0]);
        for horizon in [100_000_000, usize::MAX] {
            assert!(matches!(
                project(&s, horizon),
                Err(RiskError::InvalidParameter { name: "horizon_days", .. })
            ));
        }
    }

    #[test]
    fn short_series_is_insufficient() {
        for prices in [vec![], vec![1.0]] {
            assert!(matches!(
                project(&series(&prices), 5),
                Err(RiskError::InsufficientData { .. })
            ));
        }
    }
}
