//! Price series to simple-return conversion.

use rd_types::{PriceSeries, ReturnSeries, RiskError, RiskResult};

/// Simple returns `price[i] / price[i-1] - 1` for consecutive observations.
///
/// A pair is dropped when the prior price is missing or non-positive, or the
/// current price is missing. Each return carries the timestamp of the later
/// observation so two assets can be aligned on it.
pub fn returns(series: &PriceSeries) -> RiskResult<ReturnSeries> {
    if series.len() < 2 {
        return Err(RiskError::insufficient("returns", 2, series.len()));
    }

    let points = series
        .points()
        .windows(2)
        .filter_map(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            if !prev.has_price() || prev.price <= 0.0 || !cur.has_price() {
                return None;
            }
            Some((cur.timestamp, cur.price / prev.price - 1.0))
        })
        .collect();

    Ok(ReturnSeries::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rd_types::AssetId;

    fn series(prices: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        PriceSeries::daily(AssetId::new("test"), start, prices)
    }

    #[test]
    fn length_is_one_less_than_prices() {
        for n in 2..12 {
            let prices: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
            let r = returns(&series(&prices)).unwrap();
            assert_eq!(r.len(), n - 1);
        }
    }

    #[test]
    fn known_returns() {
        let r = returns(&series(&[100.0, 102.0, 101.0, 105.0, 103.0])).unwrap();
        let expected = [0.02, -0.009_803_9, 0.039_604, -0.019_047_6];
        for (got, want) in r.values().iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{got} vs {want}");
        }
    }

    #[test]
    fn returns_are_keyed_by_later_timestamp() {
        let s = series(&[10.0, 11.0]);
        let r = returns(&s).unwrap();
        assert_eq!(r.points()[0].0, s.points()[1].timestamp);
    }

    #[test]
    fn zero_and_missing_prices_are_gaps() {
        let r = returns(&series(&[100.0, 0.0, 50.0, f64::NAN, 60.0, 66.0])).unwrap();
        // 100->0 is kept (-100%), 0->50 dropped, 50->NaN dropped, NaN->60 dropped.
        let values = r.values();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], -1.0);
        assert!((values[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn empty_and_single_point_series_fail() {
        assert!(matches!(
            returns(&PriceSeries::empty(AssetId::new("x"))),
            Err(RiskError::InsufficientData { available: 0, .. })
        ));
        assert!(matches!(
            returns(&series(&[100.0])),
            Err(RiskError::InsufficientData { available: 1, .. })
        ));
    }
}
