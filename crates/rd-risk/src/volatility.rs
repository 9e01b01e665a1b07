//! Historical volatility.

use serde::{Deserialize, Serialize};

use rd_types::{ReturnSeries, RiskError, RiskResult};

/// Trading days per year used to annualise daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Sampling interval of a return series, which fixes its annualisation factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SamplingCadence {
    /// One observation per trading day (252 per year).
    Daily,
    /// 52 observations per year.
    Weekly,
    /// 12 observations per year.
    Monthly,
    /// Any other cadence, given as observations per year.
    PeriodsPerYear(f64),
}

impl SamplingCadence {
    pub fn periods_per_year(&self) -> f64 {
        match self {
            SamplingCadence::Daily => TRADING_DAYS_PER_YEAR,
            SamplingCadence::Weekly => 52.0,
            SamplingCadence::Monthly => 12.0,
            SamplingCadence::PeriodsPerYear(n) => *n,
        }
    }
}

impl Default for SamplingCadence {
    fn default() -> Self {
        SamplingCadence::Daily
    }
}

/// Sample standard deviation (ddof = 1) of the returns, in percent.
///
/// With `annualize` the result is scaled by `sqrt(252)`, which assumes the
/// returns are daily. Use [`volatility_with_cadence`] for anything else.
pub fn volatility(returns: &ReturnSeries, annualize: bool) -> RiskResult<f64> {
    let per_period = sample_std(&returns.values())?;
    let scale = if annualize {
        TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        1.0
    };
    Ok(per_period * scale * 100.0)
}

/// Annualised volatility in percent for returns sampled at `cadence`.
pub fn volatility_with_cadence(returns: &ReturnSeries, cadence: SamplingCadence) -> RiskResult<f64> {
    let periods = cadence.periods_per_year();
    if !periods.is_finite() || periods <= 0.0 {
        return Err(RiskError::invalid(
            "cadence",
            format!("periods per year must be positive, got {periods}"),
        ));
    }
    Ok(sample_std(&returns.values())? * periods.sqrt() * 100.0)
}

fn sample_std(values: &[f64]) -> RiskResult<f64> {
    let n = values.len();
    if n < 2 {
        return Err(RiskError::insufficient("volatility", 2, n));
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Ok((ss / (n - 1) as f64).sqrt())
}
