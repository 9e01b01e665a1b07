//! Historical (empirical) Value-at-Risk.

use rd_types::{ReturnSeries, RiskError, RiskResult};

/// Confidence level used for the daily VaR reported per asset.
pub const DEFAULT_VAR_CONFIDENCE: f64 = 0.95;

/// One-period VaR in percent: the absolute `(1 - confidence)` quantile of
/// the returns, interpolating linearly between order statistics.
pub fn value_at_risk(returns: &ReturnSeries, confidence: f64) -> RiskResult<f64> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(RiskError::invalid(
            "confidence",
            format!("must lie in (0, 1), got {confidence}"),
        ));
    }
    if returns.is_empty() {
        return Err(RiskError::insufficient("value at risk", 1, 0));
    }

    let mut sorted = returns.values();
    sorted.sort_by(f64::total_cmp);

    Ok((quantile(&sorted, 1.0 - confidence) * 100.0).abs())
}

/// `q`-quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
