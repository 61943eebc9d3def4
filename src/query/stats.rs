//! Small numeric helpers shared by the query handlers.
//!
//! Undefined values (non-finite inputs, zero denominators) are skipped the
//! way a dataframe skips missing cells, so an aggregate is `None` only when
//! nothing defined remains.

pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Sample standard deviation (n - 1 denominator). Needs two defined values.
pub fn sample_std<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let values: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if values.len() < 2 {
        return None;
    }

    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;

    Some(variance.sqrt())
}

/// Period-over-period fractional change. The first element has no
/// predecessor and is dropped.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter_map(|w| ratio(w[1] - w[0], w[0]))
        .collect()
}

/// `num / den`, or `None` when the quotient is undefined.
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    let value = num / den;
    value.is_finite().then_some(value)
}
