use float_ord::FloatOrd;

/// Upper median (`sorted[n / 2]`). `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.iter().copied().map(FloatOrd).collect::<Vec<_>>();
    sorted.sort();
    Some(sorted[sorted.len() / 2].0)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Differences between consecutive values, in the order given.
pub fn gaps(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Median of consecutive gaps. Needs at least two values.
pub fn median_gap(values: &[f64]) -> Option<f64> {
    median(&gaps(values))
}
