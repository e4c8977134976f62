/// Arithmetic mean of the known values. `None` when no value is known.
pub fn mean_known<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));

    if n == 0 { None } else { Some(sum / n as f64) }
}

/// `count` per 100,000 of `population`. `None` when either side is unknown or
/// the population is not positive.
pub fn per_100k(count: Option<f64>, population: Option<f64>) -> Option<f64> {
    match (count, population) {
        (Some(c), Some(p)) if p > 0.0 => Some(c * 100_000.0 / p),
        _ => None,
    }
}
