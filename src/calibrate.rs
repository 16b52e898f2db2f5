use tracing::instrument;

use crate::{contour::Candidate, stats::median};

/// Drops candidates smaller than `ratio` times the median candidate area.
///
/// Stray text fragments survive the absolute area filter at some scan
/// resolutions; bubbles dominate the population, so the median tracks
/// their size.
#[instrument(level = "debug", skip(candidates))]
pub fn calibrate(candidates: &[Candidate], ratio: f64) -> Vec<Candidate> {
    let areas = candidates.iter().map(|it| it.area).collect::<Vec<_>>();
    let Some(median_area) = median(&areas) else {
        return Vec::new();
    };
    let min_area = median_area * ratio;
    let kept = candidates
        .iter()
        .filter(|it| it.area >= min_area)
        .copied()
        .collect::<Vec<_>>();
    log::debug!(
        "Median candidate area {median_area:.1}, minimum {min_area:.1}: kept {} of {}",
        kept.len(),
        candidates.len()
    );
    kept
}
