use image::{imageops, GrayImage};
use imageproc::{
    contours::{find_contours, BorderType, Contour},
    rect::Rect,
};
use tracing::instrument;

use crate::util::{contour_area, pixel_bounds, to_geo_poly};

/// A contour that passed the geometric pre-filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Contour area in px².
    pub area: f64,
    pub rect: Rect,
    /// `area / (width * height)`.
    pub extent: f64,
}

/// Geometric bounds a contour must satisfy to be considered a bubble.
/// All bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFilter {
    pub min_area: f64,
    pub max_area: f64,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    pub min_extent: f64,
}

impl CandidateFilter {
    fn measure(&self, contour: &Contour<i32>) -> Option<Candidate> {
        let poly = to_geo_poly(&contour.points);
        let area = contour_area(&poly);
        if area <= self.min_area || area >= self.max_area {
            return None;
        }
        let rect = pixel_bounds(&poly)?;
        let aspect_ratio = rect.width() as f64 / rect.height() as f64;
        if aspect_ratio <= self.min_aspect_ratio || aspect_ratio >= self.max_aspect_ratio {
            return None;
        }
        let extent = area / (rect.width() * rect.height()) as f64;
        if extent <= self.min_extent {
            return None;
        }
        Some(Candidate { area, rect, extent })
    }
}

/// Outermost borders of every ink region; holes and nested regions are skipped.
///
/// The mask is traced inside a one pixel background frame, so ink touching the
/// image edge is still an outer border and never becomes the parent of the
/// regions traced after it.
#[instrument(level = "debug", skip(mask))]
pub fn external_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    let mut framed = GrayImage::new(mask.width() + 2, mask.height() + 2);
    imageops::replace(&mut framed, mask, 1, 1);
    let contours = find_contours::<i32>(&framed)
        .into_iter()
        .filter(|it| it.border_type == BorderType::Outer && it.parent.is_none())
        .map(|mut it| {
            for point in it.points.iter_mut() {
                point.x -= 1;
                point.y -= 1;
            }
            it
        })
        .collect::<Vec<_>>();
    log::debug!("Found {} external contours", contours.len());
    contours
}

#[instrument(level = "debug", skip(contours))]
pub fn filter_candidates(contours: &[Contour<i32>], filter: &CandidateFilter) -> Vec<Candidate> {
    let candidates = contours
        .iter()
        .filter(|it| it.points.len() > 2)
        .filter_map(|it| filter.measure(it))
        .collect::<Vec<_>>();
    log::debug!(
        "{} of {} contours kept as bubble candidates",
        candidates.len(),
        contours.len()
    );
    candidates
}
