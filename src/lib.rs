use std::path::Path;

pub mod answers;
pub mod binarize;
pub mod calibrate;
pub mod classify;
pub mod contour;
mod error;
pub mod grid;
pub mod identity;
mod result;
pub mod stats;
mod util;

use image::DynamicImage;
use tracing::instrument;

use binarize::binarize;
use calibrate::calibrate;
use classify::{annotate, classify, MarkSet};
use contour::{external_contours, filter_candidates, CandidateFilter};

pub use answers::decode_answers;
pub use classify::Mark;
pub use error::{Result, ScanError};
pub use identity::{decode_identity, format_identity, normalize_identity};
pub use result::*;

/// Gray level at or below which a pixel counts as ink.
pub const INK_THRESHOLD: u8 = 150;
/// Radius of the square closing kernel; 1 is a 3x3 kernel.
pub const CLOSING_RADIUS: u8 = 1;
/// Exclusive lower bound of a bubble's contour area, px².
pub const MIN_BUBBLE_AREA: f64 = 100.0;
/// Exclusive upper bound of a bubble's contour area, px².
pub const MAX_BUBBLE_AREA: f64 = 3000.0;
/// Exclusive lower bound on bounding-box width / height.
pub const MIN_ASPECT_RATIO: f64 = 0.7;
/// Exclusive upper bound on bounding-box width / height.
pub const MAX_ASPECT_RATIO: f64 = 1.3;
/// Minimum contour area over bounding-box area.
pub const MIN_EXTENT: f64 = 0.40;
/// Candidates below this fraction of the median area are discarded.
pub const DYNAMIC_AREA_RATIO: f64 = 0.70;
/// Ink density above which a bubble is marked.
pub const MARKED_DENSITY: f64 = 0.32;
/// Fraction of image height above which bubbles belong to the identity block.
pub const IDENTITY_SPLIT: f64 = 0.35;

/// Thresholds of the recognition pipeline.
///
/// The defaults are calibrated for the reference sheet at its scan
/// resolution. Area bounds scale with the square of the DPI, so callers
/// scanning other layouts or resolutions must either rescale the image or
/// adjust these values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeOptions {
    pub ink_threshold: u8,
    pub closing_radius: u8,
    pub min_area: f64,
    pub max_area: f64,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    pub min_extent: f64,
    pub dynamic_area_ratio: f64,
    pub marked_density: f64,
    pub identity_split: f64,
}

impl DecodeOptions {
    fn candidate_filter(&self) -> CandidateFilter {
        CandidateFilter {
            min_area: self.min_area,
            max_area: self.max_area,
            min_aspect_ratio: self.min_aspect_ratio,
            max_aspect_ratio: self.max_aspect_ratio,
            min_extent: self.min_extent,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_area >= 0.0 && self.min_area < self.max_area) {
            return Err(ScanError::config(format!(
                "area bounds must satisfy 0 <= min < max, got ({}, {})",
                self.min_area, self.max_area
            )));
        }
        if !(self.min_aspect_ratio > 0.0 && self.min_aspect_ratio < self.max_aspect_ratio) {
            return Err(ScanError::config(format!(
                "aspect ratio bounds must satisfy 0 < min < max, got ({}, {})",
                self.min_aspect_ratio, self.max_aspect_ratio
            )));
        }
        for (name, value) in [
            ("min_extent", self.min_extent),
            ("dynamic_area_ratio", self.dynamic_area_ratio),
            ("marked_density", self.marked_density),
            ("identity_split", self.identity_split),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScanError::config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            ink_threshold: INK_THRESHOLD,
            closing_radius: CLOSING_RADIUS,
            min_area: MIN_BUBBLE_AREA,
            max_area: MAX_BUBBLE_AREA,
            min_aspect_ratio: MIN_ASPECT_RATIO,
            max_aspect_ratio: MAX_ASPECT_RATIO,
            min_extent: MIN_EXTENT,
            dynamic_area_ratio: DYNAMIC_AREA_RATIO,
            marked_density: MARKED_DENSITY,
            identity_split: IDENTITY_SPLIT,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SheetReaderBuilder {
    options: DecodeOptions,
}

impl SheetReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn ink_threshold(mut self, threshold: u8) -> Self {
        self.options.ink_threshold = threshold;
        self
    }

    pub fn closing_radius(mut self, radius: u8) -> Self {
        self.options.closing_radius = radius;
        self
    }

    pub fn area_range(mut self, min: f64, max: f64) -> Self {
        self.options.min_area = min;
        self.options.max_area = max;
        self
    }

    pub fn aspect_ratio_range(mut self, min: f64, max: f64) -> Self {
        self.options.min_aspect_ratio = min;
        self.options.max_aspect_ratio = max;
        self
    }

    pub fn min_extent(mut self, extent: f64) -> Self {
        self.options.min_extent = extent;
        self
    }

    pub fn dynamic_area_ratio(mut self, ratio: f64) -> Self {
        self.options.dynamic_area_ratio = ratio;
        self
    }

    pub fn marked_density(mut self, density: f64) -> Self {
        self.options.marked_density = density;
        self
    }

    pub fn identity_split(mut self, fraction: f64) -> Self {
        self.options.identity_split = fraction;
        self
    }

    #[instrument(skip(self))]
    pub fn build(self) -> Result<SheetReader> {
        self.options.validate()?;
        Ok(SheetReader {
            options: self.options,
        })
    }
}

/// Reads answer sheets. Holds no state between calls, so one reader can be
/// shared across threads.
#[derive(Debug, Clone, Default)]
pub struct SheetReader {
    options: DecodeOptions,
}

impl SheetReader {
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn decode(&self, image: &DynamicImage) -> DecodedSheet {
        run(image, &self.options)
    }

    /// Decodes with per-call options, which are validated like the builder's.
    pub fn decode_with(
        &self,
        image: &DynamicImage,
        options: &DecodeOptions,
    ) -> Result<DecodedSheet> {
        options.validate()?;
        Ok(run(image, options))
    }

    /// Decodes an encoded image buffer, failing if it cannot be decoded.
    pub fn try_decode_bytes(&self, bytes: &[u8]) -> Result<DecodedSheet> {
        let image = image::load_from_memory(bytes)?;
        Ok(self.decode(&image))
    }

    pub fn try_decode_file(&self, path: impl AsRef<Path>) -> Result<DecodedSheet> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
            .into());
        }
        let image = image::open(path)?;
        Ok(self.decode(&image))
    }

    /// Like [`Self::try_decode_bytes`], but an unreadable buffer yields
    /// [`DecodedSheet::empty`].
    pub fn decode_bytes(&self, bytes: &[u8]) -> DecodedSheet {
        self.try_decode_bytes(bytes).unwrap_or_else(|err| {
            log::warn!("Could not read sheet image: {err}");
            DecodedSheet::empty()
        })
    }

    /// Like [`Self::try_decode_file`], but an unreadable file yields
    /// [`DecodedSheet::empty`].
    pub fn decode_file(&self, path: impl AsRef<Path>) -> DecodedSheet {
        let path = path.as_ref();
        self.try_decode_file(path).unwrap_or_else(|err| {
            log::warn!("Could not read sheet image {}: {err}", path.display());
            DecodedSheet::empty()
        })
    }
}

#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
fn run(image: &DynamicImage, options: &DecodeOptions) -> DecodedSheet {
    let mask = binarize(image, options.ink_threshold, options.closing_radius);
    let contours = external_contours(&mask);
    let candidates = filter_candidates(&contours, &options.candidate_filter());
    let candidates = calibrate(&candidates, options.dynamic_area_ratio);
    let marks = classify(&mask, &candidates, options.marked_density);
    let annotated = annotate(&image.to_rgb8(), &candidates, &marks);

    let split_y = image.height() as f64 * options.identity_split;
    let marks = MarkSet::partition(marks, split_y);
    log::debug!(
        "{} identity bubbles above y = {split_y:.1}, {} answer bubbles",
        marks.identity.len(),
        marks.answers.len()
    );

    DecodedSheet {
        identity: decode_identity(&marks.identity),
        answers: decode_answers(&marks.answers),
        marks,
        annotated: Some(annotated),
    }
}
