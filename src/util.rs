use geo::{Area, BoundingRect, Coord, LineString, Polygon};
use image::{imageops, GrayImage};
use imageproc::{point::Point, rect::Rect};

pub(crate) fn to_geo_poly(points: &[Point<i32>]) -> Polygon<f64> {
    let points = points
        .iter()
        .map(|point| Coord {
            x: point.x as f64,
            y: point.y as f64,
        })
        .collect();
    Polygon::new(LineString::new(points), vec![])
}

/// Shoelace area of the polygon through the contour's border pixels.
pub(crate) fn contour_area(poly: &Polygon<f64>) -> f64 {
    poly.unsigned_area()
}

/// Pixel-inclusive bounding box, so a single-pixel contour is 1x1.
pub(crate) fn pixel_bounds(poly: &Polygon<f64>) -> Option<Rect> {
    let bounds = poly.bounding_rect()?;
    let min = bounds.min();
    let width = bounds.width() as u32 + 1;
    let height = bounds.height() as u32 + 1;
    Some(Rect::at(min.x as i32, min.y as i32).of_size(width, height))
}

/// Number of foreground pixels inside `rect`, clamped to the mask.
pub(crate) fn count_foreground(mask: &GrayImage, rect: &Rect) -> u32 {
    let x = (rect.left().max(0) as u32).min(mask.width());
    let y = (rect.top().max(0) as u32).min(mask.height());
    let width = rect.width().min(mask.width() - x);
    let height = rect.height().min(mask.height() - y);
    log::trace!("Counting ink in {rect:?}");
    imageops::crop_imm(mask, x, y, width, height)
        .to_image()
        .pixels()
        .filter(|pixel| pixel.0[0] > 0)
        .count() as u32
}
