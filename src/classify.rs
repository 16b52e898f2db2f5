use image::{GrayImage, Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use tracing::instrument;

use crate::{contour::Candidate, util::count_foreground};

const MARKED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const UNMARKED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// One classified bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mark {
    /// Integer center of the bounding box, in image pixels.
    pub x: f64,
    pub y: f64,
    /// Contour area in px².
    pub area: f64,
    /// Fraction of ink pixels inside the bounding box.
    pub density: f64,
    pub marked: bool,
}

impl Mark {
    pub fn new(x: f64, y: f64, area: f64, density: f64, marked_density: f64) -> Self {
        Self {
            x,
            y,
            area,
            density,
            marked: density > marked_density,
        }
    }
}

/// Marks split by vertical position into the identity block (top of the
/// sheet) and the answer block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkSet {
    pub identity: Vec<Mark>,
    pub answers: Vec<Mark>,
}

impl MarkSet {
    /// Marks with `y < split_y` go to the identity subset, the rest to answers.
    pub fn partition(marks: impl IntoIterator<Item = Mark>, split_y: f64) -> Self {
        let (identity, answers) = marks.into_iter().partition(|mark| mark.y < split_y);
        Self { identity, answers }
    }

    pub fn len(&self) -> usize {
        self.identity.len() + self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.identity.iter().chain(self.answers.iter())
    }
}

#[instrument(level = "debug", skip(mask, candidates))]
pub fn classify(mask: &GrayImage, candidates: &[Candidate], marked_density: f64) -> Vec<Mark> {
    let marks = candidates
        .iter()
        .map(|candidate| {
            let rect = candidate.rect;
            let ink = count_foreground(mask, &rect);
            let density = ink as f64 / (rect.width() * rect.height()) as f64;
            let x = rect.left() + rect.width() as i32 / 2;
            let y = rect.top() + rect.height() as i32 / 2;
            Mark::new(x as f64, y as f64, candidate.area, density, marked_density)
        })
        .collect::<Vec<_>>();
    log::debug!(
        "{} of {} bubbles marked",
        marks.iter().filter(|it| it.marked).count(),
        marks.len()
    );
    marks
}

/// Copy of `image` with a green box over every marked bubble and a red box
/// over every unmarked one.
pub fn annotate(image: &RgbImage, candidates: &[Candidate], marks: &[Mark]) -> RgbImage {
    let mut canvas = image.clone();
    for (candidate, mark) in candidates.iter().zip(marks) {
        let color = if mark.marked {
            MARKED_COLOR
        } else {
            UNMARKED_COLOR
        };
        let rect = candidate.rect;
        draw_hollow_rect_mut(&mut canvas, rect, color);
        if rect.width() > 2 && rect.height() > 2 {
            let inner = Rect::at(rect.left() + 1, rect.top() + 1)
                .of_size(rect.width() - 2, rect.height() - 2);
            draw_hollow_rect_mut(&mut canvas, inner, color);
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;

    use super::*;

    fn candidate(x: i32, y: i32) -> Candidate {
        Candidate {
            area: 361.0,
            rect: Rect::at(x, y).of_size(20, 20),
            extent: 0.9,
        }
    }

    #[test]
    fn density_decides_marked() {
        let mut mask = GrayImage::new(100, 100);
        draw_filled_rect_mut(&mut mask, Rect::at(10, 10).of_size(20, 20), Luma([255]));
        draw_filled_rect_mut(&mut mask, Rect::at(50, 10).of_size(20, 4), Luma([255]));

        let marks = classify(&mask, &[candidate(10, 10), candidate(50, 10)], 0.32);
        assert_eq!((marks[0].x, marks[0].y), (20.0, 20.0));
        assert_eq!(marks[0].density, 1.0);
        assert!(marks[0].marked);
        assert_eq!(marks[1].density, 0.2);
        assert!(!marks[1].marked);
    }

    #[test]
    fn partition_places_each_mark_once() {
        let marks = [10.0, 34.9, 35.0, 80.0].map(|y| Mark::new(5.0, y, 300.0, 0.5, 0.32));
        let set = MarkSet::partition(marks, 35.0);
        assert_eq!(set.identity.len(), 2);
        assert_eq!(set.answers.len(), 2);
        assert_eq!(set.len(), marks.len());
    }

    #[test]
    fn annotation_colors_by_state() {
        let image = RgbImage::from_pixel(100, 50, Rgb([255, 255, 255]));
        let candidates = [candidate(10, 10), candidate(50, 10)];
        let marks = [
            Mark::new(20.0, 20.0, 361.0, 0.9, 0.32),
            Mark::new(60.0, 20.0, 361.0, 0.1, 0.32),
        ];
        let annotated = annotate(&image, &candidates, &marks);
        assert_eq!(*annotated.get_pixel(10, 10), MARKED_COLOR);
        assert_eq!(*annotated.get_pixel(50, 10), UNMARKED_COLOR);
        assert_eq!(*annotated.get_pixel(20, 20), Rgb([255, 255, 255]));
    }
}
