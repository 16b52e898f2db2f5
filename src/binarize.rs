use image::{DynamicImage, GrayImage, Luma, Rgb};
use imageproc::{
    contrast::{threshold_mut, ThresholdType},
    distance_transform::Norm,
    map::map_colors,
    morphology::close_mut,
};
use tracing::instrument;

/// BT.601 luma in 14-bit fixed point: 0.299 R + 0.587 G + 0.114 B.
const LUMA_WEIGHTS: [u32; 3] = [4899, 9617, 1868];
const LUMA_SHIFT: u32 = 14;

/// Gray level of a color pixel with BT.601 weights, rounded to nearest.
pub fn luma_bt601(Rgb([r, g, b]): Rgb<u8>) -> u8 {
    let [wr, wg, wb] = LUMA_WEIGHTS;
    let weighted = r as u32 * wr + g as u32 * wg + b as u32 * wb;
    ((weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}

/// Grayscale conversion with BT.601 weights. `image`'s own `to_luma8` uses
/// Rec.709, which moves colored ink across the ink threshold.
pub fn to_gray(image: &DynamicImage) -> GrayImage {
    map_colors(&image.to_rgb8(), |pixel| Luma([luma_bt601(pixel)]))
}

/// Converts a raster image into an ink mask: ink (at or below `ink_threshold`)
/// becomes 255, paper becomes 0. A square closing of the given radius then
/// bridges small gaps inside a bubble's ink blob.
#[instrument(level = "debug", skip(image))]
pub fn binarize(image: &DynamicImage, ink_threshold: u8, closing_radius: u8) -> GrayImage {
    let mut mask = to_gray(image);
    threshold_mut(&mut mask, ink_threshold, ThresholdType::BinaryInverted);
    if closing_radius > 0 {
        close_mut(&mut mask, Norm::LInf, closing_radius);
    }

    #[cfg(feature = "debug")]
    {
        let _ = std::fs::create_dir_all("debug");
        if let Err(err) = mask.save("debug/mask.png") {
            log::warn!("Failed to write debug mask: {err}");
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    #[test]
    fn dark_pixels_become_foreground() {
        let mut image = RgbImage::from_pixel(20, 20, image::Rgb([255, 255, 255]));
        for y in 5..15 {
            for x in 5..15 {
                image.put_pixel(x, y, image::Rgb([20, 20, 20]));
            }
        }
        let mask = binarize(&DynamicImage::ImageRgb8(image), 150, 1);
        assert_eq!(*mask.get_pixel(10, 10), Luma([255]));
        assert_eq!(*mask.get_pixel(1, 1), Luma([0]));
    }

    #[test]
    fn colored_pixels_use_bt601_luma() {
        assert_eq!(luma_bt601(Rgb([170, 140, 170])), 152);
        assert_eq!(luma_bt601(Rgb([255, 255, 255])), 255);
        assert_eq!(luma_bt601(Rgb([0, 0, 0])), 0);
        assert_eq!(luma_bt601(Rgb([255, 0, 0])), 76);
    }

    #[test]
    fn light_purple_ink_is_paper() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
        for y in 5..15 {
            for x in 5..15 {
                image.put_pixel(x, y, Rgb([170, 140, 170]));
            }
        }
        let mask = binarize(&DynamicImage::ImageRgb8(image), 150, 1);
        assert_eq!(*mask.get_pixel(10, 10), Luma([0]));
    }

    #[test]
    fn closing_bridges_single_pixel_gap() {
        let mut image = RgbImage::from_pixel(30, 30, image::Rgb([255, 255, 255]));
        for y in 8..22 {
            for x in 8..22 {
                if x != 15 {
                    image.put_pixel(x, y, image::Rgb([0, 0, 0]));
                }
            }
        }
        let mask = binarize(&DynamicImage::ImageRgb8(image), 150, 1);
        assert_eq!(*mask.get_pixel(15, 15), Luma([255]));
    }
}
