//! Image clean-up before recognition: grayscale, contrast, unsharp mask and
//! an optional projection-profile deskew.

use image::{DynamicImage, GrayImage, Luma, imageops};

use ledgerlens_core::PreprocessConfig;

const DARK: u8 = 128;
const SKEW_STEP_DEGREES: f32 = 0.5;

pub fn preprocess(image: &DynamicImage, cfg: &PreprocessConfig) -> GrayImage {
    let mut gray = image.to_luma8();
    if cfg.contrast != 0.0 {
        gray = imageops::contrast(&gray, cfg.contrast);
    }
    if cfg.sharpen_sigma > 0.0 {
        gray = imageops::unsharpen(&gray, cfg.sharpen_sigma, cfg.sharpen_threshold);
    }
    if cfg.deskew {
        let angle = estimate_skew(&gray, cfg.max_skew_degrees);
        if angle.abs() >= SKEW_STEP_DEGREES {
            tracing::debug!(angle, "deskewing page image");
            gray = rotate(&gray, -angle);
        }
    }
    gray
}

/// Skew angle in degrees whose row projection is sharpest.
///
/// Text lines make dark rows alternate with blank ones; the right angle
/// maximizes the sum of squared differences between neighbouring rows.
pub fn estimate_skew(image: &GrayImage, max_degrees: f32) -> f32 {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || max_degrees <= 0.0 {
        return 0.0;
    }
    let stride = (width.max(height) / 600).max(1);
    let dark: Vec<(f32, f32)> = (0..height)
        .step_by(stride as usize)
        .flat_map(|y| (0..width).step_by(stride as usize).map(move |x| (x, y)))
        .filter(|&(x, y)| image.get_pixel(x, y).0[0] < DARK)
        .map(|(x, y)| (x as f32, y as f32))
        .collect();
    if dark.is_empty() {
        return 0.0;
    }

    let steps = (max_degrees / SKEW_STEP_DEGREES).floor() as i32;
    let mut best = (0.0f32, f64::MIN);
    for step in -steps..=steps {
        let angle = step as f32 * SKEW_STEP_DEGREES;
        let tan = angle.to_radians().tan();
        let mut rows = vec![0u32; height as usize + width as usize];
        let offset = (width as f32 * tan.abs()).ceil();
        for &(x, y) in &dark {
            let projected = y - x * tan + offset;
            if projected >= 0.0 && (projected as usize) < rows.len() {
                rows[projected as usize] += 1;
            }
        }
        let score: f64 = rows
            .windows(2)
            .map(|w| {
                let d = w[1] as f64 - w[0] as f64;
                d * d
            })
            .sum();
        if score > best.1 {
            best = (angle, score);
        }
    }
    best.0
}

/// Rotate about the centre by `degrees` (counter-clockwise), nearest
/// neighbour, white fill.
pub fn rotate(image: &GrayImage, degrees: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = cos * dx - sin * dy + cx;
        let sy = sin * dx + cos * dy + cy;
        if sx >= 0.0 && sy >= 0.0 && (sx as u32) < width && (sy as u32) < height {
            *image.get_pixel(sx as u32, sy as u32)
        } else {
            Luma([255])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |_, y| if (y / 8) % 3 == 0 { Luma([0]) } else { Luma([255]) })
    }

    #[test]
    fn test_preprocess_outputs_same_size_grayscale() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(40, 20, image::Rgb([200, 10, 10])));
        let out = preprocess(&img, &PreprocessConfig::default());
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn test_straight_lines_have_no_skew() {
        let img = striped(200, 120);
        assert_eq!(estimate_skew(&img, 5.0), 0.0);
    }

    #[test]
    fn test_blank_page_has_no_skew() {
        let img = GrayImage::from_pixel(50, 50, Luma([255]));
        assert_eq!(estimate_skew(&img, 5.0), 0.0);
    }

    #[test]
    fn test_rotation_recovers_skewed_lines() {
        let skewed = rotate(&striped(300, 200), 3.0);
        let angle = estimate_skew(&skewed, 5.0);
        assert!(angle.abs() >= 2.0 && angle.abs() <= 4.0, "angle {angle}");
        assert_eq!(rotate(&skewed, 0.0), skewed);
    }
}
