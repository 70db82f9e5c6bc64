//! Pixel-level transforms. Each one is a pure function of the input pixels.

use image::{imageops, DynamicImage};

/// Gaussian sigma for `blur`, matching a CSS `blur(5px)` filter.
pub const BLUR_RADIUS: f32 = 5.0;

/// Replace R, G and B with their unweighted mean, truncated. Alpha untouched.
pub fn grayscale(image: &DynamicImage) -> DynamicImage {
    let mut rgba = image.to_rgba8();
    for pixel in rgba.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let mean = ((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8;
        pixel.0[0] = mean;
        pixel.0[1] = mean;
        pixel.0[2] = mean;
    }
    DynamicImage::ImageRgba8(rgba)
}

/// Replace R, G and B with `255 - value`. Alpha untouched.
pub fn invert(image: &DynamicImage) -> DynamicImage {
    let mut rgba = image.to_rgba8();
    for pixel in rgba.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = 255 - *channel;
        }
    }
    DynamicImage::ImageRgba8(rgba)
}

/// Fixed-radius Gaussian blur.
pub fn blur(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    DynamicImage::ImageRgba8(imageops::blur(&rgba, BLUR_RADIUS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn single_pixel(rgba: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba(rgba)))
    }

    fn first_pixel(image: &DynamicImage) -> [u8; 4] {
        image.to_rgba8().get_pixel(0, 0).0
    }

    #[test]
    fn test_grayscale_mean() {
        let out = grayscale(&single_pixel([90, 30, 0, 255]));
        assert_eq!(first_pixel(&out), [40, 40, 40, 255]);
    }

    #[test]
    fn test_grayscale_truncates() {
        // (2 + 0 + 0) / 3 = 0.67 truncates to 0
        let out = grayscale(&single_pixel([2, 0, 0, 255]));
        assert_eq!(first_pixel(&out), [0, 0, 0, 255]);

        let out = grayscale(&single_pixel([255, 255, 254, 255]));
        assert_eq!(first_pixel(&out), [254, 254, 254, 255]);
    }

    #[test]
    fn test_grayscale_keeps_alpha() {
        let out = grayscale(&single_pixel([10, 20, 30, 77]));
        assert_eq!(first_pixel(&out)[3], 77);
    }

    #[test]
    fn test_invert() {
        let out = invert(&single_pixel([10, 0, 255, 128]));
        assert_eq!(first_pixel(&out), [245, 255, 0, 128]);
    }

    #[test]
    fn test_invert_twice_is_identity() {
        let original = single_pixel([1, 2, 3, 4]);
        assert_eq!(first_pixel(&invert(&invert(&original))), [1, 2, 3, 4]);
    }

    #[test]
    fn test_blur_uniform_image_unchanged() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([50, 60, 70, 255])));
        let out = blur(&img).to_rgba8();
        assert_eq!(out.dimensions(), (16, 16));
        for pixel in out.pixels() {
            for (got, want) in pixel.0.iter().zip([50u8, 60, 70, 255]) {
                assert!(got.abs_diff(want) <= 1, "{got} vs {want}");
            }
        }
    }

    #[test]
    fn test_blur_spreads_a_bright_dot() {
        let mut img = RgbaImage::from_pixel(21, 21, Rgba([0, 0, 0, 255]));
        img.put_pixel(10, 10, Rgba([255, 255, 255, 255]));
        let out = blur(&DynamicImage::ImageRgba8(img)).to_rgba8();
        let center = out.get_pixel(10, 10).0[0];
        let neighbour = out.get_pixel(11, 10).0[0];
        assert!(center < 255);
        assert!(neighbour > 0);
    }

    #[test]
    fn test_blur_is_deterministic() {
        let mut img = RgbaImage::new(12, 12);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 20) as u8, (y * 20) as u8, 0, 255]);
        }
        let img = DynamicImage::ImageRgba8(img);
        assert_eq!(blur(&img).to_rgba8(), blur(&img).to_rgba8());
    }
}
