//! Turns uploaded image bytes into the model's input tensor.

use image::{imageops::FilterType, DynamicImage};
use thiserror::Error;
use tract_onnx::prelude::tract_ndarray::Array4;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decode `bytes` and produce a `(1, 224, 224, 3)` RGB tensor scaled to `[-1, 1]`.
///
/// The image is resized with Lanczos3 so it covers the target square while
/// keeping its aspect ratio, then centre-cropped to exactly fill it.
pub fn preprocess_image(bytes: &[u8]) -> Result<Array4<f32>, PreprocessError> {
    let decoded = image::load_from_memory(bytes)?;
    Ok(to_tensor(&decoded))
}

pub fn to_tensor(image: &DynamicImage) -> Array4<f32> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8())
        .resize_to_fill(INPUT_SIZE, INPUT_SIZE, FilterType::Lanczos3)
        .to_rgb8();

    let side = INPUT_SIZE as usize;
    Array4::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
        let value = rgb.get_pixel(x as u32, y as u32)[c];
        normalize(value)
    })
}

fn normalize(value: u8) -> f32 {
    value as f32 / 127.5 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.02,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn normalizes_to_unit_range() {
        assert_eq!(normalize(0), -1.0);
        assert_eq!(normalize(255), 1.0);
        assert!(normalize(128).abs() < 0.01);
    }

    #[test]
    fn output_has_model_shape() {
        let png = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, Rgb([10, 20, 30]))),
            ImageFormat::Png,
        );

        let tensor = preprocess_image(&png).unwrap();
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
        assert!(tensor.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn white_and_black_map_to_bounds() {
        let white = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 300, Rgb([255, 255, 255]))),
            ImageFormat::Png,
        );
        let black = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]))),
            ImageFormat::Png,
        );

        let white = preprocess_image(&white).unwrap();
        let black = preprocess_image(&black).unwrap();
        assert_close(white[[0, 112, 112, 0]], 1.0);
        assert_close(black[[0, 112, 112, 2]], -1.0);
    }

    #[test]
    fn wide_image_is_centre_cropped() {
        // red | green | blue bands; only the green centre survives the crop
        let image = RgbImage::from_fn(672, 224, |x, _| match x {
            0..=199 => Rgb([255, 0, 0]),
            200..=471 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });
        let png = encode(DynamicImage::ImageRgb8(image), ImageFormat::Png);

        let tensor = preprocess_image(&png).unwrap();
        for x in [0usize, 112, 223] {
            assert_close(tensor[[0, 112, x, 0]], -1.0);
            assert_close(tensor[[0, 112, x, 1]], 1.0);
            assert_close(tensor[[0, 112, x, 2]], -1.0);
        }
    }

    #[test]
    fn grayscale_is_expanded_to_rgb() {
        let png = encode(
            DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 80, Luma([255]))),
            ImageFormat::Png,
        );

        let tensor = preprocess_image(&png).unwrap();
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
        for c in 0..3 {
            assert_close(tensor[[0, 100, 100, c]], 1.0);
        }
    }

    #[test]
    fn decodes_jpeg() {
        let jpeg = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(256, 256, Rgb([128, 128, 128]))),
            ImageFormat::Jpeg,
        );

        let tensor = preprocess_image(&jpeg).unwrap();
        assert_close(tensor[[0, 10, 10, 1]], 0.0);
    }

    #[test]
    fn corrupt_bytes_fail() {
        let err = preprocess_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, PreprocessError::Decode(_)));
    }
}
