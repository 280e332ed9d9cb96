use std::fmt;

use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, RgbImage, RgbaImage};
use tracing::debug;

use crate::error::{Result, SealError};

/// Sample layout of a decoded carrier: 8 bits per channel, interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb8,
    Rgba8,
}

impl PixelLayout {
    pub fn channels(&self) -> u8 {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }

    fn color_type(&self) -> ExtendedColorType {
        match self {
            PixelLayout::Rgb8 => ExtendedColorType::Rgb8,
            PixelLayout::Rgba8 => ExtendedColorType::Rgba8,
        }
    }
}

/// A decoded, exclusively owned pixel buffer.
///
/// Samples are row-major, left to right, channels interleaved in R,G,B(,A) order.
#[derive(Clone, PartialEq, Eq)]
pub struct CarrierImage {
    width: u32,
    height: u32,
    layout: PixelLayout,
    samples: Vec<u8>,
    source_format: Option<ImageFormat>,
}

impl fmt::Debug for CarrierImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarrierImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .field("source_format", &self.source_format)
            .finish_non_exhaustive()
    }
}

impl CarrierImage {
    /// Decode image bytes in any supported format.
    ///
    /// Images with an alpha channel decode to RGBA, everything else to RGB.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = image::guess_format(data)
            .map_err(|_| SealError::UnsupportedFormat("not a recognized image format".into()))?;
        let image = image::load_from_memory_with_format(data, format)
            .map_err(|e| SealError::UnsupportedFormat(format!("failed to decode image: {}", e)))?;

        let carrier = Self::from_dynamic(image, Some(format));
        debug!(
            width = carrier.width,
            height = carrier.height,
            layout = ?carrier.layout,
            format = ?format,
            "Decoded carrier image"
        );
        Ok(carrier)
    }

    pub fn from_dynamic(image: DynamicImage, source_format: Option<ImageFormat>) -> Self {
        if image.color().has_alpha() {
            let mut carrier = Self::from_rgba(image.to_rgba8());
            carrier.source_format = source_format;
            carrier
        } else {
            let mut carrier = Self::from_rgb(image.to_rgb8());
            carrier.source_format = source_format;
            carrier
        }
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            layout: PixelLayout::Rgb8,
            samples: image.into_raw(),
            source_format: None,
        }
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            layout: PixelLayout::Rgba8,
            samples: image.into_raw(),
            source_format: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn channels(&self) -> u8 {
        self.layout.channels()
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Format the carrier was decoded from, if it came from encoded bytes.
    pub fn source_format(&self) -> Option<ImageFormat> {
        self.source_format
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    /// Re-encode losslessly as PNG with the same dimensions and layout.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(
                &self.samples,
                self.width,
                self.height,
                self.layout.color_type(),
            )
            .map_err(|e| SealError::Encoding(format!("PNG encoding failed: {}", e)))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    #[test]
    fn test_png_reencode_is_lossless() {
        let img = RgbImage::from_fn(7, 5, |x, y| Rgb([x as u8 * 31, y as u8 * 47, 255]));
        let carrier = CarrierImage::from_rgb(img);

        let png = carrier.to_png().unwrap();
        let decoded = CarrierImage::from_bytes(&png).unwrap();

        assert_eq!(decoded.width(), 7);
        assert_eq!(decoded.height(), 5);
        assert_eq!(decoded.layout(), PixelLayout::Rgb8);
        assert_eq!(decoded.samples(), carrier.samples());
        assert_eq!(decoded.source_format(), Some(ImageFormat::Png));
    }

    #[test]
    fn test_alpha_is_preserved() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 0]));
        let carrier = CarrierImage::from_rgba(img);
        let decoded = CarrierImage::from_bytes(&carrier.to_png().unwrap()).unwrap();
        assert_eq!(decoded.layout(), PixelLayout::Rgba8);
        assert_eq!(decoded.samples(), carrier.samples());
    }

    #[test]
    fn test_garbage_is_unsupported_format() {
        let err = CarrierImage::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, SealError::UnsupportedFormat(_)));

        // Valid PNG signature, truncated body
        let err = CarrierImage::from_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
            .unwrap_err();
        assert!(matches!(err, SealError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_grayscale_decodes_as_rgb() {
        let gray = image::GrayImage::from_pixel(4, 4, image::Luma([77]));
        let carrier = CarrierImage::from_dynamic(DynamicImage::ImageLuma8(gray), None);
        assert_eq!(carrier.layout(), PixelLayout::Rgb8);
        assert!(carrier.samples().iter().all(|&s| s == 77));
    }
}
