// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, resample and re-encode single images with the
// `image` crate, and split them into the sample planes a PDF image XObject
// expects.

use image::{DynamicImage, ImageFormat};
use folio_core::ItemError;
use tracing::{debug, instrument};

/// Decoded pixel data laid out for a PDF image XObject.
pub struct PdfSamples {
    /// 8-bit interleaved colour samples.
    pub color: Vec<u8>,
    /// 1 for DeviceGray, 3 for DeviceRGB.
    pub components: u8,
    /// 8-bit alpha plane, present only when some pixel is not fully opaque.
    pub alpha: Option<Vec<u8>>,
}

/// A single decoded image.
///
/// Transformations consume `self` and return a new `ImageProcessor`, so calls
/// can be chained.
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    /// Decode encoded bytes whose format is already known.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes_with_format(data: &[u8], format: ImageFormat) -> Result<Self, ItemError> {
        let img = image::load_from_memory_with_format(data, format)
            .map_err(|err| ItemError::Decode(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Resample to `width` pixels wide, keeping the aspect ratio. Uses
    /// Lanczos3 filtering; never upscales.
    #[instrument(skip(self))]
    pub fn resize_to_width(self, width: u32) -> Self {
        let (from_w, from_h) = (self.image.width(), self.image.height());
        if width == 0 || width >= from_w {
            return self;
        }
        let height = ((from_h as f64) * (width as f64) / (from_w as f64))
            .round()
            .max(1.0) as u32;
        let resized =
            self.image
                .resize_exact(width, height, image::imageops::FilterType::Lanczos3);
        debug!(from_w, from_h, new_w = width, new_h = height, "Resize complete");
        Self { image: resized }
    }

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, ItemError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| ItemError::Encode(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, ItemError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| ItemError::Encode(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Split into 8-bit colour and alpha planes. Greyscale sources stay
    /// single-channel; 16-bit sources are reduced to 8 bits.
    pub fn into_pdf_samples(self) -> PdfSamples {
        let color_type = self.image.color();
        let grey = color_type.channel_count() <= 2;

        let alpha = if color_type.has_alpha() {
            let plane: Vec<u8> = self
                .image
                .to_luma_alpha8()
                .pixels()
                .map(|pixel| pixel.0[1])
                .collect();
            plane.iter().any(|&a| a != u8::MAX).then_some(plane)
        } else {
            None
        };

        let (color, components) = if grey {
            (self.image.to_luma8().into_raw(), 1)
        } else {
            (self.image.to_rgb8().into_raw(), 3)
        };

        PdfSamples {
            color,
            components,
            alpha,
        }
    }
}
