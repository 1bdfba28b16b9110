// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image codec — format classification, header inspection and transcoding.
//
// `ImageCodec` is the seam between the conversion pipeline and whatever
// library actually understands image encodings. `RasterCodec` implements it
// on top of the `image` crate.

use std::io::Cursor;

use folio_core::{Dimensions, EmbedFormat, ImageFormat, ItemError};
use tracing::{debug, instrument};

use crate::image::ImageProcessor;

/// Operations the pipeline needs from an image library.
pub trait ImageCodec: Send + Sync {
    /// Classify `bytes` by content. Recognised images outside the supported
    /// set map to [`ImageFormat::Unsupported`]; buffers that are not images
    /// at all fail with [`ItemError::Decode`].
    fn detect_format(&self, bytes: &[u8]) -> Result<ImageFormat, ItemError>;

    /// Read pixel dimensions from the encoded header.
    fn decode_dimensions(&self, bytes: &[u8], format: ImageFormat)
    -> Result<Dimensions, ItemError>;

    /// Re-encode `bytes` from `from` into `to`.
    fn transcode(
        &self,
        bytes: &[u8],
        from: ImageFormat,
        to: EmbedFormat,
    ) -> Result<Vec<u8>, ItemError>;

    /// Resample to `width` pixels wide (aspect preserved) and encode as `to`.
    fn resample(
        &self,
        bytes: &[u8],
        from: ImageFormat,
        to: EmbedFormat,
        width: u32,
    ) -> Result<(Vec<u8>, Dimensions), ItemError>;
}

/// [`ImageCodec`] backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct RasterCodec {
    /// Quality used whenever a JPEG has to be re-encoded.
    jpeg_quality: u8,
}

impl Default for RasterCodec {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

impl RasterCodec {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn encode(&self, processor: &ImageProcessor, to: EmbedFormat) -> Result<Vec<u8>, ItemError> {
        match to {
            EmbedFormat::Jpeg => processor.to_jpeg_bytes(self.jpeg_quality),
            EmbedFormat::Png => processor.to_png_bytes(),
        }
    }
}

impl ImageCodec for RasterCodec {
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    fn detect_format(&self, bytes: &[u8]) -> Result<ImageFormat, ItemError> {
        if bytes.is_empty() {
            return Err(ItemError::Decode("empty buffer".into()));
        }

        let guessed = ::image::guess_format(bytes).map_err(|err| {
            ItemError::Decode(format!("no recognisable image signature: {}", err))
        })?;

        let format = match guessed {
            ::image::ImageFormat::Jpeg => ImageFormat::Jpeg,
            ::image::ImageFormat::Png if is_animated_png(bytes) => {
                debug!("Animated PNG rejected");
                ImageFormat::Unsupported
            }
            ::image::ImageFormat::Png => ImageFormat::Png,
            ::image::ImageFormat::WebP if is_animated_webp(bytes) => {
                debug!("Animated WebP rejected");
                ImageFormat::Unsupported
            }
            ::image::ImageFormat::WebP => ImageFormat::WebP,
            other => {
                debug!(?other, "Recognised but unsupported image format");
                ImageFormat::Unsupported
            }
        };

        Ok(format)
    }

    fn decode_dimensions(
        &self,
        bytes: &[u8],
        format: ImageFormat,
    ) -> Result<Dimensions, ItemError> {
        let codec_format = to_codec_format(format)?;
        let (width, height) = ::image::ImageReader::with_format(Cursor::new(bytes), codec_format)
            .into_dimensions()
            .map_err(|err| ItemError::Decode(format!("unreadable {} header: {}", format, err)))?;

        if width == 0 || height == 0 {
            return Err(ItemError::Decode(format!(
                "{} header declares an empty image ({}x{})",
                format, width, height
            )));
        }
        Ok(Dimensions::new(width, height))
    }

    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    fn transcode(
        &self,
        bytes: &[u8],
        from: ImageFormat,
        to: EmbedFormat,
    ) -> Result<Vec<u8>, ItemError> {
        let processor = ImageProcessor::from_bytes_with_format(bytes, to_codec_format(from)?)?;
        let encoded = self.encode(&processor, to)?;
        debug!(out_len = encoded.len(), "Transcode complete");
        Ok(encoded)
    }

    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    fn resample(
        &self,
        bytes: &[u8],
        from: ImageFormat,
        to: EmbedFormat,
        width: u32,
    ) -> Result<(Vec<u8>, Dimensions), ItemError> {
        let processor = ImageProcessor::from_bytes_with_format(bytes, to_codec_format(from)?)?
            .resize_to_width(width);
        let pixels = Dimensions::new(processor.width(), processor.height());
        let encoded = self.encode(&processor, to)?;
        Ok((encoded, pixels))
    }
}

fn to_codec_format(format: ImageFormat) -> Result<::image::ImageFormat, ItemError> {
    match format {
        ImageFormat::Jpeg => Ok(::image::ImageFormat::Jpeg),
        ImageFormat::Png => Ok(::image::ImageFormat::Png),
        ImageFormat::WebP => Ok(::image::ImageFormat::WebP),
        ImageFormat::Unsupported => Err(ItemError::UnsupportedFormat(
            "content is not a still JPEG, PNG or WebP image".into(),
        )),
    }
}

const PNG_SIGNATURE_LEN: usize = 8;

/// An APNG carries an `acTL` chunk before the first `IDAT`.
fn is_animated_png(bytes: &[u8]) -> bool {
    let mut offset = PNG_SIGNATURE_LEN;
    while let Some(header) = bytes.get(offset..offset + 8) {
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        match &header[4..8] {
            b"acTL" => return true,
            b"IDAT" | b"IEND" => return false,
            _ => {}
        }
        // length + type + data + crc
        offset = match offset.checked_add(length).and_then(|o| o.checked_add(12)) {
            Some(next) => next,
            None => return false,
        };
    }
    false
}

/// Extended WebP files (`VP8X`) flag animation in bit 1 of the first flags
/// byte.
fn is_animated_webp(bytes: &[u8]) -> bool {
    const ANIMATION_FLAG: u8 = 0x02;
    matches!(bytes.get(12..16), Some(b"VP8X"))
        && bytes.get(20).is_some_and(|flags| flags & ANIMATION_FLAG != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gif_bytes, jpeg_bytes, png_bytes, webp_bytes};

    #[test]
    fn detects_supported_formats_from_content() {
        let codec = RasterCodec::default();
        assert_eq!(codec.detect_format(&jpeg_bytes(8, 4)).unwrap(), ImageFormat::Jpeg);
        assert_eq!(codec.detect_format(&png_bytes(8, 4)).unwrap(), ImageFormat::Png);
        assert_eq!(codec.detect_format(&webp_bytes(8, 4)).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn other_image_formats_are_unsupported() {
        let codec = RasterCodec::default();
        assert_eq!(codec.detect_format(&gif_bytes()).unwrap(), ImageFormat::Unsupported);
    }

    #[test]
    fn garbage_and_empty_buffers_fail_to_decode() {
        let codec = RasterCodec::default();
        assert!(matches!(codec.detect_format(b""), Err(ItemError::Decode(_))));
        assert!(matches!(
            codec.detect_format(b"definitely not an image"),
            Err(ItemError::Decode(_))
        ));
    }

    #[test]
    fn reads_dimensions_from_header() {
        let codec = RasterCodec::default();
        let dims = codec.decode_dimensions(&jpeg_bytes(33, 17), ImageFormat::Jpeg).unwrap();
        assert_eq!(dims, Dimensions::new(33, 17));
        let dims = codec.decode_dimensions(&webp_bytes(12, 30), ImageFormat::WebP).unwrap();
        assert_eq!(dims, Dimensions::new(12, 30));
    }

    #[test]
    fn truncated_header_fails() {
        let codec = RasterCodec::default();
        let png = png_bytes(10, 10);
        assert!(matches!(
            codec.decode_dimensions(&png[..12], ImageFormat::Png),
            Err(ItemError::Decode(_))
        ));
    }

    #[test]
    fn webp_transcodes_to_png() {
        let codec = RasterCodec::default();
        let png = codec
            .transcode(&webp_bytes(9, 5), ImageFormat::WebP, EmbedFormat::Png)
            .unwrap();
        assert_eq!(codec.detect_format(&png).unwrap(), ImageFormat::Png);
        assert_eq!(
            codec.decode_dimensions(&png, ImageFormat::Png).unwrap(),
            Dimensions::new(9, 5)
        );
    }

    #[test]
    fn resample_reports_encoded_pixels() {
        let codec = RasterCodec::default();
        let (jpeg, pixels) = codec
            .resample(&jpeg_bytes(1000, 400), ImageFormat::Jpeg, EmbedFormat::Jpeg, 500)
            .unwrap();
        assert_eq!(pixels, Dimensions::new(500, 200));
        assert_eq!(codec.decode_dimensions(&jpeg, ImageFormat::Jpeg).unwrap(), pixels);
    }

    #[test]
    fn apng_actl_chunk_detected() {
        let mut png = png_bytes(4, 4);
        assert!(!is_animated_png(&png));

        // Splice an acTL chunk in right after IHDR (8 signature + 25 IHDR).
        let actl: [u8; 20] = [
            0, 0, 0, 8, b'a', b'c', b'T', b'L', 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        png.splice(33..33, actl);
        assert!(is_animated_png(&png));
    }

    #[test]
    fn webp_animation_flag_detected() {
        let mut header = b"RIFF\0\0\0\0WEBPVP8X\x0a\0\0\0".to_vec();
        header.extend_from_slice(&[0x02, 0, 0, 0]);
        assert!(is_animated_webp(&header));
        header[20] = 0x10;
        assert!(!is_animated_webp(&header));
        assert!(!is_animated_webp(&webp_bytes(3, 3)));
    }
}
