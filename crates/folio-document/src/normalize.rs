// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalizer — turn a classified input into bytes the PDF writer can embed
// directly.

use folio_core::{ConvertConfig, Dimensions, EmbedFormat, ImageFormat, ItemError, NormalizedImage, PaperSize};
use tracing::{debug, instrument};

use crate::codec::ImageCodec;
use crate::layout::layout;

/// Converts classified images into [`NormalizedImage`]s.
///
/// JPEG and PNG pass through untouched; WebP is transcoded to PNG. When
/// downscaling is enabled, images wider than the page are resampled to the
/// width they will be drawn at.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    page_size: PaperSize,
    downscale_to_page: bool,
}

impl Normalizer {
    pub fn new(page_size: PaperSize) -> Self {
        Self {
            page_size,
            downscale_to_page: false,
        }
    }

    pub fn from_config(config: &ConvertConfig) -> Self {
        Self {
            page_size: config.page_size,
            downscale_to_page: config.downscale_to_page,
        }
    }

    pub fn with_downscale(mut self, enabled: bool) -> Self {
        self.downscale_to_page = enabled;
        self
    }

    /// Normalize `bytes`, already classified as `format`.
    #[instrument(skip(self, codec, bytes), fields(bytes_len = bytes.len()))]
    pub fn normalize<C: ImageCodec + ?Sized>(
        &self,
        codec: &C,
        bytes: &[u8],
        format: ImageFormat,
    ) -> Result<NormalizedImage, ItemError> {
        let Some(target) = format.embed_target() else {
            return Err(ItemError::UnsupportedFormat(
                "content is not a still JPEG, PNG or WebP image".into(),
            ));
        };

        let natural = codec.decode_dimensions(bytes, format)?;
        let render_width = layout(natural, self.page_size).render_width.round() as u32;

        if self.downscale_to_page && render_width < natural.width {
            let (data, pixels) = codec.resample(bytes, format, target, render_width)?;
            debug!(
                from_w = natural.width,
                to_w = pixels.width,
                "Downscaled to page width"
            );
            return Ok(NormalizedImage {
                data,
                format: target,
                natural,
                pixels,
            });
        }

        let data = match (format, target) {
            (ImageFormat::Jpeg, EmbedFormat::Jpeg) | (ImageFormat::Png, EmbedFormat::Png) => {
                bytes.to_vec()
            }
            (from, to) => {
                let converted = codec.transcode(bytes, from, to)?;
                debug!(in_len = bytes.len(), out_len = converted.len(), "Transcoded");
                converted
            }
        };

        Ok(NormalizedImage {
            data,
            format: target,
            natural,
            pixels: Dimensions::new(natural.width, natural.height),
        })
    }
}
