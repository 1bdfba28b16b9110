// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Folio: raw inputs, formats, normalized images,
// page geometry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier attached to every batch for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One input image exactly as the transport layer delivered it.
///
/// The content-type hint is advisory. Classification always looks at the
/// bytes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    data: Vec<u8>,
    content_type: Option<String>,
}

impl RawImage {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            content_type: None,
        }
    }

    /// Attach the content-type the transport declared for this item.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Encoding of a raw input, as derived from its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    /// A recognised image that Folio will not place on a page (GIF, TIFF,
    /// animated PNG/WebP, ...).
    Unsupported,
}

impl ImageFormat {
    /// MIME type, or `None` for [`ImageFormat::Unsupported`].
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            Self::Jpeg => Some("image/jpeg"),
            Self::Png => Some("image/png"),
            Self::WebP => Some("image/webp"),
            Self::Unsupported => None,
        }
    }

    /// Interpret a transport content-type header. Parameters after `;` are
    /// ignored.
    pub fn from_mime(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Self::Jpeg,
            "image/png" => Self::Png,
            "image/webp" => Self::WebP,
            _ => Self::Unsupported,
        }
    }

    /// Infer a format from a file extension. Used only to build hints.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// The embeddable encoding this format ends up as after normalization.
    pub fn embed_target(&self) -> Option<EmbedFormat> {
        match self {
            Self::Jpeg => Some(EmbedFormat::Jpeg),
            Self::Png | Self::WebP => Some(EmbedFormat::Png),
            Self::Unsupported => None,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Encodings the PDF writer can place without transcoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbedFormat {
    Jpeg,
    Png,
}

impl From<EmbedFormat> for ImageFormat {
    fn from(format: EmbedFormat) -> Self {
        match format {
            EmbedFormat::Jpeg => Self::Jpeg,
            EmbedFormat::Png => Self::Png,
        }
    }
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An image in an embeddable encoding, ready for layout and placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// Encoded bytes in `format`.
    pub data: Vec<u8>,
    pub format: EmbedFormat,
    /// Dimensions of the source image; layout is computed from these.
    pub natural: Dimensions,
    /// Dimensions of the pixels actually encoded in `data`. Smaller than
    /// `natural` only when downscaling is enabled.
    pub pixels: Dimensions,
}

/// Standard page sizes, in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_pt: f64, height_pt: f64 },
}

impl PaperSize {
    /// Dimensions in points (width, height).
    pub fn dimensions_pt(&self) -> (f64, f64) {
        match self {
            Self::A4 => (595.0, 842.0),
            Self::A3 => (842.0, 1191.0),
            Self::A5 => (420.0, 595.0),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
            Self::Custom {
                width_pt,
                height_pt,
            } => (*width_pt, *height_pt),
        }
    }
}

impl Default for PaperSize {
    fn default() -> Self {
        Self::A4
    }
}

/// Placement of one image on its page, in points. The origin is the
/// bottom-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub render_width: f64,
    pub render_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Summary of one page that made it into the document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePlacement {
    /// Position of the source image in the input batch.
    pub index: usize,
    pub format: EmbedFormat,
    pub natural: Dimensions,
    pub layout: PageLayout,
}
