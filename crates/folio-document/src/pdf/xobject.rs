// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image XObject payloads — the bytes and colour information a PDF image
// stream carries, computed ahead of assembly.
//
// JPEG data is kept as-is behind a DCTDecode filter. PNG data is decoded to
// 8-bit samples and Flate-compressed, with transparency split into a soft
// mask. This is the expensive half of embedding; storing the result in a
// document is cheap.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use folio_core::{EmbedFormat, ItemError, NormalizedImage};
use lopdf::{Object, Stream, dictionary};
use tracing::{debug, instrument};

use crate::image::ImageProcessor;

/// Colour space of an image XObject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    /// `inverted` is set for Adobe CMYK JPEGs, which store inverted samples.
    Cmyk { inverted: bool },
}

impl ColorSpace {
    fn pdf_name(self) -> &'static str {
        match self {
            Self::Gray => "DeviceGray",
            Self::Rgb => "DeviceRGB",
            Self::Cmyk { .. } => "DeviceCMYK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Body {
    Dct(Vec<u8>),
    Flate {
        samples: Vec<u8>,
        alpha: Option<Vec<u8>>,
    },
}

/// An image ready to be stored as a PDF image XObject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageXObject {
    width: u32,
    height: u32,
    color_space: ColorSpace,
    body: Body,
}

impl ImageXObject {
    /// Build the XObject payload for a normalized image.
    #[instrument(skip_all, fields(format = ?image.format, bytes_len = image.data.len()))]
    pub fn encode(image: &NormalizedImage) -> Result<Self, ItemError> {
        let encoded = match image.format {
            EmbedFormat::Jpeg => Self::from_jpeg(image)?,
            EmbedFormat::Png => Self::from_png(&image.data)?,
        };
        debug!(
            filter = encoded.filter(),
            stored_len = encoded.stored_len(),
            "XObject payload ready"
        );
        Ok(encoded)
    }

    fn from_jpeg(image: &NormalizedImage) -> Result<Self, ItemError> {
        let frame = scan_jpeg_frame(&image.data)
            .ok_or_else(|| ItemError::Embed("JPEG has no frame header".into()))?;
        let color_space = match frame.components {
            1 => ColorSpace::Gray,
            3 => ColorSpace::Rgb,
            4 => ColorSpace::Cmyk {
                inverted: frame.adobe,
            },
            other => {
                return Err(ItemError::Embed(format!(
                    "JPEG with {} colour components",
                    other
                )));
            }
        };

        Ok(Self {
            width: image.pixels.width,
            height: image.pixels.height,
            color_space,
            body: Body::Dct(image.data.clone()),
        })
    }

    fn from_png(data: &[u8]) -> Result<Self, ItemError> {
        let processor = ImageProcessor::from_bytes_with_format(data, ::image::ImageFormat::Png)
            .map_err(|err| ItemError::Embed(err.to_string()))?;
        let (width, height) = (processor.width(), processor.height());
        let samples = processor.into_pdf_samples();

        let color_space = if samples.components == 1 {
            ColorSpace::Gray
        } else {
            ColorSpace::Rgb
        };
        let alpha = samples.alpha.as_deref().map(deflate).transpose()?;

        Ok(Self {
            width,
            height,
            color_space,
            body: Body::Flate {
                samples: deflate(&samples.color)?,
                alpha,
            },
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Name of the stream filter, as written in the PDF.
    pub fn filter(&self) -> &'static str {
        match self.body {
            Body::Dct(_) => "DCTDecode",
            Body::Flate { .. } => "FlateDecode",
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self.body, Body::Flate { alpha: Some(_), .. })
    }

    /// Bytes stored in the image stream, excluding any soft mask.
    pub fn stored_len(&self) -> usize {
        match &self.body {
            Body::Dct(data) => data.len(),
            Body::Flate { samples, .. } => samples.len(),
        }
    }

    /// The image stream and, for translucent images, its soft mask. The
    /// caller links the two with an `SMask` entry once the mask has an id.
    pub(crate) fn into_streams(self) -> (Stream, Option<Stream>) {
        let (width, height) = (self.width as i64, self.height as i64);
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => self.color_space.pdf_name(),
            "BitsPerComponent" => 8,
            "Filter" => self.filter(),
        };
        if self.color_space == (ColorSpace::Cmyk { inverted: true }) {
            let decode: Vec<Object> = [1, 0, 1, 0, 1, 0, 1, 0]
                .into_iter()
                .map(Object::Integer)
                .collect();
            dict.set("Decode", decode);
        }

        match self.body {
            // Passed through byte-for-byte.
            Body::Dct(data) => (Stream::new(dict, data).with_compression(false), None),
            Body::Flate { samples, alpha } => {
                let mask = alpha.map(|alpha| {
                    let mask_dict = dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => width,
                        "Height" => height,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                        "Filter" => "FlateDecode",
                    };
                    Stream::new(mask_dict, alpha).with_compression(false)
                });
                (Stream::new(dict, samples).with_compression(false), mask)
            }
        }
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ItemError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|err| ItemError::Encode(format!("compression failed: {}", err)))
}

/// What the marker segments before the first frame header say about a JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegFrame {
    components: u8,
    /// An APP14 `Adobe` segment precedes the frame.
    adobe: bool,
}

fn scan_jpeg_frame(data: &[u8]) -> Option<JpegFrame> {
    if data.get(0..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut adobe = false;
    let mut offset = 2;
    loop {
        // Skip fill bytes before a marker.
        while *data.get(offset)? == 0xFF && *data.get(offset + 1)? == 0xFF {
            offset += 1;
        }
        if *data.get(offset)? != 0xFF {
            return None;
        }
        let marker = *data.get(offset + 1)?;
        match marker {
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => {
                offset += 2;
                continue;
            }
            0xD9 | 0xDA => return None,
            // SOF0-SOF15, excluding DHT, JPG and DAC.
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                return Some(JpegFrame {
                    components: *data.get(offset + 9)?,
                    adobe,
                });
            }
            0xEE if data.get(offset + 4..offset + 9) == Some(&b"Adobe"[..]) => adobe = true,
            _ => {}
        }
        let length = u16::from_be_bytes([*data.get(offset + 2)?, *data.get(offset + 3)?]) as usize;
        offset += 2 + length;
    }
}
