// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory image fixtures and an instrumented codec shared by the unit tests.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ::image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use folio_core::{Dimensions, EmbedFormat, ItemError, RawImage};

use crate::cancel::CancelToken;
use crate::codec::{ImageCodec, RasterCodec};

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), format)
        .expect("fixture encoding");
    buffer
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Jpeg)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::Png)
}

/// PNG whose left half is fully transparent.
pub fn translucent_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, _| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        Rgba([200, 40, 40, alpha])
    });
    encode(DynamicImage::ImageRgba8(image), ImageFormat::Png)
}

pub fn webp_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgb8(gradient(width, height)), ImageFormat::WebP)
}

/// A 1x1 GIF: a real image format outside the supported set.
pub fn gif_bytes() -> Vec<u8> {
    b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff\x00\x00\x00!\xf9\x04\x01\x00\x00\x00\x00,\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02D\x01\x00;".to_vec()
}

pub fn corrupt_bytes() -> Vec<u8> {
    b"\x00\x13\x37 this is not an image at all".to_vec()
}

/// Classification calls observed by a [`SlowCodec`], across threads.
#[derive(Debug, Default)]
pub struct DecodeStats {
    started: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl DecodeStats {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Most classifications that were ever running at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Wraps [`RasterCodec`]. Sleeps before classifying inputs of the listed
/// byte lengths, counts concurrent classifications, and can cancel a token
/// as soon as the first classification returns.
pub struct SlowCodec {
    inner: RasterCodec,
    delays: HashMap<usize, Duration>,
    stats: Arc<DecodeStats>,
    cancel_after_first: Option<CancelToken>,
}

impl SlowCodec {
    pub fn new() -> Self {
        Self {
            inner: RasterCodec::default(),
            delays: HashMap::new(),
            stats: Arc::new(DecodeStats::default()),
            cancel_after_first: None,
        }
    }

    pub fn delay(mut self, image: &RawImage, delay: Duration) -> Self {
        self.delays.insert(image.len(), delay);
        self
    }

    pub fn delay_all(mut self, images: &[RawImage], delay: Duration) -> Self {
        for image in images {
            self.delays.insert(image.len(), delay);
        }
        self
    }

    pub fn cancelling(mut self, token: CancelToken) -> Self {
        self.cancel_after_first = Some(token);
        self
    }

    pub fn stats(&self) -> Arc<DecodeStats> {
        Arc::clone(&self.stats)
    }
}

impl ImageCodec for SlowCodec {
    fn detect_format(&self, bytes: &[u8]) -> Result<folio_core::ImageFormat, ItemError> {
        self.stats.started.fetch_add(1, Ordering::SeqCst);
        let running = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&bytes.len()) {
            std::thread::sleep(*delay);
        }
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_after_first {
            token.cancel();
        }
        self.inner.detect_format(bytes)
    }

    fn decode_dimensions(
        &self,
        bytes: &[u8],
        format: folio_core::ImageFormat,
    ) -> Result<Dimensions, ItemError> {
        self.inner.decode_dimensions(bytes, format)
    }

    fn transcode(
        &self,
        bytes: &[u8],
        from: folio_core::ImageFormat,
        to: EmbedFormat,
    ) -> Result<Vec<u8>, ItemError> {
        self.inner.transcode(bytes, from, to)
    }

    fn resample(
        &self,
        bytes: &[u8],
        from: folio_core::ImageFormat,
        to: EmbedFormat,
        width: u32,
    ) -> Result<(Vec<u8>, Dimensions), ItemError> {
        self.inner.resample(bytes, from, to, width)
    }
}
