// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document — Image batches to multi-page PDFs.
//
// Provides content-based format classification, WebP normalization, page
// layout (fit to width, centered), PDF assembly with lopdf, and sequential and
// concurrent batch pipelines that skip unusable images and honour
// cooperative cancellation.

pub mod accumulate;
pub mod cancel;
pub mod codec;
pub mod concurrent;
pub mod image;
pub mod layout;
pub mod normalize;
pub mod pdf;

#[cfg(test)]
mod test_support;

// Re-export the primary structs so callers can use `folio_document::PageAccumulator` etc.
pub use accumulate::{Conversion, OutputDocument, PageAccumulator, PreparedPage};
pub use cancel::CancelToken;
pub use codec::{ImageCodec, RasterCodec};
pub use concurrent::{ConcurrentConverter, convert_concurrent};
pub use self::image::processor::ImageProcessor;
pub use layout::{layout, layout_a4};
pub use normalize::Normalizer;
pub use pdf::reader::{PdfInspector, PlacedImage};
pub use pdf::writer::{DocumentSink, PdfAssembler};
pub use pdf::xobject::{ColorSpace, ImageXObject};
