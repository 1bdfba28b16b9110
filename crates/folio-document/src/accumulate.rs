// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page accumulator — run every image of a batch through classification,
// normalization and layout, and append one page per usable image.
//
// A failing image is recorded with its batch position and skipped; the rest
// of the batch carries on. Only an empty batch (or a serializer failure)
// ends the whole conversion.

use folio_core::error::Result;
use folio_core::integrity::hash_bytes;
use folio_core::{
    BatchId, ConvertConfig, Dimensions, EmbedFormat, FolioError, ImageFormat, ItemError,
    ItemFailure, PageLayout, PagePlacement, RawImage,
};
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::codec::{ImageCodec, RasterCodec};
use crate::layout::layout;
use crate::normalize::Normalizer;
use crate::pdf::writer::{DocumentSink, PdfAssembler};

/// An image already encoded for a document sink, with its position on the
/// page. `E` is the sink's [`DocumentSink::EncodedImage`].
#[derive(Debug, Clone)]
pub struct PreparedPage<E> {
    pub format: EmbedFormat,
    pub natural: Dimensions,
    pub layout: PageLayout,
    pub encoded: E,
}

/// Pages and skipped items of a batch, not yet serialized.
pub struct OutputDocument<S: DocumentSink> {
    sink: S,
    pages: Vec<PagePlacement>,
    failures: Vec<ItemFailure>,
    batch: BatchId,
}

impl<S: DocumentSink> OutputDocument<S> {
    pub fn batch_id(&self) -> BatchId {
        self.batch
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Placed pages in output order. `index` is the item's batch position.
    pub fn pages(&self) -> &[PagePlacement] {
        &self.pages
    }

    /// Skipped items in ascending batch order.
    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }

    /// Write the document out. Consumes it, so it happens once.
    #[instrument(skip(self), fields(batch = %self.batch, pages = self.pages.len()))]
    pub fn serialize(self) -> Result<Conversion> {
        let bytes = self.sink.serialize()?;
        let sha256 = hash_bytes(&bytes);
        info!(output_bytes = bytes.len(), %sha256, "Batch serialized");
        Ok(Conversion {
            bytes,
            sha256,
            pages: self.pages,
            failures: self.failures,
            batch: self.batch,
        })
    }

    pub fn into_parts(self) -> (S, Vec<PagePlacement>, Vec<ItemFailure>) {
        (self.sink, self.pages, self.failures)
    }
}

/// A finished conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The PDF.
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: String,
    pub pages: Vec<PagePlacement>,
    pub failures: Vec<ItemFailure>,
    pub batch: BatchId,
}

impl Conversion {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Sequential batch conversion.
pub struct PageAccumulator<C: ImageCodec = RasterCodec> {
    codec: C,
    config: ConvertConfig,
}

impl PageAccumulator<RasterCodec> {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            codec: RasterCodec::new(config.jpeg_quality),
            config,
        }
    }
}

impl Default for PageAccumulator<RasterCodec> {
    fn default() -> Self {
        Self::new(ConvertConfig::default())
    }
}

impl<C: ImageCodec> PageAccumulator<C> {
    pub fn with_codec(codec: C, config: ConvertConfig) -> Self {
        Self { codec, config }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Build a PDF from `images`, one page per usable image, in input order.
    pub fn build_document(&self, images: &[RawImage]) -> Result<OutputDocument<PdfAssembler>> {
        self.build_with(
            images,
            PdfAssembler::new(self.config.title.as_str()),
            &CancelToken::new(),
        )
    }

    /// Build and serialize in one step.
    pub fn convert(&self, images: &[RawImage]) -> Result<Conversion> {
        self.build_document(images)?.serialize()
    }

    /// Like [`convert`](Self::convert), but stops with
    /// [`FolioError::Cancelled`] once `cancel` fires.
    pub fn convert_with_cancel(&self, images: &[RawImage], cancel: &CancelToken) -> Result<Conversion> {
        self.build_with(
            images,
            PdfAssembler::new(self.config.title.as_str()),
            cancel,
        )?
        .serialize()
    }

    /// Build into an arbitrary document sink. The token is checked before
    /// each item and between the stages of an item.
    #[instrument(skip(self, images, sink, cancel), fields(items = images.len()))]
    pub fn build_with<S: DocumentSink>(
        &self,
        images: &[RawImage],
        sink: S,
        cancel: &CancelToken,
    ) -> Result<OutputDocument<S>> {
        if images.is_empty() {
            return Err(FolioError::EmptyBatch);
        }

        let batch = BatchId::new();
        info!(%batch, items = images.len(), "Starting batch");

        let mut outcomes = Vec::with_capacity(images.len());
        for (index, raw) in images.iter().enumerate() {
            let outcome = self.prepare::<S>(raw, cancel);
            if cancel.is_cancelled() {
                warn!(%batch, index, "Batch cancelled");
                return Err(FolioError::Cancelled);
            }
            outcomes.push((index, outcome));
        }
        self.assemble(sink, outcomes, batch)
    }

    /// Classify, normalize, encode and lay out a single image. Pure per item;
    /// returns [`ItemError::Cancelled`] at the first stage boundary after
    /// `cancel` fires.
    #[instrument(skip_all, fields(bytes_len = raw.len(), hint = raw.content_type()))]
    pub fn prepare<S: DocumentSink>(
        &self,
        raw: &RawImage,
        cancel: &CancelToken,
    ) -> std::result::Result<PreparedPage<S::EncodedImage>, ItemError> {
        if cancel.is_cancelled() {
            return Err(ItemError::Cancelled);
        }
        let format = self.codec.detect_format(raw.bytes())?;

        if let Some(hint) = raw.content_type() {
            let hinted = ImageFormat::from_mime(hint);
            if hinted != format {
                debug!(%hinted, detected = %format, "Content-type hint disagrees with content");
            }
        }

        if format == ImageFormat::Unsupported {
            return Err(ItemError::UnsupportedFormat(
                "content is not a still JPEG, PNG or WebP image".into(),
            ));
        }

        if cancel.is_cancelled() {
            return Err(ItemError::Cancelled);
        }
        let image = Normalizer::from_config(&self.config).normalize(&self.codec, raw.bytes(), format)?;

        if cancel.is_cancelled() {
            return Err(ItemError::Cancelled);
        }
        let encoded = S::encode_image(&image)?;

        Ok(PreparedPage {
            format: image.format,
            natural: image.natural,
            layout: layout(image.natural, self.config.page_size),
            encoded,
        })
    }

    /// Append prepared items to `sink` in the order given and collect the
    /// failures.
    pub(crate) fn assemble<S, I>(&self, mut sink: S, outcomes: I, batch: BatchId) -> Result<OutputDocument<S>>
    where
        S: DocumentSink,
        I: IntoIterator<Item = (usize, std::result::Result<PreparedPage<S::EncodedImage>, ItemError>)>,
    {
        let mut pages = Vec::new();
        let mut failures = Vec::new();

        for (index, outcome) in outcomes {
            let prepared = match outcome {
                Ok(prepared) => prepared,
                Err(error) => {
                    warn!(%batch, index, %error, "Skipping image");
                    failures.push(ItemFailure { index, error });
                    continue;
                }
            };

            let PreparedPage {
                format,
                natural,
                layout,
                encoded,
            } = prepared;
            let handle = match sink.embed_image(encoded) {
                Ok(handle) => handle,
                Err(error) => {
                    warn!(%batch, index, %error, "Skipping image the document refused");
                    failures.push(ItemFailure { index, error });
                    continue;
                }
            };
            let page = sink.add_page(self.config.page_size);
            sink.draw_image(page, handle, &layout);

            debug!(
                index,
                page = pages.len() + 1,
                width = layout.render_width,
                height = layout.render_height,
                "Page added"
            );
            pages.push(PagePlacement {
                index,
                format,
                natural,
                layout,
            });
        }

        info!(
            %batch,
            pages = pages.len(),
            skipped = failures.len(),
            "Batch assembled"
        );

        if pages.is_empty() && self.config.fail_on_empty_result {
            return Err(FolioError::NoPagesProduced { failures });
        }

        Ok(OutputDocument {
            sink,
            pages,
            failures,
            batch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::PdfInspector;
    use crate::test_support::{
        SlowCodec, corrupt_bytes, gif_bytes, jpeg_bytes, png_bytes, webp_bytes,
    };
    use folio_core::PaperSize;

    /// Records the order of sink calls instead of writing a document.
    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<String>,
        refuse_embed: bool,
        pages: usize,
    }

    impl DocumentSink for RecordingSink {
        type PageHandle = usize;
        type ImageHandle = usize;
        type EncodedImage = EmbedFormat;

        fn encode_image(
            image: &folio_core::NormalizedImage,
        ) -> std::result::Result<EmbedFormat, ItemError> {
            Ok(image.format)
        }

        fn embed_image(&mut self, format: EmbedFormat) -> std::result::Result<usize, ItemError> {
            self.calls.push(format!("embed {:?}", format));
            if self.refuse_embed {
                return Err(ItemError::Embed("refused".into()));
            }
            Ok(self.calls.len())
        }

        fn add_page(&mut self, _size: PaperSize) -> usize {
            self.pages += 1;
            self.calls.push(format!("page {}", self.pages));
            self.pages
        }

        fn draw_image(&mut self, page: usize, _image: usize, _layout: &PageLayout) {
            self.calls.push(format!("draw {}", page));
        }

        fn page_count(&self) -> usize {
            self.pages
        }

        fn serialize(self) -> Result<Vec<u8>> {
            Ok(self.calls.join("\n").into_bytes())
        }
    }

    fn accumulator() -> PageAccumulator {
        PageAccumulator::default()
    }

    #[test]
    fn mixed_batch_skips_corrupt_item() {
        let images = vec![
            RawImage::new(png_bytes(40, 40)).with_content_type("image/png"),
            RawImage::new(corrupt_bytes()).with_content_type("image/jpeg"),
            RawImage::new(jpeg_bytes(60, 30)).with_content_type("image/jpeg"),
        ];
        let document = accumulator().build_document(&images).unwrap();

        assert_eq!(document.page_count(), 2);
        let indices: Vec<usize> = document.pages().iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(document.failures().len(), 1);
        assert_eq!(document.failures()[0].index, 1);
        assert!(matches!(document.failures()[0].error, ItemError::Decode(_)));

        let conversion = document.serialize().unwrap();
        let inspector = PdfInspector::from_bytes(&conversion.bytes).unwrap();
        assert_eq!(inspector.page_count(), 2);
        assert_eq!(
            inspector.page_images(1).unwrap()[0].filter.as_deref(),
            Some("FlateDecode")
        );
        assert_eq!(
            inspector.page_images(2).unwrap()[0].filter.as_deref(),
            Some("DCTDecode")
        );
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            accumulator().build_document(&[]),
            Err(FolioError::EmptyBatch)
        ));
    }

    #[test]
    fn all_failed_yields_empty_document() {
        let conversion = accumulator()
            .convert(&[RawImage::new(corrupt_bytes())])
            .unwrap();
        assert_eq!(conversion.page_count(), 0);
        assert_eq!(conversion.failures.len(), 1);
        assert_eq!(PdfInspector::from_bytes(&conversion.bytes).unwrap().page_count(), 0);
    }

    #[test]
    fn all_failed_can_be_a_batch_error() {
        let config = ConvertConfig {
            fail_on_empty_result: true,
            ..ConvertConfig::default()
        };
        let result = PageAccumulator::new(config).build_document(&[
            RawImage::new(corrupt_bytes()),
            RawImage::new(Vec::new()),
        ]);
        match result {
            Err(FolioError::NoPagesProduced { failures }) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[1].index, 1);
            }
            _ => panic!("expected NoPagesProduced"),
        }
    }

    #[test]
    fn tall_jpeg_is_scaled_to_page_width() {
        let document = accumulator()
            .build_document(&[RawImage::new(jpeg_bytes(1000, 2000))])
            .unwrap();
        let layout = document.pages()[0].layout;
        assert!((layout.render_width - 595.0).abs() < 1e-6);
        assert!((layout.render_height - 1190.0).abs() < 1e-6);
        assert!(layout.offset_x.abs() < 1e-6);
        assert!((layout.offset_y + 174.0).abs() < 1e-6);
    }

    #[test]
    fn webp_is_embedded_as_png() {
        let document = accumulator()
            .build_document(&[RawImage::new(webp_bytes(30, 20))])
            .unwrap();
        assert_eq!(document.pages()[0].format, EmbedFormat::Png);
        assert_eq!(document.pages()[0].natural, Dimensions::new(30, 20));
    }

    #[test]
    fn gif_is_unsupported() {
        let document = accumulator()
            .build_document(&[RawImage::new(gif_bytes()).with_content_type("image/png")])
            .unwrap();
        assert_eq!(document.page_count(), 0);
        assert!(matches!(
            document.failures()[0].error,
            ItemError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn content_wins_over_hint() {
        let document = accumulator()
            .build_document(&[RawImage::new(png_bytes(8, 8)).with_content_type("image/jpeg")])
            .unwrap();
        assert_eq!(document.pages()[0].format, EmbedFormat::Png);
    }

    #[test]
    fn repeated_runs_give_identical_layouts() {
        let images = vec![
            RawImage::new(jpeg_bytes(700, 300)),
            RawImage::new(corrupt_bytes()),
            RawImage::new(png_bytes(100, 900)),
        ];
        let acc = accumulator();
        let first = acc.build_document(&images).unwrap();
        let second = acc.build_document(&images).unwrap();
        assert_eq!(first.pages(), second.pages());
        assert_eq!(first.failures(), second.failures());
        assert_ne!(first.batch_id(), second.batch_id());
    }

    #[test]
    fn sink_sees_embed_page_draw_per_item() {
        let images = vec![
            RawImage::new(jpeg_bytes(10, 10)),
            RawImage::new(corrupt_bytes()),
            RawImage::new(png_bytes(10, 10)),
        ];
        let document = accumulator()
            .build_with(&images, RecordingSink::default(), &CancelToken::new())
            .unwrap();
        let (sink, _, _) = document.into_parts();
        assert_eq!(
            sink.calls,
            vec!["embed Jpeg", "page 1", "draw 1", "embed Png", "page 2", "draw 2"]
        );
    }

    #[test]
    fn refused_embed_is_skipped_without_a_page() {
        let sink = RecordingSink {
            refuse_embed: true,
            ..RecordingSink::default()
        };
        let document = accumulator()
            .build_with(&[RawImage::new(jpeg_bytes(10, 10))], sink, &CancelToken::new())
            .unwrap();
        assert_eq!(document.page_count(), 0);
        assert!(matches!(document.failures()[0].error, ItemError::Embed(_)));
        let (sink, _, _) = document.into_parts();
        assert_eq!(sink.page_count(), 0);
    }

    #[test]
    fn conversion_carries_fingerprint_and_title() {
        let config = ConvertConfig {
            title: "Receipts".into(),
            ..ConvertConfig::default()
        };
        let conversion = PageAccumulator::new(config)
            .convert(&[RawImage::new(jpeg_bytes(20, 20))])
            .unwrap();
        assert_eq!(conversion.sha256, hash_bytes(&conversion.bytes));
        let inspector = PdfInspector::from_bytes(&conversion.bytes).unwrap();
        assert_eq!(inspector.title().as_deref(), Some("Receipts"));
        assert_eq!(inspector.media_box(1).unwrap(), (595.0, 842.0));
    }

    #[test]
    fn png_is_encoded_before_assembly() {
        let prepared = accumulator()
            .prepare::<PdfAssembler>(&RawImage::new(png_bytes(40, 30)), &CancelToken::new())
            .unwrap();
        assert_eq!(prepared.encoded.filter(), "FlateDecode");
        assert_eq!(
            (prepared.encoded.width(), prepared.encoded.height()),
            (40, 30)
        );
    }

    #[test]
    fn cancelled_token_stops_sequential_batch() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = accumulator().convert_with_cancel(&[RawImage::new(jpeg_bytes(10, 10))], &cancel);
        assert!(matches!(result, Err(FolioError::Cancelled)));
    }

    #[test]
    fn cancel_mid_batch_leaves_later_items_untouched() {
        let cancel = CancelToken::new();
        let codec = SlowCodec::new().cancelling(cancel.clone());
        let stats = codec.stats();
        let images = vec![
            RawImage::new(jpeg_bytes(10, 10)),
            RawImage::new(png_bytes(10, 10)),
            RawImage::new(jpeg_bytes(20, 20)),
        ];

        let result = PageAccumulator::with_codec(codec, ConvertConfig::default()).build_with(
            &images,
            RecordingSink::default(),
            &cancel,
        );
        assert!(matches!(result, Err(FolioError::Cancelled)));
        assert_eq!(stats.started(), 1);
    }
}
