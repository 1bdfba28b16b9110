// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — assemble image pages into a PDF document using `lopdf`.
//
// Images arrive as ready [`ImageXObject`] payloads; the writer stores their
// streams, lays out page content and serializes the document.

use folio_core::{FolioError, ItemError, NormalizedImage, PageLayout, PaperSize};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info, instrument};

use super::xobject::ImageXObject;

/// The operations the page accumulator needs from a document library.
///
/// A sink starts empty when constructed. Every accepted image first goes
/// through [`encode_image`](Self::encode_image), on whichever thread prepared
/// it. The accumulator then calls [`embed_image`](Self::embed_image),
/// [`add_page`](Self::add_page) and [`draw_image`](Self::draw_image) in
/// order; after the last image it calls [`serialize`](Self::serialize)
/// exactly once.
pub trait DocumentSink {
    type PageHandle: Copy;
    type ImageHandle: Copy;
    /// An image in the form the document stores it.
    type EncodedImage: Send + 'static;

    /// Convert a normalized image for storage. CPU-bound and independent of
    /// any document, so it runs inside the item's time budget.
    fn encode_image(image: &NormalizedImage) -> Result<Self::EncodedImage, ItemError>;

    /// Store an encoded image in the document. A failure here skips the item.
    fn embed_image(&mut self, image: Self::EncodedImage) -> Result<Self::ImageHandle, ItemError>;

    /// Append an empty page of the given size.
    fn add_page(&mut self, size: PaperSize) -> Self::PageHandle;

    /// Draw a previously embedded image onto a page.
    fn draw_image(&mut self, page: Self::PageHandle, image: Self::ImageHandle, layout: &PageLayout);

    fn page_count(&self) -> usize;

    /// Produce the finished document bytes.
    fn serialize(self) -> Result<Vec<u8>, FolioError>;
}

/// Index of a page inside a [`PdfAssembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef(usize);

/// An embedded image XObject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef(ObjectId);

struct PendingPage {
    size: PaperSize,
    draws: Vec<(ObjectId, PageLayout)>,
}

/// Builds a PDF in memory, one page at a time.
pub struct PdfAssembler {
    document: Document,
    pages_id: ObjectId,
    pages: Vec<PendingPage>,
    title: String,
}

impl PdfAssembler {
    /// Start an empty document.
    pub fn new(title: impl Into<String>) -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            pages: Vec::new(),
            title: title.into(),
        }
    }

    fn page_content(draws: &[(ObjectId, PageLayout)]) -> (Content, Dictionary) {
        let mut operations = Vec::with_capacity(draws.len() * 4);
        let mut xobjects = Dictionary::new();

        for (position, (image_id, layout)) in draws.iter().enumerate() {
            let name = format!("Im{}", position + 1);
            xobjects.set(name.as_bytes().to_vec(), *image_id);

            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    (layout.render_width as f32).into(),
                    0.into(),
                    0.into(),
                    (layout.render_height as f32).into(),
                    (layout.offset_x as f32).into(),
                    (layout.offset_y as f32).into(),
                ],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
        }

        (Content { operations }, xobjects)
    }
}

impl DocumentSink for PdfAssembler {
    type PageHandle = PageRef;
    type ImageHandle = ImageRef;
    type EncodedImage = ImageXObject;

    fn encode_image(image: &NormalizedImage) -> Result<ImageXObject, ItemError> {
        ImageXObject::encode(image)
    }

    fn embed_image(&mut self, image: ImageXObject) -> Result<ImageRef, ItemError> {
        let (mut stream, mask) = image.into_streams();
        if let Some(mask) = mask {
            let mask_id = self.document.add_object(mask);
            stream.dict.set("SMask", mask_id);
        }
        let id = self.document.add_object(stream);
        debug!(?id, "Image embedded");
        Ok(ImageRef(id))
    }

    fn add_page(&mut self, size: PaperSize) -> PageRef {
        self.pages.push(PendingPage {
            size,
            draws: Vec::new(),
        });
        PageRef(self.pages.len() - 1)
    }

    fn draw_image(&mut self, page: PageRef, image: ImageRef, layout: &PageLayout) {
        if let Some(pending) = self.pages.get_mut(page.0) {
            pending.draws.push((image.0, *layout));
        }
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[instrument(skip(self), fields(pages = self.pages.len()))]
    fn serialize(mut self) -> Result<Vec<u8>, FolioError> {
        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());

        for pending in &self.pages {
            let (content, xobjects) = Self::page_content(&pending.draws);
            let encoded = content.encode().map_err(|err| {
                FolioError::Serialization(format!("failed to encode page content: {}", err))
            })?;
            let content_id = self.document.add_object(Stream::new(dictionary! {}, encoded));

            let (width, height) = pending.size.dimensions_pt();
            let media_box: Vec<Object> = vec![
                0.into(),
                0.into(),
                (width as f32).into(),
                (height as f32).into(),
            ];
            let page_id = self.document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => media_box,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => xobjects,
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let creation_date = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        let info_id = self.document.add_object(dictionary! {
            "Title" => Object::string_literal(self.title.as_str()),
            "Producer" => Object::string_literal("Folio"),
            "CreationDate" => Object::string_literal(creation_date),
        });
        self.document.trailer.set("Root", catalog_id);
        self.document.trailer.set("Info", info_id);

        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            FolioError::Serialization(format!("failed to write PDF: {}", err))
        })?;

        info!(pages = count, output_bytes = output.len(), "PDF serialized");
        Ok(output)
    }
}
