// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF inspector — open a finished document with `lopdf` and report what each
// page contains: media box, image XObjects and where they are drawn.

use std::collections::HashMap;

use folio_core::{FolioError, PageLayout};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument};

/// An image XObject drawn on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    /// Resource name, e.g. `Im1`.
    pub name: String,
    /// Stream filter (`DCTDecode`, `FlateDecode`), if any.
    pub filter: Option<String>,
    /// Length of the stored (still encoded) stream data.
    pub stream_len: usize,
    pub pixel_width: i64,
    pub pixel_height: i64,
    pub has_soft_mask: bool,
    /// Rectangle set by the `cm` operator preceding `Do`, if any.
    pub placement: Option<PageLayout>,
}

/// Read-only view over a PDF.
pub struct PdfInspector {
    document: Document,
}

impl PdfInspector {
    /// Parse PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, FolioError> {
        let document = Document::load_mem(data).map_err(|err| {
            FolioError::Inspect(format!("failed to load PDF from memory: {}", err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Title from the Info dictionary.
    pub fn title(&self) -> Option<String> {
        let info = self.document.trailer.get(b"Info").ok()?;
        let info = self.resolve(info).ok()?.as_dict().ok()?;
        match info.get(b"Title").ok()? {
            Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    /// Width and height of a page's media box (1-indexed page number).
    pub fn media_box(&self, page_number: u32) -> Result<(f64, f64), FolioError> {
        let page = self.page_dict(page_number)?;
        let values = page
            .get(b"MediaBox")
            .and_then(Object::as_array)
            .map_err(|err| FolioError::Inspect(format!("page {} has no MediaBox: {}", page_number, err)))?;
        let numbers: Vec<f64> = values
            .iter()
            .filter_map(|value| value.as_float().ok())
            .map(f64::from)
            .collect();
        match numbers.as_slice() {
            [x0, y0, x1, y1] => Ok((x1 - x0, y1 - y0)),
            _ => Err(FolioError::Inspect(format!(
                "page {} has a malformed MediaBox",
                page_number
            ))),
        }
    }

    /// Image XObjects referenced by a page (1-indexed), in drawing order.
    pub fn page_images(&self, page_number: u32) -> Result<Vec<PlacedImage>, FolioError> {
        let page_id = self.page_id(page_number)?;
        let page = self.page_dict(page_number)?;

        let placements = self.placements(page_id)?;

        let Some(xobjects) = page
            .get(b"Resources")
            .ok()
            .and_then(|resources| self.resolve(resources).ok())
            .and_then(|resources| resources.as_dict().ok())
            .and_then(|resources| resources.get(b"XObject").ok())
            .and_then(|xobjects| self.resolve(xobjects).ok())
            .and_then(|xobjects| xobjects.as_dict().ok())
        else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        for (name, reference) in xobjects.iter() {
            let stream = self
                .resolve(reference)
                .and_then(|object| {
                    object
                        .as_stream()
                        .map_err(|err| FolioError::Inspect(err.to_string()))
                })?;
            let name = String::from_utf8_lossy(name).into_owned();
            images.push(PlacedImage {
                placement: placements.get(&name).copied(),
                name,
                filter: match stream.dict.get(b"Filter") {
                    Ok(Object::Name(filter)) => Some(String::from_utf8_lossy(filter).into_owned()),
                    _ => None,
                },
                stream_len: stream.content.len(),
                pixel_width: stream.dict.get(b"Width").and_then(Object::as_i64).unwrap_or(0),
                pixel_height: stream.dict.get(b"Height").and_then(Object::as_i64).unwrap_or(0),
                has_soft_mask: stream.dict.get(b"SMask").is_ok(),
            });
        }

        images.sort_by_key(|image| {
            image
                .name
                .trim_start_matches("Im")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        });
        Ok(images)
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page_number: u32) -> Result<ObjectId, FolioError> {
        let pages = self.document.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            FolioError::Inspect(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }

    fn page_dict(&self, page_number: u32) -> Result<&Dictionary, FolioError> {
        let page_id = self.page_id(page_number)?;
        self.document
            .get_dictionary(page_id)
            .map_err(|err| FolioError::Inspect(format!("cannot read page {}: {}", page_number, err)))
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object, FolioError> {
        match object {
            Object::Reference(id) => self
                .document
                .get_object(*id)
                .map_err(|err| FolioError::Inspect(format!("cannot resolve {:?}: {}", id, err))),
            other => Ok(other),
        }
    }

    /// Map each XObject name to the rectangle of the `cm` that precedes its
    /// `Do` inside the same `q`/`Q` group.
    fn placements(&self, page_id: ObjectId) -> Result<HashMap<String, PageLayout>, FolioError> {
        let raw = self
            .document
            .get_page_content(page_id)
            .map_err(|err| FolioError::Inspect(format!("cannot read page content: {}", err)))?;
        let content = Content::decode(&raw)
            .map_err(|err| FolioError::Inspect(format!("cannot parse page content: {}", err)))?;

        let mut placements = HashMap::new();
        let mut current: Option<PageLayout> = None;
        for operation in &content.operations {
            match operation.operator.as_str() {
                "q" | "Q" => current = None,
                "cm" => {
                    let values: Vec<f64> = operation
                        .operands
                        .iter()
                        .filter_map(|operand| operand.as_float().ok())
                        .map(f64::from)
                        .collect();
                    if let [a, _, _, d, e, f] = values.as_slice() {
                        current = Some(PageLayout {
                            render_width: *a,
                            render_height: *d,
                            offset_x: *e,
                            offset_y: *f,
                        });
                    }
                }
                "Do" => {
                    if let (Some(Object::Name(name)), Some(layout)) =
                        (operation.operands.first(), current)
                    {
                        placements.insert(String::from_utf8_lossy(name).into_owned(), layout);
                    }
                }
                _ => {}
            }
        }
        Ok(placements)
    }
}
