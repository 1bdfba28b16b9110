// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — assembling image pages and reading finished documents back.

pub mod reader;
pub mod writer;
pub mod xobject;

pub use reader::{PdfInspector, PlacedImage};
pub use writer::{DocumentSink, ImageRef, PageRef, PdfAssembler};
pub use xobject::{ColorSpace, ImageXObject};
