// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input collection — read image files from disk into raw batch items.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use folio_core::{ImageFormat, RawImage};
use tracing::debug;

/// Content-type hint derived from the file extension. Advisory only; the
/// pipeline classifies by content.
pub fn hint_for(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_extension)
        .and_then(|format| format.mime_type())
}

/// Read every path, in order, into a [`RawImage`].
///
/// Refuses batches larger than `max_items`. A file that cannot be read ends
/// the run, since there is nothing to classify.
pub fn read_images(paths: &[PathBuf], max_items: usize) -> Result<Vec<RawImage>> {
    if paths.len() > max_items {
        bail!(
            "too many images: {} given, at most {} allowed per batch",
            paths.len(),
            max_items
        );
    }

    paths
        .iter()
        .map(|path| {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            debug!(path = %path.display(), bytes = data.len(), "Input read");
            let image = RawImage::new(data);
            Ok(match hint_for(path) {
                Some(hint) => image.with_content_type(hint),
                None => image,
            })
        })
        .collect()
}
