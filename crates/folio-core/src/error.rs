// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types for Folio.
//
// `FolioError` ends a whole batch and is returned to the caller on its own.
// `ItemError` describes why a single image was skipped; it is collected
// alongside the finished document and never aborts the batch.

use thiserror::Error;

/// Batch-level failure. No document is produced.
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("no images were supplied")]
    EmptyBatch,

    #[error("none of the {} images could be converted", failures.len())]
    NoPagesProduced { failures: Vec<ItemFailure> },

    #[error("PDF serialization failed: {0}")]
    Serialization(String),

    #[error("could not read PDF: {0}")]
    Inspect(String),

    #[error("conversion was cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a single image was left out of the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("decoding timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },

    #[error("could not re-encode image: {0}")]
    Encode(String),

    #[error("could not embed image in PDF: {0}")]
    Embed(String),

    /// The batch was cancelled while this item was being prepared. Never
    /// reported in a finished document; the batch fails with
    /// [`FolioError::Cancelled`] instead.
    #[error("processing was stopped")]
    Cancelled,
}

/// A skipped input, keyed by its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub index: usize,
    pub error: ItemError,
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image #{}: {}", self.index, self.error)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
