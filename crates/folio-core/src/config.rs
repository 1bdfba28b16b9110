// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Settings for one conversion. Missing keys in a JSON file fall back to
/// the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Page canvas every image is placed on.
    pub page_size: crate::PaperSize,
    /// Title written to the PDF Info dictionary.
    pub title: String,
    /// Maximum number of images decoded at once by the concurrent pipeline.
    pub concurrency: usize,
    /// Per-image decode budget for the concurrent pipeline, in milliseconds.
    pub item_timeout_ms: u64,
    /// Resample images wider than the page down to the render width before
    /// embedding. Keeps the output small at the cost of re-encoding.
    pub downscale_to_page: bool,
    /// JPEG quality (1-100) used when a downscaled JPEG is re-encoded.
    pub jpeg_quality: u8,
    /// Treat a batch in which every image failed as a batch error instead of
    /// returning an empty document.
    pub fail_on_empty_result: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            page_size: crate::PaperSize::A4,
            title: "Folio Document".into(),
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            item_timeout_ms: 30_000,
            downscale_to_page: false,
            jpeg_quality: 90,
            fail_on_empty_result: false,
        }
    }
}

impl ConvertConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.page_size.dimensions_pt();
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(FolioError::Config(format!(
                "page size must be positive, got {width}x{height}"
            )));
        }
        if self.concurrency == 0 {
            return Err(FolioError::Config("concurrency must be at least 1".into()));
        }
        if self.item_timeout_ms == 0 {
            return Err(FolioError::Config("item timeout must be non-zero".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(FolioError::Config(format!(
                "JPEG quality must be within 1-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
