// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch report — JSON summary of a conversion: where each page came from and
// why skipped images were left out.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use folio_core::human_errors::{describe_failure, humanize_item_error};
use folio_core::{Dimensions, EmbedFormat, PageLayout};
use folio_document::Conversion;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub batch: String,
    pub output: PathBuf,
    pub sha256: String,
    pub pages: Vec<PageEntry>,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Serialize)]
pub struct PageEntry {
    /// 1-based page number in the PDF.
    pub page: usize,
    pub source: Option<PathBuf>,
    pub format: EmbedFormat,
    pub natural: Dimensions,
    pub layout: PageLayout,
}

#[derive(Debug, Serialize)]
pub struct SkippedEntry {
    /// 0-based position in the input batch.
    pub index: usize,
    pub source: Option<PathBuf>,
    pub reason: String,
    pub message: String,
    pub suggestion: String,
    pub retriable: bool,
}

impl BatchReport {
    pub fn new(conversion: &Conversion, inputs: &[PathBuf], output: &Path) -> Self {
        let source = |index: usize| inputs.get(index).cloned();

        let pages = conversion
            .pages
            .iter()
            .enumerate()
            .map(|(position, placement)| PageEntry {
                page: position + 1,
                source: source(placement.index),
                format: placement.format,
                natural: placement.natural,
                layout: placement.layout,
            })
            .collect();

        let skipped = conversion
            .failures
            .iter()
            .map(|failure| {
                let human = humanize_item_error(&failure.error);
                SkippedEntry {
                    index: failure.index,
                    source: source(failure.index),
                    reason: failure.error.to_string(),
                    message: describe_failure(failure),
                    suggestion: human.suggestion,
                    retriable: human.retriable,
                }
            })
            .collect();

        Self {
            batch: conversion.batch.to_string(),
            output: output.to_path_buf(),
            sha256: conversion.sha256.clone(),
            pages,
            skipped,
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))
    }
}
