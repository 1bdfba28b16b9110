// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Concurrent conversion — decode, normalize and encode items on the blocking
// pool with a bounded number of workers, then append pages in input order.

use std::sync::Arc;

use folio_core::error::Result;
use folio_core::{BatchId, ConvertConfig, FolioError, ItemError, RawImage};
use futures::StreamExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::accumulate::{Conversion, OutputDocument, PageAccumulator};
use crate::cancel::CancelToken;
use crate::codec::{ImageCodec, RasterCodec};
use crate::pdf::writer::PdfAssembler;

/// Batch conversion with bounded parallel decoding.
///
/// Produces the same pages and failures, in the same order, as
/// [`PageAccumulator`]. At most `concurrency` workers run at once, counting
/// workers whose item has already timed out. Each item gets `item_timeout_ms`
/// once it has a worker; an item that overruns is reported as
/// [`ItemError::TimedOut`] and its worker is told to stop at the next stage
/// boundary. No worker outlives the call.
pub struct ConcurrentConverter<C: ImageCodec + 'static = RasterCodec> {
    accumulator: Arc<PageAccumulator<C>>,
}

impl ConcurrentConverter<RasterCodec> {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            accumulator: Arc::new(PageAccumulator::new(config)),
        }
    }
}

impl<C: ImageCodec + 'static> ConcurrentConverter<C> {
    pub fn with_codec(codec: C, config: ConvertConfig) -> Self {
        Self {
            accumulator: Arc::new(PageAccumulator::with_codec(codec, config)),
        }
    }

    pub fn config(&self) -> &ConvertConfig {
        self.accumulator.config()
    }

    /// Build the document. Returns [`FolioError::Cancelled`] if `cancel`
    /// fires before every item has been prepared.
    #[instrument(skip_all, fields(items = images.len(), concurrency = self.config().concurrency))]
    pub async fn build_document(
        &self,
        images: Vec<RawImage>,
        cancel: &CancelToken,
    ) -> Result<OutputDocument<PdfAssembler>> {
        if images.is_empty() {
            return Err(FolioError::EmptyBatch);
        }
        if cancel.is_cancelled() {
            return Err(FolioError::Cancelled);
        }

        let batch = BatchId::new();
        let config = self.config();
        let slots = u32::try_from(config.concurrency.max(1)).unwrap_or(u32::MAX);
        let limit = slots as usize;
        let timeout = config.item_timeout();
        let timeout_ms = config.item_timeout_ms;
        info!(%batch, items = images.len(), limit, "Starting concurrent batch");

        // A permit is held by the blocking worker itself, so a slot only
        // frees once the work has really stopped.
        let workers = Arc::new(Semaphore::new(limit));

        let jobs = images.into_iter().enumerate().map(|(index, raw)| {
            let accumulator = Arc::clone(&self.accumulator);
            let workers = Arc::clone(&workers);
            let item_cancel = cancel.child();
            async move {
                let permit = workers.acquire_owned().await.ok()?;
                if item_cancel.is_cancelled() {
                    return None;
                }
                let worker_cancel = item_cancel.clone();
                let task = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    accumulator.prepare::<PdfAssembler>(&raw, &worker_cancel)
                });
                let outcome = match tokio::time::timeout(timeout, task).await {
                    Ok(Ok(prepared)) => prepared,
                    Ok(Err(join_err)) => Err(ItemError::Decode(format!(
                        "decoder task failed: {}",
                        join_err
                    ))),
                    Err(_) => {
                        item_cancel.cancel();
                        warn!(index, timeout_ms, "Image decode timed out");
                        Err(ItemError::TimedOut {
                            after_ms: timeout_ms,
                        })
                    }
                };
                Some((index, outcome))
            }
        });

        let prepare_all = futures::stream::iter(jobs)
            .buffer_unordered(limit)
            .collect::<Vec<_>>();

        let finished = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcomes = prepare_all => Some(outcomes),
        };

        // Wait for stragglers (timed out or cancelled) to hand back their slot.
        if workers.acquire_many(slots).await.is_ok() {
            debug!(%batch, "All workers finished");
        }

        let finished = match finished {
            Some(finished) if !cancel.is_cancelled() => finished,
            _ => {
                warn!(%batch, "Batch cancelled");
                return Err(FolioError::Cancelled);
            }
        };

        let mut outcomes: Vec<_> = finished.into_iter().flatten().collect();
        outcomes.sort_by_key(|(index, _)| *index);

        self.accumulator.assemble(
            PdfAssembler::new(self.config().title.as_str()),
            outcomes,
            batch,
        )
    }

    /// Build and serialize in one step.
    pub async fn convert(&self, images: Vec<RawImage>, cancel: &CancelToken) -> Result<Conversion> {
        self.build_document(images, cancel).await?.serialize()
    }
}

/// Convert `images` with the default codec, decoding up to
/// `config.concurrency` items at once.
pub async fn convert_concurrent(
    images: Vec<RawImage>,
    config: ConvertConfig,
    cancel: &CancelToken,
) -> Result<Conversion> {
    ConcurrentConverter::new(config).convert(images, cancel).await
}
