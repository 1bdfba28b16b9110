// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cooperative cancellation for batch conversions.

use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative cancellation shared between a conversion and its caller.
///
/// Clones observe the same flag. Once cancelled, a token stays cancelled.
/// A [`child`](Self::child) token is cancelled together with its parent but
/// can also be cancelled on its own, which is how a single timed-out item is
/// told to stop without touching the rest of the batch.
#[derive(Debug, Clone)]
pub struct CancelToken {
    own: Arc<watch::Sender<bool>>,
    parents: Vec<Arc<watch::Sender<bool>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            own: Arc::new(sender),
            parents: Vec::new(),
        }
    }

    /// A token that also reports cancelled once `self` is.
    pub fn child(&self) -> Self {
        let (sender, _) = watch::channel(false);
        let mut parents = self.parents.clone();
        parents.push(Arc::clone(&self.own));
        Self {
            own: Arc::new(sender),
            parents,
        }
    }

    pub fn cancel(&self) {
        self.own.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.senders().any(|sender| *sender.borrow())
    }

    /// Resolves once this token or one of its parents has been cancelled.
    pub async fn cancelled(&self) {
        let waits = self
            .senders()
            .map(|sender| Box::pin(wait_cancelled(sender.subscribe())));
        futures::future::select_all(waits).await;
    }

    fn senders(&self) -> impl Iterator<Item = &Arc<watch::Sender<bool>>> {
        std::iter::once(&self.own).chain(self.parents.iter())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_cancelled(mut receiver: watch::Receiver<bool>) {
    // The sender lives as long as the token, so this only returns on cancel.
    let _ = receiver.wait_for(|cancelled| *cancelled).await;
}
