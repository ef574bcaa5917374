//! Chunked streaming over large result sets
//!
//! [`StreamingPaginator::produce_chunks`] validates the result size up front,
//! then hands out a lazy [`ChunkStream`]. Between chunks the stream consults
//! its cancellation token and, if one is attached, the resource guard. Once a
//! chunk has been handed out it is never revoked.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::error::QueryError;
use crate::limits::ResourceGuard;

pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const DEFAULT_LARGE_RESULT_THRESHOLD: usize = 1000;
pub const DEFAULT_STREAM_CEILING: usize = 50_000;

/// Cooperative cancellation flag shared between a stream and its owner
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Above this many results a warning is logged; streaming continues
    pub large_result_threshold: usize,
    /// Above this many results streaming refuses to start
    pub ceiling: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            large_result_threshold: DEFAULT_LARGE_RESULT_THRESHOLD,
            ceiling: DEFAULT_STREAM_CEILING,
        }
    }
}

/// One unit of streamed output. Sequence numbers start at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk<T> {
    pub sequence: usize,
    pub items: Vec<T>,
}

pub struct StreamingPaginator<T> {
    items: Vec<T>,
    options: StreamOptions,
    guard: Option<ResourceGuard>,
    cancellation: CancellationToken,
}

impl<T> StreamingPaginator<T> {
    pub fn new(items: Vec<T>, options: StreamOptions) -> Self {
        Self {
            items,
            options,
            guard: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Check this guard before every chunk after the first
    pub fn with_guard(mut self, guard: ResourceGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Start streaming in chunks of `chunk_size`.
    ///
    /// Fails before producing anything when the result set is above the
    /// ceiling or the chunk size is zero.
    pub fn produce_chunks(self, chunk_size: usize) -> Result<ChunkStream<T>, QueryError> {
        if chunk_size == 0 {
            return Err(QueryError::invalid_argument(
                "chunk size",
                "chunk size must be at least 1",
            ));
        }

        let total = self.items.len();
        if total > self.options.ceiling {
            return Err(QueryError::ResultSetTooLarge {
                count: total,
                ceiling: self.options.ceiling,
            });
        }

        let large_result_warning = total > self.options.large_result_threshold;
        if large_result_warning {
            warn!(
                "Streaming {} results (threshold {}); consider narrowing the search",
                total, self.options.large_result_threshold
            );
        }

        Ok(ChunkStream {
            items: self.items.into_iter(),
            chunk_size,
            total,
            sequence: 0,
            guard: self.guard,
            cancellation: self.cancellation,
            large_result_warning,
            finished: false,
        })
    }
}

/// Lazy, finite, non-restartable sequence of chunks.
///
/// Fused: after an error, cancellation or exhaustion it only yields `None`.
pub struct ChunkStream<T> {
    items: std::vec::IntoIter<T>,
    chunk_size: usize,
    total: usize,
    sequence: usize,
    guard: Option<ResourceGuard>,
    cancellation: CancellationToken,
    large_result_warning: bool,
    finished: bool,
}

impl<T> ChunkStream<T> {
    /// Whether the result count crossed the large-result threshold
    pub fn large_result_warning(&self) -> bool {
        self.large_result_warning
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of chunks handed out so far
    pub fn chunks_emitted(&self) -> usize {
        self.sequence
    }

    pub fn guard(&self) -> Option<&ResourceGuard> {
        self.guard.as_ref()
    }
}

impl<T> Iterator for ChunkStream<T> {
    type Item = Result<StreamChunk<T>, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if self.cancellation.is_cancelled() {
            info!("Stream cancelled after {} chunks", self.sequence);
            self.finished = true;
            return None;
        }

        if self.sequence > 0
            && let Some(guard) = self.guard.as_mut()
            && let Err(e) = guard.check()
        {
            warn!("Stream stopped after {} chunks: {}", self.sequence, e);
            self.finished = true;
            return Some(Err(e));
        }

        let items: Vec<T> = self.items.by_ref().take(self.chunk_size).collect();
        if items.is_empty() {
            self.finished = true;
            return None;
        }

        self.sequence += 1;
        Some(Ok(StreamChunk {
            sequence: self.sequence,
            items,
        }))
    }
}

impl<T> std::iter::FusedIterator for ChunkStream<T> {}
