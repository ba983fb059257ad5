use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Split `targets` into order-preserving chunks of `chunk_size`.
///
/// Every chunk is full except possibly the last; no targets yields no chunks.
pub fn plan_batches<T: Clone>(targets: &[T], chunk_size: NonZeroUsize) -> Vec<Vec<T>> {
    targets
        .chunks(chunk_size.get())
        .map(<[T]>::to_vec)
        .collect()
}

/// Chunks plus a cursor at the next chunk to attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPlan<T> {
    chunks: Vec<Vec<T>>,
    cursor: usize,
}

impl<T: Clone> BatchPlan<T> {
    pub fn new(targets: &[T], chunk_size: NonZeroUsize) -> Self {
        Self {
            chunks: plan_batches(targets, chunk_size),
            cursor: 0,
        }
    }
}

impl<T> BatchPlan<T> {
    pub fn current(&self) -> Option<&[T]> {
        self.chunks.get(self.cursor).map(Vec::as_slice)
    }

    /// Move past the current chunk. No-op once exhausted.
    pub fn advance(&mut self) {
        if self.cursor < self.chunks.len() {
            self.cursor += 1;
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.chunks.len()
    }

    pub fn total(&self) -> usize {
        self.chunks.len()
    }

    /// Zero-based index of the next chunk to attempt.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.chunks.len() - self.cursor
    }

    pub fn chunks(&self) -> &[Vec<T>] {
        &self.chunks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Synchronous,
    Interactive,
}

/// Small target sets run in one pass; larger ones become a session.
pub fn choose_mode(
    target_count: usize,
    threshold: usize,
    requested: Option<ExecutionMode>,
) -> ExecutionMode {
    requested.unwrap_or(if target_count <= threshold {
        ExecutionMode::Synchronous
    } else {
        ExecutionMode::Interactive
    })
}
