//! Fixed-size batching with eager per-record conversion

use std::num::NonZeroUsize;

use crate::cancel::CancelToken;
use crate::error::{Outcome, StreamError};

/// Upper bound for the initial allocation of one batch
const PREALLOC_LIMIT: usize = 8192;

/// Converted outcomes of consecutive raw records, in decode order.
#[derive(Debug)]
pub struct Batch<T> {
    /// Sequence number, starting at 0
    pub seq: u64,
    pub items: Vec<Outcome<T>>,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Groups decoded records into batches of `size`, converting each record as
/// it is pulled from the decoder.
///
/// The last batch may be under-full; an empty batch is never produced. When
/// the decoder fails, the partial batch is yielded first, then the error,
/// then iteration ends.
pub struct Batcher<I, F> {
    records: I,
    convert: F,
    size: NonZeroUsize,
    seq: u64,
    pending: Option<StreamError>,
    cancel: Option<CancelToken>,
    done: bool,
}

impl<I, F> Batcher<I, F> {
    pub fn new(records: I, convert: F, size: NonZeroUsize) -> Self {
        Self {
            records,
            convert,
            size,
            seq: 0,
            pending: None,
            cancel: None,
            done: false,
        }
    }

    /// Stop pulling records once `token` is cancelled. The batch in progress
    /// is still yielded.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The underlying decoder, e.g. to read its counters after the run
    pub fn records(&self) -> &I {
        &self.records
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

impl<I, R, F, T> Iterator for Batcher<I, F>
where
    I: Iterator<Item = Result<R, StreamError>>,
    F: FnMut(R) -> Outcome<T>,
{
    type Item = Result<Batch<T>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending.take() {
            return Some(Err(e));
        }
        if self.done {
            return None;
        }

        let mut items = Vec::with_capacity(self.size.get().min(PREALLOC_LIMIT));
        while items.len() < self.size.get() {
            if self.cancelled() {
                log::debug!("batcher cancelled after batch {}", self.seq);
                self.done = true;
                break;
            }
            match self.records.next() {
                Some(Ok(raw)) => items.push((self.convert)(raw)),
                Some(Err(e)) => {
                    self.done = true;
                    if items.is_empty() {
                        return Some(Err(e));
                    }
                    self.pending = Some(e);
                    break;
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if items.is_empty() {
            return None;
        }
        let batch = Batch {
            seq: self.seq,
            items,
        };
        self.seq += 1;
        Some(Ok(batch))
    }
}
