//! Pipeline driver: decoder → batcher on a producer thread, bounded channel,
//! consumer on the calling thread folding outcomes into [`RunStats`].

use std::io;
use std::num::NonZeroUsize;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use indicatif::ProgressBar;

use crate::batch::{Batch, Batcher};
use crate::cancel::{CancelToken, is_shutdown_requested};
use crate::decode::RecordDecoder;
use crate::error::{Outcome, Rejection, StreamError};
use crate::progress::fmt_num;
use crate::sink::BatchSink;
use crate::source::ByteCounter;
use crate::stats::RunStats;

/// Default records per batch
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(2000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Default number of batches in flight between producer and consumer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub batch_size: NonZeroUsize,
    /// Bounded channel capacity in batches (at least 1)
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Why a run stopped early. Both variants carry the counters up to that point.
#[derive(Debug)]
pub enum PipelineError {
    /// The input became unreadable; the sink was finalized with what it had
    Stream { error: StreamError, stats: RunStats },
    /// The sink failed; the producer was cancelled
    Sink { error: io::Error, stats: RunStats },
}

impl PipelineError {
    pub fn stats(&self) -> &RunStats {
        match self {
            Self::Stream { stats, .. } | Self::Sink { stats, .. } => stats,
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream { error, stats } => {
                write!(f, "stream failed after {} records: {error}", stats.seen)
            }
            Self::Sink { error, stats } => {
                write!(f, "output failed after {} records: {error}", stats.seen)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Stream { error, .. } => Some(error),
            Self::Sink { error, .. } => Some(error),
        }
    }
}

enum Abort {
    Stream(StreamError),
    Sink(io::Error),
}

/// Streaming conversion driver.
///
/// One producer thread decodes and converts, one consumer (the caller's
/// thread) writes. The channel holds at most `channel_capacity` batches, so
/// memory stays bounded by batch size regardless of input size.
#[derive(Debug, Default)]
pub struct Pipeline {
    config: PipelineConfig,
    progress: Option<(ProgressBar, ByteCounter)>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Report consumed input bytes and converted records on `pb`
    pub fn with_progress(mut self, pb: ProgressBar, counter: ByteCounter) -> Self {
        self.progress = Some((pb, counter));
        self
    }

    /// Run `decoder` to exhaustion, converting each record with `convert` and
    /// handing converted records to `sink`.
    ///
    /// Skips and record errors are counted, never returned. Stops early on a
    /// stream error, a sink error, or process shutdown.
    pub fn run<D, R, T, F, S>(
        &self,
        decoder: D,
        convert: F,
        mut sink: S,
    ) -> Result<RunStats, PipelineError>
    where
        D: RecordDecoder<R> + Send,
        F: FnMut(R) -> Outcome<T> + Send,
        T: Send,
        S: BatchSink<T>,
    {
        let start = Instant::now();
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::sync_channel::<Result<Batch<T>, StreamError>>(
            self.config.channel_capacity.max(1),
        );
        let mut stats = RunStats::default();

        let outcome = std::thread::scope(|s| {
            let producer_cancel = cancel.clone();
            let batch_size = self.config.batch_size;
            let producer = s.spawn(move || {
                let mut batcher =
                    Batcher::new(decoder, convert, batch_size).with_cancel(producer_cancel);
                for item in batcher.by_ref() {
                    // Consumer gone: it aborted and already knows why
                    if tx.send(item).is_err() {
                        break;
                    }
                }
                batcher.records().malformed()
            });

            let outcome = self.consume(rx, &mut sink, &mut stats);
            if outcome.is_err() {
                cancel.cancel();
            }
            match producer.join() {
                Ok(malformed) => stats.malformed = malformed,
                Err(panic) => std::panic::resume_unwind(panic),
            }
            outcome
        });
        stats.elapsed = start.elapsed();

        if let Some((pb, _)) = &self.progress {
            pb.finish_and_clear();
        }

        match outcome {
            Ok(()) => {
                if is_shutdown_requested() {
                    log::warn!("shutdown requested, output is partial");
                }
                sink.finish()
                    .map_err(|error| PipelineError::Sink {
                        error,
                        stats: stats.clone(),
                    })?;
                Ok(stats)
            }
            Err(Abort::Stream(error)) => {
                log::error!("stream failed: {error}");
                if let Err(e) = sink.finish() {
                    log::error!("finalizing output after stream failure: {e}");
                }
                Err(PipelineError::Stream { error, stats })
            }
            Err(Abort::Sink(error)) => {
                log::error!("output failed: {error}");
                Err(PipelineError::Sink { error, stats })
            }
        }
    }

    fn consume<T, S: BatchSink<T>>(
        &self,
        rx: Receiver<Result<Batch<T>, StreamError>>,
        sink: &mut S,
        stats: &mut RunStats,
    ) -> Result<(), Abort> {
        for item in rx {
            let batch = item.map_err(Abort::Stream)?;
            stats.batches += 1;

            let mut records = Vec::with_capacity(batch.len());
            for outcome in batch.items {
                match outcome {
                    Ok(record) => {
                        stats.record_converted();
                        records.push(record);
                    }
                    Err(Rejection::Skip { skip, .. }) => {
                        log::debug!("batch {}: skipped: {skip}", batch.seq);
                        stats.record_skip(&skip);
                    }
                    Err(Rejection::Error { error, .. }) => {
                        log::warn!("batch {}: record error: {error}", batch.seq);
                        stats.record_error(&error);
                    }
                }
            }
            if !records.is_empty() {
                sink.write_batch(records).map_err(Abort::Sink)?;
            }

            if let Some((pb, counter)) = &self.progress {
                pb.set_position(counter.load(Ordering::Relaxed));
                pb.set_message(format!(
                    "{} converted, {} skipped",
                    fmt_num(stats.converted),
                    fmt_num(stats.skipped)
                ));
            }
        }
        Ok(())
    }
}
