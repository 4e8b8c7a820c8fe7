//! Bibline Core - streaming conversion infrastructure
//!
//! Byte sources, record decoders, batching, the producer/consumer pipeline
//! driver and its sinks, plus the logging and progress plumbing shared by
//! all bibline crates.

pub mod batch;
pub mod cancel;
pub mod decode;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod retry;
pub mod sink;
pub mod source;
pub mod stats;

// Re-exports for convenience
pub use batch::{Batch, Batcher};
pub use cancel::{CancelToken, is_shutdown_requested, request_shutdown, shutdown_flag};
pub use decode::{JsonLinesDecoder, LineDecoder, MalformedElement, RecordDecoder, XmlElementDecoder};
pub use error::{Outcome, RecordError, Rejection, Skip, StreamError};
pub use logging::{IndicatifLogger, init_logging};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use sink::{BatchSink, JsonLinesSink, Output, OutputFile};
pub use source::{
    ByteCounter, HttpConfig, OpenedSource, Source, SourceReader, http_config, open_source,
    set_http_config,
};
pub use stats::RunStats;
