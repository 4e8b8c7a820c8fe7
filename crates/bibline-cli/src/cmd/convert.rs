//! Convert subcommand - run one source dump through the pipeline

use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rayon::prelude::*;

use bibline_core::{
    BatchSink, Output, Pipeline, PipelineConfig, ProgressContext, RunStats, Source,
    is_shutdown_requested, open_source,
};
use bibline_formats::{
    CrossrefAdapter, Format, GenderOpenAdapter, GeniosAdapter, MemberNames, SourceAdapter,
    StringListMap, load_string_list_map,
};
use bibline_holdings::{HoldingsIndex, Labeler};
use bibline_schema::{ExportFormat, Exporter, IntermediateExporter, IntermediateRecord, SolrExporter};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input format (see `bibline formats`)
    #[arg(short, long)]
    pub format: Format,

    /// Input file, URL, or - for stdin
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Holdings file to label covered records with
    #[arg(long, requires = "isil")]
    pub holdings: Option<String>,

    /// ISIL attached to records covered by the holdings
    #[arg(long, requires = "holdings")]
    pub isil: Option<String>,

    /// Output schema: intermediate or solr
    #[arg(short, long)]
    pub export: Option<ExportFormat>,

    /// Records per batch
    #[arg(short, long)]
    pub batch_size: Option<NonZeroUsize>,
}

/// Writes exported documents as JSON lines.
///
/// Export runs in parallel within a batch; output order follows the batch.
pub struct ExportSink {
    out: Output,
    exporter: Box<dyn Exporter>,
    written: usize,
    failed: usize,
}

impl ExportSink {
    pub fn new(out: Output, exporter: Box<dyn Exporter>) -> Self {
        Self {
            out,
            exporter,
            written: 0,
            failed: 0,
        }
    }
}

impl BatchSink<IntermediateRecord> for ExportSink {
    fn write_batch(&mut self, records: Vec<IntermediateRecord>) -> io::Result<()> {
        let exporter = &*self.exporter;
        let docs: Vec<_> = records.par_iter().map(|r| exporter.export(r)).collect();

        for (record, doc) in records.iter().zip(docs) {
            match doc {
                Ok(bytes) => {
                    self.out.write_all(&bytes)?;
                    self.out.write_all(b"\n")?;
                    self.written += 1;
                }
                Err(e) => {
                    log::warn!("{} export failed for {:?}: {e}", exporter.name(), record.id);
                    self.failed += 1;
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> io::Result<()> {
        log::debug!(
            "{} sink: {} written, {} failed",
            self.exporter.name(),
            self.written,
            self.failed
        );
        self.out.commit()
    }
}

/// Everything a run needs besides the adapter
pub struct Job<'a> {
    pub source: Source,
    pub output: Option<PathBuf>,
    pub labeler: Option<Labeler<'a>>,
    pub exporter: Box<dyn Exporter>,
    pub pipeline: PipelineConfig,
}

pub fn build_exporter(format: ExportFormat, config: &Config) -> Result<Box<dyn Exporter>> {
    Ok(match format {
        ExportFormat::Intermediate => Box::new(IntermediateExporter),
        ExportFormat::Solr => {
            let subjects = match &config.export.subject_mapping {
                Some(path) => load_string_list_map(path).context("Failed to load subject mapping")?,
                None => StringListMap::default(),
            };
            Box::new(SolrExporter::new(subjects))
        }
    })
}

/// Decode, convert, label and export one source with `adapter`.
pub fn execute<A: SourceAdapter>(
    adapter: A,
    job: Job<'_>,
    progress: &ProgressContext,
) -> Result<RunStats> {
    let opened = open_source(&job.source)
        .with_context(|| format!("Failed to open {}", job.source))?;
    let pb = progress.source_bar(&job.source.to_string(), opened.total_bytes);

    let out = Output::create(job.output.as_deref()).with_context(|| match &job.output {
        Some(path) => format!("Failed to create {}", path.display()),
        None => "Failed to open stdout".to_string(),
    })?;
    let sink = ExportSink::new(out, job.exporter);

    let labeler = job.labeler.as_ref();
    let adapter = &adapter;
    let convert = |raw: A::Raw| {
        adapter.convert(raw).and_then(|record| match labeler {
            Some(labeler) => labeler.apply(record),
            None => Ok(record),
        })
    };

    let result = Pipeline::new(job.pipeline)
        .with_progress(pb.clone(), opened.counter)
        .run(adapter.decoder(opened.reader), convert, sink);
    pb.finish_and_clear();

    if is_shutdown_requested() {
        log::warn!("Interrupted, output holds the records converted so far");
    }
    result.with_context(|| format!("Conversion of {} aborted", job.source))
}

pub fn run(args: ConvertArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let holdings = match &args.holdings {
        Some(path) => {
            let source = Source::parse(path);
            let index = HoldingsIndex::open(&source)
                .with_context(|| format!("Failed to load holdings from {source}"))?;
            log::info!(
                "Loaded {} holdings from {source} ({} malformed)",
                index.len(),
                index.malformed()
            );
            Some(index)
        }
        None => None,
    };
    let labeler = holdings
        .as_ref()
        .zip(args.isil.as_deref())
        .map(|(index, isil)| Labeler::new(index, isil));

    let job = Job {
        source: Source::parse(&args.input),
        output: args.output,
        labeler,
        exporter: build_exporter(args.export.unwrap_or(config.export.format), config)?,
        pipeline: PipelineConfig {
            batch_size: args.batch_size.unwrap_or(config.pipeline.batch_size),
            channel_capacity: config.pipeline.channel_capacity,
        },
    };
    let label = format!("{} → {}", args.format, job.exporter.name());

    let stats = match args.format {
        Format::Crossref => {
            let members = match &config.tables.crossref_members {
                Some(path) => MemberNames::load(path).context("Failed to load Crossref members")?,
                None => MemberNames::default(),
            };
            execute(CrossrefAdapter::new(members), job, progress)
        }
        Format::Genios => {
            let dbmap = match &config.tables.genios_dbmap {
                Some(path) => load_string_list_map(path).context("Failed to load Genios DB map")?,
                None => StringListMap::default(),
            };
            execute(GeniosAdapter::new(dbmap), job, progress)
        }
        Format::GenderOpen => execute(GenderOpenAdapter, job, progress),
    };

    let stats = match stats {
        Ok(stats) => stats,
        Err(e) => {
            if let Some(failed) = e.downcast_ref::<bibline_core::PipelineError>() {
                failed.stats().log_summary(&label);
            }
            return Err(e);
        }
    };

    stats.log_summary(&label);
    if progress.is_tty() {
        eprintln!("\n{}", stats.summary_table());
    }
    Ok(())
}
