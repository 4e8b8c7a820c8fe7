//! bibline - streaming normalization of bibliographic metadata
//!
//! Converts heterogeneous source dumps (Crossref, Genios, GenderOpen) into
//! intermediate schema records, optionally labeled against holdings files
//! and projected onto a Solr document schema.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "bibline")]
#[command(about = "Streaming normalization of bibliographic metadata")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./bibline.toml or ~/.config/bibline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Read timeout in seconds for stall detection
    #[arg(long, global = true)]
    read_timeout: Option<u64>,

    /// Maximum retry attempts for transient failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a source dump to intermediate or Solr records
    Convert(cmd::convert::ConvertArgs),
    /// Inspect a holdings file
    Holdings(cmd::holdings::HoldingsArgs),
    /// List supported input formats
    Formats,
    /// Show current configuration
    Config,
}

/// First signal requests a graceful stop, the second one exits.
fn setup_signal_handler() -> Result<()> {
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        // SAFETY: AtomicBool::swap and process::exit are async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, || {
                if bibline_core::shutdown_flag().swap(true, Ordering::Relaxed) {
                    std::process::exit(130);
                }
            })
        }
        .with_context(|| format!("Failed to register handler for signal {signal}"))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = Arc::new(bibline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    bibline_core::init_logging(quiet, cli.debug, multi);

    setup_signal_handler()?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    // Config file defaults, CLI overrides
    let http_config = bibline_core::HttpConfig {
        read_timeout: std::time::Duration::from_secs(
            cli.read_timeout.unwrap_or(config.http.read_timeout),
        ),
        max_retries: cli.max_retries.unwrap_or(config.http.max_retries),
    };
    bibline_core::set_http_config(http_config);

    match cli.command {
        Command::Convert(args) => cmd::convert::run(args, &config, &progress),
        Command::Holdings(args) => cmd::holdings::run(args),
        Command::Formats => {
            cmd::formats::run();
            Ok(())
        }
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let path_or_unset = |p: &Option<std::path::PathBuf>| {
                p.as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "not set".to_string())
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Batch size",
                &config.pipeline.batch_size.to_string(),
            ]);
            table.add_row(vec![
                "Channel capacity",
                &format!("{} batches", config.pipeline.channel_capacity),
            ]);
            table.add_row(vec![
                "Genios DB map",
                &path_or_unset(&config.tables.genios_dbmap),
            ]);
            table.add_row(vec![
                "Crossref members",
                &path_or_unset(&config.tables.crossref_members),
            ]);
            table.add_row(vec!["Export format", config.export.format.as_str()]);
            table.add_row(vec![
                "Subject mapping",
                &path_or_unset(&config.export.subject_mapping),
            ]);
            table.add_row(vec![
                "Read timeout",
                &format!("{}s", http_config.read_timeout.as_secs()),
            ]);
            table.add_row(vec!["Max retries", &http_config.max_retries.to_string()]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
