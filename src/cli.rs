//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::{CsvDataSource, DEFAULT_CHUNK};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::EngineConfig;
use crate::domain::error::SamtaError;
use crate::domain::indicator::{IndicatorSpec, evaluate, parser::parse_indicator};

#[derive(Parser, Debug)]
#[command(name = "samta", about = "Incremental technical indicators over bar data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a CSV file bar by bar and print indicator values at each bar
    Replay {
        /// CSV with timestamp,open,high,low,close,volume rows
        #[arg(short, long)]
        data: PathBuf,
        /// Engine INI file ([series], [cache], [refill])
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Indicator spec, e.g. "RSI(close,14)"; repeatable
        #[arg(short, long = "indicator", required = true)]
        indicators: Vec<String>,
        /// Bars handed over per refill
        #[arg(long, default_value_t = DEFAULT_CHUNK)]
        chunk: usize,
    },
    /// Check indicator specs without running them
    Validate {
        #[arg(required = true)]
        indicators: Vec<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Replay {
            data,
            config,
            indicators,
            chunk,
        } => parse_specs(&indicators).and_then(|specs| {
            let stdout = std::io::stdout();
            replay(&data, config.as_deref(), &specs, chunk, &mut stdout.lock())
        }),
        Command::Validate { indicators } => parse_specs(&indicators).map(|specs| {
            for spec in specs {
                println!("{spec}: {}", spec.columns().join(", "));
            }
        }),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::from(&e)
        }
    }
}

/// Parses every spec, printing the offending input with a caret on failure.
pub fn parse_specs(inputs: &[String]) -> Result<Vec<IndicatorSpec>, SamtaError> {
    inputs
        .iter()
        .map(|input| {
            parse_indicator(input).map_err(|e| {
                eprintln!("{}", e.display_with_context(input));
                SamtaError::from(e)
            })
        })
        .collect()
}

pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig, SamtaError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading engine config");
            EngineConfig::from_config(&FileConfigAdapter::from_file(path)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Streams one CSV row per bar: the timestamp, then one column per indicator
/// output, empty while the indicator is warming up.
pub fn replay(
    data: &Path,
    config: Option<&Path>,
    specs: &[IndicatorSpec],
    chunk: usize,
    out: &mut dyn Write,
) -> Result<(), SamtaError> {
    let config = load_engine_config(config)?;
    let mut cache = config.build_cache()?;
    let mut bars = config.bar_series();
    bars.register_data_source(Box::new(CsvDataSource::from_path(data, chunk)?));

    let mut writer = csv::Writer::from_writer(out);
    let mut header = vec!["timestamp".to_string()];
    header.extend(specs.iter().flat_map(IndicatorSpec::columns));
    writer.write_record(&header).map_err(csv_error)?;

    let mut count = 0u64;
    while let Some(timestamp) = bars.next()?.map(|bar| bar.timestamp) {
        let mut row = vec![timestamp.to_rfc3339()];
        cache.in_pass(|cache| {
            for spec in specs {
                let output = evaluate(cache, &bars, spec)?;
                row.extend(
                    output
                        .values(cache)
                        .into_iter()
                        .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
                );
            }
            Ok::<_, SamtaError>(())
        })?;
        writer.write_record(&row).map_err(csv_error)?;
        count += 1;
    }
    writer.flush()?;

    let stats = cache.stats();
    info!(
        bars = count,
        series = cache.len(),
        hits = stats.hits,
        misses = stats.misses,
        nodes_visited = stats.nodes_visited,
        evictions = stats.evictions,
        "replay finished"
    );
    Ok(())
}

fn csv_error(e: csv::Error) -> SamtaError {
    SamtaError::Data {
        reason: format!("failed to write output: {e}"),
    }
}
