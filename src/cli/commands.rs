use crate::cli::args::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::processors::{
    AggregationOutcome, Finalizer, ImputationEngine, IntegrityChecker, IntegrityReport,
    SkippedSource, StationAggregator, StationReport,
};
use crate::readers::{SchemaNormalizer, TableReader};
use crate::utils::filename::{generate_default_output_filename, OutputFormat};
use crate::utils::progress::ProgressReporter;
use crate::writers::{write_output, ParquetWriter};
use anyhow::{anyhow, bail, Context};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Serialize)]
struct RunReport<'a> {
    input_dir: &'a Path,
    output_file: &'a Path,
    records: usize,
    stations: &'a [StationReport],
    skipped: &'a [SkippedSource],
    integrity: &'a IntegrityReport,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Process {
            input_dir,
            output_file,
            config,
            compression,
            max_workers,
            file_pattern,
            report_json,
        } => {
            let config = load_config(config.as_deref(), max_workers, file_pattern)?;
            let output_file = output_file.unwrap_or_else(generate_default_output_filename);

            println!("Processing station reports...");
            println!("Input directory: {}", input_dir.display());
            println!("Output file: {}", output_file.display());
            println!("Workers: {}", config.processing.max_workers);

            let outcome = aggregate(&config, &input_dir).await?;
            let checker = IntegrityChecker::with_radiation_max(config.imputation.radiation_max);
            let integrity = checker.check_integrity(&outcome.records);

            println!("\n{}", checker.generate_summary(&integrity));
            print_sources(&outcome);

            println!("Writing {} records...", outcome.records.len());
            let format = write_output(&outcome.records, &output_file, &compression)
                .with_context(|| format!("Failed to write {}", output_file.display()))?;

            if format == OutputFormat::Parquet {
                let file_info = ParquetWriter::new().get_file_info(&output_file)?;
                println!("\n{}", file_info.summary());
            }

            if let Some(report_path) = report_json {
                let report = RunReport {
                    input_dir: &input_dir,
                    output_file: &output_file,
                    records: outcome.records.len(),
                    stations: &outcome.stations,
                    skipped: &outcome.skipped,
                    integrity: &integrity,
                };
                let file = std::fs::File::create(&report_path).with_context(|| {
                    format!("Failed to create report {}", report_path.display())
                })?;
                serde_json::to_writer_pretty(file, &report)?;
                info!("Run report written to {}", report_path.display());
            }

            println!("Processing complete!");
        }

        Commands::Validate {
            input_dir,
            config,
            max_workers,
        } => {
            let config = load_config(config.as_deref(), max_workers, None)?;

            println!("Validating station reports...");
            println!("Input directory: {}", input_dir.display());

            let outcome = aggregate(&config, &input_dir).await?;
            let checker = IntegrityChecker::with_radiation_max(config.imputation.radiation_max);
            let integrity = checker.check_integrity(&outcome.records);

            println!("\n{}", checker.generate_summary(&integrity));
            print_sources(&outcome);

            if integrity.is_clean() {
                println!("✅ All data passed validation checks");
            } else {
                println!("⚠️  Found {} validation issues", integrity.violations.len());
            }
        }

        Commands::Inspect { file, config } => {
            let config = load_config(config.as_deref(), None, None)?;
            inspect(&file, &config)?;
        }

        Commands::Info { file, sample } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;
            println!("\n{}", file_info.summary());

            if sample > 0 {
                println!("\nSample Records (showing up to {} records):", sample);
                match writer.read_sample_records(&file, sample) {
                    Ok(records) => {
                        for (i, record) in records.iter().enumerate() {
                            println!(
                                "{}. {} on {}: min={:.1}°C, mean={:.1}°C, max={:.1}°C, rh={:.0}%, rad={:.1}",
                                i + 1,
                                record.station_id,
                                record.date,
                                record.temp_min,
                                record.temp_mean,
                                record.temp_max,
                                record.humidity_mean,
                                record.radiation_global
                            );
                        }
                    }
                    Err(e) => println!("Error reading sample data: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    let result = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Arc::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

fn load_config(
    path: Option<&Path>,
    max_workers: Option<usize>,
    file_pattern: Option<String>,
) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path).with_context(|| match path {
        Some(p) => format!("Invalid configuration in {}", p.display()),
        None => "Invalid configuration from environment".to_string(),
    })?;

    if let Some(workers) = max_workers {
        config = config.with_max_workers(workers);
    }
    if file_pattern.is_some() {
        config = config.with_file_pattern(file_pattern);
    }

    config.validate_all()?;
    Ok(config)
}

async fn aggregate(config: &PipelineConfig, input_dir: &Path) -> anyhow::Result<AggregationOutcome> {
    let aggregator = Arc::new(StationAggregator::new(config.clone()));
    let progress = Arc::new(ProgressReporter::new(0, "Processing station files...", false));

    let outcome = aggregator
        .aggregate_directory_async(input_dir.to_path_buf(), Some(progress))
        .await
        .with_context(|| format!("Aggregation of {} failed", input_dir.display()))?;

    Ok(outcome)
}

fn print_sources(outcome: &AggregationOutcome) {
    println!("Stations: {}", outcome.station_count());
    for station in &outcome.stations {
        let failures: Vec<&str> = station
            .stage_failures
            .iter()
            .map(|f| f.stage.as_str())
            .collect();
        if failures.is_empty() {
            println!(
                "  {}: {} of {} rows kept",
                station.station_id, station.rows_kept, station.rows_loaded
            );
        } else {
            println!(
                "  {}: {} of {} rows kept (failed stages: {})",
                station.station_id,
                station.rows_kept,
                station.rows_loaded,
                failures.join(", ")
            );
        }
    }

    if !outcome.skipped.is_empty() {
        println!("\nSkipped sources: {}", outcome.skipped.len());
        for skipped in &outcome.skipped {
            println!(
                "  {} ({:?}): {}",
                skipped.path.display(),
                skipped.state,
                skipped.reason
            );
        }
    }
}

fn inspect(file: &Path, config: &PipelineConfig) -> anyhow::Result<()> {
    let Some(raw) = TableReader::new().load(file) else {
        bail!("Could not read {} as a workbook or delimited text", file.display());
    };

    println!("Source: {}", raw.source.display());
    println!("Columns: {}", raw.headers.join(", "));
    println!("Rows read: {}", raw.row_count());

    let table = SchemaNormalizer::new(config.imputation.date_only_hour).normalize(&raw)?;
    println!("\nStation: {}", table.station_id());
    println!("Rows after normalization: {}", table.len());

    for variable in table.present_variables() {
        println!(
            "  {:<20} nulls: {}",
            variable.name(),
            table.null_count(variable).unwrap_or(0)
        );
    }
    let missing = table.missing_variables();
    if !missing.is_empty() {
        println!(
            "  missing: {}",
            missing.iter().map(|v| v.name()).collect::<Vec<_>>().join(", ")
        );
    }

    let imputed = ImputationEngine::new(config.imputation.clone()).run(table);
    for failure in &imputed.failures {
        println!("  stage '{}' failed: {}", failure.stage, failure.message);
    }

    let series = Finalizer::new().finalize(&imputed.table);
    println!("\nComplete rows after imputation: {}", series.len());
    if let (Some(first), Some(last)) = (series.records.first(), series.records.last()) {
        println!("Date range: {} to {}", first.date, last.date);
    }

    Ok(())
}
