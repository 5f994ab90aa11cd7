use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{DailyRecord, StationSeries};
use crate::processors::finalizer::Finalizer;
use crate::processors::imputation::{ImputationEngine, StageFailure};
use crate::readers::{SchemaNormalizer, TableReader};
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How far a source file got through the per-station pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    Pending,
    Loaded,
    Normalized,
    Imputed,
    Finalized,
    Accumulated,
    Skipped,
}

/// A source that did not contribute; `state` is the last state it reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub state: SourceState,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationReport {
    pub station_id: String,
    pub source: PathBuf,
    pub rows_loaded: usize,
    pub rows_kept: usize,
    pub stage_failures: Vec<StageFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    /// All finalized records, sorted by (station_id, date)
    pub records: Vec<DailyRecord>,
    pub stations: Vec<StationReport>,
    pub skipped: Vec<SkippedSource>,
}

impl AggregationOutcome {
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

enum SourceOutcome {
    Accumulated(StationSeries, StationReport),
    Skipped(SkippedSource),
}

/// Runs load, normalize, impute and finalize for every station file of a
/// directory and combines the results.
pub struct StationAggregator {
    config: PipelineConfig,
    reader: TableReader,
    normalizer: SchemaNormalizer,
    engine: ImputationEngine,
    finalizer: Finalizer,
}

impl StationAggregator {
    pub fn new(config: PipelineConfig) -> Self {
        let normalizer = SchemaNormalizer::new(config.imputation.date_only_hour);
        let engine = ImputationEngine::new(config.imputation.clone());
        Self {
            config,
            reader: TableReader::new(),
            normalizer,
            engine,
            finalizer: Finalizer::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Station files of `dir` accepted by the processing config, sorted by path
    pub fn discover_sources(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut sources = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && self.config.processing.accepts(&path) {
                sources.push(path);
            }
        }
        sources.sort();

        if sources.is_empty() {
            return Err(ProcessingError::NoInputFiles {
                dir: dir.to_path_buf(),
            });
        }

        info!("Found {} source files in {}", sources.len(), dir.display());
        Ok(sources)
    }

    pub async fn aggregate_directory_async(
        self: Arc<Self>,
        dir: PathBuf,
        progress: Option<Arc<ProgressReporter>>,
    ) -> Result<AggregationOutcome> {
        tokio::task::spawn_blocking(move || self.aggregate_directory(&dir, progress.as_deref()))
            .await?
    }

    pub fn aggregate_directory(
        &self,
        dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<AggregationOutcome> {
        let sources = self.discover_sources(dir)?;
        self.aggregate_files(&sources, progress)
    }

    /// Process every file in parallel, then combine and sort.
    ///
    /// Fails only when no file contributed a single record.
    pub fn aggregate_files(
        &self,
        paths: &[PathBuf],
        progress: Option<&ProgressReporter>,
    ) -> Result<AggregationOutcome> {
        let total = paths.len();
        let processed_count = Arc::new(AtomicUsize::new(0));

        if let Some(p) = progress {
            p.set_length(total as u64);
            p.set_message(&format!("Processing {} station files...", total));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.processing.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let outcomes: Vec<SourceOutcome> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let outcome = self.process_source(path);

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }

                    outcome
                })
                .collect()
        });

        let mut outcome = AggregationOutcome::default();
        let mut seen_stations = HashSet::new();

        for source in outcomes {
            match source {
                SourceOutcome::Accumulated(series, report) => {
                    if !seen_stations.insert(report.station_id.clone()) {
                        warn!(
                            "Station {} already loaded from another file, skipping {}",
                            report.station_id,
                            report.source.display()
                        );
                        outcome.skipped.push(SkippedSource {
                            path: report.source,
                            state: SourceState::Finalized,
                            reason: format!("duplicate station id {}", report.station_id),
                        });
                        continue;
                    }
                    outcome.records.extend(series.into_records());
                    outcome.stations.push(report);
                }
                SourceOutcome::Skipped(skipped) => outcome.skipped.push(skipped),
            }
        }

        if outcome.records.is_empty() {
            return Err(ProcessingError::NoUsableInput { skipped: total });
        }

        outcome.records.sort_by(|a, b| {
            a.station_id
                .cmp(&b.station_id)
                .then_with(|| a.date.cmp(&b.date))
        });
        outcome
            .stations
            .sort_by(|a, b| a.station_id.cmp(&b.station_id));

        if let Some(p) = progress {
            p.finish_with_message(&format!(
                "Processed {} files: {} stations, {} skipped",
                total,
                outcome.stations.len(),
                outcome.skipped.len()
            ));
        }

        info!(
            "Aggregated {} records from {} stations ({} sources skipped)",
            outcome.records.len(),
            outcome.stations.len(),
            outcome.skipped.len()
        );

        Ok(outcome)
    }

    /// Run one file through the per-station pipeline; failures become a skip
    fn process_source(&self, path: &Path) -> SourceOutcome {
        let skip = |state: SourceState, reason: String| {
            warn!("Skipping {}: {}", path.display(), reason);
            SourceOutcome::Skipped(SkippedSource {
                path: path.to_path_buf(),
                state,
                reason,
            })
        };

        let raw = match self.reader.read(path) {
            Ok(raw) => raw,
            Err(e) => return skip(SourceState::Pending, e.to_string()),
        };
        debug!("{}: loaded {} rows", path.display(), raw.row_count());

        let table = match self.normalizer.normalize(&raw) {
            Ok(table) => table,
            Err(e) => return skip(SourceState::Loaded, e.to_string()),
        };
        let rows_loaded = table.len();

        let imputed = self.engine.run(table);
        let series = self.finalizer.finalize(&imputed.table);

        info!(
            "Station {}: {} of {} rows complete",
            series.station_id,
            series.len(),
            rows_loaded
        );

        let report = StationReport {
            station_id: series.station_id.clone(),
            source: path.to_path_buf(),
            rows_loaded,
            rows_kept: series.len(),
            stage_failures: imputed.failures,
        };

        SourceOutcome::Accumulated(series, report)
    }
}

impl Default for StationAggregator {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "Fecha,Precipitacion_Pluviometrica,Temperatura_Abrigo_150cm_Minima,Temperatura_Abrigo_150cm_Maxima,Temperatura_Abrigo_150cm,Humedad_Media_8_14_20,Rocio_Medio,Tesion_Vapor_Media,Radiacion_Global,Heliofania_Efectiva,Heliofania_Relativa";

    fn write_station(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut content = String::from(HEADER);
        for row in rows {
            content.push('\n');
            content.push_str(row);
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn aggregator() -> StationAggregator {
        StationAggregator::new(PipelineConfig::default().with_max_workers(2))
    }

    #[test]
    fn test_discover_sources_filters_and_sorts() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("b.csv"), "x")?;
        fs::write(dir.path().join("a.xls"), "x")?;
        fs::write(dir.path().join("notes.md"), "x")?;

        let sources = aggregator().discover_sources(dir.path())?;
        let names: Vec<_> = sources
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.xls", "b.csv"]);
        Ok(())
    }

    #[test]
    fn test_empty_directory_is_no_input() -> Result<()> {
        let dir = TempDir::new()?;
        assert!(matches!(
            aggregator().discover_sources(dir.path()),
            Err(ProcessingError::NoInputFiles { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_unreadable_source_is_skipped() -> Result<()> {
        let dir = TempDir::new()?;
        let good = write_station(
            dir.path(),
            "100.csv",
            &[
                "2023-01-02,1.0,10,20,15,60,8,10,18,6,50",
                "2023-01-01,0.0,11,21,16,65,9,11,19,7,55",
            ],
        );
        let bad = dir.path().join("200.csv");
        fs::write(&bad, "no date column here\n1\n")?;

        let outcome = aggregator().aggregate_files(&[good, bad.clone()], None)?;

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.stations.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].path, bad);
        assert_eq!(outcome.skipped[0].state, SourceState::Loaded);
        assert!(outcome.records[0].date < outcome.records[1].date);
        Ok(())
    }

    #[test]
    fn test_all_sources_unusable_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let a = dir.path().join("1.csv");
        let b = dir.path().join("2.csv");
        fs::write(&a, "")?;
        fs::write(&b, "fecha\nnot-a-date\n")?;

        let result = aggregator().aggregate_files(&[a, b], None);
        assert!(matches!(
            result,
            Err(ProcessingError::NoUsableInput { skipped: 2 })
        ));
        Ok(())
    }

    #[test]
    fn test_duplicate_station_id_keeps_first() -> Result<()> {
        let dir = TempDir::new()?;
        let row = ["2023-01-01,0.5,10,20,15,60,8,10,18,6,50"];
        let first = write_station(dir.path(), "300.csv", &row);
        let second = write_station(dir.path(), "300.txt", &row);

        let outcome = aggregator().aggregate_files(&[first.clone(), second.clone()], None)?;

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.stations[0].source, first);
        assert_eq!(outcome.skipped[0].path, second);
        Ok(())
    }
}
