use chrono::{NaiveDate, TimeDelta};
use clima_processor::config::{ImputationConfig, PipelineConfig};
use clima_processor::models::{DailyRecord, StationTable, Variable};
use clima_processor::processors::{Finalizer, ImputationEngine, IntegrityChecker, StationAggregator};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use tempfile::TempDir;

// Synthetic station with a gap every seventh day in every column
fn create_station_table(station_id: &str, days: usize) -> StationTable {
    let base = NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let timestamps = (0..days).map(|d| base + TimeDelta::days(d as i64)).collect();

    let mut table = StationTable::new(station_id, timestamps);
    for (offset, variable) in Variable::ALL.into_iter().enumerate() {
        let values = (0..days)
            .map(|d| {
                if (d + offset) % 7 == 3 {
                    return None;
                }
                let seasonal = ((d as f64) / 58.0).sin();
                Some(match variable {
                    Variable::Precipitation => ((d * 13) % 9) as f64,
                    Variable::TempMin => 8.0 + 6.0 * seasonal,
                    Variable::TempMax => 22.0 + 8.0 * seasonal,
                    Variable::TempMean => 15.0 + 7.0 * seasonal,
                    Variable::HumidityMean => 65.0 + 15.0 * seasonal,
                    Variable::DewPoint => 9.0 + 4.0 * seasonal,
                    Variable::VaporPressure => 12.0 + 3.0 * seasonal,
                    Variable::RadiationGlobal => 18.0 + 9.0 * seasonal,
                    Variable::SunshineEffective => 7.0 + 3.0 * seasonal,
                    Variable::SunshineRelative => 55.0 + 20.0 * seasonal,
                })
            })
            .collect();
        table = table.with_column(variable, values).unwrap();
    }
    table
}

fn create_station_csv(days: usize) -> String {
    let mut content = String::from("Fecha,Precipitacion_Pluviometrica,Temperatura_Abrigo_150cm_Minima,Temperatura_Abrigo_150cm_Maxima,Temperatura_Abrigo_150cm,Humedad_Media_8_14_20,Rocio_Medio,Tesion_Vapor_Media,Radiacion_Global,Heliofania_Efectiva,Heliofania_Relativa");
    let base = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    for d in 0..days {
        let date = base + TimeDelta::days(d as i64);
        let t = (d as f64 / 58.0).sin();
        let humidity = if d % 11 == 5 { String::new() } else { format!("{:.1}", 65.0 + 15.0 * t) };
        content.push_str(&format!(
            "\n{},{},{:.1},{:.1},{:.1},{},{:.1},{:.1},{:.1},{:.1},{:.1}",
            date,
            (d * 13) % 9,
            8.0 + 6.0 * t,
            22.0 + 8.0 * t,
            15.0 + 7.0 * t,
            humidity,
            9.0 + 4.0 * t,
            12.0 + 3.0 * t,
            18.0 + 9.0 * t,
            7.0 + 3.0 * t,
            55.0 + 20.0 * t
        ));
    }
    content
}

fn benchmark_imputation_engine(c: &mut Criterion) {
    let table = create_station_table("BENCH", 365);
    let engine = ImputationEngine::new(ImputationConfig::default());

    c.bench_function("imputation_engine_one_year", |b| {
        b.iter(|| {
            let outcome = engine.run(black_box(table.clone()));
            black_box(outcome.failures.len())
        })
    });
}

fn benchmark_finalizer(c: &mut Criterion) {
    let imputed = ImputationEngine::new(ImputationConfig::default())
        .run(create_station_table("BENCH", 365))
        .table;
    let finalizer = Finalizer::new();

    c.bench_function("finalizer_one_year", |b| {
        b.iter(|| black_box(finalizer.finalize(&imputed).len()))
    });
}

fn benchmark_integrity_checker(c: &mut Criterion) {
    let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let records: Vec<DailyRecord> = (0..20)
        .flat_map(|station| {
            (0..365).map(move |d| {
                DailyRecord::from_values(
                    format!("{:05}", station),
                    base + TimeDelta::days(d),
                    [0.2, 9.0, 21.0, 15.0, 68.0, 9.5, 12.0, 19.0, 7.0, 52.0],
                )
            })
        })
        .collect();

    c.bench_function("integrity_checker", |b| {
        b.iter(|| {
            let checker = IntegrityChecker::new();
            let report = checker.check_integrity(&records);
            black_box(report.total_records)
        })
    });
}

fn benchmark_aggregation_by_station_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation_by_station_count");
    group.sample_size(10);

    for &station_count in &[1usize, 4, 16] {
        let dir = TempDir::new().unwrap();
        let content = create_station_csv(365);
        for station in 0..station_count {
            fs::write(dir.path().join(format!("{:05}.csv", station)), &content).unwrap();
        }
        let aggregator = StationAggregator::new(PipelineConfig::default());

        group.bench_with_input(
            BenchmarkId::new("stations", station_count),
            &station_count,
            |b, _| {
                b.iter(|| {
                    let outcome = aggregator.aggregate_directory(dir.path(), None).unwrap();
                    black_box(outcome.records.len())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_imputation_engine,
    benchmark_finalizer,
    benchmark_integrity_checker,
    benchmark_aggregation_by_station_count
);
criterion_main!(benches);
