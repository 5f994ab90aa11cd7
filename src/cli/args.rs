use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clima-processor")]
#[command(about = "Gap-free daily weather series from raw station exports")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean and impute every station file in a directory into one table
    Process {
        #[arg(short, long, help = "Directory containing one report per station")]
        input_dir: PathBuf,

        #[arg(
            short,
            long,
            help = "Output file, .parquet or .csv [default: output/clima-daily-{YYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(long, help = "Configuration file (TOML, YAML or JSON)")]
        config: Option<PathBuf>,

        #[arg(short, long, default_value = "snappy")]
        compression: String,

        #[arg(long, help = "Worker threads [default: number of CPUs]")]
        max_workers: Option<usize>,

        #[arg(long, help = "Only process files whose name contains this text")]
        file_pattern: Option<String>,

        #[arg(long, help = "Write a JSON run report to this path")]
        report_json: Option<PathBuf>,
    },

    /// Run the pipeline and report integrity without writing output
    Validate {
        #[arg(short, long, help = "Directory containing one report per station")]
        input_dir: PathBuf,

        #[arg(long, help = "Configuration file (TOML, YAML or JSON)")]
        config: Option<PathBuf>,

        #[arg(long)]
        max_workers: Option<usize>,
    },

    /// Show how a single station report is read and imputed
    Inspect {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, help = "Configuration file (TOML, YAML or JSON)")]
        config: Option<PathBuf>,
    },

    /// Display information about a Parquet output file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}
