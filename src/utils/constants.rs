/// Source label of the observation date
pub const DATE_LABELS: &[&str] = &["fecha", "date"];

/// Cell contents treated as missing observations
pub const MISSING_MARKERS: &[&str] = &["", "-", "--", "na", "n/a", "nan", "null", "none", "s/d", "sd"];

/// File extensions handled by the table reader
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "xlsb", "ods"];
pub const DELIMITED_EXTENSIONS: &[&str] = &["csv", "txt", "tsv"];
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xls", "xlsx", "ods", "csv", "txt"];

/// Delimiters tried when sniffing a text header line
pub const CANDIDATE_DELIMITERS: &[u8] = &[b',', b';', b'\t'];

/// Magnus-type saturation vapour pressure coefficients
pub const MAGNUS_BASE: f64 = 6.11;
pub const MAGNUS_A: f64 = 17.27;
pub const MAGNUS_B: f64 = 237.3;

/// Highest polynomial order used when filling precipitation gaps
pub const PRECIPITATION_CURVE_ORDER: usize = 3;

/// Imputation defaults
pub const DEFAULT_RADIATION_MIN_SAMPLES: usize = 30;
pub const DEFAULT_SUNSHINE_MIN_SAMPLES: usize = 10;
pub const DEFAULT_DAYLIGHT_START_HOUR: u32 = 7;
pub const DEFAULT_DAYLIGHT_END_HOUR: u32 = 18;
pub const DEFAULT_RADIATION_MAX: f64 = 60.0;
pub const DEFAULT_ROLLING_WINDOW: usize = 7;
pub const DEFAULT_ROLLING_MIN_PERIODS: usize = 1;
pub const DEFAULT_DATE_ONLY_HOUR: u32 = 12;

/// Plausibility limits used by the integrity checker
pub const MIN_HUMIDITY: f64 = 0.0;
pub const MAX_HUMIDITY: f64 = 100.0;
pub const MIN_PLAUSIBLE_TEMP: f64 = -60.0;
pub const MAX_PLAUSIBLE_TEMP: f64 = 60.0;

/// Processing defaults
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 100_000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
