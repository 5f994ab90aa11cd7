pub mod schema_normalizer;
pub mod table_reader;

pub use schema_normalizer::{normalize_label, SchemaNormalizer};
pub use table_reader::{Cell, RawTable, SourceFormat, TableReader};
