pub mod record;
pub mod series;
pub mod table;

pub use record::DailyRecord;
pub use series::StationSeries;
pub use table::{PrecipitationScale, StationTable, Variable};
