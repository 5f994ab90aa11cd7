use serde::{Deserialize, Serialize};

use crate::models::DailyRecord;

/// The finalized, null-free daily series of one station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationSeries {
    pub station_id: String,
    pub records: Vec<DailyRecord>,
}

impl StationSeries {
    pub fn new(station_id: impl Into<String>, records: Vec<DailyRecord>) -> Self {
        Self {
            station_id: station_id.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dates strictly increase, which also rules out duplicate keys
    pub fn is_strictly_ascending(&self) -> bool {
        self.records.windows(2).all(|w| w[0].date < w[1].date)
    }

    pub fn into_records(self) -> Vec<DailyRecord> {
        self.records
    }
}
