use serde::Serialize;

use crate::process::zones::{count_active, parse_zone_array};
use crate::process::RawTable;

/// Aggregate nozzle usage over the valid rows of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Savings {
    /// `1 - active / (records * nozzles)`, or 0.0 when no row was valid.
    pub rate: f64,
    /// Rows whose zone array parsed with the expected length.
    pub records: u64,
    /// Positions equal to 1 across those rows.
    pub active: u64,
    /// `records * nozzles`
    pub max_active: u64,
}

impl Savings {
    pub fn compute(table: &RawTable, nozzle_count: usize) -> Self {
        let Some(idx) = table.columns.zones else {
            return Self::default();
        };

        let mut records = 0u64;
        let mut active = 0u64;
        for row in &table.rows {
            let parts = table.split_row(row);
            let Some(field) = parts.get(idx) else {
                continue;
            };
            match parse_zone_array(field) {
                Some(arr) if arr.len() == nozzle_count => {
                    records += 1;
                    active += count_active(&arr);
                }
                _ => continue,
            }
        }

        if records == 0 {
            return Self::default();
        }
        let max_active = records * nozzle_count as u64;
        Self {
            rate: 1.0 - active as f64 / max_active as f64,
            records,
            active,
            max_active,
        }
    }
}
