use rand::Rng;
use tracing::debug;

use crate::process::zones::{format_zone_array, parse_zone_array};
use crate::process::RawTable;

/// Switch off each active nozzle with probability `prob`.
///
/// One uniform draw is taken per position equal to 1, in row order then
/// position order, so a given seed and input always produce the same
/// output. Rows without a valid `nozzle_count`-long array are copied as-is;
/// in rewritten rows only the zone field changes, the other fields are
/// rejoined as split.
pub fn apply_extra_off<R: Rng>(
    table: &RawTable,
    nozzle_count: usize,
    prob: f64,
    rng: &mut R,
) -> RawTable {
    let Some(idx) = table.columns.zones else {
        return table.clone();
    };

    let mut switched_off = 0u64;
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut parts = table.split_row(row);
            let arr = match parts.get(idx).and_then(|f| parse_zone_array(f)) {
                Some(arr) if arr.len() == nozzle_count => arr,
                _ => return row.clone(),
            };
            let flipped: Vec<i64> = arr
                .into_iter()
                .map(|v| {
                    if v == 1 && rng.random::<f64>() < prob {
                        switched_off += 1;
                        0
                    } else {
                        v
                    }
                })
                .collect();
            parts[idx] = format_zone_array(&flipped);
            table.join_fields(&parts)
        })
        .collect();

    debug!(switched_off, prob, "applied extra-off");
    table.with_rows(rows)
}
