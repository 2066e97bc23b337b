use std::collections::HashSet;
use tracing::debug;

use crate::process::RawTable;

/// Drop rows whose (latitude, longitude) text was already seen, keeping
/// the first one. Comparison is on the literal field text: `40.10` and
/// `40.1` are different points.
///
/// Returns `None` when either coordinate column is missing. Rows too short
/// to reach both columns are dropped.
pub fn dedup_by_coordinates(table: &RawTable) -> Option<RawTable> {
    let (lat, lon) = table.columns.coordinates()?;
    let needed = lat.max(lon);

    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(table.rows.len());
    let mut kept = Vec::with_capacity(table.rows.len());
    let mut short_rows = 0usize;

    for row in &table.rows {
        let mut parts = table.split_row(row);
        if needed >= parts.len() {
            short_rows += 1;
            continue;
        }
        let lon_text = std::mem::take(&mut parts[lon]);
        let lat_text = if lat == lon {
            lon_text.clone()
        } else {
            std::mem::take(&mut parts[lat])
        };
        if seen.insert((lat_text, lon_text)) {
            kept.push(row.clone());
        }
    }

    debug!(
        input = table.rows.len(),
        kept = kept.len(),
        short_rows,
        "deduplicated by coordinates"
    );
    Some(table.with_rows(kept))
}
