use serde::Serialize;

use crate::process::split::split_top_level;

/// Column names parsed from the first line of a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Every column, in file order, duplicates included.
    pub columns: Vec<String>,
    /// name → index. Iteration follows first appearance; a repeated name
    /// points at its last occurrence.
    index: Vec<(String, usize)>,
}

impl Header {
    pub fn parse(line: &str, sep: char) -> Self {
        let columns = split_top_level(line.trim(), sep);
        let mut index: Vec<(String, usize)> = Vec::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            match index.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = i,
                None => index.push((name.clone(), i)),
            }
        }
        Self { columns, index }
    }

    /// Exact-name lookup.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, i)| *i)
    }

    /// First index whose name satisfies `pred`, in mapping order.
    pub fn find<F>(&self, pred: F) -> Option<usize>
    where
        F: Fn(&str) -> bool,
    {
        self.index.iter().find(|(n, _)| pred(n)).map(|(_, i)| *i)
    }
}

fn is_latitude(name: &str) -> bool {
    name.to_lowercase().contains("latitude")
}

fn is_longitude(name: &str) -> bool {
    name.to_lowercase().contains("longitude")
}

fn is_zones(name: &str) -> bool {
    name.trim().to_lowercase() == "zones"
}

fn is_control_signal(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("control") && lower.contains("signal")
}

/// Indices of the columns the pipeline cares about, resolved once per file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedColumns {
    pub latitude: Option<usize>,
    pub longitude: Option<usize>,
    pub zones: Option<usize>,
}

impl ResolvedColumns {
    pub fn resolve(header: &Header) -> Self {
        // an exact "zones" column beats any control/signal column
        let zones = header
            .find(is_zones)
            .or_else(|| header.find(is_control_signal));
        Self {
            latitude: header.find(is_latitude),
            longitude: header.find(is_longitude),
            zones,
        }
    }

    /// Both coordinate columns, if present.
    pub fn coordinates(&self) -> Option<(usize, usize)> {
        Some((self.latitude?, self.longitude?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let h = Header::parse("  Time,Latitude,Longitude,Zones \n", ',');
        assert_eq!(h.columns, vec!["Time", "Latitude", "Longitude", "Zones"]);
        assert_eq!(h.position("Zones"), Some(3));
        assert_eq!(h.position("zones"), None);
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let h = Header::parse("A,B,A", ',');
        assert_eq!(h.columns.len(), 3);
        assert_eq!(h.position("A"), Some(2));
        // "A" keeps its first slot in iteration order
        assert_eq!(h.find(|_| true), Some(2));
    }

    #[test]
    fn test_resolve_columns() {
        let h = Header::parse("GPS Latitude,GPS Longitude,Speed,zones", ',');
        let cols = ResolvedColumns::resolve(&h);
        assert_eq!(cols.latitude, Some(0));
        assert_eq!(cols.longitude, Some(1));
        assert_eq!(cols.zones, Some(3));
        assert_eq!(cols.coordinates(), Some((0, 1)));
    }

    #[test]
    fn test_zones_beats_control_signal() {
        let h = Header::parse("Control Signal,Latitude,Longitude, ZONES ", ',');
        assert_eq!(ResolvedColumns::resolve(&h).zones, Some(3));
    }

    #[test]
    fn test_control_signal_fallback() {
        let h = Header::parse("Latitude,Longitude,Nozzle CONTROL signal", ',');
        assert_eq!(ResolvedColumns::resolve(&h).zones, Some(2));

        let h = Header::parse("Latitude,Longitude,Signal", ',');
        assert_eq!(ResolvedColumns::resolve(&h).zones, None);
    }

    #[test]
    fn test_missing_coordinates() {
        let h = Header::parse("Latitude,Zones", ',');
        let cols = ResolvedColumns::resolve(&h);
        assert_eq!(cols.longitude, None);
        assert_eq!(cols.coordinates(), None);
    }
}
