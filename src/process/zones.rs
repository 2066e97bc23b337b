use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]").unwrap());

/// Parse the first `[...]` list in `field`, e.g. `"[0,1,1,0,1,1]"`.
/// Empty elements are ignored; any element that is not an integer
/// fails the whole field.
pub fn parse_zone_array(field: &str) -> Option<Vec<i64>> {
    let inner = BRACKETED.captures(field)?.get(1)?.as_str();
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().ok())
        .collect()
}

/// `[v0, v1, ...]`
pub fn format_zone_array(values: &[i64]) -> String {
    let body: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", body.join(", "))
}

/// Number of positions that are exactly 1.
pub fn count_active(values: &[i64]) -> u64 {
    values.iter().filter(|&&v| v == 1).count() as u64
}
