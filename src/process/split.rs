// src/process/split.rs

/// Split `line` on every `sep` that is not nested inside `[...]`.
///
/// Bracket depth never drops below zero, so a stray `]` is just text.
/// Fields come back trimmed. A trailing separator does not produce an
/// empty last field; `a,,b` still yields the empty middle one.
pub fn split_top_level(line: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut depth: usize = 0;

    for ch in line.chars() {
        match ch {
            '[' => {
                depth += 1;
                buf.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                buf.push(ch);
            }
            c if c == sep && depth == 0 => {
                parts.push(buf.trim().to_string());
                buf.clear();
            }
            c => buf.push(c),
        }
    }
    if !buf.is_empty() {
        parts.push(buf.trim().to_string());
    }
    parts
}
