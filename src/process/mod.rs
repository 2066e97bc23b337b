// src/process/mod.rs
pub mod dedup;
pub mod extra_off;
pub mod savings;
pub mod schema;
pub mod split;
pub mod zones;

use schema::{Header, ResolvedColumns};
use split::split_top_level;

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// First line of the file, kept verbatim for output.
    pub header_line: String,
    /// Column names parsed from `header_line`.
    pub header: Header,
    /// Latitude / longitude / zones indices, resolved once from `header`.
    pub columns: ResolvedColumns,
    /// Field separator used for splitting and rejoining rows.
    pub separator: char,
    /// Every line after the header, as read.
    pub rows: Vec<String>,
}

impl RawTable {
    /// First line becomes the header. Returns `None` for an empty file.
    pub fn from_lines<I>(lines: I, separator: char) -> Option<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut iter = lines.into_iter();
        let header_line = iter.next()?;
        let header = Header::parse(&header_line, separator);
        let columns = ResolvedColumns::resolve(&header);
        Some(Self {
            header_line,
            header,
            columns,
            separator,
            rows: iter.collect(),
        })
    }

    /// Keep non-blank lines of `text`. Any line boundary counts: `\n`, `\r`,
    /// vertical tab, form feed, `\x1c`-`\x1e`, NEL, U+2028 and U+2029.
    pub fn from_text(text: &str, separator: char) -> Option<Self> {
        let lines = text
            .split(is_line_break)
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string);
        Self::from_lines(lines, separator)
    }

    /// Same header, different body.
    pub fn with_rows(&self, rows: Vec<String>) -> Self {
        Self {
            header_line: self.header_line.clone(),
            header: self.header.clone(),
            columns: self.columns,
            separator: self.separator,
            rows,
        }
    }

    pub fn split_row(&self, row: &str) -> Vec<String> {
        split_top_level(row, self.separator)
    }

    pub fn join_fields(&self, fields: &[String]) -> String {
        fields.join(self.separator.to_string().as_str())
    }

    /// Header plus rows, newline-joined with a trailing newline.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(
            self.header_line.len() + self.rows.iter().map(|r| r.len() + 1).sum::<usize>() + 1,
        );
        out.push_str(&self.header_line);
        out.push('\n');
        for row in &self.rows {
            out.push_str(row);
            out.push('\n');
        }
        out
    }

    /// Header included.
    pub fn line_count(&self) -> usize {
        self.rows.len() + 1
    }
}
