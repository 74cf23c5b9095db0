//! Plain-text stream table, grouped by media kind.

use std::fmt::Write as _;

use crate::downloader::{StreamKind, StreamVariant};

const HEADERS: [&str; 6] = ["ID", "EXT", "QUALITY", "CODEC", "SIZE", "NOTE"];

const SECTIONS: [(StreamKind, &str); 3] = [
    (StreamKind::Video, "VIDEO"),
    (StreamKind::Audio, "AUDIO"),
    (StreamKind::Combined, "COMBINED"),
];

type Row = [String; 6];

fn cells(variant: &StreamVariant) -> Row {
    [
        variant.id.clone(),
        variant.extension.clone(),
        variant.quality.to_string(),
        variant.codec.clone(),
        variant
            .size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
        variant.note.clone().unwrap_or_default(),
    ]
}

/// Render `variants` as VIDEO, AUDIO and COMBINED sections.
///
/// Column widths are shared by all sections so they line up; a section with
/// no variants prints `(none)`.
pub fn render(variants: &[StreamVariant]) -> String {
    let rows: Vec<(StreamKind, Row)> = variants.iter().map(|v| (v.kind, cells(v))).collect();

    let mut widths = HEADERS.map(str::len);
    for (_, row) in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = HEADERS.map(String::from);
    let mut out = String::new();

    for (i, (kind, title)) in SECTIONS.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(title);
        out.push('\n');

        let mut section = rows.iter().filter(|(k, _)| k == kind).peekable();
        if section.peek().is_none() {
            out.push_str("  (none)\n");
            continue;
        }

        push_row(&mut out, &header, &widths);
        for (_, row) in section {
            push_row(&mut out, row, &widths);
        }
    }

    out
}

fn push_row(out: &mut String, row: &Row, widths: &[usize; 6]) {
    let mut line = String::from(" ");
    for (cell, width) in row.iter().zip(widths) {
        let _ = write!(line, " {:<width$} ", cell, width = *width);
    }
    out.push_str(line.trim_end());
    out.push('\n');
}
