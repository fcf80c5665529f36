//! Fixed-width text report: one row per bucket, sorted by path.

use std::io::{self, Write};

use crate::{
    constants::report::{COUNT_WIDTH, PATH_WIDTH, RULE_WIDTH, SIZE_WIDTH},
    units::format_size,
    Stat, StatMap,
};

/// Buckets ordered by path bytes ascending.
pub fn sorted_rows(map: &StatMap) -> Vec<(&str, &Stat)> {
    let mut rows: Vec<(&str, &Stat)> = map.iter().map(|(p, s)| (p.as_str(), s)).collect();
    rows.sort_unstable_by(|a, b| a.0.cmp(b.0));
    rows
}

fn format_columns(path: &str, files: &str, dirs: &str, size: &str) -> String {
    format!(
        "{:<pw$} {:<cw$} {:<cw$} {:<sw$}",
        path,
        files,
        dirs,
        size,
        pw = PATH_WIDTH,
        cw = COUNT_WIDTH,
        sw = SIZE_WIDTH
    )
}

pub fn format_header() -> String {
    format_columns("Directory", "Files", "Dirs", "Size")
}

pub fn format_row(path: &str, stat: &Stat) -> String {
    format_columns(
        path,
        &stat.files.to_string(),
        &stat.dirs.to_string(),
        &format_size(stat.size),
    )
}

pub fn write_report<W: Write>(out: &mut W, map: &StatMap) -> io::Result<()> {
    writeln!(out, "{}", format_header())?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    for (path, stat) in sorted_rows(map) {
        writeln!(out, "{}", format_row(path, stat))?;
    }
    Ok(())
}
