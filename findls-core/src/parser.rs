//! `find -ls` line parser.
//!
//! One fixed-shape pattern per line: inode, blocks, mode, links, owner,
//! group, size, three date tokens, then the path as the rest of the line.
//! Lines that do not fit are dropped without a diagnostic.

use std::sync::OnceLock;

use log::trace;
use regex::Regex;

const FIND_LS_PATTERN: &str =
    r"^\s*\d+\s+\d+\s+(\S+)\s+\d+\s+\S+\s+\S+\s+(\d+)\s+\w+\s+\d+\s+[\d:]+\s+(.+)$";

static FIND_LS_LINE: OnceLock<Regex> = OnceLock::new();

#[inline]
fn find_ls_line() -> &'static Regex {
    FIND_LS_LINE.get_or_init(|| Regex::new(FIND_LS_PATTERN).expect("find -ls pattern compiles"))
}

/// One parsed listing line. Borrows the path from the input line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry<'a> {
    pub path: &'a str,
    pub size: u64,
    pub is_dir: bool,
}

/// Parse one `find -ls` line; `None` for anything that is not a listing row.
pub fn parse_line(line: &str) -> Option<Entry<'_>> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(caps) = find_ls_line().captures(line) else {
        trace!("skip unparseable line: {:?}", line);
        return None;
    };
    let mode = caps.get(1)?.as_str();
    // sizes beyond u64 are treated like any other malformed row
    let size = caps.get(2)?.as_str().parse::<u64>().ok()?;
    let path = caps.get(3)?.as_str();
    Some(Entry {
        path,
        size,
        is_dir: mode.starts_with('d'),
    })
}
