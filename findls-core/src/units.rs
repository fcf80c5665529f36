use crate::constants::sizes::{UNITS, UNIT_STEP};

/// Binary-prefix size with two decimals, e.g. `1536` -> `1.50 KB`.
///
/// Stepping stops at the last unit, so anything at or above 1024^5 stays in PB.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= UNIT_STEP && unit + 1 < UNITS.len() {
        value /= UNIT_STEP;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
