//! Custom assertion helpers for integration tests.

#![allow(dead_code)]

use compscore_lib::sort::ChromosomeOrder;

/// Lines that are neither header nor failure markers.
pub fn data_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|line| !line.starts_with('#')).collect()
}

/// Lines emitted for records that could not be scored.
pub fn failed_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|line| line.starts_with("#FAILED")).collect()
}

/// Header lines (everything starting with `#` except failure markers).
pub fn header_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|line| line.starts_with('#') && !line.starts_with("#FAILED")).collect()
}

/// Value of an INFO key on a data line.
pub fn info_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let info = line.split('\t').nth(7)?;
    info.split(';').find_map(|entry| entry.strip_prefix(key)?.strip_prefix('='))
}

/// Asserts that data lines are in chromosome/position order.
///
/// # Panics
///
/// Panics on the first pair of lines out of order.
pub fn assert_coordinate_sorted(lines: &[&str]) {
    let keys: Vec<(ChromosomeOrder, u64)> = lines
        .iter()
        .map(|line| {
            let mut fields = line.split('\t');
            let chrom = ChromosomeOrder::from_name(fields.next().expect("CHROM"));
            let pos = fields.next().expect("POS").parse().expect("numeric POS");
            (chrom, pos)
        })
        .collect();
    for (i, pair) in keys.windows(2).enumerate() {
        assert!(pair[0] <= pair[1], "Lines {i} and {} are out of order: {:?} > {:?}", i + 1, pair[0], pair[1]);
    }
}

/// Asserts that all failure markers come after every data line.
///
/// # Panics
///
/// Panics if a data line follows a `#FAILED` line.
pub fn assert_failures_last(text: &str) {
    let mut seen_failure = false;
    for line in text.lines() {
        if line.starts_with("#FAILED") {
            seen_failure = true;
        } else if !line.starts_with('#') {
            assert!(!seen_failure, "Data line after a failure marker: {line}");
        }
    }
}
