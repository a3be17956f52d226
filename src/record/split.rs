//! Split a raw ENDF line sequence into per-(MF, MT) sections.

use std::collections::BTreeMap;

use super::read::{parse_file, parse_section};

/// MF -> MT -> lines, in file order.
pub type SectionTable = BTreeMap<u32, BTreeMap<u32, Vec<String>>>;

/// Group `lines` by their (MF, MT) control numbers, skipping blank lines.
/// Control-only lines (FEND/MEND/TEND, all carrying MF=MT=0 alongside the
/// section's own MF=0 TEXT/tape-head lines) land in the `(0, 0)` bucket;
/// the driver recognises and strips them explicitly rather than relying on
/// this grouping to separate them out.
pub fn split_sections(lines: &[String]) -> SectionTable {
    let mut table: SectionTable = BTreeMap::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let (Ok(mf), Ok(mt)) = (parse_file(line), parse_section(line)) else {
            continue;
        };
        table.entry(mf).or_default().entry(mt).or_default().push(line.clone());
    }
    table
}
