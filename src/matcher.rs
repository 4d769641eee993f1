//! Matching recognized tour numbers against the record table.

use std::collections::BTreeMap;

use crate::model::OverlaySpec;
use crate::table::RecordTable;

/// Matches per page, keyed by page index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMatches {
    /// Overlay text for every page whose code was found in the table.
    pub overlays: BTreeMap<usize, OverlaySpec>,
    /// Pages with a recognized code that no record carries.
    pub unmatched: Vec<(usize, String)>,
}

/// Exact key lookup of recognized codes.
///
/// Pure: the same codes and table always give the same matches.
#[derive(Debug, Clone, Copy)]
pub struct RecordMatcher<'a> {
    table: &'a RecordTable,
}

impl<'a> RecordMatcher<'a> {
    pub fn new(table: &'a RecordTable) -> Self {
        Self { table }
    }

    /// Overlay text for one code, if a record carries it.
    pub fn match_code(&self, code: &str) -> Option<OverlaySpec> {
        self.table.lookup(code).map(|record| record.overlay_spec())
    }

    /// Match the recognized code of every page.
    ///
    /// `codes[i]` is the code of page `i`; pages without a code get no
    /// entry in either map.
    pub fn match_pages(&self, codes: &[Option<String>]) -> PageMatches {
        let mut matches = PageMatches::default();

        for (page, code) in codes.iter().enumerate() {
            let Some(code) = code else { continue };
            match self.match_code(code) {
                Some(spec) => {
                    log::debug!(
                        "Page {}: tour {} -> '{}' / '{}'",
                        page,
                        code,
                        spec.combined_name,
                        spec.extra_value
                    );
                    matches.overlays.insert(page, spec);
                }
                None => {
                    log::debug!("Page {}: tour {} not in table", page, code);
                    matches.unmatched.push((page, code.clone()));
                }
            }
        }

        matches
    }
}
