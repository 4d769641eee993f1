//! Tour table loading.
//!
//! The workbook's tour sheet is reduced to four columns by absolute
//! position: tour number, two names and the extra value. The first used
//! row is a header and is skipped. Rows empty across all four columns are
//! dropped. Everything else is kept in table order.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Range, Reader, Xlsx};
use unicode_normalization::UnicodeNormalization;

use crate::detect::is_xlsx_bytes;
use crate::error::{Error, Result};
use crate::model::TabularRecord;
use crate::options::DuplicateKeyPolicy;

/// Column positions (0-based, absolute) of the fields read from the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub tour: u32,
    pub name_4: u32,
    pub name_7: u32,
    pub name_12: u32,
}

impl TableSchema {
    /// Number of columns a sheet must span to satisfy the schema.
    pub fn required_width(&self) -> u32 {
        [self.tour, self.name_4, self.name_7, self.name_12]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }
}

impl Default for TableSchema {
    /// Columns A, D, G and L.
    fn default() -> Self {
        Self {
            tour: 0,
            name_4: 3,
            name_7: 6,
            name_12: 11,
        }
    }
}

/// Normalized tour records with a first-wins key index.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    records: Vec<TabularRecord>,
    index: HashMap<String, usize>,
    duplicates: Vec<String>,
}

impl RecordTable {
    /// Open an xlsx workbook and load `sheet`.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        sheet: &str,
        policy: DuplicateKeyPolicy,
    ) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_xlsx_bytes(&data, sheet, policy)
    }

    /// Load `sheet` from xlsx bytes using the default column schema.
    pub fn from_xlsx_bytes(bytes: &[u8], sheet: &str, policy: DuplicateKeyPolicy) -> Result<Self> {
        if !is_xlsx_bytes(bytes) {
            return Err(Error::TableFormat("not an xlsx workbook".to_string()));
        }

        let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e| Error::TableFormat(format!("failed to open xlsx: {}", e)))?;

        let sheet_names = workbook.sheet_names();
        if !sheet_names.iter().any(|name| name == sheet) {
            return Err(Error::TableFormat(format!(
                "sheet '{}' not found (available: {})",
                sheet,
                sheet_names.join(", ")
            )));
        }

        let range = workbook.worksheet_range(sheet)?;
        Self::from_range(&range, &TableSchema::default(), policy)
    }

    /// Build the table from a worksheet range.
    pub fn from_range(
        range: &Range<Data>,
        schema: &TableSchema,
        policy: DuplicateKeyPolicy,
    ) -> Result<Self> {
        let (Some((first_row, _)), Some((last_row, last_col))) = (range.start(), range.end())
        else {
            return Err(Error::TableFormat("sheet is empty".to_string()));
        };

        if last_col + 1 < schema.required_width() {
            return Err(Error::TableFormat(format!(
                "sheet spans {} column(s), at least {} are required",
                last_col + 1,
                schema.required_width()
            )));
        }

        let cell = |row: u32, col: u32| range.get_value((row, col)).and_then(cell_as_string);

        let mut records = Vec::new();
        // first used row is the header
        for row in first_row + 1..=last_row {
            let tour = cell(row, schema.tour).map(|key| normalize_key(&key));
            let name_4 = cell(row, schema.name_4);
            let name_7 = cell(row, schema.name_7);
            let name_12 = cell(row, schema.name_12);

            if tour.is_none() && name_4.is_none() && name_7.is_none() && name_12.is_none() {
                continue;
            }

            records.push(TabularRecord::new(
                tour.unwrap_or_default(),
                name_4,
                name_7,
                name_12,
            ));
        }

        let table = Self::from_records(records, policy)?;
        log::info!(
            "Loaded {} tour record(s), {} duplicate key(s)",
            table.len(),
            table.duplicates.len()
        );
        Ok(table)
    }

    /// Index already normalized records.
    pub fn from_records(records: Vec<TabularRecord>, policy: DuplicateKeyPolicy) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        let mut duplicates = Vec::new();

        for (position, record) in records.iter().enumerate() {
            if record.tour.is_empty() {
                continue;
            }
            if index.contains_key(&record.tour) {
                if !duplicates.contains(&record.tour) {
                    log::debug!("Duplicate tour number {} at row {}", record.tour, position);
                    duplicates.push(record.tour.clone());
                }
            } else {
                index.insert(record.tour.clone(), position);
            }
        }

        if policy == DuplicateKeyPolicy::Reject && !duplicates.is_empty() {
            return Err(Error::TableFormat(format!(
                "duplicate tour numbers: {}",
                duplicates.join(", ")
            )));
        }

        Ok(Self {
            records,
            index,
            duplicates,
        })
    }

    /// Records in table order.
    pub fn records(&self) -> &[TabularRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record whose key equals `key` after normalization.
    pub fn lookup(&self, key: &str) -> Option<&TabularRecord> {
        let key = normalize_key(key);
        self.index.get(&key).map(|&position| &self.records[position])
    }

    /// Keys that occur in more than one row, in order of first repetition.
    pub fn duplicate_keys(&self) -> &[String] {
        &self.duplicates
    }
}

/// Render a cell as trimmed text; empty and error cells are absent.
fn cell_as_string(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::String(s) => s.trim().to_string(),
        // f64 Display already drops the fraction of integral values (1234.0 -> "1234")
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(_) | Data::Empty => return None,
        other => other.to_string().trim().to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().nfkc().collect()
}
