//! Table records and the overlay text derived from them.

use serde::{Deserialize, Serialize};

/// Marker put in front of the third display field.
pub const EXTRA_VALUE_PREFIX: &str = "E-";

/// One spreadsheet row, reduced to the four selected columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TabularRecord {
    /// Normalized match key (column 1, `TOUR`).
    pub tour: String,
    /// Column 4.
    pub name_4: Option<String>,
    /// Column 7.
    pub name_7: Option<String>,
    /// Column 12.
    pub name_12: Option<String>,
}

impl TabularRecord {
    pub fn new(
        tour: impl Into<String>,
        name_4: Option<String>,
        name_7: Option<String>,
        name_12: Option<String>,
    ) -> Self {
        Self {
            tour: tour.into(),
            name_4,
            name_7,
            name_12,
        }
    }

    /// Derive the overlay text for this record.
    pub fn overlay_spec(&self) -> OverlaySpec {
        OverlaySpec::from_fields(
            self.name_4.as_deref().unwrap_or(""),
            self.name_7.as_deref().unwrap_or(""),
            self.name_12.as_deref().unwrap_or(""),
        )
    }
}

/// Text to stamp on one page.
///
/// Either string may be empty; empty strings are never drawn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverlaySpec {
    /// Non-empty names from columns 4 and 7, joined by `", "`.
    pub combined_name: String,
    /// Column 12 behind [`EXTRA_VALUE_PREFIX`], or empty.
    pub extra_value: String,
}

impl OverlaySpec {
    /// Combine the three display fields.
    ///
    /// Field order is kept (4 before 7) and empty fields leave no stray
    /// separator. The extra value does not depend on the names.
    pub fn from_fields(name_4: &str, name_7: &str, name_12: &str) -> Self {
        let combined_name = [name_4, name_7]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let extra_value = if name_12.is_empty() {
            String::new()
        } else {
            format!("{}{}", EXTRA_VALUE_PREFIX, name_12)
        };

        Self {
            combined_name,
            extra_value,
        }
    }

    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.combined_name.is_empty() && self.extra_value.is_empty()
    }
}
