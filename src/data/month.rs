//! Month Enumeration
//! Fixed mapping between display names, lowercase keys and calendar index.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column holding the lowercase month key in the pollution table.
pub const KEY_COLUMN: &str = "Mes";
/// Column holding the month display name in disease tables.
pub const DISPLAY_COLUMN: &str = "Mês";
/// Column holding the calendar index.
pub const INDEX_COLUMN: &str = "Mes_num";

/// Months covered by the dashboard, in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    #[serde(rename = "Janeiro")]
    January,
    #[serde(rename = "Fevereiro")]
    February,
    #[serde(rename = "Março")]
    March,
}

impl Month {
    pub const ALL: [Month; 3] = [Month::January, Month::February, Month::March];

    /// Name shown to the user and used as join key on the disease side.
    pub fn display_name(self) -> &'static str {
        match self {
            Month::January => "Janeiro",
            Month::February => "Fevereiro",
            Month::March => "Março",
        }
    }

    /// Lowercase key used by the pollution file.
    pub fn key(self) -> &'static str {
        match self {
            Month::January => "janeiro",
            Month::February => "fevereiro",
            Month::March => "março",
        }
    }

    /// Calendar index (January = 1).
    pub fn index(self) -> i32 {
        match self {
            Month::January => 1,
            Month::February => 2,
            Month::March => 3,
        }
    }

    /// Lookup by display name, ignoring case and surrounding whitespace.
    pub fn from_display(name: &str) -> Option<Month> {
        let name = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.display_name().to_lowercase() == name)
    }

    pub fn from_key(key: &str) -> Option<Month> {
        let key = key.trim().to_lowercase();
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    pub fn from_index(index: i32) -> Option<Month> {
        Self::ALL.into_iter().find(|m| m.index() == index)
    }

    /// The mapping as a table: (Mes, Mês, Mes_num).
    pub fn lookup_frame() -> PolarsResult<DataFrame> {
        let keys: Vec<&str> = Self::ALL.iter().map(|m| m.key()).collect();
        let names: Vec<&str> = Self::ALL.iter().map(|m| m.display_name()).collect();
        let indices: Vec<i32> = Self::ALL.iter().map(|m| m.index()).collect();

        DataFrame::new(vec![
            Column::new(KEY_COLUMN.into(), keys),
            Column::new(DISPLAY_COLUMN.into(), names),
            Column::new(INDEX_COLUMN.into(), indices),
        ])
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
