use serde::{Deserialize, Serialize};

/// Tabular source formats accepted at upload time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabularFormat {
    /// Delimited text (`.csv`).
    Csv,
    /// Spreadsheet workbook (`.xlsx`, `.xls`); only the first sheet is read.
    Workbook,
}

impl TabularFormat {
    /// Selects the format from the extension of `file_name`, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(TabularFormat::Csv),
            "xlsx" | "xls" => Some(TabularFormat::Workbook),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TabularFormat::Csv => "csv",
            TabularFormat::Workbook => "workbook",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "csv" => Some(TabularFormat::Csv),
            "workbook" => Some(TabularFormat::Workbook),
            _ => None,
        }
    }
}
