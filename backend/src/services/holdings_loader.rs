use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Holding, UNKNOWN_SECTOR};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported portfolio file format: {0}")]
    UnsupportedFormat(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Supplies the holdings for one request.
pub trait HoldingsLoader: Send + Sync {
    fn load_holdings(&self) -> Result<Vec<Holding>, LoaderError>;
}

// Column aliases, most specific first. The `__EMPTY_n` names are what a
// sheet with blank header cells produces.
const NAME_KEYS: &[&str] = &["Particulars", "__EMPTY_1"];
const SYMBOL_KEYS: &[&str] = &["Symbol", "NSE/BSE", "__EMPTY_6"];
const PURCHASE_PRICE_KEYS: &[&str] = &["Purchase Price", "__EMPTY_2"];
const QUANTITY_KEYS: &[&str] = &["Qty", "__EMPTY_3"];

/// One sheet row keyed by header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow(HashMap<String, String>);

impl RawRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// First non-blank value among the aliases.
    fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    fn number_of(&self, keys: &[&str]) -> BigDecimal {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .map(|v| parse_number(v))
            .find(|n| !n.is_zero())
            .unwrap_or_else(BigDecimal::zero)
    }
}

/// Reads the first sheet of an `.xlsx`/`.xls`/`.ods` workbook, or a `.csv` file.
pub struct SpreadsheetHoldingsLoader {
    path: PathBuf,
}

impl SpreadsheetHoldingsLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HoldingsLoader for SpreadsheetHoldingsLoader {
    fn load_holdings(&self) -> Result<Vec<Holding>, LoaderError> {
        let grid = read_grid(&self.path)?;
        let rows = rows_from_grid(grid);
        let holdings = normalize_rows(&rows);

        info!("Read {} holdings from {}", holdings.len(), self.path.display());
        Ok(holdings)
    }
}

fn read_grid(path: &Path) -> Result<Vec<Vec<String>>, LoaderError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(path),
        "csv" => read_csv(path),
        _ => Err(LoaderError::UnsupportedFormat(path.display().to_string())),
    }
}

fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>, LoaderError> {
    if !path.exists() {
        return Err(LoaderError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    let mut workbook =
        open_workbook_auto(path).map_err(|e| LoaderError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoaderError::Spreadsheet("workbook has no sheets".into()))?
        .map_err(|e| LoaderError::Spreadsheet(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

fn read_csv(path: &Path) -> Result<Vec<Vec<String>>, LoaderError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(grid)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        // Scrip codes are stored as numbers; render 532174.0 as 532174
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

/// Turns a cell grid into header-keyed rows.
///
/// The first row with any content is the header. Blank header cells are
/// named `__EMPTY`, `__EMPTY_1`, ... and repeated names get a `_n` suffix.
pub fn rows_from_grid(grid: Vec<Vec<String>>) -> Vec<RawRow> {
    let mut lines = grid
        .into_iter()
        .skip_while(|row| row.iter().all(|c| c.trim().is_empty()));

    let Some(header_cells) = lines.next() else {
        return Vec::new();
    };
    let headers = header_names(&header_cells);

    lines
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .map(|row| {
            RawRow(
                headers
                    .iter()
                    .cloned()
                    .zip(row.into_iter().chain(std::iter::repeat(String::new())))
                    .collect(),
            )
        })
        .collect()
}

fn header_names(cells: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    cells
        .iter()
        .map(|cell| {
            let base = match cell.trim() {
                "" => "__EMPTY".to_string(),
                name => name.to_string(),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 { base } else { format!("{}_{}", base, count) };
            *count += 1;
            name
        })
        .collect()
}

/// Applies sector headers and column aliases to produce typed holdings.
///
/// A row whose name ends in "sector" (or is "Others") starts a new sector
/// and is not itself a holding. Rows with no name or a `-` name are skipped.
/// Rows missing a symbol are kept; the enrichment pipeline drops them.
pub fn normalize_rows(rows: &[RawRow]) -> Vec<Holding> {
    let mut current_sector = String::new();
    let mut holdings = Vec::new();

    for row in rows {
        let Some(name) = row.first_of(NAME_KEYS) else {
            continue;
        };

        if let Some(sector) = sector_header(name) {
            debug!("Sector header: {}", sector);
            current_sector = sector;
            continue;
        }

        if name == "-" {
            continue;
        }

        let sector = if current_sector.is_empty() { UNKNOWN_SECTOR } else { current_sector.as_str() };

        holdings.push(Holding::new(
            name,
            row.first_of(SYMBOL_KEYS).unwrap_or_default(),
            row.number_of(PURCHASE_PRICE_KEYS),
            row.number_of(QUANTITY_KEYS),
            sector,
        ));
    }

    holdings
}

/// "Financial  Sector" -> "Financial", "Others" -> "Others".
fn sector_header(name: &str) -> Option<String> {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = collapsed.to_lowercase();

    if lowered == "others" {
        return Some(collapsed);
    }
    if lowered.ends_with("sector") {
        let trimmed = collapsed[..collapsed.len() - "sector".len()].trim_end().to_string();
        return Some(trimmed);
    }
    None
}

fn parse_number(raw: &str) -> BigDecimal {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    BigDecimal::from_str(&cleaned).unwrap_or_else(|_| BigDecimal::zero())
}
