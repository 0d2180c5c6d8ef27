use std::fmt::Write as _;
use std::io::Cursor;

use calamine::Reader as _;
use thiserror::Error;

pub mod decimate;
pub mod interpolate;
pub mod render;
pub mod server;

// =====================
// Errors
// =====================

/// Error taxonomy: where in the request lifecycle the failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// User input rejected before any computation ran.
    Validation,
    /// Failure inside a core computation; partial results are discarded.
    Computation,
    /// Malformed input file; no computation attempted.
    Parse,
}

#[derive(Error, Debug)]
pub enum SieveError {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet parsing error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    #[error("spreadsheet parsing error: {0}")]
    LegacySpreadsheet(#[from] calamine::XlsError),

    #[error("spreadsheet has no worksheets")]
    EmptyWorkbook,

    #[error("sampling rates must be positive")]
    RateNotPositive,

    #[error("target rate must be strictly less than original rate")]
    RateOrder,

    #[error("decimation factor must be at least 2, got {0}")]
    FactorTooSmall(usize),

    #[error("table needs at least {needed} columns, found {found}")]
    NotEnoughColumns { needed: usize, found: usize },

    #[error("column '{column}' is not numeric")]
    ColumnNotNumeric { column: String },

    #[error("not enough points for interpolation: need at least 3, found {0}")]
    NotEnoughPoints(usize),

    #[error("input coordinate sequences have different lengths: x={x}, y={y}, z={z}")]
    PointLengthMismatch { x: usize, y: usize, z: usize },

    #[error("interpolation produced no valid surface")]
    EmptySurface,

    #[error("decimation filter failed on column '{column}': {reason}")]
    FilterFailed { column: String, reason: String },

    #[error("columns have mismatched lengths after processing: {0}")]
    RaggedColumns(String),
}

impl SieveError {
    /// Classify per the error taxonomy so callers can map to a transport
    /// (HTTP status, exit code) without matching every variant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SieveError::Csv(_)
            | SieveError::Spreadsheet(_)
            | SieveError::LegacySpreadsheet(_)
            | SieveError::EmptyWorkbook => ErrorKind::Parse,
            SieveError::RateNotPositive
            | SieveError::RateOrder
            | SieveError::FactorTooSmall(_)
            | SieveError::NotEnoughColumns { .. }
            | SieveError::ColumnNotNumeric { .. }
            | SieveError::NotEnoughPoints(_)
            | SieveError::PointLengthMismatch { .. } => ErrorKind::Validation,
            SieveError::EmptySurface
            | SieveError::FilterFailed { .. }
            | SieveError::RaggedColumns(_) => ErrorKind::Computation,
        }
    }
}

pub type Result<T> = std::result::Result<T, SieveError>;

// =====================
// Table model
// =====================

/// A single column with its observed type made explicit.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric(_))
    }

    /// Keep every k-th value starting from the first. k must be >= 1.
    pub fn stride(&self, k: usize) -> Column {
        debug_assert!(k >= 1);
        match self {
            Column::Numeric(v) => Column::Numeric(v.iter().copied().step_by(k).collect()),
            Column::Text(v) => Column::Text(v.iter().cloned().step_by(k).collect()),
        }
    }

    /// Render the value at `row` for previews and CSV export.
    pub fn cell(&self, row: usize) -> String {
        match self {
            Column::Numeric(v) => {
                let x = v[row];
                if x.is_nan() {
                    String::new()
                } else {
                    format_float(x)
                }
            }
            Column::Text(v) => v[row].clone(),
        }
    }

    /// Classify raw cells: numeric iff every non-empty cell parses as f64.
    /// Empty cells in a numeric column become NaN.
    fn classify(cells: Vec<String>) -> Column {
        let all_numeric = cells
            .iter()
            .map(|c| c.trim())
            .all(|c| c.is_empty() || c.parse::<f64>().is_ok());

        if all_numeric {
            Column::Numeric(
                cells
                    .iter()
                    .map(|c| c.trim().parse::<f64>().unwrap_or(f64::NAN))
                    .collect(),
            )
        } else {
            Column::Text(cells)
        }
    }
}

/// Integers print without a trailing ".0" so exported CSV round-trips cleanly.
fn format_float(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{x}")
    }
}

/// An ordered set of equally long named columns. Rows are positionally
/// aligned across columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub names: Vec<String>,
    pub columns: Vec<Column>,
}

impl Table {
    /// Build a table, enforcing the equal-length invariant. Mismatched
    /// lengths fail with an error naming every column and its length.
    pub fn new(names: Vec<String>, columns: Vec<Column>) -> Result<Self> {
        debug_assert_eq!(names.len(), columns.len());
        let ragged = columns
            .windows(2)
            .any(|pair| pair[0].len() != pair[1].len());
        if ragged {
            let mut detail = String::new();
            for (name, col) in names.iter().zip(&columns) {
                if !detail.is_empty() {
                    detail.push_str(", ");
                }
                let _ = write!(detail, "{name}={}", col.len());
            }
            return Err(SieveError::RaggedColumns(detail));
        }
        Ok(Table { names, columns })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// Row `i` rendered as strings, in column order.
    pub fn row(&self, i: usize) -> Vec<String> {
        self.columns.iter().map(|c| c.cell(i)).collect()
    }

    /// Parse delimited text with a header row into classified columns.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(false)
            .from_reader(bytes);

        let names: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut raw: Vec<Vec<String>> = vec![Vec::new(); names.len()];

        for rec in rdr.records() {
            let rec = rec?;
            for (i, cell) in rec.iter().enumerate() {
                if i < raw.len() {
                    raw[i].push(cell.to_string());
                }
            }
        }

        let columns = raw.into_iter().map(Column::classify).collect();
        Table::new(names, columns)
    }

    /// Parse the first worksheet of an in-memory xlsx workbook. Cells are
    /// stringified first so classification matches the CSV path exactly.
    pub fn from_xlsx_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut workbook = calamine::Xlsx::new(Cursor::new(bytes))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(SieveError::EmptyWorkbook)??;
        Table::from_range(range)
    }

    /// Same as [`Table::from_xlsx_bytes`] for legacy OLE2 .xls workbooks,
    /// which need a different container reader than zip-based xlsx.
    pub fn from_xls_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut workbook = calamine::Xls::new(Cursor::new(bytes))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(SieveError::EmptyWorkbook)??;
        Table::from_range(range)
    }

    fn from_range(range: calamine::Range<calamine::Data>) -> Result<Self> {
        let mut rows = range.rows();
        let names: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(cell_to_string).collect(),
            None => return Table::new(Vec::new(), Vec::new()),
        };

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for row in rows {
            for (i, cells) in raw.iter_mut().enumerate() {
                cells.push(row.get(i).map(cell_to_string).unwrap_or_default());
            }
        }

        let columns = raw.into_iter().map(Column::classify).collect();
        Table::new(names, columns)
    }

    /// Pick the parser from the uploaded file's extension; anything that is
    /// not a spreadsheet is treated as delimited text.
    pub fn from_upload(filename: &str, bytes: Vec<u8>) -> Result<Self> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".xlsx") {
            Table::from_xlsx_bytes(bytes)
        } else if lower.ends_with(".xls") {
            Table::from_xls_bytes(bytes)
        } else {
            Table::from_csv_bytes(&bytes)
        }
    }

    /// Serialize with a header row, same column names as input.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&self.names)?;
        for i in 0..self.num_rows() {
            wtr.write_record(self.row(i))?;
        }
        let bytes = wtr.into_inner().map_err(|e| {
            SieveError::Csv(csv::Error::from(std::io::Error::other(e.to_string())))
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn cell_to_string(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        calamine::Data::Float(f) => format_float(*f),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

// =====================
// Stride decimation
// =====================

/// Derive the integer downsample factor from a frequency pair.
///
/// Requires both rates positive and `original_rate` strictly greater than
/// `target_rate`; the result is floor(original/target), always >= 1.
pub fn stride_factor(original_rate: f64, target_rate: f64) -> Result<usize> {
    if !(original_rate > 0.0) || !(target_rate > 0.0) {
        return Err(SieveError::RateNotPositive);
    }
    if target_rate >= original_rate {
        return Err(SieveError::RateOrder);
    }
    Ok((original_rate / target_rate).floor() as usize)
}

/// Keep every k-th row of the table, re-indexed from 0.
///
/// Output row i equals input row i*k, for i = 0..ceil(N/k)-1. k = 1 is the
/// identity and an empty table stays empty. Pure; the input is not touched.
pub fn decimate_by_stride(table: &Table, k: usize) -> Table {
    debug_assert!(k >= 1);
    Table {
        names: table.names.clone(),
        columns: table.columns.iter().map(|c| c.stride(k)).collect(),
    }
}
