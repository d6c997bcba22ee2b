/// Column tables read from FITS binary tables or whitespace ASCII files
///
/// Both the photometric catalog and the fitting-result files come in either
/// form. FITS tables are read from HDU 1; ASCII tables carry a header line
/// (optionally starting with `#`) naming the columns.
use fitsio::hdu::HduInfo;
use fitsio::FitsFile;
use log::warn;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// HDU holding the table in FITS files.
pub const TABLE_HDU: usize = 1;

const FITS_MAGIC: &[u8] = b"SIMPLE  =";

#[derive(Error, Debug)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("FITS error in {path}: {source}")]
    Fits {
        path: PathBuf,
        source: fitsio::errors::Error,
    },
    #[error("{0} HDU 1 is not a table")]
    NotATable(PathBuf),
    #[error("table has no header line")]
    MissingHeader,
    #[error("row {line} has {found} fields, header names {expected}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("table has no column {0:?}")]
    MissingColumn(String),
    #[error("table data is not UTF-8 text")]
    NotText,
}

/// One table column.
#[derive(Debug, Clone, PartialEq)]
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

    pub fn real(&self, row: usize) -> Option<f64> {
        match self {
            Column::Numeric(v) => v.get(row).copied(),
            Column::Text(v) => v.get(row)?.trim().parse().ok(),
        }
    }

    /// Integer value; text IDs like `"00123"` parse too.
    pub fn integer(&self, row: usize) -> Option<i64> {
        match self {
            Column::Numeric(v) => {
                let value = *v.get(row)?;
                value.is_finite().then_some(value.round() as i64)
            }
            Column::Text(v) => {
                let text = v.get(row)?.trim();
                text.parse::<i64>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().map(|f| f.round() as i64))
            }
        }
    }

    /// Boolean value: non-zero numbers, `T` / `True` / `1` text.
    pub fn flag(&self, row: usize) -> Option<bool> {
        match self {
            Column::Numeric(v) => v.get(row).map(|&x| x != 0.0),
            Column::Text(v) => match v.get(row)?.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "1" | "yes" => Some(true),
                "f" | "false" | "0" | "no" => Some(false),
                _ => None,
            },
        }
    }
}

/// Named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Read a table file, FITS or ASCII depending on its leading bytes.
    pub fn read(path: &Path) -> Result<Self, TableError> {
        let io_error = |source| TableError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut head = [0u8; 9];
        let is_fits = {
            let mut file = File::open(path).map_err(io_error)?;
            file.read_exact(&mut head).is_ok() && &head[..] == FITS_MAGIC
        };
        if is_fits {
            Self::read_fits(path)
        } else {
            let text = std::fs::read_to_string(path).map_err(io_error)?;
            Self::parse_ascii(&text)
        }
    }

    /// Read every column of HDU 1 of a FITS file.
    ///
    /// Columns that are neither numeric nor text (e.g. vector columns) are
    /// skipped with a warning.
    pub fn read_fits(path: &Path) -> Result<Self, TableError> {
        let fits_error = |source| TableError::Fits {
            path: path.to_path_buf(),
            source,
        };
        let mut fptr = FitsFile::open(path).map_err(fits_error)?;
        let hdu = fptr.hdu(TABLE_HDU).map_err(fits_error)?;

        let (names, rows): (Vec<String>, usize) = match &hdu.info {
            HduInfo::TableInfo {
                column_descriptions,
                num_rows,
            } => (
                column_descriptions.iter().map(|c| c.name.clone()).collect(),
                *num_rows,
            ),
            _ => return Err(TableError::NotATable(path.to_path_buf())),
        };

        let mut table = Table {
            rows,
            ..Table::default()
        };
        for name in names {
            let column = match hdu.read_col::<f64>(&mut fptr, &name) {
                Ok(values) => Column::Numeric(values),
                Err(_) => match hdu.read_col::<String>(&mut fptr, &name) {
                    Ok(values) => Column::Text(values),
                    Err(e) => {
                        warn!("⚠️  {}: skipping column {}: {}", path.display(), name, e);
                        continue;
                    }
                },
            };
            table.push(name, column);
        }
        Ok(table)
    }

    /// Parse a whitespace-separated table with a header line.
    pub fn parse_ascii(text: &str) -> Result<Self, TableError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let (_, header) = lines.next().ok_or(TableError::MissingHeader)?;
        let names: Vec<String> = header
            .trim_start_matches('#')
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(TableError::MissingHeader);
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for (line, row) in lines {
            if row.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = row.split_whitespace().collect();
            if fields.len() != names.len() {
                return Err(TableError::Ragged {
                    line,
                    expected: names.len(),
                    found: fields.len(),
                });
            }
            for (column, field) in cells.iter_mut().zip(fields) {
                column.push(field.to_string());
            }
        }

        let rows = cells.first().map_or(0, Vec::len);
        let mut table = Table {
            rows,
            ..Table::default()
        };
        for (name, values) in names.into_iter().zip(cells) {
            let numeric: Option<Vec<f64>> = values.iter().map(|v| v.parse().ok()).collect();
            let column = match numeric {
                Some(numbers) if !values.is_empty() => Column::Numeric(numbers),
                _ => Column::Text(values),
            };
            table.push(name, column);
        }
        Ok(table)
    }

    /// Parse a table that arrived as bytes (a remote download).
    ///
    /// FITS content is spooled to a temporary file so cfitsio can open it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        if bytes.starts_with(FITS_MAGIC) {
            let spool = tempfile::Builder::new()
                .suffix(".fits")
                .tempfile()
                .map_err(|source| TableError::Io {
                    path: std::env::temp_dir(),
                    source,
                })?;
            std::fs::write(spool.path(), bytes).map_err(|source| TableError::Io {
                path: spool.path().to_path_buf(),
                source,
            })?;
            Self::read_fits(spool.path())
        } else {
            let text = std::str::from_utf8(bytes).map_err(|_| TableError::NotText)?;
            Self::parse_ascii(text)
        }
    }

    fn push(&mut self, name: String, column: Column) {
        self.names.push(name);
        self.columns.push(column);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }
}
