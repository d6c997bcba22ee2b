/// Flags and notes written on quit
use fitsio::tables::{ColumnDataType, ColumnDescription};
use fitsio::FitsFile;
use log::info;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::session::ObjectFlags;

pub const FLAG_COLUMNS: [&str; 4] = ["ID", "HighZFlag", "BadFitFlag", "BadDataFlag"];

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write FITS table {path}: {source}")]
    Fits {
        path: PathBuf,
        source: fitsio::errors::Error,
    },
    #[error("{ids} IDs but {flags} flag rows")]
    LengthMismatch { ids: usize, flags: usize },
}

fn is_fits_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("fits"))
}

fn remove_existing(path: &Path) -> Result<(), OutputError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(OutputError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Rewrite the flags table, one row per catalog object.
///
/// A `.fits` path gets a binary table, anything else a whitespace ASCII table.
pub fn write_flags_file(
    path: &Path,
    ids: &[i64],
    flags: &[ObjectFlags],
) -> Result<(), OutputError> {
    if ids.len() != flags.len() {
        return Err(OutputError::LengthMismatch {
            ids: ids.len(),
            flags: flags.len(),
        });
    }
    remove_existing(path)?;
    if is_fits_path(path) {
        write_flags_fits(path, ids, flags)?;
    } else {
        let mut text = FLAG_COLUMNS.join(" ");
        text.push('\n');
        for (id, f) in ids.iter().zip(flags) {
            let _ = writeln!(
                text,
                "{} {} {} {}",
                id, f.high_z as u8, f.bad_fit as u8, f.bad_data as u8
            );
        }
        std::fs::write(path, text).map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let flagged = flags.iter().filter(|f| !f.is_clear()).count();
    info!(
        "💾 Saved flags for {} objects ({} flagged) to {}",
        ids.len(),
        flagged,
        path.display()
    );
    Ok(())
}

fn write_flags_fits(path: &Path, ids: &[i64], flags: &[ObjectFlags]) -> Result<(), OutputError> {
    let fits_error = |source| OutputError::Fits {
        path: path.to_path_buf(),
        source,
    };
    // IDs keep their full 64 bits; flags fit in 32
    let descriptions = FLAG_COLUMNS
        .iter()
        .map(|name| {
            let data_type = if *name == FLAG_COLUMNS[0] {
                ColumnDataType::LongLong
            } else {
                ColumnDataType::Int
            };
            ColumnDescription::new(*name).with_type(data_type).create()
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(fits_error)?;

    let flag_columns: [Vec<i32>; 3] = [
        flags.iter().map(|f| f.high_z as i32).collect(),
        flags.iter().map(|f| f.bad_fit as i32).collect(),
        flags.iter().map(|f| f.bad_data as i32).collect(),
    ];

    let mut fptr = FitsFile::create(path).open().map_err(fits_error)?;
    let hdu = fptr
        .create_table("FLAGS".to_string(), &descriptions)
        .map_err(fits_error)?;
    hdu.write_col(&mut fptr, FLAG_COLUMNS[0], ids).map_err(fits_error)?;
    for (name, values) in FLAG_COLUMNS[1..].iter().zip(&flag_columns) {
        hdu.write_col(&mut fptr, *name, values).map_err(fits_error)?;
    }
    Ok(())
}

/// Rewrite the notes log with every non-empty note.
pub fn write_notes_file(path: &Path, ids: &[i64], notes: &[String]) -> Result<(), OutputError> {
    if ids.len() != notes.len() {
        return Err(OutputError::LengthMismatch {
            ids: ids.len(),
            flags: notes.len(),
        });
    }
    remove_existing(path)?;
    let mut text = String::from("#ID    Notes\n");
    let mut written = 0;
    for (id, note) in ids.iter().zip(notes) {
        if !note.is_empty() {
            let _ = writeln!(text, "{}    {}", id, note);
            written += 1;
        }
    }
    std::fs::write(path, text).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("💾 Saved {} notes to {}", written, path.display());
    Ok(())
}
