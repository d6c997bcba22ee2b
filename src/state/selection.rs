/// Command-line object selection
///
/// Turns `-id`, `-idlist` and `-idarglist` into the viewing list. IDs
/// requested explicitly must all exist in the catalog.
use log::{info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::catalog::Catalog;
use super::session::ViewingList;

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Object {0} does not appear in this catalog. Exiting.")]
    UnknownId(i64),
    #[error("failed to read ID list {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("ID list {path} line {line}: {text:?} is not an object ID")]
    BadListEntry {
        path: PathBuf,
        line: usize,
        text: String,
    },
    #[error("-idarglist is not a list of IDs: {0}")]
    ArgList(#[from] serde_json::Error),
    #[error("the ID list is empty")]
    EmptyList,
    #[error("the catalog is empty")]
    EmptyCatalog,
}

/// How the objects to view were chosen on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Browse the whole catalog from the first row.
    #[default]
    All,
    /// Browse the whole catalog starting at one object.
    StartAt(i64),
    /// IDs from the first column of a file.
    IdListFile(PathBuf),
    /// IDs from a literal such as `"[1, 2, 3]"`.
    IdArgList(String),
}

impl Selection {
    /// Resolve the command-line options into one mode.
    ///
    /// A single ID wins over the list modes; the argument list wins over the
    /// list file.
    pub fn from_args(
        id: Option<i64>,
        id_list: Option<PathBuf>,
        id_arg_list: Option<String>,
    ) -> Self {
        if let Some(id) = id {
            if id_list.is_some() || id_arg_list.is_some() {
                warn!("⚠️  You can't specify an individual ID and a list, ignoring the list.");
            }
            return Selection::StartAt(id);
        }
        match (id_arg_list, id_list) {
            (Some(literal), _) => Selection::IdArgList(literal),
            (None, Some(path)) => Selection::IdListFile(path),
            (None, None) => Selection::All,
        }
    }

    /// Build the viewing list against the loaded catalog.
    pub fn viewing_list(&self, catalog: &Catalog) -> Result<ViewingList, SelectionError> {
        if catalog.is_empty() {
            return Err(SelectionError::EmptyCatalog);
        }
        match self {
            Selection::All => Ok(ViewingList::whole_catalog(catalog)),
            Selection::StartAt(id) => {
                let start = catalog.row_of(*id).ok_or(SelectionError::UnknownId(*id))?;
                Ok(ViewingList {
                    start,
                    ..ViewingList::whole_catalog(catalog)
                })
            }
            Selection::IdListFile(path) => list_from_ids(catalog, read_id_list(path)?),
            Selection::IdArgList(literal) => list_from_ids(catalog, parse_id_arg_list(literal)?),
        }
    }
}

/// First whitespace column of every non-comment row.
pub fn parse_id_list(path: &Path, text: &str) -> Result<Vec<i64>, SelectionError> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let first = line.split_whitespace().next()?;
            Some(
                first
                    .parse::<i64>()
                    .or_else(|_| first.parse::<f64>().map(|f| f as i64))
                    .map_err(|_| SelectionError::BadListEntry {
                        path: path.to_path_buf(),
                        line: i + 1,
                        text: first.to_string(),
                    }),
            )
        })
        .collect()
}

pub fn read_id_list(path: &Path) -> Result<Vec<i64>, SelectionError> {
    let text = std::fs::read_to_string(path).map_err(|source| SelectionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_id_list(path, &text)
}

/// Parse a JSON-style list literal like `[1, 2, 3]`.
pub fn parse_id_arg_list(literal: &str) -> Result<Vec<i64>, SelectionError> {
    Ok(serde_json::from_str(literal.trim())?)
}

fn list_from_ids(catalog: &Catalog, ids: Vec<i64>) -> Result<ViewingList, SelectionError> {
    if ids.is_empty() {
        return Err(SelectionError::EmptyList);
    }
    let rows = ids
        .iter()
        .map(|&id| catalog.row_of(id).ok_or(SelectionError::UnknownId(id)))
        .collect::<Result<Vec<_>, _>>()?;
    info!("📋 Viewing {} objects from the ID list", ids.len());
    Ok(ViewingList {
        ids,
        rows,
        start: 0,
        explicit: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::catalog::tests::sample_catalog;

    #[test]
    fn test_from_args_precedence() {
        assert_eq!(Selection::from_args(None, None, None), Selection::All);
        assert_eq!(
            Selection::from_args(Some(101), Some("ids.txt".into()), None),
            Selection::StartAt(101)
        );
        assert_eq!(
            Selection::from_args(None, Some("ids.txt".into()), Some("[1]".into())),
            Selection::IdArgList("[1]".into())
        );
        assert_eq!(
            Selection::from_args(None, Some("ids.txt".into()), None),
            Selection::IdListFile("ids.txt".into())
        );
    }

    #[test]
    fn test_whole_catalog_and_start() {
        let catalog = sample_catalog();
        let all = Selection::All.viewing_list(&catalog).unwrap();
        assert_eq!(all.ids, vec![100, 101, 102]);
        assert!(!all.explicit);

        let start = Selection::StartAt(102).viewing_list(&catalog).unwrap();
        assert_eq!(start.start, 2);
        assert_eq!(start.len(), 3);
        assert!(matches!(
            Selection::StartAt(7).viewing_list(&catalog),
            Err(SelectionError::UnknownId(7))
        ));
    }

    #[test]
    fn test_arg_list() {
        let catalog = sample_catalog();
        let list = Selection::IdArgList("[102, 100]".into())
            .viewing_list(&catalog)
            .unwrap();
        assert_eq!(list.ids, vec![102, 100]);
        assert_eq!(list.rows, vec![2, 0]);
        assert!(list.explicit);

        assert!(matches!(
            Selection::IdArgList("[100, 5]".into()).viewing_list(&catalog),
            Err(SelectionError::UnknownId(5))
        ));
        assert!(matches!(
            Selection::IdArgList("100, 5".into()).viewing_list(&catalog),
            Err(SelectionError::ArgList(_))
        ));
        assert!(matches!(
            Selection::IdArgList("[]".into()).viewing_list(&catalog),
            Err(SelectionError::EmptyList)
        ));
    }

    #[test]
    fn test_id_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.txt");
        std::fs::write(&path, "# ID z\n101 6.2\n\n100 1.1\n").unwrap();
        let list = Selection::IdListFile(path.clone())
            .viewing_list(&sample_catalog())
            .unwrap();
        assert_eq!(list.ids, vec![101, 100]);

        assert!(matches!(
            parse_id_list(&path, "101\nabc\n"),
            Err(SelectionError::BadListEntry { line: 2, .. })
        ));
        assert!(matches!(
            read_id_list(&dir.path().join("missing.txt")),
            Err(SelectionError::Io { .. })
        ));
    }
}
