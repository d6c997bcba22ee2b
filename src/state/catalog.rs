/// Photometric catalog: object IDs, positions and per-filter fluxes
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::data::{CatalogObject, FilterPhotometry, NO_DATA_SENTINEL};
use super::table::{Table, TableError};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("photometric catalog: {0}")]
    Table(#[from] TableError),
    #[error("photometric catalog has no rows")]
    Empty,
    #[error("photometric catalog row {row} has no valid {column}")]
    BadValue { row: usize, column: &'static str },
}

/// All catalog objects in file order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    objects: Vec<CatalogObject>,
    /// ID -> row; the first row wins for duplicated IDs.
    index: HashMap<i64, usize>,
}

impl Catalog {
    /// Load the catalog and pick out the flux columns for `filters`.
    pub fn load(path: &Path, filters: &[String]) -> Result<Self, CatalogError> {
        info!("📖 Opening up photometric catalog: {}", path.display());
        let table = Table::read(path)?;
        Self::from_table(&table, filters)
    }

    pub fn from_table(table: &Table, filters: &[String]) -> Result<Self, CatalogError> {
        if table.rows() == 0 {
            return Err(CatalogError::Empty);
        }
        let ids = table.column("ID")?;
        let ras = table.column("RA")?;
        let decs = table.column("DEC")?;

        // Filters without flux columns (e.g. SEGMAP) get no photometry at all
        let flux_columns: Vec<_> = filters
            .iter()
            .map(|filter| {
                let err_name = format!("{}_err", filter);
                match (table.column(filter), table.column(&err_name)) {
                    (Ok(flux), Ok(err)) => Some((flux, err)),
                    _ => {
                        info!("No photometry columns for {}", filter);
                        None
                    }
                }
            })
            .collect();

        let mut objects = Vec::with_capacity(table.rows());
        let mut index = HashMap::with_capacity(table.rows());
        for row in 0..table.rows() {
            let id = ids
                .integer(row)
                .ok_or(CatalogError::BadValue { row, column: "ID" })?;
            let ra = ras
                .real(row)
                .ok_or(CatalogError::BadValue { row, column: "RA" })?;
            let dec = decs
                .real(row)
                .ok_or(CatalogError::BadValue { row, column: "DEC" })?;

            let photometry = flux_columns
                .iter()
                .map(|columns| {
                    columns.map(|(flux, err)| {
                        FilterPhotometry::new(
                            flux.real(row).unwrap_or(NO_DATA_SENTINEL),
                            err.real(row).unwrap_or(NO_DATA_SENTINEL),
                        )
                    })
                })
                .collect();

            if index.contains_key(&id) {
                warn!("⚠️  Duplicate catalog ID {} at row {}", id, row);
            } else {
                index.insert(id, row);
            }
            objects.push(CatalogObject {
                id,
                ra,
                dec,
                photometry,
            });
        }

        info!("✅ Loaded {} catalog objects", objects.len());
        Ok(Self { objects, index })
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&CatalogObject> {
        self.objects.get(row)
    }

    /// Catalog row of an object ID.
    pub fn row_of(&self, id: i64) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.objects.iter().map(|o| o.id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const CATALOG: &str = "\
#ID RA DEC HST_F606W HST_F606W_err NRC_F200W NRC_F200W_err
100 53.1600 -27.7800 12.0 3.0 40.0 4.0
101 53.1601 -27.7801 -9999 -9999 8.0 2.0
102 53.1602 -27.7802 1.0 0.5 -500.0 2.0
";

    pub(crate) fn filters() -> Vec<String> {
        ["HST_F606W", "NRC_F200W", "SEGMAP"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub(crate) fn sample_catalog() -> Catalog {
        let table = Table::parse_ascii(CATALOG).unwrap();
        Catalog::from_table(&table, &filters()).unwrap()
    }

    #[test]
    fn test_load_rows_and_photometry() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec![100, 101, 102]);
        assert_eq!(catalog.row_of(101), Some(1));
        assert!(catalog.row_of(999).is_none());

        let first = catalog.get(0).unwrap();
        assert_eq!(first.photometry.len(), 3);
        assert_eq!(first.photometry_for(0).unwrap().snr, 4.0);
        assert_eq!(first.photometry_for(1).unwrap().snr, 10.0);
        assert!(first.photometry_for(2).is_none());

        let second = catalog.get(1).unwrap();
        assert!(second.photometry_for(0).unwrap().is_no_data());
        assert!(!second.photometry_for(1).unwrap().is_no_data());
    }

    #[test]
    fn test_missing_required_column() {
        let table = Table::parse_ascii("ID RA\n1 2.0\n").unwrap();
        assert!(matches!(
            Catalog::from_table(&table, &filters()),
            Err(CatalogError::Table(TableError::MissingColumn(_)))
        ));
        let empty = Table::parse_ascii("ID RA DEC\n").unwrap();
        assert!(matches!(
            Catalog::from_table(&empty, &filters()),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.dat");
        std::fs::write(&path, CATALOG).unwrap();
        let catalog = Catalog::load(&path, &filters()).unwrap();
        assert_eq!(catalog.len(), 3);
    }
}
