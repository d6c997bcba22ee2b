//! Image registry: the per-filter mosaics listed in the image list file.
//!
//! Every mosaic is opened once at startup and then shared read-only by all
//! cutout requests for the rest of the session.

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::FitsFile;
use log::{debug, info, warn};
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::wcs::{HeaderCards, Wcs, WCS_KEYWORDS};

/// Path literal in the image list that stands for "no image for this filter".
pub const NO_IMAGE: &str = "NoImage";

/// Science extension used when the image list does not name one.
pub const DEFAULT_EXTENSION: usize = 1;

/// Filter name of the segmentation-map layer.
pub const SEGMENTATION_FILTER: &str = "SEGMAP";

#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("failed to read image list {path}: {source}")]
    ListIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("image list line {line}: expected `filter [extension] path`, got {text:?}")]
    ListSyntax { line: usize, text: String },
    #[error("image list is empty")]
    EmptyList,
    #[error("FITS error in {path}: {source}")]
    Fits {
        path: PathBuf,
        source: fitsio::errors::Error,
    },
    #[error("{path} extension {extension} is not a 2-D image")]
    NotAnImage { path: PathBuf, extension: usize },
}

/// Where a filter's pixels come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    File(PathBuf),
    Placeholder,
}

/// One row of the image list.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageListEntry {
    pub filter: String,
    pub extension: usize,
    pub source: ImageSource,
}

/// Parse the image list: rows of `filter path` or `filter extension path`.
pub fn parse_image_list(text: &str) -> Result<Vec<ImageListEntry>, MosaicError> {
    let mut entries = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let syntax_error = || MosaicError::ListSyntax {
            line: number + 1,
            text: line.to_string(),
        };
        let (filter, extension, path) = match fields.as_slice() {
            [filter, path] => (*filter, DEFAULT_EXTENSION, *path),
            [filter, extension, path] => {
                let extension = extension.parse::<usize>().map_err(|_| syntax_error())?;
                (*filter, extension, *path)
            }
            _ => return Err(syntax_error()),
        };
        let source = if path == NO_IMAGE {
            ImageSource::Placeholder
        } else {
            ImageSource::File(PathBuf::from(path))
        };
        entries.push(ImageListEntry {
            filter: filter.to_string(),
            extension,
            source,
        });
    }

    if entries.is_empty() {
        return Err(MosaicError::EmptyList);
    }
    Ok(entries)
}

/// Read and parse an image list file.
pub fn read_image_list(path: &Path) -> Result<Vec<ImageListEntry>, MosaicError> {
    let text = fs::read_to_string(path).map_err(|source| MosaicError::ListIo {
        path: path.to_path_buf(),
        source,
    })?;
    parse_image_list(&text)
}

/// A loaded science image for one filter.
#[derive(Debug, Clone)]
pub struct Mosaic {
    pub filter: String,
    pub extension: usize,
    /// Pixel values indexed `[y, x]` in FITS order (row 0 is the bottom row).
    pub pixels: Array2<f64>,
    /// `None` for placeholders and images without a usable celestial WCS.
    pub wcs: Option<Wcs>,
}

impl Mosaic {
    /// An empty stand-in for a filter listed as `NoImage`.
    pub fn placeholder(filter: &str) -> Self {
        Self {
            filter: filter.to_string(),
            extension: 0,
            pixels: Array2::zeros((0, 0)),
            wcs: None,
        }
    }

    pub fn is_segmentation(&self) -> bool {
        self.filter == SEGMENTATION_FILTER
    }

    /// Open the entry's science extension.
    ///
    /// A missing extension falls back to the primary HDU. A header without a
    /// usable WCS still loads; cutouts from it will degrade.
    pub fn open(entry: &ImageListEntry) -> Result<Self, MosaicError> {
        let path = match &entry.source {
            ImageSource::Placeholder => return Ok(Self::placeholder(&entry.filter)),
            ImageSource::File(path) => path,
        };
        info!("🔭 Opening up image: {}", path.display());

        let fits_error = |source| MosaicError::Fits {
            path: path.clone(),
            source,
        };
        let mut fptr = FitsFile::open(path).map_err(fits_error)?;

        let (hdu, extension) = match fptr.hdu(entry.extension) {
            Ok(hdu) => (hdu, entry.extension),
            Err(_) => {
                warn!(
                    "⚠️  {} has no extension {}, using the primary HDU",
                    path.display(),
                    entry.extension
                );
                (fptr.primary_hdu().map_err(fits_error)?, 0)
            }
        };

        let (ny, nx) = match &hdu.info {
            HduInfo::ImageInfo { shape, .. } if shape.len() == 2 => (shape[0], shape[1]),
            _ => {
                return Err(MosaicError::NotAnImage {
                    path: path.clone(),
                    extension,
                })
            }
        };

        let data: Vec<f64> = hdu.read_image(&mut fptr).map_err(fits_error)?;
        let pixels = Array2::from_shape_vec((ny, nx), data).map_err(|_| MosaicError::NotAnImage {
            path: path.clone(),
            extension,
        })?;

        let header = read_wcs_cards(&hdu, &mut fptr);
        let wcs = match Wcs::from_header(&header) {
            Ok(wcs) => {
                let (ra, dec) = wcs.pixel_to_world(nx as f64 / 2.0, ny as f64 / 2.0);
                debug!(
                    "{} [{}] centred at RA {:.5} DEC {:.5}",
                    path.display(),
                    entry.filter,
                    ra,
                    dec
                );
                Some(wcs)
            }
            Err(e) => {
                warn!("⚠️  {} [{}]: {}", path.display(), entry.filter, e);
                None
            }
        };

        Ok(Self {
            filter: entry.filter.clone(),
            extension,
            pixels,
            wcs,
        })
    }
}

/// Pull the WCS keywords out of an HDU header.
fn read_wcs_cards(hdu: &FitsHdu, fptr: &mut FitsFile) -> HeaderCards {
    let mut cards = HeaderCards::new();
    for key in WCS_KEYWORDS {
        if let Ok(value) = hdu.read_key::<f64>(fptr, key) {
            cards.set_real(key, value);
        } else if let Ok(value) = hdu.read_key::<String>(fptr, key) {
            cards.set_text(key, &value);
        }
    }
    cards
}

/// All mosaics in image-list order.
#[derive(Debug, Clone, Default)]
pub struct MosaicSet {
    mosaics: Vec<Mosaic>,
}

impl MosaicSet {
    pub fn new(mosaics: Vec<Mosaic>) -> Self {
        Self { mosaics }
    }

    /// Open every entry of the image list.
    pub fn open_all(entries: &[ImageListEntry]) -> Result<Self, MosaicError> {
        let mosaics = entries
            .iter()
            .map(Mosaic::open)
            .collect::<Result<Vec<_>, _>>()?;
        info!("✅ Opened {} images", mosaics.len());
        Ok(Self { mosaics })
    }

    pub fn len(&self) -> usize {
        self.mosaics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mosaics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mosaic> {
        self.mosaics.iter()
    }

    pub fn filter_names(&self) -> Vec<String> {
        self.mosaics.iter().map(|m| m.filter.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sky::cutout::{Cutout, CutoutError};
    use fitsio::images::{ImageDescription, ImageType};

    const NY: usize = 20;
    const NX: usize = 30;

    fn ramp() -> Vec<f64> {
        (0..NY * NX).map(|i| i as f64).collect()
    }

    fn write_tan_header(hdu: &FitsHdu, fptr: &mut FitsFile) {
        hdu.write_key(fptr, "CTYPE1", "RA---TAN".to_string()).unwrap();
        hdu.write_key(fptr, "CTYPE2", "DEC--TAN".to_string()).unwrap();
        let scale = 0.03 / 3600.0;
        for (key, value) in [
            ("CRVAL1", 53.16),
            ("CRVAL2", -27.78),
            ("CRPIX1", 15.0),
            ("CRPIX2", 10.0),
            ("CD1_1", -scale),
            ("CD2_2", scale),
        ] {
            hdu.write_key(fptr, key, value).unwrap();
        }
    }

    /// Flat primary image without a WCS, ramp with a TAN header in extension 1.
    fn write_mosaic_file(path: &Path) {
        let description = ImageDescription {
            data_type: ImageType::Double,
            dimensions: &[NY, NX],
        };
        let mut fptr = FitsFile::create(path)
            .with_custom_primary(&description)
            .open()
            .unwrap();
        let primary = fptr.primary_hdu().unwrap();
        primary.write_image(&mut fptr, &vec![1.0; NY * NX]).unwrap();
        let sci = fptr.create_image("SCI".to_string(), &description).unwrap();
        sci.write_image(&mut fptr, &ramp()).unwrap();
        write_tan_header(&sci, &mut fptr);
    }

    fn entry(path: &Path, extension: usize) -> ImageListEntry {
        ImageListEntry {
            filter: "NRC_F200W".to_string(),
            extension,
            source: ImageSource::File(path.to_path_buf()),
        }
    }

    #[test]
    fn test_open_science_extension_with_wcs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f200w.fits");
        write_mosaic_file(&path);

        let mosaic = Mosaic::open(&entry(&path, 1)).unwrap();
        assert_eq!(mosaic.extension, 1);
        assert_eq!(mosaic.pixels.dim(), (NY, NX));
        assert_eq!(mosaic.pixels[[2, 3]], (2 * NX + 3) as f64);

        let wcs = mosaic.wcs.as_ref().unwrap();
        let (x, y) = wcs.world_to_pixel(53.16, -27.78).unwrap();
        assert!((x - 14.0).abs() < 1e-6 && (y - 9.0).abs() < 1e-6);
        assert!(Cutout::extract(&mosaic, 53.16, -27.78, 0.3).is_ok());
    }

    #[test]
    fn test_missing_extension_falls_back_to_primary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f200w.fits");
        write_mosaic_file(&path);

        let mosaic = Mosaic::open(&entry(&path, 5)).unwrap();
        assert_eq!(mosaic.extension, 0);
        assert_eq!(mosaic.pixels.dim(), (NY, NX));
        assert!(mosaic.pixels.iter().all(|&v| v == 1.0));
        // No WCS on the primary: the image loads, its tile stays blank
        assert!(mosaic.wcs.is_none());
        assert_eq!(
            Cutout::extract(&mosaic, 53.16, -27.78, 0.3).unwrap_err(),
            CutoutError::NoWcs("NRC_F200W".to_string())
        );
    }

    #[test]
    fn test_header_only_file_is_not_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fits");
        FitsFile::create(&path).open().unwrap();

        assert!(matches!(
            Mosaic::open(&entry(&path, 0)),
            Err(MosaicError::NotAnImage { extension: 0, .. })
        ));
        assert!(matches!(
            Mosaic::open(&entry(&path, 1)),
            Err(MosaicError::NotAnImage { extension: 0, .. })
        ));
    }

    #[test]
    fn test_parse_two_and_three_columns() {
        let text = "\
# filter ext path
HST_F435W  acs_f435w.fits
NRC_F090W 2 nircam_f090w.fits

SEGMAP 0 NoImage
";
        let entries = parse_image_list(text).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].filter, "HST_F435W");
        assert_eq!(entries[0].extension, DEFAULT_EXTENSION);
        assert_eq!(
            entries[0].source,
            ImageSource::File(PathBuf::from("acs_f435w.fits"))
        );
        assert_eq!(entries[1].extension, 2);
        assert_eq!(entries[2].source, ImageSource::Placeholder);
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        assert!(matches!(
            parse_image_list("HST_F435W\n"),
            Err(MosaicError::ListSyntax { line: 1, .. })
        ));
        assert!(matches!(
            parse_image_list("HST_F435W x path.fits\n"),
            Err(MosaicError::ListSyntax { .. })
        ));
        assert!(matches!(
            parse_image_list("# nothing\n"),
            Err(MosaicError::EmptyList)
        ));
    }

    #[test]
    fn test_placeholder_opens_without_io() {
        let entry = ImageListEntry {
            filter: "NRC_F444W".to_string(),
            extension: 1,
            source: ImageSource::Placeholder,
        };
        let mosaic = Mosaic::open(&entry).unwrap();
        assert_eq!(mosaic.pixels.dim(), (0, 0));
        assert!(mosaic.wcs.is_none());
        assert!(!mosaic.is_segmentation());
    }
}
