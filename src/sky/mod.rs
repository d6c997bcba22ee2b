/// Sky geometry module
///
/// This module handles:
/// - TAN-projection world coordinates from FITS headers (wcs.rs)
/// - The per-filter science mosaics listed in the image list (mosaic.rs)
/// - WCS-registered cutouts around a catalog position (cutout.rs)

pub mod wcs;
pub mod mosaic;
pub mod cutout;
