//! Sky-registered cutouts from a mosaic.

use ndarray::Array2;
use thiserror::Error;

use super::mosaic::Mosaic;
use super::wcs::Wcs;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CutoutError {
    #[error("{0} has no celestial WCS")]
    NoWcs(String),
    #[error("position is behind the tangent plane of {0}")]
    BehindProjection(String),
    #[error("cutout does not overlap {0}")]
    NoOverlap(String),
    #[error("invalid cutout size {0} arcsec")]
    InvalidSize(f64),
}

/// How much of the requested window lies on the parent image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    Full,
    Partial,
}

/// A pixel window around a sky position.
///
/// Pixels outside the parent image are NaN, so the object always sits at the
/// same place in the window regardless of how close it is to an edge.
#[derive(Debug, Clone)]
pub struct Cutout {
    /// Indexed `[y, x]`, row 0 at the bottom.
    pub data: Array2<f64>,
    /// WCS of the window itself.
    pub wcs: Wcs,
    /// Parent pixel of the window's `(0, 0)`.
    pub origin: (i64, i64),
    pub overlap: Overlap,
}

impl Cutout {
    /// Extract a square window `size_arcsec` on a side centred on `(ra, dec)`.
    pub fn extract(mosaic: &Mosaic, ra: f64, dec: f64, size_arcsec: f64) -> Result<Self, CutoutError> {
        if !(size_arcsec.is_finite() && size_arcsec > 0.0) {
            return Err(CutoutError::InvalidSize(size_arcsec));
        }
        let wcs = mosaic
            .wcs
            .as_ref()
            .ok_or_else(|| CutoutError::NoWcs(mosaic.filter.clone()))?;
        let (x, y) = wcs
            .world_to_pixel(ra, dec)
            .ok_or_else(|| CutoutError::BehindProjection(mosaic.filter.clone()))?;

        let (scale_x, scale_y) = wcs.pixel_scale_arcsec();
        let nx = window_pixels(size_arcsec, scale_x);
        let ny = window_pixels(size_arcsec, scale_y);

        // A window wider than the whole mosaic has nothing more to show
        let (height, width) = mosaic.pixels.dim();
        if nx > width || ny > height {
            return Err(CutoutError::InvalidSize(size_arcsec));
        }

        let x0 = window_start(x, nx);
        let y0 = window_start(y, ny);
        let (height, width) = (height as i64, width as i64);

        let mut data = Array2::from_elem((ny, nx), f64::NAN);
        let mut covered = 0usize;
        for row in 0..ny {
            let py = y0 + row as i64;
            if py < 0 || py >= height {
                continue;
            }
            for col in 0..nx {
                let px = x0 + col as i64;
                if px < 0 || px >= width {
                    continue;
                }
                data[[row, col]] = mosaic.pixels[[py as usize, px as usize]];
                covered += 1;
            }
        }

        if covered == 0 {
            return Err(CutoutError::NoOverlap(mosaic.filter.clone()));
        }
        let overlap = if covered == nx * ny {
            Overlap::Full
        } else {
            Overlap::Partial
        };

        Ok(Self {
            data,
            wcs: wcs.shifted(x0, y0),
            origin: (x0, y0),
            overlap,
        })
    }
}

/// Pixels spanned by `size_arcsec` at `scale_arcsec` per pixel, at least one.
fn window_pixels(size_arcsec: f64, scale_arcsec: f64) -> usize {
    let n = (size_arcsec / scale_arcsec).round();
    if n.is_finite() && n >= 1.0 {
        n as usize
    } else {
        1
    }
}

/// First pixel of an `n`-pixel window centred on `pos`.
fn window_start(pos: f64, n: usize) -> i64 {
    (pos - n as f64 / 2.0).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sky::wcs::tests::goods_south_wcs;

    fn ramp_mosaic() -> Mosaic {
        Mosaic {
            filter: "NRC_F200W".to_string(),
            extension: 1,
            pixels: Array2::from_shape_fn((1000, 1000), |(y, x)| (y * 1000 + x) as f64),
            wcs: Some(goods_south_wcs()),
        }
    }

    #[test]
    fn test_window_math() {
        assert_eq!(window_pixels(2.0, 0.03), 67);
        assert_eq!(window_pixels(0.001, 0.03), 1);
        assert_eq!(window_start(500.0, 67), 467);
        assert_eq!(window_start(500.0, 66), 467);
    }

    #[test]
    fn test_centred_cutout() {
        let mosaic = ramp_mosaic();
        let cutout = Cutout::extract(&mosaic, 53.16, -27.78, 2.0).unwrap();
        assert_eq!(cutout.data.dim(), (67, 67));
        assert_eq!(cutout.overlap, Overlap::Full);
        assert_eq!(cutout.origin, (467, 467));
        // Object pixel (500, 500) lands in the middle of the window
        assert_eq!(cutout.data[[33, 33]], (500 * 1000 + 500) as f64);

        let (x, y) = cutout.wcs.world_to_pixel(53.16, -27.78).unwrap();
        assert!((x - 33.0).abs() < 1e-6 && (y - 33.0).abs() < 1e-6);
    }

    #[test]
    fn test_edge_cutout_is_nan_padded() {
        let mosaic = ramp_mosaic();
        let wcs = mosaic.wcs.clone().unwrap();
        let (ra, dec) = wcs.pixel_to_world(2.0, 500.0);
        let cutout = Cutout::extract(&mosaic, ra, dec, 2.0).unwrap();
        assert_eq!(cutout.overlap, Overlap::Partial);
        assert_eq!(cutout.data.dim(), (67, 67));
        assert!(cutout.data[[33, 0]].is_nan());
        assert_eq!(cutout.data[[33, 33]], (500 * 1000 + 2) as f64);
    }

    #[test]
    fn test_failures() {
        let mosaic = ramp_mosaic();
        let wcs = mosaic.wcs.clone().unwrap();
        let (ra, dec) = wcs.pixel_to_world(5000.0, 5000.0);
        assert_eq!(
            Cutout::extract(&mosaic, ra, dec, 2.0).unwrap_err(),
            CutoutError::NoOverlap("NRC_F200W".to_string())
        );
        assert_eq!(
            Cutout::extract(&mosaic, 53.16, -27.78, 0.0).unwrap_err(),
            CutoutError::InvalidSize(0.0)
        );
        assert_eq!(
            Cutout::extract(&mosaic, 53.16, -27.78, 1e9).unwrap_err(),
            CutoutError::InvalidSize(1e9)
        );
        // 31" is 1033 pixels, just over the 1000-pixel mosaic
        assert_eq!(
            Cutout::extract(&mosaic, 53.16, -27.78, 31.0).unwrap_err(),
            CutoutError::InvalidSize(31.0)
        );
        assert!(Cutout::extract(&mosaic, 53.16, -27.78, 29.0).is_ok());
        let placeholder = Mosaic::placeholder("NRC_F444W");
        assert!(matches!(
            Cutout::extract(&placeholder, 53.16, -27.78, 2.0),
            Err(CutoutError::NoWcs(_))
        ));
    }
}
