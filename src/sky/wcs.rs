//! Celestial world coordinate system for mosaic headers.
//!
//! Only the gnomonic (TAN) projection is supported, which covers the drizzled
//! survey mosaics the viewer is pointed at. The linear part may be given as a
//! `CDi_j` matrix, as `PCi_j` + `CDELTi`, or as `CDELTi` + `CROTA2`. SIP
//! distortion terms are ignored: over a few-arcsecond cutout they are well
//! below a pixel.

use std::collections::BTreeMap;
use thiserror::Error;

/// Header keywords the WCS reader looks at.
pub const WCS_KEYWORDS: [&str; 18] = [
    "CTYPE1", "CTYPE2", "CRVAL1", "CRVAL2", "CRPIX1", "CRPIX2", "CD1_1", "CD1_2", "CD2_1",
    "CD2_2", "PC1_1", "PC1_2", "PC2_1", "PC2_2", "CDELT1", "CDELT2", "CROTA2", "EQUINOX",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WcsError {
    #[error("missing WCS keyword {0}")]
    MissingKeyword(&'static str),
    #[error("unsupported projection {0:?} (only TAN is handled)")]
    UnsupportedProjection(String),
    #[error("singular CD matrix")]
    SingularMatrix,
}

/// Read access to FITS header cards.
///
/// Implemented by [`HeaderCards`], which is what the mosaic loader fills from
/// `fitsio`; tests build one by hand.
pub trait HeaderSource {
    fn real(&self, key: &str) -> Option<f64>;
    fn text(&self, key: &str) -> Option<String>;
}

/// A header card value.
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Real(f64),
    Text(String),
}

/// Header cards keyed by keyword.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderCards {
    cards: BTreeMap<String, CardValue>,
}

impl HeaderCards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_real(&mut self, key: &str, value: f64) -> &mut Self {
        self.cards.insert(key.to_string(), CardValue::Real(value));
        self
    }

    pub fn set_text(&mut self, key: &str, value: &str) -> &mut Self {
        self.cards.insert(key.to_string(), CardValue::Text(value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl HeaderSource for HeaderCards {
    fn real(&self, key: &str) -> Option<f64> {
        match self.cards.get(key)? {
            CardValue::Real(v) => Some(*v),
            CardValue::Text(s) => s.trim().parse().ok(),
        }
    }

    fn text(&self, key: &str) -> Option<String> {
        match self.cards.get(key)? {
            CardValue::Text(s) => Some(s.trim().to_string()),
            CardValue::Real(v) => Some(v.to_string()),
        }
    }
}

/// TAN-projection world coordinate system.
///
/// `crpix` is 1-based as in the header; the public transforms use 0-based
/// pixel coordinates (the centre of the first pixel is `(0.0, 0.0)`).
#[derive(Debug, Clone, PartialEq)]
pub struct Wcs {
    /// Reference point `[RA, Dec]` in degrees.
    crval: [f64; 2],
    /// Reference pixel, 1-based.
    crpix: [f64; 2],
    /// Linear transform, degrees per pixel.
    cd: [[f64; 2]; 2],
    cd_inv: [[f64; 2]; 2],
}

impl Wcs {
    /// Build a WCS from an explicit CD matrix.
    pub fn new(crval: [f64; 2], crpix: [f64; 2], cd: [[f64; 2]; 2]) -> Result<Self, WcsError> {
        let cd_inv = cd_inverse(&cd).ok_or(WcsError::SingularMatrix)?;
        Ok(Self {
            crval,
            crpix,
            cd,
            cd_inv,
        })
    }

    /// Read the WCS from header cards.
    pub fn from_header(header: &impl HeaderSource) -> Result<Self, WcsError> {
        for key in ["CTYPE1", "CTYPE2"] {
            if let Some(ctype) = header.text(key) {
                if !ctype.ends_with("TAN") && !ctype.ends_with("TAN-SIP") {
                    return Err(WcsError::UnsupportedProjection(ctype));
                }
            }
        }

        let required = |key: &'static str| header.real(key).ok_or(WcsError::MissingKeyword(key));
        let crval = [required("CRVAL1")?, required("CRVAL2")?];
        let crpix = [required("CRPIX1")?, required("CRPIX2")?];

        let cd = if let (Some(c11), Some(c22)) = (header.real("CD1_1"), header.real("CD2_2")) {
            [
                [c11, header.real("CD1_2").unwrap_or(0.0)],
                [header.real("CD2_1").unwrap_or(0.0), c22],
            ]
        } else {
            let cdelt1 = required("CDELT1")?;
            let cdelt2 = required("CDELT2")?;
            let has_pc = ["PC1_1", "PC1_2", "PC2_1", "PC2_2"]
                .iter()
                .any(|k| header.real(k).is_some());
            if has_pc {
                [
                    [
                        cdelt1 * header.real("PC1_1").unwrap_or(1.0),
                        cdelt1 * header.real("PC1_2").unwrap_or(0.0),
                    ],
                    [
                        cdelt2 * header.real("PC2_1").unwrap_or(0.0),
                        cdelt2 * header.real("PC2_2").unwrap_or(1.0),
                    ],
                ]
            } else {
                let rho = header.real("CROTA2").unwrap_or(0.0).to_radians();
                [
                    [cdelt1 * rho.cos(), -cdelt2 * rho.sin()],
                    [cdelt1 * rho.sin(), cdelt2 * rho.cos()],
                ]
            }
        };

        Self::new(crval, crpix, cd)
    }

    /// Sky position (degrees) to 0-based pixel coordinates.
    ///
    /// Returns `None` when the position is on or behind the tangent plane.
    pub fn world_to_pixel(&self, ra: f64, dec: f64) -> Option<(f64, f64)> {
        let (xi, eta) = tan_project(
            ra.to_radians(),
            dec.to_radians(),
            self.crval[0].to_radians(),
            self.crval[1].to_radians(),
        )?;
        let (x, y) = (xi.to_degrees(), eta.to_degrees());
        let m = &self.cd_inv;
        let px = m[0][0] * x + m[0][1] * y + self.crpix[0] - 1.0;
        let py = m[1][0] * x + m[1][1] * y + self.crpix[1] - 1.0;
        Some((px, py))
    }

    /// 0-based pixel coordinates to sky position (degrees, RA in `[0, 360)`).
    pub fn pixel_to_world(&self, px: f64, py: f64) -> (f64, f64) {
        let dx = px + 1.0 - self.crpix[0];
        let dy = py + 1.0 - self.crpix[1];
        let x = self.cd[0][0] * dx + self.cd[0][1] * dy;
        let y = self.cd[1][0] * dx + self.cd[1][1] * dy;
        let (ra, dec) = inverse_tan_project(
            x.to_radians(),
            y.to_radians(),
            self.crval[0].to_radians(),
            self.crval[1].to_radians(),
        );
        (ra.to_degrees().rem_euclid(360.0), dec.to_degrees())
    }

    /// Pixel scale along each pixel axis in arcseconds.
    pub fn pixel_scale_arcsec(&self) -> (f64, f64) {
        let sx = (self.cd[0][0].powi(2) + self.cd[1][0].powi(2)).sqrt();
        let sy = (self.cd[0][1].powi(2) + self.cd[1][1].powi(2)).sqrt();
        (sx * 3600.0, sy * 3600.0)
    }

    /// The same projection for a sub-image whose pixel `(0, 0)` sits at
    /// `(x0, y0)` of this one.
    pub fn shifted(&self, x0: i64, y0: i64) -> Self {
        Self {
            crpix: [self.crpix[0] - x0 as f64, self.crpix[1] - y0 as f64],
            ..self.clone()
        }
    }

    pub fn crval(&self) -> [f64; 2] {
        self.crval
    }
}

/// Forward gnomonic projection, all angles in radians.
///
/// Returns `(ξ, η)` or `None` if the point is on or behind the tangent plane.
fn tan_project(ra: f64, dec: f64, crval_ra: f64, crval_dec: f64) -> Option<(f64, f64)> {
    let da = ra - crval_ra;
    let (sin_dec, cos_dec) = dec.sin_cos();
    let (sin_dec0, cos_dec0) = crval_dec.sin_cos();
    let cos_da = da.cos();

    let denom = sin_dec * sin_dec0 + cos_dec * cos_dec0 * cos_da;
    if denom <= 1e-12 {
        return None;
    }

    let xi = cos_dec * da.sin() / denom;
    let eta = (sin_dec * cos_dec0 - cos_dec * sin_dec0 * cos_da) / denom;
    Some((xi, eta))
}

/// Inverse gnomonic projection, all angles in radians.
fn inverse_tan_project(xi: f64, eta: f64, crval_ra: f64, crval_dec: f64) -> (f64, f64) {
    let (sin_dec0, cos_dec0) = crval_dec.sin_cos();
    let rho_sq = xi * xi + eta * eta;
    if rho_sq < 1e-30 {
        return (crval_ra, crval_dec);
    }

    let rho = rho_sq.sqrt();
    let c = rho.atan();
    let (sin_c, cos_c) = c.sin_cos();

    let dec = (cos_c * sin_dec0 + eta * sin_c * cos_dec0 / rho).asin();
    let ra = crval_ra + (xi * sin_c).atan2(rho * cos_dec0 * cos_c - eta * sin_dec0 * sin_c);
    (ra, dec)
}

/// Invert a 2×2 matrix. Returns `None` if singular.
fn cd_inverse(cd: &[[f64; 2]; 2]) -> Option<[[f64; 2]; 2]> {
    let det = cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0];
    if det.abs() < 1e-30 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [cd[1][1] * inv_det, -cd[0][1] * inv_det],
        [-cd[1][0] * inv_det, cd[0][0] * inv_det],
    ])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// 0.03"/pix north-up east-left mosaic centred on (53.16, -27.78).
    pub(crate) fn goods_south_wcs() -> Wcs {
        let scale = 0.03 / 3600.0;
        Wcs::new([53.16, -27.78], [501.0, 501.0], [[-scale, 0.0], [0.0, scale]]).unwrap()
    }

    #[test]
    fn test_reference_point_maps_to_crpix() {
        let wcs = goods_south_wcs();
        let (x, y) = wcs.world_to_pixel(53.16, -27.78).unwrap();
        assert_relative_eq!(x, 500.0, epsilon = 1e-9);
        assert_relative_eq!(y, 500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_round_trip() {
        let wcs = goods_south_wcs();
        for &(px, py) in &[(0.0, 0.0), (123.4, 876.5), (999.0, 10.0)] {
            let (ra, dec) = wcs.pixel_to_world(px, py);
            let (x, y) = wcs.world_to_pixel(ra, dec).unwrap();
            assert_relative_eq!(x, px, epsilon = 1e-6);
            assert_relative_eq!(y, py, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_east_is_left() {
        let wcs = goods_south_wcs();
        // One arcsecond east along the parallel
        let dra = 1.0 / 3600.0 / (-27.78f64).to_radians().cos();
        let (x, y) = wcs.world_to_pixel(53.16 + dra, -27.78).unwrap();
        assert_relative_eq!(x, 500.0 - 1.0 / 0.03, epsilon = 1e-3);
        assert_relative_eq!(y, 500.0, epsilon = 1e-3);
    }

    #[test]
    fn test_pixel_scale() {
        let (sx, sy) = goods_south_wcs().pixel_scale_arcsec();
        assert_relative_eq!(sx, 0.03, epsilon = 1e-12);
        assert_relative_eq!(sy, 0.03, epsilon = 1e-12);
    }

    #[test]
    fn test_shifted_keeps_sky_registration() {
        let wcs = goods_south_wcs();
        let sub = wcs.shifted(450, 460);
        let (ra, dec) = wcs.pixel_to_world(500.0, 500.0);
        let (x, y) = sub.world_to_pixel(ra, dec).unwrap();
        assert_relative_eq!(x, 50.0, epsilon = 1e-6);
        assert_relative_eq!(y, 40.0, epsilon = 1e-6);
    }

    #[test]
    fn test_header_with_cd_matrix() {
        let mut cards = HeaderCards::new();
        cards
            .set_text("CTYPE1", "RA---TAN")
            .set_text("CTYPE2", "DEC--TAN")
            .set_real("CRVAL1", 53.16)
            .set_real("CRVAL2", -27.78)
            .set_real("CRPIX1", 501.0)
            .set_real("CRPIX2", 501.0)
            .set_real("CD1_1", -0.03 / 3600.0)
            .set_real("CD2_2", 0.03 / 3600.0);
        assert_eq!(Wcs::from_header(&cards).unwrap(), goods_south_wcs());
    }

    #[test]
    fn test_header_with_pc_and_cdelt() {
        let mut cards = HeaderCards::new();
        cards
            .set_real("CRVAL1", 53.16)
            .set_real("CRVAL2", -27.78)
            .set_real("CRPIX1", 501.0)
            .set_real("CRPIX2", 501.0)
            .set_real("CDELT1", -0.03 / 3600.0)
            .set_real("CDELT2", 0.03 / 3600.0)
            .set_real("PC1_1", 1.0)
            .set_real("PC2_2", 1.0);
        let wcs = Wcs::from_header(&cards).unwrap();
        let (sx, _) = wcs.pixel_scale_arcsec();
        assert_relative_eq!(sx, 0.03, epsilon = 1e-12);
    }

    #[test]
    fn test_header_errors() {
        let mut cards = HeaderCards::new();
        cards.set_text("CTYPE1", "RA---SIN");
        assert!(matches!(
            Wcs::from_header(&cards),
            Err(WcsError::UnsupportedProjection(_))
        ));

        let cards = HeaderCards::new();
        assert_eq!(
            Wcs::from_header(&cards),
            Err(WcsError::MissingKeyword("CRVAL1"))
        );
    }

    #[test]
    fn test_behind_tangent_plane() {
        let wcs = goods_south_wcs();
        assert!(wcs.world_to_pixel(53.16 + 180.0, 27.78).is_none());
    }
}
