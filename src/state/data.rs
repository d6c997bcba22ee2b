/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the catalog loaders and the renderer / UI layer.

/// Catalog value meaning "no measurement".
pub const NO_DATA_SENTINEL: f64 = -9999.0;

/// Flux measurement of one object in one filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterPhotometry {
    pub flux: f64,
    pub flux_err: f64,
    /// flux / flux_err
    pub snr: f64,
}

impl FilterPhotometry {
    pub fn new(flux: f64, flux_err: f64) -> Self {
        Self {
            flux,
            flux_err,
            snr: flux / flux_err,
        }
    }

    /// True when the catalog flagged this filter as unmeasured for the object.
    pub fn is_no_data(&self) -> bool {
        self.flux_err <= NO_DATA_SENTINEL || self.snr <= NO_DATA_SENTINEL
    }
}

/// Represents a single object in the photometric catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogObject {
    /// Catalog ID
    pub id: i64,
    /// Right ascension in degrees
    pub ra: f64,
    /// Declination in degrees
    pub dec: f64,
    /// One entry per image filter, in image-list order.
    /// `None` when the catalog has no columns for that filter (e.g. SEGMAP).
    pub photometry: Vec<Option<FilterPhotometry>>,
}

impl CatalogObject {
    pub fn photometry_for(&self, filter_index: usize) -> Option<&FilterPhotometry> {
        self.photometry.get(filter_index).and_then(Option::as_ref)
    }
}

/// Round to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Format a number the way the labels show it: whole numbers keep one
/// decimal (`6.0`), everything else uses the shortest exact form.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
