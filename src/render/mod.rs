/// Cutout and thumbnail rendering
///
/// This module turns one catalog object into a grid of annotated
/// per-filter thumbnails:
/// - ZScale display interval (interval.rs)
/// - Linear / log / asinh stretches (stretch.rs)
/// - Tile rasters, labels and crosshair (thumbnail.rs)
/// - Table-driven grid geometry (layout.rs)
/// - "Save Canvas" PNG snapshots (sheet.rs)

pub mod interval;
pub mod layout;
pub mod sheet;
pub mod stretch;
pub mod thumbnail;

use std::time::Instant;

use image::RgbaImage;
use log::{debug, warn};
use thiserror::Error;

use crate::sky::cutout::Cutout;
use crate::sky::mosaic::{Mosaic, MosaicSet};
use crate::state::data::{CatalogObject, FilterPhotometry};
use interval::{min_max, ZScale};
use layout::GridLayout;
use stretch::StretchMode;
use thumbnail::{Normalization, Thumbnail, ThumbnailLabels};

/// Log target for per-step timings (`-tverb`).
pub const TIMING_TARGET: &str = "timing";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cutout has no finite pixels")]
    NoFiniteData,
    #[error("degenerate display interval [{vmin}, {vmax}]")]
    DegenerateInterval { vmin: f64, vmax: f64 },
    #[error("snapshot buffer is {len} bytes, expected {width}x{height} RGBA")]
    SnapshotSize { len: usize, width: u32, height: u32 },
    #[error("failed to write snapshot: {0}")]
    Encode(#[from] image::ImageError),
}

/// Display settings that shape every tile but are not per-object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub canvas_width: f32,
    pub crosshair: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            canvas_width: layout::REFERENCE_WIDTH,
            crosshair: false,
        }
    }
}

/// Every tile for one object, in filter order.
///
/// Owns the image handles; the UI keeps the whole set alive while it is on
/// screen and swaps it out in one piece.
#[derive(Debug, Clone)]
pub struct ThumbnailSet {
    pub object_id: i64,
    pub stretch: StretchMode,
    pub angular_size: f64,
    pub layout: GridLayout,
    /// One slot per filter; `None` where the catalog has no data.
    pub slots: Vec<Option<Thumbnail>>,
}

impl ThumbnailSet {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Tiles actually drawn.
    pub fn thumbnails(&self) -> impl Iterator<Item = &Thumbnail> {
        self.slots.iter().flatten()
    }
}

/// Render the thumbnail grid for `object`.
///
/// Failures are isolated per filter: a bad cutout or interval degrades that
/// tile and is logged, the rest of the grid is unaffected.
pub fn render_thumbnails(
    object: &CatalogObject,
    angular_size: f64,
    stretch: StretchMode,
    mosaics: &MosaicSet,
    options: &RenderOptions,
) -> ThumbnailSet {
    let start = Instant::now();
    let layout = GridLayout::new(mosaics.len(), options.canvas_width);

    let slots = mosaics
        .iter()
        .enumerate()
        .map(|(index, mosaic)| {
            let photometry = object.photometry_for(index);
            if photometry.is_some_and(FilterPhotometry::is_no_data) {
                return None;
            }
            let bounds = layout.tile(index)?;
            let tile_start = Instant::now();
            let thumbnail = render_tile(
                object,
                mosaic,
                photometry,
                angular_size,
                stretch,
                bounds,
                &layout,
                options,
            );
            debug!(
                target: TIMING_TARGET,
                "       Plotting thumbnail {}: {:?}",
                mosaic.filter,
                tile_start.elapsed()
            );
            Some(thumbnail)
        })
        .collect();

    debug!(
        target: TIMING_TARGET,
        "Creating the thumbnails for {}: {:?}",
        object.id,
        start.elapsed()
    );

    ThumbnailSet {
        object_id: object.id,
        stretch,
        angular_size,
        layout,
        slots,
    }
}

#[allow(clippy::too_many_arguments)]
fn render_tile(
    object: &CatalogObject,
    mosaic: &Mosaic,
    photometry: Option<&FilterPhotometry>,
    angular_size: f64,
    stretch: StretchMode,
    bounds: iced::Rectangle,
    layout: &GridLayout,
    options: &RenderOptions,
) -> Thumbnail {
    let cutout = match Cutout::extract(mosaic, object.ra, object.dec, angular_size) {
        Ok(cutout) => Some(cutout),
        Err(e) => {
            if mosaic.pixels.is_empty() {
                debug!("{} has no image, leaving tile blank", mosaic.filter);
            } else {
                warn!("⚠️  Object {}: {}", object.id, e);
            }
            None
        }
    };

    let (raster, normalization) = match &cutout {
        None => (RgbaImage::new(0, 0), Normalization::Blank),
        Some(cutout) if mosaic.is_segmentation() => (
            thumbnail::segmentation_raster(cutout.data.view()),
            Normalization::Segmentation,
        ),
        Some(cutout) => {
            let data = cutout.data.view();
            match ZScale::default().limits(data) {
                Ok(interval) => (
                    thumbnail::grey_raster(data, &interval, stretch),
                    Normalization::ZScale(interval),
                ),
                Err(e) => {
                    warn!(
                        "⚠️  Object {} {}: {}, showing raw min/max",
                        object.id, mosaic.filter, e
                    );
                    let interval = min_max(data);
                    (
                        thumbnail::grey_raster(data, &interval, StretchMode::Linear),
                        Normalization::MinMax(interval),
                    )
                }
            }
        }
    };

    let mut tile = thumbnail::fit_to_tile(&raster, layout.tile_size.round() as u32);
    if options.crosshair {
        thumbnail::draw_crosshair(&mut tile, layout.scale);
    }

    Thumbnail::new(
        &mosaic.filter,
        tile,
        bounds,
        ThumbnailLabels::new(&mosaic.filter, photometry),
        normalization,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sky::wcs::tests::goods_south_wcs;
    use crate::state::data::NO_DATA_SENTINEL;
    use ndarray::Array2;

    fn science(filter: &str) -> Mosaic {
        Mosaic {
            filter: filter.to_string(),
            extension: 1,
            pixels: Array2::from_shape_fn((1000, 1000), |(y, x)| {
                ((x * 31 + y * 17) % 23) as f64 + if (x, y) == (500, 500) { 500.0 } else { 0.0 }
            }),
            wcs: Some(goods_south_wcs()),
        }
    }

    fn segmap() -> Mosaic {
        Mosaic {
            filter: "SEGMAP".to_string(),
            extension: 0,
            pixels: Array2::from_shape_fn((1000, 1000), |(y, x)| {
                if (x as i64 - 500).abs() < 5 && (y as i64 - 500).abs() < 5 {
                    42.0
                } else {
                    0.0
                }
            }),
            wcs: Some(goods_south_wcs()),
        }
    }

    fn fixture() -> (CatalogObject, MosaicSet) {
        let mosaics = MosaicSet::new(vec![
            science("HST_F606W"),
            science("NRC_F200W"),
            Mosaic::placeholder("NRC_F444W"),
            segmap(),
        ]);
        let object = CatalogObject {
            id: 1234,
            ra: 53.16,
            dec: -27.78,
            photometry: vec![
                Some(FilterPhotometry::new(10.0, NO_DATA_SENTINEL)),
                Some(FilterPhotometry::new(25.0, 2.0)),
                Some(FilterPhotometry::new(-300.0, 1.0)),
                None,
            ],
        };
        (object, mosaics)
    }

    #[test]
    fn test_one_slot_per_filter() {
        let (object, mosaics) = fixture();
        let set = render_thumbnails(&object, 2.0, StretchMode::Linear, &mosaics, &RenderOptions::default());
        assert_eq!(set.len(), 4);
        assert_eq!(set.object_id, 1234);

        // Sentinel flux error: empty cell, position preserved
        assert!(set.slots[0].is_none());

        let f200w = set.slots[1].as_ref().unwrap();
        assert_eq!(f200w.labels.title, "F200W");
        assert_eq!(f200w.labels.snr.as_deref(), Some("SNR = 12.5"));
        assert!(matches!(f200w.normalization, Normalization::ZScale(_)));
        assert_eq!(f200w.bounds, set.layout.tile(1).unwrap());
        assert_eq!(f200w.raster.width(), 150);

        let f444w = set.slots[2].as_ref().unwrap();
        assert_eq!(f444w.normalization, Normalization::Blank);
        assert_eq!(f444w.labels.snr.as_deref(), Some("SNR < -100"));

        let seg = set.slots[3].as_ref().unwrap();
        assert_eq!(seg.normalization, Normalization::Segmentation);
        assert_eq!(seg.labels.title, "SEGMAP");
        assert_eq!(seg.labels.snr, None);
    }

    #[test]
    fn test_oversized_window_leaves_tiles_blank() {
        let (object, mosaics) = fixture();
        let set = render_thumbnails(&object, 1e9, StretchMode::Linear, &mosaics, &RenderOptions::default());
        assert_eq!(set.len(), 4);
        assert!(set.slots[0].is_none());
        for slot in [1, 3] {
            let thumbnail = set.slots[slot].as_ref().unwrap();
            assert_eq!(thumbnail.normalization, Normalization::Blank);
        }
    }

    #[test]
    fn test_stretch_changes_pixels_not_layout() {
        let (object, mosaics) = fixture();
        let options = RenderOptions::default();
        let linear = render_thumbnails(&object, 2.0, StretchMode::Linear, &mosaics, &options);
        for mode in [StretchMode::Log, StretchMode::Asinh] {
            let other = render_thumbnails(&object, 2.0, mode, &mosaics, &options);
            assert_eq!(other.len(), linear.len());
            let labels = |s: &ThumbnailSet| s.thumbnails().map(|t| t.labels.count()).sum::<usize>();
            assert_eq!(labels(&other), labels(&linear));
            for (a, b) in linear.slots.iter().zip(&other.slots) {
                assert_eq!(a.is_some(), b.is_some());
                if let (Some(a), Some(b)) = (a, b) {
                    assert_eq!(a.bounds, b.bounds);
                }
            }
            assert_ne!(
                linear.slots[1].as_ref().unwrap().raster,
                other.slots[1].as_ref().unwrap().raster
            );
        }
    }

    #[test]
    fn test_crosshair_and_size_change() {
        let (object, mosaics) = fixture();
        let plain = render_thumbnails(&object, 2.0, StretchMode::Linear, &mosaics, &RenderOptions::default());
        let options = RenderOptions {
            crosshair: true,
            ..RenderOptions::default()
        };
        let marked = render_thumbnails(&object, 4.0, StretchMode::Linear, &mosaics, &options);
        assert_eq!(marked.len(), plain.len());
        let blank = marked.slots[2].as_ref().unwrap();
        assert_eq!(blank.raster.get_pixel(75, 40)[3], 255);
        assert_eq!(blank.raster.get_pixel(75, 75)[3], 0);
        assert_eq!(marked.angular_size, 4.0);
    }

    #[test]
    fn test_object_off_every_image() {
        let (mut object, mosaics) = fixture();
        object.ra = 10.0;
        object.dec = 10.0;
        let set = render_thumbnails(&object, 2.0, StretchMode::Linear, &mosaics, &RenderOptions::default());
        assert_eq!(set.len(), 4);
        assert!(set
            .thumbnails()
            .all(|t| t.normalization == Normalization::Blank));
    }
}
