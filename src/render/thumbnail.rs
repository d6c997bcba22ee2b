/// Per-filter thumbnail rasters and their annotations
use iced::widget::image::Handle;
use iced::{Point, Rectangle};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use ndarray::ArrayView2;

use super::interval::Interval;
use super::stretch::StretchMode;
use crate::sky::mosaic::SEGMENTATION_FILTER;
use crate::state::data::{format_number, round_to, FilterPhotometry};

/// SNR below which the label stops printing the value.
const SNR_FLOOR: f64 = -100.0;

/// Crosshair tick spans, as fractions of the tile edge.
const TICK_SPANS: [(f32, f32); 2] = [(0.20, 0.35), (0.65, 0.80)];

/// Crosshair line width on the reference canvas.
const TICK_WIDTH: f32 = 2.0;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// How a tile's pixel values were mapped to grey levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// ZScale interval followed by the active stretch.
    ZScale(Interval),
    /// Plain min/max, after the ZScale fit gave up.
    MinMax(Interval),
    /// Discrete label colours, no interval.
    Segmentation,
    /// No pixels to show.
    Blank,
}

/// Text drawn over a tile.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailLabels {
    /// Filter name shown at the top.
    pub title: String,
    /// Bottom-right SNR text, absent when the filter has no photometry.
    pub snr: Option<String>,
}

impl ThumbnailLabels {
    pub fn new(filter: &str, photometry: Option<&FilterPhotometry>) -> Self {
        let snr = if filter == SEGMENTATION_FILTER {
            None
        } else {
            photometry.map(|p| snr_text(p.snr))
        };
        Self {
            title: title_for(filter),
            snr,
        }
    }

    /// Anchor of the title text inside `tile`: horizontally centred, top aligned.
    /// The shadow copy sits one percent up and to the right.
    pub fn title_anchor(tile: Rectangle, shadow: bool) -> Point {
        let (fx, fy) = if shadow { (0.51, 0.96) } else { (0.50, 0.95) };
        fraction_point(tile, fx, fy)
    }

    /// Anchor of the SNR text inside `tile`: right aligned, bottom aligned.
    pub fn snr_anchor(tile: Rectangle, shadow: bool) -> Point {
        let (fx, fy) = if shadow { (0.96, 0.06) } else { (0.95, 0.05) };
        fraction_point(tile, fx, fy)
    }

    pub fn count(&self) -> usize {
        1 + usize::from(self.snr.is_some())
    }
}

/// Point at axes fraction `(fx, fy)` of `tile`, with `fy` measured from the bottom.
fn fraction_point(tile: Rectangle, fx: f32, fy: f32) -> Point {
    Point::new(tile.x + fx * tile.width, tile.y + (1.0 - fy) * tile.height)
}

/// Label text for a filter: the band after the instrument prefix
/// (`NRC_F200W` -> `F200W`), or the whole name for the segmentation map.
pub fn title_for(filter: &str) -> String {
    if filter == SEGMENTATION_FILTER {
        return filter.to_string();
    }
    match filter.split_once('_') {
        Some((_, rest)) => rest.split('_').next().unwrap_or(rest).to_string(),
        None => filter.to_string(),
    }
}

pub fn snr_text(snr: f64) -> String {
    if snr > SNR_FLOOR {
        format!("SNR = {}", format_number(round_to(snr, 2)))
    } else {
        "SNR < -100".to_string()
    }
}

/// One rendered tile.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub filter: String,
    /// Tile raster, already at tile size with the crosshair burned in.
    pub raster: RgbaImage,
    pub handle: Handle,
    /// Where the tile sits on the canvas.
    pub bounds: Rectangle,
    pub labels: ThumbnailLabels,
    pub normalization: Normalization,
}

impl Thumbnail {
    pub fn new(
        filter: &str,
        raster: RgbaImage,
        bounds: Rectangle,
        labels: ThumbnailLabels,
        normalization: Normalization,
    ) -> Self {
        let handle = Handle::from_rgba(raster.width(), raster.height(), raster.as_raw().clone());
        Self {
            filter: filter.to_string(),
            raster,
            handle,
            bounds,
            labels,
            normalization,
        }
    }
}

/// Grey-level raster of `data` (FITS order, row 0 at the bottom).
///
/// Non-finite pixels come out fully transparent.
pub fn grey_raster(data: ArrayView2<f64>, interval: &Interval, stretch: StretchMode) -> RgbaImage {
    let (ny, nx) = data.dim();
    RgbaImage::from_fn(nx as u32, ny as u32, |x, y| {
        let value = data[[ny - 1 - y as usize, x as usize]];
        if !value.is_finite() {
            return Rgba([0, 0, 0, 0]);
        }
        let level = (stretch.apply(interval.normalize(value)) * 255.0).round() as u8;
        Rgba([level, level, level, 255])
    })
}

/// Colour raster of a segmentation map: background black, each source label
/// a fixed colour.
pub fn segmentation_raster(data: ArrayView2<f64>) -> RgbaImage {
    let (ny, nx) = data.dim();
    RgbaImage::from_fn(nx as u32, ny as u32, |x, y| {
        let value = data[[ny - 1 - y as usize, x as usize]];
        if !value.is_finite() {
            return Rgba([0, 0, 0, 0]);
        }
        label_colour(value.round() as i64)
    })
}

fn label_colour(label: i64) -> Rgba<u8> {
    if label <= 0 {
        return Rgba([0, 0, 0, 255]);
    }
    // Golden-ratio hue walk keeps neighbouring labels apart
    let hue = (label as f64 * 0.618_033_988_75).fract() * 6.0;
    let sector = hue.floor() as u8;
    let f = hue.fract();
    let (v, p, q, t) = (1.0, 0.25, 1.0 - 0.75 * f, 0.25 + 0.75 * f);
    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let to_u8 = |c: f64| (c * 255.0).round() as u8;
    Rgba([to_u8(r), to_u8(g), to_u8(b), 255])
}

/// Scale a cutout raster to a square tile `edge` pixels wide.
///
/// Nearest-neighbour keeps individual detector pixels visible. An empty
/// raster becomes a transparent tile.
pub fn fit_to_tile(raster: &RgbaImage, edge: u32) -> RgbaImage {
    let edge = edge.max(1);
    if raster.width() == 0 || raster.height() == 0 {
        return RgbaImage::new(edge, edge);
    }
    imageops::resize(raster, edge, edge, FilterType::Nearest)
}

/// Burn the four crosshair ticks into a tile, leaving the centre open.
pub fn draw_crosshair(tile: &mut RgbaImage, scale: f32) {
    let edge = tile.width().min(tile.height()) as f32;
    let width = (TICK_WIDTH * scale).round().max(1.0) as u32;
    let centre = (edge / 2.0 - width as f32 / 2.0).round() as i32;

    for (start, end) in TICK_SPANS {
        let from = (start * edge).round() as i32;
        let length = ((end - start) * edge).round().max(1.0) as u32;
        // vertical tick
        draw_filled_rect_mut(tile, Rect::at(centre, from).of_size(width, length), WHITE);
        // horizontal tick
        draw_filled_rect_mut(tile, Rect::at(from, centre).of_size(length, width), WHITE);
    }
}
