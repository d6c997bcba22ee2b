/// Thumbnail grid geometry
///
/// Positions are in canvas pixels for a canvas `canvaswidth` wide; every
/// constant below is for the reference 2000 px canvas and is multiplied by the
/// scale factor `canvaswidth / 2000`.
use iced::{Point, Rectangle, Size};

/// Width of the canvas the geometry constants are written for.
pub const REFERENCE_WIDTH: f32 = 2000.0;

/// Canvas width / height.
pub const CANVAS_ASPECT: f32 = 1.8;

/// Left edge of the first column.
const ORIGIN_X: f32 = 20.0;

/// Most thumbnails that still get the large tiles and font.
const LARGE_TILE_LIMIT: usize = 18;

/// Geometry of one layout tier, in reference pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TierGeometry {
    per_row: usize,
    pitch: f32,
    tile: f32,
    font: f32,
    rows: &'static [f32],
}

const TIER_SMALL: TierGeometry = TierGeometry {
    per_row: 6,
    pitch: 175.0,
    tile: 150.0,
    font: 15.0,
    rows: &[500.0, 675.0, 850.0],
};

const TIER_MEDIUM: TierGeometry = TierGeometry {
    per_row: 8,
    pitch: 130.0,
    tile: 120.0,
    font: 12.0,
    rows: &[500.0, 675.0, 850.0],
};

const TIER_LARGE: TierGeometry = TierGeometry {
    per_row: 8,
    pitch: 130.0,
    tile: 120.0,
    font: 12.0,
    rows: &[500.0, 625.0, 750.0, 875.0],
};

/// Which tier a filter count falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Up to 18 thumbnails.
    Small,
    /// 19 to 24 thumbnails.
    Medium,
    /// 25 or more thumbnails.
    Large,
}

impl Tier {
    pub fn for_count(count: usize) -> Self {
        match count {
            0..=18 => Tier::Small,
            19..=24 => Tier::Medium,
            _ => Tier::Large,
        }
    }

    fn geometry(self) -> TierGeometry {
        match self {
            Tier::Small => TIER_SMALL,
            Tier::Medium => TIER_MEDIUM,
            Tier::Large => TIER_LARGE,
        }
    }
}

/// Canvas scale factor for a given canvas width.
pub fn scale_factor(canvas_width: f32) -> f32 {
    canvas_width / REFERENCE_WIDTH
}

/// Full canvas size for a given canvas width.
pub fn canvas_size(canvas_width: f32) -> Size {
    Size::new(canvas_width, canvas_width / CANVAS_ASPECT)
}

/// Where each thumbnail goes for one filter count and canvas width.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub tier: Tier,
    pub scale: f32,
    /// Tile edge in canvas pixels.
    pub tile_size: f32,
    /// Label font size in canvas pixels.
    pub font_size: f32,
    tiles: Vec<Rectangle>,
}

impl GridLayout {
    pub fn new(count: usize, canvas_width: f32) -> Self {
        let tier = Tier::for_count(count);
        let geometry = tier.geometry();
        let scale = scale_factor(canvas_width);

        let tiles = (0..count)
            .map(|i| {
                let row = i / geometry.per_row;
                let col = i % geometry.per_row;
                let x = ORIGIN_X + geometry.pitch * col as f32;
                let y = row_y(&geometry, row);
                Rectangle::new(
                    Point::new(x * scale, y * scale),
                    Size::new(geometry.tile * scale, geometry.tile * scale),
                )
            })
            .collect();

        let font = if count <= LARGE_TILE_LIMIT {
            TIER_SMALL.font
        } else {
            geometry.font
        };

        Self {
            tier,
            scale,
            tile_size: geometry.tile * scale,
            font_size: (font * scale).floor().max(1.0),
            tiles,
        }
    }

    /// Tile rectangle for slot `index`, in canvas coordinates.
    pub fn tile(&self, index: usize) -> Option<Rectangle> {
        self.tiles.get(index).copied()
    }

    pub fn tiles(&self) -> &[Rectangle] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Smallest rectangle containing every tile.
    pub fn extent(&self) -> Rectangle {
        let mut tiles = self.tiles.iter();
        let Some(first) = tiles.next() else {
            return Rectangle::new(Point::ORIGIN, Size::ZERO);
        };
        tiles.fold(*first, |acc, tile| acc.union(tile))
    }
}

/// Top edge of `row`, continuing the last row spacing past the table.
fn row_y(geometry: &TierGeometry, row: usize) -> f32 {
    let rows = geometry.rows;
    if let Some(&y) = rows.get(row) {
        return y;
    }
    let n = rows.len();
    let last = rows[n - 1];
    let spacing = if n >= 2 { last - rows[n - 2] } else { geometry.pitch };
    last + spacing * (row + 1 - n) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_no_overlap(layout: &GridLayout) {
        for (i, a) in layout.tiles().iter().enumerate() {
            for b in &layout.tiles()[i + 1..] {
                let disjoint = a.x + a.width <= b.x
                    || b.x + b.width <= a.x
                    || a.y + a.height <= b.y
                    || b.y + b.height <= a.y;
                assert!(disjoint, "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_tier_selection() {
        assert_eq!(Tier::for_count(6), Tier::Small);
        assert_eq!(Tier::for_count(18), Tier::Small);
        assert_eq!(Tier::for_count(19), Tier::Medium);
        assert_eq!(Tier::for_count(20), Tier::Medium);
        assert_eq!(Tier::for_count(25), Tier::Large);
        assert_eq!(Tier::for_count(30), Tier::Large);
        assert_eq!(Tier::for_count(40), Tier::Large);
    }

    #[test]
    fn test_small_tier_positions() {
        let layout = GridLayout::new(14, 2000.0);
        assert_eq!(layout.tier, Tier::Small);
        assert_eq!(layout.tile(0).unwrap().position(), Point::new(20.0, 500.0));
        assert_eq!(layout.tile(5).unwrap().position(), Point::new(895.0, 500.0));
        assert_eq!(layout.tile(6).unwrap().position(), Point::new(20.0, 675.0));
        assert_eq!(layout.tile(13).unwrap().position(), Point::new(195.0, 850.0));
        assert_relative_eq!(layout.tile_size, 150.0);
        assert_relative_eq!(layout.font_size, 15.0);
        assert!(layout.tile(14).is_none());
    }

    #[test]
    fn test_medium_and_large_tiers() {
        let medium = GridLayout::new(20, 2000.0);
        assert_eq!(medium.tile(8).unwrap().position(), Point::new(20.0, 675.0));
        assert_eq!(medium.tile(19).unwrap().position(), Point::new(20.0 + 130.0 * 3.0, 850.0));
        assert_relative_eq!(medium.font_size, 12.0);

        let large = GridLayout::new(30, 2000.0);
        assert_eq!(large.tile(8).unwrap().position(), Point::new(20.0, 625.0));
        assert_eq!(large.tile(24).unwrap().position(), Point::new(20.0, 875.0));
        assert_relative_eq!(large.tile_size, 120.0);
    }

    #[test]
    fn test_scaled_canvas() {
        let layout = GridLayout::new(6, 1000.0);
        assert_relative_eq!(layout.scale, 0.5);
        assert_eq!(layout.tile(1).unwrap().position(), Point::new(97.5, 250.0));
        assert_relative_eq!(layout.tile_size, 75.0);
        assert_relative_eq!(layout.font_size, 7.0);
        assert_relative_eq!(canvas_size(1800.0).height, 1000.0);
    }

    #[test]
    fn test_no_overlap_in_any_tier() {
        for count in [1, 6, 18, 19, 20, 24, 25, 30, 32, 40] {
            assert_no_overlap(&GridLayout::new(count, 2000.0));
        }
    }

    #[test]
    fn test_rows_continue_past_table() {
        let layout = GridLayout::new(40, 2000.0);
        assert_eq!(layout.tile(32).unwrap().position(), Point::new(20.0, 1000.0));
        assert_eq!(layout.extent().y, 500.0);
    }
}
