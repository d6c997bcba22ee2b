/// Thumbnail grid canvas
/// Draws the rendered tiles with their shadowed filter and SNR labels
use iced::alignment::{Horizontal, Vertical};
use iced::widget::canvas::{self, Text};
use iced::{font, Color, Font, Pixels, Point, Rectangle, Vector};

use crate::render::thumbnail::ThumbnailLabels;
use crate::render::ThumbnailSet;
use crate::Message;

/// Space kept below the last tile row, on the reference canvas.
const BOTTOM_MARGIN: f32 = 20.0;

const LABEL_FONT: Font = Font {
    weight: font::Weight::Bold,
    ..Font::DEFAULT
};

/// Canvas program over one object's thumbnails.
pub struct ThumbnailGrid<'a> {
    pub set: &'a ThumbnailSet,
    pub cache: &'a canvas::Cache,
}

impl ThumbnailGrid<'_> {
    /// Height the canvas needs: from the first tile row to below the last.
    pub fn height(set: &ThumbnailSet) -> f32 {
        let extent = set.layout.extent();
        extent.height + BOTTOM_MARGIN * set.layout.scale
    }
}

impl canvas::Program<Message> for ThumbnailGrid<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &iced::Renderer,
        _theme: &iced::Theme,
        bounds: Rectangle,
        _cursor: iced::mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let geometry = self.cache.draw(renderer, bounds.size(), |frame| {
            frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::WHITE);

            // Tiles carry canvas coordinates; the grid starts at its top row
            let extent = self.set.layout.extent();
            frame.translate(Vector::new(0.0, -extent.y));

            let size = Pixels(self.set.layout.font_size);
            for thumbnail in self.set.thumbnails() {
                frame.draw_image(
                    thumbnail.bounds,
                    canvas::Image::new(thumbnail.handle.clone()),
                );

                let tile = thumbnail.bounds;
                let labels = &thumbnail.labels;
                for (shadow, color) in [(true, Color::BLACK), (false, Color::WHITE)] {
                    frame.fill_text(Text {
                        content: labels.title.clone(),
                        position: ThumbnailLabels::title_anchor(tile, shadow),
                        color,
                        size,
                        font: LABEL_FONT,
                        horizontal_alignment: Horizontal::Center,
                        vertical_alignment: Vertical::Top,
                        ..Text::default()
                    });
                    if let Some(snr) = &labels.snr {
                        frame.fill_text(Text {
                            content: snr.clone(),
                            position: ThumbnailLabels::snr_anchor(tile, shadow),
                            color,
                            size,
                            font: LABEL_FONT,
                            horizontal_alignment: Horizontal::Right,
                            vertical_alignment: Vertical::Bottom,
                            ..Text::default()
                        });
                    }
                }
            }
        });
        vec![geometry]
    }
}
