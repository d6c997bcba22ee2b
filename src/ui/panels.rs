/// SED plot panels and the redshift summary text
use iced::widget::{column, container, image, text, Column};
use iced::{Color, Element, Length};

use crate::remote::{SedKind, SedPanel};
use crate::state::results::{Side, SummaryLine, Tone};
use crate::Message;

/// Where one SED panel is in its fetch.
#[derive(Debug, Clone)]
pub enum PanelState {
    /// No plot directory configured.
    Disabled,
    Loading,
    Ready(SedPanel),
    Failed(String),
}

impl PanelState {
    pub fn new(configured: bool) -> Self {
        if configured {
            PanelState::Loading
        } else {
            PanelState::Disabled
        }
    }
}

pub fn tone_colour(tone: Tone) -> Color {
    match tone {
        Tone::Eazy => Color::from_rgb8(0x13, 0x3e, 0x7c),
        Tone::Beagle => Color::from_rgb8(0x71, 0x1c, 0x91),
        Tone::Estimate => Color::from_rgb8(0x09, 0x18, 0x33),
        Tone::Muted => Color::from_rgb8(0x80, 0x80, 0x80),
        Tone::Spectroscopic => Color::from_rgb8(0xd0, 0x00, 0x00),
        Tone::Plain => Color::BLACK,
    }
}

/// One SED panel, or a short message in its place.
pub fn sed_panel<'a>(kind: SedKind, state: &'a PanelState, width: f32) -> Element<'a, Message> {
    let content: Element<'a, Message> = match state {
        PanelState::Ready(panel) => image(panel.handle.clone())
            .width(Length::Fixed(panel.width as f32))
            .height(Length::Fixed(panel.height as f32))
            .into(),
        PanelState::Loading => text(format!("Loading {} plot...", kind))
            .color(Color::from_rgb8(0x80, 0x80, 0x80))
            .into(),
        PanelState::Failed(message) => text(format!("No {} plot: {}", kind, message))
            .color(tone_colour(Tone::Spectroscopic))
            .into(),
        PanelState::Disabled => text("").into(),
    };
    container(content).center_x(Length::Fixed(width)).into()
}

/// Summary lines for one side of the results panel.
///
/// The lines are rebuilt on every view, so the column owns its text.
pub fn summary_column(lines: &[SummaryLine], side: Side, font_size: f32) -> Column<'static, Message> {
    lines
        .iter()
        .filter(|line| line.side == side)
        .fold(column![].spacing(4), |col, line| {
            col.push(
                text(line.text.clone())
                    .size(font_size)
                    .color(tone_colour(line.tone)),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_column_owns_its_text() {
        let column = {
            let lines = vec![
                SummaryLine {
                    text: "z_EAZY = 6.12".to_string(),
                    tone: Tone::Eazy,
                    side: Side::Left,
                },
                SummaryLine {
                    text: "z_spec = 6.01".to_string(),
                    tone: Tone::Spectroscopic,
                    side: Side::Right,
                },
            ];
            summary_column(&lines, Side::Left, 12.0)
        };
        let element: Element<'static, Message> = column.into();
        drop(element);
    }

    #[test]
    fn test_panel_state() {
        assert!(matches!(PanelState::new(true), PanelState::Loading));
        assert!(matches!(PanelState::new(false), PanelState::Disabled));
        assert_ne!(tone_colour(Tone::Eazy), tone_colour(Tone::Beagle));
    }
}
