//! Event renderer (§4.7.4). Each transition is drawn as a short vertical
//! shaft reaching 80% of the row's band height, capped with a 3-pixel-wide
//! arrowhead; unlike bool/bus signals, events carry no caption text.
//!
//! Grounded on `original_source/wavescout/signal_renderer.py::draw_event_signal`;
//! cell writes go through [`super::set_symbol`].

use tui::buffer::Buffer;
use tui::style::Style;

use super::{set_symbol, signal_bounds, valid_pixel_range, DrawParams};
use crate::sampling::SignalDrawingData;
use tui::style::Color;

/// Fraction of the row's band height the event shaft reaches (§4.7.4).
const SHAFT_HEIGHT_FRACTION: f64 = 0.8;

pub fn draw_event_signal(buf: &mut Buffer, params: &DrawParams, data: &SignalDrawingData, color: Color) {
    let (y_top, y_bot, _) = signal_bounds(params.row_y, params.row_height);
    let width = params.area.width;
    let (x_min, x_max) = valid_pixel_range(params.start_time, params.end_time, width, params.waveform_max_time);

    let style = Style::default().fg(color);
    let band_height = (y_bot.saturating_sub(y_top)) as f64;
    let shaft_len = (band_height * SHAFT_HEIGHT_FRACTION).round() as u16;
    let shaft_top = y_bot.saturating_sub(shaft_len);

    for (pixel_x, _sample) in &data.samples {
        let x = (*pixel_x).round().clamp(0.0, width as f64) as u16;
        if x < x_min || x >= x_max {
            continue;
        }

        for y in shaft_top..=y_bot {
            set_symbol(buf, params, x, y, "\u{2502}", style);
        }

        // 3-pixel arrowhead at the shaft's top.
        if x > 0 {
            set_symbol(buf, params, x - 1, shaft_top, "\u{2572}", style);
        }
        set_symbol(buf, params, x, shaft_top, "\u{25b2}", style);
        set_symbol(buf, params, x + 1, shaft_top, "\u{2571}", style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::SignalSample;
    use crate::session::SignalNode;
    use crate::value::ValueKind;
    use tui::layout::Rect;

    fn node() -> SignalNode {
        let mut session = crate::session::WaveformSession::new();
        let id = session.add_root_signal("top.evt".into(), 1);
        session.node(id).unwrap().clone()
    }

    #[test]
    fn draws_shaft_and_arrowhead() {
        let node = node();
        let mut buf = Buffer::empty(Rect::new(0, 0, 20, 6));
        let params = DrawParams {
            area: Rect::new(0, 0, 20, 6),
            row_y: 0,
            row_height: 6,
            start_time: 0,
            end_time: 100,
            waveform_max_time: Some(100),
            node: &node,
        };
        let data = SignalDrawingData {
            samples: vec![(
                10.0,
                SignalSample {
                    kind: ValueKind::Normal,
                    value_str: None,
                    value_float: 1.0,
                    value_bool: true,
                    has_multiple_transitions: false,
                },
            )],
        };
        draw_event_signal(&mut buf, &params, &data, Color::Cyan);
        let (_, y_bot, _) = signal_bounds(0, 6);
        assert_eq!(buf.get(10, y_bot).symbol, "\u{2502}");
    }
}
