//! Bool renderer (§4.7.1). One-bit signals drawn as a high/low/mid trace
//! with vertical edges at transitions.
//!
//! Grounded on `original_source/wavescout/signal_renderer.py::draw_digital_signal`
//! for the algorithm; cell writes go through [`super::set_symbol`] the way
//! teacher's `widgets/signal.rs` builds one styled run per screen column.

use tui::buffer::Buffer;
use tui::style::{Color, Style};

use super::{set_symbol, signal_bounds, valid_pixel_range, DrawParams};
use crate::sampling::SignalDrawingData;
use crate::value::ValueKind;

const RUN: &str = "\u{2500}"; // ─
const EDGE: &str = "\u{2502}"; // │

pub fn draw_bool_signal(buf: &mut Buffer, params: &DrawParams, data: &SignalDrawingData, color: Color) {
    let (y_top, y_bot, y_mid) = signal_bounds(params.row_y, params.row_height);
    let width = params.area.width;
    let (x_min, x_max) = valid_pixel_range(params.start_time, params.end_time, width, params.waveform_max_time);

    let style = Style::default().fg(color);
    let mut last_y = y_mid;

    for (i, (pixel_x, sample)) in data.samples.iter().enumerate() {
        let x = (*pixel_x).round().clamp(0.0, width as f64) as u16;
        if x < x_min || x >= x_max {
            continue;
        }
        let y = match sample.kind {
            ValueKind::Normal if sample.value_bool => y_top,
            ValueKind::Normal => y_bot,
            ValueKind::Undefined | ValueKind::HighImpedance => y_mid,
        };

        let run_end = data
            .samples
            .get(i + 1)
            .map(|(next_x, _)| (*next_x).round().clamp(0.0, width as f64) as u16)
            .unwrap_or(x_max);
        for rx in x..run_end.max(x) {
            set_symbol(buf, params, rx, y, RUN, style);
        }

        if y != last_y {
            let (lo, hi) = if y < last_y { (y, last_y) } else { (last_y, y) };
            for vy in lo..=hi {
                set_symbol(buf, params, x, vy, EDGE, style);
            }
        }
        last_y = y;

        if sample.has_multiple_transitions {
            set_symbol(buf, params, x, y_mid, "\u{2551}", Style::default().fg(Color::Yellow));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::SignalSample;
    use crate::session::SignalNode;
    use tui::layout::Rect;

    fn node() -> SignalNode {
        let mut session = crate::session::WaveformSession::new();
        let id = session.add_root_signal("top.clk".into(), 1);
        session.node(id).unwrap().clone()
    }

    #[test]
    fn draws_without_panicking_on_small_buffer() {
        let node = node();
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 5));
        let params = DrawParams {
            area: Rect::new(0, 0, 10, 5),
            row_y: 0,
            row_height: 5,
            start_time: 0,
            end_time: 100,
            waveform_max_time: Some(100),
            node: &node,
        };
        let data = SignalDrawingData {
            samples: vec![
                (
                    0.0,
                    SignalSample {
                        kind: ValueKind::Normal,
                        value_str: Some("0".into()),
                        value_float: 0.0,
                        value_bool: false,
                        has_multiple_transitions: false,
                    },
                ),
                (
                    5.0,
                    SignalSample {
                        kind: ValueKind::Normal,
                        value_str: Some("1".into()),
                        value_float: 1.0,
                        value_bool: true,
                        has_multiple_transitions: false,
                    },
                ),
            ],
        };
        draw_bool_signal(&mut buf, &params, &data, Color::Cyan);
    }

    #[test]
    fn transition_draws_vertical_edge() {
        let node = node();
        let mut buf = Buffer::empty(Rect::new(0, 0, 10, 5));
        let params = DrawParams {
            area: Rect::new(0, 0, 10, 5),
            row_y: 0,
            row_height: 5,
            start_time: 0,
            end_time: 100,
            waveform_max_time: Some(100),
            node: &node,
        };
        let data = SignalDrawingData {
            samples: vec![
                (
                    2.0,
                    SignalSample {
                        kind: ValueKind::Normal,
                        value_str: Some("0".into()),
                        value_float: 0.0,
                        value_bool: false,
                        has_multiple_transitions: false,
                    },
                ),
                (
                    4.0,
                    SignalSample {
                        kind: ValueKind::Normal,
                        value_str: Some("1".into()),
                        value_float: 1.0,
                        value_bool: true,
                        has_multiple_transitions: false,
                    },
                ),
            ],
        };
        draw_bool_signal(&mut buf, &params, &data, Color::Cyan);
        let (y_top, y_bot, _) = signal_bounds(0, 5);
        assert_eq!(buf.get(4, y_top).symbol, EDGE);
        assert_eq!(buf.get(4, y_bot).symbol, EDGE);
    }
}
