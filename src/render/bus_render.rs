//! Bus renderer (§4.7.2). Multi-bit signals drawn as a box with sloped
//! transition edges, degenerating to a plain vertical tick when the
//! transition region would be narrower than the slope itself, and with
//! centered value text only when there's room for it.
//!
//! Grounded on `original_source/wavescout/signal_renderer.py::draw_bus_signal`;
//! cell writes go through [`super::set_symbol`].

use tui::buffer::Buffer;
use tui::style::{Color, Style};

use super::{set_symbol, signal_bounds, valid_pixel_range, DrawParams};
use crate::config::rendering::{BUS_TRANSITION_MAX_WIDTH, BUS_TRANSITION_SLOPE_FACTOR, MIN_BUS_TEXT_WIDTH};
use crate::sampling::SignalDrawingData;
use crate::value::ValueKind;

const TOP_BOTTOM: &str = "\u{2500}"; // ─
const RISING: &str = "\u{2571}"; // ╱
const FALLING: &str = "\u{2572}"; // ╲
const TICK: &str = "\u{2502}"; // │
const UNDEF: &str = "\u{2573}"; // ╳

pub fn draw_bus_signal(buf: &mut Buffer, params: &DrawParams, data: &SignalDrawingData, color: Color) {
    let (y_top, y_bot, y_mid) = signal_bounds(params.row_y, params.row_height);
    let width = params.area.width;
    let (x_min, x_max) = valid_pixel_range(params.start_time, params.end_time, width, params.waveform_max_time);

    let style = Style::default().fg(color);
    let undef_style = Style::default().fg(Color::Red);

    for (i, (pixel_x, sample)) in data.samples.iter().enumerate() {
        let x_start = (*pixel_x).round().clamp(0.0, width as f64) as u16;
        let x_end = data
            .samples
            .get(i + 1)
            .map(|(next_x, _)| (*next_x).round().clamp(0.0, width as f64) as u16)
            .unwrap_or(x_max)
            .max(x_start + 1);

        let segment_style = match sample.kind {
            ValueKind::Undefined | ValueKind::HighImpedance => undef_style,
            ValueKind::Normal => style,
        };

        let segment_width = (x_end.saturating_sub(x_start)) as f64;
        let slope_width = (segment_width * BUS_TRANSITION_SLOPE_FACTOR).min(BUS_TRANSITION_MAX_WIDTH) as u16;

        if x_start >= x_min && x_start < x_max && i > 0 {
            // Transition tick/slope at the boundary between this and the
            // previous value, degenerating to a plain vertical tick when the
            // slope would be narrower than one column.
            if slope_width == 0 {
                for y in y_top..=y_bot {
                    set_symbol(buf, params, x_start, y, TICK, segment_style);
                }
            } else {
                let half = (y_bot - y_top).max(1);
                for (k, y) in (y_top..=y_bot).enumerate() {
                    let frac = k as f64 / half as f64;
                    let dx = (frac * slope_width as f64) as u16;
                    let sym = match sample.kind {
                        ValueKind::Undefined | ValueKind::HighImpedance => UNDEF,
                        ValueKind::Normal => RISING,
                    };
                    set_symbol(buf, params, x_start + dx, y, sym, segment_style);
                }
            }
        }

        // Flat top/bottom rails across the body of the segment.
        let body_start = if slope_width > 0 { x_start + slope_width } else { x_start };
        for x in body_start.max(x_min)..x_end.min(x_max) {
            set_symbol(buf, params, x, y_top, TOP_BOTTOM, segment_style);
            set_symbol(buf, params, x, y_bot, TOP_BOTTOM, segment_style);
        }

        let interior_width = x_end.saturating_sub(body_start) as f64;
        if interior_width >= MIN_BUS_TEXT_WIDTH {
            if let Some(text) = &sample.value_str {
                let max_chars = interior_width as usize;
                let shown: String = text.chars().take(max_chars.max(1)).collect();
                let text_x = body_start + ((interior_width - shown.len() as f64) / 2.0).max(0.0) as u16;
                set_symbol(buf, params, text_x, y_mid, &shown, style);
            }
        } else {
            let _ = FALLING;
        }

        if sample.has_multiple_transitions {
            set_symbol(buf, params, x_start, y_mid, "\u{2551}", Style::default().fg(Color::Yellow));
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
        let id = session.add_root_signal("top.data".into(), 8);
        session.node(id).unwrap().clone()
    }

    fn sample(text: &str, kind: ValueKind) -> SignalSample {
        SignalSample {
            kind,
            value_str: Some(text.to_string()),
            value_float: 0.0,
            value_bool: false,
            has_multiple_transitions: false,
        }
    }

    #[test]
    fn draws_without_panicking_on_narrow_buffer() {
        let node = node();
        let mut buf = Buffer::empty(Rect::new(0, 0, 20, 5));
        let params = DrawParams {
            area: Rect::new(0, 0, 20, 5),
            row_y: 0,
            row_height: 5,
            start_time: 0,
            end_time: 1000,
            waveform_max_time: Some(1000),
            node: &node,
        };
        let data = SignalDrawingData {
            samples: vec![
                (0.0, sample("0xFF", ValueKind::Normal)),
                (10.0, sample("0x00", ValueKind::Normal)),
            ],
        };
        draw_bus_signal(&mut buf, &params, &data, Color::Green);
    }

    #[test]
    fn wide_segment_centers_value_text() {
        let node = node();
        let mut buf = Buffer::empty(Rect::new(0, 0, 80, 5));
        let params = DrawParams {
            area: Rect::new(0, 0, 80, 5),
            row_y: 0,
            row_height: 5,
            start_time: 0,
            end_time: 1000,
            waveform_max_time: Some(1000),
            node: &node,
        };
        let data = SignalDrawingData {
            samples: vec![(0.0, sample("0xAB", ValueKind::Normal))],
        };
        draw_bus_signal(&mut buf, &params, &data, Color::Green);
        let (_, _, y_mid) = signal_bounds(0, 5);
        let row: String = (0..80).map(|x| buf.get(x, y_mid).symbol.clone()).collect();
        assert!(row.contains("0xAB"));
    }
}
