//! Analog renderer (§4.7.3). Real-valued signals drawn as a polyline scaled
//! either to the whole waveform's range or just the visible window, with
//! min/max labels and a dotted aliasing-hint overlay for glitch pixels.
//!
//! Grounded on `original_source/wavescout/signal_renderer.py::draw_analog_signal`
//! for the scaling and polyline algorithm; cell writes go through
//! [`super::set_symbol`].

use tui::buffer::Buffer;
use tui::style::{Color, Style};

use super::{set_symbol, signal_bounds_with_margin, valid_pixel_range, DrawParams};
use crate::config::rendering::{ANALOG_RANGE_PADDING, ANALOG_RANGE_SAMPLE_CAP};
use crate::db::WaveformDb;
use crate::errors::WaveScoutResult;
use crate::sampling::SignalDrawingData;
use crate::types::{AnalogScalingMode, DataFormat, SignalHandle, Time};
use crate::value::{parse_signal_value, ValueKind};

/// A padded value range an analog trace is scaled against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogRange {
    pub min: f64,
    pub max: f64,
}

impl AnalogRange {
    fn padded(min: f64, max: f64) -> Self {
        if !min.is_finite() || !max.is_finite() {
            return AnalogRange { min: 0.0, max: 1.0 };
        }
        let span = (max - min).max(f64::EPSILON);
        let pad = span * ANALOG_RANGE_PADDING;
        AnalogRange {
            min: min - pad,
            max: max + pad,
        }
    }

    fn scale(&self, value: f64, y_top: u16, y_bot: u16) -> u16 {
        let span = (self.max - self.min).max(f64::EPSILON);
        let frac = ((value - self.min) / span).clamp(0.0, 1.0);
        let range = (y_bot - y_top) as f64;
        y_bot - (frac * range).round() as u16
    }
}

/// Computes the value range a signal's trace should be scaled against,
/// sampling up to [`ANALOG_RANGE_SAMPLE_CAP`] transitions (§4.7.3 "up to
/// 10 000 points" cap on the range scan, to keep this cheap on huge
/// signals). `ScaleAll` scans the entire waveform; `ScaleVisible` scans only
/// the requested window.
pub fn compute_analog_range(
    db: &WaveformDb,
    handle: SignalHandle,
    data_format: DataFormat,
    mode: AnalogScalingMode,
    visible_start: Time,
    visible_end: Time,
) -> WaveScoutResult<AnalogRange> {
    let (scan_start, scan_end) = match mode {
        AnalogScalingMode::ScaleAll => (0, db.max_time()),
        AnalogScalingMode::ScaleVisible => (visible_start, visible_end),
    };
    let transitions = db.get_signal(handle, scan_start, scan_end)?;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for t in transitions.iter().take(ANALOG_RANGE_SAMPLE_CAP) {
        let parsed = parse_signal_value(&t.value, data_format);
        if parsed.kind == ValueKind::Normal && parsed.numeric.is_finite() {
            min = min.min(parsed.numeric);
            max = max.max(parsed.numeric);
        }
    }
    if !min.is_finite() || !max.is_finite() {
        min = 0.0;
        max = 1.0;
    }
    Ok(AnalogRange::padded(min, max))
}

pub fn draw_analog_signal(
    buf: &mut Buffer,
    params: &DrawParams,
    data: &SignalDrawingData,
    range: AnalogRange,
    color: Color,
) {
    let (y_top, y_bot, _) = signal_bounds_with_margin(params.row_y, params.row_height, 1, 1);
    let width = params.area.width;
    let (x_min, x_max) = valid_pixel_range(params.start_time, params.end_time, width, params.waveform_max_time);

    let style = Style::default().fg(color);
    let mut prev: Option<(u16, u16)> = None;

    for (pixel_x, sample) in &data.samples {
        let x = (*pixel_x).round().clamp(0.0, width as f64) as u16;
        if x < x_min || x >= x_max {
            prev = None;
            continue;
        }

        if sample.kind != ValueKind::Normal || !sample.value_float.is_finite() {
            prev = None;
            if sample.has_multiple_transitions {
                set_symbol(buf, params, x, (y_top + y_bot) / 2, "\u{00b7}", Style::default().fg(Color::Yellow));
            }
            continue;
        }

        let y = range.scale(sample.value_float, y_top, y_bot);
        set_symbol(buf, params, x, y, "\u{2022}", style);

        if let Some((px, py)) = prev {
            if x > px {
                let (lo, hi) = if py < y { (py, y) } else { (y, py) };
                for vy in lo..=hi {
                    set_symbol(buf, params, x, vy, "\u{2502}", style);
                }
            }
        }
        prev = Some((x, y));

        if sample.has_multiple_transitions {
            set_symbol(buf, params, x, y_top, "\u{00b7}", Style::default().fg(Color::Yellow));
        }
    }

    if params.node.height_scaling > 1 {
        let min_label = format!("{:.3}", range.min);
        let max_label = format!("{:.3}", range.max);
        set_symbol(buf, params, 0, y_bot, &min_label, Style::default().fg(Color::Gray));
        set_symbol(buf, params, 0, y_top, &max_label, Style::default().fg(Color::Gray));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::FakeBackend;
    use crate::sampling::SignalSample;
    use crate::session::SignalNode;
    use crate::value::RawValue;
    use tui::layout::Rect;

    fn node() -> SignalNode {
        let mut session = crate::session::WaveformSession::new();
        let id = session.add_root_signal("top.volt".into(), 32);
        session.node(id).unwrap().clone()
    }

    #[test]
    fn range_excludes_undefined_samples() {
        let backend = FakeBackend::single_signal(
            1,
            32,
            vec![
                (0, RawValue::Real(1.0)),
                (10, RawValue::Undefined),
                (20, RawValue::Real(3.0)),
            ],
        );
        let db = WaveformDb::new(Box::new(backend));
        let range = compute_analog_range(&db, 1, DataFormat::Float, AnalogScalingMode::ScaleAll, 0, 20).unwrap();
        assert!(range.min < 1.0 && range.max > 3.0);
    }

    #[test]
    fn draws_polyline_without_panicking() {
        let node = node();
        let mut buf = Buffer::empty(Rect::new(0, 0, 40, 7));
        let params = DrawParams {
            area: Rect::new(0, 0, 40, 7),
            row_y: 0,
            row_height: 7,
            start_time: 0,
            end_time: 1000,
            waveform_max_time: Some(1000),
            node: &node,
        };
        let data = SignalDrawingData {
            samples: vec![
                (
                    0.0,
                    SignalSample {
                        kind: ValueKind::Normal,
                        value_str: Some("1.0".into()),
                        value_float: 1.0,
                        value_bool: true,
                        has_multiple_transitions: false,
                    },
                ),
                (
                    20.0,
                    SignalSample {
                        kind: ValueKind::Normal,
                        value_str: Some("3.0".into()),
                        value_float: 3.0,
                        value_bool: true,
                        has_multiple_transitions: false,
                    },
                ),
            ],
        };
        let range = AnalogRange::padded(1.0, 3.0);
        draw_analog_signal(&mut buf, &params, &data, range, Color::Magenta);
    }
}
