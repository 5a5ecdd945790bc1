//! Signal Sampling Pipeline (§4.6) — the core of the core. Converts a
//! signal's raw transitions, over a visible time window and at a given
//! pixel width, into a compact per-pixel sample stream with an aliasing
//! flag for pixels that contain more than one underlying transition.
//!
//! Literal port of
//! `original_source/wavescout/signal_sampling.py::generate_signal_draw_commands`,
//! including its exact fast-skip arithmetic (the `+1.5` mid-pixel jump) and
//! the `canvas_width * MAX_ITERATIONS_SAFETY` safety bound.

use crate::config::rendering::MAX_ITERATIONS_SAFETY;
use crate::db::WaveformDb;
use crate::errors::WaveScoutResult;
use crate::types::{DataFormat, SignalHandle, Time};
use crate::value::{parse_signal_value, ValueKind};

/// A single sampled value at a pixel position, ready for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSample {
    pub kind: ValueKind,
    pub value_str: Option<String>,
    pub value_float: f64,
    pub value_bool: bool,
    pub has_multiple_transitions: bool,
}

/// The full per-pixel sample stream for one signal over one viewport.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalDrawingData {
    /// `(pixel_x, sample)` pairs, in strictly non-decreasing `pixel_x`.
    pub samples: Vec<(f64, SignalSample)>,
}

/// Generates drawing commands for a single signal.
///
/// Returns `None` when the signal can't be sampled at all (unknown handle,
/// or the requested range falls entirely outside the waveform), matching
/// the Python original's `try/except -> None` fallback generalized into an
/// `Option` (this is the one place §4.6 asks for "empty" rather than a
/// propagated error — a single signal failing to sample shouldn't abort the
/// whole frame).
pub fn generate_signal_draw_commands(
    db: &WaveformDb,
    handle: SignalHandle,
    data_format: DataFormat,
    start_time: Time,
    end_time: Time,
    canvas_width: u32,
    waveform_max_time: Option<Time>,
) -> Option<SignalDrawingData> {
    if let Some(max_time) = waveform_max_time {
        if end_time < 0 || start_time > max_time + 1 {
            return None;
        }
    }

    let bit_width = db.bit_width(handle).unwrap_or(32);
    let canvas_width_f = canvas_width as f64;
    let time_per_pixel = if canvas_width > 0 {
        (end_time - start_time) as f64 / canvas_width_f
    } else {
        1.0
    };

    let mut drawing_data = SignalDrawingData::default();
    let mut current_time: Time = start_time.max(0);
    let mut prev_value: Option<String> = None;
    let mut prev_pixel: f64 = -1.0;

    let max_iterations = canvas_width as u64 * MAX_ITERATIONS_SAFETY as u64;
    let mut iterations: u64 = 0;

    while iterations < max_iterations {
        iterations += 1;

        let query = match db.query_signal(handle, current_time) {
            Ok(q) => q,
            Err(_) => return None,
        };

        let parsed = parse_signal_value(&query.value, data_format);
        let kind = parsed.kind;

        let current_pixel = (current_time - start_time) as f64 / time_per_pixel;

        let should_emit = match &prev_value {
            None => true,
            Some(prev) => *prev != parsed.text || (prev_pixel >= 0.0 && current_pixel.floor() > prev_pixel.floor()),
        };

        if should_emit {
            drawing_data.samples.push((
                current_pixel,
                SignalSample {
                    kind,
                    value_str: Some(parsed.text.clone()),
                    value_float: parsed.numeric,
                    value_bool: parsed.boolean,
                    has_multiple_transitions: false,
                },
            ));
            prev_value = Some(parsed.text);
            prev_pixel = current_pixel;
        }

        let Some(next_time) = query.next_time else { break };
        if let Some(max_time) = waveform_max_time {
            if next_time > max_time {
                break;
            }
        }
        if next_time > end_time {
            break;
        }

        let next_pixel = (next_time - start_time) as f64 / time_per_pixel;
        if next_pixel > canvas_width_f {
            break;
        }

        if next_pixel.floor() == current_pixel.floor() && !drawing_data.samples.is_empty() {
            let last = drawing_data.samples.last_mut().unwrap();
            last.1.has_multiple_transitions = true;

            let next_pixel_boundary = current_pixel.floor() + 1.5;
            let next_pixel_time = start_time as f64 + next_pixel_boundary * time_per_pixel;
            current_time = next_pixel_time as Time;
        } else {
            current_time = next_time;
        }
    }

    if drawing_data.samples.is_empty() {
        None
    } else {
        Some(drawing_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::FakeBackend;
    use crate::value::RawValue;

    fn make_db(transitions: Vec<(Time, RawValue)>) -> WaveformDb {
        let backend = FakeBackend::single_signal(1, 8, transitions);
        WaveformDb::new(Box::new(backend))
    }

    #[test]
    fn single_transition_yields_one_sample_per_pixel_change() {
        let db = make_db(vec![(0, RawValue::Bits(0, 8)), (500, RawValue::Bits(1, 8))]);
        let result = generate_signal_draw_commands(&db, 1, DataFormat::Unsigned, 0, 1000, 100, Some(1000)).unwrap();
        assert!(result.samples.len() >= 2);
        assert_eq!(result.samples[0].1.value_str.as_deref(), Some("0"));
    }

    #[test]
    fn dense_glitches_within_one_pixel_set_aliasing_flag() {
        let mut transitions = Vec::new();
        for t in 0..50 {
            transitions.push((t, RawValue::Bits((t % 2) as u128, 8)));
        }
        let db = make_db(transitions);
        // 1000 time units across 10 pixels => 100 units/pixel, so the first
        // 50 units of glitches all land in pixel 0.
        let result = generate_signal_draw_commands(&db, 1, DataFormat::Unsigned, 0, 1000, 10, Some(1000)).unwrap();
        assert!(result.samples[0].1.has_multiple_transitions);
    }

    #[test]
    fn out_of_bounds_range_yields_none() {
        let db = make_db(vec![(0, RawValue::Bits(0, 8))]);
        let result = generate_signal_draw_commands(&db, 1, DataFormat::Unsigned, -500, -100, 100, Some(1000));
        assert!(result.is_none());
    }

    #[test]
    fn unknown_handle_yields_none_instead_of_propagating_error() {
        let db = make_db(vec![(0, RawValue::Bits(0, 8))]);
        let result = generate_signal_draw_commands(&db, 999, DataFormat::Unsigned, 0, 1000, 100, Some(1000));
        assert!(result.is_none());
    }
}
