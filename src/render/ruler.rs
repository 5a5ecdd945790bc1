//! Time ruler and grid (§4.7.5). Places tick marks at "nice" time intervals
//! (the `[1, 2, 2.5, 5] × 10^n` rungs from [`TimeRulerConfig::nice_numbers`])
//! spaced by `tick_density`, formats labels in the session's preferred
//! [`TimeUnit`] with automatic upgrade to a coarser unit once the label
//! value would exceed 1000, and (when a clock signal is set) renders a
//! two-band ruler: the absolute time axis plus a clock-cycle axis.
//!
//! Grounded on `original_source/wavescout/time_grid_renderer.py` (tick
//! placement and label formatting); cell writes go through `tui`'s
//! `Buffer::set_string`.

use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Style};

use crate::session::{ClockSignal, GridStyle, TimeRulerConfig};
use crate::types::{Time, TimeUnit, Timescale};

/// One placed tick: its pixel column, the time it represents, and its label
/// (empty for minor ticks that get a mark but no text).
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub x: u16,
    pub time: Time,
    pub label: String,
}

/// Rounds `raw` up to the nearest "nice" number: the smallest `n × 10^k`,
/// for `n` taken from `nice_numbers` (§3.1's `[1, 2, 2.5, 5]` by default),
/// that is `>= raw`. `nice_numbers` must be ascending and each `< 10.0`;
/// a `raw` whose fraction exceeds every rung rolls over to the smallest
/// rung one power of ten up.
fn nice_step(raw: f64, nice_numbers: &[f64]) -> f64 {
    if raw <= 0.0 {
        return 1.0;
    }
    let exponent = raw.log10().floor();
    let base = 10f64.powf(exponent);
    let fraction = raw / base;
    for &n in nice_numbers {
        if fraction <= n {
            return n * base;
        }
    }
    nice_numbers.first().copied().unwrap_or(1.0) * base * 10.0
}

/// Computes evenly spaced ruler ticks across `[start_time, end_time)` mapped
/// onto `[0, width)` pixel columns, spaced so that on average one tick falls
/// every `1.0 / tick_density` pixel columns.
pub fn compute_ticks(start_time: Time, end_time: Time, width: u16, tick_density: f64, nice_numbers: &[f64]) -> Vec<Tick> {
    if width == 0 || end_time <= start_time {
        return Vec::new();
    }
    let duration = (end_time - start_time) as f64;
    let target_tick_count = (width as f64 * tick_density.clamp(0.01, 10.0) / 80.0).max(2.0);
    let raw_step = duration / target_tick_count;
    let step = nice_step(raw_step, nice_numbers).max(1.0);

    // `step` may be fractional (the `2.5` nice-number rung), so accumulate
    // in f64 and only round to a `Time` per tick rather than truncating
    // `step` itself to an integer.
    let first_tick = (start_time as f64 / step).ceil() * step;
    let mut ticks = Vec::new();
    let mut t = first_tick;
    while t < end_time as f64 {
        let tick_time = t.round() as Time;
        let x = (((tick_time - start_time) as f64 / duration) * width as f64).round() as u16;
        if x < width {
            ticks.push(Tick {
                x,
                time: tick_time,
                label: String::new(),
            });
        }
        t += step;
    }
    ticks
}

/// Formats a tick's absolute time in `preferred_unit`, automatically
/// upgrading to a coarser unit if the magnitude would otherwise exceed 1000
/// (§4.7.5 "Upgrade unit automatically").
pub fn format_tick_label(time: Time, timescale: Timescale, preferred_unit: TimeUnit) -> String {
    let seconds = time as f64 * timescale.factor as f64 * 10f64.powi(timescale.unit.to_exponent());
    let mut unit = preferred_unit;
    loop {
        let value = seconds / 10f64.powi(unit.to_exponent());
        if value.abs() < 1000.0 {
            return format!("{:.3}{}", value, unit.suffix());
        }
        match unit.coarser() {
            Some(next) => unit = next,
            None => return format!("{:.3}{}", value, unit.suffix()),
        }
    }
}

/// Draws the ruler row: tick marks plus labels, and (when grid lines are
/// enabled) a full-height dotted/dashed/solid grid column at each major
/// tick, extending down into `grid_area`.
pub fn draw_ruler(
    buf: &mut Buffer,
    ruler_area: Rect,
    grid_area: Rect,
    start_time: Time,
    end_time: Time,
    timescale: Timescale,
    config: &TimeRulerConfig,
    clock: Option<ClockSignal>,
) {
    let ticks = compute_ticks(start_time, end_time, ruler_area.width, config.tick_density, &config.nice_numbers);
    let label_style = Style::default().fg(Color::Gray);

    for tick in &ticks {
        if tick.x >= ruler_area.width {
            continue;
        }
        let label = format_tick_label(tick.time, timescale, config.time_unit);
        let x = ruler_area.x + tick.x;
        buf.set_string(x, ruler_area.y, "\u{2502}", label_style);
        if x + label.len() as u16 <= ruler_area.x + ruler_area.width {
            buf.set_string(x, ruler_area.y + ruler_area.height.saturating_sub(1), &label, label_style);
        }

        if config.show_grid_lines {
            let grid_symbol = match config.grid_style {
                GridStyle::Solid => "\u{2502}",
                GridStyle::Dashed => "\u{2506}",
                GridStyle::Dotted => "\u{2505}",
            };
            let grid_color = config.grid_color.to_hex().unwrap_or_default();
            let grid_style = Style::default().fg(hex_to_color(&grid_color));
            for y in grid_area.y..grid_area.bottom() {
                buf.set_string(grid_area.x + tick.x.min(grid_area.width.saturating_sub(1)), y, grid_symbol, grid_style);
            }
        }
    }

    if let Some((period, phase, _)) = clock {
        draw_clock_band(buf, ruler_area, start_time, end_time, period, phase);
    }
}

/// The second ruler band shown when a clock signal is set: cycle numbers
/// instead of absolute time, one label per clock period (§4.7.5 "clock
/// mode").
fn draw_clock_band(buf: &mut Buffer, area: Rect, start_time: Time, end_time: Time, period: Time, phase: Time) {
    if period <= 0 || area.height == 0 {
        return;
    }
    let duration = (end_time - start_time).max(1) as f64;
    let width = area.width as f64;
    let first_cycle = ((start_time - phase) as f64 / period as f64).floor() as i64;
    let mut cycle = first_cycle;
    loop {
        let cycle_time = phase + cycle * period;
        if cycle_time >= end_time {
            break;
        }
        if cycle_time >= start_time {
            let x = (((cycle_time - start_time) as f64 / duration) * width).round() as u16;
            if x < area.width {
                let label = cycle.to_string();
                buf.set_string(area.x + x, area.y, &label, Style::default().fg(Color::DarkGray));
            }
        }
        cycle += 1;
    }
}

fn hex_to_color(hex: &str) -> Color {
    crate::types::RgbColor::from_hex(hex)
        .and_then(|c| match c {
            crate::types::RgbColor::Rgb(r, g, b) => Some(Color::Rgb(r, g, b)),
            crate::types::RgbColor::ThemeDefault => None,
        })
        .unwrap_or(Color::DarkGray)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NICE_NUMBERS: [f64; 4] = [1.0, 2.0, 2.5, 5.0];

    #[test]
    fn nice_step_rounds_to_1_2_2_5_5_sequence() {
        assert_eq!(nice_step(3.0, &NICE_NUMBERS), 5.0);
        assert_eq!(nice_step(12.0, &NICE_NUMBERS), 20.0);
        assert_eq!(nice_step(0.9, &NICE_NUMBERS), 1.0);
        assert_eq!(nice_step(2.1, &NICE_NUMBERS), 2.5);
    }

    #[test]
    fn compute_ticks_stays_within_width() {
        let ticks = compute_ticks(0, 10_000, 100, 0.8, &NICE_NUMBERS);
        assert!(ticks.iter().all(|t| t.x < 100));
        assert!(!ticks.is_empty());
    }

    #[test]
    fn compute_ticks_uses_fractional_2_5_step_without_truncation() {
        // duration=22, width=1000, density=0.8 drives raw_step to 2.2,
        // which nice_step rounds up to the 2.5 rung. If the step were
        // truncated to an int before accumulating (the old `1,2,5,10`-only
        // behavior's bug once a fractional rung is introduced), every gap
        // between ticks would be exactly 2; accumulating in f64 and
        // rounding per-tick instead alternates 3/2 gaps averaging 2.5.
        let ticks = compute_ticks(0, 22, 1000, 0.8, &NICE_NUMBERS);
        let gaps: Vec<i64> = ticks.windows(2).map(|w| w[1].time - w[0].time).collect();
        assert!(gaps.iter().any(|&g| g == 3), "expected a 3-wide gap from the 2.5 step, got {gaps:?}");
        assert!(gaps.iter().all(|&g| g == 2 || g == 3));
    }

    #[test]
    fn format_tick_label_upgrades_unit_past_1000() {
        let label = format_tick_label(2_000_000, Timescale::default(), TimeUnit::Picoseconds);
        assert!(label.ends_with("ns"));
    }

    #[test]
    fn empty_range_yields_no_ticks() {
        assert!(compute_ticks(100, 100, 80, 0.8, &NICE_NUMBERS).is_empty());
    }
}
