//! Canvas Orchestrator: the one stateful piece of the renderer. Owns
//! a cached waveform image, a hash of the parameters that produced it, and
//! the `paint_frames`/`render_frames` diagnostic counters, and decides on
//! every paint call whether the expensive per-signal sampling + drawing
//! needs to run again or whether the cached image can simply be blitted.
//!
//! The widget composition (timescale band stacked over per-row signal
//! widgets, rebuilt each paint call) is wrapped in an explicit param-hash
//! cache, with the hash deliberately excluding cursor and marker state so
//! moving the cursor alone doesn't force a re-sample.
//!
//! `tui::buffer::Buffer` has no notion of a transparent offscreen layer the
//! way a retained-mode canvas would, so the cached "offscreen image" is
//! modeled here as the background fill plus rendered signal traces, cached
//! as one [`Buffer`] and blitted whole; the grid, ruler band, boundary
//! verticals, markers, and cursor are always drawn straight into the frame
//! buffer on top of it, since those depend on state the hash deliberately
//! excludes (cursor, markers) or are cheap enough to not bother caching
//! (ruler/grid).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Style};

use crate::config::DEFAULT_THEME;
use crate::db::WaveformDb;
use crate::render::analog_render::{compute_analog_range, AnalogRange};
use crate::render::bool_render::draw_bool_signal;
use crate::render::bus_render::draw_bus_signal;
use crate::render::event_render::draw_event_signal;
use crate::render::ruler;
use crate::render::{paint_row_background, DrawParams};
use crate::sampling::generate_signal_draw_commands;
use crate::session::{DisplayFormat, Marker, SignalNode, WaveformSession};
use crate::types::{RenderType, RgbColor, SignalHandle, SignalNodeID, Time};

/// Everything a single [`CanvasOrchestrator::paint`] call needs. Built
/// fresh each frame by the caller (the app driver) from the session and DB;
/// the orchestrator never reaches into either outside of `paint`.
#[derive(Clone, Copy)]
pub struct PaintParams<'a> {
    pub area: Rect,
    pub header_height: u16,
    pub db: &'a WaveformDb,
    pub session: &'a WaveformSession,
    pub base_row_height: u16,
    pub device_pixel_ratio: f64,
    /// Set by the driver when the only thing that changed since the last
    /// paint is the cursor position — enables a fast path that skips
    /// re-sampling and redraws only the cursor column.
    pub cursor_only: bool,
    pub show_debug_counters: bool,
}

#[derive(Default)]
pub struct CanvasOrchestrator {
    rendered_image: Option<Buffer>,
    rendered_area: Option<Rect>,
    last_params_hash: Option<u64>,
    paint_frames: u64,
    render_frames: u64,
}

impl CanvasOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paint_frames(&self) -> u64 {
        self.paint_frames
    }

    pub fn render_frames(&self) -> u64 {
        self.render_frames
    }

    /// Invalidates the cached waveform image unconditionally. Cheaper than
    /// relying on the hash to notice on session-structure changes
    /// (`SessionLoaded`, node insert/remove), since those already carry an
    /// explicit event the app driver can route here directly.
    pub fn invalidate(&mut self) {
        self.rendered_image = None;
        self.rendered_area = None;
        self.last_params_hash = None;
    }

    pub fn paint(&mut self, buf: &mut Buffer, params: &PaintParams) {
        self.paint_frames += 1;
        let waveform_area = Rect {
            x: params.area.x,
            y: params.area.y + params.header_height,
            width: params.area.width,
            height: params.area.height.saturating_sub(params.header_height),
        };
        if waveform_area.width == 0 || waveform_area.height == 0 {
            return;
        }

        let rows = visible_signal_rows(params.session);
        let row_heights: Vec<u16> = rows
            .iter()
            .map(|id| {
                let scaling = params.session.node(*id).map(|n| n.height_scaling as u16).unwrap_or(1);
                params.base_row_height.saturating_mul(scaling.max(1))
            })
            .collect();
        let start_time = params.session.viewport.start_time();
        let end_time = params.session.viewport.end_time();
        let waveform_max_time = Some(params.db.max_time());

        let hash = hash_params(params, &rows, &row_heights, start_time, end_time, waveform_max_time);

        // Step 1: cursor-only fast path — the cached layer already matches
        // every hashed input, only the cursor (excluded from the hash)
        // moved, so skip straight to re-drawing the overlays.
        if params.cursor_only && self.last_params_hash == Some(hash) {
            if self.rendered_area == Some(waveform_area) {
                if let Some(cached) = self.rendered_image.clone() {
                    blit(&cached, buf, waveform_area);
                    self.draw_overlays(buf, params, waveform_area, start_time, end_time, waveform_max_time);
                    return;
                }
            }
        }

        let need_rerender = self.last_params_hash != Some(hash) || self.rendered_area != Some(waveform_area);
        if need_rerender {
            self.render_frames += 1;
            let mut image = Buffer::empty(waveform_area);
            let bg_params = DrawParams {
                area: waveform_area,
                row_y: waveform_area.y,
                row_height: waveform_area.height,
                start_time,
                end_time,
                waveform_max_time,
                node: &dummy_node(),
            };
            paint_row_background(
                &mut image,
                &bg_params,
                hex_or(DEFAULT_THEME.background_invalid, Color::Black),
                hex_or(DEFAULT_THEME.background, Color::Reset),
            );

            let mut y = waveform_area.y;
            for (id, row_height) in rows.iter().zip(row_heights.iter()) {
                if let Some(node) = params.session.node(*id) {
                    if !node.is_group {
                        if let Some(handle) = node.handle {
                            draw_signal_row(&mut image, params.db, node, handle, waveform_area, *row_height, y, start_time, end_time, waveform_max_time);
                        }
                    }
                }
                y = y.saturating_add(*row_height);
            }

            self.rendered_image = Some(image);
            self.rendered_area = Some(waveform_area);
            self.last_params_hash = Some(hash);
        }

        if let Some(cached) = &self.rendered_image {
            blit(cached, buf, waveform_area);
        }

        self.draw_overlays(buf, params, waveform_area, start_time, end_time, waveform_max_time);
    }

    /// Steps 6-8: boundary verticals, ruler + grid, markers, cursor, and
    /// optional debug counters — always redrawn, since none of them are
    /// part of the hashed, cached layer.
    fn draw_overlays(
        &self,
        buf: &mut Buffer,
        params: &PaintParams,
        waveform_area: Rect,
        start_time: Time,
        end_time: Time,
        waveform_max_time: Option<Time>,
    ) {
        let boundary_style = Style::default().fg(hex_or(DEFAULT_THEME.boundary_line, Color::DarkGray));
        if let Some(max_time) = waveform_max_time {
            for &t in &[0i64, max_time + 1] {
                if t < start_time || t > end_time {
                    continue;
                }
                if let Some(x) = time_to_column(t, start_time, end_time, waveform_area.width) {
                    for y in waveform_area.y..waveform_area.bottom() {
                        buf.set_string(waveform_area.x + x, y, "\u{2506}", boundary_style);
                    }
                }
            }
        }

        if params.header_height > 0 {
            let ruler_area = Rect::new(params.area.x, params.area.y, params.area.width, 1);
            let grid_area = Rect::new(
                params.area.x,
                params.area.y + 1,
                params.area.width,
                params.header_height.saturating_sub(1).max(waveform_area.height),
            );
            ruler::draw_ruler(
                buf,
                ruler_area,
                grid_area,
                start_time,
                end_time,
                params.session.timescale,
                &params.session.time_ruler_config,
                params.session.clock_signal,
            );
        }

        for marker in &params.session.markers {
            draw_marker(buf, waveform_area, marker, start_time, end_time);
        }

        draw_cursor(buf, waveform_area, params.session.cursor_time, start_time, end_time);

        if params.show_debug_counters {
            let label = format!("paint={} render={}", self.paint_frames, self.render_frames);
            buf.set_string(params.area.x, params.area.y, &label, Style::default().fg(Color::DarkGray));
        }
    }
}

/// Depth-first, expansion-aware walk: a collapsed group's descendants are
/// not visible rows. Matches the convention the browser/list panes use of
/// skipping collapsed subtrees, unlike `WaveformSession::iter_all_nodes`'s
/// unconditional full walk.
fn visible_signal_rows(session: &WaveformSession) -> Vec<SignalNodeID> {
    let mut out = Vec::new();
    for root in &session.root_nodes {
        walk_visible(session, *root, &mut out);
    }
    out
}

fn walk_visible(session: &WaveformSession, id: SignalNodeID, out: &mut Vec<SignalNodeID>) {
    out.push(id);
    let Some(node) = session.node(id) else { return };
    if node.is_group && !node.is_expanded {
        return;
    }
    for child in &node.children {
        walk_visible(session, *child, out);
    }
}

fn time_to_column(t: Time, start_time: Time, end_time: Time, width: u16) -> Option<u16> {
    let duration = (end_time - start_time).max(1) as f64;
    let x = (((t - start_time) as f64 / duration) * width as f64).round();
    if x < 0.0 || x >= width as f64 {
        None
    } else {
        Some(x as u16)
    }
}

fn hash_params(
    params: &PaintParams,
    rows: &[SignalNodeID],
    row_heights: &[u16],
    start_time: Time,
    end_time: Time,
    waveform_max_time: Option<Time>,
) -> u64 {
    let mut hasher = DefaultHasher::new();
    params.area.width.hash(&mut hasher);
    params.area.height.hash(&mut hasher);
    params.device_pixel_ratio.to_bits().hash(&mut hasher);
    params.header_height.hash(&mut hasher);
    params.base_row_height.hash(&mut hasher);
    start_time.hash(&mut hasher);
    end_time.hash(&mut hasher);
    params.session.viewport.total_duration.hash(&mut hasher);
    waveform_max_time.hash(&mut hasher);
    for (id, height) in rows.iter().zip(row_heights.iter()) {
        let Some(node) = params.session.node(*id) else { continue };
        node.handle.hash(&mut hasher);
        node.display_name().hash(&mut hasher);
        node.is_group.hash(&mut hasher);
        height.hash(&mut hasher);
        (node.format.render_type as u8).hash(&mut hasher);
        (node.format.data_format as u8).hash(&mut hasher);
        hash_color(&node.format.color, &mut hasher);
    }
    hasher.finish()
}

fn hash_color(color: &Option<RgbColor>, hasher: &mut DefaultHasher) {
    match color {
        None => 0u8.hash(hasher),
        Some(RgbColor::ThemeDefault) => 1u8.hash(hasher),
        Some(RgbColor::Rgb(r, g, b)) => {
            2u8.hash(hasher);
            r.hash(hasher);
            g.hash(hasher);
            b.hash(hasher);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_signal_row(
    buf: &mut Buffer,
    db: &WaveformDb,
    node: &SignalNode,
    handle: SignalHandle,
    area: Rect,
    row_height: u16,
    row_y: u16,
    start_time: Time,
    end_time: Time,
    waveform_max_time: Option<Time>,
) {
    let Some(data) = generate_signal_draw_commands(
        db,
        handle,
        node.format.data_format,
        start_time,
        end_time,
        area.width as u32,
        waveform_max_time,
    ) else {
        return;
    };

    let color = node
        .format
        .color
        .and_then(|c| c.to_hex())
        .map(|hex| hex_or(&hex, Color::Cyan))
        .unwrap_or_else(|| hex_or(DEFAULT_THEME.default_signal, Color::Cyan));

    let params = DrawParams {
        area,
        row_y,
        row_height,
        start_time,
        end_time,
        waveform_max_time,
        node,
    };

    match node.format.render_type {
        RenderType::Bool => draw_bool_signal(buf, &params, &data, color),
        RenderType::Bus => draw_bus_signal(buf, &params, &data, color),
        RenderType::Event => draw_event_signal(buf, &params, &data, color),
        RenderType::Analog => {
            let range = compute_analog_range(
                db,
                handle,
                node.format.data_format,
                node.format.analog_scaling_mode,
                start_time,
                end_time,
            )
            .unwrap_or(AnalogRange { min: 0.0, max: 1.0 });
            crate::render::analog_render::draw_analog_signal(buf, &params, &data, range, color);
        }
    }
}

fn draw_marker(buf: &mut Buffer, area: Rect, marker: &Marker, start_time: Time, end_time: Time) {
    if !marker.is_set() || marker.time < start_time || marker.time > end_time {
        return;
    }
    let Some(x) = time_to_column(marker.time, start_time, end_time, area.width) else { return };
    let color = marker.color.to_hex().map(|h| hex_or(&h, Color::Green)).unwrap_or(Color::Green);
    let style = Style::default().fg(color);
    for y in area.y..area.bottom() {
        buf.set_string(area.x + x, y, "\u{254e}", style);
    }
    buf.set_string(area.x + x, area.y, &marker.label, style);
}

fn draw_cursor(buf: &mut Buffer, area: Rect, cursor_time: Time, start_time: Time, end_time: Time) {
    if cursor_time < start_time || cursor_time > end_time {
        return;
    }
    let Some(x) = time_to_column(cursor_time, start_time, end_time, area.width) else { return };
    let style = Style::default().fg(hex_or(DEFAULT_THEME.cursor, Color::Red));
    for y in area.y..area.bottom() {
        buf.set_string(area.x + x, y, "\u{2503}", style);
    }
}

fn blit(src: &Buffer, dst: &mut Buffer, area: Rect) {
    for y in area.y..area.bottom() {
        for x in area.x..area.right() {
            *dst.get_mut(x, y) = src.get(x, y).clone();
        }
    }
}

fn hex_or(hex: &str, fallback: Color) -> Color {
    RgbColor::from_hex(hex)
        .and_then(|c| match c {
            RgbColor::Rgb(r, g, b) => Some(Color::Rgb(r, g, b)),
            RgbColor::ThemeDefault => None,
        })
        .unwrap_or(fallback)
}

/// A placeholder node used only to satisfy [`DrawParams::node`] when
/// painting the background fill, which reads none of a node's fields.
fn dummy_node() -> SignalNode {
    SignalNode {
        id: 0,
        name: String::new(),
        handle: None,
        format: DisplayFormat::default(),
        nickname: String::new(),
        children: Vec::new(),
        parent: None,
        is_group: true,
        group_render_mode: None,
        is_expanded: true,
        height_scaling: 1,
        is_multi_bit: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::rendering::DEFAULT_ROW_HEIGHT;
    use crate::db::test_support::FakeBackend;
    use crate::value::RawValue;

    fn db() -> WaveformDb {
        let backend = FakeBackend::single_signal(1, 1, vec![(0, RawValue::Bits(0, 1)), (50, RawValue::Bits(1, 1))]);
        WaveformDb::new(Box::new(backend))
    }

    fn session_with_signal() -> WaveformSession {
        let mut session = WaveformSession::new();
        session.viewport.total_duration = 100;
        session.add_root_signal("top.clk".into(), 1);
        session
    }

    fn params<'a>(db: &'a WaveformDb, session: &'a WaveformSession, cursor_only: bool) -> PaintParams<'a> {
        PaintParams {
            area: Rect::new(0, 0, 40, 10),
            header_height: 2,
            db,
            session,
            base_row_height: DEFAULT_ROW_HEIGHT.min(6),
            device_pixel_ratio: 1.0,
            cursor_only,
            show_debug_counters: false,
        }
    }

    #[test]
    fn second_identical_paint_reuses_cache_without_rerendering() {
        let db = db();
        let session = session_with_signal();
        let mut canvas = CanvasOrchestrator::new();
        let mut buf = Buffer::empty(Rect::new(0, 0, 40, 10));
        let p = params(&db, &session, false);
        canvas.paint(&mut buf, &p);
        assert_eq!(canvas.render_frames(), 1);
        canvas.paint(&mut buf, &p);
        assert_eq!(canvas.render_frames(), 1, "identical params must not trigger a second render");
        assert_eq!(canvas.paint_frames(), 2);
    }

    #[test]
    fn viewport_change_invalidates_cache() {
        let db = db();
        let mut session = session_with_signal();
        let mut canvas = CanvasOrchestrator::new();
        let mut buf = Buffer::empty(Rect::new(0, 0, 40, 10));
        canvas.paint(&mut buf, &params(&db, &session, false));
        session.viewport.right = 0.5;
        canvas.paint(&mut buf, &params(&db, &session, false));
        assert_eq!(canvas.render_frames(), 2);
    }

    #[test]
    fn cursor_only_fast_path_does_not_rerender() {
        let db = db();
        let mut session = session_with_signal();
        let mut canvas = CanvasOrchestrator::new();
        let mut buf = Buffer::empty(Rect::new(0, 0, 40, 10));
        canvas.paint(&mut buf, &params(&db, &session, false));
        session.cursor_time = 20;
        canvas.paint(&mut buf, &params(&db, &session, true));
        assert_eq!(canvas.render_frames(), 1, "cursor-only moves must not re-render the waveform layer");
    }

    #[test]
    fn invalidate_forces_a_rerender_on_next_paint() {
        let db = db();
        let session = session_with_signal();
        let mut canvas = CanvasOrchestrator::new();
        let mut buf = Buffer::empty(Rect::new(0, 0, 40, 10));
        canvas.paint(&mut buf, &params(&db, &session, false));
        canvas.invalidate();
        canvas.paint(&mut buf, &params(&db, &session, false));
        assert_eq!(canvas.render_frames(), 2);
    }
}
