//! Controller + Event Bus (§4.5): the sole mutator of
//! [`crate::session::WaveformSession`]. Every public method here validates,
//! applies the change, then publishes one or more [`events::Event`]s; no
//! other module is allowed to reach into the session's fields directly.
//!
//! Grounded on `original_source/wavescout/waveform_controller.py` for the
//! operation set and exact clamp arithmetic (offset-then-reclamp order
//! preserved verbatim), and on `application/event_bus.py` for the
//! publish/subscribe contract (generalized into [`events::EventBus`]).

pub mod events;

use std::collections::HashSet;

use crate::config::rendering::MARKER_LABELS;
use crate::config::DEFAULT_THEME;
use crate::db::WaveformDb;
use crate::session::{AnalysisKind, ClockSignal, Marker, WaveformSession};
use crate::types::{RenderType, RgbColor, SignalHandle, SignalNodeID, Time};
use crate::value::RawValue;
use events::{Event, EventBus, EventKind, FormatChange, StructureChangeKind};

/// How a group of nodes should render together, passed to `group_nodes`.
pub use crate::types::GroupRenderMode;

pub struct WaveformController {
    session: Option<WaveformSession>,
    selected_ids: HashSet<SignalNodeID>,
    bus: EventBus,
}

impl Default for WaveformController {
    fn default() -> Self {
        Self {
            session: None,
            selected_ids: HashSet::new(),
            bus: EventBus::new(),
        }
    }
}

impl WaveformController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: Box<dyn FnMut(&Event) + Send>) {
        self.bus.subscribe(kind, handler);
    }

    pub fn session(&self) -> Option<&WaveformSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut WaveformSession> {
        self.session.as_mut()
    }

    // ---- Session lifecycle ----

    /// Replaces the current session atomically and announces it, mirroring
    /// `set_session`'s immediate re-emit of viewport/cursor/benchmark so
    /// freshly-subscribed views refresh without a separate initial sync.
    pub fn set_session(&mut self, session: WaveformSession, uri: String) {
        self.selected_ids = session.selected_nodes.iter().copied().collect();
        self.session = Some(session);
        self.bus.publish(Event::SessionLoaded { uri });
        let vp = self.session.as_ref().unwrap().viewport;
        self.bus.publish(Event::ViewportChanged {
            old_left: vp.left,
            old_right: vp.right,
            new_left: vp.left,
            new_right: vp.right,
        });
        let cursor = self.session.as_ref().unwrap().cursor_time;
        self.bus.publish(Event::CursorMoved { old_time: cursor, new_time: cursor });
    }

    pub fn close_session(&mut self) {
        if self.session.take().is_some() {
            self.selected_ids.clear();
            self.bus.publish(Event::SessionClosed);
        }
    }

    // ---- Selection ----

    pub fn set_selection_by_ids(&mut self, ids: impl IntoIterator<Item = SignalNodeID>) {
        let Some(session) = self.session.as_mut() else { return };
        let new_ids: HashSet<SignalNodeID> = ids.into_iter().collect();
        if new_ids == self.selected_ids {
            return;
        }
        let old_ids: Vec<SignalNodeID> = self.selected_ids.iter().copied().collect();
        self.selected_ids = new_ids.clone();
        session.selected_nodes = session
            .iter_all_nodes()
            .into_iter()
            .filter(|id| new_ids.contains(id))
            .collect();
        let new_ids_vec: Vec<SignalNodeID> = session.selected_nodes.clone();
        self.bus.publish(Event::SelectionChanged { old_ids, new_ids: new_ids_vec });
    }

    pub fn selected_ids(&self) -> HashSet<SignalNodeID> {
        self.selected_ids.clone()
    }

    // ---- Cursor / benchmark ----

    pub fn set_cursor_time(&mut self, time: Time) {
        let Some(session) = self.session.as_mut() else { return };
        if session.cursor_time != time {
            let old_time = session.cursor_time;
            session.cursor_time = time;
            self.bus.publish(Event::CursorMoved { old_time, new_time: time });
        }
    }

    pub fn navigate_to_time(&mut self, time: Time) {
        self.set_cursor_time(time);
    }

    pub fn navigate_to_clock_cycle(&mut self, n: i64) {
        let Some(session) = self.session.as_ref() else { return };
        let Some((period, phase, _)) = session.clock_signal else { return };
        let time = phase + period * n;
        self.set_cursor_time(time);
    }

    pub fn toggle_benchmark_mode(&mut self) {
        let Some(session) = self.session.as_mut() else { return };
        session.benchmark_mode = !session.benchmark_mode;
        let enabled = session.benchmark_mode;
        self.bus.publish(Event::BenchmarkModeChanged { enabled });
    }

    // ---- Tree operations ----

    pub fn insert_nodes(&mut self, parent_id: Option<SignalNodeID>, names_and_handles: Vec<(String, u64)>) -> Vec<SignalNodeID> {
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        let mut ids = Vec::new();
        for (name, handle) in names_and_handles {
            let id = match parent_id {
                Some(parent) => session.add_child_signal(parent, name, handle),
                None => session.add_root_signal(name, handle),
            };
            ids.push(id);
        }
        self.bus.publish(Event::StructureChanged {
            kind: StructureChangeKind::Insert,
            affected_ids: ids.clone(),
            parent_id,
            insert_row: None,
        });
        ids
    }

    pub fn delete_nodes(&mut self, ids: Vec<SignalNodeID>) {
        let Some(session) = self.session.as_mut() else { return };
        for id in &ids {
            if session.clock_signal.map(|(_, _, node)| node) == Some(*id) {
                session.clock_signal = None;
            }
            if session.sampling_signal == Some(*id) {
                session.sampling_signal = None;
            }
            session.remove_node(*id);
        }
        for id in &ids {
            self.selected_ids.remove(id);
        }
        self.bus.publish(Event::StructureChanged {
            kind: StructureChangeKind::Delete,
            affected_ids: ids,
            parent_id: None,
            insert_row: None,
        });
    }

    pub fn move_nodes(&mut self, ids: Vec<SignalNodeID>, new_parent_id: Option<SignalNodeID>, row: usize) {
        let Some(session) = self.session.as_mut() else { return };
        for id in &ids {
            let old_parent = session.node(*id).and_then(|n| n.parent);
            match old_parent {
                Some(parent) => {
                    if let Some(parent_node) = session.node_mut(parent) {
                        parent_node.children.retain(|c| c != id);
                    }
                }
                None => session.root_nodes.retain(|c| c != id),
            }
            if let Some(node) = session.node_mut(*id) {
                node.parent = new_parent_id;
            }
            match new_parent_id {
                Some(parent) => {
                    if let Some(parent_node) = session.node_mut(parent) {
                        let insert_at = row.min(parent_node.children.len());
                        parent_node.children.insert(insert_at, *id);
                    }
                }
                None => {
                    let insert_at = row.min(session.root_nodes.len());
                    session.root_nodes.insert(insert_at, *id);
                }
            }
        }
        self.bus.publish(Event::StructureChanged {
            kind: StructureChangeKind::Move,
            affected_ids: ids,
            parent_id: new_parent_id,
            insert_row: Some(row),
        });
    }

    pub fn group_nodes(&mut self, ids: Vec<SignalNodeID>, name: String, mode: GroupRenderMode) -> Option<SignalNodeID> {
        let Some(session) = self.session.as_mut() else { return None };
        let parent_id = ids.first().and_then(|id| session.node(*id).and_then(|n| n.parent));
        let group_id = session.add_group(name, parent_id);
        if let Some(node) = session.node_mut(group_id) {
            node.group_render_mode = Some(mode);
        }
        drop(session);
        self.move_nodes(ids.clone(), Some(group_id), 0);
        let mut affected = vec![group_id];
        affected.extend(ids);
        self.bus.publish(Event::StructureChanged {
            kind: StructureChangeKind::Group,
            affected_ids: affected,
            parent_id,
            insert_row: None,
        });
        Some(group_id)
    }

    pub fn ungroup(&mut self, id: SignalNodeID) {
        let Some(session) = self.session.as_mut() else { return };
        let Some(group) = session.node(id).cloned() else { return };
        if !group.is_group {
            return;
        }
        let parent = group.parent;
        let children = group.children.clone();
        drop(session);
        self.move_nodes(children.clone(), parent, 0);
        if let Some(session) = self.session.as_mut() {
            session.remove_node(id);
        }
        let mut affected = children;
        affected.push(id);
        self.bus.publish(Event::StructureChanged {
            kind: StructureChangeKind::Ungroup,
            affected_ids: affected,
            parent_id: parent,
            insert_row: None,
        });
    }

    pub fn set_node_expanded(&mut self, id: SignalNodeID, expanded: bool) {
        if let Some(session) = self.session.as_mut() {
            if let Some(node) = session.node_mut(id) {
                node.is_expanded = expanded;
            }
        }
    }

    pub fn rename_node(&mut self, id: SignalNodeID, nickname: String) {
        let Some(session) = self.session.as_mut() else { return };
        if let Some(node) = session.node_mut(id) {
            node.nickname = nickname.clone();
        }
        self.bus.publish(Event::FormatChanged {
            node_id: id,
            changes: vec![FormatChange::Nickname(nickname)],
        });
    }

    // ---- Formatting ----

    /// Applies `changes` to `id`'s format, then (§8 scenario 5,
    /// `signal_names_view.py::_set_render_type_with_scaling`) auto-bumps
    /// `height_scaling` from 1 to 3 when this call is what switches the
    /// node into `Analog` render mode, so a freshly-analog signal isn't
    /// squeezed into a single terminal row. The bump only fires when the
    /// node's height is still the untouched default (1) and this batch of
    /// changes didn't itself set a height — an explicit height change in
    /// the same call always wins. Once bumped, the height is ordinary
    /// user-visible state: switching back to a non-Analog render type
    /// leaves it at 3 (sticky).
    pub fn set_node_format(&mut self, id: SignalNodeID, changes: Vec<FormatChange>) {
        let Some(session) = self.session.as_mut() else { return };
        let Some(node) = session.node_mut(id) else { return };
        let old_render_type = node.format.render_type;
        let entering_analog = old_render_type != RenderType::Analog
            && changes.iter().any(|c| matches!(c, FormatChange::RenderType(RenderType::Analog)));
        let explicit_height_change = changes.iter().any(|c| matches!(c, FormatChange::HeightScaling(_)));

        for change in &changes {
            match change {
                FormatChange::DataFormat(f) => node.format.data_format = *f,
                FormatChange::RenderType(t) => node.format.render_type = *t,
                FormatChange::Color(c) => node.format.color = Some(*c),
                FormatChange::Nickname(n) => node.nickname = n.clone(),
                FormatChange::HeightScaling(h) => node.height_scaling = *h,
                FormatChange::AnalogScalingMode(m) => node.format.analog_scaling_mode = *m,
            }
        }

        let mut changes = changes;
        if entering_analog && !explicit_height_change && node.height_scaling == 1 {
            node.height_scaling = 3;
            changes.push(FormatChange::HeightScaling(3));
        }

        self.bus.publish(Event::FormatChanged { node_id: id, changes });
    }

    // ---- Viewport operations ----

    pub fn zoom_to_fit(&mut self) {
        let Some(session) = self.session.as_mut() else { return };
        let vp = &mut session.viewport;
        let (old_left, old_right) = (vp.left, vp.right);
        vp.left = 0.0;
        vp.right = 1.0;
        self.bus.publish(Event::ViewportChanged { old_left, old_right, new_left: 0.0, new_right: 1.0 });
    }

    pub fn go_to_start(&mut self) {
        let Some(session) = self.session.as_mut() else { return };
        let vp = &mut session.viewport;
        let (old_left, old_right) = (vp.left, vp.right);
        let width = vp.width();
        vp.left = 0.0;
        vp.right = width;
        self.bus.publish(Event::ViewportChanged { old_left, old_right, new_left: vp.left, new_right: vp.right });
    }

    pub fn go_to_end(&mut self) {
        let Some(session) = self.session.as_mut() else { return };
        let vp = &mut session.viewport;
        let (old_left, old_right) = (vp.left, vp.right);
        let width = vp.width();
        vp.left = 1.0 - width;
        vp.right = 1.0;
        self.bus.publish(Event::ViewportChanged { old_left, old_right, new_left: vp.left, new_right: vp.right });
    }

    pub fn pan_viewport(&mut self, pan_distance: f64) {
        let Some(session) = self.session.as_mut() else { return };
        let vp = &mut session.viewport;
        let (old_left, old_right) = (vp.left, vp.right);
        let mut new_left = vp.left + pan_distance;
        let mut new_right = vp.right + pan_distance;
        let width = vp.width();
        let edge_space = vp.config.edge_space;
        let min_allowed_left = -(width * edge_space);
        let max_allowed_right = 1.0 + width * edge_space;
        if new_left < min_allowed_left {
            let offset = min_allowed_left - new_left;
            new_left = min_allowed_left;
            new_right += offset;
        } else if new_right > max_allowed_right {
            let offset = new_right - max_allowed_right;
            new_left -= offset;
            new_right = max_allowed_right;
        }
        vp.left = new_left;
        vp.right = new_right;
        self.bus.publish(Event::ViewportChanged { old_left, old_right, new_left, new_right });
    }

    /// Zoom around a relative anchor (`None` = viewport center).
    /// `zoom_factor < 1.0` zooms in, `> 1.0` zooms out.
    pub fn zoom_viewport(&mut self, zoom_factor: f64, mouse_relative: Option<f64>) {
        let Some(session) = self.session.as_mut() else { return };
        let vp = &mut session.viewport;
        let (old_left, old_right) = (vp.left, vp.right);
        let center = mouse_relative.unwrap_or((vp.left + vp.right) / 2.0);
        let left_distance = center - vp.left;
        let right_distance = vp.right - center;
        let mut new_left = center - left_distance * zoom_factor;
        let mut new_right = center + right_distance * zoom_factor;

        let min_width = minimum_zoom_width(vp);
        if new_right - new_left < min_width {
            let half = min_width / 2.0;
            new_left = center - half;
            new_right = center + half;
        }
        let max_width = 1.0 + 2.0 * vp.config.edge_space;
        if new_right - new_left > max_width {
            new_left = -vp.config.edge_space;
            new_right = 1.0 + vp.config.edge_space;
        }
        vp.left = new_left;
        vp.right = new_right;
        self.bus.publish(Event::ViewportChanged { old_left, old_right, new_left, new_right });
    }

    /// Convert two pixel x's into viewport times and zoom to that region
    /// (§4.5 "ROI zoom": clamp, enforce min width, swap if reversed).
    pub fn zoom_to_roi(&mut self, start_time: Time, end_time: Time) {
        let Some(session) = self.session.as_mut() else { return };
        let total = session.viewport.total_duration;
        if total <= 0 {
            return;
        }
        let (start_time, end_time) = if start_time <= end_time { (start_time, end_time) } else { (end_time, start_time) };
        let mut new_left = start_time as f64 / total as f64;
        let mut new_right = end_time as f64 / total as f64;
        let min_width = minimum_zoom_width(&session.viewport);
        if new_right - new_left < min_width {
            let center = (new_left + new_right) / 2.0;
            new_left = center - min_width / 2.0;
            new_right = center + min_width / 2.0;
        }
        let vp = &mut session.viewport;
        let old_left = vp.left;
        let old_right = vp.right;
        vp.left = new_left;
        vp.right = new_right;
        self.bus.publish(Event::ViewportChanged { old_left, old_right, new_left, new_right });
    }

    /// Navigate viewport so the marker at `index` sits `pixel_offset`
    /// pixels from the left edge of a `canvas_width`-wide canvas.
    pub fn navigate_to_marker(&mut self, index: usize, pixel_offset: u32, canvas_width: u32) {
        let Some(session) = self.session.as_ref() else { return };
        if index >= MARKER_LABELS.len() {
            return;
        }
        let Some(marker) = self.get_marker(index) else { return };
        if session.viewport.total_duration <= 0 {
            return;
        }
        let session = self.session.as_mut().unwrap();
        let vp = &mut session.viewport;
        let old_left = vp.left;
        let old_right = vp.right;
        let viewport_width = vp.right - vp.left;
        let offset_normalized = (pixel_offset as f64 / canvas_width as f64) * viewport_width;
        let marker_normalized = marker.time as f64 / vp.total_duration as f64;

        let mut new_left = marker_normalized - offset_normalized;
        let mut new_right = new_left + viewport_width;

        let edge_space = vp.config.edge_space;
        let min_allowed_left = -(viewport_width * edge_space);
        let max_allowed_right = 1.0 + viewport_width * edge_space;
        if new_left < min_allowed_left {
            let offset = min_allowed_left - new_left;
            new_left = min_allowed_left;
            new_right += offset;
        } else if new_right > max_allowed_right {
            let offset = new_right - max_allowed_right;
            new_left -= offset;
            new_right = max_allowed_right;
        }
        vp.left = new_left;
        vp.right = new_right;
        self.bus.publish(Event::ViewportChanged { old_left, old_right, new_left, new_right });
    }

    // ---- Markers ----

    pub fn add_marker(&mut self, index: usize, time: Time, color: Option<RgbColor>) {
        let Some(session) = self.session.as_mut() else { return };
        if index >= MARKER_LABELS.len() {
            return;
        }
        while session.markers.len() <= index {
            session.markers.push(Marker::placeholder());
        }
        let color = color.unwrap_or_else(|| {
            let existing = &session.markers[index];
            if existing.is_set() {
                existing.color
            } else {
                RgbColor::from_hex(DEFAULT_THEME.marker_default_color).unwrap_or(RgbColor::ThemeDefault)
            }
        });
        session.markers[index] = Marker {
            time,
            label: MARKER_LABELS[index].to_string(),
            color,
        };
        self.bus.publish(Event::MarkerAdded { slot: index, time });
    }

    pub fn remove_marker(&mut self, index: usize) {
        let Some(session) = self.session.as_mut() else { return };
        if index >= session.markers.len() {
            return;
        }
        session.markers[index] = Marker::placeholder();
        self.bus.publish(Event::MarkerRemoved { slot: index });
    }

    pub fn update_marker_time(&mut self, index: usize, time: Time) {
        let Some(session) = self.session.as_mut() else { return };
        let Some(marker) = session.markers.get_mut(index) else { return };
        if marker.is_set() {
            let old_time = marker.time;
            marker.time = time;
            self.bus.publish(Event::MarkerMoved { slot: index, old_time, new_time: time });
        }
    }

    pub fn update_marker_color(&mut self, index: usize, color: RgbColor) {
        let Some(session) = self.session.as_mut() else { return };
        let Some(marker) = session.markers.get_mut(index) else { return };
        if marker.is_set() {
            marker.color = color;
        }
    }

    pub fn get_marker(&self, index: usize) -> Option<Marker> {
        let session = self.session.as_ref()?;
        if index >= MARKER_LABELS.len() {
            return None;
        }
        session.markers.get(index).filter(|m| m.is_set()).cloned()
    }

    pub fn toggle_marker_at_cursor(&mut self, index: usize) {
        let Some(session) = self.session.as_ref() else { return };
        if index >= MARKER_LABELS.len() {
            return;
        }
        let cursor_time = session.cursor_time;
        match self.get_marker(index) {
            Some(existing) if existing.time == cursor_time => self.remove_marker(index),
            _ => self.add_marker(index, cursor_time, None),
        }
    }

    // ---- Clock & sampling ----

    /// Sets the clock signal from an already-known `(period, phase, node)`
    /// triple, e.g. one restored verbatim from a persisted session
    /// document. User-driven "pick this signal as the clock" flows should
    /// go through [`Self::detect_and_set_clock_signal`] instead, which
    /// derives `period`/`phase` from the signal itself.
    pub fn set_clock_signal(&mut self, signal: ClockSignal) {
        if let Some(session) = self.session.as_mut() {
            session.clock_signal = Some(signal);
        }
    }

    /// §4.5 "Clock period detection": derives `(period, phase)` from
    /// `node`'s own transitions and sets it as the session's clock signal.
    /// A 1-bit wire uses the minimum positive-edge interval, with phase set
    /// to the first positive edge; any other bit width is treated as a
    /// free-running counter and its period is derived from `Δtime / Δvalue`
    /// between the first transition and the next one with a different
    /// value. No-op if the node isn't a signal, has no handle in `db`, or
    /// doesn't carry enough transitions to detect a period from (existing
    /// `clock_signal`, if any, is left untouched).
    pub fn detect_and_set_clock_signal(&mut self, db: &WaveformDb, node: SignalNodeID) {
        let Some(session) = self.session.as_ref() else { return };
        let Some(handle) = session.node(node).and_then(|n| n.handle) else { return };
        let Some((period, phase)) = detect_clock_period_phase(db, handle) else { return };
        self.set_clock_signal((period, phase, node));
    }

    pub fn clear_clock_signal(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.clock_signal = None;
        }
    }

    pub fn is_clock_signal(&self, node: SignalNodeID) -> bool {
        self.session
            .as_ref()
            .and_then(|s| s.clock_signal)
            .map(|(_, _, n)| n == node)
            .unwrap_or(false)
    }

    pub fn set_sampling_signal(&mut self, node: SignalNodeID) {
        if let Some(session) = self.session.as_mut() {
            session.sampling_signal = Some(node);
        }
    }

    pub fn analysis_mode_kind(&self) -> AnalysisKind {
        self.session.as_ref().map(|s| s.analysis_mode.mode).unwrap_or_default()
    }
}

/// `_get_minimum_zoom_width`: the smaller viewport width is bounded both by
/// a configured minimum time and by needing at least two timescale units
/// across the whole viewport (Open Question decision, see DESIGN.md).
fn minimum_zoom_width(vp: &crate::session::Viewport) -> f64 {
    if vp.total_duration <= 0 {
        return 1e-4;
    }
    let min_width = vp.config.minimum_width_time as f64 / vp.total_duration as f64;
    let timescale_min_width = (1.0 / vp.total_duration as f64) * 2.0;
    min_width.max(timescale_min_width)
}

/// §4.5 "Clock period detection", consuming the signal's own transitions
/// (via `db`'s cached full-range decode, the facade's equivalent of
/// `db.transitions(handle, …)`) rather than a value the caller supplies.
fn detect_clock_period_phase(db: &WaveformDb, handle: SignalHandle) -> Option<(Time, Time)> {
    let max_time = db.max_time();
    let transitions = db.get_signal(handle, 0, max_time).ok()?;
    if transitions.len() < 2 {
        return None;
    }

    if db.bit_width(handle) == Some(1) {
        // 1-bit wire (or event signal, which only ever carries a single
        // firing value): minimum positive-edge interval, phase = first
        // positive edge.
        let mut positive_edges = Vec::new();
        let mut prev_bit: Option<u128> = None;
        for t in &transitions {
            if let RawValue::Bits(bit, _) = t.value {
                if prev_bit == Some(0) && bit != 0 {
                    positive_edges.push(t.time);
                }
                prev_bit = Some(bit);
            }
        }
        if positive_edges.len() < 2 {
            return None;
        }
        let period = positive_edges.windows(2).map(|w| w[1] - w[0]).min()?;
        if period <= 0 {
            return None;
        }
        Some((period, positive_edges[0]))
    } else {
        // Wider signal: treat as a free-running counter and derive the
        // period from Δtime / Δvalue between the first transition and the
        // next one with a distinct numeric value.
        let first = &transitions[0];
        let first_value = bits_as_f64(&first.value)?;
        for t in &transitions[1..] {
            let Some(value) = bits_as_f64(&t.value) else { continue };
            let delta_value = value - first_value;
            if delta_value == 0.0 {
                continue;
            }
            let delta_time = (t.time - first.time) as f64;
            let period = (delta_time / delta_value).round() as Time;
            if period > 0 {
                return Some((period, first.time));
            }
        }
        None
    }
}

fn bits_as_f64(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Bits(raw, _) => Some(*raw as f64),
        RawValue::Real(f) => Some(*f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::WaveformSession;

    fn controller_with_session() -> WaveformController {
        let mut controller = WaveformController::new();
        let mut session = WaveformSession::new();
        session.viewport.total_duration = 1000;
        session.add_root_signal("top.clk".into(), 1);
        controller.set_session(session, "trace.vcd".into());
        controller
    }

    #[test]
    fn zoom_viewport_respects_minimum_width() {
        let mut controller = controller_with_session();
        controller.zoom_viewport(0.0001, Some(0.5));
        let vp = controller.session().unwrap().viewport;
        assert!(vp.width() > 0.0);
        assert!(vp.right > vp.left);
    }

    #[test]
    fn pan_viewport_clamps_at_edge_space() {
        let mut controller = controller_with_session();
        controller.pan_viewport(-10.0);
        let vp = controller.session().unwrap().viewport;
        let edge_space = vp.config.edge_space;
        assert!(vp.left >= -(vp.width() * edge_space) - 1e-9);
    }

    #[test]
    fn add_and_remove_marker_round_trip() {
        let mut controller = controller_with_session();
        controller.add_marker(0, 500, None);
        let marker = controller.get_marker(0).unwrap();
        assert_eq!(marker.time, 500);
        assert_eq!(marker.label, "A");
        controller.remove_marker(0);
        assert!(controller.get_marker(0).is_none());
    }

    #[test]
    fn toggle_marker_at_cursor_adds_then_removes() {
        let mut controller = controller_with_session();
        controller.set_cursor_time(42);
        controller.toggle_marker_at_cursor(1);
        assert_eq!(controller.get_marker(1).unwrap().time, 42);
        controller.toggle_marker_at_cursor(1);
        assert!(controller.get_marker(1).is_none());
    }

    #[test]
    fn delete_nodes_clears_clock_signal_reference() {
        let mut controller = controller_with_session();
        let root_id = controller.session().unwrap().root_nodes[0];
        controller.set_clock_signal((10, 0, root_id));
        controller.delete_nodes(vec![root_id]);
        assert!(!controller.is_clock_signal(root_id));
        assert!(controller.session().unwrap().clock_signal.is_none());
    }

    #[test]
    fn switching_to_analog_auto_bumps_height_from_one() {
        let mut controller = controller_with_session();
        let root_id = controller.session().unwrap().root_nodes[0];
        assert_eq!(controller.session().unwrap().node(root_id).unwrap().height_scaling, 1);

        controller.set_node_format(root_id, vec![FormatChange::RenderType(RenderType::Analog)]);
        assert_eq!(controller.session().unwrap().node(root_id).unwrap().height_scaling, 3);

        // Sticky: switching back to Bus leaves the bumped height alone.
        controller.set_node_format(root_id, vec![FormatChange::RenderType(RenderType::Bus)]);
        assert_eq!(controller.session().unwrap().node(root_id).unwrap().height_scaling, 3);
    }

    #[test]
    fn switching_to_analog_does_not_override_explicit_height_in_same_call() {
        let mut controller = controller_with_session();
        let root_id = controller.session().unwrap().root_nodes[0];

        controller.set_node_format(
            root_id,
            vec![FormatChange::RenderType(RenderType::Analog), FormatChange::HeightScaling(2)],
        );
        assert_eq!(controller.session().unwrap().node(root_id).unwrap().height_scaling, 2);
    }

    #[test]
    fn re_entering_analog_does_not_re_bump_already_customized_height() {
        let mut controller = controller_with_session();
        let root_id = controller.session().unwrap().root_nodes[0];

        controller.set_node_format(root_id, vec![FormatChange::HeightScaling(4)]);
        controller.set_node_format(root_id, vec![FormatChange::RenderType(RenderType::Analog)]);
        assert_eq!(controller.session().unwrap().node(root_id).unwrap().height_scaling, 4);
    }

    #[test]
    fn group_and_ungroup_round_trip() {
        let mut controller = controller_with_session();
        let root_id = controller.session().unwrap().root_nodes[0];
        let group_id = controller
            .group_nodes(vec![root_id], "Bus".into(), GroupRenderMode::SeparateRows)
            .unwrap();
        assert_eq!(controller.session().unwrap().node(root_id).unwrap().parent, Some(group_id));
        controller.ungroup(group_id);
        assert!(controller.session().unwrap().node(group_id).is_none());
        assert!(controller.session().unwrap().root_nodes.contains(&root_id));
    }

    #[test]
    fn detect_and_set_clock_signal_from_positive_edges() {
        use crate::db::test_support::FakeBackend;
        use crate::db::WaveformDb;

        let mut controller = controller_with_session();
        let root_id = controller.session().unwrap().root_nodes[0];
        let db = WaveformDb::new(Box::new(FakeBackend::single_signal(
            1,
            1,
            vec![
                (0, RawValue::Bits(0, 1)),
                (50_000, RawValue::Bits(1, 1)),
                (100_000, RawValue::Bits(0, 1)),
                (150_000, RawValue::Bits(1, 1)),
                (200_000, RawValue::Bits(0, 1)),
            ],
        )));

        controller.detect_and_set_clock_signal(&db, root_id);

        let (period, phase, node) = controller.session().unwrap().clock_signal.unwrap();
        assert_eq!(period, 100_000);
        assert_eq!(phase, 50_000);
        assert_eq!(node, root_id);
    }

    #[test]
    fn detect_and_set_clock_signal_from_bus_counter() {
        use crate::db::test_support::FakeBackend;
        use crate::db::WaveformDb;

        let mut controller = controller_with_session();
        let root_id = controller.session().unwrap().root_nodes[0];
        let db = WaveformDb::new(Box::new(FakeBackend::single_signal(
            1,
            8,
            vec![
                (0, RawValue::Bits(0, 8)),
                (1_000, RawValue::Bits(1, 8)),
                (2_000, RawValue::Bits(2, 8)),
            ],
        )));

        controller.detect_and_set_clock_signal(&db, root_id);

        let (period, phase, _) = controller.session().unwrap().clock_signal.unwrap();
        assert_eq!(period, 1_000);
        assert_eq!(phase, 0);
    }

    #[test]
    fn detect_and_set_clock_signal_is_noop_without_enough_transitions() {
        use crate::db::test_support::FakeBackend;
        use crate::db::WaveformDb;

        let mut controller = controller_with_session();
        let root_id = controller.session().unwrap().root_nodes[0];
        let db = WaveformDb::new(Box::new(FakeBackend::single_signal(1, 1, vec![(0, RawValue::Bits(0, 1))])));

        controller.detect_and_set_clock_signal(&db, root_id);

        assert!(controller.session().unwrap().clock_signal.is_none());
    }
}
