//! Session Model (§4.4): the tree of displayed signals, the viewport, and
//! markers — everything describing *what a user is looking at*, as opposed
//! to [`crate::db::WaveformDb`] which holds the waveform data itself.
//!
//! Grounded field-for-field on `original_source/wavescout/data_model.py`.
//! The one structural departure is `SignalNode`: the Python dataclass holds
//! a `parent: Optional[SignalNode]` back-reference (a `Rc<RefCell<_>>` cycle
//! in a naive Rust port); per §9's "Pointer graphs" redesign note this
//! becomes an arena of nodes addressed by [`SignalNodeID`], with `parent`
//! and `children` stored as ids rather than owned/shared references.

pub mod document;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    AnalogScalingMode, DataFormat, DisplayFormat, GroupRenderMode, NodeIdSource, RenderType,
    RgbColor, SignalHandle, SignalNodeID, Time, TimeUnit, Timescale,
};

/// A node in the signal/group tree. Can be a signal (leaf, `handle: Some`)
/// or a group (internal, `handle: None`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalNode {
    pub id: SignalNodeID,
    pub name: String,
    pub handle: Option<SignalHandle>,
    pub format: DisplayFormat,
    pub nickname: String,
    pub children: Vec<SignalNodeID>,
    pub parent: Option<SignalNodeID>,
    pub is_group: bool,
    pub group_render_mode: Option<GroupRenderMode>,
    pub is_expanded: bool,
    pub height_scaling: u8,
    pub is_multi_bit: bool,
}

impl SignalNode {
    fn new_signal(id: SignalNodeID, name: String, handle: SignalHandle) -> Self {
        Self {
            id,
            name,
            handle: Some(handle),
            format: DisplayFormat::default(),
            nickname: String::new(),
            children: Vec::new(),
            parent: None,
            is_group: false,
            group_render_mode: None,
            is_expanded: true,
            height_scaling: 1,
            is_multi_bit: false,
        }
    }

    fn new_group(id: SignalNodeID, name: String) -> Self {
        Self {
            id,
            name,
            handle: None,
            format: DisplayFormat::default(),
            nickname: String::new(),
            children: Vec::new(),
            parent: None,
            is_group: true,
            group_render_mode: Some(GroupRenderMode::SeparateRows),
            is_expanded: true,
            height_scaling: 1,
            is_multi_bit: false,
        }
    }

    /// The name to show in the UI: the nickname if set, else the full path.
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.name
        } else {
            &self.nickname
        }
    }
}

/// Configuration for viewport behavior and constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub edge_space: f64,
    pub minimum_width_time: Time,
    pub scroll_sensitivity: f64,
    pub zoom_wheel_factor: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            edge_space: 0.2,
            minimum_width_time: 10,
            scroll_sensitivity: 0.05,
            zoom_wheel_factor: 1.1,
        }
    }
}

/// The visible window into the waveform, in normalized `[0.0, 1.0]`
/// coordinates relative to `total_duration`. Values outside `[0, 1]`
/// represent the configured edge space beyond the recorded waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: f64,
    pub right: f64,
    pub total_duration: Time,
    pub config: ViewportConfig,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            left: 0.0,
            right: 1.0,
            total_duration: 1_000_000,
            config: ViewportConfig::default(),
        }
    }
}

impl Viewport {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn zoom_level(&self) -> f64 {
        let width = self.width();
        if width > 0.0 {
            1.0 / width
        } else {
            1.0
        }
    }

    pub fn start_time(&self) -> Time {
        (self.left * self.total_duration as f64) as Time
    }

    pub fn end_time(&self) -> Time {
        (self.right * self.total_duration as f64) as Time
    }

    pub fn time_to_relative(&self, time: Time) -> f64 {
        if self.total_duration > 0 {
            time as f64 / self.total_duration as f64
        } else {
            0.0
        }
    }

    pub fn relative_to_time(&self, relative: f64) -> Time {
        (relative * self.total_duration as f64) as Time
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub time: Time,
    pub label: String,
    pub color: RgbColor,
}

impl Marker {
    /// A placeholder occupying a marker slot index without being "set"
    /// (§4.5: negative time marks a removed/never-set marker, matching the
    /// Python original's `Marker(time=-1, ...)` sentinel).
    pub fn placeholder() -> Self {
        Self {
            time: -1,
            label: String::new(),
            color: RgbColor::ThemeDefault,
        }
    }

    pub fn is_set(&self) -> bool {
        self.time >= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisKind {
    None,
    Min,
    Max,
    Avg,
    RangeMin,
    RangeMax,
    CursorDelta,
}

impl Default for AnalysisKind {
    fn default() -> Self {
        AnalysisKind::None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMode {
    pub mode: AnalysisKind,
    pub range_start: Option<Time>,
    pub range_end: Option<Time>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRulerConfig {
    pub tick_density: f64,
    pub text_size: u16,
    pub time_unit: TimeUnit,
    pub show_grid_lines: bool,
    pub grid_color: RgbColor,
    pub grid_style: GridStyle,
    pub grid_opacity: f64,
    /// §3.1's nice-number rungs the ruler rounds a raw tick step up to
    /// (ascending, each `< 10.0`, multiplied by a power of ten by the
    /// ruler's tick-placement step).
    pub nice_numbers: [f64; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridStyle {
    Solid,
    Dashed,
    Dotted,
}

impl Default for TimeRulerConfig {
    fn default() -> Self {
        Self {
            tick_density: 0.8,
            text_size: 10,
            time_unit: TimeUnit::Nanoseconds,
            show_grid_lines: true,
            grid_color: RgbColor::from_hex("#3e3e42").unwrap(),
            grid_style: GridStyle::Solid,
            grid_opacity: 0.4,
            nice_numbers: [1.0, 2.0, 2.5, 5.0],
        }
    }
}

/// A clock signal used to derive a periodic grid overlay: (period, phase
/// offset, node id).
pub type ClockSignal = (Time, Time, SignalNodeID);

/// The full view-state of one open waveform: tree of displayed signals,
/// viewport, markers, cursor, selection, and ruler/analysis configuration.
///
/// This struct owns the [`NodeIdSource`] and the node arena; nothing outside
/// [`crate::controller`] mutates it directly (§4.5: "sole session mutator").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformSession {
    pub nodes: HashMap<SignalNodeID, SignalNode>,
    pub root_nodes: Vec<SignalNodeID>,
    pub viewport: Viewport,
    pub markers: Vec<Marker>,
    pub cursor_time: Time,
    pub analysis_mode: AnalysisMode,
    pub selected_nodes: Vec<SignalNodeID>,
    pub time_ruler_config: TimeRulerConfig,
    pub timescale: Timescale,
    pub clock_signal: Option<ClockSignal>,
    pub sampling_signal: Option<SignalNodeID>,
    /// Diagnostic rainbow-fill mode (§4.7.6), toggled by the controller to
    /// isolate paint throughput from sampling cost.
    pub benchmark_mode: bool,
    #[serde(skip)]
    id_source: NodeIdSource,
}

impl Default for WaveformSession {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            root_nodes: Vec::new(),
            viewport: Viewport::default(),
            markers: Vec::new(),
            cursor_time: 0,
            analysis_mode: AnalysisMode::default(),
            selected_nodes: Vec::new(),
            time_ruler_config: TimeRulerConfig::default(),
            timescale: Timescale::default(),
            clock_signal: None,
            sampling_signal: None,
            benchmark_mode: false,
            id_source: NodeIdSource::new(),
        }
    }
}

impl WaveformSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new top-level signal node and appends it to the root list.
    pub fn add_root_signal(&mut self, name: String, handle: SignalHandle) -> SignalNodeID {
        let id = self.id_source.next_id();
        let node = SignalNode::new_signal(id, name, handle);
        self.nodes.insert(id, node);
        self.root_nodes.push(id);
        id
    }

    /// Creates a new group node as a child of `parent` (or top-level if
    /// `parent` is `None`).
    pub fn add_group(&mut self, name: String, parent: Option<SignalNodeID>) -> SignalNodeID {
        let id = self.id_source.next_id();
        let mut node = SignalNode::new_group(id, name);
        node.parent = parent;
        self.nodes.insert(id, node);
        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                    parent_node.children.push(id);
                }
            }
            None => self.root_nodes.push(id),
        }
        id
    }

    /// Adds an existing signal as a child of `parent`.
    pub fn add_child_signal(&mut self, parent: SignalNodeID, name: String, handle: SignalHandle) -> SignalNodeID {
        let id = self.id_source.next_id();
        let mut node = SignalNode::new_signal(id, name, handle);
        node.parent = Some(parent);
        self.nodes.insert(id, node);
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        id
    }

    pub fn node(&self, id: SignalNodeID) -> Option<&SignalNode> {
        self.nodes.get(&id)
    }

    /// Reseeds the node-id counter past the highest id already present in
    /// the arena. `id_source` is `#[serde(skip)]`, so after deserializing a
    /// session document this must run before any `insert_nodes`/
    /// `group_nodes`/`deep_copy_node` call, or freshly allocated ids would
    /// restart at 0 and collide with (overwrite) already-loaded nodes.
    pub fn reseed_id_source(&mut self) {
        let max_id = self.nodes.keys().copied().max().unwrap_or(0);
        self.id_source.reseed(max_id + 1);
    }

    pub fn node_mut(&mut self, id: SignalNodeID) -> Option<&mut SignalNode> {
        self.nodes.get_mut(&id)
    }

    /// Removes a node and all of its descendants from the arena, unlinking
    /// it from its parent's child list (or the root list).
    pub fn remove_node(&mut self, id: SignalNodeID) {
        let children: Vec<SignalNodeID> = self.nodes.get(&id).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            self.remove_node(child);
        }
        let parent = self.nodes.get(&id).and_then(|n| n.parent);
        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                    parent_node.children.retain(|c| *c != id);
                }
            }
            None => self.root_nodes.retain(|c| *c != id),
        }
        self.nodes.remove(&id);
        self.selected_nodes.retain(|c| *c != id);
    }

    /// Depth-first pre-order walk over every node in the tree, matching
    /// `WaveformController._iter_all_nodes`.
    pub fn iter_all_nodes(&self) -> Vec<SignalNodeID> {
        let mut out = Vec::new();
        for root in &self.root_nodes {
            self.walk(*root, &mut out);
        }
        out
    }

    fn walk(&self, id: SignalNodeID, out: &mut Vec<SignalNodeID>) {
        out.push(id);
        if let Some(node) = self.nodes.get(&id) {
            for child in &node.children {
                self.walk(*child, out);
            }
        }
    }

    /// Recursively duplicates the subtree rooted at `id`, assigning fresh
    /// ids throughout and attaching the copy under `new_parent` (or as a new
    /// root if `None`). Mirrors `SignalNode.deep_copy`.
    pub fn deep_copy_node(&mut self, id: SignalNodeID, new_parent: Option<SignalNodeID>) -> Option<SignalNodeID> {
        let original = self.nodes.get(&id)?.clone();
        let new_id = self.id_source.next_id();
        let mut copy = original;
        copy.id = new_id;
        copy.parent = new_parent;
        let child_ids = std::mem::take(&mut copy.children);
        self.nodes.insert(new_id, copy);
        match new_parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                    parent_node.children.push(new_id);
                }
            }
            None => self.root_nodes.push(new_id),
        }
        for child_id in child_ids {
            self.deep_copy_node(child_id, Some(new_id));
        }
        Some(new_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_root_signal_assigns_unique_ids() {
        let mut session = WaveformSession::new();
        let a = session.add_root_signal("top.clk".into(), 1);
        let b = session.add_root_signal("top.rst".into(), 2);
        assert_ne!(a, b);
        assert_eq!(session.root_nodes, vec![a, b]);
    }

    #[test]
    fn group_children_are_walked_in_order() {
        let mut session = WaveformSession::new();
        let group = session.add_group("CPU".into(), None);
        let clk = session.add_child_signal(group, "CPU.clk".into(), 1);
        let data = session.add_child_signal(group, "CPU.data".into(), 2);
        assert_eq!(session.iter_all_nodes(), vec![group, clk, data]);
    }

    #[test]
    fn remove_node_detaches_from_parent_and_drops_descendants() {
        let mut session = WaveformSession::new();
        let group = session.add_group("CPU".into(), None);
        let clk = session.add_child_signal(group, "CPU.clk".into(), 1);
        session.remove_node(group);
        assert!(session.node(group).is_none());
        assert!(session.node(clk).is_none());
        assert!(session.root_nodes.is_empty());
    }

    #[test]
    fn viewport_time_conversions_round_trip() {
        let vp = Viewport {
            left: 0.25,
            right: 0.75,
            total_duration: 1000,
            config: ViewportConfig::default(),
        };
        assert_eq!(vp.start_time(), 250);
        assert_eq!(vp.end_time(), 750);
        assert_eq!(vp.width(), 0.5);
        assert_eq!(vp.zoom_level(), 2.0);
    }

    #[test]
    fn deep_copy_assigns_fresh_ids_to_whole_subtree() {
        let mut session = WaveformSession::new();
        let group = session.add_group("CPU".into(), None);
        let clk = session.add_child_signal(group, "CPU.clk".into(), 1);
        let _ = clk;
        let copy = session.deep_copy_node(group, None).unwrap();
        assert_ne!(copy, group);
        let copy_node = session.node(copy).unwrap();
        assert_eq!(copy_node.children.len(), 1);
        assert_ne!(copy_node.children[0], clk);
    }
}
