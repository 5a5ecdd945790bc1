//! Terminal application driver: wires the UI-agnostic core
//! ([`crate::controller`], [`crate::db`], [`crate::canvas`],
//! [`crate::keymap`]) into a running `tui` + `crossterm` interface.
//!
//! Grounded on teacher's `main.rs` event loop (an input-listener thread
//! feeding a `crossbeam` channel, `terminal.draw` plus a frame-pacing
//! sleep) and `state.rs`'s pane-focus split (`NaluPanes::{Browser,List,
//! Viewer}`), generalized here to two panes — the signal tree
//! ([`crate::widgets::browser`]) and the waveform canvas — since the
//! controller's tree already unifies what teacher's `List`/`Viewer` panes
//! showed separately.

use std::path::{Path, PathBuf};

use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, MouseEvent};
use tui::backend::Backend;
use tui::buffer::Buffer;
use tui::layout::{Direction, Layout, Rect};
use tui::widgets::{Block, BorderType, Borders, Paragraph, Widget};
use tui::Frame;

use crate::canvas::{CanvasOrchestrator, PaintParams};
use crate::config::{BackendChoice, Settings};
use crate::controller::WaveformController;
use crate::db::backend::HierarchyEntry;
use crate::db::WaveformDb;
use crate::errors::{StateError, WaveScoutError, WaveScoutResult};
use crate::keymap::{self, KeyAction, KeymapContext, RoiTracker, RoiUpdate};
use crate::logging::FrameTimestamps;
use crate::resize::LayoutResize;
use crate::session::document::WaveformSessionDocument;
use crate::session::WaveformSession;
use crate::types::{SignalNodeID, Time};
use crate::widgets::browser::{Browser, BrowserNode, BrowserState};
use crate::worker::{self, LoadHandle};

/// Terminal-grid row budget for the ruler band painted by
/// [`crate::render::ruler`]; unlike `config::rendering::DEFAULT_HEADER_HEIGHT`
/// (a pixel height carried over from the Qt original, see DESIGN.md), a
/// character cell only needs a couple of rows for the tick labels and grid.
const HEADER_ROWS: u16 = 2;
/// One character row per signal; `config::rendering::DEFAULT_ROW_HEIGHT` is
/// the pixel equivalent kept for parity with the original config schema.
const ROW_HEIGHT: u16 = 1;
/// Minimum pane width the browser/waveform split will shrink to.
const MIN_PANE_WIDTH: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Browser,
    Waveform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlay {
    None,
    Loading,
}

/// A browser-tree leaf: a [`SignalNodeID`] paired with the label to render,
/// so [`Browser`]'s generic entry type stays a plain `Display` wrapper
/// rather than leaking session internals into the widget.
struct BrowserEntry {
    id: SignalNodeID,
    label: String,
}

impl std::fmt::Display for BrowserEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Owns every piece of UI-only state the core doesn't need to know about
/// (focus, overlay, pane layout, ROI drag, background load handle) plus the
/// core pieces themselves. `main.rs` owns the terminal and event loop;
/// everything else lives here.
pub struct App {
    controller: WaveformController,
    db: Option<WaveformDb>,
    canvas: CanvasOrchestrator,
    settings: Settings,
    roi: RoiTracker,
    tooltips_visible: bool,
    focus: Focus,
    overlay: Overlay,
    load: Option<LoadHandle>,
    browser_state: BrowserState,
    layout: LayoutResize<2>,
    last_frame: FrameTimestamps,
    /// The waveform pane's screen area as of the last [`Self::render`] call,
    /// so a later mouse event (handled between frames) can be converted to a
    /// session time without the caller having to track layout itself.
    last_waveform_area: Rect,
    waveform_path: Option<PathBuf>,
    status: Option<String>,
    quit: bool,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self {
            controller: WaveformController::new(),
            db: None,
            canvas: CanvasOrchestrator::new(),
            settings,
            roi: RoiTracker::new(),
            tooltips_visible: false,
            focus: Focus::Waveform,
            overlay: Overlay::None,
            load: None,
            browser_state: BrowserState::new(true, true, false),
            layout: LayoutResize::new([30, 90], MIN_PANE_WIDTH),
            last_frame: FrameTimestamps::new(),
            last_waveform_area: Rect::new(0, 0, 0, 0),
            waveform_path: None,
            status: None,
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Starts an off-main-thread load of `path` (§5); the result is picked
    /// up by [`Self::poll_background`] on a later frame.
    pub fn open_waveform(&mut self, path: PathBuf) {
        self.waveform_path = Some(path.clone());
        self.overlay = Overlay::Loading;
        self.status = None;
        self.load = Some(worker::load_waveform(path, self.settings.backend));
    }

    /// Non-blocking check for a finished background load; call once per
    /// frame before drawing.
    pub fn poll_background(&mut self) {
        let Some(handle) = self.load.as_mut() else { return };
        let Some(result) = handle.poll() else { return };
        self.load = None;
        self.overlay = Overlay::None;
        match result {
            Ok(db) => self.adopt_db(db),
            Err(err) => self.status = Some(format!("failed to load waveform: {err}")),
        }
    }

    /// Builds a fresh session mirroring the waveform's full design
    /// hierarchy (every scope becomes a group, every variable a signal) and
    /// installs it. Open Question decision (see DESIGN.md): there is no
    /// interactive "add signal" step in this terminal UI, so a freshly
    /// loaded waveform shows everything rather than an empty tree the user
    /// has to populate signal-by-signal.
    fn adopt_db(&mut self, db: WaveformDb) {
        let mut session = WaveformSession::new();
        session.viewport.total_duration = db.max_time() + 1;
        populate_session_from_hierarchy(&mut session, db.hierarchy(), None);
        let uri = self.waveform_path.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
        self.controller.set_session(session, uri);
        self.db = Some(db);
        self.canvas.invalidate();
    }

    pub fn save_session(&self, path: &Path) -> WaveScoutResult<()> {
        let session = self
            .controller
            .session()
            .ok_or(WaveScoutError::State(StateError::NoSession))?;
        let waveform_path = self
            .waveform_path
            .as_ref()
            .ok_or(WaveScoutError::State(StateError::NoSession))?;
        let doc = WaveformSessionDocument::new(waveform_path.display().to_string(), session.clone());
        doc.save(path)
    }

    pub fn load_session(&mut self, path: &Path) -> WaveScoutResult<()> {
        let doc = WaveformSessionDocument::load(path)?;
        let waveform_path = PathBuf::from(&doc.waveform_path);
        let db = WaveformDb::open(&waveform_path, self.settings.backend)?;
        self.waveform_path = Some(waveform_path);
        self.controller.set_session(doc.session, doc.waveform_path);
        self.db = Some(db);
        self.canvas.invalidate();
        Ok(())
    }

    /// Handles one `crossterm` event against the layout as of the most
    /// recent [`Self::render`] call.
    pub fn handle_event(&mut self, event: CrosstermEvent) {
        let waveform_area = self.last_waveform_area;
        match event {
            CrosstermEvent::Key(key) => self.handle_key(key, waveform_area.width as u32),
            CrosstermEvent::Mouse(mouse) => self.handle_mouse(mouse, waveform_area),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent, canvas_width: u32) {
        if key.kind != KeyEventKind::Release && key.code == KeyCode::Char('q') {
            self.request_quit();
            return;
        }
        if key.kind != KeyEventKind::Release && key.code == KeyCode::Tab {
            self.focus = match self.focus {
                Focus::Browser => Focus::Waveform,
                Focus::Waveform => Focus::Browser,
            };
            return;
        }

        match self.focus {
            Focus::Browser => self.handle_browser_key(key),
            Focus::Waveform => self.handle_waveform_key(key, canvas_width),
        }
    }

    fn handle_browser_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let tree = self.browser_tree();
        match key.code {
            KeyCode::Up => self.browser_state.select_relative(&tree, -1, true),
            KeyCode::Down => self.browser_state.select_relative(&tree, 1, true),
            KeyCode::Left => {
                if let Some(id) = self.primary_node(&tree) {
                    self.controller.set_node_expanded(id, false);
                }
            }
            KeyCode::Right => {
                if let Some(id) = self.primary_node(&tree) {
                    self.controller.set_node_expanded(id, true);
                }
            }
            KeyCode::Enter => {
                if let Some(id) = self.primary_node(&tree) {
                    self.controller.set_selection_by_ids([id]);
                }
            }
            KeyCode::Delete => {
                if let Some(id) = self.primary_node(&tree) {
                    self.controller.delete_nodes(vec![id]);
                }
            }
            _ => {}
        }
    }

    fn handle_waveform_key(&mut self, key: KeyEvent, canvas_width: u32) {
        let all_ids: Vec<SignalNodeID> = self.controller.session().map(|s| s.iter_all_nodes()).unwrap_or_default();
        let ctx = KeymapContext {
            canvas_width: canvas_width.max(1),
            all_node_ids: &all_ids,
        };
        match key.kind {
            KeyEventKind::Release => {
                if let Some(KeyAction::SetTooltipsVisible(visible)) = keymap::map_key_release(key) {
                    self.tooltips_visible = visible;
                }
            }
            KeyEventKind::Press | KeyEventKind::Repeat => {
                let Some(action) = keymap::map_key_press(key) else { return };
                match action {
                    KeyAction::SetTooltipsVisible(visible) => self.tooltips_visible = visible,
                    KeyAction::CancelRoi => self.roi.cancel(),
                    _ => keymap::dispatch(action, &mut self.controller, &ctx),
                }
            }
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, waveform_area: Rect) {
        let Some(session) = self.controller.session() else { return };
        let start_time = session.viewport.start_time();
        let end_time = session.viewport.end_time();
        let width = waveform_area.width.max(1) as f64;
        let origin = waveform_area.x;
        let column_to_time = move |col: u16| -> Time {
            let relative = col.saturating_sub(origin) as f64 / width;
            start_time + ((end_time - start_time) as f64 * relative) as Time
        };
        if let Some(update) = self.roi.handle_mouse(event, column_to_time) {
            if let RoiUpdate::Committed(start, end) = update {
                self.controller.zoom_to_roi(start, end);
            }
        }
    }

    fn browser_tree(&self) -> BrowserNode<BrowserEntry> {
        match self.controller.session() {
            Some(session) => build_browser_tree(session),
            None => BrowserNode::default(),
        }
    }

    fn primary_node(&self, tree: &BrowserNode<BrowserEntry>) -> Option<SignalNodeID> {
        let path = self.browser_state.get_primary_selected_path(tree);
        tree.get_node(&path)?.get_entry().as_ref().map(|e| e.id)
    }

    /// Draws one frame. Called from `main.rs`'s `terminal.draw` closure.
    pub fn render<B: Backend>(&mut self, frame: &mut Frame<B>) {
        self.last_frame = FrameTimestamps::new();
        self.poll_background();
        self.last_frame.timestamp("poll_background".to_string());

        let size = frame.size();
        self.layout.resize_container(size.width);
        let areas = self
            .layout
            .constrain_layout(Layout::default().direction(Direction::Horizontal))
            .split(size);
        let browser_area = areas[0];
        let waveform_area = areas[1];
        self.last_waveform_area = waveform_area;

        self.browser_state.set_height(browser_area.height as isize);
        let tree = self.browser_tree();
        let browser_block = Block::default()
            .title("Signals")
            .borders(Borders::ALL)
            .border_type(if self.focus == Focus::Browser { BorderType::Double } else { BorderType::Rounded });
        frame.render_widget(Browser::new(&self.browser_state, &tree).block(browser_block), browser_area);
        self.last_frame.timestamp("browser".to_string());

        match (self.db.as_ref(), self.controller.session()) {
            (Some(db), Some(session)) => {
                let params = PaintParams {
                    area: waveform_area,
                    header_height: HEADER_ROWS,
                    db,
                    session,
                    base_row_height: ROW_HEIGHT,
                    device_pixel_ratio: 1.0,
                    cursor_only: false,
                    show_debug_counters: session.benchmark_mode,
                };
                let widget = CanvasWidget { canvas: &mut self.canvas, params };
                frame.render_widget(widget, waveform_area);
            }
            _ => {
                let text = match self.overlay {
                    Overlay::Loading => "Loading waveform...".to_string(),
                    Overlay::None => self.status.clone().unwrap_or_else(|| "No waveform open".to_string()),
                };
                let placeholder = Paragraph::new(text).block(
                    Block::default().title("Waveform").borders(Borders::ALL),
                );
                frame.render_widget(placeholder, waveform_area);
            }
        }
        self.last_frame.timestamp("canvas".to_string());
    }

    pub fn last_frame_timings(&self) -> &FrameTimestamps {
        &self.last_frame
    }
}

/// Adapts [`CanvasOrchestrator::paint`] (which wants a `&mut Buffer`
/// directly) to `tui`'s consuming `Widget::render`, so the orchestrator's
/// cache can sit behind `frame.render_widget` like every other pane.
struct CanvasWidget<'a> {
    canvas: &'a mut CanvasOrchestrator,
    params: PaintParams<'a>,
}

impl<'a> Widget for CanvasWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut params = self.params;
        params.area = area;
        self.canvas.paint(buf, &params);
    }
}

/// Mirrors a waveform's design hierarchy into the session tree: every scope
/// becomes a group, every variable a signal, nested exactly as declared.
/// The backend's unnamed top scope (empty `name`, no parent) is skipped so
/// its children land at the session root instead of under one redundant
/// wrapper group.
fn populate_session_from_hierarchy(session: &mut WaveformSession, entry: &HierarchyEntry, parent: Option<SignalNodeID>) {
    match entry {
        HierarchyEntry::Variable { name, handle, .. } => {
            match parent {
                Some(parent_id) => {
                    session.add_child_signal(parent_id, name.clone(), *handle);
                }
                None => {
                    session.add_root_signal(name.clone(), *handle);
                }
            };
        }
        HierarchyEntry::Scope { name, children } => {
            if name.is_empty() && parent.is_none() {
                for child in children {
                    populate_session_from_hierarchy(session, child, None);
                }
            } else {
                let group_id = session.add_group(name.clone(), parent);
                for child in children {
                    populate_session_from_hierarchy(session, child, Some(group_id));
                }
            }
        }
    }
}

fn build_browser_tree(session: &WaveformSession) -> BrowserNode<BrowserEntry> {
    let children = session.root_nodes.iter().map(|id| build_browser_node(session, *id)).collect();
    BrowserNode::from(None, children)
}

fn build_browser_node(session: &WaveformSession, id: SignalNodeID) -> BrowserNode<BrowserEntry> {
    let Some(node) = session.node(id) else {
        return BrowserNode::default();
    };
    let children = node.children.iter().map(|child| build_browser_node(session, *child)).collect();
    let entry = BrowserEntry {
        id,
        label: node.display_name().to_string(),
    };
    BrowserNode::from_expanded(Some(entry), node.is_expanded, children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populate_session_skips_the_unnamed_top_scope() {
        let hierarchy = HierarchyEntry::Scope {
            name: String::new(),
            children: vec![
                HierarchyEntry::Scope {
                    name: "top".to_string(),
                    children: vec![HierarchyEntry::Variable {
                        name: "clk".to_string(),
                        handle: 1,
                        bit_width: 1,
                    }],
                },
            ],
        };
        let mut session = WaveformSession::new();
        populate_session_from_hierarchy(&mut session, &hierarchy, None);
        assert_eq!(session.root_nodes.len(), 1);
        let group = session.node(session.root_nodes[0]).unwrap();
        assert_eq!(group.name, "top");
        assert!(group.is_group);
        assert_eq!(group.children.len(), 1);
    }

    #[test]
    fn browser_tree_mirrors_session_names() {
        let mut session = WaveformSession::new();
        session.add_root_signal("top.clk".into(), 1);
        let tree = build_browser_tree(&session);
        assert_eq!(tree.get_children().len(), 1);
    }

    #[test]
    fn app_starts_with_no_session_and_not_quitting() {
        let app = App::new(Settings::default());
        assert!(!app.should_quit());
        assert!(app.controller.session().is_none());
    }
}
