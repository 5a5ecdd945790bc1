//! Keyboard + mouse contract. Two pure, independently testable
//! halves: mapping raw `crossterm` events to a logical [`KeyAction`] /
//! [`RoiUpdate`], and [`dispatch`] applying a [`KeyAction`] to a
//! [`WaveformController`]. Neither half touches a terminal or a `tui`
//! widget, keeping "what key was this" separate from "what should happen"
//! so both can be unit tested without a running UI.
//!
//! A few actions (tooltip visibility, rename text entry, ROI cancellation)
//! have no corresponding controller method — they mutate UI-only state the
//! app driver owns directly, so [`dispatch`] is a deliberate no-op for
//! those and the driver handles them inline where it already has the
//! context (the in-progress rename buffer, the tooltip flag, the
//! [`RoiTracker`]).

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::controller::{GroupRenderMode, WaveformController};
use crate::types::{SignalNodeID, Time};

pub const ZOOM_IN_FACTOR: f64 = 0.8;
pub const ZOOM_OUT_FACTOR: f64 = 1.25;
pub const PAN_STEP: f64 = 0.1;
pub const PAGE_PAN_STEP: f64 = 0.9;
/// Pixel offset from the left edge used when navigating to a marker.
pub const MARKER_NAV_PIXEL_OFFSET: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    ZoomIn,
    ZoomOut,
    Fit,
    GoToStart,
    GoToEnd,
    PanLeft,
    PanRight,
    PageLeft,
    PageRight,
    /// `Ctrl+1..9`: toggle a marker at the cursor. Slot is zero-indexed.
    ToggleMarker(usize),
    /// `1..9`: navigate the viewport to a marker. Slot is zero-indexed.
    NavigateToMarker(usize),
    SetTooltipsVisible(bool),
    DeleteSelected,
    GroupSelected,
    SelectAll,
    RenameSelected,
    CancelRoi,
}

/// Maps a key-down event to an action. `Ctrl+<digit>` and bare `<digit>`
/// are disambiguated by modifier; both ranges are `1..=9` (there is no
/// marker slot 0).
pub fn map_key_press(key: KeyEvent) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('+') | KeyCode::Char('=') => Some(KeyAction::ZoomIn),
        KeyCode::Char('-') => Some(KeyAction::ZoomOut),
        KeyCode::Char('f') | KeyCode::Char('F') => Some(KeyAction::Fit),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(KeyAction::GoToStart),
        KeyCode::Char('e') | KeyCode::Char('E') => Some(KeyAction::GoToEnd),
        KeyCode::Left => Some(KeyAction::PanLeft),
        KeyCode::Right => Some(KeyAction::PanRight),
        KeyCode::PageUp => Some(KeyAction::PageLeft),
        KeyCode::PageDown => Some(KeyAction::PageRight),
        KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
            let slot = c.to_digit(10).unwrap() as usize - 1;
            Some(if ctrl { KeyAction::ToggleMarker(slot) } else { KeyAction::NavigateToMarker(slot) })
        }
        KeyCode::Char('v') | KeyCode::Char('V') => Some(KeyAction::SetTooltipsVisible(true)),
        KeyCode::Delete => Some(KeyAction::DeleteSelected),
        KeyCode::Char('g') | KeyCode::Char('G') if !ctrl => Some(KeyAction::GroupSelected),
        KeyCode::Char('a') | KeyCode::Char('A') if ctrl => Some(KeyAction::SelectAll),
        KeyCode::Char('r') | KeyCode::Char('R') if !ctrl => Some(KeyAction::RenameSelected),
        KeyCode::Esc => Some(KeyAction::CancelRoi),
        _ => None,
    }
}

/// Maps a key-up event. Only `V` (hold-to-show tooltips) cares about
/// release; everything else is a fire-once action on press. Release events
/// are only delivered when the terminal has the keyboard-enhancement
/// protocol enabled (`crossterm::event::PushKeyboardEnhancementFlags`);
/// where it isn't, `V` degrades to a toggle on repeated presses, which the
/// app driver can special-case if it detects the flags aren't supported.
pub fn map_key_release(key: KeyEvent) -> Option<KeyAction> {
    match key.code {
        KeyCode::Char('v') | KeyCode::Char('V') => Some(KeyAction::SetTooltipsVisible(false)),
        _ => None,
    }
}

/// Everything [`dispatch`] needs beyond the controller itself: the canvas
/// width markers navigate against, and the full node id set `Ctrl+A`
/// selects.
pub struct KeymapContext<'a> {
    pub canvas_width: u32,
    pub all_node_ids: &'a [SignalNodeID],
}

/// Applies a [`KeyAction`] to the controller. Actions with no controller
/// counterpart (tooltip visibility, rename, ROI cancel) are intentionally
/// a no-op here — see the module doc comment.
pub fn dispatch(action: KeyAction, controller: &mut WaveformController, ctx: &KeymapContext) {
    match action {
        KeyAction::ZoomIn => controller.zoom_viewport(ZOOM_IN_FACTOR, None),
        KeyAction::ZoomOut => controller.zoom_viewport(ZOOM_OUT_FACTOR, None),
        KeyAction::Fit => controller.zoom_to_fit(),
        KeyAction::GoToStart => controller.go_to_start(),
        KeyAction::GoToEnd => controller.go_to_end(),
        KeyAction::PanLeft => controller.pan_viewport(-PAN_STEP),
        KeyAction::PanRight => controller.pan_viewport(PAN_STEP),
        KeyAction::PageLeft => controller.pan_viewport(-PAGE_PAN_STEP),
        KeyAction::PageRight => controller.pan_viewport(PAGE_PAN_STEP),
        KeyAction::ToggleMarker(slot) => controller.toggle_marker_at_cursor(slot),
        KeyAction::NavigateToMarker(slot) => {
            controller.navigate_to_marker(slot, MARKER_NAV_PIXEL_OFFSET, ctx.canvas_width.max(1));
        }
        KeyAction::DeleteSelected => {
            let ids: Vec<_> = controller.selected_ids().into_iter().collect();
            if !ids.is_empty() {
                controller.delete_nodes(ids);
            }
        }
        KeyAction::GroupSelected => {
            let ids: Vec<_> = controller.selected_ids().into_iter().collect();
            if ids.len() > 1 {
                controller.group_nodes(ids, "Group".to_string(), GroupRenderMode::SeparateRows);
            }
        }
        KeyAction::SelectAll => controller.set_selection_by_ids(ctx.all_node_ids.iter().copied()),
        KeyAction::SetTooltipsVisible(_) | KeyAction::RenameSelected | KeyAction::CancelRoi => {}
    }
}

/// Progress of an in-flight right-mouse-drag region-of-interest selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiUpdate {
    Started,
    Active(Time, Time),
    /// Drag released: the app driver should call
    /// `WaveformController::zoom_to_roi` with these bounds.
    Committed(Time, Time),
}

/// Tracks a right-mouse-drag ROI selection across the down/drag/up event
/// sequence, emitting a commit once the button is released. Holds only the
/// drag anchor; the app driver owns whatever overlay it paints while a
/// selection is active.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoiTracker {
    anchor: Option<Time>,
}

impl RoiTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// `column_to_time` converts a mouse event's pixel column into a
    /// session time; supplied by the caller since the tracker has no
    /// access to the viewport.
    pub fn handle_mouse(&mut self, event: MouseEvent, column_to_time: impl Fn(u16) -> Time) -> Option<RoiUpdate> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Right) => {
                let t = column_to_time(event.column);
                self.anchor = Some(t);
                Some(RoiUpdate::Started)
            }
            MouseEventKind::Drag(MouseButton::Right) => {
                let anchor = self.anchor?;
                Some(RoiUpdate::Active(anchor, column_to_time(event.column)))
            }
            MouseEventKind::Up(MouseButton::Right) => {
                let anchor = self.anchor.take()?;
                Some(RoiUpdate::Committed(anchor, column_to_time(event.column)))
            }
            _ => None,
        }
    }

    /// `Esc`: drop the anchor without committing.
    pub fn cancel(&mut self) {
        self.anchor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::WaveformSession;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plus_and_minus_map_to_zoom() {
        assert_eq!(map_key_press(key(KeyCode::Char('+'), KeyModifiers::NONE)), Some(KeyAction::ZoomIn));
        assert_eq!(map_key_press(key(KeyCode::Char('-'), KeyModifiers::NONE)), Some(KeyAction::ZoomOut));
    }

    #[test]
    fn digit_without_ctrl_navigates_digit_with_ctrl_toggles() {
        assert_eq!(map_key_press(key(KeyCode::Char('3'), KeyModifiers::NONE)), Some(KeyAction::NavigateToMarker(2)));
        assert_eq!(
            map_key_press(key(KeyCode::Char('3'), KeyModifiers::CONTROL)),
            Some(KeyAction::ToggleMarker(2))
        );
    }

    #[test]
    fn ctrl_a_selects_all_not_group() {
        assert_eq!(map_key_press(key(KeyCode::Char('a'), KeyModifiers::CONTROL)), Some(KeyAction::SelectAll));
        assert_eq!(map_key_press(key(KeyCode::Char('g'), KeyModifiers::NONE)), Some(KeyAction::GroupSelected));
    }

    #[test]
    fn release_v_hides_tooltips() {
        let release = KeyEvent {
            code: KeyCode::Char('v'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: Default::default(),
        };
        assert_eq!(map_key_release(release), Some(KeyAction::SetTooltipsVisible(false)));
    }

    #[test]
    fn dispatch_zoom_in_shrinks_viewport_width() {
        let mut controller = WaveformController::new();
        let mut session = WaveformSession::new();
        session.viewport.total_duration = 1000;
        controller.set_session(session, "trace.vcd".into());
        let before = controller.session().unwrap().viewport.width();
        let ctx = KeymapContext { canvas_width: 200, all_node_ids: &[] };
        dispatch(KeyAction::ZoomIn, &mut controller, &ctx);
        let after = controller.session().unwrap().viewport.width();
        assert!(after < before);
    }

    #[test]
    fn roi_drag_sequence_produces_started_active_committed() {
        let mut tracker = RoiTracker::new();
        let to_time = |col: u16| col as Time * 10;
        let down = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Right),
            column: 5,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(tracker.handle_mouse(down, to_time), Some(RoiUpdate::Started));
        assert!(tracker.is_active());

        let drag = MouseEvent {
            kind: MouseEventKind::Drag(MouseButton::Right),
            column: 20,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(tracker.handle_mouse(drag, to_time), Some(RoiUpdate::Active(50, 200)));

        let up = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Right),
            column: 30,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(tracker.handle_mouse(up, to_time), Some(RoiUpdate::Committed(50, 300)));
        assert!(!tracker.is_active());
    }

    #[test]
    fn cancel_clears_an_active_drag() {
        let mut tracker = RoiTracker::new();
        let down = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Right),
            column: 1,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        tracker.handle_mouse(down, |c| c as Time);
        assert!(tracker.is_active());
        tracker.cancel();
        assert!(!tracker.is_active());
    }
}
