//! Shadow display state and the push algorithm.
//!
//! Every container except the root owns a [`ShadowState`] describing what
//! was last sent to the display server for it. `push_changes` diffs the tree
//! against these records and emits only the requests needed to close the gap.
//! Stacking uses two lists: the desired order, mutated as soon as something
//! is raised, and the order as of the last push.

use slotmap::SecondaryMap;
use tracing::{debug, instrument, trace};

use super::display::{
    Cursor, DisplayConnection, DisplayError, EventMask, GoneIsOk, WindowClass, WindowValue,
};
use crate::common::geometry::{Point, Rect};
use crate::layout_engine::Stacking;
use crate::model::{ConId, ConMap, ConType, Observer, Tree, WindowHandle};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShadowState {
    /// Frame window owned by us; only tiling and floating containers get one.
    pub frame: Option<WindowHandle>,
    pub rect: Rect,
    pub window_rect: Rect,
    pub mapped: bool,
    pub child_mapped: bool,
    /// Client window currently reparented into `frame`.
    pub client: Option<WindowHandle>,
    /// Client window that must be reparented into `frame` on the next push.
    pub pending_reparent: Option<WindowHandle>,
}

#[derive(Debug, Default)]
pub struct DisplayState {
    shadows: SecondaryMap<ConId, ShadowState>,
    /// Bottom to top.
    desired_stack: Vec<ConId>,
    pushed_stack: Vec<ConId>,
    doomed_frames: Vec<WindowHandle>,
    doomed_clients: Vec<WindowHandle>,
    focused_window: Option<WindowHandle>,
    pending_warp: Option<Point>,
}

impl Observer for DisplayState {
    fn added_to_forest(&mut self, map: &ConMap, id: ConId) {
        if map[id].kind == ConType::Root {
            return;
        }
        self.shadows.insert(id, ShadowState::default());
        self.desired_stack.push(id);
    }

    fn removed_from_forest(&mut self, map: &ConMap, id: ConId) {
        if map[id].kind == ConType::Root {
            return;
        }
        let shadow = self
            .shadows
            .remove(id)
            .unwrap_or_else(|| panic!("container {id:?} has no shadow state"));
        if let Some(frame) = shadow.frame {
            self.doomed_frames.push(frame);
        }
        if shadow.client.is_some() && shadow.client == self.focused_window {
            self.focused_window = None;
        }
        self.desired_stack.retain(|&c| c != id);
        self.pushed_stack.retain(|&c| c != id);
    }
}

impl Stacking for DisplayState {
    fn raise(&mut self, id: ConId) {
        if !self.shadows.contains_key(id) {
            return;
        }
        if self.desired_stack.last() == Some(&id) {
            return;
        }
        self.desired_stack.retain(|&c| c != id);
        self.desired_stack.push(id);
    }
}

impl DisplayState {
    pub fn new() -> Self { Self::default() }

    #[track_caller]
    pub fn shadow(&self, id: ConId) -> &ShadowState {
        self.shadows
            .get(id)
            .unwrap_or_else(|| panic!("container {id:?} has no shadow state"))
    }

    #[track_caller]
    fn shadow_mut(&mut self, id: ConId) -> &mut ShadowState {
        self.shadows
            .get_mut(id)
            .unwrap_or_else(|| panic!("container {id:?} has no shadow state"))
    }

    pub fn has_shadow(&self, id: ConId) -> bool { self.shadows.contains_key(id) }

    pub fn shadow_count(&self) -> usize { self.shadows.len() }

    pub fn desired_stack(&self) -> &[ConId] { &self.desired_stack }

    pub fn pushed_stack(&self) -> &[ConId] { &self.pushed_stack }

    /// Finds the container whose frame is `frame`.
    pub fn con_for_frame(&self, frame: WindowHandle) -> Option<ConId> {
        self.shadows.iter().find(|(_, s)| s.frame == Some(frame)).map(|(id, _)| id)
    }

    /// Schedules `client` to be reparented into `con`'s frame.
    pub fn adopt_client(&mut self, id: ConId, client: WindowHandle) {
        self.shadow_mut(id).pending_reparent = Some(client);
    }

    /// Forgets the client of `con`; the client was unmapped or destroyed by
    /// its owner, so no request is sent for it.
    pub fn release_client(&mut self, id: ConId) {
        let shadow = self.shadow_mut(id);
        let client = shadow.client.take();
        shadow.pending_reparent = None;
        shadow.child_mapped = false;
        shadow.window_rect = Rect::default();
        if client.is_some() && client == self.focused_window {
            self.focused_window = None;
        }
    }

    /// Asks the client to close on the next push.
    pub fn kill_client(&mut self, client: WindowHandle) { self.doomed_clients.push(client) }

    pub fn request_warp(&mut self, to: Point) { self.pending_warp = Some(to) }
}

/// Flushes the tree's state to the display server.
///
/// Maps happen before unmaps and input focus is set in between, so replacing
/// one visible window with another never leaves the server without a mapped
/// focus target.
#[instrument(level = "debug", skip_all)]
pub fn push_changes<D: DisplayConnection>(
    tree: &mut Tree<DisplayState>,
    root: ConId,
    focused: ConId,
    display: &mut D,
) -> Result<(), DisplayError> {
    let map = &tree.map;
    let state = &mut tree.data;

    for frame in state.doomed_frames.drain(..) {
        display.destroy_window(frame).or_gone()?;
    }
    for client in state.doomed_clients.drain(..) {
        display.close_window(client).or_gone()?;
    }

    let order: Vec<ConId> = root.traverse_preorder(map).filter(|&id| id != root).collect();
    for &id in &order {
        push_node(map, state, id, display)?;
    }

    restack(state, display)?;
    push_focus(map, state, focused, display)?;

    for &id in &order {
        push_node_unmaps(map, state, id, display)?;
    }

    if let Some(to) = state.pending_warp.take() {
        display.warp_pointer(to)?;
    }

    state.pushed_stack = state.desired_stack.clone();
    Ok(())
}

fn needs_frame(map: &ConMap, id: ConId) -> bool {
    matches!(map[id].kind, ConType::Con | ConType::FloatingCon)
}

/// The rectangle a frame should occupy. Containers without a window only
/// draw decorations, so their frame is cut down to the band their
/// decorations occupy (possibly nothing).
fn frame_rect(map: &ConMap, id: ConId) -> Rect {
    let con = &map[id];
    let mut rect = con.rect;
    if con.window.is_some() || con.kind == ConType::FloatingCon {
        return rect;
    }
    let mut bottom = rect.y;
    if !con.deco_rect.is_empty() && con.deco_rect.y >= rect.y && con.deco_rect.max_y() <= rect.max_y()
    {
        bottom = bottom.max(con.deco_rect.max_y());
    }
    if con.layout.is_stacked_or_tabbed() {
        for &child in id.nodes(map) {
            let deco = map[child].deco_rect;
            if !deco.is_empty() {
                bottom = bottom.max(deco.max_y());
            }
        }
    }
    rect.height = bottom - rect.y;
    rect
}

fn visible(map: &ConMap, id: ConId) -> bool {
    let con = &map[id];
    if !con.mapped {
        return false;
    }
    if needs_frame(map, id) { !frame_rect(map, id).is_empty() } else { true }
}

fn push_node<D: DisplayConnection>(
    map: &ConMap,
    state: &mut DisplayState,
    id: ConId,
    display: &mut D,
) -> Result<(), DisplayError> {
    let con = &map[id];
    let visible = visible(map, id);

    if !needs_frame(map, id) {
        let shadow = state.shadow_mut(id);
        shadow.rect = con.rect;
        if visible {
            shadow.mapped = true;
        }
        return Ok(());
    }

    let rect = frame_rect(map, id);
    let shadow = state.shadow_mut(id);

    let frame = match shadow.frame {
        Some(frame) => frame,
        None => {
            let frame = display.create_window(
                rect,
                WindowClass::InputOutput,
                Cursor::Pointer,
                EventMask::FRAME,
                &[WindowValue::OverrideRedirect(true)],
            )?;
            trace!(?id, %frame, "created frame");
            shadow.frame = Some(frame);
            shadow.rect = rect;
            frame
        }
    };

    if let Some(client) = shadow.pending_reparent.take() {
        let offset = con.window_rect.relative_to(&rect).origin();
        display.reparent_window(client, frame, offset).or_gone()?;
        shadow.client = Some(client);
        shadow.child_mapped = false;
        shadow.window_rect = Rect::default();
    }

    if shadow.rect != rect {
        display.set_window_rect(frame, rect).or_gone()?;
        shadow.rect = rect;
    }

    if let Some(client) = shadow.client {
        let window_rect = con.window_rect;
        if !window_rect.is_empty() && shadow.window_rect != window_rect {
            display.set_window_rect(client, window_rect.relative_to(&rect)).or_gone()?;
            display.send_configure_notify(client, window_rect).or_gone()?;
            shadow.window_rect = window_rect;
        }
    }

    if visible && !shadow.mapped {
        if let Some(client) = shadow.client {
            if !shadow.child_mapped {
                display.map(client).or_gone()?;
                shadow.child_mapped = true;
            }
        }
        display.map(frame).or_gone()?;
        shadow.mapped = true;
    }
    Ok(())
}

fn push_node_unmaps<D: DisplayConnection>(
    map: &ConMap,
    state: &mut DisplayState,
    id: ConId,
    display: &mut D,
) -> Result<(), DisplayError> {
    if visible(map, id) {
        return Ok(());
    }
    let shadow = state.shadow_mut(id);
    if !shadow.mapped {
        return Ok(());
    }
    if let Some(frame) = shadow.frame {
        display.unmap(frame).or_gone()?;
    }
    let mut unmapped_client = None;
    if let (Some(client), true) = (shadow.client, shadow.child_mapped) {
        display.unmap(client).or_gone()?;
        shadow.child_mapped = false;
        unmapped_client = Some(client);
    }
    shadow.mapped = false;
    // An unmapped client loses input focus on the server side.
    if unmapped_client.is_some() && unmapped_client == state.focused_window {
        state.focused_window = None;
    }
    Ok(())
}

fn restack<D: DisplayConnection>(state: &mut DisplayState, display: &mut D) -> Result<(), DisplayError> {
    let framed = |list: &[ConId]| -> Vec<(ConId, WindowHandle)> {
        list.iter()
            .filter_map(|&id| state.shadows.get(id).and_then(|s| s.frame).map(|f| (id, f)))
            .collect()
    };
    let desired = framed(&state.desired_stack);
    let pushed = framed(&state.pushed_stack);

    let mut moves = Vec::new();
    for (i, &(id, frame)) in desired.iter().enumerate() {
        let want_below = i.checked_sub(1).map(|j| desired[j].1);
        let was_below = match pushed.iter().position(|&(p, _)| p == id) {
            Some(0) => None,
            Some(j) => Some(pushed[j - 1].1),
            None => {
                moves.push((frame, want_below));
                continue;
            }
        };
        if want_below != was_below {
            moves.push((frame, want_below));
        }
    }

    if moves.is_empty() {
        return Ok(());
    }
    debug!(count = moves.len(), "restacking");
    display.set_crossing_events(false)?;
    for (frame, below) in moves {
        display.restack_above(frame, below).or_gone()?;
    }
    display.set_crossing_events(true)?;
    Ok(())
}

fn push_focus<D: DisplayConnection>(
    map: &ConMap,
    state: &mut DisplayState,
    focused: ConId,
    display: &mut D,
) -> Result<(), DisplayError> {
    let Some(window) = map.get(focused).and_then(|c| c.window.as_ref()) else {
        return Ok(());
    };
    let handle = window.handle;
    if state.focused_window == Some(handle) {
        return Ok(());
    }
    let Some(shadow) = state.shadows.get(focused) else {
        return Ok(());
    };
    if !shadow.mapped || shadow.client != Some(handle) {
        debug!(%handle, "focus target not mapped yet, deferring");
        return Ok(());
    }
    display.set_input_focus(handle).or_gone()?;
    state.focused_window = Some(handle);
    Ok(())
}
