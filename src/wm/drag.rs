//! Pointer drags.
//!
//! A drag is a small state machine held by the window manager. While it is
//! not [`DragState::Idle`], pointer motion, button release and key presses
//! are routed here before normal dispatch. Tiling drags pick a drop target
//! under the pointer and only change the tree on release; floating drags
//! move their container as the pointer moves.

use tracing::{debug, trace};

use super::WindowManager;
use crate::common::geometry::{Point, Rect};
use crate::layout_engine::{Direction, Position, fullscreen_con, visible_workspace};
use crate::model::{ConId, ConType, FullscreenMode, Layout};
use crate::sync::{DisplayConnection, DisplayEvent};

/// Where a tiling drag would put the dragged container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropKind {
    /// Swap with the target, or move onto the target workspace.
    Center,
    /// Become the target's neighbour on the `direction` side.
    Sibling,
    /// Become the neighbour of the target's parent.
    Parent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropTarget {
    pub con: ConId,
    pub kind: DropKind,
    pub direction: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragKind {
    Tiling,
    /// `origin` is where the floating container started.
    Floating { origin: Rect },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        con: ConId,
        start: Point,
        last: Point,
        /// Set once the pointer travelled past the drag threshold; until
        /// then a release counts as a click.
        armed: bool,
        kind: DragKind,
        target: Option<DropTarget>,
    },
    Committing {
        con: ConId,
        target: DropTarget,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragOutcome {
    Pending,
    Success,
    /// Cancelled from the keyboard; everything is put back.
    Revert,
    /// The dragged window went away.
    Abort,
}

impl<D: DisplayConnection> WindowManager<D> {
    pub fn is_dragging(&self) -> bool { self.drag != DragState::Idle }

    /// Starts dragging `id` from `position`. Floating containers are moved
    /// as a whole.
    pub fn start_drag(&mut self, id: ConId, position: Point) {
        let map = &self.tree.map;
        let in_dock = id.parent(map).is_some_and(|p| map[p].is_dockarea());
        if map[id].kind != ConType::Con || in_dock {
            debug!(?id, "container cannot be dragged");
            return;
        }
        let (con, kind) = match self.inside_floating(id) {
            Some(wrapper) => (wrapper, DragKind::Floating { origin: self.tree[wrapper].rect }),
            None => (id, DragKind::Tiling),
        };
        debug!(?con, ?kind, ?position, "drag started");
        self.drag = DragState::Dragging {
            con,
            start: position,
            last: position,
            armed: false,
            kind,
            target: None,
        };
    }

    /// Feeds `event` to an active drag. Returns `None` if the event is not
    /// part of the drag and should be dispatched normally. An aborted drag
    /// also returns its event for normal dispatch.
    pub(super) fn route_drag_event(&mut self, event: &DisplayEvent) -> Option<DragOutcome> {
        let DragState::Dragging { con, .. } = self.drag else {
            return None;
        };
        let outcome = match *event {
            DisplayEvent::MotionNotify { position } => {
                self.drag_motion(position);
                DragOutcome::Pending
            }
            DisplayEvent::ButtonRelease { position } => {
                self.drag_motion(position);
                self.drag_release()
            }
            DisplayEvent::KeyPress => self.drag_revert(),
            DisplayEvent::UnmapNotify { window } | DisplayEvent::DestroyNotify { window }
                if self.by_window_handle(window).is_some_and(|c| c == con || c.has_ancestor(con, &self.tree.map)) =>
            {
                debug!(?window, "dragged window went away");
                self.drag = DragState::Idle;
                DragOutcome::Abort
            }
            _ => return None,
        };
        trace!(?outcome, "drag event");
        Some(outcome)
    }

    fn drag_motion(&mut self, position: Point) {
        let DragState::Dragging { con, start, armed, kind, .. } = self.drag else {
            return;
        };
        let armed = armed || start.max_axis_distance(position) >= self.config.drag.threshold;
        let mut target = None;
        if armed {
            match kind {
                DragKind::Floating { origin } => {
                    self.tree[con].rect = origin.translate(position.x - start.x, position.y - start.y);
                }
                DragKind::Tiling => {
                    target = self.find_drop_target(position).map(|t| self.classify_drop(t, position));
                }
            }
        }
        self.drag = DragState::Dragging { con, start, last: position, armed, kind, target };
    }

    fn drag_release(&mut self) -> DragOutcome {
        let DragState::Dragging { con, armed, kind, target, .. } = self.drag else {
            return DragOutcome::Abort;
        };
        self.drag = DragState::Idle;
        if !armed || kind != DragKind::Tiling {
            return DragOutcome::Success;
        }
        let Some(target) = target else {
            debug!(?con, "released outside any drop target");
            return DragOutcome::Success;
        };
        self.drag = DragState::Committing { con, target };
        self.commit_drop(con, target);
        self.drag = DragState::Idle;
        DragOutcome::Success
    }

    fn drag_revert(&mut self) -> DragOutcome {
        if let DragState::Dragging { con, kind: DragKind::Floating { origin }, .. } = self.drag {
            self.tree[con].rect = origin;
        }
        debug!("drag reverted");
        self.drag = DragState::Idle;
        DragOutcome::Revert
    }

    /// The tiled window under `position`, or the visible workspace there if
    /// no window is.
    pub fn find_drop_target(&self, position: Point) -> Option<ConId> {
        let map = &self.tree.map;
        let global_fs = fullscreen_con(map, self.root, FullscreenMode::Global);
        let leaf = map.iter().find_map(|(id, con)| {
            if con.window.is_none() || !con.mapped || !con.rect.contains(position) {
                return None;
            }
            if self.inside_floating(id).is_some() || id.parent(map).is_some_and(|p| map[p].is_dockarea()) {
                return None;
            }
            let ws = self.get_workspace(id)?;
            if !self.is_visible_workspace(ws) {
                return None;
            }
            let fs = global_fs.or_else(|| fullscreen_con(map, ws, FullscreenMode::Output));
            match fs {
                Some(fs) if fs != id && !id.has_ancestor(fs, map) => None,
                _ => Some(id),
            }
        });
        leaf.or_else(|| {
            let output = self
                .outputs()
                .into_iter()
                .find(|&o| map[o].rect.contains(position))?;
            visible_workspace(map, output)
        })
    }

    /// Decides how a drop at `position` relates to `target`: near an edge
    /// shared with the target's parent it goes next to the parent, near any
    /// other edge next to the target, and otherwise onto it.
    pub fn classify_drop(&self, target: ConId, position: Point) -> DropTarget {
        let map = &self.tree.map;
        let rect = map[target].rect;
        let distances = [
            (Direction::Left, position.x - rect.x),
            (Direction::Up, position.y - rect.y),
            (Direction::Right, rect.max_x() - position.x),
            (Direction::Down, rect.max_y() - position.y),
        ];
        let (direction, d_min) = distances
            .into_iter()
            .fold((Direction::Left, i32::MAX), |best, (dir, d)| if d < best.1 { (dir, d) } else { best });

        let zones = &self.config.drag;
        let kind = if map[target].kind == ConType::Workspace {
            DropKind::Center
        } else {
            let parent = target.parent(map).filter(|&p| map[p].kind != ConType::Workspace);
            let shares_edge = parent.is_some_and(|p| edge(&map[p].rect, direction) == edge(&rect, direction));
            if shares_edge && d_min < zones.parent_zone {
                DropKind::Parent
            } else if d_min < zones.sibling_zone {
                DropKind::Sibling
            } else {
                DropKind::Center
            }
        };
        DropTarget { con: target, kind, direction }
    }

    /// Applies a finished tiling drag.
    fn commit_drop(&mut self, con: ConId, drop: DropTarget) {
        let DropTarget { con: target, kind, direction } = drop;
        if !self.tree.map.contains(target) || !self.tree.map.contains(con) {
            return;
        }
        if target == con && kind != DropKind::Parent {
            debug!(?con, "dropped onto itself");
            return;
        }
        if target.has_ancestor(con, &self.tree.map) {
            debug!(?con, ?target, "dropped into its own subtree");
            return;
        }
        debug!(?con, ?target, ?kind, %direction, "committing drop");
        let position = Position::toward(direction);
        match kind {
            DropKind::Center => {
                if self.tree[target].kind == ConType::Workspace {
                    self.move_to_workspace(con, target, true, false);
                } else if self.is_leaf(target) {
                    self.swap(con, target);
                } else {
                    let anchor = self.descend_focused(target);
                    self.insert_con_into(con, anchor, Position::After);
                }
            }
            DropKind::Sibling => {
                let orientation = direction.orientation();
                let parent = target.parent(&self.tree.map).expect("drop target is detached");
                if self.tree[parent].effective_orientation() != Some(orientation) {
                    let siblings = parent.num_children(&self.tree.map);
                    let only_pair = siblings == 2 && con.parent(&self.tree.map) == Some(parent);
                    if siblings == 1 || only_pair {
                        let p = &mut self.tree[parent];
                        p.layout = Layout::Default;
                        p.orientation = Some(orientation);
                    } else {
                        self.tree_split(target, orientation);
                    }
                }
                self.insert_con_into(con, target, position);
            }
            DropKind::Parent => {
                let map = &self.tree.map;
                let parent = target.parent(map).expect("drop target is detached");
                let in_stack = parent
                    .parent(map)
                    .is_some_and(|gp| map[gp].layout.is_stacked_or_tabbed());
                if in_stack {
                    self.tree_move(con, direction);
                } else {
                    self.insert_con_into(con, parent, position);
                }
            }
        }
        self.flatten();
        if self.tree.map.contains(con) {
            self.focus(con);
        }
    }
}

fn edge(rect: &Rect, direction: Direction) -> i32 {
    match direction {
        Direction::Left => rect.x,
        Direction::Up => rect.y,
        Direction::Right => rect.max_x(),
        Direction::Down => rect.max_y(),
    }
}
