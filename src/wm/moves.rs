//! Moving containers around: swaps, transfers between workspaces,
//! directional moves, and the flattening pass that removes split containers
//! made redundant by a move.

use tracing::{debug, instrument, trace};

use super::WindowManager;
use crate::layout_engine::{Direction, Orientation, Position, fullscreen_con, visible_workspace};
use crate::model::{ConId, ConType, FullscreenMode, InsertAt, Layout};
use crate::sync::DisplayConnection;

impl<D: DisplayConnection> WindowManager<D> {
    /// Exchanges two regular containers, including their sizes. Returns false
    /// if the pair cannot be swapped.
    pub fn swap(&mut self, a: ConId, b: ConId) -> bool {
        let map = &self.tree.map;
        if map[a].kind != ConType::Con || map[b].kind != ConType::Con {
            debug!(?a, ?b, "only regular containers can be swapped");
            return false;
        }
        if a == b || a.has_ancestor(b, map) || b.has_ancestor(a, map) {
            debug!(?a, ?b, "cannot swap a container with its own ancestor");
            return false;
        }
        let in_dock = |id: ConId| id.parent(map).is_some_and(|p| map[p].is_dockarea());
        if in_dock(a) || in_dock(b) {
            return false;
        }

        for id in [a, b] {
            if self.tree[id].is_fullscreen() {
                self.disable_fullscreen(id);
            }
        }
        self.tree.swap(a, b);
        let (pa, pb) = (self.tree[a].percent, self.tree[b].percent);
        self.tree[a].percent = pb;
        self.tree[b].percent = pa;
        let (fa, fb) = (self.tree[a].floating, self.tree[b].floating);
        self.tree[a].floating = fb;
        self.tree[b].floating = fa;

        let focused = self.focused;
        let map = &self.tree.map;
        if [a, b].iter().any(|&c| focused == c || focused.has_ancestor(c, map)) {
            self.focus(focused);
        }
        trace!(?a, ?b, "swapped");
        true
    }

    /// Moves `id` (or the floating container holding it) to workspace `ws`.
    ///
    /// With `fix_coordinates`, a floating container that changes outputs keeps
    /// its position relative to the output's origin. With `warp`, the pointer
    /// follows a move onto another output.
    #[instrument(level = "debug", skip(self))]
    pub fn move_to_workspace(&mut self, id: ConId, ws: ConId, fix_coordinates: bool, warp: bool) {
        assert_eq!(self.tree[ws].kind, ConType::Workspace, "{ws:?} is not a workspace");
        let con = self.inside_floating(id).unwrap_or(id);
        let kind = self.tree[con].kind;
        if !matches!(kind, ConType::Con | ConType::FloatingCon) {
            debug!(?con, %kind, "only regular and floating containers move between workspaces");
            return;
        }
        let map = &self.tree.map;
        let old_parent = con.parent(map).expect("moving a detached container");
        if map[old_parent].is_dockarea() {
            debug!(?con, "dock clients stay on their output");
            return;
        }
        let source_ws = self.get_workspace(con).expect("container outside a workspace");
        if source_ws == ws {
            return;
        }
        let had_focus = self.focused == con || self.focused.has_ancestor(con, map);
        let focus_next = had_focus.then(|| self.next_focused(con));

        let target = if kind == ConType::FloatingCon {
            ws
        } else {
            let focus = self.descend_tiling_focused(ws);
            if focus == ws { ws } else { focus.parent(&self.tree.map).unwrap_or(ws) }
        };

        let source_output = self.get_output(source_ws);
        let dest_output = self.get_output(ws);
        if kind == ConType::FloatingCon && fix_coordinates && source_output != dest_output {
            let from = self.tree[source_output].rect;
            let to = self.tree[dest_output].rect;
            let subtree: Vec<ConId> = con.traverse_preorder(&self.tree.map).collect();
            for c in subtree {
                let rect = self.tree[c].rect.rebase(&from, &to);
                self.tree[c].rect = rect;
            }
        }

        if fullscreen_con(&self.tree.map, ws, FullscreenMode::Output).is_some() {
            let moving: Vec<ConId> = con
                .traverse_preorder(&self.tree.map)
                .filter(|&c| self.tree[c].fullscreen_mode == FullscreenMode::Output)
                .collect();
            for c in moving {
                debug!(?c, "destination already has a fullscreen container");
                self.disable_fullscreen(c);
            }
        }

        self.tree.unlink(con);
        if kind != ConType::FloatingCon {
            self.fix_percent(old_parent);
            self.tree[con].percent = 0.0;
        }
        self.attach(con, target, false);
        let new_parent = con.parent(&self.tree.map).expect("just attached");
        if kind != ConType::FloatingCon {
            self.fix_percent(new_parent);
        }
        self.focus_within(con, ws);

        if let Some(next) = focus_next.filter(|&n| self.tree.map.contains(n)) {
            self.focus(next);
        }
        self.update_parents_urgency(con);
        self.on_remove_child(old_parent);

        if warp && source_output != dest_output {
            let to = self.tree[dest_output].rect.center();
            self.tree.data.request_warp(to);
        }
    }

    /// Moves `id` one step in `direction`: past its neighbour, into a
    /// neighbouring split, out of its parent, or onto the next output.
    #[instrument(level = "debug", skip(self))]
    pub fn tree_move(&mut self, id: ConId, direction: Direction) {
        let con = &self.tree[id];
        if con.kind != ConType::Con || con.fullscreen_mode == FullscreenMode::Global {
            debug!(?id, "container cannot be moved");
            return;
        }
        let map = &self.tree.map;
        let parent = id.parent(map).expect("moving a detached container");
        if map[parent].is_dockarea() {
            return;
        }
        if map[parent].kind == ConType::Workspace && parent.num_children(map) == 1 {
            self.move_to_output_directed(id, direction);
            return;
        }

        let orientation = direction.orientation();
        let position = Position::toward(direction);
        let mut same = self.parent_with_orientation(id, orientation);
        let same = loop {
            let candidate = match same {
                Some(s) => s,
                None => {
                    if self.tree[id].floating.is_floating() {
                        self.floating_disable(id, true);
                        return;
                    }
                    if self.inside_floating(id).is_some() {
                        let ws = self.get_workspace(id).expect("floating container outside a workspace");
                        self.attach_to_workspace(id, ws, direction);
                        self.flatten();
                        return;
                    }
                    let ws = self.get_workspace(id).expect("container outside a workspace");
                    self.ws_force_orientation(ws, orientation);
                    match self.parent_with_orientation(id, orientation) {
                        Some(s) => s,
                        None => return,
                    }
                }
            };
            let map = &self.tree.map;
            let parent = id.parent(map).expect("moving a detached container");
            if candidate != parent {
                break candidate;
            }
            let neighbour = match position {
                Position::Before => id.prev_sibling(map),
                Position::After => id.next_sibling(map),
            };
            if let Some(neighbour) = neighbour {
                if self.is_leaf(neighbour) {
                    self.swap_adjacent(id, neighbour, position);
                } else {
                    trace!(?neighbour, "moving into neighbouring branch");
                    let target = self.descend_direction(neighbour, direction);
                    let at = self.position_next_to(target, orientation, direction);
                    self.insert_con_into(id, target, at);
                    self.flatten();
                }
                return;
            }
            if map[parent].kind == ConType::Workspace {
                self.move_to_output_directed(id, direction);
                return;
            }
            same = self.parent_with_orientation(parent, orientation);
            if let Some(s) = same {
                break s;
            }
        };

        let map = &self.tree.map;
        let above = id
            .ancestors(map)
            .find(|&a| a.parent(map) == Some(same))
            .expect("oriented ancestor does not contain the container");
        if !self.fullscreen_permits_focusing(same) {
            debug!(?id, "cannot move out of a fullscreen container");
            return;
        }
        let next = match position {
            Position::Before => above.prev_sibling(map),
            Position::After => above.next_sibling(map),
        };
        let parent = id.parent(map).expect("moving a detached container");
        match next {
            Some(next) if !self.is_leaf(next) => {
                trace!(?next, "moving into the branch next to an ancestor");
                let target = self.descend_direction(next, direction);
                let at = self.position_next_to(target, orientation, direction);
                self.insert_con_into(id, target, at);
            }
            None if parent.parent(map).is_some_and(|gp| map[gp].kind == ConType::Workspace)
                && map[parent].layout != Layout::Default
                && parent.num_children(map) == 1 =>
            {
                self.move_to_output_directed(id, direction);
                return;
            }
            _ => self.insert_con_into(id, above, position),
        }
        self.flatten();
    }

    /// Exchanges two neighbours in their parent's child list without touching
    /// the focus order.
    fn swap_adjacent(&mut self, id: ConId, neighbour: ConId, position: Position) {
        let parent = id.parent(&self.tree.map).expect("moving a detached container");
        let focus = parent.focus_order(&self.tree.map).to_vec();
        self.tree.unlink(id);
        self.tree.link(id, parent, InsertAt::Sibling(neighbour, position));
        self.tree.set_focus_order(parent, focus);
        trace!(?id, ?neighbour, "swapped with neighbour");
    }

    fn position_next_to(&self, target: ConId, orientation: Orientation, direction: Direction) -> Position {
        let map = &self.tree.map;
        let parent_orientation = target.parent(map).and_then(|p| map[p].effective_orientation());
        if parent_orientation != Some(orientation) || direction.is_backward() {
            Position::After
        } else {
            Position::Before
        }
    }

    /// The container a move in `direction` enters `id` through: its edge
    /// child along a matching axis, else its focused child.
    fn descend_direction(&self, id: ConId, direction: Direction) -> ConId {
        let map = &self.tree.map;
        let mut current = id;
        loop {
            let Some(orientation) = map[current].effective_orientation() else {
                return current;
            };
            let nodes = current.nodes(map);
            let next = if orientation == direction.orientation() {
                (if direction.is_backward() { nodes.last() } else { nodes.first() }).copied()
            } else {
                current.focus_order(map).iter().copied().find(|&c| map[c].kind != ConType::FloatingCon)
            };
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    /// False when a fullscreen container on the way would hide `id`.
    fn fullscreen_permits_focusing(&self, id: ConId) -> bool {
        let map = &self.tree.map;
        let Some(ws) = self.get_workspace(id) else { return true };
        let fs = fullscreen_con(map, self.root, FullscreenMode::Global)
            .or_else(|| fullscreen_con(map, ws, FullscreenMode::Output));
        match fs {
            Some(fs) => id == fs || id.has_ancestor(fs, map),
            None => true,
        }
    }

    /// Puts `con` next to `target`, keeping the focus path through their
    /// lowest common ancestor when `con` carried it.
    pub(super) fn insert_con_into(&mut self, con: ConId, target: ConId, position: Position) {
        let map = &self.tree.map;
        let parent = target.parent(map).expect("inserting next to a detached container");
        let old_parent = con.parent(map).expect("inserting a detached container");
        let lca = parent
            .ancestors(map)
            .find(|&a| a == con || con.has_ancestor(a, map))
            .expect("containers live in different trees");
        if lca == con {
            debug!(?con, ?target, "cannot move a container into its own descendant");
            return;
        }
        let child_of_lca = |id: ConId| {
            id.ancestors(map)
                .find(|&a| a.parent(map) == Some(lca))
                .expect("lca is an ancestor")
        };
        let con_ancestor = child_of_lca(con);
        let target_ancestor = child_of_lca(target);
        let moves_focus = con
            .ancestors(map)
            .take_while(|&c| c != con_ancestor)
            .all(|c| c.parent(map).and_then(|p| p.first_focused(map)) == Some(c));
        if con_ancestor != target_ancestor && moves_focus {
            let order = lca.focus_order(map);
            let con_idx = order.iter().position(|&c| c == con_ancestor);
            let target_idx = order.iter().position(|&c| c == target_ancestor);
            if con_idx < target_idx {
                let mut order: Vec<ConId> =
                    order.iter().copied().filter(|&c| c != target_ancestor).collect();
                let slot = order.iter().position(|&c| c == con_ancestor).unwrap_or(0);
                order.insert(slot, target_ancestor);
                self.tree.set_focus_order(lca, order);
            }
        }

        self.tree.unlink(con);
        self.fix_percent(old_parent);
        self.tree.link(con, parent, InsertAt::Sibling(target, position));
        self.tree.focus_front(con);
        self.tree[con].percent = 0.0;
        self.fix_percent(parent);
        trace!(?con, ?target, ?position, "inserted");
        self.on_remove_child(old_parent);
    }

    /// Moves `con` directly under `ws`, at the edge it is moving away from.
    fn attach_to_workspace(&mut self, con: ConId, ws: ConId, direction: Direction) {
        let old_parent = con.parent(&self.tree.map).expect("moving a detached container");
        self.tree.unlink(con);
        let at = match direction {
            Direction::Right | Direction::Down => InsertAt::Front,
            Direction::Left | Direction::Up => InsertAt::Back,
        };
        self.tree.link(con, ws, at);
        self.tree.focus_front(con);
        self.tree[con].percent = 0.0;
        self.fix_percent(ws);
        self.fix_percent(old_parent);
        self.on_remove_child(old_parent);
    }

    fn move_to_output_directed(&mut self, con: ConId, direction: Direction) {
        let output = self.get_output(con);
        let Some(next) = self.output_in_direction(output, direction) else {
            debug!(?output, %direction, "no output in that direction");
            return;
        };
        let Some(ws) = visible_workspace(&self.tree.map, next) else {
            return;
        };
        let moves_focus = self.focused == con;
        self.attach_to_workspace(con, ws, direction);
        if moves_focus {
            self.focus(con);
        }
        self.flatten();
    }

    /// Gives `ws` the orientation a move needs, pushing its current children
    /// down into a container that keeps the old layout.
    fn ws_force_orientation(&mut self, ws: ConId, orientation: Orientation) {
        if let Some(inner) = self.workspace_encapsulate(ws) {
            trace!(?ws, ?inner, "encapsulated workspace to change orientation");
        }
        let con = &mut self.tree[ws];
        con.layout = Layout::Default;
        con.orientation = Some(orientation);
    }

    /// Removes pairs of split containers where a single-child split only
    /// undoes the orientation change of its own child.
    pub fn flatten(&mut self) { self.flatten_from(self.root) }

    fn flatten_from(&mut self, id: ConId) {
        if self.flatten_redundant(id) {
            return;
        }
        let map = &self.tree.map;
        let children: Vec<ConId> =
            id.nodes(map).iter().chain(id.floating_nodes(map)).copied().collect();
        for child in children {
            if self.tree.map.contains(child) {
                self.flatten_from(child);
            }
        }
    }

    fn flatten_redundant(&mut self, id: ConId) -> bool {
        let map = &self.tree.map;
        let con = &map[id];
        let Some(parent) = id.parent(map) else { return false };
        if con.kind != ConType::Con || con.window.is_some() || map[parent].layout == Layout::Output {
            return false;
        }
        let &[child] = id.nodes(map) else { return false };
        let inner = &map[child];
        let redundant = self.is_split(child)
            && con.layout == Layout::Default
            && inner.layout == Layout::Default
            && con.effective_orientation() != inner.effective_orientation()
            && inner.effective_orientation() == map[parent].effective_orientation();
        if !redundant {
            return false;
        }

        self.fix_percent(child);
        let map = &self.tree.map;
        let share = map[id].percent;
        let grandchildren = child.nodes(map).to_vec();
        let inner_focus = child.focus_order(map).to_vec();
        let parent_focus: Vec<ConId> = parent
            .focus_order(map)
            .iter()
            .flat_map(|&c| if c == id { inner_focus.clone() } else { vec![c] })
            .collect();
        let was_focused = self.focused == id || self.focused == child;

        for &gc in &grandchildren {
            self.tree.unlink(gc);
            self.tree.link(gc, parent, InsertAt::Sibling(id, Position::Before));
            self.tree[gc].percent *= share;
        }
        self.tree.unlink(child);
        self.tree.remove(child);
        self.tree.unlink(id);
        self.tree.remove(id);
        self.tree.set_focus_order(parent, parent_focus);
        self.fix_percent(parent);
        trace!(?id, ?parent, "flattened redundant split");

        if was_focused {
            if let Some(&first) = inner_focus.first() {
                self.focus(first);
            }
        }
        true
    }
}
