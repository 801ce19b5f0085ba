//! Structural operations on the container tree: attach, detach, focus, the
//! queries built on them, and the operations that open, close and split
//! containers.

use tracing::{debug, instrument, trace};

use super::WindowManager;
use crate::layout_engine::{Orientation, Position, fullscreen_con, visible_workspace};
use crate::model::{BorderStyle, Con, ConId, ConType, FullscreenMode, InsertAt, Layout, Window};
use crate::sync::DisplayConnection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseMode {
    /// Ask clients to close. Their containers stay until the client is gone.
    KillWindow,
    /// Clients are already gone; drop the containers right away.
    DontKillWindow,
}

impl<D: DisplayConnection> WindowManager<D> {
    pub fn is_leaf(&self, id: ConId) -> bool { id.nodes(&self.tree.map).is_empty() }

    /// A container that lays out tiling children.
    pub fn is_split(&self, id: ConId) -> bool {
        !self.is_leaf(id) && !matches!(self.tree[id].layout, Layout::Dockarea | Layout::Output)
    }

    pub fn accepts_window(&self, id: ConId) -> bool {
        let con = &self.tree[id];
        con.kind == ConType::Con
            && !con.is_dockarea()
            && con.window.is_none()
            && !self.is_split(id)
            && !id.parent(&self.tree.map).is_some_and(|p| self.tree[p].kind == ConType::Output)
    }

    pub fn is_floating(&self, id: ConId) -> bool {
        let con = &self.tree[id];
        con.kind == ConType::FloatingCon || con.floating.is_floating()
    }

    /// The floating wrapper `id` lives in, if any.
    pub fn inside_floating(&self, id: ConId) -> Option<ConId> {
        let map = &self.tree.map;
        id.ancestors(map).find(|&a| map[a].kind == ConType::FloatingCon)
    }

    #[track_caller]
    pub fn get_output(&self, id: ConId) -> ConId {
        let map = &self.tree.map;
        assert_ne!(map[id].kind, ConType::Root, "the root has no output");
        id.ancestors(map)
            .find(|&a| map[a].kind == ConType::Output)
            .unwrap_or_else(|| panic!("{id:?} is not below an output"))
    }

    pub fn get_workspace(&self, id: ConId) -> Option<ConId> {
        let map = &self.tree.map;
        id.ancestors(map).find(|&a| map[a].kind == ConType::Workspace)
    }

    /// Closest ancestor laying out its children along `orientation`, not
    /// looking past the workspace.
    pub fn parent_with_orientation(&self, id: ConId, orientation: Orientation) -> Option<ConId> {
        let map = &self.tree.map;
        let mut parent = id.parent(map)?;
        if map[parent].kind == ConType::FloatingCon {
            return None;
        }
        while map[parent].effective_orientation() != Some(orientation) {
            parent = parent.parent(map)?;
            let beyond_workspace = matches!(map[parent].kind, ConType::FloatingCon | ConType::Output)
                || parent.parent(map).is_some_and(|gp| map[gp].kind == ConType::Output);
            if beyond_workspace {
                return None;
            }
        }
        Some(parent)
    }

    /// Follows focus orders down from `id`, stopping at the focused container.
    pub fn descend_focused(&self, id: ConId) -> ConId {
        let map = &self.tree.map;
        let mut next = id;
        while next != self.focused {
            match next.first_focused(map) {
                Some(child) => next = child,
                None => break,
            }
        }
        next
    }

    /// Like [`descend_focused`](Self::descend_focused) but never enters a
    /// floating container.
    pub fn descend_tiling_focused(&self, id: ConId) -> ConId {
        let map = &self.tree.map;
        let mut next = id;
        while next != self.focused {
            let child = next
                .focus_order(map)
                .iter()
                .copied()
                .find(|&c| map[c].kind != ConType::FloatingCon);
            match child {
                Some(child) => next = child,
                None => break,
            }
        }
        next
    }

    /// The container that should get focus if `id` went away. Pure query.
    pub fn next_focused(&self, id: ConId) -> ConId {
        let map = &self.tree.map;
        let parent = id.parent(map).expect("the root has no replacement");

        if map[parent].is_dockarea() {
            let output = self.get_output(id);
            return match visible_workspace(map, output) {
                Some(ws) => self.descend_focused(ws),
                None => output,
            };
        }

        if map[id].kind == ConType::FloatingCon {
            return match id.next_sibling(map).or_else(|| id.prev_sibling(map)) {
                Some(sibling) => self.descend_focused(sibling),
                None => self.descend_tiling_focused(parent),
            };
        }

        let mut current = id;
        loop {
            let parent = current.parent(map).expect("walked past the root");
            if let Some(other) = parent.focus_order(map).iter().copied().find(|&c| c != current) {
                return self.descend_focused(other);
            }
            if !self.collapses_when_emptied(parent) {
                return parent;
            }
            current = parent;
        }
    }

    /// Containers that are closed once their last child is removed.
    fn collapses_when_emptied(&self, id: ConId) -> bool {
        let map = &self.tree.map;
        let con = &map[id];
        matches!(con.kind, ConType::Con | ConType::FloatingCon)
            && !con.is_dockarea()
            && !id.parent(map).is_some_and(|p| map[p].kind == ConType::Output)
    }

    /// Makes the tiling children's percents sum to one. Children without a
    /// percent get the average of those that have one.
    pub fn fix_percent(&mut self, id: ConId) {
        let children = id.nodes(&self.tree.map).to_vec();
        if children.is_empty() {
            return;
        }
        let set: Vec<f64> =
            children.iter().map(|&c| self.tree[c].percent).filter(|&p| p > 0.0).collect();
        let fill = if set.is_empty() { 1.0 } else { set.iter().sum::<f64>() / set.len() as f64 };
        for &child in &children {
            if self.tree[child].percent <= 0.0 {
                self.tree[child].percent = fill;
            }
        }
        let total: f64 = children.iter().map(|&c| self.tree[c].percent).sum();
        for &child in &children {
            self.tree[child].percent /= total;
        }
    }

    /// Inserts `id` under `parent`: floating wrappers into the floating list,
    /// anything else after the focused tiling child (or at the end when
    /// `ignore_focus` is set). The container always joins the tail of the
    /// focus order.
    ///
    /// A window attached directly to a workspace with a `workspace_layout`
    /// is put into a fresh container of that layout instead.
    pub fn attach(&mut self, id: ConId, parent: ConId, ignore_focus: bool) {
        let mut target = parent;
        let mut after = None;
        if self.tree[id].kind != ConType::FloatingCon {
            if !ignore_focus {
                let map = &self.tree.map;
                after = parent
                    .focus_order(map)
                    .iter()
                    .copied()
                    .find(|&c| map[c].kind != ConType::FloatingCon);
            }
            let p = &self.tree[parent];
            if self.tree[id].window.is_some()
                && p.kind == ConType::Workspace
                && p.workspace_layout != Layout::Default
            {
                target = self.workspace_attach_to(parent);
                after = None;
            }
        }
        assert!(
            !(self.tree[target].kind == ConType::Workspace && self.tree[id].kind == ConType::Workspace),
            "workspaces cannot nest"
        );
        let at = match after {
            Some(sibling) if self.tree[target].kind != ConType::Output => {
                InsertAt::Sibling(sibling, Position::After)
            }
            _ => InsertAt::Back,
        };
        self.tree.link(id, target, at);
    }

    /// Removes `id` from its parent's sequences. Percents and the parent's
    /// collapse check are up to the caller.
    pub fn detach(&mut self, id: ConId) { self.tree.unlink(id) }

    fn workspace_attach_to(&mut self, ws: ConId) -> ConId {
        let layout = self.tree[ws].workspace_layout;
        let split = self.tree.mk_con(Con::new(ConType::Con).with_layout(layout));
        self.attach(split, ws, false);
        self.fix_percent(ws);
        split
    }

    /// Focuses `id`, moving it to the front of every focus order on the way
    /// to the root.
    pub fn focus(&mut self, id: ConId) {
        let chain: Vec<ConId> = id.ancestors(&self.tree.map).collect();
        for con in chain {
            self.tree.focus_front(con);
        }
        trace!(?id, "focus");
        self.focused = id;
        if self.tree[id].urgent && self.is_leaf(id) {
            self.set_urgency(id, false);
        }
    }

    /// Brings `id` to the front of focus orders below `ws` only, leaving the
    /// globally focused container alone.
    pub(super) fn focus_within(&mut self, id: ConId, ws: ConId) {
        let chain: Vec<ConId> =
            id.ancestors(&self.tree.map).take_while(|&c| c != ws).collect();
        for con in chain {
            self.tree.focus_front(con);
        }
    }

    pub fn set_urgency(&mut self, id: ConId, urgent: bool) {
        if urgent && id == self.focused {
            debug!(?id, "ignoring urgency of the focused container");
            return;
        }
        self.tree[id].urgent = urgent;
        self.update_parents_urgency(id);
    }

    pub(super) fn update_parents_urgency(&mut self, id: ConId) {
        let ancestors: Vec<ConId> = id.ancestors(&self.tree.map).skip(1).collect();
        for con in ancestors {
            let kind = self.tree[con].kind;
            if matches!(kind, ConType::Output | ConType::Root) {
                break;
            }
            let map = &self.tree.map;
            let urgent = con.children(map).any(|c| map[c].urgent);
            self.tree[con].urgent = urgent;
            if kind == ConType::Workspace {
                break;
            }
        }
    }

    fn refresh_urgency(&mut self, id: ConId) {
        let map = &self.tree.map;
        let urgent = id.children(map).any(|c| map[c].urgent);
        self.tree[id].urgent = urgent;
        self.update_parents_urgency(id);
    }

    /// Called after a child of `id` was removed.
    pub(super) fn on_remove_child(&mut self, id: ConId) {
        if !self.tree.map.contains(id) {
            return;
        }
        match self.tree[id].kind {
            ConType::Root | ConType::Output => {}
            ConType::Workspace => self.refresh_urgency(id),
            ConType::Con | ConType::FloatingCon => {
                if !self.collapses_when_emptied(id) {
                    return;
                }
                self.refresh_urgency(id);
                if id.children(&self.tree.map).next().is_none() {
                    trace!(?id, "closing emptied container");
                    self.tree_close(id, CloseMode::DontKillWindow);
                }
            }
        }
    }

    /// Closes `id` and everything below it, children first. Returns false
    /// when a client was asked to close and the container has to stay until
    /// it does.
    #[instrument(level = "debug", skip(self))]
    pub fn tree_close(&mut self, id: ConId, mode: CloseMode) -> bool {
        let map = &self.tree.map;
        assert_ne!(map[id].kind, ConType::Root, "closing the root");
        let parent = id.parent(map).expect("closing a detached container");
        let refocus = self.focused == id || self.focused.has_ancestor(id, map);
        let next = refocus.then(|| self.next_focused(id));

        if !self.close_subtree(id, mode) {
            return false;
        }

        if let Some(next) = next {
            if self.tree.map.contains(next) {
                self.focus(next);
            } else {
                self.focus(parent);
            }
        }
        self.on_remove_child(parent);
        true
    }

    fn close_subtree(&mut self, id: ConId, mode: CloseMode) -> bool {
        self.tree[id].urgent = false;
        let children: Vec<ConId> = id.children(&self.tree.map).collect();
        let mut all_closed = true;
        for child in children {
            all_closed &= self.close_subtree(child, mode);
        }
        if !all_closed {
            debug!(?id, "waiting for clients to close");
            return false;
        }

        if let Some(handle) = self.tree[id].window.as_ref().map(|w| w.handle) {
            match mode {
                CloseMode::KillWindow => {
                    self.tree.data.kill_client(handle);
                    return false;
                }
                CloseMode::DontKillWindow => {
                    self.windows.remove(&handle);
                    self.tree.data.release_client(id);
                }
            }
        }

        let parent = id.parent(&self.tree.map);
        self.tree.unlink(id);
        if let Some(parent) = parent {
            if self.tree[id].kind != ConType::FloatingCon {
                self.fix_percent(parent);
            }
        }
        self.tree.remove(id);
        true
    }

    /// Opens a new leaf, next to the focused container unless `parent` is
    /// given.
    pub fn tree_open(&mut self, parent: Option<ConId>, window: Option<Window>) -> ConId {
        let parent = parent.unwrap_or_else(|| self.open_target());
        let mut con = Con::new(ConType::Con);
        con.border_style = self.config.settings.default_border;
        con.window = window;
        let id = self.tree.mk_con(con);
        self.attach(id, parent, false);
        let actual = id.parent(&self.tree.map).expect("just attached");
        self.fix_percent(actual);
        id
    }

    fn open_target(&self) -> ConId {
        let map = &self.tree.map;
        let focused = self.focused;
        let in_workspace =
            || self.focused_workspace().expect("no workspace to open a container on");
        match map[focused].kind {
            ConType::Root | ConType::Output => in_workspace(),
            ConType::Workspace => focused,
            ConType::Con | ConType::FloatingCon => {
                let parent = focused.parent(map).expect("focused container is detached");
                if self.inside_floating(focused).is_some() {
                    let ws = self.get_workspace(focused).expect("floating container outside a workspace");
                    let tiling = self.descend_tiling_focused(ws);
                    if tiling == ws { ws } else { tiling.parent(map).unwrap_or(ws) }
                } else if map[parent].is_dockarea() {
                    in_workspace()
                } else {
                    parent
                }
            }
        }
    }

    /// Prepares `id` for children laid out along `orientation`.
    pub fn tree_split(&mut self, id: ConId, orientation: Orientation) {
        if self.is_floating(id) || self.inside_floating(id).is_some() {
            debug!(?id, "floating containers cannot be split");
            return;
        }
        let mut id = id;
        if self.tree[id].kind == ConType::Workspace {
            let children = id.num_children(&self.tree.map);
            if children < 2 {
                let ws = &mut self.tree[id];
                if children == 0 {
                    ws.workspace_layout = Layout::Default;
                }
                ws.layout = Layout::Default;
                ws.orientation = Some(orientation);
                return;
            }
            match self.workspace_encapsulate(id) {
                Some(inner) => id = inner,
                None => return,
            }
        }

        let parent = id.parent(&self.tree.map).expect("splitting a detached container");
        if parent.num_children(&self.tree.map) == 1 && self.tree[parent].layout == Layout::Default {
            trace!(?parent, ?orientation, "reorienting single-child parent");
            self.tree[parent].orientation = Some(orientation);
            return;
        }

        let split = self.tree.mk_con(Con::new(ConType::Con).with_orientation(orientation));
        self.tree.replace(id, split);
        self.tree[split].percent = self.tree[id].percent;
        self.tree[id].percent = 0.0;
        self.attach(id, split, false);
        self.fix_percent(split);
    }

    /// Moves every tiling child of `ws` into a new container carrying the
    /// workspace's layout, which becomes the workspace's only tiling child.
    pub fn workspace_encapsulate(&mut self, ws: ConId) -> Option<ConId> {
        let map = &self.tree.map;
        let children = ws.nodes(map).to_vec();
        if children.is_empty() {
            debug!(?ws, "workspace has nothing to encapsulate");
            return None;
        }
        let ws_focus = ws.focus_order(map).to_vec();
        let inner_focus: Vec<ConId> =
            ws_focus.iter().copied().filter(|c| children.contains(c)).collect();
        let slot = ws_focus.iter().position(|c| children.contains(c)).unwrap_or(ws_focus.len());

        let mut inner = Con::new(ConType::Con).with_layout(self.tree[ws].layout);
        inner.orientation = self.tree[ws].orientation;
        let inner = self.tree.mk_con(inner);
        for &child in &children {
            self.tree.unlink(child);
            self.tree.link(child, inner, InsertAt::Back);
        }
        self.tree.set_focus_order(inner, inner_focus);
        self.attach(inner, ws, true);

        let mut focus: Vec<ConId> =
            ws_focus.into_iter().filter(|c| !children.contains(c)).collect();
        focus.insert(slot.min(focus.len()), inner);
        self.tree.set_focus_order(ws, focus);
        self.fix_percent(ws);
        Some(inner)
    }

    pub fn set_layout(&mut self, id: ConId, layout: Layout) {
        if matches!(layout, Layout::Dockarea | Layout::Output) {
            debug!(%layout, "layout is reserved for docks and outputs");
            return;
        }
        match self.tree[id].kind {
            ConType::Workspace => {
                if id.num_children(&self.tree.map) == 0 {
                    let ws = &mut self.tree[id];
                    ws.workspace_layout = layout;
                    if layout == Layout::Default {
                        ws.layout = Layout::Default;
                    }
                } else if layout.is_stacked_or_tabbed() {
                    if let Some(inner) = self.workspace_encapsulate(id) {
                        self.tree[inner].layout = layout;
                    }
                } else {
                    self.tree[id].layout = layout;
                }
            }
            ConType::Con if self.is_leaf(id) => {
                let parent = id.parent(&self.tree.map).expect("leaf without parent");
                if self.tree[parent].kind == ConType::FloatingCon {
                    debug!(?id, "floating containers keep their layout");
                    return;
                }
                self.set_layout(parent, layout);
            }
            ConType::Con => {
                let con = &mut self.tree[id];
                con.layout = layout;
                if layout == Layout::Default && con.orientation.is_none() {
                    con.orientation = Some(Orientation::Horizontal);
                }
            }
            ConType::FloatingCon | ConType::Output | ConType::Root => {
                debug!(?id, "layout not applicable");
            }
        }
    }

    pub fn set_border_style(&mut self, id: ConId, style: BorderStyle) {
        let target = match self.tree[id].kind {
            ConType::FloatingCon => match id.nodes(&self.tree.map).first() {
                Some(&child) => child,
                None => return,
            },
            _ => id,
        };
        self.tree[target].border_style = style;
    }

    /// Fullscreens `id` in `mode`, first disabling whichever container
    /// already holds that scope.
    pub fn enable_fullscreen(&mut self, id: ConId, mode: FullscreenMode) {
        assert_ne!(mode, FullscreenMode::None, "use disable_fullscreen");
        if matches!(self.tree[id].kind, ConType::Workspace | ConType::Output | ConType::Root) {
            debug!(?id, "only regular containers can be fullscreen");
            return;
        }
        if self.tree[id].fullscreen_mode == mode {
            return;
        }
        let ws = self.get_workspace(id);
        let conflicting = fullscreen_con(&self.tree.map, self.root, FullscreenMode::Global)
            .or_else(|| ws.and_then(|ws| fullscreen_con(&self.tree.map, ws, FullscreenMode::Output)));
        if let Some(other) = conflicting.filter(|&c| c != id) {
            debug!(?other, "disabling conflicting fullscreen container");
            self.disable_fullscreen(other);
        }

        let previous = self.focused;
        let previous_ws = self.get_workspace(previous);
        self.focus(self.descend_focused(id));
        if mode == FullscreenMode::Output && previous_ws != ws {
            self.focus(previous);
        }
        self.tree[id].fullscreen_mode = mode;
    }

    pub fn disable_fullscreen(&mut self, id: ConId) {
        self.tree[id].fullscreen_mode = FullscreenMode::None;
    }

    pub fn toggle_fullscreen(&mut self, id: ConId, mode: FullscreenMode) {
        if self.tree[id].is_fullscreen() {
            self.disable_fullscreen(id);
        } else {
            self.enable_fullscreen(id, mode);
        }
    }
}
