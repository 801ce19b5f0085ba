//! Moving containers between the tiling tree and a workspace's floating list.

use tracing::debug;

use super::WindowManager;
use crate::common::geometry::Rect;
use crate::model::{BorderStyle, Con, ConId, ConType, FloatingState, InsertAt};
use crate::sync::DisplayConnection;

impl<D: DisplayConnection> WindowManager<D> {
    /// Wraps `id` in a floating container on its workspace. A workspace is
    /// encapsulated first so its children float together.
    pub fn floating_enable(&mut self, id: ConId, by_user: bool) {
        if self.inside_floating(id).is_some() {
            debug!(?id, "already floating");
            return;
        }
        let id = match self.tree[id].kind {
            ConType::Workspace => match self.workspace_encapsulate(id) {
                Some(inner) => inner,
                None => return,
            },
            ConType::Con => id,
            ConType::Root | ConType::Output | ConType::FloatingCon => {
                debug!(?id, "cannot float this container");
                return;
            }
        };
        let map = &self.tree.map;
        let old_parent = id.parent(map).expect("floating a detached container");
        if map[old_parent].is_dockarea() {
            debug!(?id, "dock clients do not float");
            return;
        }
        let ws = self.get_workspace(id).expect("floating container outside a workspace");
        let output_rect = self.tree[self.get_output(ws)].rect;

        if self.tree[id].border_style == self.config.settings.default_border {
            self.tree[id].border_style = self.config.settings.default_floating_border;
        }
        let rect = self.floating_rect(id, output_rect);

        self.tree.unlink(id);
        self.fix_percent(old_parent);

        let mut wrapper = Con::new(ConType::FloatingCon);
        wrapper.rect = rect;
        let wrapper = self.tree.mk_con(wrapper);
        self.tree.link(wrapper, ws, InsertAt::Back);

        let con = &mut self.tree[id];
        con.percent = 1.0;
        con.floating = FloatingState::new(true, by_user);
        self.tree.link(id, wrapper, InsertAt::Back);

        self.on_remove_child(old_parent);
        debug!(?id, ?wrapper, %rect, "floating enabled");
        self.focus(id);
    }

    /// Outer rectangle for a newly floating `id`: the window's own geometry
    /// plus decorations, else its tiled size, else half the output. Centred
    /// on the output when its centre would be off it.
    fn floating_rect(&self, id: ConId, output: Rect) -> Rect {
        let con = &self.tree[id];
        let geometry = con.window.as_ref().map(|w| w.geometry).filter(|r| !r.is_empty());
        let rect = match geometry {
            Some(g) => self.decorated_rect(g, con.border_style),
            None if !con.rect.is_empty() => con.rect,
            None => output.centered(output.width / 2, output.height / 2),
        };
        if output.contains(rect.center()) {
            rect
        } else {
            output.centered(rect.width, rect.height)
        }
    }

    /// Grows a client rectangle by the border and title band `style` adds.
    pub(super) fn decorated_rect(&self, window: Rect, style: BorderStyle) -> Rect {
        let settings = &self.config.settings;
        let bw = settings.border_width;
        let (dw, dh) = match style {
            BorderStyle::None => (0, 0),
            BorderStyle::Pixel => (2 * bw, 2 * bw),
            BorderStyle::Normal => (2 * bw, settings.deco_height + bw),
        };
        Rect::new(window.x, window.y, window.width + dw, window.height + dh)
    }

    /// Puts a floating container's child back into the tiling tree next to
    /// the workspace's focused tiling container. `id` may be the floating
    /// container or anything inside it.
    pub fn floating_disable(&mut self, id: ConId, by_user: bool) {
        let map = &self.tree.map;
        let (wrapper, con) = if map[id].kind == ConType::FloatingCon {
            match id.nodes(map).first() {
                Some(&child) => (id, child),
                None => return,
            }
        } else {
            // A leaf deep inside a floating split takes the whole split along.
            let wrapper = self.inside_floating(id);
            match wrapper.and_then(|w| w.nodes(map).first().map(|&child| (w, child))) {
                Some(pair) => pair,
                None => {
                    debug!(?id, "not floating");
                    return;
                }
            }
        };
        let ws = self.get_workspace(wrapper).expect("floating container outside a workspace");
        let tiling = self.descend_tiling_focused(ws);
        let target = if tiling == ws || self.inside_floating(tiling).is_some() {
            ws
        } else {
            tiling.parent(&self.tree.map).unwrap_or(ws)
        };

        self.tree.unlink(con);
        self.tree.unlink(wrapper);
        self.tree.remove(wrapper);

        let c = &mut self.tree[con];
        c.percent = 0.0;
        c.floating = FloatingState::new(false, by_user);
        if c.border_style == self.config.settings.default_floating_border {
            c.border_style = self.config.settings.default_border;
        }
        self.attach(con, target, false);
        let parent = con.parent(&self.tree.map).expect("just attached");
        self.fix_percent(parent);
        debug!(?con, ?parent, "floating disabled");
        self.focus(self.descend_focused(con));
    }

    pub fn floating_toggle(&mut self, id: ConId) {
        if self.inside_floating(id).is_some() {
            self.floating_disable(id, true);
        } else {
            self.floating_enable(id, true);
        }
    }
}
