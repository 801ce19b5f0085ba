//! Outputs and workspaces.
//!
//! Each output holds three children: a top dock area, the content container
//! whose children are the output's workspaces, and a bottom dock area. The
//! workspace at the head of the content container's focus order is the one
//! shown on that output.

use tracing::debug;

use super::WindowManager;
use crate::common::config::DefaultOrientation;
use crate::common::geometry::Rect;
use crate::layout_engine::{Direction, Orientation, visible_workspace};
use crate::model::{Con, ConId, ConType, Dock, InsertAt, Layout};
use crate::sync::DisplayConnection;

const TOPDOCK: &str = "topdock";
const CONTENT: &str = "content";
const BOTTOMDOCK: &str = "bottomdock";

impl<D: DisplayConnection> WindowManager<D> {
    pub fn add_output(&mut self, name: &str, rect: Rect) -> ConId {
        let mut output = Con::named(ConType::Output, name).with_layout(Layout::Output);
        output.rect = rect;
        let output = self.tree.mk_con(output);
        self.tree.link(output, self.root, InsertAt::Back);

        let topdock =
            self.tree.mk_con(Con::named(ConType::Con, TOPDOCK).with_layout(Layout::Dockarea));
        let content = self.tree.mk_con(Con::named(ConType::Con, CONTENT));
        let bottomdock =
            self.tree.mk_con(Con::named(ConType::Con, BOTTOMDOCK).with_layout(Layout::Dockarea));
        for child in [topdock, content, bottomdock] {
            self.tree.link(child, output, InsertAt::Back);
        }
        self.tree.set_focus_order(output, vec![content, topdock, bottomdock]);
        self.update_root_rect();

        let ws_name = self.next_workspace_name();
        let ws = self.create_workspace(output, &ws_name);
        if self.tree[self.focused].kind == ConType::Root {
            self.focus(ws);
        }
        debug!(name, %rect, ?output, "added output");
        output
    }

    fn update_root_rect(&mut self) {
        let outputs = self.outputs();
        let Some(first) = outputs.first() else { return };
        let mut bounds = self.tree[*first].rect;
        for &output in &outputs[1..] {
            let r = self.tree[output].rect;
            let x = bounds.x.min(r.x);
            let y = bounds.y.min(r.y);
            let max_x = bounds.max_x().max(r.max_x());
            let max_y = bounds.max_y().max(r.max_y());
            bounds = Rect::new(x, y, max_x - x, max_y - y);
        }
        self.tree[self.root].rect = bounds;
    }

    pub fn outputs(&self) -> Vec<ConId> { self.root.nodes(&self.tree.map).to_vec() }

    pub fn output_by_name(&self, name: &str) -> Option<ConId> {
        self.outputs().into_iter().find(|&o| self.tree[o].name == name)
    }

    #[track_caller]
    pub fn output_content(&self, output: ConId) -> ConId {
        let map = &self.tree.map;
        output
            .nodes(map)
            .iter()
            .copied()
            .find(|&c| !map[c].is_dockarea())
            .unwrap_or_else(|| panic!("output {output:?} has no content container"))
    }

    /// The dock area on `output` for `dock`, which must be a dock.
    pub fn dockarea(&self, output: ConId, dock: Dock) -> ConId {
        let name = match dock {
            Dock::Top => TOPDOCK,
            Dock::Bottom => BOTTOMDOCK,
            Dock::None => panic!("regular windows have no dock area"),
        };
        let map = &self.tree.map;
        output
            .nodes(map)
            .iter()
            .copied()
            .find(|&c| map[c].is_dockarea() && map[c].name == name)
            .unwrap_or_else(|| panic!("output {output:?} has no {name}"))
    }

    pub fn create_workspace(&mut self, output: ConId, name: &str) -> ConId {
        let content = self.output_content(output);
        let settings = &self.config.settings;
        let output_rect = self.tree[output].rect;
        let orientation = match settings.default_orientation {
            DefaultOrientation::Horizontal => Orientation::Horizontal,
            DefaultOrientation::Vertical => Orientation::Vertical,
            DefaultOrientation::Auto if output_rect.height > output_rect.width => {
                Orientation::Vertical
            }
            DefaultOrientation::Auto => Orientation::Horizontal,
        };
        let mut ws = Con::named(ConType::Workspace, name).with_orientation(orientation);
        ws.workspace_layout = settings.workspace_layout;
        ws.rect = output_rect;
        let ws = self.tree.mk_con(ws);
        self.tree.link(ws, content, InsertAt::Back);
        ws
    }

    fn next_workspace_name(&self) -> String {
        (1..)
            .map(|n: u32| n.to_string())
            .find(|name| self.workspace_by_name(name).is_none())
            .unwrap_or_default()
    }

    pub fn workspace_by_name(&self, name: &str) -> Option<ConId> {
        self.tree
            .map
            .iter()
            .find(|(_, con)| con.kind == ConType::Workspace && con.name == name)
            .map(|(id, _)| id)
    }

    /// Finds the workspace called `name`, creating it on the focused output.
    pub fn workspace_or_create(&mut self, name: &str) -> Option<ConId> {
        if let Some(ws) = self.workspace_by_name(name) {
            return Some(ws);
        }
        let output = self.focused_output()?;
        Some(self.create_workspace(output, name))
    }

    pub fn focused_output(&self) -> Option<ConId> {
        match self.tree[self.focused].kind {
            ConType::Root => self.root.first_focused(&self.tree.map),
            _ => Some(self.get_output(self.focused)),
        }
    }

    pub fn focused_workspace(&self) -> Option<ConId> {
        self.get_workspace(self.focused).or_else(|| {
            self.focused_output().and_then(|o| visible_workspace(&self.tree.map, o))
        })
    }

    pub fn is_visible_workspace(&self, ws: ConId) -> bool {
        let output = self.get_output(ws);
        visible_workspace(&self.tree.map, output) == Some(ws)
    }

    /// Makes `ws` the visible workspace of its output and focuses into it.
    pub fn show_workspace(&mut self, ws: ConId) {
        assert_eq!(self.tree[ws].kind, ConType::Workspace, "{ws:?} is not a workspace");
        let target = self.descend_focused(ws);
        self.focus(target);
    }

    /// The nearest output in `direction` that overlaps `output` on the
    /// other axis.
    pub fn output_in_direction(&self, output: ConId, direction: Direction) -> Option<ConId> {
        let cur = self.tree[output].rect;
        let overlaps_v = |r: &Rect| r.y < cur.max_y() && cur.y < r.max_y();
        let overlaps_h = |r: &Rect| r.x < cur.max_x() && cur.x < r.max_x();
        self.outputs()
            .into_iter()
            .filter(|&o| o != output)
            .filter_map(|o| {
                let r = self.tree[o].rect;
                let gap = match direction {
                    Direction::Right if overlaps_v(&r) => r.x - cur.max_x(),
                    Direction::Left if overlaps_v(&r) => cur.x - r.max_x(),
                    Direction::Down if overlaps_h(&r) => r.y - cur.max_y(),
                    Direction::Up if overlaps_h(&r) => cur.y - r.max_y(),
                    _ => return None,
                };
                (gap >= 0).then_some((gap, o))
            })
            .min_by_key(|&(gap, _)| gap)
            .map(|(_, o)| o)
    }
}
