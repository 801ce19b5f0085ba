use pretty_assertions::assert_eq;
use test_log::test;

use crate::common::config::Settings;
use crate::common::geometry::Rect;
use crate::layout_engine::{Orientation, Stacking, render};
use crate::model::{
    BorderStyle, Con, ConId, ConMap, ConType, Dock, FullscreenMode, InsertAt, Layout, Observer,
    SizeHints, Tree, Window, WindowHandle,
};

/// Records raises so tests can check stacking order.
#[derive(Default)]
struct Raised(Vec<ConId>);

impl Observer for Raised {
    fn added_to_forest(&mut self, _map: &ConMap, _id: ConId) {}

    fn removed_from_forest(&mut self, _map: &ConMap, _id: ConId) {}
}

impl Stacking for Raised {
    fn raise(&mut self, id: ConId) {
        self.0.retain(|&c| c != id);
        self.0.push(id);
    }
}

const SCREEN: Rect = Rect::new(0, 0, 1200, 800);

struct Scene {
    tree: Tree<Raised>,
    root: ConId,
    output: ConId,
    topdock: ConId,
    content: ConId,
    ws: ConId,
    settings: Settings,
}

impl Scene {
    fn new() -> Self {
        let mut tree = Tree::with_observer(Raised::default());
        let root = tree.mk_con(Con::new(ConType::Root));
        tree[root].rect = SCREEN;
        let output = tree.mk_con(Con::named(ConType::Output, "out").with_layout(Layout::Output));
        tree.link(output, root, InsertAt::Back);
        tree[output].rect = SCREEN;

        let topdock = tree.mk_con(Con::named(ConType::Con, "topdock").with_layout(Layout::Dockarea));
        let content = tree.mk_con(Con::named(ConType::Con, "content"));
        let bottomdock =
            tree.mk_con(Con::named(ConType::Con, "bottomdock").with_layout(Layout::Dockarea));
        for id in [topdock, content, bottomdock] {
            tree.link(id, output, InsertAt::Back);
        }
        tree.focus_front(content);

        let ws = tree.mk_con(
            Con::named(ConType::Workspace, "1").with_orientation(Orientation::Horizontal),
        );
        tree.link(ws, content, InsertAt::Back);

        let settings = Settings { border_width: 2, deco_height: 20, ..Settings::default() };
        Scene { tree, root, output, topdock, content, ws, settings }
    }

    fn leaf(&mut self, parent: ConId, handle: u32, percent: f64) -> ConId {
        let con = Con::new(ConType::Con).with_window(Window::new(WindowHandle(handle)));
        let id = self.tree.mk_con(con);
        self.tree.link(id, parent, InsertAt::Back);
        self.tree[id].percent = percent;
        id
    }

    fn split(&mut self, parent: ConId, orientation: Orientation, percent: f64) -> ConId {
        let id = self.tree.mk_con(Con::new(ConType::Con).with_orientation(orientation));
        self.tree.link(id, parent, InsertAt::Back);
        self.tree[id].percent = percent;
        id
    }

    fn render(&mut self) { render(&mut self.tree, self.root, &self.settings) }

    fn rects(&self) -> Vec<(ConId, Rect, Rect, Rect, bool)> {
        self.root
            .traverse_preorder(&self.tree.map)
            .map(|id| {
                let c = &self.tree[id];
                (id, c.rect, c.window_rect, c.deco_rect, c.mapped)
            })
            .collect()
    }
}

#[test]
fn two_leaves_split_the_workspace_evenly() {
    let mut s = Scene::new();
    let ws = s.ws;
    let l1 = s.leaf(ws, 1, 0.5);
    let l2 = s.leaf(ws, 2, 0.5);
    s.render();

    assert_eq!(s.tree[ws].rect, SCREEN);
    assert_eq!(s.tree[l1].rect, Rect::new(0, 0, 600, 800));
    assert_eq!(s.tree[l2].rect, Rect::new(600, 0, 600, 800));
    assert_eq!(s.tree[l1].deco_rect, Rect::new(0, 0, 600, 20));
    // Deco band on top, border on the other three sides.
    assert_eq!(s.tree[l1].window_rect, Rect::new(2, 20, 596, 778));
    assert!(s.tree[l1].mapped && s.tree[l2].mapped);
}

#[test]
fn unset_percents_share_equally() {
    let mut s = Scene::new();
    let ws = s.ws;
    let leaves: Vec<_> = (1..=3).map(|h| s.leaf(ws, h, 0.0)).collect();
    s.render();
    let widths: Vec<i32> = leaves.iter().map(|&l| s.tree[l].rect.width).collect();
    assert_eq!(widths, vec![400, 400, 400]);
}

#[test]
fn rounding_error_is_absorbed_by_leading_children() {
    let mut s = Scene::new();
    let ws = s.ws;
    s.tree[s.output].rect = Rect::new(0, 0, 1000, 800);
    let leaves: Vec<_> = (1..=3).map(|h| s.leaf(ws, h, 1.0 / 3.0)).collect();
    s.render();
    let xs: Vec<(i32, i32)> =
        leaves.iter().map(|&l| (s.tree[l].rect.x, s.tree[l].rect.width)).collect();
    assert_eq!(xs, vec![(0, 334), (334, 333), (667, 333)]);
}

#[test]
fn tabbed_workspace_shows_only_the_focused_child() {
    let mut s = Scene::new();
    let ws = s.ws;
    s.tree[ws].layout = Layout::Tabbed;
    let leaves: Vec<_> = (1..=3).map(|h| s.leaf(ws, h, 1.0 / 3.0)).collect();
    s.tree.focus_front(leaves[1]);
    s.render();

    let body = Rect::new(0, 20, 1200, 780);
    for (i, &leaf) in leaves.iter().enumerate() {
        let con = &s.tree[leaf];
        assert_eq!(con.deco_rect.width, 1200 / 3);
        assert_eq!(con.deco_rect, Rect::new(400 * i as i32, 0, 400, 20));
        assert_eq!(con.rect, body);
    }
    assert_eq!(s.tree[leaves[1]].window_rect, Rect::new(2, 20, 1196, 778));
    assert!(s.tree[leaves[1]].mapped);
    for &hidden in [leaves[0], leaves[2]].iter() {
        assert_eq!(s.tree[hidden].window_rect, Rect::default());
        assert!(!s.tree[hidden].mapped);
    }
}

#[test]
fn stacked_headers_form_a_column() {
    let mut s = Scene::new();
    let ws = s.ws;
    let stack = s.split(ws, Orientation::Vertical, 1.0);
    s.tree[stack].layout = Layout::Stacked;
    let a = s.leaf(stack, 1, 0.5);
    let b = s.leaf(stack, 2, 0.5);
    s.tree.focus_front(a);
    s.render();

    assert_eq!(s.tree[a].deco_rect, Rect::new(0, 0, 1200, 20));
    assert_eq!(s.tree[b].deco_rect, Rect::new(0, 20, 1200, 20));
    assert_eq!(s.tree[a].rect, Rect::new(0, 40, 1200, 760));
    assert_eq!(s.tree[a].window_rect, Rect::new(2, 40, 1196, 758));
    assert!(!s.tree[b].mapped);
}

#[test]
fn nested_splits_follow_orientation() {
    let mut s = Scene::new();
    let ws = s.ws;
    let left = s.leaf(ws, 1, 0.25);
    let right = s.split(ws, Orientation::Vertical, 0.75);
    let top = s.leaf(right, 2, 0.5);
    let bottom = s.leaf(right, 3, 0.5);
    s.render();

    assert_eq!(s.tree[left].rect, Rect::new(0, 0, 300, 800));
    assert_eq!(s.tree[right].rect, Rect::new(300, 0, 900, 800));
    assert_eq!(s.tree[right].deco_rect, Rect::default());
    assert_eq!(s.tree[top].rect, Rect::new(300, 0, 900, 400));
    assert_eq!(s.tree[bottom].rect, Rect::new(300, 400, 900, 400));
}

#[test]
fn border_styles_change_insets() {
    let mut s = Scene::new();
    let ws = s.ws;
    let pixel = s.leaf(ws, 1, 0.5);
    let bare = s.leaf(ws, 2, 0.5);
    s.tree[pixel].border_style = BorderStyle::Pixel;
    s.tree[bare].border_style = BorderStyle::None;
    s.render();

    assert_eq!(s.tree[pixel].deco_rect, Rect::default());
    assert_eq!(s.tree[pixel].window_rect, Rect::new(2, 2, 596, 796));
    assert_eq!(s.tree[bare].window_rect, Rect::new(600, 0, 600, 800));
}

#[test]
fn size_hints_clamp_the_window() {
    let mut s = Scene::new();
    let ws = s.ws;
    let leaf = s.leaf(ws, 1, 1.0);
    s.tree[leaf].border_style = BorderStyle::None;
    if let Some(window) = s.tree[leaf].window.as_mut() {
        window.hints = SizeHints { aspect_ratio: 1.0, ..SizeHints::default() };
    }
    s.render();
    assert_eq!(s.tree[leaf].window_rect, Rect::new(200, 0, 800, 800));
}

#[test]
fn docks_take_their_requested_height() {
    let mut s = Scene::new();
    let topdock = s.topdock;
    let bar = Window::new(WindowHandle(9))
        .with_dock(Dock::Top)
        .with_geometry(Rect::new(0, 0, 1200, 30));
    let bar_con = s.tree.mk_con(Con::new(ConType::Con).with_window(bar));
    s.tree.link(bar_con, topdock, InsertAt::Back);
    let ws = s.ws;
    let leaf = s.leaf(ws, 1, 1.0);
    s.render();

    assert_eq!(s.tree[topdock].rect, Rect::new(0, 0, 1200, 30));
    assert_eq!(s.tree[bar_con].rect, Rect::new(0, 0, 1200, 30));
    assert_eq!(s.tree[bar_con].window_rect, Rect::new(0, 0, 1200, 30));
    assert_eq!(s.tree[s.content].rect, Rect::new(0, 30, 1200, 770));
    assert_eq!(s.tree[ws].rect, Rect::new(0, 30, 1200, 770));
    assert_eq!(s.tree[leaf].rect, Rect::new(0, 30, 1200, 770));
}

#[test]
fn only_the_focused_workspace_is_rendered() {
    let mut s = Scene::new();
    let ws1 = s.ws;
    let a = s.leaf(ws1, 1, 1.0);
    let ws2 = s.tree.mk_con(Con::named(ConType::Workspace, "2"));
    s.tree.link(ws2, s.content, InsertAt::Back);
    let b = s.leaf(ws2, 2, 1.0);
    s.render();
    assert!(s.tree[a].mapped);
    assert!(!s.tree[b].mapped);

    s.tree.focus_front(ws2);
    s.render();
    assert!(!s.tree[a].mapped);
    assert!(s.tree[b].mapped);
    assert_eq!(s.tree[b].rect, SCREEN);
}

#[test]
fn output_fullscreen_hides_everything_else() {
    let mut s = Scene::new();
    let ws = s.ws;
    let a = s.leaf(ws, 1, 0.5);
    let split = s.split(ws, Orientation::Vertical, 0.5);
    let b = s.leaf(split, 2, 0.5);
    let c = s.leaf(split, 3, 0.5);
    s.tree[b].fullscreen_mode = FullscreenMode::Output;
    s.render();

    assert_eq!(s.tree[b].rect, SCREEN);
    assert_eq!(s.tree[b].window_rect, SCREEN);
    assert_eq!(s.tree[b].deco_rect, Rect::default());
    assert!(s.tree[b].mapped);
    for hidden in [a, c, split, ws] {
        assert!(!s.tree[hidden].mapped, "{hidden:?} should not be rendered");
    }
}

#[test]
fn global_fullscreen_covers_the_root() {
    let mut s = Scene::new();
    let ws = s.ws;
    let a = s.leaf(ws, 1, 1.0);
    let wide = Rect::new(0, 0, 3000, 800);
    s.tree[s.root].rect = wide;
    s.tree[a].fullscreen_mode = FullscreenMode::Global;
    s.render();
    assert_eq!(s.tree[a].rect, wide);
    assert!(!s.tree[s.output].mapped);
}

#[test]
fn floating_containers_render_after_tiling() {
    let mut s = Scene::new();
    let ws = s.ws;
    let tiled = s.leaf(ws, 1, 1.0);
    let fc = s.tree.mk_con(Con::new(ConType::FloatingCon));
    s.tree.link(fc, ws, InsertAt::Back);
    s.tree[fc].rect = Rect::new(100, 100, 300, 200);
    let floater = s.leaf(fc, 2, 1.0);
    s.render();

    assert_eq!(s.tree[floater].rect, Rect::new(100, 100, 300, 200));
    assert_eq!(s.tree[floater].window_rect, Rect::new(102, 120, 296, 178));
    let stack = &s.tree.data.0;
    let pos = |id| stack.iter().position(|&c| c == id).unwrap();
    assert!(pos(tiled) < pos(fc));
    assert!(pos(fc) < pos(floater));
}

#[test]
fn render_is_idempotent() {
    let mut s = Scene::new();
    let ws = s.ws;
    s.leaf(ws, 1, 0.3);
    let split = s.split(ws, Orientation::Vertical, 0.7);
    s.tree[split].layout = Layout::Tabbed;
    s.leaf(split, 2, 0.5);
    s.leaf(split, 3, 0.5);

    s.render();
    let first = s.rects();
    let first_stack = s.tree.data.0.clone();
    s.render();
    assert_eq!(s.rects(), first);
    assert_eq!(s.tree.data.0, first_stack);
}
