//! The window manager context.
//!
//! [`WindowManager`] owns the container tree, the handle of the focused
//! container, the configuration and the display connection. Every operation
//! takes it by `&mut self`; there is no other mutable state. Operations are
//! spread over the submodules by concern and all add methods to the same type.

mod drag;
mod events;
mod floating;
mod moves;
mod outputs;
mod restore;
mod tree_ops;


pub use drag::{DragKind, DragOutcome, DragState, DropKind, DropTarget};
pub use events::{Managed, Placement};
pub use restore::{RestoreError, RestoreNode};
pub use tree_ops::CloseMode;

use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use crate::common::config::Config;
use crate::common::geometry::Rect;
use crate::layout_engine;
use crate::model::{Con, ConId, ConMap, ConType, Tree, WindowHandle};
use crate::sync::{DisplayConnection, DisplayError, DisplayState};

pub struct WindowManager<D> {
    tree: Tree<DisplayState>,
    root: ConId,
    focused: ConId,
    config: Config,
    display: D,
    windows: FxHashMap<WindowHandle, ConId>,
    drag: DragState,
    commands: Vec<String>,
}

impl<D: DisplayConnection> WindowManager<D> {
    /// Creates a manager with an empty root covering `screen`. Outputs are
    /// added with [`WindowManager::add_output`].
    pub fn new(config: Config, display: D, screen: Rect) -> Self {
        let mut tree = Tree::with_observer(DisplayState::new());
        let mut root_con = Con::named(ConType::Root, "root");
        root_con.rect = screen;
        let root = tree.mk_con(root_con);
        WindowManager {
            tree,
            root,
            focused: root,
            config,
            display,
            windows: FxHashMap::default(),
            drag: DragState::Idle,
            commands: Vec::new(),
        }
    }

    pub fn root(&self) -> ConId { self.root }

    pub fn focused(&self) -> ConId { self.focused }

    pub fn map(&self) -> &ConMap { &self.tree.map }

    pub fn con(&self, id: ConId) -> &Con { &self.tree[id] }

    pub fn con_mut(&mut self, id: ConId) -> &mut Con { &mut self.tree[id] }

    pub fn config(&self) -> &Config { &self.config }

    pub fn display(&self) -> &D { &self.display }

    pub fn display_mut(&mut self) -> &mut D { &mut self.display }

    pub fn display_state(&self) -> &DisplayState { &self.tree.data }

    pub fn by_window_handle(&self, handle: WindowHandle) -> Option<ConId> {
        self.windows.get(&handle).copied()
    }

    /// Container owning `handle`, either as its client or as its frame.
    pub fn by_any_handle(&self, handle: WindowHandle) -> Option<ConId> {
        self.by_window_handle(handle).or_else(|| self.tree.data.con_for_frame(handle))
    }

    pub fn drag_state(&self) -> &DragState { &self.drag }

    /// Commands from matching assignment rules, for the caller to run.
    pub fn take_commands(&mut self) -> Vec<String> { std::mem::take(&mut self.commands) }

    /// Recomputes every rectangle in the tree.
    pub fn render(&mut self) {
        layout_engine::render(&mut self.tree, self.root, &self.config.settings);
    }

    /// Sends the rendered state to the display server.
    #[instrument(level = "debug", skip(self))]
    pub fn push_changes(&mut self) -> Result<(), DisplayError> {
        crate::sync::push_changes(&mut self.tree, self.root, self.focused, &mut self.display)
    }

    /// Renders and pushes; the tail of every batch of mutations.
    pub fn flush(&mut self) -> Result<(), DisplayError> {
        self.render();
        self.push_changes()
    }

    pub fn draw_tree(&self) -> String {
        let tree = self.ascii_tree(self.root);
        let mut out = String::new();
        if let Err(err) = ascii_tree::write_tree(&mut out, &tree) {
            debug!(?err, "could not format tree");
        }
        out
    }

    fn ascii_tree(&self, id: ConId) -> ascii_tree::Tree {
        let marker = match id.parent(&self.tree.map) {
            None => "",
            Some(_) if id == self.focused => "* ",
            Some(parent) if parent.first_focused(&self.tree.map) == Some(id) => "> ",
            Some(_) => "  ",
        };
        let desc = format!("{marker}{}", self.tree[id].label());
        let children: Vec<_> = id.children(&self.tree.map).map(|c| self.ascii_tree(c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }
}
