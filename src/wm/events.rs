//! Entry points driven by the display server: taking new windows under
//! management and dispatching the event stream.

use tracing::{debug, instrument, trace};

use super::{CloseMode, DragOutcome, WindowManager};
use crate::common::config::AssignTarget;
use crate::common::geometry::{Point, Rect};
use crate::layout_engine::visible_workspace;
use crate::model::{BorderStyle, Con, ConId, ConType, FullscreenMode, InsertAt, Window, WindowHandle};
use crate::sync::{
    ClientMessage, DisplayConnection, DisplayError, DisplayEvent, FullscreenAction, GoneIsOk,
};

/// How a new window found its place in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Dock,
    /// Claimed by a placeholder from a restored layout.
    Swallowed,
    Assigned,
    Opened,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Managed {
    pub con: ConId,
    pub placement: Placement,
}

impl<D: DisplayConnection> WindowManager<D> {
    /// Puts a newly mapped window into the tree. Returns `None` for windows
    /// that are already managed or have nowhere to go.
    pub fn manage_window(&mut self, window: Window) -> Option<Managed> {
        let handle = window.handle;
        if self.windows.contains_key(&handle) {
            debug!(%handle, "window is already managed");
            return None;
        }

        let (con, placement) = if window.dock.is_dock() {
            let Some(output) = self.focused_output() else {
                debug!(%handle, "no output for dock window");
                return None;
            };
            let area = self.dockarea(output, window.dock);
            let mut dock = Con::new(ConType::Con).with_window(window);
            dock.border_style = BorderStyle::None;
            let con = self.tree.mk_con(dock);
            self.tree.link(con, area, InsertAt::Back);
            (con, Placement::Dock)
        } else {
            if self.focused_workspace().is_none() {
                debug!(%handle, "no workspace for window");
                return None;
            }
            self.queue_assigned_commands(&window);
            if let Some(placeholder) = self.find_swallower(&window) {
                let con = &mut self.tree[placeholder];
                con.window = Some(window);
                con.swallows.clear();
                if self.get_workspace(placeholder) == self.focused_workspace() {
                    self.focus(placeholder);
                }
                (placeholder, Placement::Swallowed)
            } else if let Some(ws) = self.assigned_workspace(&window) {
                let focus = self.descend_tiling_focused(ws);
                let parent = if focus == ws { ws } else { focus.parent(&self.tree.map).unwrap_or(ws) };
                let con = self.tree_open(Some(parent), Some(window));
                if Some(ws) == self.focused_workspace() {
                    self.focus(con);
                }
                (con, Placement::Assigned)
            } else {
                let con = self.tree_open(None, Some(window));
                self.focus(con);
                (con, Placement::Opened)
            }
        };

        self.windows.insert(handle, con);
        self.tree.data.adopt_client(con, handle);
        debug!(%handle, ?con, ?placement, "managing window");
        Some(Managed { con, placement })
    }

    /// First placeholder in tree order whose swallow criteria accept `window`.
    fn find_swallower(&self, window: &Window) -> Option<ConId> {
        let map = &self.tree.map;
        self.root.traverse_preorder(map).find(|&id| {
            let con = &map[id];
            !con.swallows.is_empty()
                && self.accepts_window(id)
                && con.swallows.iter().any(|m| m.matches(window))
        })
    }

    fn queue_assigned_commands(&mut self, window: &Window) {
        let commands: Vec<String> = self
            .config
            .assignments
            .iter()
            .filter(|rule| rule.is_usable() && rule.criteria.matches(window))
            .filter_map(|rule| match rule.target() {
                Some(AssignTarget::Command(cmd)) => Some(cmd.to_owned()),
                _ => None,
            })
            .collect();
        for command in commands {
            trace!(%command, "assignment command");
            self.commands.push(command);
        }
    }

    /// Workspace chosen by the first matching workspace or output rule.
    fn assigned_workspace(&mut self, window: &Window) -> Option<ConId> {
        let target = self
            .config
            .assignments
            .iter()
            .filter(|rule| rule.is_usable() && rule.criteria.matches(window))
            .find_map(|rule| match rule.target() {
                Some(AssignTarget::Workspace(ws)) => Some((true, ws.to_owned())),
                Some(AssignTarget::Output(out)) => Some((false, out.to_owned())),
                _ => None,
            });
        match target? {
            (true, ws) => self.workspace_or_create(&ws),
            (false, output) => {
                let ws = self
                    .output_by_name(&output)
                    .and_then(|o| visible_workspace(&self.tree.map, o));
                if ws.is_none() {
                    debug!(%output, "assigned output does not exist");
                }
                ws
            }
        }
    }

    /// The client withdrew its window; drops its container.
    pub fn unmanage_window(&mut self, handle: WindowHandle) {
        let Some(con) = self.by_window_handle(handle) else {
            trace!(%handle, "ignoring unmanaged window");
            return;
        };
        debug!(%handle, ?con, "unmanaging window");
        self.tree_close(con, CloseMode::DontKillWindow);
    }

    /// Handles one event and pushes the result to the display.
    #[instrument(level = "debug", skip(self))]
    pub fn dispatch(&mut self, event: DisplayEvent) -> Result<(), DisplayError> {
        let consumed = match self.route_drag_event(&event) {
            None | Some(DragOutcome::Abort) => false,
            Some(_) => true,
        };
        if !consumed {
            self.handle_event(event)?;
        }
        self.flush()
    }

    fn handle_event(&mut self, event: DisplayEvent) -> Result<(), DisplayError> {
        match event {
            DisplayEvent::Expose { window } => trace!(%window, "expose"),
            DisplayEvent::MapRequest(window) => {
                self.manage_window(window);
            }
            DisplayEvent::UnmapNotify { window } | DisplayEvent::DestroyNotify { window } => {
                self.unmanage_window(window)
            }
            DisplayEvent::ConfigureRequest { window, rect } => {
                self.handle_configure_request(window, rect)?
            }
            DisplayEvent::ClientMessage { window, message } => {
                self.handle_client_message(window, message)
            }
            DisplayEvent::EnterNotify { window } => self.handle_enter(window),
            DisplayEvent::ButtonPress { window, position, modifier } => {
                self.handle_button_press(window, position, modifier)
            }
            DisplayEvent::ButtonRelease { .. }
            | DisplayEvent::MotionNotify { .. }
            | DisplayEvent::KeyPress => trace!("no drag in progress"),
        }
        Ok(())
    }

    /// Floating windows get the size they ask for. Tiled windows are told
    /// their current size instead.
    fn handle_configure_request(&mut self, handle: WindowHandle, rect: Rect) -> Result<(), DisplayError> {
        let Some(con) = self.by_window_handle(handle) else {
            trace!(%handle, "configure request from unmanaged window");
            return Ok(());
        };
        let map = &self.tree.map;
        let in_dock = con.parent(map).is_some_and(|p| map[p].is_dockarea());
        if let Some(wrapper) = self.inside_floating(con).filter(|_| !in_dock) {
            let style = self.tree[con].border_style;
            let outer = self.decorated_rect(rect, style);
            self.tree[wrapper].rect = outer;
            if let Some(window) = self.tree[con].window.as_mut() {
                window.geometry = rect;
            }
            debug!(%handle, %outer, "floating window resized itself");
            return Ok(());
        }
        if in_dock {
            if let Some(window) = self.tree[con].window.as_mut() {
                window.geometry = rect;
            }
            return Ok(());
        }
        let current = self.tree[con].window_rect;
        self.display.send_configure_notify(handle, current).or_gone()
    }

    fn handle_client_message(&mut self, handle: WindowHandle, message: ClientMessage) {
        let Some(con) = self.by_window_handle(handle) else {
            trace!(%handle, "client message from unmanaged window");
            return;
        };
        match message {
            ClientMessage::Fullscreen(FullscreenAction::Add) => {
                self.enable_fullscreen(con, FullscreenMode::Output)
            }
            ClientMessage::Fullscreen(FullscreenAction::Remove) => self.disable_fullscreen(con),
            ClientMessage::Fullscreen(FullscreenAction::Toggle) => {
                self.toggle_fullscreen(con, FullscreenMode::Output)
            }
            ClientMessage::Activate => match self.get_workspace(con) {
                Some(ws) if self.is_visible_workspace(ws) => self.focus(con),
                Some(_) => self.set_urgency(con, true),
                None => trace!(?con, "activation outside any workspace"),
            },
            ClientMessage::Urgency(urgent) => self.set_urgency(con, urgent),
        }
    }

    fn handle_enter(&mut self, handle: WindowHandle) {
        if !self.config.settings.focus_follows_mouse || self.is_dragging() {
            return;
        }
        let Some(con) = self.by_any_handle(handle) else { return };
        if con == self.focused || !self.is_leaf(con) || self.tree[con].window.is_none() {
            return;
        }
        if self.get_workspace(con).is_some_and(|ws| self.is_visible_workspace(ws)) {
            trace!(?con, "focus follows mouse");
            self.focus(con);
        }
    }

    fn handle_button_press(&mut self, handle: WindowHandle, position: Point, modifier: bool) {
        let Some(mut con) = self.by_any_handle(handle) else {
            trace!(%handle, "click on unmanaged window");
            return;
        };
        let map = &self.tree.map;
        if map[con].kind == ConType::FloatingCon {
            match con.nodes(map).first() {
                Some(&child) => con = child,
                None => return,
            }
        }
        if !self.is_leaf(con) {
            // A click into a stack's headers selects the child owning that header.
            let header = con.nodes(map).iter().copied().find(|&c| map[c].deco_rect.contains(position));
            match header {
                Some(child) => con = self.descend_focused(child),
                None => return,
            }
        }
        self.focus(con);
        if modifier {
            self.start_drag(con, position);
        }
    }
}
