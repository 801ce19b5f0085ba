use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::matching::Match;
use super::window::Window;
use crate::common::geometry::Rect;
use crate::layout_engine::Orientation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConType {
    Root,
    Output,
    Workspace,
    Con,
    FloatingCon,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Layout {
    /// Split along the container's orientation.
    #[default]
    Default,
    Stacked,
    Tabbed,
    Dockarea,
    Output,
}

impl Layout {
    pub fn is_stacked_or_tabbed(self) -> bool { matches!(self, Layout::Stacked | Layout::Tabbed) }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BorderStyle {
    /// Border plus a decoration band with the title.
    #[default]
    Normal,
    Pixel,
    None,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FullscreenMode {
    #[default]
    None,
    Output,
    Global,
}

/// Whether a container floats, and whether the user or a heuristic decided.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatingState {
    #[default]
    AutoOff,
    UserOff,
    AutoOn,
    UserOn,
}

impl FloatingState {
    pub fn is_floating(self) -> bool { matches!(self, FloatingState::AutoOn | FloatingState::UserOn) }

    pub fn new(floating: bool, by_user: bool) -> Self {
        match (floating, by_user) {
            (false, false) => FloatingState::AutoOff,
            (false, true) => FloatingState::UserOff,
            (true, false) => FloatingState::AutoOn,
            (true, true) => FloatingState::UserOn,
        }
    }
}

/// Attributes of one container. Structure (parent, children, focus order)
/// lives in the tree.
#[derive(Clone, Debug)]
pub struct Con {
    pub kind: ConType,
    pub name: String,
    pub rect: Rect,
    /// Where the client window goes, with borders and decoration removed.
    pub window_rect: Rect,
    pub deco_rect: Rect,
    /// Share of the parent's space; zero or less means unset.
    pub percent: f64,
    pub orientation: Option<Orientation>,
    pub layout: Layout,
    /// Layout new children of a workspace are wrapped in.
    pub workspace_layout: Layout,
    pub border_style: BorderStyle,
    pub fullscreen_mode: FullscreenMode,
    pub floating: FloatingState,
    pub window: Option<Window>,
    pub mapped: bool,
    pub urgent: bool,
    pub swallows: Vec<Match>,
}

impl Con {
    pub fn new(kind: ConType) -> Self {
        Con {
            kind,
            name: String::new(),
            rect: Rect::default(),
            window_rect: Rect::default(),
            deco_rect: Rect::default(),
            percent: 0.0,
            orientation: None,
            layout: Layout::Default,
            workspace_layout: Layout::Default,
            border_style: BorderStyle::Normal,
            fullscreen_mode: FullscreenMode::None,
            floating: FloatingState::AutoOff,
            window: None,
            mapped: false,
            urgent: false,
            swallows: Vec::new(),
        }
    }

    pub fn named(kind: ConType, name: &str) -> Self {
        Con { name: name.to_owned(), ..Con::new(kind) }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    pub fn is_dockarea(&self) -> bool { self.layout == Layout::Dockarea }

    pub fn is_fullscreen(&self) -> bool { self.fullscreen_mode != FullscreenMode::None }

    /// The axis children are laid out along. Stacked containers behave as
    /// vertical and tabbed ones as horizontal when looking for a direction.
    pub fn effective_orientation(&self) -> Option<Orientation> {
        match self.layout {
            Layout::Stacked => Some(Orientation::Vertical),
            Layout::Tabbed => Some(Orientation::Horizontal),
            Layout::Dockarea | Layout::Output => Some(Orientation::Vertical),
            Layout::Default => self.orientation,
        }
    }

    pub fn label(&self) -> String {
        let title = self
            .window
            .as_ref()
            .and_then(|w| w.title.clone().or_else(|| w.class.clone()))
            .unwrap_or_else(|| self.name.clone());
        let orientation = match (self.layout, self.orientation) {
            (Layout::Default, Some(o)) => format!("split {o}"),
            (Layout::Default, None) => "default".to_owned(),
            (layout, _) => layout.to_string(),
        };
        let mut label = format!("{} [{}] {:?} {}", self.kind, orientation, title, self.rect);
        if self.is_fullscreen() {
            label.push_str(&format!(" fullscreen={}", self.fullscreen_mode));
        }
        if self.urgent {
            label.push_str(" urgent");
        }
        label
    }
}
