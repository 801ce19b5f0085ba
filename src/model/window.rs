//! Attributes of a client window as reported by the display server.

use serde::{Deserialize, Serialize};

use crate::common::geometry::Rect;

/// Display-server handle of a window, either a client's or a frame we own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub u32);

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dock {
    #[default]
    None,
    Top,
    Bottom,
}

impl Dock {
    pub fn is_dock(self) -> bool { self != Dock::None }
}

/// Size constraints a client may declare. Zero means "not set".
#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeHints {
    pub aspect_ratio: f64,
    pub width_increment: i32,
    pub height_increment: i32,
    pub base_width: i32,
    pub base_height: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub handle: WindowHandle,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub dock: Dock,
    /// Geometry the client asked for. Docks and floating windows use it.
    #[serde(default)]
    pub geometry: Rect,
    #[serde(default)]
    pub hints: SizeHints,
}

impl Window {
    pub fn new(handle: WindowHandle) -> Self {
        Window {
            handle,
            class: None,
            instance: None,
            title: None,
            dock: Dock::None,
            geometry: Rect::default(),
            hints: SizeHints::default(),
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = Some(class.to_owned());
        self
    }

    pub fn with_instance(mut self, instance: &str) -> Self {
        self.instance = Some(instance.to_owned());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_owned());
        self
    }

    pub fn with_geometry(mut self, geometry: Rect) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_dock(mut self, dock: Dock) -> Self {
        self.dock = dock;
        self
    }

    pub fn with_hints(mut self, hints: SizeHints) -> Self {
        self.hints = hints;
        self
    }
}
