//! Boundary to the display server.
//!
//! The window manager only ever talks to the server through
//! [`DisplayConnection`]; requests are fire-and-forget and never wait for a
//! reply.

use bitflags::bitflags;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::common::geometry::{Point, Rect};
use crate::model::{Window, WindowHandle};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// The window was destroyed behind our back. Callers treat this as success.
    #[error("window {0} no longer exists")]
    WindowGone(WindowHandle),
    #[error("display server could not allocate {0}")]
    AllocationFailed(String),
    #[error("display connection lost: {0}")]
    ConnectionLost(String),
}

pub trait GoneIsOk {
    /// Turns [`DisplayError::WindowGone`] into `Ok`.
    fn or_gone(self) -> Result<(), DisplayError>;
}

impl GoneIsOk for Result<(), DisplayError> {
    fn or_gone(self) -> Result<(), DisplayError> {
        match self {
            Err(DisplayError::WindowGone(handle)) => {
                debug!(%handle, "window already gone");
                Ok(())
            }
            other => other,
        }
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EventMask: u32 {
        const EXPOSURE              = 1 << 0;
        const BUTTON_PRESS          = 1 << 1;
        const BUTTON_RELEASE        = 1 << 2;
        const POINTER_MOTION        = 1 << 3;
        const ENTER_WINDOW          = 1 << 4;
        const STRUCTURE_NOTIFY      = 1 << 5;
        const SUBSTRUCTURE_REDIRECT = 1 << 6;
        const FOCUS_CHANGE          = 1 << 7;
        const PROPERTY_CHANGE       = 1 << 8;

        const FRAME = Self::EXPOSURE.bits()
            | Self::BUTTON_PRESS.bits()
            | Self::BUTTON_RELEASE.bits()
            | Self::ENTER_WINDOW.bits()
            | Self::STRUCTURE_NOTIFY.bits()
            | Self::SUBSTRUCTURE_REDIRECT.bits();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowClass {
    InputOutput,
    InputOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cursor {
    Pointer,
    Move,
    Resize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowValue {
    OverrideRedirect(bool),
    BackgroundPixel(u32),
    BorderPixel(u32),
}

/// Primitive requests the window manager issues.
pub trait DisplayConnection {
    fn create_window(
        &mut self,
        rect: Rect,
        class: WindowClass,
        cursor: Cursor,
        mask: EventMask,
        values: &[WindowValue],
    ) -> Result<WindowHandle, DisplayError>;

    fn set_window_rect(&mut self, window: WindowHandle, rect: Rect) -> Result<(), DisplayError>;

    /// Moves a client window into a frame at an offset relative to the frame.
    fn reparent_window(
        &mut self,
        window: WindowHandle,
        parent: WindowHandle,
        offset: Point,
    ) -> Result<(), DisplayError>;

    fn map(&mut self, window: WindowHandle) -> Result<(), DisplayError>;

    fn unmap(&mut self, window: WindowHandle) -> Result<(), DisplayError>;

    /// Places `window` directly above `sibling`, or at the bottom when
    /// `sibling` is `None`.
    fn restack_above(
        &mut self,
        window: WindowHandle,
        sibling: Option<WindowHandle>,
    ) -> Result<(), DisplayError>;

    fn set_input_focus(&mut self, window: WindowHandle) -> Result<(), DisplayError>;

    /// Tells a client its geometry without the server having moved it.
    fn send_configure_notify(&mut self, window: WindowHandle, rect: Rect) -> Result<(), DisplayError>;

    fn destroy_window(&mut self, window: WindowHandle) -> Result<(), DisplayError>;

    /// Asks a client to close, killing it if it does not cooperate.
    fn close_window(&mut self, window: WindowHandle) -> Result<(), DisplayError>;

    /// Enables or disables delivery of pointer crossing events.
    fn set_crossing_events(&mut self, enabled: bool) -> Result<(), DisplayError>;

    fn warp_pointer(&mut self, to: Point) -> Result<(), DisplayError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullscreenAction {
    Add,
    Remove,
    Toggle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    Fullscreen(FullscreenAction),
    /// The client asks to be focused.
    Activate,
    Urgency(bool),
}

/// Events delivered by the display server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayEvent {
    Expose { window: WindowHandle },
    MapRequest(Window),
    UnmapNotify { window: WindowHandle },
    DestroyNotify { window: WindowHandle },
    ConfigureRequest { window: WindowHandle, rect: Rect },
    ClientMessage { window: WindowHandle, message: ClientMessage },
    EnterNotify { window: WindowHandle },
    /// `modifier` is set when the drag modifier was held.
    ButtonPress { window: WindowHandle, position: Point, modifier: bool },
    ButtonRelease { position: Point },
    MotionNotify { position: Point },
    KeyPress,
}

/// Every request a [`RecordingDisplay`] received, in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    CreateWindow { handle: WindowHandle, rect: Rect },
    SetWindowRect(WindowHandle, Rect),
    Reparent { window: WindowHandle, parent: WindowHandle, offset: Point },
    Map(WindowHandle),
    Unmap(WindowHandle),
    RestackAbove(WindowHandle, Option<WindowHandle>),
    SetInputFocus(WindowHandle),
    ConfigureNotify(WindowHandle, Rect),
    Destroy(WindowHandle),
    Close(WindowHandle),
    CrossingEvents(bool),
    WarpPointer(Point),
}

/// A display connection that records requests instead of sending them.
///
/// Frame handles are allocated from `0x0040_0000` upwards so they never
/// collide with client handles used in tests.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub requests: Vec<Request>,
    next_handle: u32,
    /// Windows that behave as if destroyed by their client.
    pub gone: FxHashSet<WindowHandle>,
    pub fail_allocations: bool,
}

const FIRST_FRAME_HANDLE: u32 = 0x0040_0000;

impl RecordingDisplay {
    pub fn new() -> Self { Self::default() }

    /// Returns the recorded requests and forgets them.
    pub fn take(&mut self) -> Vec<Request> { std::mem::take(&mut self.requests) }

    fn check(&self, window: WindowHandle) -> Result<(), DisplayError> {
        if self.gone.contains(&window) {
            Err(DisplayError::WindowGone(window))
        } else {
            Ok(())
        }
    }

    fn record(&mut self, window: WindowHandle, request: Request) -> Result<(), DisplayError> {
        self.check(window)?;
        self.requests.push(request);
        Ok(())
    }
}

impl DisplayConnection for RecordingDisplay {
    fn create_window(
        &mut self,
        rect: Rect,
        _class: WindowClass,
        _cursor: Cursor,
        _mask: EventMask,
        _values: &[WindowValue],
    ) -> Result<WindowHandle, DisplayError> {
        if self.fail_allocations {
            return Err(DisplayError::AllocationFailed("frame window".to_owned()));
        }
        let handle = WindowHandle(FIRST_FRAME_HANDLE + self.next_handle);
        self.next_handle += 1;
        self.requests.push(Request::CreateWindow { handle, rect });
        Ok(handle)
    }

    fn set_window_rect(&mut self, window: WindowHandle, rect: Rect) -> Result<(), DisplayError> {
        self.record(window, Request::SetWindowRect(window, rect))
    }

    fn reparent_window(
        &mut self,
        window: WindowHandle,
        parent: WindowHandle,
        offset: Point,
    ) -> Result<(), DisplayError> {
        self.record(window, Request::Reparent { window, parent, offset })
    }

    fn map(&mut self, window: WindowHandle) -> Result<(), DisplayError> {
        self.record(window, Request::Map(window))
    }

    fn unmap(&mut self, window: WindowHandle) -> Result<(), DisplayError> {
        self.record(window, Request::Unmap(window))
    }

    fn restack_above(
        &mut self,
        window: WindowHandle,
        sibling: Option<WindowHandle>,
    ) -> Result<(), DisplayError> {
        self.record(window, Request::RestackAbove(window, sibling))
    }

    fn set_input_focus(&mut self, window: WindowHandle) -> Result<(), DisplayError> {
        self.record(window, Request::SetInputFocus(window))
    }

    fn send_configure_notify(&mut self, window: WindowHandle, rect: Rect) -> Result<(), DisplayError> {
        self.record(window, Request::ConfigureNotify(window, rect))
    }

    fn destroy_window(&mut self, window: WindowHandle) -> Result<(), DisplayError> {
        self.record(window, Request::Destroy(window))
    }

    fn close_window(&mut self, window: WindowHandle) -> Result<(), DisplayError> {
        self.record(window, Request::Close(window))
    }

    fn set_crossing_events(&mut self, enabled: bool) -> Result<(), DisplayError> {
        self.requests.push(Request::CrossingEvents(enabled));
        Ok(())
    }

    fn warp_pointer(&mut self, to: Point) -> Result<(), DisplayError> {
        self.requests.push(Request::WarpPointer(to));
        Ok(())
    }
}
