pub mod display;
pub mod state;

pub use display::{
    ClientMessage, DisplayConnection, DisplayError, DisplayEvent, FullscreenAction, GoneIsOk,
    RecordingDisplay, Request,
};
pub use state::{DisplayState, ShadowState, push_changes};
