//! Core of a tiling window manager: the container tree, the layout engine
//! that turns it into rectangles, and the synchronizer that pushes the result
//! to a display server.

pub mod common;
pub mod layout_engine;
pub mod model;
pub mod sync;
pub mod wm;
