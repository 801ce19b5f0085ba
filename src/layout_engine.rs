pub(crate) mod graph;
pub mod render;

pub use graph::{Direction, Orientation, Position};
pub use render::{Stacking, fullscreen_con, render, split_sizes, visible_workspace};

#[cfg(test)]
mod tests;
