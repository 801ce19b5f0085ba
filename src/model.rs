pub mod con;
pub mod matching;
pub mod tree;
pub mod window;

pub use con::{BorderStyle, Con, ConType, FloatingState, FullscreenMode, Layout};
pub use matching::{DockMatch, Match};
pub use tree::{ConId, ConMap, InsertAt, Observer, Tree};
pub use window::{Dock, SizeHints, Window, WindowHandle};
