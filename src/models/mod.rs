mod path_point;

pub use path_point::{PathAction, ScratchPathPoint};
