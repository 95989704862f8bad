//! Mistake detection for a tracked player

pub mod classifier;
pub mod themes;
mod types;
pub mod walker;

pub use classifier::{adjust_for_reply, classify, Classification, ClassifierInput};
pub use themes::infer_theme;
pub use types::*;
pub use walker::{GameWalk, GameWalker};
