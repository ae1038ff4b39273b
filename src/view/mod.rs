//! View and frame scheduling
//!
//! A [`View`] turns any number of scene changes into one traversal per
//! display frame. The display loop itself lives behind [`FrameHost`].

mod frame;
mod scene_view;

pub use frame::{FrameHost, ManualFrameHost};
pub use scene_view::View;
