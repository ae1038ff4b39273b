//! Core engine module
//!
//! Events, errors, configuration and frame statistics shared by the scene
//! graph and the view.

mod config;
mod debug;
mod error;
mod events;
mod scene;

pub use config::{RenderState, ViewConfig};
pub use debug::FrameStats;
pub use error::SceneError;
pub use events::{EventQueue, Property, SceneEvent};
pub use scene::{
    KindDescription, MaterialDescription, NodeDescription, SceneDescription, SceneHandles, TransformDescription,
};
