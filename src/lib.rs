// src/lib.rs - Webcam jewelry try-on with landmark stability filtering
pub mod app;
pub mod error;
pub mod face_mesh;
pub mod jewelry;
pub mod overlay;
pub mod settings;
pub mod snapshot;
pub mod stability;
pub mod tracking;
pub mod ui;
pub mod video;

pub use error::{Result, TryOnError};
pub use stability::{
    update, FrameVerdict, LandmarkSet, StabilityConfig, StabilityFilter, StabilityState,
};
