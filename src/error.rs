// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TryOnError {
    #[error("camera error: {0}")]
    Camera(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("replay file {path} is invalid: {reason}")]
    Replay { path: PathBuf, reason: String },

    #[error("landmark provider failed: {0}")]
    Provider(String),
}

pub type Result<T> = std::result::Result<T, TryOnError>;
