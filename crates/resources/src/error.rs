//! Error types for asset loading.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResourceError {
    /// The OBJ parser rejected the file.
    #[error("Failed to load OBJ file '{path}': {message}")]
    ObjLoad { path: PathBuf, message: String },

    /// A sub-mesh has no vertex positions.
    #[error("Mesh '{0}' has no position data")]
    NoPositionData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Pixel buffer length does not match `width * height * 4`.
    #[error("Invalid image data: {0}")]
    InvalidImage(String),
}

pub type ResourceResult<T> = Result<T, ResourceError>;
