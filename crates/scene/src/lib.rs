//! Fixed look-at camera producing the view and projection matrices.

pub mod camera;

pub use camera::Camera;
