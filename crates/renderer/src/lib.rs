//! Two-subpass Vulkan renderer.
//!
//! This crate orchestrates the rendering process:
//! - Mesh upload and model loading
//! - Textures, descriptors and the geometry / composite pipelines
//! - Frame pacing and command recording
//!
//! [`Renderer`] is the entry point.

pub mod attachments;
pub mod descriptors;
pub mod draw;
mod error;
pub mod frame_manager;
pub mod mesh;
pub mod mesh_model;
pub mod pipelines;
mod renderer;
pub mod texture;
pub mod ubo;

pub use error::{RendererError, RendererResult};
pub use mesh::Mesh;
pub use mesh_model::MeshModel;
pub use renderer::Renderer;

/// Maximum number of frames that can be in flight simultaneously.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Capacity of the sampler descriptor pool, and so the texture limit.
pub const MAX_OBJECTS: usize = 20;
