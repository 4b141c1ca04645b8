//! Renderer error type.

use thiserror::Error;

use course_resources::ResourceError;
use course_rhi::RhiError;

#[derive(Error, Debug)]
pub enum RendererError {
    #[error(transparent)]
    Rhi(#[from] RhiError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Platform(#[from] course_core::Error),

    #[error("Attempted to access invalid model id {0}")]
    InvalidModel(usize),

    #[error("Attempted to access invalid mesh index {mesh} of model {model}")]
    InvalidMesh { model: usize, mesh: usize },

    #[error("Texture id {0} is not registered")]
    InvalidTexture(usize),

    /// The sampler descriptor pool holds at most this many textures.
    #[error("Texture limit reached: at most {0} textures can be created")]
    TextureLimit(usize),

    #[error("Index {index} is out of range for a mesh with {vertex_count} vertices")]
    InvalidIndex { index: u32, vertex_count: usize },

    #[error("Mesh has no vertices or no indices")]
    EmptyMesh,

    /// The surface changed and the swapchain no longer matches it.
    #[error("Swapchain is out of date")]
    SwapchainOutOfDate,
}

pub type RendererResult<T> = Result<T, RendererError>;
