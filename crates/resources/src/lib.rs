//! CPU-side asset loading.
//!
//! - [`ModelData`]: OBJ geometry and per-material diffuse texture names
//! - [`ImageData`]: decoded RGBA8 pixels

mod error;
pub mod model;
pub mod texture;

pub use error::{ResourceError, ResourceResult};
pub use model::{MeshData, ModelData, normalise_texture_name};
pub use texture::ImageData;
