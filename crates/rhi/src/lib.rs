//! Thin RAII layer over `ash`.
//!
//! Each wrapper owns one Vulkan object and destroys it on drop. Objects that
//! need the logical device hold an `Arc<Device>`, so the device outlives
//! everything created from it.

mod error;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod sampler;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult};

pub use ash::vk;
