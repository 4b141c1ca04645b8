//! Window and presentation surface for the course renderer.
//!
//! - [`Window`] wraps a fixed-size winit window
//! - [`Surface`] owns the `VkSurfaceKHR` created for it
//! - [`required_extensions`] lists the instance extensions surfaces need

mod window;

pub use window::{Surface, Window, required_extensions};

pub use winit::event::WindowEvent;
pub use winit::event_loop::{ActiveEventLoop, EventLoop};
