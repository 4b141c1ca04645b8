//! Core utilities for the course renderer.
//!
//! This crate provides foundational types used across the workspace:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timing
//! - Configuration loaded from defaults and environment overrides

mod config;
mod error;
mod logging;
mod timer;

pub use config::{Config, WindowConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::Timer;
