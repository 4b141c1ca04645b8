//! Texture registry.
//!
//! Texture ids index both the image list and the sampler descriptor sets.
//! Id 0 is a 1x1 white texture created at startup, so every mesh has
//! something valid to sample even when its material has no diffuse map.

use std::sync::Arc;

use tracing::info;

use course_resources::ImageData;
use course_rhi::command::CommandPool;
use course_rhi::device::Device;
use course_rhi::image::Image;
use course_rhi::sampler::Sampler;

use crate::descriptors::{DescriptorManager, ensure_texture_capacity};
use crate::error::RendererResult;

pub const DEFAULT_TEXTURE_ID: usize = 0;

pub struct TextureRegistry {
    images: Vec<Image>,
    sampler: Sampler,
}

impl TextureRegistry {
    /// Creates the shared sampler and registers the default texture.
    ///
    /// `max_sampler_anisotropy` is the device limit the sampler is clamped to.
    pub fn new(
        device: Arc<Device>,
        pool: &CommandPool,
        descriptors: &mut DescriptorManager,
        max_sampler_anisotropy: f32,
    ) -> RendererResult<Self> {
        let sampler = Sampler::linear_repeat(device.clone(), max_sampler_anisotropy)?;
        let mut registry = Self {
            images: Vec::new(),
            sampler,
        };

        let id = registry.create(device, pool, descriptors, &ImageData::white())?;
        debug_assert_eq!(id, DEFAULT_TEXTURE_ID);

        Ok(registry)
    }

    /// Uploads `image` and returns its texture id.
    ///
    /// # Errors
    ///
    /// Returns [`RendererError::TextureLimit`] before any upload once the
    /// sampler pool is full.
    pub fn create(
        &mut self,
        device: Arc<Device>,
        pool: &CommandPool,
        descriptors: &mut DescriptorManager,
        image: &ImageData,
    ) -> RendererResult<usize> {
        ensure_texture_capacity(self.images.len(), 1)?;

        let texture =
            Image::new_texture_rgba8(device, pool, image.width, image.height, &image.pixels)?;
        let id = descriptors.create_sampler_set(texture.view(), self.sampler.handle())?;
        self.images.push(texture);

        info!(
            "Texture {} created ({}x{})",
            id, image.width, image.height
        );

        Ok(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
