//! Descriptor layouts, pools and sets used by both subpasses.
//!
//! ```text
//! UBO set      binding 0  uniform buffer      vertex     one per swapchain image
//! sampler set  binding 0  combined sampler    fragment   one per texture, MAX_OBJECTS max
//! input set    binding 0  input attachment    fragment   offscreen colour
//!              binding 1  input attachment    fragment   depth
//! ```
//!
//! Uniform buffers stay persistently mapped; each frame's UBO is written
//! straight through that mapping instead of a map, copy, unmap cycle.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use course_rhi::RhiResult;
use course_rhi::buffer::{Buffer, BufferUsage};
use course_rhi::descriptor::{
    DescriptorBindingBuilder, DescriptorPool, DescriptorSetLayout, buffer_info, image_info,
    pool_size, update_descriptor_sets,
};
use course_rhi::device::Device;

use crate::MAX_OBJECTS;
use crate::attachments::Attachments;
use crate::error::{RendererError, RendererResult};
use crate::ubo::UboViewProjection;

pub fn ubo_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 1] {
    [DescriptorBindingBuilder::uniform_buffer(
        0,
        vk::ShaderStageFlags::VERTEX,
    )]
}

pub fn sampler_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 1] {
    [DescriptorBindingBuilder::combined_image_sampler(
        0,
        vk::ShaderStageFlags::FRAGMENT,
    )]
}

pub fn input_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; 2] {
    [
        DescriptorBindingBuilder::input_attachment(0),
        DescriptorBindingBuilder::input_attachment(1),
    ]
}

/// Owns every descriptor object plus the per-image uniform buffers.
pub struct DescriptorManager {
    device: Arc<Device>,

    ubo_layout: DescriptorSetLayout,
    sampler_layout: DescriptorSetLayout,
    input_layout: DescriptorSetLayout,

    ubo_pool: DescriptorPool,
    sampler_pool: DescriptorPool,
    input_pool: DescriptorPool,

    uniform_buffers: Vec<Buffer>,
    ubo_sets: Vec<vk::DescriptorSet>,
    input_sets: Vec<vk::DescriptorSet>,
    sampler_sets: Vec<vk::DescriptorSet>,
}

impl DescriptorManager {
    /// Creates layouts and pools, one uniform buffer per swapchain image, and
    /// writes the UBO and input-attachment sets.
    pub fn new(device: Arc<Device>, attachments: &Attachments) -> RhiResult<Self> {
        let image_count = attachments.len() as u32;

        let ubo_layout = DescriptorSetLayout::new(device.clone(), &ubo_bindings())?;
        let sampler_layout = DescriptorSetLayout::new(device.clone(), &sampler_bindings())?;
        let input_layout = DescriptorSetLayout::new(device.clone(), &input_bindings())?;

        let ubo_pool = DescriptorPool::new(
            device.clone(),
            image_count,
            &[pool_size(vk::DescriptorType::UNIFORM_BUFFER, image_count)],
        )?;
        let sampler_pool = DescriptorPool::new(
            device.clone(),
            MAX_OBJECTS as u32,
            &[pool_size(
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                MAX_OBJECTS as u32,
            )],
        )?;
        let input_pool = DescriptorPool::new(
            device.clone(),
            image_count,
            &[pool_size(
                vk::DescriptorType::INPUT_ATTACHMENT,
                image_count * 2,
            )],
        )?;

        let uniform_buffers = (0..image_count)
            .map(|_| {
                Buffer::new(
                    device.clone(),
                    BufferUsage::Uniform,
                    UboViewProjection::SIZE as vk::DeviceSize,
                )
            })
            .collect::<RhiResult<Vec<_>>>()?;

        let ubo_sets = ubo_pool.allocate(&vec![ubo_layout.handle(); image_count as usize])?;
        let input_sets = input_pool.allocate(&vec![input_layout.handle(); image_count as usize])?;

        for (index, (&set, buffer)) in ubo_sets.iter().zip(&uniform_buffers).enumerate() {
            let buffer_infos = [buffer_info(
                buffer.handle(),
                0,
                UboViewProjection::SIZE as vk::DeviceSize,
            )];
            let write = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(&buffer_infos);
            update_descriptor_sets(&device, &[write]);
            debug!("UBO descriptor set {} written", index);
        }

        for (index, &set) in input_sets.iter().enumerate() {
            let color_infos = [image_info(
                vk::Sampler::null(),
                attachments.color_view(index),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )];
            let depth_infos = [image_info(
                vk::Sampler::null(),
                attachments.depth_view(index),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )];
            let writes = [
                vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(0)
                    .descriptor_type(vk::DescriptorType::INPUT_ATTACHMENT)
                    .image_info(&color_infos),
                vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(1)
                    .descriptor_type(vk::DescriptorType::INPUT_ATTACHMENT)
                    .image_info(&depth_infos),
            ];
            update_descriptor_sets(&device, &writes);
        }

        info!(
            "Descriptor sets ready: {} UBO, {} input attachment, up to {} sampler",
            ubo_sets.len(),
            input_sets.len(),
            MAX_OBJECTS
        );

        Ok(Self {
            device,
            ubo_layout,
            sampler_layout,
            input_layout,
            ubo_pool,
            sampler_pool,
            input_pool,
            uniform_buffers,
            ubo_sets,
            input_sets,
            sampler_sets: Vec::new(),
        })
    }

    /// Allocates and writes a sampler set for `view`, returning its texture id.
    ///
    /// # Errors
    ///
    /// Returns [`RendererError::TextureLimit`] once [`MAX_OBJECTS`] sets exist.
    pub fn create_sampler_set(
        &mut self,
        view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> RendererResult<usize> {
        ensure_texture_capacity(self.sampler_sets.len(), 1)?;

        let set = self.sampler_pool.allocate(&[self.sampler_layout.handle()])?[0];
        let image_infos = [image_info(
            sampler,
            view,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_infos);
        update_descriptor_sets(&self.device, &[write]);

        self.sampler_sets.push(set);
        Ok(self.sampler_sets.len() - 1)
    }

    /// Copies `ubo` into the uniform buffer of `image_index`.
    pub fn update_uniform(&self, image_index: usize, ubo: &UboViewProjection) -> RhiResult<()> {
        self.uniform_buffers[image_index].write_data(0, bytemuck::bytes_of(ubo))
    }

    #[inline]
    pub fn ubo_layout(&self) -> vk::DescriptorSetLayout {
        self.ubo_layout.handle()
    }

    #[inline]
    pub fn sampler_layout(&self) -> vk::DescriptorSetLayout {
        self.sampler_layout.handle()
    }

    #[inline]
    pub fn input_layout(&self) -> vk::DescriptorSetLayout {
        self.input_layout.handle()
    }

    #[inline]
    pub fn ubo_sets(&self) -> &[vk::DescriptorSet] {
        &self.ubo_sets
    }

    #[inline]
    pub fn input_sets(&self) -> &[vk::DescriptorSet] {
        &self.input_sets
    }

    /// Indexed by texture id.
    #[inline]
    pub fn sampler_sets(&self) -> &[vk::DescriptorSet] {
        &self.sampler_sets
    }
}

/// Fails unless `additional` more sampler sets fit beside `existing` ones.
pub fn ensure_texture_capacity(existing: usize, additional: usize) -> RendererResult<()> {
    if existing.saturating_add(additional) > MAX_OBJECTS {
        Err(RendererError::TextureLimit(MAX_OBJECTS))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ubo_binding_is_vertex_only() {
        let [binding] = ubo_bindings();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(binding.stage_flags, vk::ShaderStageFlags::VERTEX);
    }

    #[test]
    fn test_sampler_binding_is_fragment_only() {
        let [binding] = sampler_bindings();
        assert_eq!(
            binding.descriptor_type,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
        assert_eq!(binding.stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn test_input_bindings_colour_then_depth() {
        let bindings = input_bindings();
        assert_eq!(bindings[0].binding, 0);
        assert_eq!(bindings[1].binding, 1);
        for binding in bindings {
            assert_eq!(binding.descriptor_type, vk::DescriptorType::INPUT_ATTACHMENT);
            assert_eq!(binding.stage_flags, vk::ShaderStageFlags::FRAGMENT);
        }
    }

    #[test]
    fn test_texture_capacity() {
        assert!(ensure_texture_capacity(0, 1).is_ok());
        assert!(ensure_texture_capacity(MAX_OBJECTS - 1, 1).is_ok());
        assert!(ensure_texture_capacity(MAX_OBJECTS, 0).is_ok());
        assert!(matches!(
            ensure_texture_capacity(MAX_OBJECTS, 1),
            Err(RendererError::TextureLimit(limit)) if limit == MAX_OBJECTS
        ));
    }

    #[test]
    fn test_texture_capacity_counts_whole_batch() {
        assert!(ensure_texture_capacity(1, MAX_OBJECTS - 1).is_ok());
        assert!(matches!(
            ensure_texture_capacity(1, MAX_OBJECTS),
            Err(RendererError::TextureLimit(_))
        ));
        assert!(ensure_texture_capacity(usize::MAX, 1).is_err());
    }
}
