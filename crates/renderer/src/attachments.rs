//! Offscreen colour and depth attachments, one pair per swapchain image.
//!
//! Both are written by the geometry subpass and read back as input
//! attachments by the composite subpass.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use course_rhi::RhiResult;
use course_rhi::device::Device;
use course_rhi::image::{Image, ImageDesc};
use course_rhi::instance::Instance;
use course_rhi::physical_device::PhysicalDeviceInfo;

pub const COLOR_FORMAT_CANDIDATES: [vk::Format; 1] = [vk::Format::R8G8B8A8_UNORM];

pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D32_SFLOAT,
    vk::Format::D24_UNORM_S8_UINT,
];

pub fn color_attachment_desc(extent: vk::Extent2D, format: vk::Format) -> ImageDesc {
    ImageDesc {
        extent,
        format,
        usage: vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::INPUT_ATTACHMENT,
        aspect: vk::ImageAspectFlags::COLOR,
    }
}

/// The view covers depth only, even for formats with a stencil component.
pub fn depth_attachment_desc(extent: vk::Extent2D, format: vk::Format) -> ImageDesc {
    ImageDesc {
        extent,
        format,
        usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
            | vk::ImageUsageFlags::INPUT_ATTACHMENT,
        aspect: vk::ImageAspectFlags::DEPTH,
    }
}

/// Picks the offscreen colour and depth formats for `physical_device`.
pub fn choose_formats(
    instance: &Instance,
    physical_device: &PhysicalDeviceInfo,
) -> RhiResult<(vk::Format, vk::Format)> {
    let color = physical_device.find_supported_format(
        instance.handle(),
        &COLOR_FORMAT_CANDIDATES,
        vk::FormatFeatureFlags::COLOR_ATTACHMENT,
    )?;
    let depth = physical_device.find_supported_format(
        instance.handle(),
        &DEPTH_FORMAT_CANDIDATES,
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
    )?;
    Ok((color, depth))
}

pub struct Attachments {
    color: Vec<Image>,
    depth: Vec<Image>,
}

impl Attachments {
    pub fn new(
        device: Arc<Device>,
        count: usize,
        extent: vk::Extent2D,
        color_format: vk::Format,
        depth_format: vk::Format,
    ) -> RhiResult<Self> {
        let mut color = Vec::with_capacity(count);
        let mut depth = Vec::with_capacity(count);

        for _ in 0..count {
            color.push(Image::new(
                device.clone(),
                color_attachment_desc(extent, color_format),
            )?);
            depth.push(Image::new(
                device.clone(),
                depth_attachment_desc(extent, depth_format),
            )?);
        }

        info!(
            "Created {} colour ({:?}) and depth ({:?}) attachment pair(s) at {}x{}",
            count, color_format, depth_format, extent.width, extent.height
        );

        Ok(Self { color, depth })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.color.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.color.is_empty()
    }

    pub fn color_view(&self, index: usize) -> vk::ImageView {
        self.color[index].view()
    }

    pub fn depth_view(&self, index: usize) -> vk::ImageView {
        self.depth[index].view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 1366,
        height: 768,
    };

    #[test]
    fn test_depth_candidates_prefer_32_bit() {
        assert_eq!(DEPTH_FORMAT_CANDIDATES[0], vk::Format::D32_SFLOAT_S8_UINT);
        assert_eq!(DEPTH_FORMAT_CANDIDATES[1], vk::Format::D32_SFLOAT);
        assert_eq!(DEPTH_FORMAT_CANDIDATES[2], vk::Format::D24_UNORM_S8_UINT);
    }

    #[test]
    fn test_attachments_are_readable_as_inputs() {
        let color = color_attachment_desc(EXTENT, vk::Format::R8G8B8A8_UNORM);
        assert!(color.usage.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
        assert!(color.usage.contains(vk::ImageUsageFlags::INPUT_ATTACHMENT));
        assert_eq!(color.aspect, vk::ImageAspectFlags::COLOR);

        let depth = depth_attachment_desc(EXTENT, vk::Format::D32_SFLOAT_S8_UINT);
        assert!(depth.usage.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
        assert!(depth.usage.contains(vk::ImageUsageFlags::INPUT_ATTACHMENT));
        assert_eq!(depth.aspect, vk::ImageAspectFlags::DEPTH);
        assert_eq!(depth.extent, EXTENT);
    }
}
