//! Render pass and framebuffers.
//!
//! The renderer uses a single render pass with two subpasses:
//!
//! ```text
//! attachment 0  swapchain image    written by subpass 1, presented
//! attachment 1  offscreen color    written by subpass 0, input to subpass 1
//! attachment 2  depth              written by subpass 0, input to subpass 1
//! ```
//!
//! Subpass 0 rasterizes the scene. Subpass 1 reads color and depth as input
//! attachments and composites into the swapchain image with a full-screen
//! triangle.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::RhiResult;

/// Attachment indices, in framebuffer order.
pub const SWAPCHAIN_ATTACHMENT: u32 = 0;
pub const COLOR_ATTACHMENT: u32 = 1;
pub const DEPTH_ATTACHMENT: u32 = 2;

/// Subpass indices.
pub const GEOMETRY_SUBPASS: u32 = 0;
pub const COMPOSITE_SUBPASS: u32 = 1;

/// Formats of the three attachments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentFormats {
    pub swapchain: vk::Format,
    pub color: vk::Format,
    pub depth: vk::Format,
}

/// Attachment descriptions, indexed by the attachment constants above.
pub fn composite_attachments(formats: AttachmentFormats) -> [vk::AttachmentDescription; 3] {
    let base = vk::AttachmentDescription::default()
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED);

    let swapchain = base
        .format(formats.swapchain)
        .store_op(vk::AttachmentStoreOp::STORE)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

    // Consumed within the pass, so nothing is written back.
    let color = base
        .format(formats.color)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let depth = base
        .format(formats.depth)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    [swapchain, color, depth]
}

/// External -> geometry -> composite -> external.
pub fn composite_dependencies() -> [vk::SubpassDependency; 3] {
    let external_to_geometry = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(GEOMETRY_SUBPASS)
        .src_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
        .src_access_mask(vk::AccessFlags::MEMORY_READ)
        .dst_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        )
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_READ
                | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        );

    let geometry_to_composite = vk::SubpassDependency::default()
        .src_subpass(GEOMETRY_SUBPASS)
        .dst_subpass(COMPOSITE_SUBPASS)
        .src_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        )
        .src_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
        .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
        .dst_access_mask(vk::AccessFlags::INPUT_ATTACHMENT_READ);

    let composite_to_external = vk::SubpassDependency::default()
        .src_subpass(COMPOSITE_SUBPASS)
        .dst_subpass(vk::SUBPASS_EXTERNAL)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        )
        .dst_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
        .dst_access_mask(vk::AccessFlags::MEMORY_READ);

    [external_to_geometry, geometry_to_composite, composite_to_external]
}

/// Owned VkRenderPass.
pub struct RenderPass {
    device: Arc<Device>,
    render_pass: vk::RenderPass,
    formats: AttachmentFormats,
}

impl RenderPass {
    /// Creates the geometry + composite render pass.
    pub fn new_composite(device: Arc<Device>, formats: AttachmentFormats) -> RhiResult<Self> {
        let attachments = composite_attachments(formats);
        let dependencies = composite_dependencies();

        let geometry_color = [vk::AttachmentReference {
            attachment: COLOR_ATTACHMENT,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let geometry_depth = vk::AttachmentReference {
            attachment: DEPTH_ATTACHMENT,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };

        let composite_color = [vk::AttachmentReference {
            attachment: SWAPCHAIN_ATTACHMENT,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let composite_inputs = [
            vk::AttachmentReference {
                attachment: COLOR_ATTACHMENT,
                layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            },
            vk::AttachmentReference {
                attachment: DEPTH_ATTACHMENT,
                layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            },
        ];

        let subpasses = [
            vk::SubpassDescription::default()
                .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                .color_attachments(&geometry_color)
                .depth_stencil_attachment(&geometry_depth),
            vk::SubpassDescription::default()
                .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                .color_attachments(&composite_color)
                .input_attachments(&composite_inputs),
        ];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { device.handle().create_render_pass(&create_info, None)? };

        info!(
            "Render pass created: swapchain {:?}, color {:?}, depth {:?}",
            formats.swapchain, formats.color, formats.depth
        );

        Ok(Self {
            device,
            render_pass,
            formats,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    #[inline]
    pub fn formats(&self) -> AttachmentFormats {
        self.formats
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_render_pass(self.render_pass, None);
        }
        debug!("Render pass destroyed");
    }
}

/// Owned VkFramebuffer.
pub struct Framebuffer {
    device: Arc<Device>,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Creates a single-layer framebuffer; `attachments` follow the pass's attachment order.
    pub fn new(
        device: Arc<Device>,
        render_pass: &RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.handle())
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { device.handle().create_framebuffer(&create_info, None)? };

        Ok(Self {
            device,
            framebuffer,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_framebuffer(self.framebuffer, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> AttachmentFormats {
        AttachmentFormats {
            swapchain: vk::Format::B8G8R8A8_UNORM,
            color: vk::Format::R8G8B8A8_UNORM,
            depth: vk::Format::D32_SFLOAT_S8_UINT,
        }
    }

    #[test]
    fn test_attachment_order_and_formats() {
        let attachments = composite_attachments(formats());
        assert_eq!(attachments[SWAPCHAIN_ATTACHMENT as usize].format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(attachments[COLOR_ATTACHMENT as usize].format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(attachments[DEPTH_ATTACHMENT as usize].format, vk::Format::D32_SFLOAT_S8_UINT);
    }

    #[test]
    fn test_only_swapchain_attachment_is_stored() {
        let attachments = composite_attachments(formats());
        for attachment in &attachments {
            assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
            assert_eq!(attachment.initial_layout, vk::ImageLayout::UNDEFINED);
        }

        let swapchain = attachments[SWAPCHAIN_ATTACHMENT as usize];
        assert_eq!(swapchain.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(swapchain.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);

        let color = attachments[COLOR_ATTACHMENT as usize];
        assert_eq!(color.store_op, vk::AttachmentStoreOp::DONT_CARE);
        assert_eq!(color.final_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let depth = attachments[DEPTH_ATTACHMENT as usize];
        assert_eq!(depth.store_op, vk::AttachmentStoreOp::DONT_CARE);
        assert_eq!(depth.final_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
    }

    #[test]
    fn test_dependencies_chain_the_subpasses() {
        let [first, middle, last] = composite_dependencies();

        assert_eq!(first.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(first.dst_subpass, GEOMETRY_SUBPASS);

        assert_eq!(middle.src_subpass, GEOMETRY_SUBPASS);
        assert_eq!(middle.dst_subpass, COMPOSITE_SUBPASS);

        assert_eq!(last.src_subpass, COMPOSITE_SUBPASS);
        assert_eq!(last.dst_subpass, vk::SUBPASS_EXTERNAL);
    }

    #[test]
    fn test_composite_reads_wait_for_geometry_writes() {
        let [_, middle, _] = composite_dependencies();

        assert!(middle.src_access_mask.contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE));
        assert!(middle.src_access_mask.contains(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));
        assert!(middle.src_stage_mask.contains(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT));
        assert!(middle.src_stage_mask.contains(vk::PipelineStageFlags::LATE_FRAGMENT_TESTS));
        assert_eq!(middle.dst_stage_mask, vk::PipelineStageFlags::FRAGMENT_SHADER);
        assert_eq!(middle.dst_access_mask, vk::AccessFlags::INPUT_ATTACHMENT_READ);
    }

    #[test]
    fn test_presentation_waits_for_composite_output() {
        let [_, _, last] = composite_dependencies();
        assert_eq!(last.src_stage_mask, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(last.dst_stage_mask, vk::PipelineStageFlags::BOTTOM_OF_PIPE);
        assert_eq!(last.dst_access_mask, vk::AccessFlags::MEMORY_READ);
    }
}
