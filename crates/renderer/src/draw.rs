//! Per-frame draw planning and command recording.
//!
//! A [`FramePlan`] is built from plain handles first and then replayed onto a
//! command buffer, so the ordering of binds, pushes and draws can be checked
//! without a device.

use ash::vk;
use glam::Mat4;

use course_rhi::command::CommandBuffer;

use crate::error::{RendererError, RendererResult};
use crate::mesh::MeshBinding;
use crate::mesh_model::MeshModel;
use crate::ubo::PushModel;

/// Vertices of the composite pass's full-screen triangle.
pub const COMPOSITE_VERTEX_COUNT: u32 = 3;

/// Clear values in attachment order: swapchain, offscreen colour, depth.
pub fn clear_values() -> [vk::ClearValue; 3] {
    [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        },
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.6, 0.65, 0.4, 1.0],
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshDraw {
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_count: u32,
    /// Set 0 is the image's UBO, set 1 the mesh's texture.
    pub descriptor_sets: [vk::DescriptorSet; 2],
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelDraw {
    pub push: PushModel,
    pub meshes: Vec<MeshDraw>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FramePlan {
    pub models: Vec<ModelDraw>,
    pub input_set: vk::DescriptorSet,
}

/// Plans one model: a push of `transform`, then one indexed draw per mesh.
pub fn plan_model(
    transform: Mat4,
    meshes: impl IntoIterator<Item = MeshBinding>,
    ubo_set: vk::DescriptorSet,
    sampler_sets: &[vk::DescriptorSet],
) -> RendererResult<ModelDraw> {
    let meshes = meshes
        .into_iter()
        .map(|mesh| -> RendererResult<MeshDraw> {
            let sampler_set = sampler_sets
                .get(mesh.texture_id)
                .copied()
                .ok_or(RendererError::InvalidTexture(mesh.texture_id))?;
            Ok(MeshDraw {
                vertex_buffer: mesh.vertex_buffer,
                index_buffer: mesh.index_buffer,
                index_count: mesh.index_count,
                descriptor_sets: [ubo_set, sampler_set],
            })
        })
        .collect::<RendererResult<Vec<_>>>()?;

    Ok(ModelDraw {
        push: PushModel::new(transform),
        meshes,
    })
}

/// Plans every model in registration order.
pub fn plan_frame(
    models: &[MeshModel],
    ubo_set: vk::DescriptorSet,
    input_set: vk::DescriptorSet,
    sampler_sets: &[vk::DescriptorSet],
) -> RendererResult<FramePlan> {
    let models = models
        .iter()
        .map(|model| {
            plan_model(
                model.transform(),
                model.meshes().iter().map(|mesh| mesh.binding()),
                ubo_set,
                sampler_sets,
            )
        })
        .collect::<RendererResult<Vec<_>>>()?;

    Ok(FramePlan { models, input_set })
}

/// Handles the recorded commands refer to.
#[derive(Clone, Copy, Debug)]
pub struct PassTargets {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub main_pipeline: vk::Pipeline,
    pub main_layout: vk::PipelineLayout,
    pub composite_pipeline: vk::Pipeline,
    pub composite_layout: vk::PipelineLayout,
}

/// Records both subpasses of `plan` into `cmd`.
pub fn record_frame(
    cmd: &CommandBuffer,
    targets: &PassTargets,
    plan: &FramePlan,
) -> RendererResult<()> {
    cmd.begin()?;
    cmd.begin_render_pass(
        targets.render_pass,
        targets.framebuffer,
        targets.extent,
        &clear_values(),
    );

    cmd.bind_graphics_pipeline(targets.main_pipeline);
    for model in &plan.models {
        cmd.push_constants(
            targets.main_layout,
            vk::ShaderStageFlags::VERTEX,
            0,
            bytemuck::bytes_of(&model.push),
        );

        for mesh in &model.meshes {
            cmd.bind_vertex_buffers(0, &[mesh.vertex_buffer], &[0]);
            cmd.bind_index_buffer(mesh.index_buffer, 0, vk::IndexType::UINT32);
            cmd.bind_descriptor_sets(targets.main_layout, 0, &mesh.descriptor_sets);
            cmd.draw_indexed(mesh.index_count, 1, 0, 0, 0);
        }
    }

    cmd.next_subpass();

    cmd.bind_graphics_pipeline(targets.composite_pipeline);
    cmd.bind_descriptor_sets(targets.composite_layout, 0, &[plan.input_set]);
    cmd.draw(COMPOSITE_VERTEX_COUNT, 1, 0, 0);

    cmd.end_render_pass();
    cmd.end()?;

    Ok(())
}
