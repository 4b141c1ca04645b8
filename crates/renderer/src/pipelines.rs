//! The geometry and composite pipelines.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::info;

use course_rhi::RhiResult;
use course_rhi::device::Device;
use course_rhi::pipeline::{
    ColorBlendAttachment, CullMode, FrontFace, GraphicsPipelineBuilder, Pipeline, PipelineLayout,
};
use course_rhi::render_pass::{COMPOSITE_SUBPASS, GEOMETRY_SUBPASS, RenderPass};
use course_rhi::shader::{Shader, ShaderStage};
use course_rhi::vertex::Vertex;

use crate::descriptors::DescriptorManager;
use crate::ubo::PushModel;

/// Shader binaries, by base name, for each subpass.
pub const GEOMETRY_SHADER: &str = "shader";
pub const COMPOSITE_SHADER: &str = "second";

pub struct Pipelines {
    main_layout: PipelineLayout,
    main: Pipeline,
    composite_layout: PipelineLayout,
    composite: Pipeline,
}

impl Pipelines {
    /// Loads both shader pairs from `shader_dir` and builds the pipelines.
    ///
    /// The shader modules are released once the pipelines exist.
    pub fn new(
        device: Arc<Device>,
        render_pass: &RenderPass,
        extent: vk::Extent2D,
        shader_dir: &Path,
        descriptors: &DescriptorManager,
    ) -> RhiResult<Self> {
        let main_layout = PipelineLayout::new(
            device.clone(),
            &[descriptors.ubo_layout(), descriptors.sampler_layout()],
            &[PushModel::push_constant_range()],
        )?;

        let vertex = Shader::load(device.clone(), shader_dir, GEOMETRY_SHADER, ShaderStage::Vertex)?;
        let fragment =
            Shader::load(device.clone(), shader_dir, GEOMETRY_SHADER, ShaderStage::Fragment)?;

        let main = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex)
            .fragment_shader(&fragment)
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .cull_mode(CullMode::Back)
            .front_face(FrontFace::CounterClockwise)
            .color_blend_attachment(ColorBlendAttachment::alpha_blend())
            .extent(extent)
            .render_pass(render_pass, GEOMETRY_SUBPASS)
            .build(device.clone(), &main_layout)?;

        let composite_layout =
            PipelineLayout::new(device.clone(), &[descriptors.input_layout()], &[])?;

        let composite_vertex = Shader::load(
            device.clone(),
            shader_dir,
            COMPOSITE_SHADER,
            ShaderStage::Vertex,
        )?;
        let composite_fragment = Shader::load(
            device.clone(),
            shader_dir,
            COMPOSITE_SHADER,
            ShaderStage::Fragment,
        )?;

        // Full-screen triangle generated from gl_VertexIndex; its winding is
        // clockwise on screen, so nothing is culled.
        let composite = GraphicsPipelineBuilder::new()
            .vertex_shader(&composite_vertex)
            .fragment_shader(&composite_fragment)
            .cull_mode(CullMode::None)
            .depth_write_enable(false)
            .color_blend_attachment(ColorBlendAttachment::alpha_blend())
            .extent(extent)
            .render_pass(render_pass, COMPOSITE_SUBPASS)
            .build(device, &composite_layout)?;

        info!("Geometry and composite pipelines ready");

        Ok(Self {
            main_layout,
            main,
            composite_layout,
            composite,
        })
    }

    #[inline]
    pub fn main(&self) -> vk::Pipeline {
        self.main.handle()
    }

    #[inline]
    pub fn main_layout(&self) -> vk::PipelineLayout {
        self.main_layout.handle()
    }

    #[inline]
    pub fn composite(&self) -> vk::Pipeline {
        self.composite.handle()
    }

    #[inline]
    pub fn composite_layout(&self) -> vk::PipelineLayout {
        self.composite_layout.handle()
    }
}
