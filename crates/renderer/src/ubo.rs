//! Shader-visible data: the view-projection uniform block and the per-model
//! push constant.
//!
//! Both must match `shaders/shader.vert`:
//!
//! ```text
//! set 0, binding 0   uniform UboViewProjection { mat4 projection; mat4 view; }
//! push_constant      PushModel { mat4 model; }
//! ```

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// One copy lives in a uniform buffer per swapchain image.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct UboViewProjection {
    pub projection: Mat4,
    pub view: Mat4,
}

impl UboViewProjection {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(projection: Mat4, view: Mat4) -> Self {
        Self { projection, view }
    }
}

/// Per-model transform pushed before the model's meshes are drawn.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PushModel {
    pub model: Mat4,
}

impl PushModel {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(model: Mat4) -> Self {
        Self { model }
    }

    /// Vertex-stage range covering one matrix.
    pub fn push_constant_range() -> vk::PushConstantRange {
        vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: Self::SIZE as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_ubo_view_projection_layout() {
        assert_eq!(UboViewProjection::SIZE, 128);

        let ubo = UboViewProjection::new(Mat4::from_scale(Vec3::splat(2.0)), Mat4::IDENTITY);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&ubo));
        // Projection comes first.
        assert_eq!(floats[0], 2.0);
        assert_eq!(floats[16], 1.0);
    }

    #[test]
    fn test_push_model_is_one_matrix() {
        assert_eq!(PushModel::SIZE, 64);

        let range = PushModel::push_constant_range();
        assert_eq!(range.stage_flags, vk::ShaderStageFlags::VERTEX);
        assert_eq!(range.offset, 0);
        assert_eq!(range.size, 64);
    }

    #[test]
    fn test_push_model_bytes_are_the_matrix() {
        let transform = Mat4::from_rotation_y(0.5) * Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let push = PushModel::new(transform);
        assert_eq!(
            bytemuck::bytes_of(&push),
            bytemuck::bytes_of(&transform.to_cols_array())
        );
    }
}
