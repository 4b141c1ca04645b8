//! Indexed geometry living in GPU buffers.
//!
//! [`Mesh::new`] uploads through a staging buffer into device-local memory.
//! [`Mesh::new_host_visible`] keeps both buffers in host-visible memory and
//! writes them directly, which is simpler but slower to read on discrete GPUs.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use course_rhi::buffer::{Buffer, BufferUsage};
use course_rhi::command::CommandPool;
use course_rhi::device::Device;
use course_rhi::vertex::Vertex;

use crate::error::{RendererError, RendererResult};

/// Everything a draw call needs from a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshBinding {
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_count: u32,
    pub texture_id: usize,
}

/// Vertex and index buffers plus the texture the mesh samples.
pub struct Mesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    vertex_count: u32,
    index_count: u32,
    texture_id: usize,
}

impl Mesh {
    /// Uploads `vertices` and `indices` into device-local buffers.
    ///
    /// # Errors
    ///
    /// Fails on empty geometry, on an index outside `vertices`, or when a
    /// buffer cannot be created or filled.
    pub fn new(
        device: Arc<Device>,
        pool: &CommandPool,
        vertices: &[Vertex],
        indices: &[u32],
        texture_id: usize,
    ) -> RendererResult<Self> {
        validate_indices(indices, vertices.len())?;

        let vertex_buffer = Buffer::new_device_local(
            device.clone(),
            pool,
            BufferUsage::Vertex,
            bytemuck::cast_slice(vertices),
        )?;
        let index_buffer = Buffer::new_device_local(
            device,
            pool,
            BufferUsage::Index,
            bytemuck::cast_slice(indices),
        )?;

        Ok(Self::from_buffers(
            vertex_buffer,
            index_buffer,
            vertices.len(),
            indices.len(),
            texture_id,
        ))
    }

    /// Writes `vertices` and `indices` straight into host-visible buffers.
    pub fn new_host_visible(
        device: Arc<Device>,
        vertices: &[Vertex],
        indices: &[u32],
        texture_id: usize,
    ) -> RendererResult<Self> {
        validate_indices(indices, vertices.len())?;

        let vertex_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::HostVertex,
            bytemuck::cast_slice(vertices),
        )?;
        let index_buffer =
            Buffer::new_with_data(device, BufferUsage::HostIndex, bytemuck::cast_slice(indices))?;

        Ok(Self::from_buffers(
            vertex_buffer,
            index_buffer,
            vertices.len(),
            indices.len(),
            texture_id,
        ))
    }

    fn from_buffers(
        vertex_buffer: Buffer,
        index_buffer: Buffer,
        vertex_count: usize,
        index_count: usize,
        texture_id: usize,
    ) -> Self {
        debug!(
            "Mesh created: {} vertices, {} indices, texture {}",
            vertex_count, index_count, texture_id
        );

        Self {
            vertex_buffer,
            index_buffer,
            vertex_count: vertex_count as u32,
            index_count: index_count as u32,
            texture_id,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    #[inline]
    pub fn texture_id(&self) -> usize {
        self.texture_id
    }

    #[inline]
    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertex_buffer.handle()
    }

    #[inline]
    pub fn index_buffer(&self) -> vk::Buffer {
        self.index_buffer.handle()
    }

    pub fn binding(&self) -> MeshBinding {
        MeshBinding {
            vertex_buffer: self.vertex_buffer.handle(),
            index_buffer: self.index_buffer.handle(),
            index_count: self.index_count,
            texture_id: self.texture_id,
        }
    }
}

/// Checks that geometry is non-empty and every index addresses a vertex.
pub fn validate_indices(indices: &[u32], vertex_count: usize) -> RendererResult<()> {
    if vertex_count == 0 || indices.is_empty() {
        return Err(RendererError::EmptyMesh);
    }

    match indices.iter().find(|&&index| index as usize >= vertex_count) {
        Some(&index) => Err(RendererError::InvalidIndex {
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_indices_are_valid() {
        assert!(validate_indices(&[0, 1, 2, 2, 3, 0], 4).is_ok());
    }

    #[test]
    fn test_out_of_range_index_is_reported() {
        let result = validate_indices(&[0, 1, 4], 4);
        assert!(matches!(
            result,
            Err(RendererError::InvalidIndex {
                index: 4,
                vertex_count: 4
            })
        ));
    }

    #[test]
    fn test_empty_geometry_is_rejected() {
        assert!(matches!(
            validate_indices(&[], 3),
            Err(RendererError::EmptyMesh)
        ));
        assert!(matches!(
            validate_indices(&[0], 0),
            Err(RendererError::EmptyMesh)
        ));
    }
}
