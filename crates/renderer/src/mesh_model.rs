//! A loaded model: its meshes and one shared model transform.

use glam::{Mat4, Vec3};

use course_resources::{ImageData, MeshData, ModelData};
use course_rhi::vertex::Vertex;

use crate::descriptors::ensure_texture_capacity;
use crate::error::{RendererError, RendererResult};
use crate::mesh::{Mesh, validate_indices};
use crate::texture::DEFAULT_TEXTURE_ID;

pub struct MeshModel {
    meshes: Vec<Mesh>,
    transform: Mat4,
}

impl MeshModel {
    /// Starts with the identity transform.
    pub fn new(meshes: Vec<Mesh>) -> Self {
        Self {
            meshes,
            transform: Mat4::IDENTITY,
        }
    }

    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn get_mesh(&self, index: usize) -> Option<&Mesh> {
        self.meshes.get(index)
    }

    #[inline]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }
}

/// Interleaves a loaded mesh into white vertices.
pub fn build_vertices(mesh: &MeshData) -> Vec<Vertex> {
    mesh.positions
        .iter()
        .zip(mesh.tex_coords.iter())
        .map(|(&position, &tex_coord)| Vertex::new(position, Vec3::ONE, tex_coord))
        .collect()
}

/// A model decoded and validated on the CPU, ready for upload.
#[derive(Debug)]
pub struct PreparedModel {
    /// One per material with a diffuse texture, in material order.
    pub images: Vec<ImageData>,
    pub meshes: Vec<PreparedMesh>,
}

#[derive(Debug)]
pub struct PreparedMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Index into [`PreparedModel::images`]; `None` samples the default texture.
    pub image: Option<usize>,
}

/// Decodes every diffuse texture and validates every mesh of `model`.
///
/// Nothing touches the GPU here, so a failure leaves the texture registry
/// and descriptor pool exactly as they were.
///
/// # Errors
///
/// [`RendererError::TextureLimit`] when the model's textures would not fit
/// beside `existing_textures`, checked before anything is decoded. Otherwise
/// the first decode or index validation failure.
pub fn prepare_model(
    model: &ModelData,
    existing_textures: usize,
    mut load_image: impl FnMut(&str) -> RendererResult<ImageData>,
) -> RendererResult<PreparedModel> {
    let texture_count = model.texture_names.iter().flatten().count();
    ensure_texture_capacity(existing_textures, texture_count)?;

    let mut images = Vec::with_capacity(texture_count);
    let mut material_images = Vec::with_capacity(model.texture_names.len());
    for name in &model.texture_names {
        let slot = match name {
            Some(name) => {
                images.push(load_image(name)?);
                Some(images.len() - 1)
            }
            None => None,
        };
        material_images.push(slot);
    }

    let meshes = model
        .meshes
        .iter()
        .map(|mesh| -> RendererResult<PreparedMesh> {
            let vertices = build_vertices(mesh);
            validate_indices(&mesh.indices, vertices.len())?;
            Ok(PreparedMesh {
                vertices,
                indices: mesh.indices.clone(),
                image: mesh
                    .material_id
                    .and_then(|id| material_images.get(id).copied().flatten()),
            })
        })
        .collect::<RendererResult<Vec<_>>>()?;

    Ok(PreparedModel { images, meshes })
}

/// Texture id for a prepared image slot, given the ids its images got.
pub fn texture_for_image(image_textures: &[usize], image: Option<usize>) -> usize {
    image
        .and_then(|slot| image_textures.get(slot).copied())
        .unwrap_or(DEFAULT_TEXTURE_ID)
}

/// Out-of-range model ids are reported, not ignored.
pub(crate) fn model_at(models: &[MeshModel], model_id: usize) -> RendererResult<&MeshModel> {
    models
        .get(model_id)
        .ok_or(RendererError::InvalidModel(model_id))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use course_resources::ResourceError;
    use glam::Vec2;

    use super::*;
    use crate::MAX_OBJECTS;

    fn quad_data() -> MeshData {
        MeshData {
            name: "quad".to_string(),
            positions: vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            tex_coords: vec![
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 0.0),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
            material_id: Some(1),
        }
    }

    #[test]
    fn test_build_vertices_is_white() {
        let data = quad_data();
        let vertices = build_vertices(&data);
        assert_eq!(vertices.len(), 4);
        assert!(vertices.iter().all(|v| v.color == Vec3::ONE));
        assert_eq!(vertices[2].position, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(vertices[2].tex_coord, Vec2::new(1.0, 0.0));
    }

    fn textured_model() -> ModelData {
        let mut untextured = quad_data();
        untextured.material_id = None;
        let mut rotor = quad_data();
        rotor.material_id = Some(2);
        let mut plain = quad_data();
        plain.material_id = Some(0);

        ModelData {
            meshes: vec![quad_data(), untextured, rotor, plain],
            texture_names: vec![None, Some("body.png".to_string()), Some("rotor.png".to_string())],
        }
    }

    fn tile(shade: u8) -> ImageData {
        ImageData::from_rgba8(1, 1, vec![shade; 4]).unwrap()
    }

    #[test]
    fn test_prepare_model_maps_materials_to_images() {
        let mut loaded = Vec::new();
        let prepared = prepare_model(&textured_model(), 1, |name| {
            loaded.push(name.to_string());
            Ok(tile(loaded.len() as u8))
        })
        .unwrap();

        assert_eq!(loaded, vec!["body.png", "rotor.png"]);
        assert_eq!(prepared.images, vec![tile(1), tile(2)]);

        let slots: Vec<_> = prepared.meshes.iter().map(|mesh| mesh.image).collect();
        assert_eq!(slots, vec![Some(0), None, Some(1), None]);
        assert_eq!(prepared.meshes[0].vertices.len(), 4);
        assert_eq!(prepared.meshes[0].indices, vec![0, 1, 2, 2, 3, 0]);
    }

    #[test]
    fn test_missing_image_stops_preparation() {
        let mut calls = 0;
        let result = prepare_model(&textured_model(), 1, |name| {
            calls += 1;
            Err(ResourceError::FileNotFound(PathBuf::from(name)).into())
        });

        assert!(matches!(
            result,
            Err(RendererError::Resource(ResourceError::FileNotFound(_)))
        ));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_bad_mesh_is_rejected_after_decoding_only() {
        let mut model = textured_model();
        model.meshes[2].indices = vec![0, 1, 9];
        let result = prepare_model(&model, 1, |_| Ok(tile(0)));
        assert!(matches!(
            result,
            Err(RendererError::InvalidIndex { index: 9, vertex_count: 4 })
        ));

        let mut model = textured_model();
        model.meshes[1].indices.clear();
        let result = prepare_model(&model, 1, |_| Ok(tile(0)));
        assert!(matches!(result, Err(RendererError::EmptyMesh)));
    }

    #[test]
    fn test_textures_over_capacity_are_rejected_before_decoding() {
        let mut calls = 0;
        let result = prepare_model(&textured_model(), MAX_OBJECTS - 1, |_| {
            calls += 1;
            Ok(tile(0))
        });
        assert!(matches!(
            result,
            Err(RendererError::TextureLimit(limit)) if limit == MAX_OBJECTS
        ));
        assert_eq!(calls, 0);

        // Exactly filling the pool is allowed.
        assert!(prepare_model(&textured_model(), MAX_OBJECTS - 2, |_| Ok(tile(0))).is_ok());
    }

    #[test]
    fn test_texture_for_image_falls_back_to_default() {
        let ids = [3, 5];
        assert_eq!(texture_for_image(&ids, Some(0)), 3);
        assert_eq!(texture_for_image(&ids, Some(1)), 5);
        assert_eq!(texture_for_image(&ids, None), DEFAULT_TEXTURE_ID);
        assert_eq!(texture_for_image(&[], Some(0)), DEFAULT_TEXTURE_ID);
    }

    #[test]
    fn test_new_model_has_identity_transform() {
        let model = MeshModel::new(Vec::new());
        assert_eq!(model.transform(), Mat4::IDENTITY);
        assert_eq!(model.mesh_count(), 0);
        assert!(model.get_mesh(0).is_none());
    }

    #[test]
    fn test_model_at_rejects_unknown_id() {
        let models = vec![MeshModel::new(Vec::new())];
        assert!(model_at(&models, 0).is_ok());
        assert!(matches!(
            model_at(&models, 1),
            Err(RendererError::InvalidModel(1))
        ));
    }
}
