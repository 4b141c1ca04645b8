//! OBJ model loading.
//!
//! Files are parsed with `tobj` into one [`MeshData`] per OBJ object, with
//! faces triangulated and a single index stream shared by positions and
//! texture coordinates. Material libraries are optional: a missing or
//! unreadable `.mtl` is logged and every mesh is left without a material.

use std::path::Path;

use glam::{Vec2, Vec3};
use tracing::{debug, info, warn};

use crate::error::{ResourceError, ResourceResult};

/// Geometry of one sub-mesh.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<Vec3>,
    /// One per position; `v` is already flipped for Vulkan's top-left origin.
    pub tex_coords: Vec<Vec2>,
    pub indices: Vec<u32>,
    /// Index into [`ModelData::texture_names`].
    pub material_id: Option<usize>,
}

/// Meshes plus the diffuse texture file name of every material.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ModelData {
    pub meshes: Vec<MeshData>,
    /// Indexed by material; `None` for materials without a diffuse map.
    pub texture_names: Vec<Option<String>>,
}

impl ModelData {
    /// Loads an OBJ file and its material library.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::FileNotFound`] if `path` does not exist
    /// - [`ResourceError::ObjLoad`] if the OBJ cannot be parsed
    /// - [`ResourceError::NoPositionData`] if a sub-mesh has no positions
    pub fn load(path: &Path) -> ResourceResult<Self> {
        if !path.exists() {
            return Err(ResourceError::FileNotFound(path.to_path_buf()));
        }

        let options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        };

        let (models, materials) =
            tobj::load_obj(path, &options).map_err(|e| ResourceError::ObjLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let texture_names = match materials {
            Ok(materials) => materials
                .iter()
                .map(|material| {
                    material
                        .diffuse_texture
                        .as_deref()
                        .map(normalise_texture_name)
                        .filter(|name| !name.is_empty())
                })
                .collect(),
            Err(e) => {
                warn!(
                    "Material library for {:?} could not be loaded ({}); meshes fall back to the default texture",
                    path, e
                );
                Vec::new()
            }
        };

        let meshes = models
            .into_iter()
            .map(mesh_from_obj)
            .collect::<ResourceResult<Vec<_>>>()?;

        info!(
            "Loaded {:?}: {} mesh(es), {} material(s)",
            path,
            meshes.len(),
            texture_names.len()
        );

        Ok(Self {
            meshes,
            texture_names,
        })
    }

    /// Diffuse texture name for `material_id`, if that material has one.
    pub fn texture_name(&self, material_id: Option<usize>) -> Option<&str> {
        material_id
            .and_then(|id| self.texture_names.get(id))
            .and_then(|name| name.as_deref())
    }

    pub fn total_index_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.indices.len()).sum()
    }
}

fn mesh_from_obj(model: tobj::Model) -> ResourceResult<MeshData> {
    let mesh = model.mesh;

    if mesh.positions.is_empty() {
        return Err(ResourceError::NoPositionData(model.name));
    }

    let positions: Vec<Vec3> = mesh
        .positions
        .chunks_exact(3)
        .map(|xyz| Vec3::new(xyz[0], xyz[1], xyz[2]))
        .collect();

    let tex_coords: Vec<Vec2> = if mesh.texcoords.len() / 2 == positions.len() {
        mesh.texcoords
            .chunks_exact(2)
            .map(|uv| Vec2::new(uv[0], 1.0 - uv[1]))
            .collect()
    } else {
        vec![Vec2::ZERO; positions.len()]
    };

    debug!(
        "Mesh '{}': {} vertices, {} indices, material {:?}",
        model.name,
        positions.len(),
        mesh.indices.len(),
        mesh.material_id
    );

    Ok(MeshData {
        name: model.name,
        positions,
        tex_coords,
        indices: mesh.indices,
        material_id: mesh.material_id,
    })
}

/// Strips any directory prefix, accepting both `/` and `\` separators.
pub fn normalise_texture_name(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.rfind(['/', '\\']) {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_strips_directories() {
        assert_eq!(normalise_texture_name("textures/metal.png"), "metal.png");
        assert_eq!(normalise_texture_name("C:\\art\\heli\\body.jpg"), "body.jpg");
        assert_eq!(normalise_texture_name("mixed/dir\\file.png"), "file.png");
        assert_eq!(normalise_texture_name("plain.png"), "plain.png");
    }

    #[test]
    fn test_normalise_trailing_separator_is_empty() {
        assert_eq!(normalise_texture_name("textures/"), "");
    }

    #[test]
    fn test_texture_name_lookup() {
        let model = ModelData {
            meshes: Vec::new(),
            texture_names: vec![None, Some("body.png".to_string())],
        };
        assert_eq!(model.texture_name(Some(1)), Some("body.png"));
        assert_eq!(model.texture_name(Some(0)), None);
        assert_eq!(model.texture_name(Some(7)), None);
        assert_eq!(model.texture_name(None), None);
    }

    #[test]
    fn test_mesh_without_tex_coords_gets_zeroes() {
        let model = tobj::Model::new(
            tobj::Mesh {
                positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                indices: vec![0, 1, 2],
                ..Default::default()
            },
            "tri".to_string(),
        );
        let mesh = mesh_from_obj(model).unwrap();
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.tex_coords, vec![Vec2::ZERO; 3]);
        assert_eq!(mesh.material_id, None);
    }

    #[test]
    fn test_tex_coords_are_flipped() {
        let model = tobj::Model::new(
            tobj::Mesh {
                positions: vec![0.0, 0.0, 0.0],
                texcoords: vec![0.25, 0.2],
                indices: vec![0],
                ..Default::default()
            },
            "point".to_string(),
        );
        let mesh = mesh_from_obj(model).unwrap();
        assert_eq!(mesh.tex_coords[0].x, 0.25);
        assert!((mesh.tex_coords[0].y - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let model = tobj::Model::new(tobj::Mesh::default(), "empty".to_string());
        assert!(matches!(
            mesh_from_obj(model),
            Err(ResourceError::NoPositionData(name)) if name == "empty"
        ));
    }
}
