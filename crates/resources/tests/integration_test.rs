//! Integration tests for model and image loading.
//!
//! Each test writes its assets into a fresh directory under the system temp dir.

use std::fs;
use std::path::PathBuf;

use course_resources::{ImageData, ModelData, ResourceError};
use glam::{Vec2, Vec3};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "course-resources-{}-{}",
        name,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

const QUAD_OBJ: &str = "\
mtllib quad.mtl
o textured_quad
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
usemtl textured
f 1/1 2/2 3/3 4/4
o plain_triangle
v 0.0 0.0 1.0
v 1.0 0.0 1.0
v 0.0 1.0 1.0
usemtl plain
f 5 6 7
";

const QUAD_MTL: &str = "\
newmtl textured
Kd 1.0 1.0 1.0
map_Kd textures\\heli\\quad.png

newmtl plain
Kd 0.5 0.5 0.5
";

#[test]
fn test_load_obj_with_materials() {
    let dir = scratch_dir("materials");
    fs::write(dir.join("quad.obj"), QUAD_OBJ).unwrap();
    fs::write(dir.join("quad.mtl"), QUAD_MTL).unwrap();

    let model = ModelData::load(&dir.join("quad.obj")).expect("Failed to load OBJ");

    assert_eq!(model.meshes.len(), 2);
    assert_eq!(model.texture_names.len(), 2);

    let quad = &model.meshes[0];
    assert_eq!(quad.positions.len(), 4);
    assert_eq!(quad.tex_coords.len(), 4);
    assert_eq!(quad.indices.len(), 6, "Quad should triangulate into two triangles");
    assert!(quad.indices.iter().all(|&i| (i as usize) < quad.positions.len()));
    assert_eq!(model.texture_name(quad.material_id), Some("quad.png"));

    // vt (0, 0) on the bottom-left corner comes back flipped to (0, 1).
    let corner = quad
        .positions
        .iter()
        .position(|&p| p == Vec3::new(-1.0, -1.0, 0.0))
        .expect("Corner vertex missing");
    assert_eq!(quad.tex_coords[corner], Vec2::new(0.0, 1.0));

    let triangle = &model.meshes[1];
    assert_eq!(triangle.indices.len(), 3);
    assert_eq!(triangle.tex_coords, vec![Vec2::ZERO; 3]);
    assert_eq!(model.texture_name(triangle.material_id), None);
    assert_eq!(model.total_index_count(), 9);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_material_library_is_not_fatal() {
    let dir = scratch_dir("no-mtl");
    fs::write(dir.join("quad.obj"), QUAD_OBJ).unwrap();

    let model = ModelData::load(&dir.join("quad.obj")).expect("Missing MTL should not fail");

    assert_eq!(model.meshes.len(), 2);
    assert!(model.texture_names.is_empty());
    for mesh in &model.meshes {
        assert_eq!(model.texture_name(mesh.material_id), None);
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_obj_file() {
    let result = ModelData::load(&PathBuf::from("no/such/model.obj"));
    assert!(matches!(result, Err(ResourceError::FileNotFound(_))));
}

#[test]
fn test_decode_png_to_rgba8() {
    let dir = scratch_dir("png");
    let path = dir.join("checker.png");

    let mut source = image::RgbImage::new(2, 1);
    source.put_pixel(0, 0, image::Rgb([255, 0, 0]));
    source.put_pixel(1, 0, image::Rgb([0, 0, 255]));
    source.save(&path).expect("Failed to write PNG");

    let decoded = ImageData::load(&path).expect("Failed to decode PNG");
    assert_eq!((decoded.width, decoded.height), (2, 1));
    assert_eq!(decoded.byte_len(), 8);
    assert_eq!(decoded.pixels, vec![255, 0, 0, 255, 0, 0, 255, 255]);

    let _ = fs::remove_dir_all(&dir);
}
