use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

fn main() {
    let manifest_dir = PathBuf::from(std::env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default());
    let shader_dir = manifest_dir.join("../../shaders");

    println!("cargo:rerun-if-changed={}", shader_dir.display());
    println!("cargo:rerun-if-changed=build.rs");

    if !shader_dir.is_dir() {
        println!(
            "cargo:warning=Shader directory {} not found, skipping shader compilation",
            shader_dir.display()
        );
        return;
    }

    // Only direct children; compiled binaries sit next to their sources.
    let sources: Vec<PathBuf> = WalkDir::new(&shader_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| is_shader_source(path))
        .collect();

    for source in sources {
        println!("cargo:rerun-if-changed={}", source.display());

        let output = spirv_output(&source);
        match Command::new("glslc").arg(&source).arg("-o").arg(&output).status() {
            Ok(status) if status.success() => {}
            Ok(status) => panic!(
                "Failed to compile shader {}. glslc exited with code {:?}",
                source.display(),
                status.code()
            ),
            Err(e) => {
                println!(
                    "cargo:warning=glslc not available ({}), keeping existing SPIR-V for {}",
                    e,
                    source.display()
                );
                return;
            }
        }
    }
}

fn is_shader_source(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("vert" | "frag")
    )
}

/// `shader.vert` -> `shader.vert.spv`
fn spirv_output(source: &Path) -> PathBuf {
    let mut name = source.file_name().unwrap_or_default().to_os_string();
    name.push(".spv");
    source.with_file_name(name)
}
