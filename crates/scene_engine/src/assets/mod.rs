//! Asset loading helpers
//!
//! Reads scene files and the raw vertex buffers they reference, synthesizes
//! constant-parameter textures, and builds the per-mesh object-space bounds
//! used by the culling engine.

mod texture_synth;

pub use texture_synth::{DiskTextureWriter, MemoryTextureWriter, TextureWriter};

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::culling::{Aabb, CullingError};
use crate::scene::{ObjectId, SceneObject, SceneStructure};

/// Errors raised while loading or writing asset files
#[derive(Error, Debug)]
pub enum AssetError {
    /// A referenced file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed to load
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A synthesized texture could not be written
    #[error("failed to write texture {path}: {source}")]
    ImageWrite {
        /// Path that failed to write
        path: String,
        /// Underlying image encoding error
        #[source]
        source: image::ImageError,
    },

    /// A vertex buffer has a layout the bounds builder cannot consume
    #[error(transparent)]
    VertexLayout(#[from] CullingError),
}

/// Read a whole file into memory
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load the vertex buffer `src` referenced by a mesh, relative to `scene_dir`
pub fn load_vertex_buffer(scene_dir: &Path, src: &str) -> Result<Vec<u8>, AssetError> {
    read_bytes(&scene_dir.join(src))
}

/// Build object-space bounding boxes for every mesh in the structure
///
/// Runs once at load time; the boxes are immutable afterwards. Vertex
/// buffers shared between meshes are read once.
pub fn build_mesh_bounds(
    structure: &SceneStructure,
    scene_dir: &Path,
) -> Result<HashMap<ObjectId, Aabb>, AssetError> {
    let mut buffers: HashMap<&str, Vec<u8>> = HashMap::new();
    let mut bounds = HashMap::new();

    for object in &structure.objects {
        let SceneObject::Mesh(mesh) = object else {
            continue;
        };
        let position = mesh.position_attribute();
        let normal = mesh.normal_attribute();

        if !buffers.contains_key(position.src.as_str()) {
            let bytes = load_vertex_buffer(scene_dir, &position.src)?;
            buffers.insert(position.src.as_str(), bytes);
        }
        let bytes = &buffers[position.src.as_str()];

        let aabb =
            Aabb::from_vertex_bytes(bytes, position.stride, position.offset, normal.offset)?;
        log::debug!(
            "mesh '{}' bounds: min {:?} max {:?}",
            mesh.name,
            aabb.min,
            aabb.max
        );
        bounds.insert(mesh.id, aabb);
    }

    Ok(bounds)
}
