//! # Scene Engine
//!
//! Loads a declarative 3D scene description, evaluates the time-varying
//! scene graph into flattened per-object world transforms, and culls
//! invisible instances before handing them to a rasterizing backend.
//!
//! ## Pipeline
//!
//! ```text
//! file bytes -> parser -> object graph
//!     -> evaluator (per frame, animation time + camera)
//!     -> flattened instance list
//!     -> culling (per instance)
//!     -> render backend
//! ```
//!
//! Everything runs single-threaded and synchronously: parsing once at load,
//! evaluation and culling once per rendered frame on the thread driving the
//! render loop. The object graph is immutable after load; the per-frame
//! render lists are cleared and rebuilt by every evaluation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scene_path = Path::new("demo.s72");
//!     let mut textures = DiskTextureWriter::new(scene_path.parent().unwrap());
//!     let mut structure = SceneParser::from_file(scene_path)?.parse_structure(&mut textures)?;
//!
//!     let free_camera = FreeCamera::new(800.0 / 600.0);
//!     evaluate(&mut structure, 0.0)?;
//!     let resolved = resolve_camera(&structure, FreeCamera::NAME, &free_camera)?;
//!     for info in &structure.meshes {
//!         println!("mesh {} has {} instances", info.mesh_id, info.transforms.len());
//!     }
//!     # let _ = resolved;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod culling;
pub mod foundation;
pub mod input;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{build_mesh_bounds, DiskTextureWriter, TextureWriter},
        config::ViewerConfig,
        culling::{is_visible, Aabb, CullingFrustum},
        foundation::{
            logging,
            math::{Mat4, Quat, Transform, Vec3, Vec4},
            time::AnimationClock,
        },
        input::InputSnapshot,
        render::{FrameSubmission, HeadlessBackend, MeshPayload, RenderBackend},
        scene::{
            cycle_camera, evaluate, resolve_camera, FreeCamera, SceneParser, SceneStructure,
        },
    };
}
