//! Scene loading and evaluation
//!
//! The pipeline through this module: file bytes go into the [`parser`],
//! which yields a [`SceneStructure`] holding the typed object graph. Each
//! frame, the [`evaluator`] walks the node hierarchy at the current
//! animation time (sampling [`animation`] drivers) and rebuilds the
//! structure's flattened render lists, which feed culling and the render
//! backend.

pub mod animation;
pub mod evaluator;
pub mod free_camera;
pub mod objects;
pub mod parser;
pub mod structure;

pub use animation::{sample, DriverValue};
pub use evaluator::{cycle_camera, evaluate, resolve_camera, EvalError, ResolvedView};
pub use free_camera::FreeCamera;
pub use objects::{
    Camera, Channel, Driver, Environment, Interpolation, Material, Mesh, MeshAttribute, Node,
    ObjectId, ObjectKind, Perspective, Scene, SceneObject, ShadingModel, TextureRef,
};
pub use parser::{ParseError, SceneParser};
pub use structure::{CameraRenderInfo, MeshRenderInfo, SceneStructure};
