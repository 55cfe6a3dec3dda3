//! Renderer collaborator boundary
//!
//! The engine core stops at this interface: it hands the backend per-mesh
//! vertex layouts at load time and flattened instance data every frame. The
//! GPU side (device, swapchain, pipelines, buffer upload) lives behind the
//! [`RenderBackend`] trait.

mod backend;

pub use backend::{
    AttributeLayout, BackendResult, FrameSubmission, HeadlessBackend, MeshPayload, RenderBackend,
    RenderError,
};
