//! Backend abstraction for the rendering system

use thiserror::Error;

use crate::culling::CullingFrustum;
use crate::foundation::math::Mat4;
use crate::scene::evaluator::EvalError;
use crate::scene::structure::SceneStructure;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Errors surfaced by a rendering backend
#[derive(Error, Debug)]
pub enum RenderError {
    /// Scene resources could not be uploaded
    #[error("failed to upload scene resources: {0}")]
    Upload(String),

    /// A frame could not be recorded or presented
    #[error("failed to submit frame: {0}")]
    Submit(String),
}

/// Layout of one vertex attribute inside a mesh's vertex buffer
#[derive(Debug, Clone)]
pub struct AttributeLayout {
    /// Attribute name (`POSITION`, `NORMAL`, ...)
    pub name: String,
    /// Byte offset within a vertex record
    pub offset: u32,
    /// Element format tag
    pub format: String,
}

/// Everything the backend needs to upload one mesh
#[derive(Debug, Clone)]
pub struct MeshPayload {
    /// Vertex buffer source name
    pub source: String,
    /// Vertex count
    pub vertex_count: u32,
    /// Byte stride between vertex records
    pub stride: u32,
    /// Attribute layouts in positional order
    pub attributes: Vec<AttributeLayout>,
    /// Number of instances of this mesh in the evaluated scene
    pub instance_count: u32,
}

impl MeshPayload {
    /// Extract upload payloads for every instanced mesh, in render-list order
    pub fn collect(structure: &SceneStructure) -> Result<Vec<Self>, EvalError> {
        let mut payloads = Vec::with_capacity(structure.meshes.len());
        for info in &structure.meshes {
            let mesh = structure.mesh(info.mesh_id)?;
            let position = mesh.position_attribute();
            payloads.push(Self {
                source: position.src.clone(),
                vertex_count: mesh.count,
                stride: position.stride,
                attributes: mesh
                    .attributes
                    .iter()
                    .map(|attribute| AttributeLayout {
                        name: attribute.name.clone(),
                        offset: attribute.offset,
                        format: attribute.format.clone(),
                    })
                    .collect(),
                instance_count: info.transforms.len() as u32,
            });
        }
        Ok(payloads)
    }
}

/// One frame's worth of flattened render data
#[derive(Debug)]
pub struct FrameSubmission<'a> {
    /// Instance world transforms, flattened in render-list order
    pub instance_transforms: &'a [Mat4],
    /// Per-instance culling verdicts, parallel to `instance_transforms`
    pub visibility: &'a [bool],
    /// World-to-view matrix
    pub view: Mat4,
    /// Projection matrix
    pub projection: Mat4,
}

/// Rendering backend interface
pub trait RenderBackend {
    /// Upload the scene's mesh resources
    fn load_scene(&mut self, meshes: &[MeshPayload]) -> BackendResult<()>;

    /// Install the frustum used for per-instance culling
    fn set_culling_frustum(&mut self, frustum: CullingFrustum);

    /// Record and present one frame
    fn submit_frame(&mut self, frame: &FrameSubmission<'_>) -> BackendResult<()>;

    /// Block until the device finished all in-flight work
    fn wait_idle(&self) -> BackendResult<()>;
}

/// Backend that records submissions without a GPU; used by tests and the
/// headless viewer
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    /// Meshes uploaded by the last `load_scene`
    pub meshes: Vec<MeshPayload>,
    /// Frustum installed by the last `set_culling_frustum`
    pub frustum: Option<CullingFrustum>,
    /// Number of frames submitted
    pub frames_submitted: u64,
    /// Visible-instance count of the last submitted frame
    pub last_visible: usize,
}

impl HeadlessBackend {
    /// Create an empty recording backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for HeadlessBackend {
    fn load_scene(&mut self, meshes: &[MeshPayload]) -> BackendResult<()> {
        self.meshes = meshes.to_vec();
        log::info!("loaded {} meshes into headless backend", meshes.len());
        Ok(())
    }

    fn set_culling_frustum(&mut self, frustum: CullingFrustum) {
        self.frustum = Some(frustum);
    }

    fn submit_frame(&mut self, frame: &FrameSubmission<'_>) -> BackendResult<()> {
        if frame.instance_transforms.len() != frame.visibility.len() {
            return Err(RenderError::Submit(format!(
                "visibility list length {} does not match {} instances",
                frame.visibility.len(),
                frame.instance_transforms.len()
            )));
        }
        self.frames_submitted += 1;
        self.last_visible = frame.visibility.iter().filter(|visible| **visible).count();
        log::trace!(
            "frame {}: {}/{} instances visible",
            self.frames_submitted,
            self.last_visible,
            frame.visibility.len()
        );
        Ok(())
    }

    fn wait_idle(&self) -> BackendResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryTextureWriter;
    use crate::scene::evaluator::evaluate;
    use crate::scene::parser::SceneParser;

    #[test]
    fn test_payload_collection_follows_render_list() {
        let text = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[2,3]},
{"type":"NODE","name":"a","translation":[1,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"mesh":4},
{"type":"NODE","name":"b","translation":[2,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"mesh":4},
{"type":"MESH","name":"cube","topology":"TRIANGLE_LIST","count":36,"attributes":{"POSITION":{"src":"cube.b72","offset":0,"stride":28,"format":"R32G32B32_SFLOAT"},"NORMAL":{"src":"cube.b72","offset":12,"stride":28,"format":"R32G32B32_SFLOAT"},"COLOR":{"src":"cube.b72","offset":24,"stride":28,"format":"R8G8B8A8_UNORM"}}}
]"#;
        let mut writer = MemoryTextureWriter::default();
        let mut structure = SceneParser::from_bytes(text.as_bytes().to_vec())
            .parse_structure(&mut writer)
            .unwrap();
        evaluate(&mut structure, 0.0).unwrap();

        let payloads = MeshPayload::collect(&structure).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].source, "cube.b72");
        assert_eq!(payloads[0].instance_count, 2);
        assert_eq!(payloads[0].attributes.len(), 3);
        assert_eq!(payloads[0].attributes[0].name, "POSITION");
    }

    #[test]
    fn test_headless_backend_counts_visible_instances() {
        let mut backend = HeadlessBackend::new();
        let transforms = [Mat4::identity(), Mat4::identity(), Mat4::identity()];
        let visibility = [true, false, true];
        backend
            .submit_frame(&FrameSubmission {
                instance_transforms: &transforms,
                visibility: &visibility,
                view: Mat4::identity(),
                projection: Mat4::identity(),
            })
            .unwrap();
        assert_eq!(backend.frames_submitted, 1);
        assert_eq!(backend.last_visible, 2);
    }

    #[test]
    fn test_mismatched_visibility_is_rejected() {
        let mut backend = HeadlessBackend::new();
        let transforms = [Mat4::identity()];
        let result = backend.submit_frame(&FrameSubmission {
            instance_transforms: &transforms,
            visibility: &[],
            view: Mat4::identity(),
            projection: Mat4::identity(),
        });
        assert!(matches!(result, Err(RenderError::Submit(_))));
    }
}
