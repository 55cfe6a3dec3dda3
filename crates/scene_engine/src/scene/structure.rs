//! Scene structure: the static object graph plus per-frame render lists
//!
//! The object graph is built once by the parser and is immutable afterwards.
//! The derived lists (`meshes`, `cameras`, `environment`) carry no identity
//! across frames: every evaluation clears and rebuilds them.

use std::collections::HashMap;

use crate::foundation::math::Mat4;
use crate::scene::evaluator::EvalError;
use crate::scene::objects::{
    Camera, Driver, Environment, Material, Mesh, Node, ObjectId, ObjectKind, Scene, SceneObject,
};
use crate::scene::parser::ParseError;

/// A mesh plus the world transforms of every node instancing it this frame
///
/// All nodes referencing the same mesh id contribute to one entry, in
/// traversal-encounter order.
#[derive(Debug, Clone)]
pub struct MeshRenderInfo {
    /// Instanced mesh id
    pub mesh_id: ObjectId,
    /// One world transform per instance, in traversal order
    pub transforms: Vec<Mat4>,
}

/// A camera plus its world transform this frame
///
/// Cameras are not instanced: when several nodes reference the same camera
/// id, each traversal appends its own entry and name lookup keeps the last.
#[derive(Debug, Clone)]
pub struct CameraRenderInfo {
    /// Referenced camera id
    pub camera_id: ObjectId,
    /// World transform of the referencing node
    pub transform: Mat4,
}

/// Parsed object graph together with the evaluated per-frame render lists
#[derive(Debug, Clone)]
pub struct SceneStructure {
    /// All parsed objects; `objects[id - 1]` resolves an id
    pub objects: Vec<SceneObject>,
    /// The scene record naming the root nodes
    pub scene: Scene,
    /// All animation drivers in declaration order
    pub drivers: Vec<Driver>,
    /// Material id to texture files needed at resource-load time
    pub material_textures: HashMap<ObjectId, Vec<String>>,

    /// Per-frame mesh instances, rebuilt by every evaluation
    pub meshes: Vec<MeshRenderInfo>,
    /// Per-frame camera placements, rebuilt by every evaluation
    pub cameras: Vec<CameraRenderInfo>,
    /// Environment referenced by a traversed node this frame, if any
    pub environment: Option<ObjectId>,
}

impl SceneStructure {
    /// Assemble a structure from the parser's object list
    pub(crate) fn from_objects(
        objects: Vec<SceneObject>,
        material_textures: HashMap<ObjectId, Vec<String>>,
    ) -> Result<Self, ParseError> {
        let mut scene = None;
        let mut drivers = Vec::new();
        for object in &objects {
            match object {
                SceneObject::Scene(record) => scene = Some(record.clone()),
                SceneObject::Driver(driver) => drivers.push(driver.clone()),
                _ => {}
            }
        }
        let scene = scene.ok_or(ParseError::MissingScene)?;

        Ok(Self {
            objects,
            scene,
            drivers,
            material_textures,
            meshes: Vec::new(),
            cameras: Vec::new(),
            environment: None,
        })
    }

    /// Resolve an id to its object, failing on out-of-range references
    pub fn object(&self, id: ObjectId) -> Result<&SceneObject, EvalError> {
        if id == 0 || id as usize > self.objects.len() {
            return Err(EvalError::DanglingReference { id });
        }
        Ok(&self.objects[(id - 1) as usize])
    }

    /// Resolve an id that must reference a node
    pub fn node(&self, id: ObjectId) -> Result<&Node, EvalError> {
        match self.object(id)? {
            SceneObject::Node(node) => Ok(node),
            other => Err(kind_mismatch(id, ObjectKind::Node, other)),
        }
    }

    /// Resolve an id that must reference a mesh
    pub fn mesh(&self, id: ObjectId) -> Result<&Mesh, EvalError> {
        match self.object(id)? {
            SceneObject::Mesh(mesh) => Ok(mesh),
            other => Err(kind_mismatch(id, ObjectKind::Mesh, other)),
        }
    }

    /// Resolve an id that must reference a camera
    pub fn camera(&self, id: ObjectId) -> Result<&Camera, EvalError> {
        match self.object(id)? {
            SceneObject::Camera(camera) => Ok(camera),
            other => Err(kind_mismatch(id, ObjectKind::Camera, other)),
        }
    }

    /// Resolve an id that must reference a material
    pub fn material(&self, id: ObjectId) -> Result<&Material, EvalError> {
        match self.object(id)? {
            SceneObject::Material(material) => Ok(material),
            other => Err(kind_mismatch(id, ObjectKind::Material, other)),
        }
    }

    /// Resolve an id that must reference an environment
    pub fn environment_object(&self, id: ObjectId) -> Result<&Environment, EvalError> {
        match self.object(id)? {
            SceneObject::Environment(environment) => Ok(environment),
            other => Err(kind_mismatch(id, ObjectKind::Environment, other)),
        }
    }
}

fn kind_mismatch(id: ObjectId, expected: ObjectKind, found: &SceneObject) -> EvalError {
    EvalError::ReferenceKind {
        id,
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryTextureWriter;
    use crate::scene::parser::SceneParser;

    #[test]
    fn test_every_reference_round_trips_to_its_id_and_kind() {
        let text = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[2]},
{"type":"NODE","name":"root","translation":[0,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"mesh":4,"children":[3]},
{"type":"NODE","name":"child","translation":[0,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"camera":5,"environment":7},
{"type":"MESH","name":"cube","topology":"TRIANGLE_LIST","count":3,"attributes":{"POSITION":{"src":"cube.b72","offset":0,"stride":28,"format":"R32G32B32_SFLOAT"},"NORMAL":{"src":"cube.b72","offset":12,"stride":28,"format":"R32G32B32_SFLOAT"},"COLOR":{"src":"cube.b72","offset":24,"stride":28,"format":"R8G8B8A8_UNORM"}},"material":6},
{"type":"CAMERA","name":"main","perspective":{"aspect":1.0,"vfov":1.0,"near":0.1,"far":10}},
{"type":"MATERIAL","name":"flat","simple":{}},
{"type":"ENVIRONMENT","name":"sky","radiance":{"src":"sky.png","type":"cube","format":"rgbe"}},
{"type":"DRIVER","name":"d","node":3,"channel":"translation","times":[0],"values":[0,0,0]}
]"#;
        let mut writer = MemoryTextureWriter::default();
        let structure = SceneParser::from_bytes(text.as_bytes().to_vec())
            .parse_structure(&mut writer)
            .unwrap();

        for object in &structure.objects {
            match object {
                SceneObject::Scene(scene) => {
                    for &root in &scene.roots {
                        assert_eq!(structure.node(root).unwrap().id, root);
                    }
                }
                SceneObject::Node(node) => {
                    if let Some(mesh) = node.mesh {
                        assert_eq!(structure.mesh(mesh).unwrap().id, mesh);
                    }
                    if let Some(camera) = node.camera {
                        assert_eq!(structure.camera(camera).unwrap().id, camera);
                    }
                    if let Some(environment) = node.environment {
                        assert_eq!(
                            structure.environment_object(environment).unwrap().id,
                            environment
                        );
                    }
                    for &child in &node.children {
                        assert_eq!(structure.node(child).unwrap().id, child);
                    }
                }
                SceneObject::Mesh(mesh) => {
                    if let Some(material) = mesh.material {
                        assert_eq!(structure.material(material).unwrap().id, material);
                    }
                }
                SceneObject::Driver(driver) => {
                    assert_eq!(structure.node(driver.node).unwrap().id, driver.node);
                }
                _ => {}
            }
        }
    }
}
