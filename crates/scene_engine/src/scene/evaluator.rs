//! Scene graph evaluator
//!
//! Walks the node hierarchy from the scene roots once per frame, composes
//! hierarchical transforms, applies animation overrides, and rebuilds the
//! structure's flattened render lists. Reference errors surface here:
//! a dangling or wrongly-typed id is fatal at evaluation time.

use thiserror::Error;

use crate::culling::CullingFrustum;
use crate::foundation::math::{Mat4, Quat, Quaternion, Transform};
use crate::scene::animation::{self, DriverValue};
use crate::scene::free_camera::FreeCamera;
use crate::scene::objects::{Channel, ObjectId, ObjectKind};
use crate::scene::structure::{CameraRenderInfo, MeshRenderInfo, SceneStructure};

/// Fatal evaluation and camera-lookup errors
#[derive(Error, Debug)]
pub enum EvalError {
    /// A cross-reference id outside the object list
    #[error("reference to object {id} is out of range")]
    DanglingReference {
        /// Offending id
        id: ObjectId,
    },

    /// A cross-reference id resolving to the wrong object kind
    #[error("object {id} is a {found}, expected a {expected}")]
    ReferenceKind {
        /// Offending id
        id: ObjectId,
        /// Kind required by the referencing field
        expected: ObjectKind,
        /// Kind actually found at that id
        found: ObjectKind,
    },

    /// A node reachable from itself through the child lists
    #[error("node {node} is part of a hierarchy cycle")]
    CyclicHierarchy {
        /// Node revisited on the current traversal path
        node: ObjectId,
    },

    /// The requested render camera is not present in the scene
    #[error("camera '{name}' does not exist")]
    CameraNotFound {
        /// Requested camera name
        name: String,
    },

    /// A camera world transform that cannot be inverted into a view matrix
    #[error("camera '{name}' has a non-invertible world transform")]
    CameraNotInvertible {
        /// Offending camera name
        name: String,
    },
}

#[derive(Default)]
struct RenderLists {
    meshes: Vec<MeshRenderInfo>,
    cameras: Vec<CameraRenderInfo>,
    environment: Option<ObjectId>,
}

/// Evaluate the scene graph at `time`, replacing the structure's derived
/// render lists
///
/// Traversal is depth-first with children in declared order, which fixes the
/// instance-append order. Driver overrides apply only when `time > 0`.
pub fn evaluate(structure: &mut SceneStructure, time: f32) -> Result<(), EvalError> {
    let mut lists = RenderLists::default();
    let roots = structure.scene.roots.clone();
    let mut path = Vec::new();
    for root in roots {
        visit(structure, root, &Mat4::identity(), &mut path, time, &mut lists)?;
    }

    structure.meshes = lists.meshes;
    structure.cameras = lists.cameras;
    structure.environment = lists.environment;
    Ok(())
}

fn visit(
    structure: &SceneStructure,
    node_id: ObjectId,
    parent: &Mat4,
    path: &mut Vec<ObjectId>,
    time: f32,
    lists: &mut RenderLists,
) -> Result<(), EvalError> {
    // A node may legitimately appear under several parents (instancing);
    // only a node on its own ancestor path is a cycle.
    if path.contains(&node_id) {
        return Err(EvalError::CyclicHierarchy { node: node_id });
    }
    let node = structure.node(node_id)?;

    let mut translation = node.translation;
    let mut rotation = node.rotation;
    let mut scale = node.scale;
    if time > 0.0 {
        for driver in structure.drivers.iter().filter(|d| d.node == node_id) {
            match (driver.channel, animation::sample(driver, time)) {
                (Channel::Translation, DriverValue::Vec3(value)) => translation = value,
                (Channel::Scale, DriverValue::Vec3(value)) => scale = value,
                (Channel::Rotation, DriverValue::Quat(value)) => rotation = value,
                _ => unreachable!("driver value arity always matches its channel"),
            }
        }
    }

    let local = Transform::new(translation, quat_from_xyzw(rotation), scale).to_matrix();
    let world = parent * local;

    if let Some(mesh_id) = node.mesh {
        // Type-check the reference even when the instance list already
        // exists for this mesh.
        structure.mesh(mesh_id)?;
        match lists.meshes.iter_mut().find(|info| info.mesh_id == mesh_id) {
            Some(info) => info.transforms.push(world),
            None => lists.meshes.push(MeshRenderInfo {
                mesh_id,
                transforms: vec![world],
            }),
        }
    }
    if let Some(camera_id) = node.camera {
        structure.camera(camera_id)?;
        lists.cameras.push(CameraRenderInfo {
            camera_id,
            transform: world,
        });
    }
    if let Some(environment_id) = node.environment {
        structure.environment_object(environment_id)?;
        lists.environment = Some(environment_id);
    }

    path.push(node_id);
    for &child in &node.children {
        visit(structure, child, &world, path, time, lists)?;
    }
    path.pop();
    Ok(())
}

/// Build a rotation quaternion from x, y, z, w storage order
fn quat_from_xyzw(q: [f32; 4]) -> Quat {
    Quat::new_normalize(Quaternion::new(q[3], q[0], q[1], q[2]))
}

/// View, projection and culling frustum of the active camera
#[derive(Debug, Clone)]
pub struct ResolvedView {
    /// World-to-view matrix
    pub view: Mat4,
    /// Projection matrix (clip-space Y already inverted)
    pub projection: Mat4,
    /// Culling frustum matching the projection
    pub frustum: CullingFrustum,
}

/// Resolve the camera to render with
///
/// [`FreeCamera::NAME`] selects the user-controlled free-fly camera, whose
/// view, projection and culling bounds come from the controller state rather
/// than scene data. Any other name is matched against the evaluated camera
/// instances; when several nodes reference the same camera, the last
/// traversed transform wins.
pub fn resolve_camera(
    structure: &SceneStructure,
    name: &str,
    free_camera: &FreeCamera,
) -> Result<ResolvedView, EvalError> {
    if name == FreeCamera::NAME {
        let perspective = free_camera.perspective();
        return Ok(ResolvedView {
            view: free_camera.view_matrix(),
            projection: perspective.projection_matrix(),
            frustum: CullingFrustum::from_perspective(&perspective),
        });
    }

    let mut matched = None;
    for info in &structure.cameras {
        let camera = structure.camera(info.camera_id)?;
        if camera.name == name {
            matched = Some((camera, info.transform));
        }
    }
    let (camera, transform) = matched.ok_or_else(|| EvalError::CameraNotFound {
        name: name.to_string(),
    })?;

    let view = transform
        .try_inverse()
        .ok_or_else(|| EvalError::CameraNotInvertible {
            name: name.to_string(),
        })?;
    Ok(ResolvedView {
        view,
        projection: camera.perspective.projection_matrix(),
        frustum: CullingFrustum::from_perspective(&camera.perspective),
    })
}

/// Cycle to another scene camera relative to `current`
///
/// `step` of 1 selects the next camera in traversal order, -1 the previous
/// one, wrapping around. Returns `None` when the scene has no cameras.
pub fn cycle_camera(
    structure: &SceneStructure,
    current: &str,
    step: i32,
) -> Result<Option<String>, EvalError> {
    if structure.cameras.is_empty() {
        return Ok(None);
    }
    let mut names = Vec::with_capacity(structure.cameras.len());
    for info in &structure.cameras {
        names.push(structure.camera(info.camera_id)?.name.clone());
    }

    let next = match names.iter().position(|name| name == current) {
        Some(index) => {
            (index as i32 + step).rem_euclid(names.len() as i32) as usize
        }
        // Coming from the free camera (or an unknown name): enter the list
        // at whichever end matches the direction.
        None if step >= 0 => 0,
        None => names.len() - 1,
    };
    Ok(Some(names[next].clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryTextureWriter;
    use crate::scene::parser::SceneParser;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn parse(text: &str) -> SceneStructure {
        let mut writer = MemoryTextureWriter::default();
        SceneParser::from_bytes(text.as_bytes().to_vec())
            .parse_structure(&mut writer)
            .unwrap()
    }

    const HIERARCHY: &str = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[2]},
{"type":"NODE","name":"root","translation":[1,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"children":[3]},
{"type":"NODE","name":"child","translation":[0,0,0],"rotation":[0,0,0,1],"scale":[2,2,2],"mesh":4},
{"type":"MESH","name":"cube","topology":"TRIANGLE_LIST","count":3,"attributes":{"POSITION":{"src":"cube.b72","offset":0,"stride":28,"format":"R32G32B32_SFLOAT"},"NORMAL":{"src":"cube.b72","offset":12,"stride":28,"format":"R32G32B32_SFLOAT"},"COLOR":{"src":"cube.b72","offset":24,"stride":28,"format":"R8G8B8A8_UNORM"}}}
]"#;

    #[test]
    fn test_transform_composition_through_hierarchy() {
        let mut structure = parse(HIERARCHY);
        evaluate(&mut structure, 0.0).unwrap();

        assert_eq!(structure.meshes.len(), 1);
        let world = structure.meshes[0].transforms[0];

        let origin = world.transform_point(&Point3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(origin.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1e-6);

        let unit_x = world.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(unit_x.x, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_reevaluation_is_idempotent() {
        let mut structure = parse(HIERARCHY);
        evaluate(&mut structure, 0.0).unwrap();
        let first: Vec<Mat4> = structure.meshes[0].transforms.clone();
        evaluate(&mut structure, 0.0).unwrap();
        assert_eq!(structure.meshes.len(), 1);
        assert_eq!(structure.meshes[0].transforms, first);
    }

    #[test]
    fn test_nodes_sharing_a_mesh_merge_into_one_entry() {
        let text = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[2,3]},
{"type":"NODE","name":"a","translation":[1,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"mesh":4},
{"type":"NODE","name":"b","translation":[-1,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"mesh":4},
{"type":"MESH","name":"cube","topology":"TRIANGLE_LIST","count":3,"attributes":{"POSITION":{"src":"cube.b72","offset":0,"stride":28,"format":"R32G32B32_SFLOAT"},"NORMAL":{"src":"cube.b72","offset":12,"stride":28,"format":"R32G32B32_SFLOAT"},"COLOR":{"src":"cube.b72","offset":24,"stride":28,"format":"R8G8B8A8_UNORM"}}}
]"#;
        let mut structure = parse(text);
        evaluate(&mut structure, 0.0).unwrap();

        assert_eq!(structure.meshes.len(), 1);
        let transforms = &structure.meshes[0].transforms;
        assert_eq!(transforms.len(), 2);
        // Traversal-encounter order: node "a" first.
        assert_relative_eq!(transforms[0][(0, 3)], 1.0, epsilon = 1e-6);
        assert_relative_eq!(transforms[1][(0, 3)], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_driver_overrides_translation_only_after_time_zero() {
        let text = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[2]},
{"type":"NODE","name":"n","translation":[5,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"mesh":3},
{"type":"MESH","name":"cube","topology":"TRIANGLE_LIST","count":3,"attributes":{"POSITION":{"src":"cube.b72","offset":0,"stride":28,"format":"R32G32B32_SFLOAT"},"NORMAL":{"src":"cube.b72","offset":12,"stride":28,"format":"R32G32B32_SFLOAT"},"COLOR":{"src":"cube.b72","offset":24,"stride":28,"format":"R8G8B8A8_UNORM"}}},
{"type":"DRIVER","name":"slide","node":2,"channel":"translation","times":[0,1],"values":[0,0,0,0,2,0]}
]"#;
        let mut structure = parse(text);

        evaluate(&mut structure, 0.0).unwrap();
        assert_relative_eq!(structure.meshes[0].transforms[0][(0, 3)], 5.0, epsilon = 1e-6);

        evaluate(&mut structure, 1.0).unwrap();
        let world = structure.meshes[0].transforms[0];
        assert_relative_eq!(world[(0, 3)], 0.0, epsilon = 1e-6);
        assert_relative_eq!(world[(1, 3)], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_last_camera_reference_wins() {
        let text = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[2,3]},
{"type":"NODE","name":"a","translation":[1,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"camera":4},
{"type":"NODE","name":"b","translation":[2,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"camera":4},
{"type":"CAMERA","name":"main","perspective":{"aspect":1.0,"vfov":1.0,"near":0.1,"far":10}}
]"#;
        let mut structure = parse(text);
        evaluate(&mut structure, 0.0).unwrap();
        assert_eq!(structure.cameras.len(), 2);

        let resolved =
            resolve_camera(&structure, "main", &FreeCamera::new(1.0)).unwrap();
        // The view matrix inverts node "b"'s transform.
        assert_relative_eq!(resolved.view[(0, 3)], -2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_camera_is_fatal() {
        let mut structure = parse(HIERARCHY);
        evaluate(&mut structure, 0.0).unwrap();
        assert!(matches!(
            resolve_camera(&structure, "nope", &FreeCamera::new(1.0)),
            Err(EvalError::CameraNotFound { .. })
        ));
    }

    #[test]
    fn test_free_camera_bypasses_scene_lookup() {
        let mut structure = parse(HIERARCHY);
        evaluate(&mut structure, 0.0).unwrap();
        let resolved =
            resolve_camera(&structure, FreeCamera::NAME, &FreeCamera::new(1.5)).unwrap();
        assert!(resolved.frustum.near_plane < 0.0);
    }

    #[test]
    fn test_cycle_in_hierarchy_is_fatal() {
        let text = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[2]},
{"type":"NODE","name":"a","translation":[0,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"children":[3]},
{"type":"NODE","name":"b","translation":[0,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"children":[2]}
]"#;
        let mut structure = parse(text);
        assert!(matches!(
            evaluate(&mut structure, 0.0),
            Err(EvalError::CyclicHierarchy { .. })
        ));
    }

    #[test]
    fn test_dangling_and_mistyped_references_are_fatal() {
        let dangling = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[9]}
]"#;
        let mut structure = parse(dangling);
        assert!(matches!(
            evaluate(&mut structure, 0.0),
            Err(EvalError::DanglingReference { id: 9 })
        ));

        let mistyped = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[2]},
{"type":"NODE","name":"n","translation":[0,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"mesh":1}
]"#;
        let mut structure = parse(mistyped);
        assert!(matches!(
            evaluate(&mut structure, 0.0),
            Err(EvalError::ReferenceKind {
                id: 1,
                expected: ObjectKind::Mesh,
                found: ObjectKind::Scene,
            })
        ));
    }

    #[test]
    fn test_environment_reference_is_captured() {
        let text = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[3]},
{"type":"ENVIRONMENT","name":"sky","radiance":{"src":"sky.png","type":"cube","format":"rgbe"}},
{"type":"NODE","name":"world","environment":2}
]"#;
        let mut structure = parse(text);
        evaluate(&mut structure, 0.0).unwrap();
        assert_eq!(structure.environment, Some(2));
    }

    #[test]
    fn test_camera_cycling_wraps() {
        let text = r#"["s72-v1",
{"type":"SCENE","name":"s","roots":[2,3]},
{"type":"NODE","name":"a","translation":[0,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"camera":4},
{"type":"NODE","name":"b","translation":[0,0,0],"rotation":[0,0,0,1],"scale":[1,1,1],"camera":5},
{"type":"CAMERA","name":"one","perspective":{"aspect":1.0,"vfov":1.0,"near":0.1,"far":10}},
{"type":"CAMERA","name":"two","perspective":{"aspect":1.0,"vfov":1.0,"near":0.1,"far":10}}
]"#;
        let mut structure = parse(text);
        evaluate(&mut structure, 0.0).unwrap();

        assert_eq!(cycle_camera(&structure, "one", 1).unwrap().as_deref(), Some("two"));
        assert_eq!(cycle_camera(&structure, "two", 1).unwrap().as_deref(), Some("one"));
        assert_eq!(cycle_camera(&structure, "one", -1).unwrap().as_deref(), Some("two"));
        assert_eq!(
            cycle_camera(&structure, FreeCamera::NAME, 1).unwrap().as_deref(),
            Some("one")
        );
    }
}
