//! Typed scene object graph
//!
//! The parser produces an ordered list of [`SceneObject`]s. Object ids are
//! 1-based, dense indices in file declaration order; every cross-reference
//! field stores such an id and resolves as `objects[id - 1]`.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// 1-based object id assigned in file declaration order
pub type ObjectId = u32;

/// One top-level record of the scene description
#[derive(Debug, Clone)]
pub enum SceneObject {
    /// Scene roots record
    Scene(Scene),
    /// Hierarchy node
    Node(Node),
    /// Mesh with vertex attribute layout
    Mesh(Mesh),
    /// Perspective camera
    Camera(Camera),
    /// Keyframe animation channel
    Driver(Driver),
    /// Surface material
    Material(Material),
    /// Environment radiance map
    Environment(Environment),
}

impl SceneObject {
    /// The object's 1-based id
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Scene(o) => o.id,
            Self::Node(o) => o.id,
            Self::Mesh(o) => o.id,
            Self::Camera(o) => o.id,
            Self::Driver(o) => o.id,
            Self::Material(o) => o.id,
            Self::Environment(o) => o.id,
        }
    }

    /// The object's kind, for reference-error reporting
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Scene(_) => ObjectKind::Scene,
            Self::Node(_) => ObjectKind::Node,
            Self::Mesh(_) => ObjectKind::Mesh,
            Self::Camera(_) => ObjectKind::Camera,
            Self::Driver(_) => ObjectKind::Driver,
            Self::Material(_) => ObjectKind::Material,
            Self::Environment(_) => ObjectKind::Environment,
        }
    }
}

/// Discriminator for [`SceneObject`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Scene record
    Scene,
    /// Node record
    Node,
    /// Mesh record
    Mesh,
    /// Camera record
    Camera,
    /// Driver record
    Driver,
    /// Material record
    Material,
    /// Environment record
    Environment,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Scene => "scene",
            Self::Node => "node",
            Self::Mesh => "mesh",
            Self::Camera => "camera",
            Self::Driver => "driver",
            Self::Material => "material",
            Self::Environment => "environment",
        };
        f.write_str(name)
    }
}

/// Scene record: name plus ordered root node ids
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// 1-based object id
    pub id: ObjectId,
    /// Scene name
    pub name: String,
    /// Root node ids in declaration order (traversal order)
    pub roots: Vec<ObjectId>,
}

/// Hierarchy node with a decomposed local transform and optional payloads
#[derive(Debug, Clone)]
pub struct Node {
    /// 1-based object id
    pub id: ObjectId,
    /// Node name
    pub name: String,
    /// Local translation (defaults to zero)
    pub translation: Vec3,
    /// Local rotation quaternion, stored x, y, z, w (defaults to identity)
    pub rotation: [f32; 4],
    /// Local scale (defaults to one)
    pub scale: Vec3,
    /// Referenced mesh id, if any
    pub mesh: Option<ObjectId>,
    /// Referenced camera id, if any
    pub camera: Option<ObjectId>,
    /// Referenced environment id, if any
    pub environment: Option<ObjectId>,
    /// Child node ids in declaration order (traversal order)
    pub children: Vec<ObjectId>,
}

impl Node {
    /// Create a node with identity transform and no payloads
    pub fn new(id: ObjectId, name: String) -> Self {
        Self {
            id,
            name,
            translation: Vec3::zeros(),
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: Vec3::new(1.0, 1.0, 1.0),
            mesh: None,
            camera: None,
            environment: None,
            children: Vec::new(),
        }
    }
}

/// One vertex attribute of a mesh
///
/// Attribute order is fixed and positional: index 0 is always position,
/// index 1 is always normal. Downstream consumers rely on this ordering.
#[derive(Debug, Clone)]
pub struct MeshAttribute {
    /// Attribute name (`POSITION`, `NORMAL`, `TANGENT`, `TEXCOORD`, `COLOR`)
    pub name: String,
    /// Source vertex buffer name
    pub src: String,
    /// Byte offset of the attribute within a vertex record
    pub offset: u32,
    /// Byte stride between vertex records
    pub stride: u32,
    /// Element format tag (e.g. `R32G32B32_SFLOAT`)
    pub format: String,
}

/// Mesh record
#[derive(Debug, Clone)]
pub struct Mesh {
    /// 1-based object id
    pub id: ObjectId,
    /// Mesh name
    pub name: String,
    /// Topology tag (e.g. `TRIANGLE_LIST`)
    pub topology: String,
    /// Vertex count
    pub count: u32,
    /// Vertex attributes in declaration order
    pub attributes: Vec<MeshAttribute>,
    /// Referenced material id, if any
    pub material: Option<ObjectId>,
}

impl Mesh {
    /// The position attribute (always index 0)
    pub fn position_attribute(&self) -> &MeshAttribute {
        &self.attributes[0]
    }

    /// The normal attribute (always index 1)
    pub fn normal_attribute(&self) -> &MeshAttribute {
        &self.attributes[1]
    }
}

/// Perspective projection parameters
#[derive(Debug, Clone, Copy)]
pub struct Perspective {
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Vertical field of view in radians
    pub vfov: f32,
    /// Near plane distance
    pub near: f32,
    /// Far plane distance; infinite when the file omits it
    pub far: f32,
}

impl Perspective {
    /// Half-height of the near plane
    pub fn near_top(&self) -> f32 {
        self.near * (self.vfov * 0.5).tan()
    }

    /// Half-width of the near plane
    pub fn near_right(&self) -> f32 {
        self.near_top() * self.aspect
    }

    /// Projection matrix for these parameters
    ///
    /// The target clip-space convention inverts Y, so the standard
    /// vertical-fov matrix gets its `[1][1]` entry negated after
    /// construction.
    pub fn projection_matrix(&self) -> Mat4 {
        let mut projection = Mat4::perspective(self.vfov, self.aspect, self.near, self.far);
        projection[(1, 1)] = -projection[(1, 1)];
        projection
    }
}

/// Camera record
#[derive(Debug, Clone)]
pub struct Camera {
    /// 1-based object id
    pub id: ObjectId,
    /// Camera name
    pub name: String,
    /// Perspective projection parameters
    pub perspective: Perspective,
}

/// Animated node property selected by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Node translation (3 floats per sample)
    Translation,
    /// Node rotation quaternion (4 floats per sample)
    Rotation,
    /// Node scale (3 floats per sample)
    Scale,
}

impl Channel {
    /// Number of value floats per time sample
    pub fn arity(&self) -> usize {
        match self {
            Self::Translation | Self::Scale => 3,
            Self::Rotation => 4,
        }
    }
}

/// Keyframe interpolation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Hold the previous keyframe's value until the next
    Step,
    /// Component-wise blend between neighbouring keyframes
    #[default]
    Linear,
    /// Spherical quaternion interpolation (rotation channels)
    Slerp,
}

/// Driver record: a keyframe animation channel targeting one node property
#[derive(Debug, Clone)]
pub struct Driver {
    /// 1-based object id
    pub id: ObjectId,
    /// Driver name
    pub name: String,
    /// Target node id
    pub node: ObjectId,
    /// Animated node property
    pub channel: Channel,
    /// Strictly increasing time samples in seconds
    pub times: Vec<f32>,
    /// Flattened value samples, `channel.arity()` floats per time sample
    pub values: Vec<f32>,
    /// Interpolation mode (defaults to linear)
    pub interpolation: Interpolation,
}

/// Reference to a texture image file
#[derive(Debug, Clone)]
pub struct TextureRef {
    /// Image file name, relative to the scene file
    pub src: String,
    /// Optional texture type tag (e.g. `cube`)
    pub kind: Option<String>,
    /// Optional texel format tag (e.g. `rgbe`)
    pub format: Option<String>,
}

impl TextureRef {
    /// Reference a plain 2D texture file
    pub fn plain(src: String) -> Self {
        Self {
            src,
            kind: None,
            format: None,
        }
    }
}

/// Shading model of a material
///
/// Exactly one model is active per material; the renderer uses this
/// discriminator to pick a pipeline. Constant parameters are resolved to
/// synthesized 1x1 textures at parse time, so only texture references remain.
#[derive(Debug, Clone)]
pub enum ShadingModel {
    /// Metallic-roughness PBR
    Pbr {
        /// Albedo texture
        albedo: TextureRef,
        /// Roughness texture
        roughness: TextureRef,
        /// Metalness texture
        metalness: TextureRef,
    },
    /// Diffuse-only shading
    Lambertian {
        /// Albedo texture
        albedo: TextureRef,
    },
    /// Perfect mirror over the environment map
    Mirror,
    /// Environment-lookup shading
    Environment,
    /// Unlit
    Simple,
}

/// Material record
#[derive(Debug, Clone)]
pub struct Material {
    /// 1-based object id
    pub id: ObjectId,
    /// Material name
    pub name: String,
    /// Optional tangent-space normal map
    pub normal_map: Option<TextureRef>,
    /// Optional displacement map
    pub displacement_map: Option<TextureRef>,
    /// Active shading model
    pub model: ShadingModel,
}

/// Environment record: a single radiance texture
#[derive(Debug, Clone)]
pub struct Environment {
    /// 1-based object id
    pub id: ObjectId,
    /// Environment name
    pub name: String,
    /// Radiance (cubemap or equirect) texture
    pub radiance: TextureRef,
}
