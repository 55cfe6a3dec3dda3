//! Scene description parser
//!
//! A cursor-based scanner over the raw scene-file bytes. The file is a
//! textual array of typed records headed by the `"s72-v1"` sentinel. The
//! producer emits fields in canonical order, so each per-type decode routine
//! reads its fields in that fixed order and infers structure from field
//! presence rather than from a general-purpose key-value grammar; material
//! shading blocks are the one ambiguous spot and are disambiguated by the
//! next field name. All errors are fatal: no partial scene is usable.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::assets::{AssetError, TextureWriter};
use crate::foundation::math::Vec3;
use crate::scene::objects::{
    Camera, Channel, Driver, Environment, Interpolation, Material, Mesh, MeshAttribute, Node,
    ObjectId, Perspective, Scene, SceneObject, ShadingModel, TextureRef,
};
use crate::scene::structure::SceneStructure;

/// Required first element of the top-level array
const SCENE_HEADER: &str = "s72-v1";

/// Fatal scene-file decoding errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// The scene file could not be read
    #[error("failed to read scene file {path}: {source}")]
    Io {
        /// Path that failed to load
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cursor advanced past the end of the buffer
    #[error("scene file ended unexpectedly at byte {offset}")]
    UnexpectedEnd {
        /// Byte offset where input ran out
        offset: usize,
    },

    /// A structural token did not match the grammar
    #[error("expected {expected} at byte {offset}, found '{found}'")]
    UnexpectedToken {
        /// Token found in the input
        found: char,
        /// Description of what the grammar required
        expected: &'static str,
        /// Byte offset of the token
        offset: usize,
    },

    /// A field name did not match the canonical field order
    #[error("expected {expected}, found field '{found}'")]
    UnexpectedField {
        /// Field name found in the input
        found: String,
        /// Description of the expected field(s)
        expected: &'static str,
    },

    /// A numeric literal failed to decode
    #[error("invalid number at byte {offset}")]
    InvalidNumber {
        /// Byte offset of the literal
        offset: usize,
    },

    /// The file does not start with the scene-format sentinel
    #[error("bad scene file header '{0}', expected \"{SCENE_HEADER}\"")]
    BadHeader(String),

    /// A record's `type` discriminator is not a known object kind
    #[error("unknown record type '{0}'")]
    UnknownRecordType(String),

    /// A camera record without a perspective projection block
    #[error("camera '{camera}' requires a perspective projection")]
    UnsupportedCamera {
        /// Offending camera name
        camera: String,
    },

    /// Rotation or scale given without a preceding translation
    #[error("node '{node}' has rotation/scale but no translation values")]
    MissingTranslation {
        /// Offending node name
        node: String,
    },

    /// A fixed-arity value array with the wrong element count
    #[error("expected {expected} values, found {actual}")]
    ValueArity {
        /// Required element count
        expected: usize,
        /// Element count found in the input
        actual: usize,
    },

    /// A driver channel name outside translation/rotation/scale
    #[error("unknown driver channel '{0}'")]
    UnknownChannel(String),

    /// Driver value count inconsistent with its time samples
    #[error("driver '{driver}' has {actual} values, expected {expected}")]
    DriverSampleCount {
        /// Offending driver name
        driver: String,
        /// `times.len() * channel arity`
        expected: usize,
        /// Value count found in the input
        actual: usize,
    },

    /// Mesh attributes that do not lead with position and normal
    #[error("mesh '{mesh}' attributes must lead with POSITION then NORMAL")]
    AttributeLayout {
        /// Offending mesh name
        mesh: String,
    },

    /// The file contains no scene record
    #[error("scene file contains no SCENE record")]
    MissingScene,

    /// A constant material parameter could not be synthesized to a texture
    #[error(transparent)]
    Texture(#[from] AssetError),
}

/// Scene-file scanner producing the typed object graph
pub struct SceneParser {
    bytes: Vec<u8>,
    pos: usize,
    object_index: u32,
    header_seen: bool,
    finished: bool,
}

impl SceneParser {
    /// Create a parser over the contents of the scene file at `path`
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// Create a parser over in-memory scene-file bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            pos: 0,
            object_index: 0,
            header_seen: false,
            finished: false,
        }
    }

    /// Decode the whole file into a [`SceneStructure`]
    ///
    /// Constant material parameters are resolved through `textures` into
    /// synthesized image files as a side effect.
    pub fn parse_structure(
        mut self,
        textures: &mut dyn TextureWriter,
    ) -> Result<SceneStructure, ParseError> {
        let mut objects = Vec::new();
        let mut material_textures: HashMap<ObjectId, Vec<String>> = HashMap::new();

        while !self.finished {
            if let Some(object) = self.parse_object(textures)? {
                if let SceneObject::Material(material) = &object {
                    material_textures.insert(material.id, texture_sources(material));
                }
                objects.push(object);
            }
        }

        log::info!("parsed {} scene objects", objects.len());
        SceneStructure::from_objects(objects, material_textures)
    }

    /// Decode the next top-level element, if it is an object record
    fn parse_object(
        &mut self,
        textures: &mut dyn TextureWriter,
    ) -> Result<Option<SceneObject>, ParseError> {
        match self.next_token()? {
            b'[' if !self.header_seen => {
                self.bump();
                let header = self.scan_string()?;
                if header != SCENE_HEADER {
                    return Err(ParseError::BadHeader(header));
                }
                self.header_seen = true;
                Ok(None)
            }
            b',' => {
                self.bump();
                Ok(None)
            }
            b']' => {
                self.bump();
                self.finished = true;
                Ok(None)
            }
            b'{' => {
                self.bump();
                // Ids are assigned once per record, before the type-specific
                // routine runs, so they stay dense regardless of record
                // contents.
                self.object_index += 1;
                let id = self.object_index;

                self.expect_key("type")?;
                let kind = self.scan_string()?;
                let object = match kind.as_str() {
                    "SCENE" => SceneObject::Scene(self.decode_scene(id)?),
                    "NODE" => SceneObject::Node(self.decode_node(id)?),
                    "MESH" => SceneObject::Mesh(self.decode_mesh(id)?),
                    "CAMERA" => SceneObject::Camera(self.decode_camera(id)?),
                    "DRIVER" => SceneObject::Driver(self.decode_driver(id)?),
                    "MATERIAL" => SceneObject::Material(self.decode_material(id, textures)?),
                    "ENVIRONMENT" => SceneObject::Environment(self.decode_environment(id)?),
                    _ => return Err(ParseError::UnknownRecordType(kind)),
                };
                Ok(Some(object))
            }
            found => Err(self.unexpected(found, "'[', '{', ',' or ']'")),
        }
    }

    fn decode_scene(&mut self, id: ObjectId) -> Result<Scene, ParseError> {
        self.expect_byte(b',', "','")?;
        self.expect_key("name")?;
        let name = self.scan_string()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("roots")?;
        let roots = self.scan_u32_array()?;

        self.finish_record()?;
        Ok(Scene { id, name, roots })
    }

    fn decode_node(&mut self, id: ObjectId) -> Result<Node, ParseError> {
        self.expect_byte(b',', "','")?;
        self.expect_key("name")?;
        let mut node = Node::new(id, self.scan_string()?);

        // Optional fields in canonical order; the format requires translation
        // to lead whenever any transform component is present.
        let mut has_translation = false;
        while self.more_fields()? {
            let key = self.scan_key()?;
            match key.as_str() {
                "translation" => {
                    node.translation = Vec3::from(self.scan_f32_fixed::<3>()?);
                    has_translation = true;
                }
                "rotation" => {
                    if !has_translation {
                        return Err(ParseError::MissingTranslation { node: node.name });
                    }
                    node.rotation = self.scan_f32_fixed::<4>()?;
                }
                "scale" => {
                    if !has_translation {
                        return Err(ParseError::MissingTranslation { node: node.name });
                    }
                    node.scale = Vec3::from(self.scan_f32_fixed::<3>()?);
                }
                "mesh" => node.mesh = Some(self.scan_u32()?),
                "camera" => node.camera = Some(self.scan_u32()?),
                "environment" => node.environment = Some(self.scan_u32()?),
                "children" => node.children = self.scan_u32_array()?,
                _ => {
                    return Err(ParseError::UnexpectedField {
                        found: key,
                        expected: "a node field",
                    })
                }
            }
        }
        Ok(node)
    }

    fn decode_mesh(&mut self, id: ObjectId) -> Result<Mesh, ParseError> {
        self.expect_byte(b',', "','")?;
        self.expect_key("name")?;
        let name = self.scan_string()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("topology")?;
        let topology = self.scan_string()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("count")?;
        let count = self.scan_u32()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("attributes")?;
        self.expect_byte(b'{', "'{'")?;
        let mut attributes = Vec::new();
        loop {
            let attr_name = self.scan_key()?;
            attributes.push(self.decode_attribute(attr_name)?);
            match self.next_token()? {
                b',' => self.bump(),
                b'}' => {
                    self.bump();
                    break;
                }
                found => return Err(self.unexpected(found, "',' or '}'")),
            }
        }
        // Attribute order is positional and load-bearing for every consumer.
        if attributes.len() < 2
            || attributes[0].name != "POSITION"
            || attributes[1].name != "NORMAL"
        {
            return Err(ParseError::AttributeLayout { mesh: name });
        }

        let mut material = None;
        while self.more_fields()? {
            let key = self.scan_key()?;
            match key.as_str() {
                "material" => material = Some(self.scan_u32()?),
                _ => {
                    return Err(ParseError::UnexpectedField {
                        found: key,
                        expected: "'material'",
                    })
                }
            }
        }

        Ok(Mesh {
            id,
            name,
            topology,
            count,
            attributes,
            material,
        })
    }

    fn decode_attribute(&mut self, name: String) -> Result<MeshAttribute, ParseError> {
        self.expect_byte(b'{', "'{'")?;
        self.expect_key("src")?;
        let src = self.scan_string()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("offset")?;
        let offset = self.scan_u32()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("stride")?;
        let stride = self.scan_u32()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("format")?;
        let format = self.scan_string()?;

        self.finish_record()?;
        Ok(MeshAttribute {
            name,
            src,
            offset,
            stride,
            format,
        })
    }

    fn decode_camera(&mut self, id: ObjectId) -> Result<Camera, ParseError> {
        self.expect_byte(b',', "','")?;
        self.expect_key("name")?;
        let name = self.scan_string()?;

        self.expect_byte(b',', "','")?;
        let key = self.scan_key()?;
        if key != "perspective" {
            return Err(ParseError::UnsupportedCamera { camera: name });
        }

        self.expect_byte(b'{', "'{'")?;
        self.expect_key("aspect")?;
        let aspect = self.scan_f32()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("vfov")?;
        let vfov = self.scan_f32()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("near")?;
        let near = self.scan_f32()?;

        let mut far = f32::INFINITY;
        while self.more_fields()? {
            let key = self.scan_key()?;
            match key.as_str() {
                "far" => far = self.scan_f32()?,
                _ => {
                    return Err(ParseError::UnexpectedField {
                        found: key,
                        expected: "'far'",
                    })
                }
            }
        }

        self.finish_record()?;
        Ok(Camera {
            id,
            name,
            perspective: Perspective {
                aspect,
                vfov,
                near,
                far,
            },
        })
    }

    fn decode_driver(&mut self, id: ObjectId) -> Result<Driver, ParseError> {
        self.expect_byte(b',', "','")?;
        self.expect_key("name")?;
        let name = self.scan_string()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("node")?;
        let node = self.scan_u32()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("channel")?;
        let channel = match self.scan_string()?.as_str() {
            "translation" => Channel::Translation,
            "rotation" => Channel::Rotation,
            "scale" => Channel::Scale,
            other => return Err(ParseError::UnknownChannel(other.to_string())),
        };

        self.expect_byte(b',', "','")?;
        self.expect_key("times")?;
        let times = self.scan_f32_array()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("values")?;
        let values = self.scan_f32_array()?;

        let mut interpolation = Interpolation::default();
        while self.more_fields()? {
            let key = self.scan_key()?;
            match key.as_str() {
                "interpolation" => {
                    interpolation = match self.scan_string()?.as_str() {
                        "STEP" => Interpolation::Step,
                        "LINEAR" => Interpolation::Linear,
                        "SLERP" => Interpolation::Slerp,
                        other => {
                            log::warn!(
                                "driver '{name}': unsupported interpolation mode '{other}', \
                                 falling back to LINEAR"
                            );
                            Interpolation::Linear
                        }
                    };
                }
                _ => {
                    return Err(ParseError::UnexpectedField {
                        found: key,
                        expected: "'interpolation'",
                    })
                }
            }
        }

        let expected = times.len() * channel.arity();
        if values.len() != expected {
            return Err(ParseError::DriverSampleCount {
                driver: name,
                expected,
                actual: values.len(),
            });
        }

        Ok(Driver {
            id,
            name,
            node,
            channel,
            times,
            values,
            interpolation,
        })
    }

    fn decode_material(
        &mut self,
        id: ObjectId,
        textures: &mut dyn TextureWriter,
    ) -> Result<Material, ParseError> {
        self.expect_byte(b',', "','")?;
        self.expect_key("name")?;
        let name = self.scan_string()?;

        let mut normal_map = None;
        let mut displacement_map = None;
        let mut model = None;
        // The shading blocks are mutually exclusive; the next field name
        // tells which one (if any) this material carries.
        while self.more_fields()? {
            let key = self.scan_key()?;
            match key.as_str() {
                "normalMap" => normal_map = Some(self.decode_texture_ref()?),
                "displacementMap" => displacement_map = Some(self.decode_texture_ref()?),
                "pbr" => {
                    self.expect_byte(b'{', "'{'")?;
                    self.expect_key("albedo")?;
                    let albedo = self.decode_texture_or_rgb(id, "albedo", textures)?;
                    self.expect_byte(b',', "','")?;
                    self.expect_key("roughness")?;
                    let roughness = self.decode_texture_or_scalar(id, "roughness", textures)?;
                    self.expect_byte(b',', "','")?;
                    self.expect_key("metalness")?;
                    let metalness = self.decode_texture_or_scalar(id, "metalness", textures)?;
                    self.finish_record()?;
                    model = Some(ShadingModel::Pbr {
                        albedo,
                        roughness,
                        metalness,
                    });
                }
                "lambertian" => {
                    self.expect_byte(b'{', "'{'")?;
                    self.expect_key("albedo")?;
                    let albedo = self.decode_texture_or_rgb(id, "albedo", textures)?;
                    self.finish_record()?;
                    model = Some(ShadingModel::Lambertian { albedo });
                }
                "mirror" => {
                    self.decode_empty_block()?;
                    model = Some(ShadingModel::Mirror);
                }
                "environment" => {
                    self.decode_empty_block()?;
                    model = Some(ShadingModel::Environment);
                }
                "simple" => {
                    self.decode_empty_block()?;
                    model = Some(ShadingModel::Simple);
                }
                _ => {
                    return Err(ParseError::UnexpectedField {
                        found: key,
                        expected: "a material field",
                    })
                }
            }
        }

        Ok(Material {
            id,
            name,
            normal_map,
            displacement_map,
            model: model.unwrap_or(ShadingModel::Simple),
        })
    }

    fn decode_environment(&mut self, id: ObjectId) -> Result<Environment, ParseError> {
        self.expect_byte(b',', "','")?;
        self.expect_key("name")?;
        let name = self.scan_string()?;

        self.expect_byte(b',', "','")?;
        self.expect_key("radiance")?;
        let radiance = self.decode_texture_ref()?;

        self.finish_record()?;
        Ok(Environment { id, name, radiance })
    }

    fn decode_texture_ref(&mut self) -> Result<TextureRef, ParseError> {
        self.expect_byte(b'{', "'{'")?;
        self.expect_key("src")?;
        let src = self.scan_string()?;

        let mut kind = None;
        let mut format = None;
        while self.more_fields()? {
            let key = self.scan_key()?;
            match key.as_str() {
                "type" => kind = Some(self.scan_string()?),
                "format" => format = Some(self.scan_string()?),
                _ => {
                    return Err(ParseError::UnexpectedField {
                        found: key,
                        expected: "'type' or 'format'",
                    })
                }
            }
        }
        Ok(TextureRef { src, kind, format })
    }

    /// An RGB material parameter: texture record or constant `[r,g,b]`
    fn decode_texture_or_rgb(
        &mut self,
        material: ObjectId,
        param: &str,
        textures: &mut dyn TextureWriter,
    ) -> Result<TextureRef, ParseError> {
        match self.next_token()? {
            b'{' => self.decode_texture_ref(),
            b'[' => {
                let rgb = self.scan_f32_fixed::<3>()?;
                let rgba = [
                    unorm_byte(rgb[0]),
                    unorm_byte(rgb[1]),
                    unorm_byte(rgb[2]),
                    255,
                ];
                self.synthesize(material, param, rgba, textures)
            }
            found => Err(self.unexpected(found, "a texture record or constant")),
        }
    }

    /// A scalar material parameter: texture record or constant float
    fn decode_texture_or_scalar(
        &mut self,
        material: ObjectId,
        param: &str,
        textures: &mut dyn TextureWriter,
    ) -> Result<TextureRef, ParseError> {
        match self.next_token()? {
            b'{' => self.decode_texture_ref(),
            _ => {
                let value = unorm_byte(self.scan_f32()?);
                self.synthesize(material, param, [value, value, value, 255], textures)
            }
        }
    }

    fn synthesize(
        &mut self,
        material: ObjectId,
        param: &str,
        rgba: [u8; 4],
        textures: &mut dyn TextureWriter,
    ) -> Result<TextureRef, ParseError> {
        let src = textures.write_solid(&format!("material-{material}-{param}"), rgba, 1)?;
        Ok(TextureRef::plain(src))
    }

    fn decode_empty_block(&mut self) -> Result<(), ParseError> {
        self.expect_byte(b'{', "'{'")?;
        self.expect_byte(b'}', "'}'")?;
        Ok(())
    }

    // --- cursor primitives ---

    fn peek(&self) -> Result<u8, ParseError> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or(ParseError::UnexpectedEnd { offset: self.pos })
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    /// Skip whitespace and return the next significant byte without consuming
    fn next_token(&mut self) -> Result<u8, ParseError> {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        self.peek()
    }

    fn unexpected(&self, found: u8, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            found: found as char,
            expected,
            offset: self.pos,
        }
    }

    fn expect_byte(&mut self, expected: u8, description: &'static str) -> Result<(), ParseError> {
        let found = self.next_token()?;
        if found != expected {
            return Err(self.unexpected(found, description));
        }
        self.bump();
        Ok(())
    }

    /// Consume `"key":` and return the key name
    fn scan_key(&mut self) -> Result<String, ParseError> {
        let key = self.scan_string()?;
        self.expect_byte(b':', "':'")?;
        Ok(key)
    }

    /// Consume `"key":` and require a specific key name
    fn expect_key(&mut self, expected: &'static str) -> Result<(), ParseError> {
        let key = self.scan_key()?;
        if key != expected {
            return Err(ParseError::UnexpectedField {
                found: key,
                expected,
            });
        }
        Ok(())
    }

    fn scan_string(&mut self) -> Result<String, ParseError> {
        self.expect_byte(b'"', "'\"'")?;
        let start = self.pos;
        while self.peek()? != b'"' {
            self.bump();
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
        self.bump();
        Ok(text)
    }

    fn scan_u32(&mut self) -> Result<u32, ParseError> {
        self.next_token()?;
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or(ParseError::InvalidNumber { offset: start })
    }

    fn scan_f32(&mut self) -> Result<f32, ParseError> {
        self.next_token()?;
        let start = self.pos;
        while self.pos < self.bytes.len()
            && matches!(self.bytes[self.pos], b'0'..=b'9' | b'.' | b'-' | b'+' | b'e' | b'E')
        {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or(ParseError::InvalidNumber { offset: start })
    }

    fn scan_u32_array(&mut self) -> Result<Vec<u32>, ParseError> {
        self.expect_byte(b'[', "'['")?;
        let mut values = Vec::new();
        if self.next_token()? == b']' {
            self.bump();
            return Ok(values);
        }
        loop {
            values.push(self.scan_u32()?);
            match self.next_token()? {
                b',' => self.bump(),
                b']' => {
                    self.bump();
                    break;
                }
                found => return Err(self.unexpected(found, "',' or ']'")),
            }
        }
        Ok(values)
    }

    fn scan_f32_array(&mut self) -> Result<Vec<f32>, ParseError> {
        self.expect_byte(b'[', "'['")?;
        let mut values = Vec::new();
        if self.next_token()? == b']' {
            self.bump();
            return Ok(values);
        }
        loop {
            values.push(self.scan_f32()?);
            match self.next_token()? {
                b',' => self.bump(),
                b']' => {
                    self.bump();
                    break;
                }
                found => return Err(self.unexpected(found, "',' or ']'")),
            }
        }
        Ok(values)
    }

    fn scan_f32_fixed<const N: usize>(&mut self) -> Result<[f32; N], ParseError> {
        let values = self.scan_f32_array()?;
        let actual = values.len();
        values
            .try_into()
            .map_err(|_| ParseError::ValueArity {
                expected: N,
                actual,
            })
    }

    /// After a field value: `,` means another field follows, `}` ends the
    /// record
    fn more_fields(&mut self) -> Result<bool, ParseError> {
        match self.next_token()? {
            b',' => {
                self.bump();
                Ok(true)
            }
            b'}' => {
                self.bump();
                Ok(false)
            }
            found => Err(self.unexpected(found, "',' or '}'")),
        }
    }

    /// Consume the `}` closing a fixed-field record
    fn finish_record(&mut self) -> Result<(), ParseError> {
        self.expect_byte(b'}', "'}'")
    }
}

/// Convert a [0,1] material constant to an 8-bit channel value
fn unorm_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// All texture files a material references, synthesized ones included
fn texture_sources(material: &Material) -> Vec<String> {
    let mut sources = Vec::new();
    if let Some(map) = &material.normal_map {
        sources.push(map.src.clone());
    }
    if let Some(map) = &material.displacement_map {
        sources.push(map.src.clone());
    }
    match &material.model {
        ShadingModel::Pbr {
            albedo,
            roughness,
            metalness,
        } => {
            sources.push(albedo.src.clone());
            sources.push(roughness.src.clone());
            sources.push(metalness.src.clone());
        }
        ShadingModel::Lambertian { albedo } => sources.push(albedo.src.clone()),
        ShadingModel::Mirror | ShadingModel::Environment | ShadingModel::Simple => {}
    }
    sources
}
