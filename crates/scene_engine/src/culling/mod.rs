//! Frustum culling engine
//!
//! Object-space bounding boxes are computed once per mesh from the raw
//! vertex bytes. Every frame, each instance's box is transformed into a
//! view-space oriented box and tested against the camera's symmetric
//! perspective frustum with a separating-axis test. The test is exact for
//! box-vs-frustum, not an approximation.
//!
//! SAT formulation after <https://bruop.github.io/improved_frustum_culling/>.

use thiserror::Error;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::scene::objects::Perspective;

/// Cross-product axes below this magnitude are skipped as degenerate
const AXIS_EPSILON: f32 = 1e-4;

/// Culling far distance substituted for cameras with an infinite far plane
const INFINITE_FAR_SUBSTITUTE: f32 = 1.0e6;

/// Errors raised while building mesh bounds from vertex bytes
#[derive(Error, Debug)]
pub enum CullingError {
    /// Position is not three packed 4-byte floats directly before normal
    #[error("unsupported vertex layout: expected normal 12 bytes after position, found {found}")]
    VertexLayout {
        /// Actual byte distance between position and normal
        found: i64,
    },

    /// A vertex stride of zero would never advance the scan
    #[error("vertex stride must be non-zero")]
    ZeroStride,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from its corner points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Scan packed vertex records for the position min/max per axis
    ///
    /// Positions must be three little-endian 4-byte floats sitting directly
    /// before the normal, i.e. `normal_offset - pos_offset == 12`; any other
    /// layout is a fatal format error.
    pub fn from_vertex_bytes(
        bytes: &[u8],
        stride: u32,
        pos_offset: u32,
        normal_offset: u32,
    ) -> Result<Self, CullingError> {
        if i64::from(normal_offset) - i64::from(pos_offset) != 12 {
            return Err(CullingError::VertexLayout {
                found: i64::from(normal_offset) - i64::from(pos_offset),
            });
        }
        if stride == 0 {
            return Err(CullingError::ZeroStride);
        }

        let stride = stride as usize;
        let pos_offset = pos_offset as usize;
        let mut min = Vec3::from_element(f32::INFINITY);
        let mut max = Vec3::from_element(f32::NEG_INFINITY);

        let mut base = pos_offset;
        while base + 12 <= bytes.len() {
            for axis in 0..3 {
                let offset = base + axis * 4;
                let value: f32 = bytemuck::pod_read_unaligned(&bytes[offset..offset + 4]);
                if value < min[axis] {
                    min[axis] = value;
                }
                if value > max[axis] {
                    max[axis] = value;
                }
            }
            base += stride;
        }

        Ok(Self { min, max })
    }
}

/// Symmetric perspective culling frustum in view space
///
/// The camera looks down -Z, so `near_plane` and `far_plane` hold negative
/// view-space z values; `near_right` and `near_top` are the near plane's
/// half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullingFrustum {
    /// Half-width of the near plane
    pub near_right: f32,
    /// Half-height of the near plane
    pub near_top: f32,
    /// View-space z of the near plane (negative)
    pub near_plane: f32,
    /// View-space z of the far plane (negative, below `near_plane`)
    pub far_plane: f32,
}

impl CullingFrustum {
    /// Build a frustum from near-plane half extents and positive plane
    /// distances
    pub fn new(near_right: f32, near_top: f32, near: f32, far: f32) -> Self {
        Self {
            near_right,
            near_top,
            near_plane: -near,
            far_plane: -far,
        }
    }

    /// Frustum bounds matching a camera's perspective parameters
    ///
    /// An infinite far plane is clamped to a large finite culling distance.
    pub fn from_perspective(perspective: &Perspective) -> Self {
        let far = if perspective.far.is_finite() {
            perspective.far
        } else {
            INFINITE_FAR_SUBSTITUTE
        };
        Self::new(
            perspective.near_right(),
            perspective.near_top(),
            perspective.near,
            far,
        )
    }
}

/// Oriented bounding box: center, half-extents and three orthonormal axes
#[derive(Debug, Clone, Copy)]
pub struct Obb {
    /// Box center
    pub center: Vec3,
    /// Half-extent along each axis
    pub extents: Vec3,
    /// Orthonormal box axes
    pub axes: [Vec3; 3],
}

impl Obb {
    /// Transform an AABB into an oriented box
    ///
    /// Only four corners are needed: the min corner and its three
    /// edge-neighbours give the box's edge vectors under any affine
    /// transform.
    pub fn from_aabb(aabb: &Aabb, transform: &Mat4) -> Self {
        let corners = [
            Vec3::new(aabb.min.x, aabb.min.y, aabb.min.z),
            Vec3::new(aabb.max.x, aabb.min.y, aabb.min.z),
            Vec3::new(aabb.min.x, aabb.max.y, aabb.min.z),
            Vec3::new(aabb.min.x, aabb.min.y, aabb.max.z),
        ]
        .map(|corner| {
            let transformed = transform * Vec4::new(corner.x, corner.y, corner.z, 1.0);
            transformed.xyz()
        });

        let mut axes = [
            corners[1] - corners[0],
            corners[2] - corners[0],
            corners[3] - corners[0],
        ];
        let center = corners[0] + 0.5 * (axes[0] + axes[1] + axes[2]);
        let mut extents = Vec3::new(axes[0].norm(), axes[1].norm(), axes[2].norm());
        for axis in 0..3 {
            axes[axis] /= extents[axis];
        }
        extents *= 0.5;

        Self {
            center,
            extents,
            axes,
        }
    }

    /// Half-length of the box's projection onto `axis`
    pub fn projected_radius(&self, axis: &Vec3) -> f32 {
        (0..3)
            .map(|index| axis.dot(&self.axes[index]).abs() * self.extents[index])
            .sum()
    }
}

/// Test one instance's bounds against the frustum
///
/// `view_transform` is the instance's world transform pre-multiplied by the
/// view matrix. Returns false as soon as any of the candidate axes separates
/// the box from the frustum; surviving every axis means visible.
pub fn is_visible(frustum: &CullingFrustum, view_transform: &Mat4, aabb: &Aabb) -> bool {
    let obb = Obb::from_aabb(aabb, view_transform);

    // Near/far planes: a single axis along view-space z.
    if separated_on_axis(frustum, &obb, &Vec3::z()) {
        return false;
    }

    // The four side-plane normals, widening from the near-plane extents.
    let z_near = frustum.near_plane;
    let x_near = frustum.near_right;
    let y_near = frustum.near_top;
    let side_normals = [
        Vec3::new(z_near, 0.0, x_near),  // left
        Vec3::new(-z_near, 0.0, x_near), // right
        Vec3::new(0.0, -z_near, y_near), // top
        Vec3::new(0.0, z_near, y_near),  // bottom
    ];
    for normal in &side_normals {
        if separated_on_axis(frustum, &obb, normal) {
            return false;
        }
    }

    // The box's own axes.
    for axis in &obb.axes {
        if separated_on_axis(frustum, &obb, axis) {
            return false;
        }
    }

    // Cross products of the view-space right/up vectors with each box axis.
    for axis in &obb.axes {
        let right_cross = Vec3::new(0.0, -axis.z, axis.y);
        if separated_on_axis(frustum, &obb, &right_cross) {
            return false;
        }
        let up_cross = Vec3::new(axis.z, 0.0, -axis.x);
        if separated_on_axis(frustum, &obb, &up_cross) {
            return false;
        }
    }

    // Cross products of each frustum edge direction with each box axis.
    let edge_directions = [
        Vec3::new(-x_near, 0.0, z_near), // left
        Vec3::new(x_near, 0.0, z_near),  // right
        Vec3::new(0.0, y_near, z_near),  // top
        Vec3::new(0.0, -y_near, z_near), // bottom
    ];
    for axis in &obb.axes {
        for edge in &edge_directions {
            let candidate = edge.cross(axis);
            if candidate.x.abs() < AXIS_EPSILON
                && candidate.y.abs() < AXIS_EPSILON
                && candidate.z.abs() < AXIS_EPSILON
            {
                continue;
            }
            if separated_on_axis(frustum, &obb, &candidate) {
                return false;
            }
        }
    }

    true
}

/// Project both shapes onto `axis` and test the intervals for separation
///
/// The frustum's projected interval runs between the near-plane support
/// points; whichever end extends past zero widens by `far/near`, accounting
/// for the side planes fanning out towards the far plane.
fn separated_on_axis(frustum: &CullingFrustum, obb: &Obb, axis: &Vec3) -> bool {
    let center = axis.dot(&obb.center);
    let radius = obb.projected_radius(axis);
    let obb_min = center - radius;
    let obb_max = center + radius;

    let p = frustum.near_right * axis.x.abs() + frustum.near_top * axis.y.abs();
    let mut tau_0 = frustum.near_plane * axis.z - p;
    let mut tau_1 = frustum.near_plane * axis.z + p;
    let widen = frustum.far_plane / frustum.near_plane;
    if tau_0 < 0.0 {
        tau_0 *= widen;
    }
    if tau_1 > 0.0 {
        tau_1 *= widen;
    }

    obb_min > tau_1 || obb_max < tau_0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4;
    use approx::assert_relative_eq;

    /// Pack vertex records of position + normal (24-byte stride)
    fn vertex_bytes(positions: &[[f32; 3]]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for position in positions {
            for component in position {
                bytes.extend_from_slice(&component.to_le_bytes());
            }
            // Normal payload, ignored by the bounds scan.
            for component in [0.0f32, 0.0, 1.0] {
                bytes.extend_from_slice(&component.to_le_bytes());
            }
        }
        bytes
    }

    fn unit_frustum() -> CullingFrustum {
        CullingFrustum::new(1.0, 1.0, 1.0, 100.0)
    }

    #[test]
    fn test_aabb_tracks_min_and_max_per_axis() {
        let bytes = vertex_bytes(&[[-1.0, -1.0, -1.0], [1.0, 1.0, 1.0], [0.5, -0.25, 0.0]]);
        let aabb = Aabb::from_vertex_bytes(&bytes, 24, 0, 12).unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_aabb_rejects_non_adjacent_normal() {
        let bytes = vertex_bytes(&[[0.0, 0.0, 0.0]]);
        assert!(matches!(
            Aabb::from_vertex_bytes(&bytes, 24, 0, 16),
            Err(CullingError::VertexLayout { found: 16 })
        ));
        assert!(matches!(
            Aabb::from_vertex_bytes(&bytes, 0, 0, 12),
            Err(CullingError::ZeroStride)
        ));
    }

    #[test]
    fn test_box_at_frustum_center_is_visible() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let mid_depth = Mat4::new_translation(&Vec3::new(0.0, 0.0, -50.0));
        assert!(is_visible(&unit_frustum(), &mid_depth, &aabb));
    }

    #[test]
    fn test_box_beyond_side_plane_is_culled() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        // At the near plane the frustum is 1 unit wide; x = 1000 is far
        // outside the right plane's reach even at the far plane.
        let outside = Mat4::new_translation(&Vec3::new(1000.0, 0.0, -1.0));
        assert!(!is_visible(&unit_frustum(), &outside, &aabb));
    }

    #[test]
    fn test_box_behind_camera_is_culled() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let behind = Mat4::new_translation(&Vec3::new(0.0, 0.0, 10.0));
        assert!(!is_visible(&unit_frustum(), &behind, &aabb));
    }

    #[test]
    fn test_box_past_far_plane_is_culled() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let too_deep = Mat4::new_translation(&Vec3::new(0.0, 0.0, -500.0));
        assert!(!is_visible(&unit_frustum(), &too_deep, &aabb));
    }

    #[test]
    fn test_wide_box_straddling_side_plane_is_visible() {
        let aabb = Aabb::new(Vec3::new(-10.0, -0.5, -0.5), Vec3::new(10.0, 0.5, 0.5));
        let mid_depth = Mat4::new_translation(&Vec3::new(8.0, 0.0, -5.0));
        assert!(is_visible(&unit_frustum(), &mid_depth, &aabb));
    }

    #[test]
    fn test_rotated_box_keeps_orthonormal_axes() {
        let aabb = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
        let rotation =
            Mat4::from_axis_angle(&nalgebra::Unit::new_normalize(Vec3::y()), 0.7)
                * Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0));
        let obb = Obb::from_aabb(&aabb, &rotation);

        for axis in &obb.axes {
            assert_relative_eq!(axis.norm(), 1.0, epsilon = 1e-5);
        }
        assert_relative_eq!(obb.extents.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(obb.extents.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(obb.extents.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_frustum_from_infinite_far_perspective_is_finite() {
        let perspective = Perspective {
            aspect: 1.0,
            vfov: std::f32::consts::FRAC_PI_2,
            near: 0.1,
            far: f32::INFINITY,
        };
        let frustum = CullingFrustum::from_perspective(&perspective);
        assert!(frustum.far_plane.is_finite());
        assert_relative_eq!(frustum.near_top, 0.1, epsilon = 1e-6);
        assert_relative_eq!(frustum.near_plane, -0.1, epsilon = 1e-6);
    }
}
