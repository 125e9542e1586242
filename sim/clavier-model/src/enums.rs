//! Entity type tags used by the model descriptor arrays.

/// Geometry type tag for a geom entity.
///
/// Discriminant values match the solver's wire encoding, so a raw type
/// array can be decoded with [`GeomType::from_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeomType {
    /// Infinite plane (typically the ground).
    Plane,
    /// Height field terrain (not renderable by the bridge; falls back).
    Hfield,
    /// Sphere defined by `size.x` = radius.
    #[default]
    Sphere,
    /// Capsule: `size.x` = radius, `size.y` = half-length of the shaft.
    Capsule,
    /// Ellipsoid: `size` = semi-axes. Rendered as a scaled unit sphere.
    Ellipsoid,
    /// Cylinder: `size.x` = radius, `size.y` = half-length.
    Cylinder,
    /// Box: `size` = half-extents.
    Box,
    /// Imported triangle mesh; `geom_dataid` selects the mesh table entry.
    Mesh,
}

impl GeomType {
    /// Decode a raw type tag. Returns `None` for values outside the
    /// solver's encoding; callers fall back to a default shape.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Plane),
            1 => Some(Self::Hfield),
            2 => Some(Self::Sphere),
            3 => Some(Self::Capsule),
            4 => Some(Self::Ellipsoid),
            5 => Some(Self::Cylinder),
            6 => Some(Self::Box),
            7 => Some(Self::Mesh),
            _ => None,
        }
    }

    /// The raw wire encoding of this tag.
    #[must_use]
    pub const fn raw(self) -> i32 {
        match self {
            Self::Plane => 0,
            Self::Hfield => 1,
            Self::Sphere => 2,
            Self::Capsule => 3,
            Self::Ellipsoid => 4,
            Self::Cylinder => 5,
            Self::Box => 6,
            Self::Mesh => 7,
        }
    }

    /// Conservative bounding-sphere radius from the type-specific size
    /// parameters. Used by the pointer hit test.
    #[must_use]
    pub fn bounding_radius(self, size: nalgebra::Vector3<f64>) -> f64 {
        match self {
            Self::Sphere => size.x,
            Self::Box => size.norm(),
            Self::Capsule => size.x + size.y,
            Self::Cylinder => size.x.hypot(size.y),
            Self::Ellipsoid => size.x.max(size.y).max(size.z),
            Self::Plane | Self::Hfield => f64::INFINITY,
            Self::Mesh => {
                let scale = size.x.max(size.y).max(size.z);
                if scale > 0.0 { scale } else { 1.0 }
            }
        }
    }
}

/// Joint type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JointType {
    /// Free joint (6 DOF): qpos holds position (3) + quaternion (4).
    Free,
    /// Ball joint (3 DOF): qpos holds a unit quaternion (4).
    Ball,
    /// Slide joint (1 DOF): qpos holds a scalar displacement.
    Slide,
    /// Hinge joint (1 DOF): qpos holds a scalar angle in radians.
    #[default]
    Hinge,
}

impl JointType {
    /// Number of entries this joint occupies in `qpos`.
    #[must_use]
    pub const fn qpos_width(self) -> usize {
        match self {
            Self::Free => 7,
            Self::Ball => 4,
            Self::Slide | Self::Hinge => 1,
        }
    }
}
