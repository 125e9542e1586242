//! Coordinate conversions between solver and Bevy types.
//!
//! This module is THE ONLY place that knows both nalgebra (solver, Z-up,
//! f64) and Bevy (render, Y-up, f32) types, and the only place the axis
//! swizzle lives. Every buffer in the crate is in exactly one of the two
//! spaces; a value crosses between them through these functions exactly
//! once.
//!
//! The change of basis maps the solver's Z-up right-handed frame onto the
//! renderer's Y-up right-handed frame:
//!
//! ```text
//! render = (sim.x, sim.z, -sim.y)      sim = (render.x, -render.z, render.y)
//! ```
//!
//! which is the -90 degree rotation about X. Orientations are conjugated
//! by the same rotation, so the quaternion's vector part permutes like a
//! position and the scalar part is unchanged.

#![allow(clippy::cast_possible_truncation)] // f64 -> f32 is intentional for Bevy

use bevy::math::{Quat, Vec3};
use nalgebra::{UnitQuaternion, Vector3};

/// Convert a solver-space position to a render-space `Vec3` (swizzled).
#[inline]
#[must_use]
pub fn vec3_from_sim(v: &Vector3<f64>) -> Vec3 {
    Vec3::new(v.x as f32, v.z as f32, -v.y as f32)
}

/// Convert a render-space `Vec3` back to a solver-space vector (swizzled).
#[inline]
#[must_use]
pub fn sim_from_vec3(v: Vec3) -> Vector3<f64> {
    Vector3::new(f64::from(v.x), f64::from(-v.z), f64::from(v.y))
}

/// Convert a solver-space orientation to a render-space `Quat` (swizzled).
#[inline]
#[must_use]
pub fn quat_from_sim(q: &UnitQuaternion<f64>) -> Quat {
    let q = q.quaternion();
    Quat::from_xyzw(q.i as f32, q.k as f32, -q.j as f32, q.w as f32)
}

/// Convert a render-space `Quat` back to a solver-space orientation.
#[inline]
#[must_use]
pub fn sim_quat_from_quat(q: Quat) -> UnitQuaternion<f64> {
    UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(
        f64::from(q.w),
        f64::from(q.x),
        f64::from(-q.z),
        f64::from(q.y),
    ))
}

/// Convert a solver-space vector to `Vec3` without the axis swizzle.
///
/// For call sites operating purely in solver space (e.g. handing a raw
/// body offset back into solver-space math) where only the scalar type
/// changes.
#[inline]
#[must_use]
pub fn vec3_from_sim_raw(v: &Vector3<f64>) -> Vec3 {
    Vec3::new(v.x as f32, v.y as f32, v.z as f32)
}

/// Convert a solver-space orientation to `Quat` without the axis swizzle.
#[inline]
#[must_use]
pub fn quat_from_sim_raw(q: &UnitQuaternion<f64>) -> Quat {
    let q = q.quaternion();
    Quat::from_xyzw(q.i as f32, q.j as f32, q.k as f32, q.w as f32)
}

/// Swizzle one (x, y, z) triple in place inside a flat f32 vertex buffer.
///
/// Used by the scene builder to permute imported mesh vertex and normal
/// data once at build time. `(x, y, z) -> (x, z, -y)`, the same map as
/// [`vec3_from_sim`].
#[inline]
pub fn swizzle_triple_in_place(buf: &mut [f32]) {
    debug_assert_eq!(buf.len(), 3);
    let y = buf[1];
    buf[1] = buf[2];
    buf[2] = -y;
}
