//! Orbit camera for inspecting the piano scene.
//!
//! Left drag orbits, right drag pans, scroll zooms. Orbit input is
//! suppressed while a body is grabbed so pulling a key does not also
//! spin the camera.

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;

use crate::drag::DragState;

/// Spherical-coordinate camera controller.
#[derive(Component, Debug, Clone)]
pub struct OrbitCamera {
    /// Point to orbit around.
    pub target: Vec3,
    /// Distance from target.
    pub distance: f32,
    /// Horizontal angle (radians).
    pub azimuth: f32,
    /// Vertical angle (radians), clamped away from the poles.
    pub elevation: f32,
    /// Orbit speed (radians per pixel).
    pub orbit_speed: f32,
    /// Pan speed (units per pixel, scaled by distance).
    pub pan_speed: f32,
    /// Zoom speed (multiplier per scroll unit).
    pub zoom_speed: f32,
    /// Zoom-in limit.
    pub min_distance: f32,
    /// Zoom-out limit.
    pub max_distance: f32,
    /// Lower elevation clamp.
    pub min_elevation: f32,
    /// Upper elevation clamp.
    pub max_elevation: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        // Over-the-keyboard viewpoint: slightly above and in front of
        // an instrument centered near the origin.
        Self {
            target: Vec3::new(0.0, 0.7, 0.0),
            distance: 2.8,
            azimuth: 0.7,
            elevation: 0.37,
            orbit_speed: 0.005,
            pan_speed: 0.01,
            zoom_speed: 0.1,
            min_distance: 0.3,
            max_distance: 20.0,
            min_elevation: -1.4,
            max_elevation: 1.4,
        }
    }
}

impl OrbitCamera {
    /// Set the orbit target.
    #[must_use]
    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    /// Set the distance, clamped to the zoom limits.
    #[must_use]
    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self
    }

    /// Set the viewing angles.
    #[must_use]
    pub fn with_angles(mut self, azimuth: f32, elevation: f32) -> Self {
        self.azimuth = azimuth;
        self.elevation = elevation.clamp(self.min_elevation, self.max_elevation);
        self
    }

    /// Camera position for the current orbit parameters.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.azimuth.cos() * self.elevation.cos();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.azimuth.sin() * self.elevation.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Apply an orbit delta in pixels.
    pub fn orbit(&mut self, delta: Vec2) {
        self.azimuth -= delta.x * self.orbit_speed;
        self.elevation = (self.elevation + delta.y * self.orbit_speed)
            .clamp(self.min_elevation, self.max_elevation);
    }

    /// Apply a pan delta in pixels, moving the target in the view plane.
    pub fn pan(&mut self, delta: Vec2) {
        let forward = (self.target - self.position()).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        self.target += right * (-delta.x * self.pan_speed * self.distance)
            + up * (delta.y * self.pan_speed * self.distance);
    }

    /// Apply a zoom delta in scroll units.
    pub fn zoom(&mut self, delta: f32) {
        self.distance =
            (self.distance * (1.0 - delta * self.zoom_speed)).clamp(self.min_distance, self.max_distance);
    }

    /// Write position and look-at into a transform.
    pub fn apply_to_transform(&self, transform: &mut Transform) {
        transform.translation = self.position();
        transform.look_at(self.target, Vec3::Y);
    }
}

/// Mouse input for the orbit camera. Orbiting yields to an active grab.
#[allow(clippy::needless_pass_by_value)]
pub fn orbit_camera_input(
    mut cameras: Query<&mut OrbitCamera>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    drag: Option<Res<DragState>>,
) {
    let delta = mouse_motion.delta;
    let scroll = mouse_scroll.delta.y;
    let dragging = drag.is_some_and(|d| d.is_dragging());

    for mut camera in &mut cameras {
        if mouse_button.pressed(MouseButton::Left) && !dragging {
            camera.orbit(delta);
        }
        if mouse_button.pressed(MouseButton::Right) {
            camera.pan(delta);
        }
        if scroll.abs() > 0.001 {
            camera.zoom(scroll);
        }
    }
}

/// Push orbit parameters into the camera transform.
pub fn update_orbit_camera(mut cameras: Query<(&OrbitCamera, &mut Transform)>) {
    for (camera, mut transform) in &mut cameras {
        camera.apply_to_transform(&mut transform);
    }
}

/// Spawn the default piano-viewpoint camera.
pub fn spawn_piano_camera(mut commands: Commands) {
    let camera = OrbitCamera::default();
    let mut transform = Transform::default();
    camera.apply_to_transform(&mut transform);
    commands.spawn((Camera3d::default(), camera, transform));
}
