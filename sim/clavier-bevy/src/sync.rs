//! Per-frame transform synchronization, solver state to scene graph.
//!
//! Pure read on the solver side, pure write on the render side. Entities
//! whose index falls outside the current model (mid-reload frames) are
//! skipped silently.

use bevy::prelude::*;

use crate::convert::{quat_from_sim, vec3_from_sim};
use crate::resources::Simulation;
use crate::scene::{light_transform, BodyIndex, LightIndex};

/// Copy body world poses into their group transforms.
#[allow(clippy::needless_pass_by_value)]
pub fn sync_body_transforms(
    sim: Option<Res<Simulation>>,
    mut bodies: Query<(&BodyIndex, &mut Transform)>,
) {
    let Some(sim) = sim else {
        return;
    };
    for (&BodyIndex(b), mut transform) in &mut bodies {
        let (Some(pos), Some(quat)) = (sim.data.xpos.get(b), sim.data.xquat.get(b)) else {
            continue;
        };
        transform.translation = vec3_from_sim(pos);
        transform.rotation = quat_from_sim(quat);
    }
}

/// Copy light world poses and aim directions into light transforms.
#[allow(clippy::needless_pass_by_value)]
pub fn sync_light_transforms(
    sim: Option<Res<Simulation>>,
    mut lights: Query<(&LightIndex, &mut Transform)>,
) {
    let Some(sim) = sim else {
        return;
    };
    for (&LightIndex(l), mut transform) in &mut lights {
        let (Some(pos), Some(dir)) = (sim.data.light_xpos.get(l), sim.data.light_xdir.get(l))
        else {
            continue;
        };
        *transform = light_transform(pos, dir);
    }
}
