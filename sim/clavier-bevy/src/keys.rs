//! Piano key event extraction.
//!
//! Keys are ordinary hinged bodies in the model; nothing in the solver
//! knows about notes. This module finds the key bodies by name once per
//! load, then each solver step reads their joint angles, derives a
//! pressed/released bit per key, and turns the edges into attack and
//! release transitions. A frame-rate system recolors key geometry from
//! the same transitions.

use bevy::prelude::*;
use clavier_model::{Data, Model};

use crate::scene::SceneEntities;

/// Number of keys on a full piano, and the span of the note table.
pub const KEY_COUNT: usize = 88;

/// MIDI note of the lowest key (A0).
pub const MIDI_BASE: u8 = 21;

/// A key counts as pressed when its clamped joint angle is within this
/// many radians (0.5 degrees) of the range maximum.
pub const PRESS_TOLERANCE: f64 = 0.008_726_65;

/// Pressed key color.
pub const PRESSED_COLOR: Color = Color::srgb(0.2, 0.8, 0.2);
/// Released white-key color.
pub const WHITE_COLOR: Color = Color::srgb(0.9, 0.9, 0.9);
/// Released black-key color.
pub const BLACK_COLOR: Color = Color::srgb(0.1, 0.1, 0.1);

/// MIDI note number for a key index (0 = A0 .. 87 = C8).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn midi_for_key(key: usize) -> u8 {
    MIDI_BASE + key as u8
}

/// Human-readable note label for a MIDI note ("A0", "C#4", "C8").
#[must_use]
pub fn note_label(midi: u8) -> String {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = i32::from(midi) / 12 - 1;
    format!("{}{octave}", NAMES[usize::from(midi) % 12])
}

/// One key's resolved model indices.
#[derive(Debug, Clone)]
pub struct KeyBinding {
    /// Body carrying the key geometry.
    pub body: usize,
    /// Address of the hinge's scalar slot in `qpos`.
    pub qpos_adr: usize,
    /// Hinge range; the max end is the fully pressed angle.
    pub range: (f64, f64),
    /// White or black key, for release recoloring.
    pub is_white: bool,
    /// Rendered geoms belonging to the key body.
    pub geoms: Vec<usize>,
}

/// Key index -> binding table, resolved once per model load.
///
/// A body binds to key `i` when its decoded name carries the `piano/`
/// marker and the `key` word, with `i` parsed from the third `_` field
/// (`piano/white_key_39`). Bodies that match the naming scheme but lack
/// a joint or carry an out-of-range index are skipped with a warning.
#[derive(Resource, Debug, Clone)]
pub struct KeyBindings {
    keys: Vec<Option<KeyBinding>>,
}

impl KeyBindings {
    /// Scan the model's bodies for piano keys.
    #[must_use]
    pub fn resolve(model: &Model) -> Self {
        let mut keys: Vec<Option<KeyBinding>> = vec![None; KEY_COUNT];

        for body in 0..model.nbody {
            let name = model.body_name(body);
            if !name.contains("piano/") || !name.contains("key") {
                continue;
            }
            let Some(index) = name.split('_').nth(2).and_then(|s| s.parse::<usize>().ok())
            else {
                warn!("key-like body '{name}' has no parsable index; skipping");
                continue;
            };
            if index >= KEY_COUNT {
                warn!("body '{name}' names key {index}, outside the 88-key range; skipping");
                continue;
            }
            let Some(joint) = model.body_joint(body) else {
                warn!("key body '{name}' has no joint; skipping");
                continue;
            };

            let geoms = (0..model.ngeom)
                .filter(|&g| model.geom_body[g] == body)
                .collect();
            keys[index] = Some(KeyBinding {
                body,
                qpos_adr: model.jnt_qpos_adr[joint],
                range: model.jnt_range[joint],
                is_white: name.contains("white"),
                geoms,
            });
        }

        Self { keys }
    }

    /// The binding for a key index, when the model has that key.
    #[must_use]
    pub fn key(&self, index: usize) -> Option<&KeyBinding> {
        self.keys.get(index).and_then(Option::as_ref)
    }

    /// How many keys resolved.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.keys.iter().filter(|k| k.is_some()).count()
    }
}

/// One pressed/released edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTransition {
    /// Key index (0..88).
    pub key: usize,
    /// MIDI note for the key.
    pub midi: u8,
    /// `true` for an attack, `false` for a release.
    pub pressed: bool,
}

/// Transitions produced since the frame-rate consumers last drained.
/// Steps within one render frame accumulate here.
#[derive(Resource, Debug, Default)]
pub struct TransitionQueue(Vec<KeyTransition>);

impl TransitionQueue {
    /// Queue a transition.
    pub fn push(&mut self, transition: KeyTransition) {
        self.0.push(transition);
    }

    /// Take everything queued so far.
    pub fn drain(&mut self) -> Vec<KeyTransition> {
        std::mem::take(&mut self.0)
    }

    /// Queued transition count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Double-buffered per-key pressed state.
#[derive(Resource, Debug, Clone)]
pub struct Activation {
    current: Vec<bool>,
    previous: Vec<bool>,
}

impl Activation {
    /// Fresh all-released state sized for the binding table.
    #[must_use]
    pub fn for_bindings(bindings: &KeyBindings) -> Self {
        let n = bindings.keys.len();
        Self {
            current: vec![false; n],
            previous: vec![false; n],
        }
    }

    /// Force everything released without emitting transitions (reset).
    pub fn clear(&mut self) {
        self.current.fill(false);
        self.previous.fill(false);
    }

    /// Pressed state of a key as of the last extract.
    #[must_use]
    pub fn is_pressed(&self, key: usize) -> bool {
        self.current.get(key).copied().unwrap_or(false)
    }

    /// Read joint state for every bound key and emit the edges since the
    /// previous call.
    ///
    /// The joint angle is clamped to the hinge range first, so a key
    /// pushed past its physical stop still reads as pressed. Pressed
    /// means within [`PRESS_TOLERANCE`] of the range max.
    pub fn extract(&mut self, bindings: &KeyBindings, data: &Data) -> Vec<KeyTransition> {
        let mut transitions = Vec::new();
        for (key, binding) in bindings.keys.iter().enumerate() {
            let Some(binding) = binding else { continue };
            let Some(&q) = data.qpos.as_slice().get(binding.qpos_adr) else {
                continue;
            };
            let (lo, hi) = binding.range;
            let clamped = q.clamp(lo, hi);
            let pressed = (hi - clamped).abs() <= PRESS_TOLERANCE;

            if pressed != self.previous[key] {
                transitions.push(KeyTransition {
                    key,
                    midi: midi_for_key(key),
                    pressed,
                });
            }
            self.current[key] = pressed;
            self.previous[key] = pressed;
        }
        transitions
    }
}

/// Frame-rate system: recolor key geometry for every queued transition.
#[allow(clippy::needless_pass_by_value)]
pub fn recolor_keys(
    mut transitions: ResMut<TransitionQueue>,
    bindings: Option<Res<KeyBindings>>,
    entities: Option<Res<SceneEntities>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    handles: Query<&MeshMaterial3d<StandardMaterial>>,
) {
    let (Some(bindings), Some(entities)) = (bindings, entities) else {
        return;
    };
    for transition in transitions.drain() {
        let Some(binding) = bindings.key(transition.key) else {
            continue;
        };
        let color = if transition.pressed {
            PRESSED_COLOR
        } else {
            released_color(binding.is_white)
        };
        tint_key(binding, &entities, &mut materials, &handles, color);
    }
}

/// Paint every bound key with its released color.
pub fn restore_key_colors(
    bindings: &KeyBindings,
    entities: &SceneEntities,
    materials: &mut Assets<StandardMaterial>,
    handles: &Query<&MeshMaterial3d<StandardMaterial>>,
) {
    for binding in bindings.keys.iter().flatten() {
        tint_key(
            binding,
            entities,
            materials,
            handles,
            released_color(binding.is_white),
        );
    }
}

fn released_color(is_white: bool) -> Color {
    if is_white {
        WHITE_COLOR
    } else {
        BLACK_COLOR
    }
}

fn tint_key(
    binding: &KeyBinding,
    entities: &SceneEntities,
    materials: &mut Assets<StandardMaterial>,
    handles: &Query<&MeshMaterial3d<StandardMaterial>>,
    color: Color,
) {
    for &g in &binding.geoms {
        let Some(entity) = entities.geoms.get(g).copied().flatten() else {
            continue;
        };
        let Ok(handle) = handles.get(entity) else {
            continue;
        };
        if let Some(material) = materials.get_mut(&handle.0) {
            material.base_color = color;
        }
    }
}
