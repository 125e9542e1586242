//! Note sink capability.
//!
//! The bridge extracts attack/release transitions from joint state and
//! hands them to a [`PianoSink`]. Synthesis itself lives outside this
//! crate; the default sink discards everything, and tests record.

use bevy::prelude::*;

/// Receiver for piano note on/off events.
///
/// `note` is a MIDI note number (21 = A0 through 108 = C8 for the 88-key
/// range this crate emits). Implementations must tolerate a release
/// without a matching attack, which happens after `release_all`.
pub trait PianoSink: Send + Sync {
    /// A key crossed into its pressed band.
    fn trigger_attack(&mut self, note: u8);
    /// A previously pressed key left its pressed band.
    fn trigger_release(&mut self, note: u8);
    /// Silence everything; called when the simulation pauses or resets.
    fn release_all(&mut self);
}

/// Sink that discards all events. The default when no audio backend is
/// attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PianoSink for NullSink {
    fn trigger_attack(&mut self, _note: u8) {}
    fn trigger_release(&mut self, _note: u8) {}
    fn release_all(&mut self) {}
}

/// Sink that records every call, for asserting on event streams in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Events in arrival order.
    pub events: Vec<SinkEvent>,
}

/// One recorded [`RecordingSink`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    /// `trigger_attack(note)`.
    Attack(u8),
    /// `trigger_release(note)`.
    Release(u8),
    /// `release_all()`.
    ReleaseAll,
}

impl PianoSink for RecordingSink {
    fn trigger_attack(&mut self, note: u8) {
        self.events.push(SinkEvent::Attack(note));
    }

    fn trigger_release(&mut self, note: u8) {
        self.events.push(SinkEvent::Release(note));
    }

    fn release_all(&mut self) {
        self.events.push(SinkEvent::ReleaseAll);
    }
}

/// The app-wide sink, boxed so backends can be swapped at startup.
#[derive(Resource)]
pub struct PianoAudio {
    /// Active sink.
    pub sink: Box<dyn PianoSink>,
}

impl Default for PianoAudio {
    fn default() -> Self {
        Self {
            sink: Box::new(NullSink),
        }
    }
}

impl PianoAudio {
    /// Wrap a concrete sink.
    #[must_use]
    pub fn new(sink: impl PianoSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }
}
