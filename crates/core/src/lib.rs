//! Core library for beatscript, a beat-synchronized script scheduler.
//!
//! Long, procedurally varied sequences (music stem changes, spawn patterns,
//! camera and lighting cues) are written as [`ScriptFunction`]s in terms of
//! musical beats. A [`Script`] expands them lazily and hands individually
//! positioned events to a host such as the [`Timeline`].

pub mod boss;
pub mod config;
pub mod error;
pub mod event;
pub mod function;
pub mod script;
pub mod timeline;

pub use boss::{Encounter, EncounterConfig, Pattern};
pub use config::{AppConfig, PlaybackConfig, ScriptConfig};
pub use error::{Result, ScriptError};
pub use event::{Entry, Event, EventSink, Marker, Rest};
pub use function::{from_fn, ScriptContext, ScriptFunction, Sequence};
pub use script::{DrainReport, Script};
pub use timeline::{BeatClock, Cue, CueKind, CueRecord, TickContext, Timeline};
