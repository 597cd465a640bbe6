use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{function::ScriptFunction, timeline::TickContext};

/// A unit of work positioned on the beat timeline.
///
/// Hosts own events exclusively: once an event is handed to an
/// [`EventSink`] the previous owner has no further access to it. The
/// lifecycle hooks are invoked by the host clock, never by the event itself.
pub trait Event: fmt::Debug {
    /// Position of the event in beats.
    fn beat(&self) -> f64;

    fn set_beat(&mut self, beat: f64);

    /// Duration in beats. May be [`f64::INFINITY`] for events that only end
    /// when they ask to be deleted.
    fn width(&self) -> f64 {
        0.0
    }

    fn on_start(&mut self, _ctx: &mut TickContext<'_>) {}

    fn on_update(&mut self, _ctx: &mut TickContext<'_>) {}

    fn on_end(&mut self, _ctx: &mut TickContext<'_>) {}

    fn ready_to_delete(&self) -> bool {
        false
    }
}

/// Anything that accepts ownership of fully positioned events.
pub trait EventSink {
    fn add_event(&mut self, event: Box<dyn Event>);
}

impl EventSink for Vec<Box<dyn Event>> {
    fn add_event(&mut self, event: Box<dyn Event>) {
        self.push(event);
    }
}

/// Advances script time without producing a host-visible event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rest {
    duration: f64,
}

impl Rest {
    pub fn new(duration: f64) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Rests are interpreted and discarded by the script as soon as they are
    /// reached.
    pub fn ready_to_delete(&self) -> bool {
        true
    }
}

/// Diagnostic entries. They take no time and only show up in the logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    Note(String),
    Todo(String),
    Log(String),
}

impl Marker {
    pub(crate) fn emit(&self, script: &str, beat: f64) {
        match self {
            Marker::Note(message) => tracing::debug!(script, beat, "{message}"),
            Marker::Todo(message) => {
                tracing::warn!(script, beat, todo = %message, "unfinished script section")
            }
            Marker::Log(message) => tracing::info!(script, beat, "{message}"),
        }
    }
}

/// Item waiting in a script's live queue.
#[derive(Debug)]
pub enum Entry {
    /// Real event, beat relative to the start of its subroutine.
    Event(Box<dyn Event>),
    Rest(Rest),
    /// Lazily expanded subroutine. Its entries are computed only when the
    /// drain reaches this point and are appended to the live queue.
    Expand(Box<dyn ScriptFunction>),
    Marker(Marker),
    /// Stops the owning script.
    Stop,
}

impl Entry {
    pub fn event(event: impl Event + 'static) -> Self {
        Self::Event(Box::new(event))
    }

    pub fn rest(duration: f64) -> Self {
        Self::Rest(Rest::new(duration))
    }

    pub fn expand(function: impl ScriptFunction + 'static) -> Self {
        Self::Expand(Box::new(function))
    }

    /// Beats this entry advances the script clock by.
    pub fn duration(&self) -> f64 {
        match self {
            Entry::Rest(rest) => rest.duration(),
            _ => 0.0,
        }
    }
}

impl From<Rest> for Entry {
    fn from(value: Rest) -> Self {
        Self::Rest(value)
    }
}

impl From<Marker> for Entry {
    fn from(value: Marker) -> Self {
        Self::Marker(value)
    }
}

impl From<Box<dyn Event>> for Entry {
    fn from(value: Box<dyn Event>) -> Self {
        Self::Event(value)
    }
}
