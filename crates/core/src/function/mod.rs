use std::fmt;

use rand::rngs::StdRng;

use crate::event::{Entry, Event, Marker, Rest};

/// View of the owning script handed to a [`ScriptFunction`] when it is
/// expanded.
pub struct ScriptContext<'a> {
    start_beat: f64,
    beat_runahead: f64,
    internal_beat: f64,
    current_beat: f64,
    rng: &'a mut StdRng,
}

impl<'a> ScriptContext<'a> {
    pub fn new(
        start_beat: f64,
        beat_runahead: f64,
        internal_beat: f64,
        current_beat: f64,
        rng: &'a mut StdRng,
    ) -> Self {
        Self {
            start_beat,
            beat_runahead,
            internal_beat,
            current_beat,
            rng,
        }
    }

    pub fn start_beat(&self) -> f64 {
        self.start_beat
    }

    pub fn beat_runahead(&self) -> f64 {
        self.beat_runahead
    }

    /// Script time committed so far, in beats since `start_beat`.
    pub fn internal_beat(&self) -> f64 {
        self.internal_beat
    }

    /// Host clock value of the drain that triggered the expansion.
    pub fn current_beat(&self) -> f64 {
        self.current_beat
    }

    /// Absolute beat that relative beat `0` of the expanded entries maps to.
    pub fn absolute_beat(&self) -> f64 {
        self.start_beat + self.internal_beat
    }

    /// Seeded generator shared by every function of the same script.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }
}

impl fmt::Debug for ScriptContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("start_beat", &self.start_beat)
            .field("beat_runahead", &self.beat_runahead)
            .field("internal_beat", &self.internal_beat)
            .field("current_beat", &self.current_beat)
            .finish()
    }
}

/// One composable subroutine of scripted behaviour.
///
/// Beats in the returned entries are relative: `0` is the moment this
/// subroutine logically starts. Functions are expanded once and dropped.
pub trait ScriptFunction: fmt::Debug {
    fn events(&mut self, ctx: &mut ScriptContext<'_>) -> Vec<Entry>;
}

/// Builder for the entry list of a single subroutine.
#[derive(Debug, Default)]
pub struct Sequence {
    entries: Vec<Entry>,
    relative_beat: f64,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Beats covered by the rests appended so far.
    pub fn relative_beat(&self) -> f64 {
        self.relative_beat
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: Entry) -> &mut Self {
        self.relative_beat += entry.duration();
        self.entries.push(entry);
        self
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = Entry>) -> &mut Self {
        for entry in entries {
            self.push(entry);
        }
        self
    }

    /// Appends a literal event at the current tail.
    pub fn event(&mut self, event: impl Event + 'static) -> &mut Self {
        self.push(Entry::event(event))
    }

    pub fn rest(&mut self, duration: f64) -> &mut Self {
        self.push(Entry::Rest(Rest::new(duration)))
    }

    /// Appends a nested subroutine, expanded when the script reaches it.
    pub fn expand(&mut self, function: impl ScriptFunction + 'static) -> &mut Self {
        self.push(Entry::expand(function))
    }

    pub fn note(&mut self, message: impl Into<String>) -> &mut Self {
        self.push(Entry::Marker(Marker::Note(message.into())))
    }

    pub fn todo(&mut self, message: impl Into<String>) -> &mut Self {
        self.push(Entry::Marker(Marker::Todo(message.into())))
    }

    pub fn log(&mut self, message: impl Into<String>) -> &mut Self {
        self.push(Entry::Marker(Marker::Log(message.into())))
    }

    pub fn stop(&mut self) -> &mut Self {
        self.push(Entry::Stop)
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

/// Closure-backed [`ScriptFunction`], see [`from_fn`].
pub struct FnFunction<F> {
    name: &'static str,
    f: F,
}

impl<F> fmt::Debug for FnFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFunction").field("name", &self.name).finish()
    }
}

impl<F> ScriptFunction for FnFunction<F>
where
    F: FnMut(&mut ScriptContext<'_>) -> Vec<Entry>,
{
    fn events(&mut self, ctx: &mut ScriptContext<'_>) -> Vec<Entry> {
        (self.f)(ctx)
    }
}

/// Wraps a closure as a named script function.
pub fn from_fn<F>(name: &'static str, f: F) -> FnFunction<F>
where
    F: FnMut(&mut ScriptContext<'_>) -> Vec<Entry>,
{
    FnFunction { name, f }
}
