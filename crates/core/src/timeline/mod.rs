use serde::{Deserialize, Serialize};

use crate::event::{Event, EventSink};

/// Monotonic beat clock driving a [`Timeline`].
#[derive(Debug, Default, Clone)]
pub struct BeatClock {
    pub beat: f64,
}

impl BeatClock {
    pub fn reset(&mut self) {
        self.beat = 0.0;
    }

    /// Moves the clock forward. Negative deltas are ignored.
    pub fn advance(&mut self, delta: f64) {
        self.beat += delta.max(0.0);
    }

    pub fn advance_seconds(&mut self, seconds: f64, bpm: f64) {
        self.advance(seconds * bpm / 60.0);
    }
}

/// Payload carried by a [`Cue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CueKind {
    MusicStem { stem: String },
    Spawn { pattern: String },
    Camera { zoom: f64 },
    Lighting { color: String },
}

/// Domain event handed off by scripts. The timeline only records when it
/// fired; what a stem change or spawn does is up to the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub beat: f64,
    #[serde(default)]
    pub width: f64,
    pub label: String,
    pub kind: CueKind,
}

impl Cue {
    pub fn new(beat: f64, label: impl Into<String>, kind: CueKind) -> Self {
        Self {
            beat,
            width: 0.0,
            label: label.into(),
            kind,
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }
}

impl Event for Cue {
    fn beat(&self) -> f64 {
        self.beat
    }

    fn set_beat(&mut self, beat: f64) {
        self.beat = beat;
    }

    fn width(&self) -> f64 {
        self.width
    }

    fn on_start(&mut self, ctx: &mut TickContext<'_>) {
        tracing::debug!(label = %self.label, beat = self.beat, now = ctx.beat(), "cue fired");
        ctx.record(CueRecord {
            label: self.label.clone(),
            kind: self.kind.clone(),
            scheduled_beat: self.beat,
            fired_beat: ctx.beat(),
        });
    }
}

/// A cue as observed by the timeline when it started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueRecord {
    pub label: String,
    pub kind: CueKind,
    pub scheduled_beat: f64,
    pub fired_beat: f64,
}

/// Per-event view of the host during one tick.
pub struct TickContext<'a> {
    beat: f64,
    spawned: &'a mut Vec<Box<dyn Event>>,
    fired: &'a mut Vec<CueRecord>,
}

impl<'a> TickContext<'a> {
    pub fn new(
        beat: f64,
        spawned: &'a mut Vec<Box<dyn Event>>,
        fired: &'a mut Vec<CueRecord>,
    ) -> Self {
        Self {
            beat,
            spawned,
            fired,
        }
    }

    /// Current host clock value.
    pub fn beat(&self) -> f64 {
        self.beat
    }

    pub fn record(&mut self, record: CueRecord) {
        self.fired.push(record);
    }
}

impl EventSink for TickContext<'_> {
    fn add_event(&mut self, event: Box<dyn Event>) {
        self.spawned.push(event);
    }
}

#[derive(Debug)]
struct Slot {
    event: Box<dyn Event>,
    started: bool,
    ended: bool,
}

impl Slot {
    fn new(event: Box<dyn Event>) -> Self {
        Self {
            event,
            started: false,
            ended: false,
        }
    }

    fn step(&mut self, ctx: &mut TickContext<'_>) {
        let beat = ctx.beat();
        if !self.started {
            if beat < self.event.beat() {
                return;
            }
            self.event.on_start(ctx);
            self.started = true;
        }
        if self.ended {
            return;
        }

        self.event.on_update(ctx);
        if beat >= self.event.beat() + self.event.width() {
            self.event.on_end(ctx);
            self.ended = true;
        }
    }

    /// Ends an event that asked to be deleted before its width ran out.
    fn retire(&mut self, ctx: &mut TickContext<'_>) {
        if self.started && !self.ended && self.event.ready_to_delete() {
            self.event.on_end(ctx);
            self.ended = true;
        }
    }

    fn finished(&self) -> bool {
        self.ended || self.event.ready_to_delete()
    }
}

/// Single-threaded host that owns events and runs their lifecycle against a
/// [`BeatClock`].
///
/// Events added while a tick is being processed are visited in that same
/// tick, after everything that was already queued.
#[derive(Debug, Default)]
pub struct Timeline {
    clock: BeatClock,
    slots: Vec<Slot>,
    fired: Vec<CueRecord>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beat(&self) -> f64 {
        self.clock.beat
    }

    /// Number of live events.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn fired(&self) -> &[CueRecord] {
        &self.fired
    }

    pub fn take_fired(&mut self) -> Vec<CueRecord> {
        std::mem::take(&mut self.fired)
    }

    pub fn advance(&mut self, delta: f64) {
        self.clock.advance(delta);
        self.process();
    }

    /// Advances by a wall-clock duration at the given tempo.
    pub fn advance_seconds(&mut self, seconds: f64, bpm: f64) {
        self.clock.advance_seconds(seconds, bpm);
        self.process();
    }

    pub fn advance_to(&mut self, beat: f64) {
        self.advance(beat - self.clock.beat);
    }

    /// Runs one tick at the current clock value.
    pub fn process(&mut self) {
        let beat = self.clock.beat;
        let mut spawned = Vec::new();
        let mut index = 0;
        while index < self.slots.len() {
            {
                let mut ctx = TickContext::new(beat, &mut spawned, &mut self.fired);
                self.slots[index].step(&mut ctx);
            }
            self.slots.extend(spawned.drain(..).map(Slot::new));
            index += 1;
        }

        {
            let mut ctx = TickContext::new(beat, &mut spawned, &mut self.fired);
            for slot in &mut self.slots {
                slot.retire(&mut ctx);
            }
        }

        let before = self.slots.len();
        self.slots.retain(|slot| !slot.finished());
        // Events spawned by end hooks start on the next tick.
        self.slots.extend(spawned.drain(..).map(Slot::new));
        tracing::trace!(beat, removed = before - self.slots.len(), live = self.slots.len(), "tick");
    }
}

impl EventSink for Timeline {
    fn add_event(&mut self, event: Box<dyn Event>) {
        self.slots.push(Slot::new(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(beat: f64, label: &str) -> Box<dyn Event> {
        Box::new(Cue::new(
            beat,
            label,
            CueKind::Spawn {
                pattern: label.to_string(),
            },
        ))
    }

    /// Emits a cue at the current beat every time it starts.
    #[derive(Debug)]
    struct Spawner {
        beat: f64,
    }

    impl Event for Spawner {
        fn beat(&self) -> f64 {
            self.beat
        }

        fn set_beat(&mut self, beat: f64) {
            self.beat = beat;
        }

        fn on_start(&mut self, ctx: &mut TickContext<'_>) {
            ctx.add_event(cue(ctx.beat(), "child"));
        }
    }

    /// Infinitely wide event that asks to be deleted from beat 2 on.
    #[derive(Debug)]
    struct Lingering {
        beat: f64,
        done: bool,
    }

    impl Event for Lingering {
        fn beat(&self) -> f64 {
            self.beat
        }

        fn set_beat(&mut self, beat: f64) {
            self.beat = beat;
        }

        fn width(&self) -> f64 {
            f64::INFINITY
        }

        fn on_update(&mut self, ctx: &mut TickContext<'_>) {
            self.done = ctx.beat() >= 2.0;
        }

        fn on_end(&mut self, ctx: &mut TickContext<'_>) {
            ctx.record(CueRecord {
                label: "lingering-end".into(),
                kind: CueKind::Lighting {
                    color: "off".into(),
                },
                scheduled_beat: self.beat,
                fired_beat: ctx.beat(),
            });
        }

        fn ready_to_delete(&self) -> bool {
            self.done
        }
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut clock = BeatClock::default();
        clock.advance(2.0);
        clock.advance(-1.0);
        assert_eq!(clock.beat, 2.0);

        clock.advance_seconds(1.0, 120.0);
        assert_eq!(clock.beat, 4.0);

        clock.reset();
        assert_eq!(clock.beat, 0.0);
    }

    #[test]
    fn cues_fire_once_their_beat_is_reached() {
        let mut timeline = Timeline::new();
        timeline.add_event(cue(2.0, "late"));
        timeline.add_event(cue(1.0, "early"));

        timeline.advance_to(1.0);
        let fired = timeline.take_fired();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].label, "early");

        timeline.advance_to(3.0);
        let fired = timeline.take_fired();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].label, "late");
        assert_eq!(fired[0].scheduled_beat, 2.0);
        assert_eq!(fired[0].fired_beat, 3.0);
        assert!(timeline.is_empty());
    }

    #[test]
    fn wide_events_stay_alive_until_their_end() {
        let mut timeline = Timeline::new();
        let camera = Cue::new(0.0, "pan", CueKind::Camera { zoom: 2.0 }).with_width(4.0);
        timeline.add_event(Box::new(camera));

        timeline.advance_to(1.0);
        assert_eq!(timeline.len(), 1);
        timeline.advance_to(4.0);
        assert!(timeline.is_empty());
        assert_eq!(timeline.fired().len(), 1);
    }

    #[test]
    fn events_spawned_during_a_tick_run_in_the_same_tick() {
        let mut timeline = Timeline::new();
        timeline.add_event(Box::new(Spawner { beat: 0.0 }));

        timeline.process();
        assert_eq!(timeline.fired().len(), 1);
        assert_eq!(timeline.fired()[0].label, "child");
        assert!(timeline.is_empty());
    }

    #[test]
    fn deleted_events_still_get_their_end_hook() {
        let mut timeline = Timeline::new();
        timeline.add_event(Box::new(Lingering {
            beat: 0.0,
            done: false,
        }));

        timeline.advance_to(1.0);
        assert_eq!(timeline.len(), 1);
        assert!(timeline.fired().is_empty());

        timeline.advance_to(2.0);
        timeline.advance_to(3.0);
        assert!(timeline.is_empty());
        let fired = timeline.take_fired();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].label, "lingering-end");
        assert_eq!(fired[0].fired_beat, 2.0);
    }

    #[test]
    fn advances_by_seconds_at_tempo() {
        let mut timeline = Timeline::new();
        timeline.add_event(cue(1.0, "downbeat"));

        timeline.advance_seconds(0.25, 120.0);
        assert_eq!(timeline.beat(), 0.5);
        assert!(timeline.fired().is_empty());

        timeline.advance_seconds(0.25, 120.0);
        assert_eq!(timeline.beat(), 1.0);
        assert_eq!(timeline.fired()[0].label, "downbeat");
    }

    #[test]
    fn records_serialize_with_tagged_kinds() {
        let record = CueRecord {
            label: "stem".into(),
            kind: CueKind::MusicStem {
                stem: "drums".into(),
            },
            scheduled_beat: 8.0,
            fired_beat: 8.25,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"]["type"], "music_stem");
        assert_eq!(json["kind"]["stem"], "drums");
    }
}
