//! The beat-synchronized script scheduler.
//!
//! A [`Script`] is itself an [`Event`]: the host owns it and ticks it like
//! any other event. Every tick it drains its live queue until it reaches a
//! rest that is not yet due, converting relative entries into absolutely
//! positioned events on the host.
//!
//! Two clocks are involved. The host beat is whatever the host passes to
//! [`Script::drain`]. The script's own `internal_beat` only moves when a
//! [`Rest`](crate::event::Rest) is consumed. The script may process entries up
//! to `beat_runahead` beats before they are due, but every injected event
//! keeps its true beat.

use std::collections::VecDeque;

use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, error, info, trace};

use crate::{
    config::ScriptConfig,
    event::{Entry, Event, EventSink},
    function::{ScriptContext, ScriptFunction},
    timeline::TickContext,
    Result, ScriptError,
};

/// What a single [`Script::drain`] call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub injected: usize,
    pub rests: usize,
    pub expanded: usize,
    pub markers: usize,
}

impl DrainReport {
    /// Number of queue entries consumed.
    pub fn processed(&self) -> usize {
        self.injected + self.rests + self.expanded + self.markers
    }
}

#[derive(Debug)]
pub struct Script {
    label: String,
    start_beat: f64,
    beat_runahead: f64,
    internal_beat: f64,
    rest_until_engine_beat: f64,
    queue: VecDeque<Entry>,
    /// Set once the first entry has been consumed.
    draining: bool,
    stopped: bool,
    rng: StdRng,
    drain_limit: Option<usize>,
}

impl Script {
    /// Creates a script whose time zero is `start_beat`, allowed to inject
    /// events `beat_runahead` beats before they are due.
    pub fn new(start_beat: f64, beat_runahead: f64) -> Self {
        Self {
            label: "script".to_string(),
            start_beat,
            beat_runahead,
            internal_beat: 0.0,
            rest_until_engine_beat: start_beat - beat_runahead,
            queue: VecDeque::new(),
            draining: false,
            stopped: false,
            rng: StdRng::seed_from_u64(0),
            drain_limit: None,
        }
    }

    pub fn from_config(config: &ScriptConfig) -> Result<Self> {
        config.validate()?;
        let mut script = Self::new(config.start_beat, config.beat_runahead).with_seed(config.seed);
        if let Some(limit) = config.max_drain_steps {
            script = script.with_drain_limit(limit);
        }
        Ok(script)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Caps the number of entries a single drain may consume. Without a cap a
    /// loop body that never rests keeps the drain running forever.
    pub fn with_drain_limit(mut self, limit: usize) -> Self {
        self.drain_limit = Some(limit);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start_beat(&self) -> f64 {
        self.start_beat
    }

    pub fn beat_runahead(&self) -> f64 {
        self.beat_runahead
    }

    pub fn internal_beat(&self) -> f64 {
        self.internal_beat
    }

    /// Host beat before which the script will not resume draining.
    pub fn rest_until_engine_beat(&self) -> f64 {
        self.rest_until_engine_beat
    }

    /// Entries still waiting in the live queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Queues a function; its entries are produced when the drain reaches it.
    pub fn seed(&mut self, function: impl ScriptFunction + 'static) {
        self.add_event_to_queue(Entry::expand(function));
    }

    pub fn add_event_to_queue(&mut self, entry: impl Into<Entry>) {
        self.queue.push_back(entry.into());
    }

    pub fn add_events_to_queue(&mut self, entries: impl IntoIterator<Item = Entry>) {
        self.queue.extend(entries);
    }

    /// Stops further draining. Events already handed to the host are not
    /// retracted.
    pub fn stop(&mut self) {
        if !self.stopped {
            info!(script = %self.label, internal_beat = self.internal_beat, "script stopped");
        }
        self.stopped = true;
    }

    pub fn ready_to_delete(&self) -> bool {
        self.stopped
    }

    /// Processes queued entries while `current_beat` has reached the point the
    /// script is resting until.
    ///
    /// Entries appended by expansions during the drain are visible to the same
    /// pass, so an expansion that is already due is fully processed before
    /// this returns.
    pub fn drain<S>(&mut self, current_beat: f64, sink: &mut S) -> Result<DrainReport>
    where
        S: EventSink + ?Sized,
    {
        let mut report = DrainReport::default();
        if self.stopped || current_beat < self.rest_until_engine_beat {
            return Ok(report);
        }

        while current_beat >= self.rest_until_engine_beat {
            let Some(entry) = self.queue.pop_front() else {
                break;
            };
            self.draining = true;
            if let Some(limit) = self.drain_limit {
                if report.processed() >= limit {
                    self.queue.push_front(entry);
                    return Err(ScriptError::DrainLimitExceeded {
                        limit,
                        beat: current_beat,
                    });
                }
            }

            match entry {
                Entry::Rest(rest) => {
                    let duration = rest.duration();
                    if duration.is_nan() || duration < 0.0 {
                        return Err(ScriptError::InvalidRest(duration));
                    }
                    self.rest_until_engine_beat =
                        self.start_beat + self.internal_beat + duration - self.beat_runahead;
                    self.internal_beat += duration;
                    report.rests += 1;
                }
                Entry::Event(mut event) => {
                    let beat = event.beat() + self.start_beat + self.internal_beat;
                    event.set_beat(beat);
                    trace!(script = %self.label, beat, now = current_beat, "injecting event");
                    sink.add_event(event);
                    report.injected += 1;
                }
                Entry::Expand(mut function) => {
                    let mut ctx = ScriptContext::new(
                        self.start_beat,
                        self.beat_runahead,
                        self.internal_beat,
                        current_beat,
                        &mut self.rng,
                    );
                    let entries = function.events(&mut ctx);
                    debug!(
                        script = %self.label,
                        ?function,
                        entries = entries.len(),
                        internal_beat = self.internal_beat,
                        "expanding function"
                    );
                    self.queue.extend(entries);
                    report.expanded += 1;
                }
                Entry::Marker(marker) => {
                    marker.emit(&self.label, self.start_beat + self.internal_beat);
                    report.markers += 1;
                }
                Entry::Stop => {
                    self.stop();
                    break;
                }
            }
        }

        if report.rests > 0 {
            debug!(
                script = %self.label,
                now = current_beat,
                resting_until = self.rest_until_engine_beat,
                pending = self.queue.len(),
                "script resting"
            );
        }
        Ok(report)
    }
}

impl Event for Script {
    fn beat(&self) -> f64 {
        self.start_beat - self.beat_runahead
    }

    /// Moves the whole script so that its own beat becomes `beat`. Once the
    /// script has consumed an entry its timing is committed and this is
    /// ignored.
    fn set_beat(&mut self, beat: f64) {
        if self.draining {
            debug!(script = %self.label, beat, "ignoring move of a script that already drained");
            return;
        }
        self.start_beat = beat + self.beat_runahead;
        self.rest_until_engine_beat = beat;
    }

    fn width(&self) -> f64 {
        f64::INFINITY
    }

    fn on_update(&mut self, ctx: &mut TickContext<'_>) {
        let now = ctx.beat();
        if let Err(err) = self.drain(now, ctx) {
            error!(script = %self.label, now, %err, "script drain failed");
            self.stop();
        }
    }

    fn ready_to_delete(&self) -> bool {
        Script::ready_to_delete(self)
    }
}
