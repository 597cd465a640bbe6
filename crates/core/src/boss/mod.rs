//! Demonstration boss encounter.
//!
//! An intro, a looping attack phase that picks a random pattern every four
//! beats, and an outro that stops the script. Every loop body rests, so the
//! self-expanding phase never stalls a drain.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    event::Entry,
    function::{ScriptContext, ScriptFunction, Sequence},
    timeline::{Cue, CueKind},
};

/// Attack patterns the phase loop chooses from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    Sweep,
    Spiral,
    Rain,
    Pincer,
}

impl Pattern {
    pub const ALL: [Pattern; 4] = [Pattern::Sweep, Pattern::Spiral, Pattern::Rain, Pattern::Pincer];

    /// Maps a uniform roll in `[0, 1)` onto a pattern.
    pub fn pick(roll: f64) -> Self {
        let scaled = (roll.clamp(0.0, 1.0) * Self::ALL.len() as f64) as usize;
        Self::ALL[scaled.min(Self::ALL.len() - 1)]
    }

    pub fn name(self) -> &'static str {
        match self {
            Pattern::Sweep => "sweep",
            Pattern::Spiral => "spiral",
            Pattern::Rain => "rain",
            Pattern::Pincer => "pincer",
        }
    }

    /// Appends four beats of this pattern.
    pub fn compose(self, seq: &mut Sequence) {
        match self {
            Pattern::Sweep => {
                seq.event(spawn("sweep-left"))
                    .rest(2.0)
                    .event(spawn("sweep-right"))
                    .rest(2.0);
            }
            Pattern::Spiral => {
                let zoom = Cue::new(0.0, "spiral-zoom", CueKind::Camera { zoom: 1.25 });
                seq.event(zoom.with_width(4.0)).event(spawn("spiral")).rest(4.0);
            }
            Pattern::Rain => {
                for lane in 0..4 {
                    seq.event(spawn(&format!("rain-{lane}"))).rest(1.0);
                }
            }
            Pattern::Pincer => {
                seq.event(lights("pincer-glow", "violet"))
                    .event(spawn("pincer-open"))
                    .rest(3.0)
                    .event(spawn("pincer-close"))
                    .rest(1.0);
            }
        }
    }
}

fn spawn(pattern: &str) -> Cue {
    Cue::new(
        0.0,
        pattern,
        CueKind::Spawn {
            pattern: pattern.to_string(),
        },
    )
}

fn lights(label: &str, color: &str) -> Cue {
    Cue::new(
        0.0,
        label,
        CueKind::Lighting {
            color: color.to_string(),
        },
    )
}

fn stem(label: &str, stem: &str) -> Cue {
    Cue::new(
        0.0,
        label,
        CueKind::MusicStem {
            stem: stem.to_string(),
        },
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    pub name: String,
    pub stem: String,
    /// Number of attack loops before the outro. `None` loops until the
    /// script is stopped from outside.
    pub loops: Option<u32>,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            name: "Warden".to_string(),
            stem: "drums_a".to_string(),
            loops: Some(4),
        }
    }
}

/// Entry point of the encounter; seed a script with it.
#[derive(Debug, Clone)]
pub struct Encounter {
    config: EncounterConfig,
}

impl Encounter {
    pub fn new(config: EncounterConfig) -> Self {
        Self { config }
    }
}

impl ScriptFunction for Encounter {
    fn events(&mut self, _ctx: &mut ScriptContext<'_>) -> Vec<Entry> {
        let mut seq = Sequence::new();
        seq.log(format!("{} encounter begins", self.config.name))
            .event(stem("intro-stem", &self.config.stem))
            .event(Cue::new(0.0, "intro-camera", CueKind::Camera { zoom: 1.5 }).with_width(4.0))
            .rest(4.0)
            .event(lights("intro-lights", "red"))
            .expand(PhaseLoop::new(self.config.loops));
        seq.into_entries()
    }
}

/// One four-beat attack, followed by the next iteration of itself.
#[derive(Debug, Clone)]
pub struct PhaseLoop {
    remaining: Option<u32>,
    iteration: u32,
}

impl PhaseLoop {
    pub fn new(loops: Option<u32>) -> Self {
        Self {
            remaining: loops,
            iteration: 0,
        }
    }
}

impl ScriptFunction for PhaseLoop {
    fn events(&mut self, ctx: &mut ScriptContext<'_>) -> Vec<Entry> {
        let mut seq = Sequence::new();
        if self.remaining == Some(0) {
            seq.expand(Outro);
            return seq.into_entries();
        }

        let pattern = Pattern::pick(ctx.rng().gen::<f64>());
        seq.note(format!("loop {} plays {}", self.iteration, pattern.name()));
        pattern.compose(&mut seq);
        seq.expand(PhaseLoop {
            remaining: self.remaining.map(|left| left - 1),
            iteration: self.iteration + 1,
        });
        seq.into_entries()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Outro;

impl ScriptFunction for Outro {
    fn events(&mut self, _ctx: &mut ScriptContext<'_>) -> Vec<Entry> {
        let mut seq = Sequence::new();
        seq.event(stem("outro-stem", "outro"))
            .event(lights("outro-lights", "white"))
            .rest(4.0)
            .log("encounter cleared")
            .stop();
        seq.into_entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{event::EventSink, script::Script, timeline::Timeline};

    fn play(config: EncounterConfig, seed: u64, until: f64) -> Timeline {
        let mut script = Script::new(8.0, 2.0).with_seed(seed).with_drain_limit(1_000);
        script.seed(Encounter::new(config));

        let mut timeline = Timeline::new();
        timeline.add_event(Box::new(script));
        while timeline.beat() < until {
            timeline.advance(0.25);
        }
        timeline
    }

    fn spawned(timeline: &Timeline) -> Vec<String> {
        timeline
            .fired()
            .iter()
            .filter(|record| matches!(record.kind, CueKind::Spawn { .. }))
            .map(|record| record.label.clone())
            .collect()
    }

    #[test]
    fn pick_covers_every_pattern() {
        assert_eq!(Pattern::pick(0.0), Pattern::Sweep);
        assert_eq!(Pattern::pick(0.3), Pattern::Spiral);
        assert_eq!(Pattern::pick(0.6), Pattern::Rain);
        assert_eq!(Pattern::pick(0.99), Pattern::Pincer);
        assert_eq!(Pattern::pick(1.0), Pattern::Pincer);
    }

    #[test]
    fn every_pattern_lasts_four_beats() {
        for pattern in Pattern::ALL {
            let mut seq = Sequence::new();
            pattern.compose(&mut seq);
            assert_eq!(seq.relative_beat(), 4.0, "{}", pattern.name());
        }
    }

    #[test]
    fn bounded_encounter_ends_with_outro() {
        let config = EncounterConfig {
            loops: Some(2),
            ..EncounterConfig::default()
        };
        let timeline = play(config, 11, 40.0);

        assert!(timeline.is_empty());
        let fired = timeline.fired();
        assert_eq!(fired[0].label, "intro-stem");
        assert_eq!(fired[0].scheduled_beat, 8.0);
        let last = fired.last().unwrap();
        assert_eq!(last.label, "outro-lights");
        assert_eq!(last.scheduled_beat, 20.0);
        assert!(fired.windows(2).all(|pair| pair[0].scheduled_beat <= pair[1].scheduled_beat));
    }

    #[test]
    fn same_seed_replays_same_patterns() {
        let first = play(EncounterConfig::default(), 42, 40.0);
        let second = play(EncounterConfig::default(), 42, 40.0);
        assert!(!spawned(&first).is_empty());
        assert_eq!(spawned(&first), spawned(&second));
    }

    #[test]
    fn endless_encounter_keeps_running() {
        let config = EncounterConfig {
            loops: None,
            ..EncounterConfig::default()
        };
        let timeline = play(config, 5, 200.0);

        assert!(!timeline.is_empty());
        assert!(spawned(&timeline).len() > 40);
        assert!(timeline.fired().iter().all(|record| record.label != "outro-stem"));
    }
}
