use std::path::{Path, PathBuf};

use beatscript_core::{AppConfig, CueKind, CueRecord, Encounter, EventSink, Script, Timeline};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> beatscript_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            beats,
            json,
        } => run_encounter(config.as_deref(), beats, json),
        Commands::Config { output } => write_config(output.as_deref()),
    }
}

fn run_encounter(
    path: Option<&Path>,
    beats: Option<f64>,
    json: bool,
) -> beatscript_core::Result<()> {
    let mut config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(beats) = beats {
        config.playback.length_beats = beats;
    }
    config.validate()?;
    tracing::info!(
        encounter = %config.encounter.name,
        start_beat = config.script.start_beat,
        runahead = config.script.beat_runahead,
        length = config.playback.length_beats,
        "starting encounter"
    );

    let mut script = Script::from_config(&config.script)?.with_label(config.encounter.name.clone());
    script.seed(Encounter::new(config.encounter.clone()));

    let mut timeline = Timeline::new();
    timeline.add_event(Box::new(script));
    let tick_seconds = config.playback.tick_seconds();
    let mut ticks = 0u64;
    while timeline.beat() < config.playback.length_beats {
        timeline.advance_seconds(tick_seconds, config.playback.bpm);
        ticks += 1;
    }

    let fired = timeline.take_fired();
    tracing::info!(
        cues = fired.len(),
        live_events = timeline.len(),
        seconds = ticks as f64 * tick_seconds,
        "playback finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&fired)?);
    } else {
        for record in &fired {
            println!("{}", describe(record));
        }
    }
    Ok(())
}

fn write_config(output: Option<&Path>) -> beatscript_core::Result<()> {
    let rendered = AppConfig::default().to_json_pretty()?;
    match output {
        Some(path) => {
            tracing::info!(?path, "writing default configuration");
            std::fs::write(path, rendered)?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn describe(record: &CueRecord) -> String {
    let detail = match &record.kind {
        CueKind::MusicStem { stem } => format!("stem {stem}"),
        CueKind::Spawn { pattern } => format!("spawn {pattern}"),
        CueKind::Camera { zoom } => format!("camera zoom {zoom}"),
        CueKind::Lighting { color } => format!("lights {color}"),
    };
    format!("{:>8.2}  {:<16} {detail}", record.scheduled_beat, record.label)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Beat-synchronized encounter scripting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the demonstration encounter and print the cues it fired.
    Run {
        /// JSON configuration file. Defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override how many beats of playback to simulate.
        #[arg(short, long)]
        beats: Option<f64>,
        /// Print fired cues as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Write the default configuration as JSON.
    Config {
        /// Destination file. Prints to stdout when omitted.
        output: Option<PathBuf>,
    },
}
