use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use reverie::{Director, DirectorEvent, InMemoryAudio, Script, Time, Vec2};

#[derive(Parser, Debug)]
#[command(name = "reverie", version)]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a script JSON.
    Validate(ValidateArgs),
    /// Run a script headlessly against the in-memory audio backend and print the event log.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Script JSON.
    script: PathBuf,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Script JSON.
    script: PathBuf,

    /// Stop after this many simulated seconds.
    #[arg(long, default_value_t = 300.0)]
    until: f64,

    /// Simulated frame rate.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 720.0)]
    height: f64,

    /// Block autoplay until the first gesture.
    #[arg(long, default_value_t = false)]
    blocked: bool,

    /// Send the first user gesture at this time (seconds).
    #[arg(long)]
    gesture_at: Option<f64>,

    /// Press the continue affordance as soon as it accepts presses.
    #[arg(long, default_value_t = false)]
    auto_continue: bool,

    /// Tap the manual blow affordance at this time (seconds).
    #[arg(long)]
    blow_at: Option<f64>,

    /// Start voice messages as soon as they appear; they last this many seconds.
    #[arg(long)]
    voice_secs: Option<f64>,

    /// Print events as JSON lines.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Simulate(args) => cmd_simulate(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> anyhow::Result<Script> {
    let script =
        Script::from_path(path).with_context(|| format!("load script '{}'", path.display()))?;
    script
        .validate()
        .with_context(|| format!("validate script '{}'", path.display()))?;
    Ok(script)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let script = load(&args.script)?;
    let beats: usize = script.scenes.iter().map(|s| s.beats.len()).sum();
    eprintln!(
        "ok: {} scenes, {beats} beats, start '{}'",
        script.scenes.len(),
        script.start
    );
    Ok(())
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.fps > 0, "--fps must be positive");
    anyhow::ensure!(
        args.until.is_finite() && args.until >= 0.0,
        "--until must be finite and >= 0"
    );
    let script = load(&args.script)?;

    let backend = if args.blocked {
        InMemoryAudio::autoplay_blocked()
    } else {
        InMemoryAudio::new()
    };
    let mut director = Director::new(script, backend, Vec2::new(args.width, args.height))?
        .with_microphone_api(false);

    let mut gesture_at = args.gesture_at;
    let mut blow_at = args.blow_at;
    let last_frame = (args.until * f64::from(args.fps)).ceil() as u64;

    director.start();
    for frame in 0..=last_frame {
        let now = Time::from_secs(frame as f64 / f64::from(args.fps));
        director.advance(now);

        if gesture_at.is_some_and(|t| now.secs() >= t) {
            gesture_at = None;
            director.backend_mut().unlock();
            director.user_gesture();
        }
        if blow_at.is_some_and(|t| now.secs() >= t) && director.tap_blow() {
            blow_at = None;
        }
        if args.auto_continue && director.choreographer().continue_visible() {
            director.press_continue();
        }

        for (at, event) in director.drain_events() {
            if let (Some(secs), DirectorEvent::VoicePlayerShown { path }) =
                (args.voice_secs, &event)
            {
                director.backend_mut().set_duration(path.clone(), secs);
                director.toggle_voice();
            }
            print_event(at, &event, args.json)?;
        }

        if director.choreographer().is_finished() {
            break;
        }
    }

    // Flush anything the final frame's follow-ups produced.
    for (at, event) in director.drain_events() {
        print_event(at, &event, args.json)?;
    }
    eprintln!("{:#?}", director.snapshot());
    Ok(())
}

fn print_event(at: Time, event: &DirectorEvent, json: bool) -> anyhow::Result<()> {
    if json {
        let line = serde_json::json!({ "t": at.secs(), "event": event });
        println!("{}", serde_json::to_string(&line).context("serialize event")?);
    } else {
        println!("{:>9.3}s  {event:?}", at.secs());
    }
    Ok(())
}
