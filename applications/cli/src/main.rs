/// Verso - daily chapter listening from one audio asset
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verso_audio_desktop::DesktopRenderGraph;
use verso_cli::{format_time, AppConfig, DayReading, DayState, UserCommand};
use verso_playback::{
    load_chapter_table, ChapterOffset, Command, PlaybackEvent, PlayerHandle, PlayerService,
    ReadingPlan,
};

#[derive(Parser)]
#[command(name = "verso")]
#[command(about = "Listen to the day's chapters from a single audio asset", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "VERSO_CONFIG")]
    config: Option<PathBuf>,

    /// Plan day to use instead of the saved one
    #[arg(short, long)]
    day: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the day's chapters with an interactive prompt (default)
    Play {
        /// Load the chapters without starting playback
        #[arg(long)]
        paused: bool,
    },
    /// Show the day's chapters without opening an audio device
    List,
    /// Print the chapter-offset table
    Chapters,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the prompt
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "verso=info,verso_cli=info,verso_playback=info,verso_audio_desktop=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;

    match cli.command.unwrap_or(Commands::Play { paused: false }) {
        Commands::Play { paused } => play(&config, cli.day, paused)?,
        Commands::List => list(&config, cli.day)?,
        Commands::Chapters => chapters(&config)?,
    }

    Ok(())
}

fn load_table(config: &AppConfig) -> anyhow::Result<Vec<ChapterOffset>> {
    load_chapter_table(&config.paths.chapters).with_context(|| {
        format!(
            "Failed to load chapter table {}",
            config.paths.chapters.display()
        )
    })
}

fn load_plan(config: &AppConfig) -> anyhow::Result<ReadingPlan> {
    ReadingPlan::load(&config.paths.plan)
        .with_context(|| format!("Failed to load reading plan {}", config.paths.plan.display()))
}

/// Saved day, unless overridden on the command line
fn starting_day(state_path: &Path, day: Option<u32>) -> anyhow::Result<DayState> {
    Ok(match day {
        Some(day) => DayState::with_day(day),
        None => DayState::load(state_path)?,
    })
}

fn list(config: &AppConfig, day: Option<u32>) -> anyhow::Result<()> {
    let table = load_table(config)?;
    let plan = load_plan(config)?;
    let state = starting_day(&config.paths.state, day)?;

    print!("{}", DayReading::resolve(&plan, &table, state.day).summary());
    Ok(())
}

fn chapters(config: &AppConfig) -> anyhow::Result<()> {
    let table = load_table(config)?;
    for chapter in &table {
        println!(
            "{:>5}  {:<24} {:>9} - {:>9}",
            chapter.id,
            chapter.name,
            format_time(chapter.start_offset),
            format_time(chapter.end_offset)
        );
    }
    println!("{} chapters", table.len());
    Ok(())
}

fn play(config: &AppConfig, day: Option<u32>, paused: bool) -> anyhow::Result<()> {
    let table = load_table(config)?;
    let plan = load_plan(config)?;
    let mut state = starting_day(&config.paths.state, day)?;

    tracing::info!("Starting Verso");
    tracing::info!("Asset: {}", config.paths.asset.display());

    let graph = DesktopRenderGraph::new(config.audio.clone())?;
    if let Some(rate) = graph.device_rate() {
        tracing::info!("Output device running at {} Hz", rate);
    }

    let handle = PlayerService::init(config.playback.clone(), Box::new(graph))?;
    let asset = handle
        .load_asset(config.paths.asset.clone())
        .with_context(|| format!("Failed to open {}", config.paths.asset.display()))?;
    tracing::info!(
        "Asset loaded: {} at {} Hz",
        format_time(asset.duration),
        asset.sample_rate
    );

    let events = handle.events().clone();
    let printer = thread::Builder::new()
        .name("verso-events".to_string())
        .spawn(move || {
            for event in events {
                print_event(&event);
            }
        })?;

    let state_path = config.paths.state.as_path();
    load_day(&handle, &plan, &table, state, state_path, !paused)?;
    println!("Type 'help' for commands.");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<UserCommand>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let next_state = match command {
            UserCommand::Quit => break,
            UserCommand::Help => {
                println!("{}", verso_cli::commands::HELP);
                None
            }
            UserCommand::Status => {
                print_status(&handle)?;
                None
            }
            UserCommand::List => {
                print!("{}", DayReading::resolve(&plan, &table, state.day).summary());
                None
            }
            UserCommand::Day(day) => Some(DayState::with_day(day)),
            UserCommand::NextDay => Some(state.next()),
            UserCommand::PreviousDay => Some(state.previous()),
            command => {
                let snapshot = handle.snapshot()?;
                match command.to_service_command(&snapshot) {
                    Some(service_command) => handle.send(service_command)?,
                    None => println!("No such chapter in today's list"),
                }
                None
            }
        };

        if let Some(next) = next_state {
            state = next;
            load_day(&handle, &plan, &table, state, state_path, true)?;
        }
    }

    handle.shutdown();
    if printer.join().is_err() {
        tracing::warn!("Event printer thread panicked");
    }
    tracing::info!("Stopped on day {}", state.day);

    Ok(())
}

/// Persist `state` and hand its chapters to the player
fn load_day(
    handle: &PlayerHandle,
    plan: &ReadingPlan,
    table: &[ChapterOffset],
    state: DayState,
    state_path: &Path,
    autoplay: bool,
) -> anyhow::Result<()> {
    let reading = DayReading::resolve(plan, table, state.day);
    print!("{}", reading.summary());

    if reading.segments.len() < reading.readings.len() {
        tracing::warn!(
            "{} of day {}'s chapters are missing from the chapter table",
            reading.readings.len() - reading.segments.len(),
            state.day
        );
    }

    let has_segments = !reading.segments.is_empty();
    handle.send(Command::SetSegments(reading.segments))?;
    if autoplay && has_segments {
        handle.send(Command::SelectSegment {
            index: 0,
            from_time: None,
        })?;
    }

    // A failed save only loses the resume point
    if let Err(e) = state.save(state_path) {
        tracing::warn!("Failed to save day {}: {}", state.day, e);
    }
    Ok(())
}

fn print_status(handle: &PlayerHandle) -> anyhow::Result<()> {
    let snapshot = handle.snapshot()?;
    let Some(segment) = snapshot.segments.get(snapshot.active_index) else {
        println!("No chapters loaded");
        return Ok(());
    };

    let state = match (snapshot.is_scrubbing, snapshot.is_playing) {
        (true, _) => "scrubbing",
        (false, true) => "playing",
        (false, false) => "paused",
    };
    println!(
        "[{}/{}] {} {} / {} ({}, {}x)",
        snapshot.active_index + 1,
        snapshot.segments.len(),
        segment.title(),
        format_time(snapshot.elapsed),
        format_time(snapshot.duration),
        state,
        snapshot.rate
    );
    Ok(())
}

fn print_event(event: &PlaybackEvent) {
    match event {
        PlaybackEvent::SegmentChanged { index, title } => {
            println!("\n>> {}. {}", index + 1, title);
        }
        PlaybackEvent::StateChanged { is_playing } => {
            tracing::debug!("Playing: {}", is_playing);
        }
        PlaybackEvent::SegmentsReplaced {
            count,
            total_duration,
        } => {
            tracing::debug!("{} chapters, {}", count, format_time(*total_duration));
        }
        PlaybackEvent::QueueFinished => println!("\nFinished today's reading."),
        PlaybackEvent::Error { message } => println!("\nPlayback error: {}", message),
        // Position updates arrive every tick; `status` shows them on demand
        PlaybackEvent::NowPlaying(_) => {}
    }
}
