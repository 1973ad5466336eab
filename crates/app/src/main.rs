use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use therapy_player_core::{
    AppConfig, InMemoryProfile, PlaybackController, PlayerError, Playlist, ProfileStore,
    ProgressTracker, RenderMode, SimulatedTransport, StaticCatalog, TrackCatalog,
    VisualizationRenderer,
};
use tracing_subscriber::EnvFilter;

const BUILTIN_CATALOG: &str = include_str!("../catalog.json");
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const FRAMES_PER_REPORT: u32 = 60;

fn main() -> therapy_player_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let playlist = load_playlist(cli.catalog.as_ref())?;

    match cli.command {
        Commands::Tracks { saved } => list_tracks(&playlist, &saved),
        Commands::Demo {
            frames,
            mode,
            skip_every,
        } => run_demo(config, playlist, frames, mode, skip_every),
        Commands::Snapshot {
            track,
            mode,
            frames,
            output,
        } => run_snapshot(config, playlist, &track, mode, frames, &output),
    }
}

fn load_playlist(path: Option<&PathBuf>) -> therapy_player_core::Result<Playlist> {
    let catalog = match path {
        Some(path) => StaticCatalog::load(path)?,
        None => StaticCatalog::from_json_str(BUILTIN_CATALOG)?,
    };
    catalog.playlist()
}

fn build_controller(
    config: &AppConfig,
    playlist: Playlist,
) -> PlaybackController<SimulatedTransport> {
    let transport = SimulatedTransport::for_playlist(&playlist, config.analysis.sample_rate);
    PlaybackController::new(
        transport,
        playlist,
        config.playback.clone(),
        config.analysis.clone(),
    )
}

fn list_tracks(playlist: &Playlist, saved: &[String]) -> therapy_player_core::Result<()> {
    let mut profile = InMemoryProfile::new();
    for id in saved {
        profile.save_track(id);
    }

    for track in playlist {
        let marker = if profile.is_track_saved(&track.id) { "*" } else { " " };
        println!(
            "{marker} {:>3}  {:<20} {:<20} {:>6}  {}",
            track.id,
            track.title,
            track.artist,
            therapy_player_core::format_time(track.duration),
            track.category
        );
    }
    Ok(())
}

fn run_demo(
    config: AppConfig,
    playlist: Playlist,
    frames: u32,
    mode: Option<RenderMode>,
    skip_every: Option<u32>,
) -> therapy_player_core::Result<()> {
    let mut visualization = config.visualization.clone();
    if let Some(mode) = mode {
        visualization.mode = mode;
    }
    tracing::info!(frames, mode = %visualization.mode, "starting demo session");

    let mut player = build_controller(&config, playlist);
    let mut tracker = ProgressTracker::new();
    let mut renderer = VisualizationRenderer::new(visualization);

    player.toggle_play();
    for frame in 1..=frames {
        if skip_every.is_some_and(|every| every > 0 && frame % every == 0) {
            player.next_track();
        }

        player.pump(FRAME_INTERVAL);
        for event in player.drain_events() {
            tracing::debug!(?event, "playback event");
            tracker.handle(&event);
            renderer.handle(&event);
        }
        let shapes = renderer.animation_frame(&mut player).shapes.len();

        if frame % FRAMES_PER_REPORT == 0 {
            let title = player
                .current_track()
                .map(|track| track.title.as_str())
                .unwrap_or("-");
            tracing::info!(
                track = title,
                status = ?player.status(),
                progress = %format!("{} / {}", tracker.elapsed_label(), tracker.duration_label()),
                percent = %format!("{:.1}", tracker.percentage()),
                shapes,
                "progress"
            );
        }
    }

    renderer.unmount();
    player.shutdown();
    tracing::info!(drawn = renderer.frames_drawn(), "demo finished");
    Ok(())
}

fn run_snapshot(
    config: AppConfig,
    playlist: Playlist,
    track_id: &str,
    mode: Option<RenderMode>,
    frames: u32,
    output: &PathBuf,
) -> therapy_player_core::Result<()> {
    let track = playlist
        .iter()
        .find(|track| track.id == track_id)
        .cloned()
        .ok_or_else(|| PlayerError::msg(format!("no track with id `{track_id}` in the catalog")))?;

    let mut visualization = config.visualization.clone();
    if let Some(mode) = mode {
        visualization.mode = mode;
    }
    let mut player = build_controller(&config, playlist);
    let mut renderer = VisualizationRenderer::new(visualization);

    player.play_track(&track);
    for _ in 0..frames.max(1) {
        player.pump(FRAME_INTERVAL);
        for event in player.drain_events() {
            renderer.handle(&event);
        }
        renderer.animation_frame(&mut player);
    }

    std::fs::write(output, renderer.surface().to_svg())?;
    tracing::info!(?output, track = %track.title, "wrote visualization frame");
    player.shutdown();
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Music therapy playback and visualization engine", long_about = None)]
struct Cli {
    /// JSON configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// JSON track catalog. The bundled catalog is used when omitted.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the playlist in traversal order.
    Tracks {
        /// Track ids to mark as saved.
        #[arg(long)]
        saved: Vec<String>,
    },
    /// Play through the catalog on a simulated transport, logging progress.
    Demo {
        /// Number of display refreshes to simulate.
        #[arg(short, long, default_value_t = 600)]
        frames: u32,
        /// Visualization style: bars, radial or waveform.
        #[arg(short, long)]
        mode: Option<RenderMode>,
        /// Skip to the next track every N frames.
        #[arg(long)]
        skip_every: Option<u32>,
    },
    /// Render a visualization frame for one track to an SVG file.
    Snapshot {
        /// Catalog id of the track to play.
        track: String,
        /// Output path for the SVG document.
        output: PathBuf,
        #[arg(short, long)]
        mode: Option<RenderMode>,
        /// Display refreshes to play before capturing.
        #[arg(short, long, default_value_t = 30)]
        frames: u32,
    },
}
