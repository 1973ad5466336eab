use std::{collections::BTreeSet, time::Duration};

use therapy_player_core::{
    AnalysisConfig, MediaTransport, OutputNode, PlaybackConfig, PlaybackController,
    PlaybackEvent, Playlist, ProgressTracker, RenderMode, SimulatedTransport, Track,
    VisualizationConfig, VisualizationRenderer,
};

const FRAME: Duration = Duration::from_millis(16);

fn track(id: &str, duration: f64) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Session {id}"),
        artist: "Harmonic Mind".to_string(),
        duration,
        cover_url: format!("https://covers.test/{id}.jpg"),
        audio_url: format!("https://media.test/{id}.mp3"),
        category: "meditation".to_string(),
        mood: BTreeSet::from(["calm".to_string()]),
    }
}

fn player(tracks: Vec<Track>) -> PlaybackController<SimulatedTransport> {
    let playlist = Playlist::new(tracks).unwrap();
    let transport = SimulatedTransport::for_playlist(&playlist, 48_000);
    PlaybackController::new(
        transport,
        playlist,
        PlaybackConfig::default(),
        AnalysisConfig::default(),
    )
}

fn abc() -> PlaybackController<SimulatedTransport> {
    player(vec![track("A", 380.0), track("B", 425.0), track("C", 290.0)])
}

fn current_id(player: &PlaybackController<SimulatedTransport>) -> Option<String> {
    player.current_track().map(|track| track.id.clone())
}

/// Drives one display refresh the way a host would.
fn frame(
    player: &mut PlaybackController<SimulatedTransport>,
    tracker: &mut ProgressTracker,
    renderer: &mut VisualizationRenderer,
) {
    player.pump(FRAME);
    for event in player.drain_events() {
        tracker.handle(&event);
        renderer.handle(&event);
    }
    renderer.animation_frame(player);
}

#[test]
fn next_track_plays_the_neighbour() {
    let mut player = abc();
    let a = player.playlist()[0].clone();

    player.play_track(&a);
    assert_eq!(current_id(&player).as_deref(), Some("A"));
    assert!(player.is_playing());

    player.next_track();
    assert_eq!(current_id(&player).as_deref(), Some("B"));
    assert!(player.is_playing());

    player.pump(FRAME);
    player.pause_track();
    player.next_track();
    assert_eq!(current_id(&player).as_deref(), Some("C"));
    assert!(player.is_playing());
}

#[test]
fn previous_track_wraps_to_the_end() {
    let mut player = abc();
    let a = player.playlist()[0].clone();
    player.play_track(&a);

    player.previous_track();
    assert_eq!(player.current_index(), Some(2));
    assert_eq!(current_id(&player).as_deref(), Some("C"));
}

#[test]
fn traversal_wraps_for_every_index() {
    for len in 1..=5 {
        let tracks = (0..len).map(|i| track(&i.to_string(), 60.0)).collect();
        let mut player = player(tracks);

        for i in 0..len {
            let start = player.playlist()[i].clone();

            player.play_track(&start);
            player.next_track();
            assert_eq!(player.current_index(), Some((i + 1) % len));

            player.play_track(&start);
            player.previous_track();
            assert_eq!(player.current_index(), Some((i + len - 1) % len));
        }
    }
}

#[test]
fn toggle_play_is_idempotent_in_pairs() {
    let mut player = abc();
    let a = player.playlist()[0].clone();
    player.play_track(&a);
    player.pump(Duration::ZERO);

    for _ in 0..3 {
        let before = player.is_playing();
        player.toggle_play();
        player.toggle_play();
        assert_eq!(player.is_playing(), before);
    }
}

#[test]
fn volume_is_clamped_into_unit_range() {
    let mut player = abc();
    player.set_volume(-1.0);
    assert_eq!(player.volume(), 0.0);
    player.set_volume(2.0);
    assert_eq!(player.volume(), 1.0);
    player.set_volume(0.4);
    assert_eq!(player.volume(), 0.4);
}

#[test]
fn empty_playlist_commands_are_noops() {
    let mut player = player(Vec::new());

    player.toggle_play();
    player.next_track();
    player.previous_track();
    player.pump(FRAME);

    assert_eq!(player.current_track(), None);
    assert!(!player.is_playing());
    assert!(player.drain_events().is_empty());
    assert!(player.transport().commands().len() == 1);
}

#[test]
fn seek_clamps_to_track_duration() {
    let mut player = abc();
    let a = player.playlist()[0].clone();
    player.play_track(&a);
    player.pump(Duration::ZERO);

    assert_eq!(player.seek(500.0), Some(380.0));
    assert_eq!(player.position(), 380.0);
    assert_eq!(player.seek(-10.0), Some(0.0));
    assert_eq!(player.position(), 0.0);
}

#[test]
fn rapid_switching_leaves_one_tap_and_one_session() {
    let mut player = abc();
    let mut outputs: Vec<OutputNode> = Vec::new();

    for round in 0..12 {
        let track = player.playlist()[round % 3].clone();
        player.play_track(&track);
        if round % 4 == 0 {
            player.pump(FRAME);
        }
        outputs.push(player.transport().output().unwrap());
    }

    let (last, earlier) = outputs.split_last().unwrap();
    assert_eq!(last.tap_count().unwrap(), 1);
    for output in earlier {
        assert_eq!(output.tap_count().unwrap(), 0);
    }
    assert_eq!(player.analysis_tap().attached_output(), Some(last.id()));
    assert_eq!(player.analysis_tap().live_sessions(), 1);
    assert_eq!(player.analysis_tap().sessions_opened(), 12);
}

#[test]
fn switching_tracks_moves_the_tap_before_the_next_snapshot() {
    let mut player = abc();
    let mut tracker = ProgressTracker::new();
    let mut renderer = VisualizationRenderer::new(VisualizationConfig::default());
    let a = player.playlist()[0].clone();
    let b = player.playlist()[1].clone();

    player.play_track(&a);
    for _ in 0..5 {
        frame(&mut player, &mut tracker, &mut renderer);
    }
    let a_output = player.transport().output().unwrap();

    player.play_track(&b);
    let b_output = player.transport().output().unwrap();
    assert_ne!(a_output.id(), b_output.id());
    assert_eq!(a_output.tap_count().unwrap(), 0);
    assert_eq!(b_output.tap_count().unwrap(), 1);

    frame(&mut player, &mut tracker, &mut renderer);
    assert_eq!(player.analysis_tap().attached_output(), Some(b_output.id()));
    assert!(renderer.is_running());
    assert_eq!(tracker.duration(), 425.0);
}

#[test]
fn full_session_draws_tracks_and_stops_on_pause() {
    let mut player = abc();
    let mut tracker = ProgressTracker::new();
    let mut renderer = VisualizationRenderer::new(VisualizationConfig {
        mode: RenderMode::Radial,
        bar_count: 32,
        ..Default::default()
    });

    player.toggle_play();
    for _ in 0..60 {
        frame(&mut player, &mut tracker, &mut renderer);
    }

    assert!(renderer.frames_drawn() > 50);
    assert!(!renderer.surface().is_blank());
    assert!(tracker.elapsed() > 0.9 && tracker.elapsed() < 1.0);
    assert_eq!(tracker.elapsed_label(), "0:00");

    player.toggle_play();
    frame(&mut player, &mut tracker, &mut renderer);
    assert!(!renderer.is_running());
    assert!(renderer.surface().is_blank());

    let drawn = renderer.frames_drawn();
    frame(&mut player, &mut tracker, &mut renderer);
    assert_eq!(renderer.frames_drawn(), drawn);
}

#[test]
fn failed_track_keeps_controls_responsive() {
    let playlist = Playlist::new(vec![track("A", 380.0), track("B", 425.0)]).unwrap();
    let transport = SimulatedTransport::new(48_000).with_media(&playlist[1].audio_url, 425.0);
    let mut player = PlaybackController::new(
        transport,
        playlist,
        PlaybackConfig::default(),
        AnalysisConfig::default(),
    );
    let mut tracker = ProgressTracker::new();
    let mut renderer = VisualizationRenderer::new(VisualizationConfig::default());

    player.toggle_play();
    frame(&mut player, &mut tracker, &mut renderer);
    assert!(!player.is_playing());
    assert!(renderer.surface().is_blank());

    player.next_track();
    for _ in 0..3 {
        frame(&mut player, &mut tracker, &mut renderer);
    }
    assert!(player.is_playing());
    assert_eq!(current_id(&player).as_deref(), Some("B"));
    assert!(!renderer.surface().is_blank());
}

#[test]
fn visualization_degrades_without_analysis_support() {
    let playlist = Playlist::new(vec![track("A", 380.0)]).unwrap();
    let transport = SimulatedTransport::for_playlist(&playlist, 48_000).without_analysis();
    let mut player = PlaybackController::new(
        transport,
        playlist,
        PlaybackConfig::default(),
        AnalysisConfig::default(),
    );
    let mut tracker = ProgressTracker::new();
    let mut renderer = VisualizationRenderer::new(VisualizationConfig::default());

    player.toggle_play();
    let events_seen = {
        let mut seen = Vec::new();
        player.pump(FRAME);
        for event in player.drain_events() {
            tracker.handle(&event);
            renderer.handle(&event);
            seen.push(event);
        }
        seen
    };
    assert!(events_seen
        .iter()
        .any(|event| matches!(event, PlaybackEvent::AnalysisUnavailable { .. })));

    for _ in 0..10 {
        frame(&mut player, &mut tracker, &mut renderer);
    }
    assert!(player.is_playing());
    assert!(tracker.elapsed() > 0.0);
    assert!(renderer.is_degraded());
    assert!(renderer.surface().is_blank());
}
