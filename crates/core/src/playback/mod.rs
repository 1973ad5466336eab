//! Playback state machine and the single media transport.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    analysis::SnapshotSource, AnalysisConfig, AnalysisTap, LoadId, MediaTransport,
    PlaybackConfig, PlaybackError, PlayerError, Playlist, Result, Snapshot, Track,
    TransportEvent,
};

/// Lifecycle of the transport as seen by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

/// Mutable playback state. Only the controller writes to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub volume: f32,
    pub position: f64,
}

/// Notification queued for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    TrackChanged {
        index: usize,
        track_id: String,
        duration: f64,
        playing: bool,
    },
    PlayStateChanged {
        playing: bool,
    },
    StatusChanged {
        from: PlayerStatus,
        to: PlayerStatus,
    },
    PositionChanged {
        position: f64,
        duration: f64,
    },
    VolumeChanged {
        volume: f32,
    },
    Ended {
        index: usize,
    },
    Failed {
        error: PlaybackError,
    },
    AnalysisUnavailable {
        reason: String,
    },
}

/// Owns the transport and the analysis tap and coordinates both in response
/// to transport commands.
///
/// Failures never escape: a [`PlaybackError`] moves the controller to
/// [`PlayerStatus::Error`] and is queued as [`PlaybackEvent::Failed`]; an
/// analysis capability problem only disables visualization. Boundary
/// conditions such as `next_track` on an empty playlist are no-ops.
#[derive(Debug)]
pub struct PlaybackController<T: MediaTransport> {
    transport: T,
    tap: AnalysisTap,
    playlist: Playlist,
    config: PlaybackConfig,
    state: PlaybackState,
    status: PlayerStatus,
    active_load: Option<LoadId>,
    loading_for: Duration,
    muted_volume: Option<f32>,
    last_error: Option<PlaybackError>,
    events: Vec<PlaybackEvent>,
}

impl<T: MediaTransport> PlaybackController<T> {
    pub fn new(
        transport: T,
        playlist: Playlist,
        config: PlaybackConfig,
        analysis: AnalysisConfig,
    ) -> Self {
        let volume = clamp_volume(config.initial_volume).unwrap_or(1.0);
        let mut transport = transport;
        transport.set_volume(volume);

        Self {
            transport,
            tap: AnalysisTap::new(analysis),
            playlist,
            config,
            state: PlaybackState {
                current_index: None,
                is_playing: false,
                volume,
                position: 0.0,
            },
            status: PlayerStatus::Idle,
            active_load: None,
            loading_for: Duration::ZERO,
            muted_volume: None,
            last_error: None,
            events: Vec::new(),
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn volume(&self) -> f32 {
        self.state.volume
    }

    pub fn position(&self) -> f64 {
        self.state.position
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.current_index
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.state
            .current_index
            .and_then(|index| self.playlist.get(index))
    }

    /// Catalog duration of the current track, or zero with no track.
    pub fn duration(&self) -> f64 {
        self.current_track().map(|track| track.duration).unwrap_or(0.0)
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn is_muted(&self) -> bool {
        self.muted_volume.is_some()
    }

    /// Read-only view of the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn analysis_tap(&self) -> &AnalysisTap {
        &self.tap
    }


    /// Reads the current analysis snapshot. The tap itself stays owned by
    /// the controller.
    pub fn snapshot(&mut self) -> Result<Snapshot> {
        self.tap.snapshot()
    }

    /// Takes all queued notifications in emission order.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    /// Loads `track` and starts it. Unknown tracks are ignored.
    pub fn play_track(&mut self, track: &Track) {
        match self.playlist.position_of(&track.id) {
            Some(index) => self.load_index(index, true),
            None => tracing::debug!(track = %track.id, "ignoring track outside the playlist"),
        }
    }

    pub fn pause_track(&mut self) {
        if self.state.current_index.is_none() || !self.state.is_playing {
            return;
        }
        self.transport.pause();
        self.set_playing(false);
        if self.status == PlayerStatus::Playing {
            self.set_status(PlayerStatus::Paused);
        }
    }

    pub fn toggle_play(&mut self) {
        if self.state.is_playing {
            self.pause_track();
            return;
        }

        let Some(index) = self.state.current_index else {
            if !self.playlist.is_empty() {
                self.load_index(0, true);
            }
            return;
        };

        match self.status {
            PlayerStatus::Error => self.load_index(index, true),
            PlayerStatus::Loading => self.set_playing(true),
            _ => self.resume(),
        }
    }

    pub fn next_track(&mut self) {
        self.step(1);
    }

    pub fn previous_track(&mut self) {
        self.step(-1);
    }

    /// Clamps `volume` into [0, 1] and applies it. NaN is ignored.
    pub fn set_volume(&mut self, volume: f32) {
        let Some(volume) = clamp_volume(volume) else {
            return;
        };
        if volume > 0.0 {
            self.muted_volume = None;
        }
        self.apply_volume(volume);
    }

    /// Mutes, remembering the current level, or restores it.
    pub fn toggle_mute(&mut self) {
        match self.muted_volume.take() {
            Some(previous) => self.apply_volume(previous),
            None => {
                self.muted_volume = Some(self.state.volume);
                self.apply_volume(0.0);
            }
        }
    }

    /// Moves the playhead, clamped to the current track. Returns the applied
    /// position, or `None` when there is no current track.
    pub fn seek(&mut self, seconds: f64) -> Option<f64> {
        let duration = self.current_track()?.duration;
        if seconds.is_nan() {
            return None;
        }
        let position = seconds.clamp(0.0, duration);
        self.transport.seek(position);
        self.state.position = position;
        self.events.push(PlaybackEvent::PositionChanged { position, duration });
        Some(position)
    }

    /// Lets `elapsed` host time pass and applies transport notifications.
    pub fn pump(&mut self, elapsed: Duration) {
        for event in self.transport.poll(elapsed) {
            if Some(event.load()) != self.active_load {
                tracing::trace!(?event, "dropping notification from a superseded load");
                continue;
            }
            self.apply_transport_event(event);
        }

        if self.status == PlayerStatus::Loading {
            self.loading_for += elapsed;
            let stalled = self
                .config
                .load_timeout_ms
                .is_some_and(|limit| self.loading_for > Duration::from_millis(limit));
            if stalled {
                let url = self
                    .current_track()
                    .map(|track| track.audio_url.clone())
                    .unwrap_or_default();
                self.fail(PlaybackError::Stalled { url });
            }
        }
    }

    /// Stops playback and releases the analysis session.
    pub fn shutdown(&mut self) {
        self.transport.pause();
        self.set_playing(false);
        self.active_load = None;
        if let Err(err) = self.tap.release() {
            tracing::warn!(%err, "failed to release analysis tap");
        }
        tracing::info!("playback engine shut down");
    }

    fn step(&mut self, offset: isize) {
        let len = self.playlist.len();
        let Some(current) = self.state.current_index else {
            return;
        };
        if len == 0 {
            return;
        }
        let next = (current as isize + offset).rem_euclid(len as isize) as usize;
        self.load_index(next, true);
    }

    fn resume(&mut self) {
        let duration = self.duration();
        if duration > 0.0 && self.state.position >= duration {
            self.seek(0.0);
        }
        match self.transport.play() {
            Ok(()) => {
                self.set_playing(true);
                self.set_status(PlayerStatus::Playing);
            }
            Err(error) => self.fail(error),
        }
    }

    fn load_index(&mut self, index: usize, autoplay: bool) {
        let Some(track) = self.playlist.get(index) else {
            return;
        };
        let url = track.audio_url.clone();
        let track_id = track.id.clone();
        let duration = track.duration;
        tracing::info!(track = %track_id, %url, autoplay, "loading track");

        self.state.current_index = Some(index);
        self.state.position = 0.0;
        self.loading_for = Duration::ZERO;
        self.last_error = None;
        self.set_status(PlayerStatus::Loading);

        let load = match self.transport.load(&url) {
            Ok(load) => load,
            Err(error) => {
                self.active_load = None;
                if let Err(err) = self.tap.detach() {
                    tracing::warn!(%err, "failed to detach analysis tap");
                }
                self.state.is_playing = autoplay;
                self.fail(error);
                return;
            }
        };
        self.active_load = Some(load);

        let reattach = self.tap.attach(&self.transport);

        self.state.is_playing = autoplay;
        self.events.push(PlaybackEvent::TrackChanged {
            index,
            track_id,
            duration,
            playing: autoplay,
        });
        self.events.push(PlaybackEvent::PositionChanged {
            position: 0.0,
            duration,
        });

        if let Err(err) = reattach {
            tracing::warn!(%err, "analysis tap unavailable for this track");
            let reason = match err {
                PlayerError::AnalysisCapability(reason) => reason,
                other => other.to_string(),
            };
            self.events.push(PlaybackEvent::AnalysisUnavailable { reason });
        }
    }

    fn apply_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Ready { duration, .. } => {
                if self.status != PlayerStatus::Loading {
                    return;
                }
                tracing::debug!(media_duration = duration, "media ready");
                if self.state.is_playing {
                    self.resume();
                } else {
                    self.set_status(PlayerStatus::Paused);
                }
            }
            TransportEvent::Position { seconds, .. } => {
                let duration = self.duration();
                let position = seconds.clamp(0.0, duration);
                self.state.position = position;
                self.events.push(PlaybackEvent::PositionChanged { position, duration });
            }
            TransportEvent::Ended { .. } => self.finish_track(),
            TransportEvent::Failed { error, .. } => self.fail(error),
        }
    }

    fn finish_track(&mut self) {
        let Some(index) = self.state.current_index else {
            return;
        };
        self.state.position = self.duration();
        self.events.push(PlaybackEvent::Ended { index });

        if self.config.auto_advance && self.playlist.len() > 1 && self.state.is_playing {
            self.step(1);
            return;
        }
        self.set_playing(false);
        self.set_status(PlayerStatus::Paused);
    }

    fn fail(&mut self, error: PlaybackError) {
        tracing::warn!(%error, "playback failed");
        self.transport.pause();
        self.set_playing(false);
        self.set_status(PlayerStatus::Error);
        self.last_error = Some(error.clone());
        self.events.push(PlaybackEvent::Failed { error });
    }

    fn apply_volume(&mut self, volume: f32) {
        self.transport.set_volume(volume);
        if self.state.volume != volume {
            self.state.volume = volume;
            self.events.push(PlaybackEvent::VolumeChanged { volume });
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if self.state.is_playing != playing {
            self.state.is_playing = playing;
            self.events.push(PlaybackEvent::PlayStateChanged { playing });
        }
    }

    fn set_status(&mut self, status: PlayerStatus) {
        if self.status != status {
            tracing::debug!(from = ?self.status, to = ?status, "status changed");
            self.events.push(PlaybackEvent::StatusChanged {
                from: self.status,
                to: status,
            });
            self.status = status;
        }
    }
}

impl<T: MediaTransport> SnapshotSource for PlaybackController<T> {
    fn snapshot(&mut self) -> Result<Snapshot> {
        PlaybackController::snapshot(self)
    }
}

fn clamp_volume(volume: f32) -> Option<f32> {
    if volume.is_nan() {
        None
    } else {
        Some(volume.clamp(0.0, 1.0))
    }
}
