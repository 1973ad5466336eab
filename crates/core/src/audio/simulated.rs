use std::{collections::HashMap, f64::consts::TAU, time::Duration};

use super::{LoadId, MediaTransport, OutputNode, TransportEvent, OUTPUT_HISTORY};
use crate::{Playlist, PlaybackClock, PlaybackError};

const HARMONICS: u32 = 12;

/// Command received by a [`SimulatedTransport`], recorded in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Load(String),
    Play,
    Pause,
    Seek(f64),
    Volume(f32),
}

#[derive(Debug, Clone, Copy)]
enum MediaBehaviour {
    Playable { duration: f64 },
    Stalls,
    RejectsPlay { duration: f64 },
}

#[derive(Debug)]
struct LoadedMedia {
    load: LoadId,
    url: String,
    seed: u64,
    duration: f64,
    ready: bool,
    rejects_play: bool,
}

/// Deterministic in-process transport.
///
/// Media is registered up front by URL. Loading an unregistered URL fails the
/// way a network error would: asynchronously, through a
/// [`TransportEvent::Failed`] notification. While playing, each
/// [`MediaTransport::poll`] advances the media clock and renders a harmonic
/// tone seeded by the URL into the current [`OutputNode`].
#[derive(Debug)]
pub struct SimulatedTransport {
    media: HashMap<String, MediaBehaviour>,
    sample_rate: u32,
    analysis_supported: bool,
    current: Option<LoadedMedia>,
    output: Option<OutputNode>,
    next_load: u64,
    outputs_created: usize,
    clock: PlaybackClock,
    volume: f32,
    playing: bool,
    pending: Vec<TransportEvent>,
    commands: Vec<TransportCommand>,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(48_000)
    }
}

impl SimulatedTransport {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            media: HashMap::new(),
            sample_rate: sample_rate.max(1),
            analysis_supported: true,
            current: None,
            output: None,
            next_load: 0,
            outputs_created: 0,
            clock: PlaybackClock::default(),
            volume: 1.0,
            playing: false,
            pending: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Registers every track of the playlist as playable media.
    pub fn for_playlist(playlist: &Playlist, sample_rate: u32) -> Self {
        playlist
            .iter()
            .fold(Self::new(sample_rate), |transport, track| {
                transport.with_media(&track.audio_url, track.duration)
            })
    }

    pub fn with_media(mut self, url: &str, duration: f64) -> Self {
        self.media
            .insert(url.to_string(), MediaBehaviour::Playable { duration });
        self
    }

    /// The URL loads but never reports readiness.
    pub fn with_stalled(mut self, url: &str) -> Self {
        self.media.insert(url.to_string(), MediaBehaviour::Stalls);
        self
    }

    /// The URL loads but `play` is refused, as with an autoplay policy.
    pub fn with_play_rejection(mut self, url: &str, duration: f64) -> Self {
        self.media
            .insert(url.to_string(), MediaBehaviour::RejectsPlay { duration });
        self
    }

    /// Removes a registration so later loads of `url` fail.
    pub fn forget_media(&mut self, url: &str) {
        self.media.remove(url);
    }

    pub fn without_analysis(mut self) -> Self {
        self.analysis_supported = false;
        self
    }

    pub fn commands(&self) -> &[TransportCommand] {
        &self.commands
    }

    pub fn outputs_created(&self) -> usize {
        self.outputs_created
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|media| media.url.as_str())
    }

    fn render_output(&self, media: &LoadedMedia, elapsed: Duration) {
        let Some(output) = &self.output else {
            return;
        };
        let rate = f64::from(self.sample_rate);
        let count = ((elapsed.as_secs_f64() * rate).round() as usize).min(OUTPUT_HISTORY);
        if count == 0 {
            return;
        }

        let end = self.clock.time_seconds;
        let samples: Vec<f32> = (0..count)
            .map(|k| {
                let t = end - (count - 1 - k) as f64 / rate;
                tone(media.seed, t) * self.volume
            })
            .collect();

        if let Err(err) = output.write(&samples) {
            tracing::warn!(%err, "dropping simulated output block");
        }
    }
}

impl MediaTransport for SimulatedTransport {
    fn load(&mut self, url: &str) -> Result<LoadId, PlaybackError> {
        self.commands.push(TransportCommand::Load(url.to_string()));
        if url.trim().is_empty() {
            return Err(PlaybackError::load(url, "empty media source"));
        }

        self.next_load += 1;
        let load = LoadId(self.next_load);
        self.pending.clear();
        self.playing = false;
        self.clock.reset();
        self.outputs_created += 1;
        self.output = Some(OutputNode::new(self.next_load));

        let (duration, rejects_play) = match self.media.get(url).copied() {
            Some(MediaBehaviour::Playable { duration }) => {
                self.pending.push(TransportEvent::Ready { load, duration });
                (duration, false)
            }
            Some(MediaBehaviour::RejectsPlay { duration }) => {
                self.pending.push(TransportEvent::Ready { load, duration });
                (duration, true)
            }
            Some(MediaBehaviour::Stalls) => (0.0, false),
            None => {
                self.pending.push(TransportEvent::Failed {
                    load,
                    error: PlaybackError::load(url, "media not found"),
                });
                (0.0, false)
            }
        };

        self.current = Some(LoadedMedia {
            load,
            url: url.to_string(),
            seed: seed_for(url),
            duration,
            ready: false,
            rejects_play,
        });
        Ok(load)
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.commands.push(TransportCommand::Play);
        let Some(media) = &self.current else {
            return Err(PlaybackError::start("", "no media loaded"));
        };
        if !media.ready {
            return Err(PlaybackError::start(&media.url, "media is not ready"));
        }
        if media.rejects_play {
            return Err(PlaybackError::start(&media.url, "playback was not allowed"));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.commands.push(TransportCommand::Pause);
        self.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.commands.push(TransportCommand::Volume(volume));
        self.volume = volume;
    }

    fn seek(&mut self, seconds: f64) {
        self.commands.push(TransportCommand::Seek(seconds));
        if let Some(media) = &self.current {
            let bounded = if media.ready {
                seconds.min(media.duration)
            } else {
                seconds
            };
            self.clock.set(bounded);
            self.pending.push(TransportEvent::Position {
                load: media.load,
                seconds: self.clock.time_seconds,
            });
        }
    }

    fn position(&self) -> f64 {
        self.clock.time_seconds
    }

    fn output(&self) -> Option<OutputNode> {
        self.output.clone()
    }

    fn supports_analysis(&self) -> bool {
        self.analysis_supported
    }

    fn poll(&mut self, elapsed: Duration) -> Vec<TransportEvent> {
        let mut events = std::mem::take(&mut self.pending);

        if let Some(media) = self.current.as_mut() {
            let became_ready = events
                .iter()
                .any(|event| matches!(event, TransportEvent::Ready { load, .. } if *load == media.load));
            if became_ready {
                media.ready = true;
            }
        }

        let Some(media) = self.current.as_ref() else {
            return events;
        };
        if !(self.playing && media.ready) {
            return events;
        }

        self.clock.advance(elapsed);
        let ended = self.clock.time_seconds >= media.duration;
        if ended {
            self.clock.set(media.duration);
        }
        self.render_output(media, elapsed);

        let load = media.load;
        events.push(TransportEvent::Position {
            load,
            seconds: self.clock.time_seconds,
        });
        if ended {
            self.playing = false;
            events.push(TransportEvent::Ended { load });
        }
        events
    }
}

/// FNV-1a over the URL bytes.
fn seed_for(url: &str) -> u64 {
    url.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn tone(seed: u64, t: f64) -> f32 {
    let base = 110.0 + (seed % 12) as f64 * 20.0;
    let mut value = 0.0;
    for harmonic in 1..=HARMONICS {
        let h = f64::from(harmonic);
        value += (TAU * base * h * t).sin() / h;
    }
    let swell = 0.6 + 0.4 * (TAU * 0.25 * t).sin();
    (value * swell * 0.2) as f32
}
