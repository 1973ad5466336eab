//! Boundary to the platform media pipeline.
//!
//! Decoding and output are delegated to whatever implements
//! [`MediaTransport`]. The controller owns exactly one transport; every other
//! component only observes it through the [`OutputNode`] of the current load.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use crate::{PlaybackError, PlayerError, Result};

mod simulated;

pub use simulated::{SimulatedTransport, TransportCommand};

/// Number of most recent output samples retained for analysis.
pub const OUTPUT_HISTORY: usize = 2048;

/// Identifies one `load` call. Notifications carry the id of the load they
/// belong to so that a superseded load can be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadId(pub u64);

/// Lifecycle notification emitted by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Media metadata is available and playback can start.
    Ready { load: LoadId, duration: f64 },
    /// Native position update while playing or after a seek.
    Position { load: LoadId, seconds: f64 },
    Ended { load: LoadId },
    Failed { load: LoadId, error: PlaybackError },
}

impl TransportEvent {
    pub fn load(&self) -> LoadId {
        match self {
            Self::Ready { load, .. }
            | Self::Position { load, .. }
            | Self::Ended { load }
            | Self::Failed { load, .. } => *load,
        }
    }
}

/// The single playback resource for the current track.
///
/// Commands are applied in call order. Completion is asynchronous: results of
/// `load` arrive as [`TransportEvent`]s drained by [`MediaTransport::poll`].
pub trait MediaTransport {
    /// Replaces the current source. Any in-flight load is superseded.
    fn load(&mut self, url: &str) -> std::result::Result<LoadId, PlaybackError>;
    fn play(&mut self) -> std::result::Result<(), PlaybackError>;
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn seek(&mut self, seconds: f64);
    fn position(&self) -> f64;
    /// Output of the current load, if a source has been loaded.
    fn output(&self) -> Option<OutputNode>;

    /// Whether the host can run an analysis session on this transport's
    /// output.
    fn supports_analysis(&self) -> bool {
        true
    }

    /// Lets `elapsed` host time pass and drains pending notifications.
    fn poll(&mut self, elapsed: Duration) -> Vec<TransportEvent>;
}

/// Output stream of one load. Holds the most recent time-domain samples and
/// the number of analysis taps connected to it.
#[derive(Clone)]
pub struct OutputNode {
    id: u64,
    shared: Arc<Mutex<OutputBus>>,
}

#[derive(Debug, Default)]
struct OutputBus {
    recent: VecDeque<f32>,
    taps: usize,
}

impl OutputNode {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            shared: Arc::new(Mutex::new(OutputBus {
                recent: VecDeque::with_capacity(OUTPUT_HISTORY),
                taps: 0,
            })),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Appends rendered samples, keeping only the latest [`OUTPUT_HISTORY`].
    pub fn write(&self, samples: &[f32]) -> Result<()> {
        let mut bus = self.lock()?;
        let skip = samples.len().saturating_sub(OUTPUT_HISTORY);
        for sample in &samples[skip..] {
            if bus.recent.len() == OUTPUT_HISTORY {
                bus.recent.pop_front();
            }
            bus.recent.push_back(*sample);
        }
        Ok(())
    }

    /// Copies the most recent `out.len()` samples into `out`. When fewer have
    /// been written the front is zero-filled.
    pub fn read_latest(&self, out: &mut [f32]) -> Result<()> {
        let bus = self.lock()?;
        let available = bus.recent.len().min(out.len());
        let pad = out.len() - available;
        out[..pad].fill(0.0);
        let start = bus.recent.len() - available;
        for (slot, sample) in out[pad..].iter_mut().zip(bus.recent.range(start..)) {
            *slot = *sample;
        }
        Ok(())
    }

    /// Connects an analysis tap. Only one tap may observe an output.
    pub fn connect_tap(&self) -> Result<()> {
        let mut bus = self.lock()?;
        if bus.taps > 0 {
            return Err(PlayerError::TapConflict { output: self.id });
        }
        bus.taps = 1;
        Ok(())
    }

    pub fn disconnect_tap(&self) -> Result<()> {
        let mut bus = self.lock()?;
        bus.taps = bus.taps.saturating_sub(1);
        Ok(())
    }

    pub fn tap_count(&self) -> Result<usize> {
        Ok(self.lock()?.taps)
    }

    fn lock(&self) -> Result<MutexGuard<'_, OutputBus>> {
        self.shared
            .lock()
            .map_err(|_| PlayerError::msg("transport output has been poisoned"))
    }
}

impl std::fmt::Debug for OutputNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputNode").field("id", &self.id).finish()
    }
}
