//! Playback and visualization engine for the Music Therapy Player.
//!
//! One [`PlaybackController`] owns the media transport and the exclusive
//! [`AnalysisTap`] on its output. The presentation layer issues transport
//! commands, drains [`PlaybackEvent`]s and fans them out to the
//! [`ProgressTracker`] and the [`VisualizationRenderer`]. Everything runs on
//! the caller's thread; asynchronous work is represented by transport
//! notifications and host-fired animation frames.

pub mod analysis;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod mapping;
pub mod playback;
pub mod progress;
pub mod render;
pub mod timeline;

pub use analysis::{AnalysisTap, Snapshot, SnapshotSource, BUCKET_COUNT, FFT_SIZE};
pub use audio::{
    LoadId, MediaTransport, OutputNode, SimulatedTransport, TransportCommand, TransportEvent,
};
pub use catalog::{InMemoryProfile, Playlist, ProfileStore, StaticCatalog, Track, TrackCatalog};
pub use config::{AnalysisConfig, AppConfig, PlaybackConfig, RenderMode, VisualizationConfig};
pub use error::{PlaybackError, PlayerError, Result};
pub use mapping::{bucket_index, BucketMapping};
pub use playback::{PlaybackController, PlaybackEvent, PlaybackState, PlayerStatus};
pub use progress::{format_time, ProgressTracker};
pub use render::{Frame, Shape, VisualizationRenderer};
pub use timeline::{FrameLoop, FrameRequest, PlaybackClock};
