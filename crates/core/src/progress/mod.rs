use crate::{MediaTransport, PlaybackController, PlaybackEvent};

/// Elapsed/duration view of the transport position, fed by the controller's
/// position notifications rather than by polling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressTracker {
    elapsed: f64,
    duration: f64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: &PlaybackEvent) {
        match event {
            PlaybackEvent::TrackChanged { duration, .. } => {
                self.elapsed = 0.0;
                self.duration = *duration;
            }
            PlaybackEvent::PositionChanged { position, duration } => {
                self.elapsed = *position;
                self.duration = *duration;
            }
            _ => {}
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Elapsed share of the track, 0-100. Zero while the duration is unknown.
    pub fn percentage(&self) -> f64 {
        if self.duration <= 0.0 {
            0.0
        } else {
            (self.elapsed / self.duration * 100.0).clamp(0.0, 100.0)
        }
    }

    /// Seeks to `fraction` of the current track, clamped into [0, 1].
    /// Returns the position applied by the controller.
    pub fn seek_to_fraction<T: MediaTransport>(
        &mut self,
        fraction: f64,
        controller: &mut PlaybackController<T>,
    ) -> Option<f64> {
        if fraction.is_nan() {
            return None;
        }
        let target = fraction.clamp(0.0, 1.0) * controller.duration();
        let position = controller.seek(target)?;
        self.elapsed = position;
        self.duration = controller.duration();
        Some(position)
    }

    pub fn elapsed_label(&self) -> String {
        format_time(self.elapsed)
    }

    pub fn duration_label(&self) -> String {
        format_time(self.duration)
    }
}

/// Formats seconds as `m:ss`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
