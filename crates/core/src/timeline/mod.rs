use std::time::Duration;

/// Monotonic media clock used by the simulated transport.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: Duration) {
        self.time_seconds = (self.time_seconds + delta.as_secs_f64()).max(0.0);
    }

    pub fn set(&mut self, seconds: f64) {
        self.time_seconds = seconds.max(0.0);
    }
}

/// Handle for one scheduled animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest(u64);

impl FrameRequest {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Cancellable render loop with at most one pending frame.
///
/// The host fires the loop once per display refresh. Each fired frame consumes
/// the pending request; the renderer reschedules while it wants to keep
/// drawing. [`FrameLoop::cancel`] drops the pending request synchronously, so
/// nothing fires after a stop.
#[derive(Debug, Default)]
pub struct FrameLoop {
    pending: Option<FrameRequest>,
    next_id: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any pending frame and schedules a fresh one.
    pub fn start(&mut self) -> FrameRequest {
        self.cancel();
        self.schedule()
    }

    /// Schedules the next frame, replacing a pending one if present.
    pub fn schedule(&mut self) -> FrameRequest {
        self.next_id += 1;
        let request = FrameRequest(self.next_id);
        self.pending = Some(request);
        request
    }

    pub fn cancel(&mut self) {
        if let Some(request) = self.pending.take() {
            tracing::trace!(frame = request.id(), "cancelled pending frame");
        }
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Consumes the pending request, if any.
    pub fn fire(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }
}
