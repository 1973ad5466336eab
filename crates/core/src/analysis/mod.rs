use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{AnalysisConfig, MediaTransport, OutputNode, PlayerError, Result};

/// Transform size of every analysis session.
pub const FFT_SIZE: usize = 256;
/// Frequency buckets per snapshot.
pub const BUCKET_COUNT: usize = FFT_SIZE / 2;

/// One frame's worth of per-bucket amplitudes on a 0-255 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    buckets: [u8; BUCKET_COUNT],
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::silent()
    }
}

impl Snapshot {
    pub fn silent() -> Self {
        Self {
            buckets: [0; BUCKET_COUNT],
        }
    }

    pub fn from_buckets(buckets: [u8; BUCKET_COUNT]) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> &[u8; BUCKET_COUNT] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        BUCKET_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, bucket: usize) -> Option<u8> {
        self.buckets.get(bucket).copied()
    }

    /// Amplitude of `bucket` as a fraction of full scale.
    pub fn fraction(&self, bucket: usize) -> f32 {
        self.get(bucket).map(|value| f32::from(value) / 255.0).unwrap_or(0.0)
    }

    pub fn is_silent(&self) -> bool {
        self.buckets.iter().all(|value| *value == 0)
    }
}

/// Exclusive observer of the transport output.
///
/// The tap owns at most one analysis session and one connection to an
/// [`OutputNode`]. Attaching always releases the previous session and
/// disconnects the previous output first, so a sequence of track changes never
/// leaves more than one live tap or session behind.
pub struct AnalysisTap {
    config: AnalysisConfig,
    planner: RealFftPlanner<f32>,
    state: TapState,
    sessions_opened: u64,
    sessions_released: u64,
}

enum TapState {
    Detached,
    Attached {
        output: OutputNode,
        session: AnalysisSession,
    },
    Unsupported(String),
}

impl AnalysisTap {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            planner: RealFftPlanner::new(),
            state: TapState::Detached,
            sessions_opened: 0,
            sessions_released: 0,
        }
    }

    /// Moves the tap onto the transport's current output, releasing whatever it
    /// was attached to before. A host without analysis support leaves the tap
    /// in a degraded state and reports [`PlayerError::AnalysisCapability`].
    pub fn attach<T: MediaTransport + ?Sized>(&mut self, transport: &T) -> Result<()> {
        self.detach()?;

        if !transport.supports_analysis() {
            let reason = "host cannot run an analysis session".to_string();
            self.state = TapState::Unsupported(reason.clone());
            return Err(PlayerError::AnalysisCapability(reason));
        }

        let output = transport
            .output()
            .ok_or_else(|| PlayerError::msg("transport has no output to analyse"))?;
        let session = self.acquire_session()?;
        if let Err(err) = output.connect_tap() {
            self.release_session(session);
            return Err(err);
        }

        tracing::debug!(output = output.id(), session = session.id, "analysis tap attached");
        self.state = TapState::Attached { output, session };
        Ok(())
    }

    /// Disconnects from the current output and releases the session.
    pub fn detach(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, TapState::Detached) {
            TapState::Attached { output, session } => {
                self.release_session(session);
                output.disconnect_tap()?;
                tracing::debug!(output = output.id(), "analysis tap detached");
            }
            TapState::Detached | TapState::Unsupported(_) => {}
        }
        Ok(())
    }

    /// Tears the tap down for shutdown.
    pub fn release(&mut self) -> Result<()> {
        self.detach()
    }

    /// Latest per-bucket amplitudes of the attached output.
    ///
    /// Reading never touches transport state; it only advances the temporal
    /// smoothing of the session.
    pub fn snapshot(&mut self) -> Result<Snapshot> {
        match &mut self.state {
            TapState::Attached { output, session } => session.analyse(output),
            TapState::Unsupported(reason) => Err(PlayerError::AnalysisCapability(reason.clone())),
            TapState::Detached => Err(PlayerError::msg("analysis tap is not attached")),
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, TapState::Attached { .. })
    }

    /// Id of the output currently observed.
    pub fn attached_output(&self) -> Option<u64> {
        match &self.state {
            TapState::Attached { output, .. } => Some(output.id()),
            _ => None,
        }
    }

    pub fn capability_error(&self) -> Option<&str> {
        match &self.state {
            TapState::Unsupported(reason) => Some(reason),
            _ => None,
        }
    }

    /// Sessions acquired and not yet released.
    pub fn live_sessions(&self) -> u64 {
        self.sessions_opened - self.sessions_released
    }

    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened
    }

    fn acquire_session(&mut self) -> Result<AnalysisSession> {
        let session =
            AnalysisSession::acquire(self.sessions_opened + 1, &mut self.planner, &self.config)?;
        self.sessions_opened += 1;
        Ok(session)
    }

    fn release_session(&mut self, session: AnalysisSession) {
        tracing::trace!(session = session.id, "analysis session released");
        self.sessions_released += 1;
    }
}

/// Anything a renderer can pull one analysis snapshot per frame from.
pub trait SnapshotSource {
    fn snapshot(&mut self) -> Result<Snapshot>;
}

impl SnapshotSource for AnalysisTap {
    fn snapshot(&mut self) -> Result<Snapshot> {
        AnalysisTap::snapshot(self)
    }
}

impl Drop for AnalysisTap {
    fn drop(&mut self) {
        if let Err(err) = self.detach() {
            tracing::warn!(%err, "failed to detach analysis tap on drop");
        }
    }
}

impl fmt::Debug for AnalysisTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisTap")
            .field("attached_output", &self.attached_output())
            .field("capability_error", &self.capability_error())
            .field("live_sessions", &self.live_sessions())
            .finish()
    }
}

/// FFT plan, buffers and smoothing history for one attachment.
struct AnalysisSession {
    id: u64,
    plan: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
}

impl AnalysisSession {
    fn acquire(id: u64, planner: &mut RealFftPlanner<f32>, config: &AnalysisConfig) -> Result<Self> {
        if config.min_decibels >= config.max_decibels {
            return Err(PlayerError::InvalidInput(
                "min_decibels must be below max_decibels",
            ));
        }

        let plan = planner.plan_fft_forward(FFT_SIZE);
        Ok(Self {
            id,
            window: (0..FFT_SIZE).map(|i| blackman_value(i, FFT_SIZE)).collect(),
            input: plan.make_input_vec(),
            spectrum: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
            smoothed: vec![0.0; BUCKET_COUNT],
            smoothing: config.smoothing_time_constant.clamp(0.0, 1.0),
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        })
    }

    fn analyse(&mut self, output: &OutputNode) -> Result<Snapshot> {
        output.read_latest(&mut self.input)?;
        for (sample, weight) in self.input.iter_mut().zip(&self.window) {
            *sample *= weight;
        }

        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)?;

        let scale = 1.0 / FFT_SIZE as f32;
        let range = self.max_decibels - self.min_decibels;
        let mut buckets = [0u8; BUCKET_COUNT];

        for ((bucket, smoothed), bin) in buckets
            .iter_mut()
            .zip(self.smoothed.iter_mut())
            .zip(&self.spectrum)
        {
            let magnitude = bin.norm() * scale;
            let value = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;
            *smoothed = if value.is_finite() { value } else { 0.0 };

            if *smoothed <= 0.0 {
                continue;
            }
            let decibels = 20.0 * smoothed.log10();
            let scaled = 255.0 / range * (decibels - self.min_decibels);
            *bucket = scaled.clamp(0.0, 255.0).floor() as u8;
        }

        Ok(Snapshot { buckets })
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    let phase = 2.0 * PI * index as f32 / len as f32;
    0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
}
