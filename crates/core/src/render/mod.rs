use std::f32::consts::TAU;

use crate::{
    analysis::{SnapshotSource, BUCKET_COUNT}, BucketMapping, FrameLoop, PlaybackEvent, RenderMode,
    Snapshot, VisualizationConfig,
};

mod frame;

pub use frame::{Fill, Frame, Point, Shape, Stroke};

const BAR_FILL_RATIO: f32 = 0.8;
const BAR_HEIGHT_RATIO: f32 = 0.8;
const RADIAL_RADIUS_RATIO: f32 = 0.8;
const RADIAL_INNER_RATIO: f32 = 0.3;
const RADIAL_RAY_RATIO: f32 = 0.7;
const WAVE_AMPLITUDE_RATIO: f32 = 0.7;
const LINE_WIDTH: f32 = 2.0;
const DOT_RADIUS: f32 = 2.0;
const TRANSPARENT: &str = "rgba(255, 255, 255, 0)";

/// Draws one frame per animation tick from the latest analysis snapshot.
///
/// The loop only runs while playback is active. Pausing, stopping or
/// unmounting cancels the pending frame and clears the surface. When the
/// analysis tap cannot deliver data the renderer degrades to a blank surface
/// and leaves playback alone.
#[derive(Debug)]
pub struct VisualizationRenderer {
    config: VisualizationConfig,
    mapping: BucketMapping,
    frames: FrameLoop,
    surface: Frame,
    degraded: bool,
    frames_drawn: u64,
}

impl VisualizationRenderer {
    pub fn new(config: VisualizationConfig) -> Self {
        let size = config.size as f32;
        Self {
            mapping: BucketMapping::new(config.bar_count, BUCKET_COUNT),
            config,
            frames: FrameLoop::new(),
            surface: Frame::blank(size, size),
            degraded: false,
            frames_drawn: 0,
        }
    }

    pub fn config(&self) -> &VisualizationConfig {
        &self.config
    }

    /// Re-points the renderer at a new configuration. A pending frame is
    /// cancelled first and the loop resumes with the new settings.
    pub fn reconfigure(&mut self, config: VisualizationConfig) {
        let was_running = self.frames.is_running();
        self.frames.cancel();
        let size = config.size as f32;
        self.mapping = BucketMapping::new(config.bar_count, BUCKET_COUNT);
        self.surface = Frame::blank(size, size);
        self.config = config;
        if was_running {
            self.frames.start();
        }
    }

    /// Reacts to the two triggers that matter: track changes and play/pause.
    pub fn handle(&mut self, event: &PlaybackEvent) {
        match event {
            PlaybackEvent::TrackChanged { playing, .. } => {
                self.degraded = false;
                if *playing {
                    self.start();
                } else {
                    self.stop();
                }
            }
            PlaybackEvent::PlayStateChanged { playing } => {
                if *playing {
                    if !self.frames.is_running() {
                        self.start();
                    }
                } else {
                    self.stop();
                }
            }
            PlaybackEvent::AnalysisUnavailable { reason } => {
                tracing::warn!(%reason, "visualization disabled");
                self.degraded = true;
                self.stop();
            }
            _ => {}
        }
    }

    /// Starts (or restarts) the render loop.
    pub fn start(&mut self) {
        if self.degraded {
            return;
        }
        self.frames.start();
    }

    /// Cancels the pending frame and clears the surface.
    pub fn stop(&mut self) {
        self.frames.cancel();
        self.surface.clear();
    }

    pub fn unmount(&mut self) {
        self.stop();
    }

    /// Host display-refresh callback. Draws only when a frame is pending.
    pub fn animation_frame<S: SnapshotSource + ?Sized>(&mut self, source: &mut S) -> &Frame {
        if self.frames.fire().is_none() {
            return &self.surface;
        }

        match source.snapshot() {
            Ok(snapshot) => {
                self.surface = self.draw(&snapshot);
                self.frames_drawn += 1;
                self.frames.schedule();
            }
            Err(err) => {
                tracing::warn!(%err, "no analysis data, visualization disabled");
                self.degraded = true;
                self.surface.clear();
            }
        }
        &self.surface
    }

    pub fn surface(&self) -> &Frame {
        &self.surface
    }

    pub fn is_running(&self) -> bool {
        self.frames.is_running()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Renders `snapshot` in the configured mode without touching loop state.
    pub fn draw(&self, snapshot: &Snapshot) -> Frame {
        let size = self.config.size as f32;
        let mut frame = Frame::blank(size, size);
        match self.config.mode {
            RenderMode::Bars => self.draw_bars(&mut frame, snapshot),
            RenderMode::Radial => self.draw_radial(&mut frame, snapshot),
            RenderMode::Waveform => self.draw_waveform(&mut frame, snapshot),
        }
        frame
    }

    fn draw_bars(&self, frame: &mut Frame, snapshot: &Snapshot) {
        let slot = frame.width / self.mapping.len() as f32;
        let bar_width = slot * BAR_FILL_RATIO;
        let height = frame.height;

        for (i, fraction) in self.mapping.fractions(snapshot).enumerate() {
            let bar_height = fraction * height * BAR_HEIGHT_RATIO;
            let x = i as f32 * slot;

            frame.push(Shape::Rect {
                x,
                y: height - bar_height * 0.5,
                width: bar_width,
                height: bar_height * 0.5,
                fill: self.config.shadow_color.clone(),
            });
            frame.push(Shape::Rect {
                x,
                y: height - bar_height,
                width: bar_width,
                height: bar_height,
                fill: self.config.color.clone(),
            });
        }
    }

    fn draw_radial(&self, frame: &mut Frame, snapshot: &Snapshot) {
        let center = Point::new(frame.width / 2.0, frame.height / 2.0);
        let radius = center.x.min(center.y) * RADIAL_RADIUS_RATIO;
        let inner = radius * RADIAL_INNER_RATIO;
        let count = self.mapping.len() as f32;

        frame.push(Shape::Circle {
            center,
            radius: inner,
            fill: self.config.shadow_color.clone(),
        });

        for (i, fraction) in self.mapping.fractions(snapshot).enumerate() {
            let angle = i as f32 / count * TAU;
            let (sin, cos) = angle.sin_cos();
            let ray = fraction * radius * RADIAL_RAY_RATIO;

            let start = Point::new(center.x + cos * inner, center.y + sin * inner);
            let tip = Point::new(center.x + cos * (inner + ray), center.y + sin * (inner + ray));

            frame.push(Shape::Line {
                from: start,
                to: tip,
                stroke: Stroke {
                    color: self.config.color.clone(),
                    width: LINE_WIDTH,
                },
            });
            frame.push(Shape::Circle {
                center: tip,
                radius: DOT_RADIUS,
                fill: self.config.color.clone(),
            });
        }
    }

    fn draw_waveform(&self, frame: &mut Frame, snapshot: &Snapshot) {
        let width = frame.width;
        let height = frame.height;
        let middle = height / 2.0;
        let count = self.mapping.len() as f32;

        let mut line: Vec<Point> = self
            .mapping
            .fractions(snapshot)
            .enumerate()
            .map(|(i, fraction)| {
                let x = i as f32 / count * width;
                let y = middle + (fraction - 0.5) * height * WAVE_AMPLITUDE_RATIO;
                Point::new(x, y)
            })
            .collect();
        line.push(Point::new(width, middle));

        let mut area = line.clone();
        area.push(Point::new(width, height));
        area.push(Point::new(0.0, height));

        frame.push(Shape::Path {
            points: line,
            stroke: Some(Stroke {
                color: self.config.color.clone(),
                width: LINE_WIDTH,
            }),
            fill: None,
            closed: false,
        });
        frame.push(Shape::Path {
            points: area,
            stroke: None,
            fill: Some(Fill::VerticalGradient {
                top: self.config.shadow_color.clone(),
                bottom: TRANSPARENT.to_string(),
            }),
            closed: true,
        });
    }
}

impl Drop for VisualizationRenderer {
    fn drop(&mut self) {
        self.frames.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{AnalysisConfig, AnalysisTap, MediaTransport, SimulatedTransport};

    const URL: &str = "https://media.test/visual.mp3";

    fn config(mode: RenderMode, bar_count: usize) -> VisualizationConfig {
        VisualizationConfig {
            size: 100,
            bar_count,
            mode,
            ..Default::default()
        }
    }

    fn full_scale() -> Snapshot {
        Snapshot::from_buckets([255; BUCKET_COUNT])
    }

    fn attached_tap() -> (SimulatedTransport, AnalysisTap) {
        let mut transport = SimulatedTransport::default().with_media(URL, 30.0);
        transport.load(URL).unwrap();
        transport.poll(Duration::ZERO);
        transport.play().unwrap();
        let mut tap = AnalysisTap::new(AnalysisConfig::default());
        tap.attach(&transport).unwrap();
        (transport, tap)
    }

    #[test]
    fn bars_scale_to_eighty_percent_with_half_height_shadow() {
        let renderer = VisualizationRenderer::new(config(RenderMode::Bars, 10));
        let frame = renderer.draw(&full_scale());

        assert_eq!(frame.shapes.len(), 20);
        match (&frame.shapes[0], &frame.shapes[1]) {
            (
                Shape::Rect {
                    y: shadow_y,
                    height: shadow_height,
                    ..
                },
                Shape::Rect {
                    x,
                    y,
                    width,
                    height,
                    ..
                },
            ) => {
                assert_eq!(*x, 0.0);
                assert!((width - 8.0).abs() < 1e-4);
                assert!((height - 80.0).abs() < 1e-4);
                assert!((y - 20.0).abs() < 1e-4);
                assert!((shadow_height - 40.0).abs() < 1e-4);
                assert!((shadow_y - 60.0).abs() < 1e-4);
            }
            other => panic!("unexpected shapes {other:?}"),
        }
    }

    #[test]
    fn radial_rays_end_in_dots() {
        let renderer = VisualizationRenderer::new(config(RenderMode::Radial, 4));
        let frame = renderer.draw(&full_scale());

        assert_eq!(frame.shapes.len(), 1 + 4 * 2);
        assert!(matches!(frame.shapes[0], Shape::Circle { radius, .. } if (radius - 12.0).abs() < 1e-4));
        match (&frame.shapes[1], &frame.shapes[2]) {
            (Shape::Line { from, to, .. }, Shape::Circle { center, .. }) => {
                assert!((from.x - 62.0).abs() < 1e-4);
                assert!((to.x - 90.0).abs() < 1e-4);
                assert_eq!(to, center);
            }
            other => panic!("unexpected shapes {other:?}"),
        }
    }

    #[test]
    fn waveform_fills_under_the_line() {
        let renderer = VisualizationRenderer::new(config(RenderMode::Waveform, 5));
        let frame = renderer.draw(&Snapshot::silent());

        assert_eq!(frame.shapes.len(), 2);
        match &frame.shapes[0] {
            Shape::Path { points, closed, .. } => {
                assert_eq!(points.len(), 6);
                assert!(!closed);
                assert!((points[0].y - 15.0).abs() < 1e-4);
                assert_eq!(points[5], Point::new(100.0, 50.0));
            }
            other => panic!("unexpected shape {other:?}"),
        }
        assert!(matches!(
            &frame.shapes[1],
            Shape::Path { fill: Some(Fill::VerticalGradient { .. }), closed: true, .. }
        ));
    }

    #[test]
    fn draws_only_while_playing() {
        let (mut transport, mut tap) = attached_tap();
        let mut renderer = VisualizationRenderer::new(config(RenderMode::Bars, 8));

        assert!(renderer.animation_frame(&mut tap).is_blank());

        renderer.handle(&PlaybackEvent::PlayStateChanged { playing: true });
        transport.poll(Duration::from_millis(20));
        assert!(!renderer.animation_frame(&mut tap).is_blank());
        assert!(renderer.is_running());

        renderer.handle(&PlaybackEvent::PlayStateChanged { playing: false });
        assert!(!renderer.is_running());
        assert!(renderer.surface().is_blank());
        assert!(renderer.animation_frame(&mut tap).is_blank());
        assert_eq!(renderer.frames_drawn(), 1);
    }

    #[test]
    fn repeated_starts_keep_a_single_pending_frame() {
        let (_transport, mut tap) = attached_tap();
        let mut renderer = VisualizationRenderer::new(config(RenderMode::Bars, 8));

        renderer.start();
        renderer.start();
        renderer.handle(&PlaybackEvent::PlayStateChanged { playing: true });

        renderer.animation_frame(&mut tap);
        assert_eq!(renderer.frames_drawn(), 1);
        renderer.animation_frame(&mut tap);
        assert_eq!(renderer.frames_drawn(), 2);
    }

    #[test]
    fn missing_analysis_degrades_to_blank() {
        let mut tap = AnalysisTap::new(AnalysisConfig::default());
        let mut renderer = VisualizationRenderer::new(config(RenderMode::Radial, 8));

        renderer.start();
        assert!(renderer.animation_frame(&mut tap).is_blank());
        assert!(renderer.is_degraded());
        assert!(!renderer.is_running());

        renderer.handle(&PlaybackEvent::AnalysisUnavailable {
            reason: "unsupported".into(),
        });
        renderer.handle(&PlaybackEvent::PlayStateChanged { playing: true });
        assert!(!renderer.is_running());
    }

    #[test]
    fn unmount_cancels_pending_frame() {
        let (_transport, mut tap) = attached_tap();
        let mut renderer = VisualizationRenderer::new(config(RenderMode::Waveform, 8));
        renderer.start();
        renderer.unmount();

        assert!(renderer.animation_frame(&mut tap).is_blank());
        assert_eq!(renderer.frames_drawn(), 0);
    }

    #[test]
    fn reconfigure_keeps_loop_running() {
        let mut renderer = VisualizationRenderer::new(config(RenderMode::Bars, 8));
        renderer.start();
        renderer.reconfigure(config(RenderMode::Radial, 16));

        assert!(renderer.is_running());
        assert_eq!(renderer.config().mode, RenderMode::Radial);
        assert_eq!(renderer.draw(&full_scale()).shapes.len(), 1 + 32);
    }
}
