use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{PlayerError, Result};

/// Top-level configuration structure for the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub playback: PlaybackConfig,
    pub analysis: AnalysisConfig,
    pub visualization: VisualizationConfig,
}

impl AppConfig {
    /// Parses a JSON document. Missing sections and fields fall back to their
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the JSON configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        if self.analysis.sample_rate == 0 {
            return Err(PlayerError::InvalidInput("analysis sample rate must be positive"));
        }
        if !(0.0..=1.0).contains(&self.analysis.smoothing_time_constant) {
            return Err(PlayerError::InvalidInput(
                "smoothing time constant must lie in [0, 1]",
            ));
        }
        if self.analysis.min_decibels >= self.analysis.max_decibels {
            return Err(PlayerError::InvalidInput(
                "min_decibels must be below max_decibels",
            ));
        }
        if self.visualization.size == 0 || self.visualization.bar_count == 0 {
            return Err(PlayerError::InvalidInput(
                "visualization size and bar count must be positive",
            ));
        }
        Ok(())
    }
}

/// Configuration for the playback controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub initial_volume: f32,
    /// Grace period after which a load that never became ready is treated as
    /// failed. `None` leaves stall detection to the transport.
    pub load_timeout_ms: Option<u64>,
    /// Load the next playlist entry when a track ends.
    pub auto_advance: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            initial_volume: 0.8,
            load_timeout_ms: Some(15_000),
            auto_advance: false,
        }
    }
}

/// Configuration for the analysis session. The transform size is fixed at
/// [`crate::analysis::FFT_SIZE`] and deliberately absent here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sample_rate: u32,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

/// How a snapshot is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Bars,
    Radial,
    Waveform,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bars => "bars",
            Self::Radial => "radial",
            Self::Waveform => "waveform",
        };
        f.write_str(name)
    }
}

impl FromStr for RenderMode {
    type Err = PlayerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "bars" => Ok(Self::Bars),
            "radial" | "circular" => Ok(Self::Radial),
            "waveform" | "wave" => Ok(Self::Waveform),
            other => Err(PlayerError::msg(format!("unknown render mode `{other}`"))),
        }
    }
}

/// Options recognised by the visualization renderer. Has no effect on
/// playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// Width and height of the square drawing surface, in pixels.
    pub size: u32,
    pub bar_count: usize,
    pub color: String,
    pub shadow_color: String,
    pub mode: RenderMode,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            size: 300,
            bar_count: 50,
            color: "#4F46E5".to_string(),
            shadow_color: "rgba(79, 70, 229, 0.3)".to_string(),
            mode: RenderMode::Bars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config =
            AppConfig::from_json_str(r#"{ "visualization": { "mode": "radial", "bar_count": 64 } }"#)
                .unwrap();

        assert_eq!(config.visualization.mode, RenderMode::Radial);
        assert_eq!(config.visualization.bar_count, 64);
        assert_eq!(config.visualization.size, 300);
        assert_eq!(config.playback, PlaybackConfig::default());
        assert_eq!(config.analysis.smoothing_time_constant, 0.8);
    }

    #[test]
    fn rejects_inverted_decibel_range() {
        let err = AppConfig::from_json_str(
            r#"{ "analysis": { "min_decibels": -20.0, "max_decibels": -30.0 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, PlayerError::InvalidInput(_)));
    }

    #[test]
    fn parses_render_mode_aliases() {
        assert_eq!("wave".parse::<RenderMode>().unwrap(), RenderMode::Waveform);
        assert_eq!("Circular".parse::<RenderMode>().unwrap(), RenderMode::Radial);
        assert!("spiral".parse::<RenderMode>().is_err());
        assert_eq!(RenderMode::Bars.to_string(), "bars");
    }
}
