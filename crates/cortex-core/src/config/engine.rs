//! Engine configuration sections
//!
//! Every section is `#[serde(default)]`, so a partial YAML file fills the
//! missing fields from the defaults below.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::LoopMode;
use crate::view::{Aggregation, Normalization, ViewConfig, ViewMode};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub playback: PlaybackConfig,
    pub activation: ActivationConfig,
    pub display: DisplayConfig,
}

/// Playback clock defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Rate multiplier applied at session start
    /// Default: 1.0 (real time)
    pub default_rate: f64,

    /// Loop mode applied at session start
    /// Default: Off
    pub loop_mode: LoopMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_rate: 1.0,
            loop_mode: LoopMode::Off,
        }
    }
}

/// Where per-vertex slices are computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingMode {
    /// On the render thread, inside `prepare_frame`
    Inline,
    /// On the slice worker thread, bounded by the frame budget
    #[default]
    Background,
}

/// Activation buffer manager tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    pub scheduling: SchedulingMode,

    /// Longest the render thread waits for a slice, in milliseconds
    /// When exceeded, the previous slice is held for this frame.
    /// Default: 4.0
    pub frame_budget_ms: f64,

    /// Meshes with at least this many vertices are interpolated with rayon
    /// Default: 16384
    pub parallel_vertex_threshold: usize,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            scheduling: SchedulingMode::Background,
            frame_budget_ms: 4.0,
            parallel_vertex_threshold: 16_384,
        }
    }
}

/// Upper bound on the per-frame wait for slice results
pub const MAX_FRAME_BUDGET_MS: f64 = 1000.0;

impl ActivationConfig {
    /// Frame budget as a `Duration`
    ///
    /// Negative or non-finite values mean zero; larger values are capped at
    /// [`MAX_FRAME_BUDGET_MS`].
    pub fn frame_budget(&self) -> Duration {
        if self.frame_budget_ms.is_finite() && self.frame_budget_ms > 0.0 {
            Duration::from_secs_f64(self.frame_budget_ms.min(MAX_FRAME_BUDGET_MS) / 1000.0)
        } else {
            Duration::ZERO
        }
    }
}

/// Initial view state and overlay options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub mode: ViewMode,
    pub traces_overlay: bool,
    pub normalization: Normalization,
    pub aggregation: Aggregation,

    /// Maximum number of per-vertex lines in the source browser
    /// Default: 64
    pub butterfly_max_lines: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: ViewMode::Activation,
            traces_overlay: false,
            normalization: Normalization::Global,
            aggregation: Aggregation::Rms,
            butterfly_max_lines: 64,
        }
    }
}

impl DisplayConfig {
    /// Initial per-frame view state
    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            mode: self.mode,
            traces_overlay: self.traces_overlay,
            normalization: self.normalization,
            aggregation: self.aggregation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "activation:\n  scheduling: Inline\ndisplay:\n  aggregation: Peak\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.activation.scheduling, SchedulingMode::Inline);
        assert_eq!(config.activation.frame_budget_ms, 4.0);
        assert_eq!(config.display.aggregation, Aggregation::Peak);
        assert_eq!(config.display.normalization, Normalization::Global);
        assert_eq!(config.playback, PlaybackConfig::default());
    }

    #[test]
    fn test_frame_budget_never_negative() {
        let mut config = ActivationConfig::default();
        assert_eq!(config.frame_budget(), Duration::from_millis(4));
        config.frame_budget_ms = -1.0;
        assert_eq!(config.frame_budget(), Duration::ZERO);
    }

    #[test]
    fn test_huge_frame_budget_is_capped() {
        let yaml = "activation:\n  frame_budget_ms: 1.0e30\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.activation.frame_budget(), Duration::from_secs(1));
    }

    #[test]
    fn test_display_to_view_config() {
        let display = DisplayConfig {
            mode: ViewMode::Atlas,
            traces_overlay: true,
            ..DisplayConfig::default()
        };
        let view = display.view_config();
        assert_eq!(view.mode, ViewMode::Atlas);
        assert!(view.traces_overlay);
    }
}
