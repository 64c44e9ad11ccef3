//! Engine configuration
//!
//! - Generic YAML config loading/saving
//! - Standard config paths
//! - Playback, activation and display sections
//!
//! # Usage
//!
//! ```ignore
//! use cortex_core::config::{default_config_path, load_config, save_config, EngineConfig};
//!
//! let path = default_config_path("config.yaml");
//! let config: EngineConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod engine;
mod io;
mod paths;

pub use engine::{ActivationConfig, DisplayConfig, EngineConfig, PlaybackConfig, SchedulingMode, MAX_FRAME_BUDGET_MS};
pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path};

pub use crate::view::{Aggregation, Normalization};
