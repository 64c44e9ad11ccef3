//! Playback state owned by the clock

use serde::{Deserialize, Serialize};

/// Transport status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PlayStatus {
    #[default]
    Stopped = 0,
    Playing = 1,
    Paused = 2,
}

impl PlayStatus {
    /// Decode the value stored in [`TimeAtomics`](crate::sync::TimeAtomics)
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PlayStatus::Playing,
            2 => PlayStatus::Paused,
            _ => PlayStatus::Stopped,
        }
    }
}

/// Behaviour at the ends of the domain while playing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopMode {
    /// Stop advancing and pause at the boundary reached
    #[default]
    Off,
    /// Wrap around to the opposite end and keep playing
    Repeat,
}

impl LoopMode {
    pub fn toggled(self) -> Self {
        match self {
            LoopMode::Off => LoopMode::Repeat,
            LoopMode::Repeat => LoopMode::Off,
        }
    }
}

/// Snapshot of the clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    /// Current virtual time in seconds
    pub time: f64,
    /// Rate multiplier, negative for reverse playback
    pub rate: f64,
    pub status: PlayStatus,
    pub loop_mode: LoopMode,
}

impl PlaybackState {
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.status == PlayStatus::Playing
    }
}
