//! Broadcast payload

use crate::clock::{LoopMode, PlayStatus, PlaybackState};
use crate::timeline::TimeDomain;

/// What produced an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateCause {
    /// Frame tick while playing
    Tick,
    /// Direct time change (view click, scrub handle)
    Scrub,
    /// Play, pause, stop, rate or loop change
    Transport,
    /// Reload changed the canonical domain
    DomainChanged,
}

/// One state change as seen by every subscriber
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUpdate {
    /// Strictly increasing per broadcast
    pub sequence: u64,
    pub time: f64,
    /// Time of the previous broadcast
    pub previous_time: f64,
    pub status: PlayStatus,
    pub rate: f64,
    pub loop_mode: LoopMode,
    pub domain: TimeDomain,
    pub cause: UpdateCause,
}

impl TimeUpdate {
    pub(crate) fn from_state(
        sequence: u64,
        state: PlaybackState,
        previous_time: f64,
        domain: TimeDomain,
        cause: UpdateCause,
    ) -> Self {
        Self {
            sequence,
            time: state.time,
            previous_time,
            status: state.status,
            rate: state.rate,
            loop_mode: state.loop_mode,
            domain,
            cause,
        }
    }

    /// Time moved backwards (reverse playback, scrub or loop wrap)
    pub fn is_backward_jump(&self) -> bool {
        self.time < self.previous_time
    }
}
