//! Lock-free mirror of the last broadcast time
//!
//! Readers on other threads (slice worker diagnostics, controller feedback,
//! a remote status display) poll these without touching the bus. Values are
//! stored with `Relaxed` ordering except the sequence number, which is
//! written last with `Release` so a reader that sees a new sequence sees the
//! fields stored before it.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use super::update::TimeUpdate;
use crate::clock::{LoopMode, PlayStatus};

pub struct TimeAtomics {
    time_bits: AtomicU64,
    rate_bits: AtomicU64,
    status: AtomicU8,
    looping: AtomicBool,
    sequence: AtomicU64,
}

impl TimeAtomics {
    pub fn new() -> Self {
        Self {
            time_bits: AtomicU64::new(0.0f64.to_bits()),
            rate_bits: AtomicU64::new(1.0f64.to_bits()),
            status: AtomicU8::new(PlayStatus::Stopped as u8),
            looping: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        }
    }

    /// Mirror a broadcast update
    pub fn store(&self, update: &TimeUpdate) {
        self.time_bits.store(update.time.to_bits(), Ordering::Relaxed);
        self.rate_bits.store(update.rate.to_bits(), Ordering::Relaxed);
        self.status.store(update.status as u8, Ordering::Relaxed);
        self.looping
            .store(update.loop_mode == LoopMode::Repeat, Ordering::Relaxed);
        self.sequence.store(update.sequence, Ordering::Release);
    }

    #[inline]
    pub fn time(&self) -> f64 {
        f64::from_bits(self.time_bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn rate(&self) -> f64 {
        f64::from_bits(self.rate_bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn status(&self) -> PlayStatus {
        PlayStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.status() == PlayStatus::Playing
    }

    #[inline]
    pub fn loop_mode(&self) -> LoopMode {
        if self.looping.load(Ordering::Relaxed) {
            LoopMode::Repeat
        } else {
            LoopMode::Off
        }
    }

    /// Sequence number of the last mirrored update
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }
}

impl Default for TimeAtomics {
    fn default() -> Self {
        Self::new()
    }
}
