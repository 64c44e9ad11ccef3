//! Playback clock
//!
//! The only writer of [`PlaybackState`]. Every operation returns whether it
//! changed the state, so the bus can skip notifications for no-ops. Times are
//! always clamped into the current domain; an out-of-range request is never
//! an error.

use super::command::ClockCommand;
use super::state::{LoopMode, PlayStatus, PlaybackState};
use crate::timeline::TimeDomain;

/// Frame-driven playback clock
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    state: PlaybackState,
    domain: TimeDomain,
}

impl PlaybackClock {
    /// Stopped at the domain start
    pub fn new(domain: TimeDomain, rate: f64, loop_mode: LoopMode) -> Self {
        Self {
            state: PlaybackState {
                time: domain.t_min,
                rate: if rate.is_finite() { rate } else { 1.0 },
                status: PlayStatus::Stopped,
                loop_mode,
            },
            domain,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.state.time
    }

    pub fn domain(&self) -> TimeDomain {
        self.domain
    }

    /// Start playing
    ///
    /// With loop off, playing from the end of travel (the end the rate moves
    /// towards) rewinds to the opposite end first.
    pub fn play(&mut self) -> bool {
        if self.state.status == PlayStatus::Playing {
            return false;
        }
        if self.state.loop_mode == LoopMode::Off {
            let rate = self.state.rate;
            if rate > 0.0 && self.state.time >= self.domain.t_max {
                self.state.time = self.domain.t_min;
            } else if rate < 0.0 && self.state.time <= self.domain.t_min {
                self.state.time = self.domain.t_max;
            }
        }
        self.state.status = PlayStatus::Playing;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state.status != PlayStatus::Playing {
            return false;
        }
        self.state.status = PlayStatus::Paused;
        true
    }

    /// Stop and return to the domain start
    pub fn stop(&mut self) -> bool {
        let changed = self.state.status != PlayStatus::Stopped || self.state.time != self.domain.t_min;
        self.state.status = PlayStatus::Stopped;
        self.state.time = self.domain.t_min;
        changed
    }

    /// Jump to `t` (clamped) and pause
    pub fn scrub_to(&mut self, t: f64) -> bool {
        let t = self.domain.clamp(t);
        let changed = self.state.status != PlayStatus::Paused || self.state.time != t;
        self.state.status = PlayStatus::Paused;
        self.state.time = t;
        changed
    }

    /// Set the rate multiplier; non-finite values are ignored
    pub fn set_rate(&mut self, rate: f64) -> bool {
        if !rate.is_finite() || rate == self.state.rate {
            return false;
        }
        self.state.rate = rate;
        true
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.state.loop_mode = self.state.loop_mode.toggled();
        true
    }

    pub fn set_loop(&mut self, mode: LoopMode) -> bool {
        if self.state.loop_mode == mode {
            return false;
        }
        self.state.loop_mode = mode;
        true
    }

    /// Replace the domain after a reload, re-clamping the current time
    ///
    /// Returns whether the domain or the time changed. Play status is kept.
    pub fn set_domain(&mut self, domain: TimeDomain) -> bool {
        let time = domain.clamp(self.state.time);
        let changed = domain != self.domain || time != self.state.time;
        self.domain = domain;
        self.state.time = time;
        changed
    }

    /// Advance by `elapsed` wall-clock seconds
    ///
    /// Only moves while playing. Loop `Repeat` wraps modulo the domain duration
    /// in either direction; loop `Off` stops at the boundary and pauses.
    pub fn tick(&mut self, elapsed: f64) -> bool {
        if self.state.status != PlayStatus::Playing || !elapsed.is_finite() || elapsed <= 0.0 {
            return false;
        }
        let delta = elapsed * self.state.rate;
        if delta == 0.0 {
            return false;
        }

        let TimeDomain { t_min, t_max } = self.domain;
        let duration = self.domain.duration();
        let target = self.state.time + delta;
        let before = self.state;

        match self.state.loop_mode {
            LoopMode::Repeat if duration > 0.0 => {
                self.state.time = if target >= t_max || target < t_min {
                    t_min + (target - t_min).rem_euclid(duration)
                } else {
                    target
                };
            }
            _ => {
                if delta > 0.0 && target >= t_max {
                    self.state.time = t_max;
                    self.state.status = PlayStatus::Paused;
                } else if delta < 0.0 && target <= t_min {
                    self.state.time = t_min;
                    self.state.status = PlayStatus::Paused;
                } else {
                    self.state.time = target;
                }
            }
        }

        self.state != before
    }

    /// Apply a queued command
    pub fn apply(&mut self, command: ClockCommand) -> bool {
        match command {
            ClockCommand::Play => self.play(),
            ClockCommand::Pause => self.pause(),
            ClockCommand::TogglePlay => {
                if self.state.status == PlayStatus::Playing {
                    self.pause()
                } else {
                    self.play()
                }
            }
            ClockCommand::Stop => self.stop(),
            ClockCommand::ScrubTo(t) => self.scrub_to(t),
            ClockCommand::SetRate(rate) => self.set_rate(rate),
            ClockCommand::ToggleLoop => self.toggle_loop(),
            ClockCommand::SetLoop(mode) => self.set_loop(mode),
        }
    }
}
