//! Lock-free transport command queue
//!
//! Producers on other threads (keyboard and pointer input layers, trace
//! browser seeks, the loader thread re-scrubbing after a reload) push `ClockCommand`s into an `rtrb` ring
//! buffer. The bus drains it at the frame boundary, so the clock keeps a
//! single writer and commands never land mid-frame.
//!
//! ```ignore
//! let mut tx = bus.attach_queue();
//! tx.push(ClockCommand::ScrubTo(1.25))?;
//! // next frame: session.advance_frame(dt) applies it
//! ```

use super::state::LoopMode;

/// Maximum number of queued commands
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Transport and time commands applied by the playback clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockCommand {
    Play,
    Pause,
    /// Play when paused or stopped, pause when playing
    TogglePlay,
    /// Stop and return to the domain start
    Stop,
    /// Jump to a time (clamped) and pause
    ScrubTo(f64),
    /// Set the rate multiplier; negative plays in reverse
    SetRate(f64),
    ToggleLoop,
    SetLoop(LoopMode),
}

/// View-originated time changes use the same vocabulary
pub type ViewCommand = ClockCommand;

/// Producer half of the queue, owned by the submitting thread
pub type CommandSender = rtrb::Producer<ClockCommand>;

/// Consumer half of the queue, drained by the bus
pub type CommandReceiver = rtrb::Consumer<ClockCommand>;

/// Create a command queue
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
