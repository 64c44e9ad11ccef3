//! Playback clock and its command queue

mod clock;
mod command;
mod state;

pub use clock::PlaybackClock;
pub use command::{
    command_channel, ClockCommand, CommandReceiver, CommandSender, ViewCommand, COMMAND_QUEUE_CAPACITY,
};
pub use state::{LoopMode, PlayStatus, PlaybackState};
