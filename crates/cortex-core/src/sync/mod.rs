//! Cross-view time synchronization

mod atomics;
mod bus;
mod update;

pub use atomics::TimeAtomics;
pub use bus::{SubscriberId, SyncBus, TimeSubscriber};
pub use update::{TimeUpdate, UpdateCause};
