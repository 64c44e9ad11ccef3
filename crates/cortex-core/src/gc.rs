//! Deferred deallocation for large shared entities
//!
//! Source estimates and recordings can run to hundreds of megabytes. They are
//! shared between the session, the slice worker and in-flight frames through
//! `basedrop::Shared<T>`. Dropping the last handle on the render thread only
//! enqueues the pointer; the memory is released on the `entity-gc` thread, so
//! a reload never stalls a frame on `munmap`.
//!
//! ```ignore
//! use basedrop::Shared;
//! use cortex_core::gc::gc_handle;
//!
//! let estimate = Shared::new(&gc_handle(), estimate);
//! let for_worker = estimate.clone();
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Interval between collection passes
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    // Collector is !Sync, so it is created on the thread that owns it
    thread::Builder::new()
        .name("entity-gc".to_string())
        .spawn(move || {
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }
            log::info!("init_gc: entity collector thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn entity GC thread");

    rx.recv().expect("Entity GC thread exited before sending its handle")
}

/// Handle for wrapping entities in `Shared<T>`
///
/// The collector thread is started on first use.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Shared;

    #[test]
    fn test_shared_clone_and_drop() {
        let handle = gc_handle();
        let data = Shared::new(&handle, vec![1.0f32; 4096]);
        let other = data.clone();
        drop(data);
        assert_eq!(other.len(), 4096);
        drop(other);
    }
}
