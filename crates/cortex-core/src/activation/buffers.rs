//! Ping-pong slice arena
//!
//! Two slots per hemisphere, indexed by a parity bit. The renderer only ever
//! reads the front slot; new slices are written into the back slot and become
//! visible through [`SliceBuffers::swap`], which the manager calls between
//! frames. GPU-side buffers in the surface pipeline follow the same parity.

use crate::types::{Generation, NEUTRAL_ACTIVATION};

/// One half of the ping-pong pair
#[derive(Debug, Clone, PartialEq)]
pub struct SliceSlot {
    pub values: Vec<f32>,
    /// Entity generation the values were computed from
    pub generation: Generation,
    /// Virtual time the values represent, `None` for the neutral fill
    pub time: Option<f64>,
}

impl SliceSlot {
    fn neutral(len: usize, generation: Generation) -> Self {
        Self {
            values: vec![NEUTRAL_ACTIVATION; len],
            generation,
            time: None,
        }
    }
}

/// Double-buffered per-vertex slice storage
#[derive(Debug, Clone, PartialEq)]
pub struct SliceBuffers {
    slots: [SliceSlot; 2],
    /// Parity of the front slot
    front: usize,
}

impl SliceBuffers {
    /// Both slots neutral with `len` values
    pub fn new(len: usize, generation: Generation) -> Self {
        Self {
            slots: [
                SliceSlot::neutral(len, generation),
                SliceSlot::neutral(len, generation),
            ],
            front: 0,
        }
    }

    /// Slot read by the renderer this frame
    #[inline]
    pub fn front(&self) -> &SliceSlot {
        &self.slots[self.front]
    }

    /// Parity bit of the front slot (0 or 1)
    #[inline]
    pub fn parity(&self) -> usize {
        self.front
    }

    /// Slot receiving the next slice
    #[inline]
    pub fn back_mut(&mut self) -> &mut SliceSlot {
        &mut self.slots[self.front ^ 1]
    }

    /// Publish the back slot
    #[inline]
    pub fn swap(&mut self) {
        self.front ^= 1;
    }

    /// Number of values per slot
    pub fn len(&self) -> usize {
        self.slots[self.front].values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace both slots with neutral slices of a new size
    ///
    /// Used on reload. The parity is kept so GPU buffers stay in step.
    pub fn reset(&mut self, len: usize, generation: Generation) {
        for slot in &mut self.slots {
            *slot = SliceSlot::neutral(len, generation);
        }
    }

    /// Install a computed slice into the back slot and publish it
    ///
    /// `values` is swapped in and the previous back storage is returned for
    /// reuse.
    pub fn publish(&mut self, values: Vec<f32>, generation: Generation, time: f64) -> Vec<f32> {
        let back = self.back_mut();
        let old = std::mem::replace(&mut back.values, values);
        back.generation = generation;
        back.time = Some(time);
        self.swap();
        old
    }
}
