// src/acquisition/frames.rs
//! Ping-pong frame slots for block-copy acquisition

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Two preallocated frames shared by the interrupt handler and the worker
///
/// One slot is owned by the hardware (the next block copy lands there), the
/// other by the worker. A completed transfer hands the filled slot over to
/// the worker by flipping the ownership index. Neither side ever allocates.
#[derive(Debug)]
pub struct FrameArena {
    slots: [Mutex<Box<[i16]>>; 2],
    hardware_slot: AtomicUsize,
    frame_len: usize,
}

impl FrameArena {
    pub fn new(frame_len: usize) -> Self {
        let slot = || Mutex::new(vec![0i16; frame_len].into_boxed_slice());
        Self {
            slots: [slot(), slot()],
            hardware_slot: AtomicUsize::new(0),
            frame_len,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Slot the next block copy targets
    pub fn hardware_slot(&self) -> usize {
        self.hardware_slot.load(Ordering::Acquire)
    }

    /// Slot the worker reads
    pub fn worker_slot(&self) -> usize {
        1 - self.hardware_slot()
    }

    /// Non-blocking access to the hardware slot, for interrupt context
    pub fn try_hardware_frame(&self) -> Option<MutexGuard<'_, Box<[i16]>>> {
        self.slots[self.hardware_slot()].try_lock()
    }

    /// The filled hardware slot becomes the worker slot
    ///
    /// Returns the index now owned by the worker.
    pub fn hand_over(&self) -> usize {
        self.hardware_slot.fetch_xor(1, Ordering::AcqRel)
    }

    /// Lock the worker slot
    pub fn worker_frame(&self) -> MutexGuard<'_, Box<[i16]>> {
        self.slots[self.worker_slot()].lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_preallocated() {
        let arena = FrameArena::new(8);
        assert_eq!(arena.frame_len(), 8);
        assert_eq!(arena.worker_frame().len(), 8);
        assert_eq!(arena.try_hardware_frame().map(|f| f.len()), Some(8));
    }

    #[test]
    fn test_hand_over_flips_ownership() {
        let arena = FrameArena::new(4);
        assert_eq!(arena.hardware_slot(), 0);
        assert_eq!(arena.worker_slot(), 1);

        if let Some(mut frame) = arena.try_hardware_frame() {
            frame.copy_from_slice(&[1, 2, 3, 4]);
        }
        assert_eq!(arena.hand_over(), 0);
        assert_eq!(arena.worker_slot(), 0);
        assert_eq!(&arena.worker_frame()[..], &[1, 2, 3, 4]);

        assert_eq!(arena.hand_over(), 1);
        assert_eq!(arena.hardware_slot(), 0);
    }

    #[test]
    fn test_hardware_slot_busy_while_locked() {
        let arena = FrameArena::new(2);
        let held = arena.try_hardware_frame();
        assert!(held.is_some());
        assert!(arena.try_hardware_frame().is_none());
        drop(held);
        assert!(arena.try_hardware_frame().is_some());
    }
}
