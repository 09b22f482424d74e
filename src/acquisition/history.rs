// src/acquisition/history.rs
//! Bounded history of processed pulses

use crate::acquisition::record::PulseRecord;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Position of the writer in the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Cursor {
    write_index: usize,
    full: bool,
    appended: u64,
}

impl Cursor {
    fn len(&self, capacity: usize) -> usize {
        if self.full {
            capacity
        } else {
            self.write_index
        }
    }
}

/// Fixed-capacity ring of immutable pulse records
///
/// Records are stored behind `Arc`, so storing one is a pointer swap and a
/// reader keeps a whole record even after the slot is reused. The cursor
/// mutex is held only for index bookkeeping and that swap.
///
/// Sequence numbers let readers recognise slots that were overwritten
/// between reading the cursor and reading the slot; such entries are left
/// out of [`last_k`](Self::last_k) rather than returned out of order.
#[derive(Debug)]
pub struct HistoryStore {
    slots: Box<[RwLock<Option<Arc<PulseRecord>>>]>,
    cursor: Mutex<Cursor>,
    usable_depth: usize,
}

impl HistoryStore {
    /// `capacity` slots, of which the newest `usable_depth` are readable
    pub fn new(capacity: usize, usable_depth: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| RwLock::new(None)).collect(),
            cursor: Mutex::new(Cursor::default()),
            usable_depth: usable_depth.clamp(1, capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn usable_depth(&self) -> usize {
        self.usable_depth
    }

    /// Store `record` in the next slot and return its sequence number
    pub fn append(&self, mut record: PulseRecord) -> u64 {
        let capacity = self.capacity();
        let mut cursor = self.cursor.lock();
        let sequence = cursor.appended;
        record.sequence = sequence;

        let previous = self.slots[cursor.write_index].write().replace(Arc::new(record));

        cursor.write_index = (cursor.write_index + 1) % capacity;
        if cursor.write_index == 0 {
            cursor.full = true;
        }
        cursor.appended += 1;
        drop(cursor);

        // release the overwritten record outside the lock
        drop(previous);
        sequence
    }

    /// Newest record, if any
    pub fn most_recent(&self) -> Option<Arc<PulseRecord>> {
        let cursor = *self.cursor.lock();
        if cursor.len(self.capacity()) == 0 {
            return None;
        }
        let index = (cursor.write_index + self.capacity() - 1) % self.capacity();
        self.slots[index].read().clone()
    }

    /// Up to `k` newest records, oldest first
    ///
    /// Bounded by the records stored and by the usable depth.
    pub fn last_k(&self, k: usize) -> Vec<Arc<PulseRecord>> {
        let cursor = *self.cursor.lock();
        self.window(cursor, k)
    }

    fn window(&self, cursor: Cursor, k: usize) -> Vec<Arc<PulseRecord>> {
        let capacity = self.capacity();
        let count = k.min(cursor.len(capacity)).min(self.usable_depth);
        let first_sequence = cursor.appended - count as u64;

        let mut records = Vec::with_capacity(count);
        for offset in 0..count {
            let index = (cursor.write_index + capacity - count + offset) % capacity;
            let Some(record) = self.slots[index].read().clone() else {
                continue;
            };
            if record.sequence == first_sequence + offset as u64 {
                records.push(record);
            }
        }
        records
    }

    /// Number of readable records
    pub fn len(&self) -> usize {
        self.cursor.lock().len(self.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once every slot has been written at least once
    pub fn is_full(&self) -> bool {
        self.cursor.lock().full
    }

    /// Total records appended since creation
    pub fn appended(&self) -> u64 {
        self.cursor.lock().appended
    }

    /// Forget all stored records; sequence numbers keep counting
    pub fn clear(&self) {
        let mut cursor = self.cursor.lock();
        cursor.write_index = 0;
        cursor.full = false;
        for slot in self.slots.iter() {
            *slot.write() = None;
        }
    }
}
