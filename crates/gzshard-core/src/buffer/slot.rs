use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread;

use crate::telemetry::{self, tags};
use crate::types::CompressedBlock;
use crate::{Result, ShardError};

/// Fixed-capacity ring of compressed blocks shared by the workers and the packer.
///
/// Blocks leave the ring in exactly the order they were inserted, which is
/// worker completion order rather than original block order. Insertion waits
/// while the ring is full, so the write pointer can never lap the read pointer.
///
/// All pointer and cell updates happen under one mutex. The lock is never held
/// while compressing or writing; waiters park on condition variables, which
/// release it.
#[derive(Debug)]
pub struct SlotBuffer {
    capacity: usize,
    state: Mutex<RingState>,
    /// Signalled when a block is inserted or the ring is closed or aborted.
    available: Condvar,
    /// Signalled when a block is removed or the ring is aborted.
    space_freed: Condvar,
}

#[derive(Debug)]
struct RingState {
    slots: Vec<Option<CompressedBlock>>,
    read: usize,
    write: usize,
    len: usize,
    high_water: usize,
    exhausted: bool,
    aborted: bool,
}

impl SlotBuffer {
    /// Creates a ring with `capacity` slots. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(RingState {
                slots: (0..capacity).map(|_| None).collect(),
                read: 0,
                write: 0,
                len: 0,
                high_water: 0,
                exhausted: false,
                aborted: false,
            }),
            available: Condvar::new(),
            space_freed: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of inserted blocks the packer has not removed yet.
    pub fn occupancy(&self) -> usize {
        self.lock().len
    }

    /// Highest occupancy ever reached, observed under the ring lock.
    pub fn high_water_mark(&self) -> usize {
        self.lock().high_water
    }

    pub fn is_exhausted(&self) -> bool {
        self.lock().exhausted
    }

    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    /// Inserts a block at the write pointer, waiting while the ring is full.
    ///
    /// # Errors
    /// Returns [`ShardError::Aborted`] if the run was aborted or the ring was
    /// already [marked exhausted](Self::mark_exhausted).
    pub fn push(&self, block: CompressedBlock) -> Result<()> {
        let mut state = self.lock();
        while state.len == self.capacity && !state.aborted {
            state = self.wait(&self.space_freed, state);
        }
        if state.aborted {
            return Err(ShardError::Aborted("slot buffer aborted while inserting"));
        }
        if state.exhausted {
            return Err(ShardError::Aborted("slot buffer already marked exhausted"));
        }

        let write = state.write;
        state.slots[write] = Some(block);
        state.write = (write + 1) % self.capacity;
        state.len += 1;
        state.high_water = state.high_water.max(state.len);
        let occupancy = state.len;
        drop(state);

        self.available.notify_one();
        record_occupancy(occupancy);
        Ok(())
    }

    /// Removes the block at the read pointer, waiting while the ring is empty.
    ///
    /// Returns `Ok(None)` once the ring is empty and marked exhausted.
    pub fn pop(&self) -> Result<Option<CompressedBlock>> {
        let mut state = self.lock();
        while state.len == 0 && !state.exhausted && !state.aborted {
            state = self.wait(&self.available, state);
        }
        if state.aborted {
            return Err(ShardError::Aborted("slot buffer aborted while draining"));
        }
        if state.len == 0 {
            return Ok(None);
        }

        let read = state.read;
        let block = state.slots[read].take();
        state.read = (read + 1) % self.capacity;
        state.len -= 1;
        let occupancy = state.len;
        drop(state);

        self.space_freed.notify_all();
        record_occupancy(occupancy);
        block
            .map(Some)
            .ok_or(ShardError::Aborted("slot buffer read an empty cell"))
    }

    /// Blocks until occupancy drops below `threshold`.
    ///
    /// A threshold of zero is treated as one so the call can always return.
    pub fn wait_until_below(&self, threshold: usize) -> Result<()> {
        let threshold = threshold.max(1);
        let mut state = self.lock();
        while state.len >= threshold && !state.aborted {
            state = self.wait(&self.space_freed, state);
        }
        if state.aborted {
            return Err(ShardError::Aborted("slot buffer aborted while throttling"));
        }
        Ok(())
    }

    /// Signals that no further blocks will be inserted.
    pub fn mark_exhausted(&self) {
        self.lock().exhausted = true;
        self.available.notify_all();
    }

    /// Fails the run: every current and future waiter returns an error.
    pub fn abort(&self) {
        let mut state = self.lock();
        state.aborted = true;
        for slot in state.slots.iter_mut() {
            slot.take();
        }
        state.len = 0;
        drop(state);

        self.available.notify_all();
        self.space_freed.notify_all();
    }

    /// Returns a guard that aborts the ring if its holder unwinds.
    pub(crate) fn abort_on_panic(&self) -> AbortOnPanic<'_> {
        AbortOnPanic { slots: self }
    }

    fn lock(&self) -> MutexGuard<'_, RingState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait<'a>(
        &self,
        condvar: &Condvar,
        guard: MutexGuard<'a, RingState>,
    ) -> MutexGuard<'a, RingState> {
        match condvar.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Aborts the ring when dropped during a panic, so peers blocked on it wake up.
pub(crate) struct AbortOnPanic<'a> {
    slots: &'a SlotBuffer,
}

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.slots.abort();
        }
    }
}

fn record_occupancy(occupancy: usize) {
    telemetry::set_gauge(tags::METRIC_SLOT_OCCUPANCY, occupancy as u64);
    telemetry::record_histogram(tags::METRIC_SLOT_OCCUPANCY_HIST, occupancy as u64);
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn guard_aborts_only_on_unwind() {
        let slots = SlotBuffer::new(2);
        {
            let _guard = slots.abort_on_panic();
        }
        assert!(!slots.is_aborted());

        let unwound = catch_unwind(AssertUnwindSafe(|| {
            let _guard = slots.abort_on_panic();
            panic!("holder crashed");
        }));
        assert!(unwound.is_err());
        assert!(slots.is_aborted());
    }
}
