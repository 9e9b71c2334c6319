//! Bounded circular store of converted sample blocks
//!
//! One producer (the reader thread) and one consumer (the backend callback)
//! exchange fixed-size blocks through `N` pre-allocated slots. The write and
//! read cursors count modulo `2N`, so full and empty are distinguishable
//! without a separate length field: `empty ⇔ w == r`, `full ⇔ w == r ^ N`,
//! and the physical slot index is `cursor & (N-1)`.
//!
//! Both cursors and the lifecycle phase live under one mutex, and both
//! condvars are associated with that same mutex. Every wait re-checks its
//! predicate in a loop, and terminal phase transitions `notify_all` both
//! condvars, so no waiter can miss a wakeup or block past shutdown.
//!
//! Slot payloads are not guarded by the cursor lock. Each slot carries its
//! own lock, held only by the end that currently owns the slot: the cursor
//! invariants guarantee a slot is never writable and readable at the same
//! time, so the slot locks are uncontended in normal operation.

use std::sync::{Condvar, Mutex, MutexGuard};

use crate::error::{ConfigError, ConfigResult};

use super::lifecycle::Phase;

struct Cursors {
    /// Write cursor, mod 2N
    w: usize,
    /// Read cursor, mod 2N
    r: usize,
    phase: Phase,
}

/// Fixed-capacity SPSC ring of device-format sample blocks
pub struct BlockRing {
    cursors: Mutex<Cursors>,
    /// Signaled on publish and on terminal transitions
    readable: Condvar,
    /// Signaled on release and on terminal transitions
    writable: Condvar,
    slots: Box<[Mutex<Box<[i16]>>]>,
    /// Capacity in blocks (power of two)
    capacity: usize,
    /// Interleaved i16 count per block (2 * samples per block)
    block_len: usize,
}

impl BlockRing {
    /// Allocate a ring of `capacity_blocks` slots, each holding
    /// `samples_per_block` interleaved IQ pairs in device format.
    pub fn new(capacity_blocks: usize, samples_per_block: usize) -> ConfigResult<Self> {
        if capacity_blocks == 0 || !capacity_blocks.is_power_of_two() {
            return Err(ConfigError::RingCapacity(capacity_blocks));
        }
        if samples_per_block == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }

        let block_len = samples_per_block * 2;
        let slots = (0..capacity_blocks)
            .map(|_| Mutex::new(vec![0i16; block_len].into_boxed_slice()))
            .collect();

        Ok(Self {
            cursors: Mutex::new(Cursors {
                w: 0,
                r: 0,
                phase: Phase::Running,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
            slots,
            capacity: capacity_blocks,
            block_len,
        })
    }

    /// Capacity in blocks
    pub fn capacity_blocks(&self) -> usize {
        self.capacity
    }

    /// IQ pairs per block
    pub fn samples_per_block(&self) -> usize {
        self.block_len / 2
    }

    /// Interleaved `i16` count per block
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Published-but-unreleased block count
    pub fn occupied_blocks(&self) -> usize {
        let c = self.lock_cursors();
        self.occupied(&c)
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.lock_cursors().phase
    }

    /// Transition out of `Running`. Returns false if the phase was already
    /// terminal (transitions are monotone). Wakes every waiter on success.
    pub(crate) fn transition(&self, to: Phase) -> bool {
        debug_assert!(to.is_terminal());
        let mut c = self.lock_cursors();
        if c.phase.is_terminal() {
            return false;
        }
        c.phase = to;
        self.readable.notify_all();
        self.writable.notify_all();
        true
    }

    /// Reserve the next writable slot, blocking while the ring is full.
    ///
    /// Returns `None` once the phase leaves `Running`; the producer must
    /// then end its loop.
    pub fn reserve_write(&self) -> Option<WriteSlot<'_>> {
        let mut c = self.lock_cursors();
        loop {
            if c.phase.is_terminal() {
                return None;
            }
            if !self.is_full(&c) {
                break;
            }
            c = self.wait(&self.writable, c);
        }
        let idx = c.w & (self.capacity - 1);
        drop(c);

        Some(WriteSlot {
            ring: self,
            data: self.lock_slot(idx),
        })
    }

    /// Reserve the oldest filled slot, blocking while the ring is empty.
    ///
    /// Returns `None` when a stop was requested (immediately, even if data
    /// remains) or when the input is exhausted and the ring has drained —
    /// i.e. "no more data, ever".
    pub fn reserve_read(&self) -> Option<ReadSlot<'_>> {
        let mut c = self.lock_cursors();
        if self.is_empty(&c) && c.phase == Phase::Running {
            log::warn!("input buffer underrun");
        }
        loop {
            if c.phase == Phase::StopRequested {
                return None;
            }
            if !self.is_empty(&c) {
                break;
            }
            if c.phase == Phase::InputExhausted {
                return None;
            }
            c = self.wait(&self.readable, c);
        }
        let idx = c.r & (self.capacity - 1);
        drop(c);

        Some(ReadSlot {
            ring: self,
            data: self.lock_slot(idx),
        })
    }

    /// Block until the ring is full or the phase is terminal.
    ///
    /// Used once at startup to let the producer build up headroom before the
    /// real-time consumer starts draining.
    pub fn wait_until_primed(&self) {
        let mut c = self.lock_cursors();
        while c.phase == Phase::Running && !self.is_full(&c) {
            c = self.wait(&self.readable, c);
        }
    }

    fn advance_write(&self) {
        let mut c = self.lock_cursors();
        debug_assert!(!self.is_full(&c), "publish on a full ring");
        c.w = (c.w + 1) & (2 * self.capacity - 1);
        self.readable.notify_all();
    }

    fn advance_read(&self) {
        let mut c = self.lock_cursors();
        debug_assert!(!self.is_empty(&c), "release on an empty ring");
        c.r = (c.r + 1) & (2 * self.capacity - 1);
        self.writable.notify_all();
    }

    #[inline]
    fn is_empty(&self, c: &Cursors) -> bool {
        c.w == c.r
    }

    #[inline]
    fn is_full(&self, c: &Cursors) -> bool {
        c.w == (c.r ^ self.capacity)
    }

    #[inline]
    fn occupied(&self, c: &Cursors) -> usize {
        (c.w + 2 * self.capacity - c.r) & (2 * self.capacity - 1)
    }

    fn lock_cursors(&self) -> MutexGuard<'_, Cursors> {
        self.cursors.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_slot(&self, idx: usize) -> MutexGuard<'_, Box<[i16]>> {
        self.slots[idx].lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wait<'a>(
        &self,
        cond: &Condvar,
        guard: MutexGuard<'a, Cursors>,
    ) -> MutexGuard<'a, Cursors> {
        cond.wait(guard).unwrap_or_else(|e| e.into_inner())
    }
}

/// Exclusive access to a slot being filled by the producer.
///
/// Dropping the handle without calling [`publish`](WriteSlot::publish)
/// abandons the reservation; the cursor does not move and nothing becomes
/// visible to the consumer.
pub struct WriteSlot<'a> {
    ring: &'a BlockRing,
    data: MutexGuard<'a, Box<[i16]>>,
}

impl WriteSlot<'_> {
    /// Make the fully written slot visible to the consumer and wake it.
    pub fn publish(self) {
        let WriteSlot { ring, data } = self;
        drop(data);
        ring.advance_write();
    }
}

impl std::ops::Deref for WriteSlot<'_> {
    type Target = [i16];

    fn deref(&self) -> &[i16] {
        &self.data
    }
}

impl std::ops::DerefMut for WriteSlot<'_> {
    fn deref_mut(&mut self) -> &mut [i16] {
        &mut self.data
    }
}

/// Exclusive access to the oldest filled slot.
pub struct ReadSlot<'a> {
    ring: &'a BlockRing,
    data: MutexGuard<'a, Box<[i16]>>,
}

impl ReadSlot<'_> {
    /// Return the fully consumed slot to the producer and wake it.
    pub fn release(self) {
        let ReadSlot { ring, data } = self;
        drop(data);
        ring.advance_read();
    }
}

impl std::ops::Deref for ReadSlot<'_> {
    type Target = [i16];

    fn deref(&self) -> &[i16] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn ring(blocks: usize, samples: usize) -> Arc<BlockRing> {
        Arc::new(BlockRing::new(blocks, samples).unwrap())
    }

    /// Publish one block whose samples are all `stamp`
    fn publish_stamped(ring: &BlockRing, stamp: i16) {
        let mut slot = ring.reserve_write().expect("ring should accept a write");
        slot.fill(stamp);
        slot.publish();
    }

    #[test]
    fn test_capacity_must_be_power_of_two() {
        assert!(matches!(
            BlockRing::new(6, 4),
            Err(ConfigError::RingCapacity(6))
        ));
        assert!(matches!(
            BlockRing::new(0, 4),
            Err(ConfigError::RingCapacity(0))
        ));
        assert!(matches!(BlockRing::new(4, 0), Err(ConfigError::ZeroBlockSize)));
        assert!(BlockRing::new(1, 4).is_ok());
    }

    #[test]
    fn test_fifo_order_across_wraparound() {
        let ring = ring(4, 2);
        // 12 blocks through a 4-slot ring exercises cursor wraparound at 2N
        let mut expected = 0i16;
        for round in 0..3 {
            for i in 0..4 {
                publish_stamped(&ring, round * 4 + i);
                assert!(ring.occupied_blocks() <= 4);
            }
            for _ in 0..4 {
                let slot = ring.reserve_read().expect("data was published");
                assert_eq!(slot[0], expected);
                assert_eq!(slot[3], expected);
                slot.release();
                expected += 1;
            }
        }
        assert_eq!(ring.occupied_blocks(), 0);
    }

    #[test]
    fn test_full_ring_blocks_producer_until_release() {
        let ring = ring(2, 1);
        publish_stamped(&ring, 1);
        publish_stamped(&ring, 2);
        assert_eq!(ring.occupied_blocks(), 2);

        let (tx, rx) = mpsc::channel();
        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let slot = ring.reserve_write();
                tx.send(()).unwrap();
                if let Some(mut slot) = slot {
                    slot.fill(3);
                    slot.publish();
                }
            })
        };

        // Producer must still be parked on the full ring
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        ring.reserve_read().unwrap().release();
        rx.recv_timeout(Duration::from_secs(5))
            .expect("producer should wake after a release");
        producer.join().unwrap();

        let slot = ring.reserve_read().unwrap();
        assert_eq!(slot[0], 2);
        slot.release();
        let slot = ring.reserve_read().unwrap();
        assert_eq!(slot[0], 3);
        slot.release();
    }

    #[test]
    fn test_consumer_blocks_then_receives_first_publish() {
        let ring = ring(4, 2);
        let (tx, rx) = mpsc::channel();
        let consumer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let slot = ring.reserve_read().expect("publish should arrive");
                tx.send(slot[0]).unwrap();
                slot.release();
            })
        };

        // Nothing published yet: the consumer must be parked
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        publish_stamped(&ring, 42);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
        consumer.join().unwrap();
    }

    #[test]
    fn test_stop_request_unblocks_waiting_consumer() {
        let ring = ring(4, 2);
        let consumer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || ring.reserve_read().is_none())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(ring.transition(Phase::StopRequested));
        assert!(consumer.join().unwrap(), "stop must yield None, not a slot");
    }

    #[test]
    fn test_stop_request_overrides_remaining_data() {
        let ring = ring(4, 2);
        publish_stamped(&ring, 1);
        ring.transition(Phase::StopRequested);
        assert!(ring.reserve_read().is_none());
    }

    #[test]
    fn test_exhausted_input_drains_then_ends() {
        let ring = ring(4, 2);
        publish_stamped(&ring, 1);
        publish_stamped(&ring, 2);
        ring.transition(Phase::InputExhausted);

        // Remaining blocks drain in order...
        let slot = ring.reserve_read().unwrap();
        assert_eq!(slot[0], 1);
        slot.release();
        let slot = ring.reserve_read().unwrap();
        assert_eq!(slot[0], 2);
        slot.release();
        // ...then the ring reports end-of-stream without blocking
        assert!(ring.reserve_read().is_none());
    }

    #[test]
    fn test_terminal_phase_stops_producer() {
        let ring = ring(4, 2);
        ring.transition(Phase::InputExhausted);
        assert!(ring.reserve_write().is_none());
        assert!(!ring.transition(Phase::StopRequested), "transitions are monotone");
        assert_eq!(ring.phase(), Phase::InputExhausted);
    }

    #[test]
    fn test_abandoned_write_slot_stays_invisible() {
        let ring = ring(4, 2);
        {
            let mut slot = ring.reserve_write().unwrap();
            slot.fill(9);
            // dropped without publish
        }
        assert_eq!(ring.occupied_blocks(), 0);
        ring.transition(Phase::InputExhausted);
        assert!(ring.reserve_read().is_none());
    }

    #[test]
    fn test_wait_until_primed_on_fill() {
        let ring = ring(2, 1);
        let primed = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || ring.wait_until_primed())
        };
        publish_stamped(&ring, 1);
        publish_stamped(&ring, 2);
        primed.join().unwrap();
        assert_eq!(ring.occupied_blocks(), 2);
    }

    #[test]
    fn test_wait_until_primed_on_terminal() {
        let ring = ring(4, 1);
        let primed = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || ring.wait_until_primed())
        };
        thread::sleep(Duration::from_millis(50));
        ring.transition(Phase::InputExhausted);
        primed.join().unwrap();
    }
}
