//! # Latest-value sample channel
//!
//! A fixed-capacity, lock-free channel carrying successive samples from
//! exactly one writer thread to any number of reader threads. Readers always
//! observe the most recently published record; values overwritten before they
//! are read are silently skipped, and two consecutive reads may return the
//! same record if no write happened between them. This is an
//! eventually-consistent latest-value primitive, not a FIFO queue.
//!
//! The writer publishes by storing the just-written slot index with release
//! ordering; readers load it with acquire ordering, so a reader always sees
//! the complete record that was in the slot at publish time. The one caveat
//! is inherited from the ring design: a reader must finish consuming slot X
//! before the writer wraps around to overwrite X, i.e. within N-1 subsequent
//! writes. Capacity is therefore required to be at least 2, and large
//! payloads (images, lidar sweeps) use capacity 3 to give readers slack
//! against producer speed.
//!
//! No operation blocks: a read before the first write reports no value, and
//! a write never waits for readers.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::UnsafeCell;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Sentinel published-index meaning no record has been published yet.
const NO_SAMPLE: usize = usize::MAX;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Storage shared between the writer and all readers of one channel.
struct Shared<T> {
    /// The slot array. Slots other than the published one are only touched
    /// by the writer.
    slots: Box<[UnsafeCell<T>]>,

    /// Index of the most recently published slot, or [`NO_SAMPLE`].
    published: AtomicUsize,
}

/// The writing half of a sample channel.
///
/// There is exactly one writer per channel; the write cursor lives here and
/// is never shared.
pub struct SampleWriter<T> {
    shared: Arc<Shared<T>>,

    /// Next slot to write into
    write: usize,
}

/// The reading half of a sample channel. Clone freely, one per consumer
/// thread.
pub struct SampleReader<T> {
    shared: Arc<Shared<T>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised when constructing a channel with an unusable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ChannelConfigError {
    /// The slot ring needs at least two slots so that the writer's in-progress
    /// slot is never the published one.
    #[error("Channel capacity must be at least 2, got {0}")]
    CapacityTooSmall(usize),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Create a channel whose slots are built by the given closure.
///
/// Use this for records that preallocate internal buffers (images, sweeps):
/// every slot is constructed once, up front, and producers overwrite slot
/// contents in place with the two-phase write.
pub fn channel_with<T, F>(
    capacity: usize,
    mut init: F,
) -> Result<(SampleWriter<T>, SampleReader<T>), ChannelConfigError>
where
    F: FnMut() -> T,
{
    if capacity < 2 {
        return Err(ChannelConfigError::CapacityTooSmall(capacity));
    }

    let slots: Box<[UnsafeCell<T>]> = (0..capacity)
        .map(|_| UnsafeCell::new(init()))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let shared = Arc::new(Shared {
        slots,
        published: AtomicUsize::new(NO_SAMPLE),
    });

    Ok((
        SampleWriter {
            shared: shared.clone(),
            write: 0,
        },
        SampleReader { shared },
    ))
}

/// Create a channel with default-constructed slots.
pub fn channel<T: Default>(
    capacity: usize,
) -> Result<(SampleWriter<T>, SampleReader<T>), ChannelConfigError> {
    channel_with(capacity, T::default)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

// Safety: the published-index handshake means readers only dereference the
// slot most recently released by the writer, and the writer never writes the
// slot it has just published (the cursor has already advanced past it, and
// with capacity >= 2 the cursor cannot equal the published index). The
// remaining hazard, a reader still holding slot X after N-1 further writes,
// is the documented staleness contract of the channel.
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> SampleWriter<T> {
    /// Publish a record, copying it into the current write slot.
    pub fn write(&mut self, record: T) {
        // Safety: the write cursor never points at the published slot, so no
        // reader dereferences this slot while we store into it.
        unsafe {
            *self.shared.slots[self.write].get() = record;
        }
        self.finish_write();
    }

    /// First half of a two-phase write: a mutable view of the slot that the
    /// next [`finish_write`](Self::finish_write) will publish.
    ///
    /// This lets a producer build a large record (an image, a sweep) directly
    /// in place instead of constructing it elsewhere and paying a second deep
    /// copy.
    pub fn begin_write(&mut self) -> &mut T {
        // Safety: as in `write`, the in-progress slot is invisible to
        // readers until published.
        unsafe { &mut *self.shared.slots[self.write].get() }
    }

    /// Second half of a two-phase write: publish the slot handed out by
    /// [`begin_write`](Self::begin_write) and advance the write cursor.
    pub fn finish_write(&mut self) {
        self.shared.published.store(self.write, Ordering::Release);
        self.write = (self.write + 1) % self.shared.slots.len();
    }

    /// Number of slots in the channel.
    pub fn capacity(&self) -> usize {
        self.shared.slots.len()
    }
}

impl<T: Clone> SampleReader<T> {
    /// Deep-copy the latest published record into `out`.
    ///
    /// Returns false, leaving `out` untouched, if nothing has ever been
    /// published.
    pub fn read(&self, out: &mut T) -> bool {
        let idx = self.shared.published.load(Ordering::Acquire);

        if idx == NO_SAMPLE {
            return false;
        }

        // Safety: `idx` was published with release ordering so the record it
        // names is fully written. `clone_from` lets records reuse any
        // allocation already held by `out`.
        unsafe {
            out.clone_from(&*self.shared.slots[idx].get());
        }

        true
    }
}

impl<T> SampleReader<T> {
    /// Borrow the latest published record without copying.
    ///
    /// Used where the copy cost is significant, e.g. for images. The caller
    /// must not hold the reference across N-1 subsequent writes, where N is
    /// the channel capacity, or it may observe the writer overwriting the
    /// slot.
    pub fn read_ref(&self) -> Option<&T> {
        let idx = self.shared.published.load(Ordering::Acquire);

        if idx == NO_SAMPLE {
            return None;
        }

        // Safety: see `read`.
        Some(unsafe { &*self.shared.slots[idx].get() })
    }

    /// Number of slots in the channel.
    pub fn capacity(&self) -> usize {
        self.shared.slots.len()
    }
}

impl<T> Clone for SampleReader<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    /// A record whose payload can be validated against its checksum, used to
    /// detect reads that mix fields from two different writes.
    #[derive(Clone, Copy, Default)]
    struct ChecksummedRecord {
        payload: [u64; 32],
        sum: u64,
    }

    impl ChecksummedRecord {
        fn new(value: u64) -> Self {
            let payload = [value; 32];
            Self {
                payload,
                sum: payload.iter().sum(),
            }
        }

        fn is_consistent(&self) -> bool {
            self.payload.iter().sum::<u64>() == self.sum
                && self.payload.iter().all(|&v| v == self.payload[0])
        }
    }

    #[test]
    fn test_capacity_validation() {
        assert!(channel::<u64>(0).is_err());
        assert!(channel::<u64>(1).is_err());
        assert!(channel::<u64>(2).is_ok());
    }

    #[test]
    fn test_no_value_before_first_write() {
        let (_tx, rx) = channel::<u64>(4).unwrap();

        let mut out = 99u64;
        assert!(!rx.read(&mut out));
        // The output must be untouched, not defaulted
        assert_eq!(out, 99);
        assert!(rx.read_ref().is_none());
    }

    #[test]
    fn test_latest_value() {
        let (mut tx, rx) = channel::<u64>(4).unwrap();

        for v in 0..10u64 {
            tx.write(v);
        }

        let mut out = 0u64;
        assert!(rx.read(&mut out));
        assert_eq!(out, 9);
    }

    #[test]
    fn test_duplicate_reads_without_write() {
        let (mut tx, rx) = channel::<u64>(2).unwrap();

        tx.write(7);

        let mut out = 0u64;
        assert!(rx.read(&mut out));
        assert_eq!(out, 7);
        assert!(rx.read(&mut out));
        assert_eq!(out, 7);
    }

    #[test]
    fn test_two_phase_write() {
        let (mut tx, rx) = channel_with(3, || vec![0u8; 8]).unwrap();

        // Nothing visible until the write is finished
        {
            let slot = tx.begin_write();
            slot.copy_from_slice(&[1u8; 8]);
        }
        assert!(rx.read_ref().is_none());

        tx.finish_write();
        assert_eq!(rx.read_ref().unwrap().as_slice(), &[1u8; 8]);
    }

    #[test]
    fn test_reader_clone_sees_writes() {
        let (mut tx, rx) = channel::<u64>(2).unwrap();
        let rx2 = rx.clone();

        tx.write(3);

        let mut out = 0u64;
        assert!(rx2.read(&mut out));
        assert_eq!(out, 3);
    }

    #[test]
    fn test_no_tearing_across_threads() {
        const WRITES: u64 = 20_000;

        let (mut tx, rx) = channel::<ChecksummedRecord>(10).unwrap();

        let writer = thread::spawn(move || {
            for v in 1..=WRITES {
                tx.write(ChecksummedRecord::new(v));
                thread::yield_now();
            }
        });

        let mut out = ChecksummedRecord::default();
        let mut last_seen = 0u64;
        let mut reads = 0u64;

        while last_seen < WRITES {
            if rx.read(&mut out) {
                // Every read must be internally consistent, i.e. equal to
                // some record that was actually written
                assert!(out.is_consistent(), "torn read after {} reads", reads);

                // The channel is latest-value: observed values never move
                // backwards
                assert!(out.payload[0] >= last_seen);
                last_seen = out.payload[0];
                reads += 1;
            }
        }

        writer.join().unwrap();
    }
}
