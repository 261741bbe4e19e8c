//! Snowflake-style artifact id generation.
//!
//! An id packs, from high to low bits:
//!
//! | bits | field |
//! |------|-------|
//! | 41 | milliseconds since [`EPOCH_MILLIS`] |
//! | 5  | datacenter id |
//! | 5  | worker id |
//! | 12 | sequence within the millisecond |
//!
//! Ids from one generator never decrease. Ids from different processes are
//! only guaranteed distinct if every process runs with a different
//! (datacenter, worker) pair. Nothing negotiates this; operators must
//! configure it.

use std::sync::Mutex;

use chrono::Utc;

/// Custom epoch (2010-11-04T01:42:54.657Z).
pub const EPOCH_MILLIS: i64 = 1_288_834_974_657;

const WORKER_ID_BITS: u32 = 5;
const DATACENTER_ID_BITS: u32 = 5;
const SEQUENCE_BITS: u32 = 12;

/// Largest accepted worker or datacenter id.
pub const MAX_NODE_ID: i64 = (1 << WORKER_ID_BITS) - 1;

const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_ID_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The wall clock is behind the last issued timestamp. Issuing an id now
    /// could repeat one already handed out.
    #[error("Clock moved backwards by {0} ms; refusing to generate id")]
    ClockMovedBackwards(i64),

    #[error("{kind} id must be between 0 and {max}, got {value}")]
    InvalidNodeId {
        kind: &'static str,
        value: i64,
        max: i64,
    },

    #[error("Id generator lock poisoned")]
    Poisoned,
}

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

#[derive(Debug, Default)]
struct Sequence {
    last_timestamp: i64,
    sequence: i64,
}

pub struct IdWorker {
    worker_id: i64,
    datacenter_id: i64,
    state: Mutex<Sequence>,
    clock: Clock,
}

impl std::fmt::Debug for IdWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdWorker")
            .field("worker_id", &self.worker_id)
            .field("datacenter_id", &self.datacenter_id)
            .finish_non_exhaustive()
    }
}

fn system_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl IdWorker {
    pub fn new(worker_id: i64, datacenter_id: i64) -> Result<Self, IdError> {
        Self::with_clock(worker_id, datacenter_id, Box::new(system_millis))
    }

    fn with_clock(worker_id: i64, datacenter_id: i64, clock: Clock) -> Result<Self, IdError> {
        check_node_id("worker", worker_id)?;
        check_node_id("datacenter", datacenter_id)?;
        Ok(Self {
            worker_id,
            datacenter_id,
            state: Mutex::new(Sequence::default()),
            clock,
        })
    }

    /// Returns the next id.
    ///
    /// Fails with [`IdError::ClockMovedBackwards`] if the clock reads earlier
    /// than the previous call did.
    pub fn next_id(&self) -> Result<i64, IdError> {
        let mut state = self.state.lock().map_err(|_| IdError::Poisoned)?;

        let mut timestamp = (self.clock)();
        if timestamp < state.last_timestamp {
            return Err(IdError::ClockMovedBackwards(state.last_timestamp - timestamp));
        }

        let mut sequence = 0;
        if timestamp == state.last_timestamp {
            sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if sequence == 0 {
                // Sequence exhausted for this millisecond. State is left
                // untouched on failure so a retry in the same millisecond
                // waits again instead of reusing a sequence.
                timestamp = self.wait_next_millis(state.last_timestamp)?;
            }
        }

        state.last_timestamp = timestamp;
        state.sequence = sequence;

        Ok(((timestamp - EPOCH_MILLIS) << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_ID_SHIFT)
            | (self.worker_id << WORKER_ID_SHIFT)
            | sequence)
    }

    /// Returns the next id rendered as a decimal string.
    pub fn next_id_string(&self) -> Result<String, IdError> {
        Ok(self.next_id()?.to_string())
    }

    fn wait_next_millis(&self, last_timestamp: i64) -> Result<i64, IdError> {
        loop {
            let timestamp = (self.clock)();
            if timestamp > last_timestamp {
                return Ok(timestamp);
            }
            if timestamp < last_timestamp {
                return Err(IdError::ClockMovedBackwards(last_timestamp - timestamp));
            }
            std::hint::spin_loop();
        }
    }
}

fn check_node_id(kind: &'static str, value: i64) -> Result<(), IdError> {
    if !(0..=MAX_NODE_ID).contains(&value) {
        return Err(IdError::InvalidNodeId {
            kind,
            value,
            max: MAX_NODE_ID,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Arc;

    const BASE: i64 = EPOCH_MILLIS + 1_000_000;

    fn manual_clock(start: i64) -> (Arc<AtomicI64>, Clock) {
        let now = Arc::new(AtomicI64::new(start));
        let handle = now.clone();
        (now, Box::new(move || handle.load(Ordering::SeqCst)))
    }

    fn timestamp_of(id: i64) -> i64 {
        (id >> TIMESTAMP_SHIFT) + EPOCH_MILLIS
    }

    #[test]
    fn test_fields_are_packed() {
        let (_, clock) = manual_clock(BASE);
        let worker = IdWorker::with_clock(3, 5, clock).unwrap();

        let id = worker.next_id().unwrap();

        assert_eq!(timestamp_of(id), BASE);
        assert_eq!((id >> DATACENTER_ID_SHIFT) & MAX_NODE_ID, 5);
        assert_eq!((id >> WORKER_ID_SHIFT) & MAX_NODE_ID, 3);
        assert_eq!(id & SEQUENCE_MASK, 0);
        assert!(id > 0);
    }

    #[test]
    fn test_ids_increase_within_same_millisecond() {
        let (_, clock) = manual_clock(BASE);
        let worker = IdWorker::with_clock(1, 1, clock).unwrap();

        let first = worker.next_id().unwrap();
        let second = worker.next_id().unwrap();
        let third = worker.next_id().unwrap();

        assert!(first < second && second < third);
        assert_eq!(third & SEQUENCE_MASK, 2);
    }

    #[test]
    fn test_sequence_resets_on_new_millisecond() {
        let (now, clock) = manual_clock(BASE);
        let worker = IdWorker::with_clock(1, 1, clock).unwrap();

        worker.next_id().unwrap();
        worker.next_id().unwrap();
        now.store(BASE + 1, Ordering::SeqCst);
        let id = worker.next_id().unwrap();

        assert_eq!(id & SEQUENCE_MASK, 0);
        assert_eq!(timestamp_of(id), BASE + 1);
    }

    #[test]
    fn test_sequence_overflow_waits_for_next_millisecond() {
        // The clock reads BASE until the generator has asked for it more
        // times than one millisecond's worth of ids, then ticks forward.
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let per_millisecond = (SEQUENCE_MASK + 1) as usize;
        let clock: Clock = Box::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n <= per_millisecond {
                BASE
            } else {
                BASE + 1
            }
        });
        let worker = IdWorker::with_clock(1, 1, clock).unwrap();

        let mut previous = worker.next_id().unwrap();
        for _ in 0..per_millisecond {
            let id = worker.next_id().unwrap();
            assert!(id > previous);
            previous = id;
        }

        assert_eq!(timestamp_of(previous), BASE + 1);
        assert_eq!(previous & SEQUENCE_MASK, 0);
    }

    #[test]
    fn test_clock_regression_fails() {
        let (now, clock) = manual_clock(BASE);
        let worker = IdWorker::with_clock(1, 1, clock).unwrap();

        worker.next_id().unwrap();
        now.store(BASE - 5, Ordering::SeqCst);

        match worker.next_id() {
            Err(IdError::ClockMovedBackwards(delta)) => assert_eq!(delta, 5),
            other => panic!("expected clock regression error, got {:?}", other),
        }
    }

    #[test]
    fn test_regression_during_overflow_wait_never_reuses_an_id() {
        // BASE for a full millisecond of ids plus the overflowing call, then
        // one regressed reading inside the wait, then BASE again.
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let per_millisecond = (SEQUENCE_MASK + 1) as usize;
        let clock: Clock = Box::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n == per_millisecond + 1 {
                BASE - 1
            } else if n <= per_millisecond + 3 {
                BASE
            } else {
                BASE + 1
            }
        });
        let worker = IdWorker::with_clock(1, 1, clock).unwrap();

        let mut issued = std::collections::HashSet::new();
        for _ in 0..per_millisecond {
            assert!(issued.insert(worker.next_id().unwrap()));
        }

        assert!(matches!(
            worker.next_id(),
            Err(IdError::ClockMovedBackwards(1))
        ));

        // Still in the exhausted millisecond: must wait for BASE + 1.
        let id = worker.next_id().unwrap();
        assert!(issued.insert(id), "id {} was already issued", id);
        assert_eq!(timestamp_of(id), BASE + 1);
        assert_eq!(id & SEQUENCE_MASK, 0);
    }

    #[test]
    fn test_node_ids_are_bounded() {
        assert!(IdWorker::new(MAX_NODE_ID, 0).is_ok());
        assert!(matches!(
            IdWorker::new(MAX_NODE_ID + 1, 0),
            Err(IdError::InvalidNodeId { kind: "worker", .. })
        ));
        assert!(matches!(
            IdWorker::new(0, -1),
            Err(IdError::InvalidNodeId { kind: "datacenter", .. })
        ));
    }

    #[test]
    fn test_distinct_workers_never_collide() {
        let (_, clock_a) = manual_clock(BASE);
        let (_, clock_b) = manual_clock(BASE);
        let a = IdWorker::with_clock(1, 1, clock_a).unwrap();
        let b = IdWorker::with_clock(2, 1, clock_b).unwrap();

        for _ in 0..100 {
            assert_ne!(a.next_id().unwrap(), b.next_id().unwrap());
        }
    }

    #[test]
    fn test_concurrent_callers_get_unique_ids() {
        let worker = Arc::new(IdWorker::new(1, 1).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let worker = worker.clone();
                std::thread::spawn(move || {
                    (0..500)
                        .map(|_| worker.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_next_id_string_is_decimal() {
        let worker = IdWorker::new(1, 1).unwrap();
        let id = worker.next_id_string().unwrap();
        assert!(id.chars().all(|c| c.is_ascii_digit()));
        assert!(id.parse::<i64>().unwrap() > 0);
    }
}
