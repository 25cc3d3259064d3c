//! Counting semaphore bounding concurrent jobs.
//!
//! A [`JobLimiter`] hands out at most `capacity` [`JobPermit`]s at a time.
//! [`acquire()`](JobLimiter::acquire) blocks up to a timeout and then fails with
//! [`Error::QueueTimeout`]; permits release their slot on drop, on every exit
//! path.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

/// Bounds how many jobs run at once.
#[derive(Debug)]
pub struct JobLimiter {
    capacity: usize,
    available: Mutex<usize>,
    cvar: Condvar,
}

/// A held processing slot. Dropping it frees the slot.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct JobPermit<'a> {
    limiter: &'a JobLimiter,
}

impl JobLimiter {
    /// A limiter with `capacity` slots (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            available: Mutex::new(capacity),
            cvar: Condvar::new(),
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        *self.available.lock()
    }

    /// Wait up to `timeout` for a free slot.
    pub fn acquire(&self, timeout: Duration) -> Result<JobPermit<'_>> {
        let start = Instant::now();
        let deadline = start.checked_add(timeout);
        let mut available = self.available.lock();
        while *available == 0 {
            let timed_out = match deadline {
                Some(deadline) => self.cvar.wait_until(&mut available, deadline).timed_out(),
                // Timeout too large to represent: wait without one.
                None => {
                    self.cvar.wait(&mut available);
                    false
                }
            };
            if timed_out && *available == 0 {
                let waited_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(waited_ms, capacity = self.capacity, "job queue timeout");
                return Err(Error::QueueTimeout {
                    waited_ms,
                    capacity: self.capacity,
                });
            }
        }
        *available -= 1;
        Ok(JobPermit { limiter: self })
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<JobPermit<'_>> {
        let mut available = self.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(JobPermit { limiter: self })
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available = (*available + 1).min(self.capacity);
        self.cvar.notify_one();
    }
}

impl Drop for JobPermit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
