//! Send-side batch buffer
//!
//! A bounded array of offset-stamped envelopes waiting for the next flush.
//! Offsets strictly increase for the lifetime of the buffer, across
//! flushes, so a forwarder always sees envelopes in offset order.
//!
//! Every operation runs in one critical section. The limiter's worker
//! drains the buffer with `take()`, which swaps the whole content out and
//! leaves an empty buffer behind.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use satellite_protocol::{Envelope, OutputEventContext};

/// Result of an append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Accepted,
    /// Buffer full, envelope dropped
    Overflow,
    /// Offset not positive or not past the last accepted one, envelope dropped
    Malformed,
}

/// Contents of a buffer at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSnapshot {
    pub contexts: Vec<OutputEventContext>,
    /// Offset of the first context, 0 when empty
    pub first: i64,
    /// Offset of the last context, 0 when empty
    pub last: i64,
}

impl BatchSnapshot {
    #[inline]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// `last - first + 1`, 0 when empty
    #[inline]
    pub fn batch_size(&self) -> i64 {
        batch_size(self.contexts.len(), self.first, self.last)
    }

    /// Drop the offsets, keeping envelopes in offset order
    pub fn into_envelopes(self) -> Vec<Envelope> {
        self.contexts.into_iter().map(|c| c.envelope).collect()
    }
}

#[derive(Debug)]
struct Inner {
    buf: Vec<OutputEventContext>,
    first: i64,
    last: i64,
    /// Highest offset ever accepted, survives `take()`
    high_water: i64,
}

impl Inner {
    fn append(&mut self, capacity: usize, ctx: OutputEventContext) -> AppendOutcome {
        if self.buf.len() >= capacity {
            return AppendOutcome::Overflow;
        }
        if ctx.offset <= 0 || ctx.offset <= self.high_water {
            return AppendOutcome::Malformed;
        }
        if self.buf.is_empty() {
            self.first = ctx.offset;
        }
        self.last = ctx.offset;
        self.high_water = ctx.offset;
        self.buf.push(ctx);
        AppendOutcome::Accepted
    }
}

/// Bounded, offset-ordered envelope buffer
#[derive(Debug)]
pub struct BatchBuffer {
    capacity: usize,
    inner: Mutex<Inner>,
    overflows: AtomicU64,
    malformed: AtomicU64,
}

impl BatchBuffer {
    /// Create an empty buffer holding at most `capacity` envelopes
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                buf: Vec::with_capacity(capacity.min(4096)),
                first: 0,
                last: 0,
                high_water: 0,
            }),
            overflows: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
        }
    }

    /// Append a context carrying its own offset
    pub fn append(&self, ctx: OutputEventContext) -> AppendOutcome {
        let outcome = self.inner.lock().append(self.capacity, ctx);
        self.count(outcome);
        outcome
    }

    /// Append an envelope at the next offset
    ///
    /// The first envelope a buffer ever accepts gets offset 1. A rejected
    /// envelope does not consume an offset.
    pub fn push(&self, envelope: Envelope) -> AppendOutcome {
        let outcome = {
            let mut inner = self.inner.lock();
            let offset = inner.high_water + 1;
            inner.append(self.capacity, OutputEventContext::new(offset, envelope))
        };
        self.count(outcome);
        outcome
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> BatchSnapshot {
        let inner = self.inner.lock();
        BatchSnapshot {
            contexts: inner.buf.clone(),
            first: inner.first,
            last: inner.last,
        }
    }

    /// Steal the whole content, leaving the buffer empty
    pub fn take(&self) -> BatchSnapshot {
        let mut inner = self.inner.lock();
        let contexts = std::mem::take(&mut inner.buf);
        let snapshot = BatchSnapshot {
            contexts,
            first: inner.first,
            last: inner.last,
        };
        inner.first = 0;
        inner.last = 0;
        snapshot
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `last - first + 1`, 0 when empty
    pub fn batch_size(&self) -> i64 {
        let inner = self.inner.lock();
        batch_size(inner.buf.len(), inner.first, inner.last)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Envelopes dropped because the buffer was full
    #[inline]
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Envelopes dropped for a bad offset
    #[inline]
    pub fn malformed_count(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    #[inline]
    fn count(&self, outcome: AppendOutcome) {
        match outcome {
            AppendOutcome::Accepted => {}
            AppendOutcome::Overflow => {
                self.overflows.fetch_add(1, Ordering::Relaxed);
            }
            AppendOutcome::Malformed => {
                self.malformed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[inline]
fn batch_size(len: usize, first: i64, last: i64) -> i64 {
    if len == 0 { 0 } else { last - first + 1 }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod tests;
