//! Operational counters for the authorization engine.
//!
//! Counters are zero-initialized at start, incremented throughout operation,
//! and read by reporting; they reset only with the daemon. The lock is
//! scoped strictly to each increment and is never shared with the
//! configuration lock, so bookkeeping cannot add latency to the decision
//! path.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use cloudfence_core::EventKind;

/// Counter selector for [`EventCounters::increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    /// The event payload could not be copied from the channel.
    CopyError,
    /// The kernel discarded events before delivery (queue overflow),
    /// detected as sequence-number gaps.
    DroppedByKernelQueue,
    /// The response missed the platform deadline.
    DroppedByDeadline,
}

/// Per-event-kind statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventStats {
    /// Whether any event of this kind has been seen; gates gap detection.
    pub seen: bool,
    /// Last sequence number observed for this kind.
    pub last_seq: u64,
    /// Payload copies that failed.
    pub copy_err: u64,
    /// Events lost to the kernel-side queue.
    pub dropped_kernel: u64,
    /// Responses that missed the deadline.
    pub dropped_deadline: u64,
}

/// Concurrent per-event-kind counters.
#[derive(Debug, Default)]
pub struct EventCounters {
    events: Mutex<BTreeMap<EventKind, EventStats>>,
}

impl EventCounters {
    /// Zero-initialized counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observed sequence number for `kind`, counting any gap
    /// since the previous one as kernel-dropped events (gap size, not one).
    pub fn record_sequence(&self, kind: EventKind, seq: u64) {
        if let Ok(mut events) = self.events.lock() {
            let stats = events.entry(kind).or_default();
            if stats.seen && seq > stats.last_seq + 1 {
                stats.dropped_kernel += seq - stats.last_seq - 1;
            }
            stats.seen = true;
            stats.last_seq = seq;
        }
    }

    /// Bumps one counter for `kind` by one.
    pub fn increment(&self, kind: EventKind, counter: CounterKind) {
        self.add(kind, counter, 1);
    }

    /// Bumps one counter for `kind` by `count`.
    pub fn add(&self, kind: EventKind, counter: CounterKind, count: u64) {
        if let Ok(mut events) = self.events.lock() {
            let stats = events.entry(kind).or_default();
            match counter {
                CounterKind::CopyError => stats.copy_err += count,
                CounterKind::DroppedByKernelQueue => stats.dropped_kernel += count,
                CounterKind::DroppedByDeadline => stats.dropped_deadline += count,
            }
        }
    }

    /// Consistent point-in-time copy of every counter, for reporting.
    #[must_use]
    pub fn snapshot(&self) -> CounterReport {
        let events = self
            .events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default();
        CounterReport { events }
    }
}

/// Snapshot of engine counters with a line-per-kind `Display` rendering.
#[derive(Debug, Clone, Default)]
pub struct CounterReport {
    events: BTreeMap<EventKind, EventStats>,
}

impl CounterReport {
    /// Stats for one event kind, if any event of it was seen or counted.
    #[must_use]
    pub fn get(&self, kind: EventKind) -> Option<&EventStats> {
        self.events.get(&kind)
    }
}

impl fmt::Display for CounterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "event counters:")?;
        if self.events.is_empty() {
            return writeln!(f, "  (no events observed)");
        }
        for (kind, stats) in &self.events {
            writeln!(
                f,
                "  {kind}: last_seq={} copy_err={} dropped_kernel={} dropped_deadline={}",
                stats.last_seq, stats.copy_err, stats.dropped_kernel, stats.dropped_deadline
            )?;
        }
        Ok(())
    }
}
