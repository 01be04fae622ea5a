// clock.rs — injectable clock for the Preview Builder's `generated_at` /
// `elapsed_ms` fields.
//
// Given identical inputs, a preview is byte-identical except for
// `generated_at` and `elapsed_ms`. Pure evaluation code never calls
// `Utc::now()` directly — `SystemClock` is the one place that boundary is
// crossed, at the CLI/caller edge.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// A source of the current time, injectable so preview generation stays
/// deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock, used by callers outside of tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that replays a fixed sequence of timestamps, one per call.
/// Preview building calls `now()` twice (start, end); feeding two known
/// timestamps makes `elapsed_ms` assertable without sleeping.
pub struct FixedClock {
    times: Mutex<VecDeque<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(times: Vec<DateTime<Utc>>) -> Self {
        Self {
            times: Mutex::new(times.into()),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.times
            .lock()
            .expect("fixed clock lock poisoned")
            .pop_front()
            .expect("FixedClock exhausted: requested more timestamps than supplied")
    }
}

/// A clock that always returns the same timestamp, for remediation tests
/// that rebuild many previews and don't care about individual elapsed times.
pub struct RepeatingClock(pub DateTime<Utc>);

impl Clock for RepeatingClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
