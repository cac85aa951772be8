//! Capture schedule derived from org policy and prior history.
//!
//! Instants run from the anchor (the latest sample the backend holds, or
//! now) in steps of the polling interval, up to and including
//! `anchor + session timeout`. Only instants strictly after `now` are
//! yielded. Nothing is stored: a later call with a later `now` yields a
//! suffix of the same series, which is how a session resumes after a
//! relaunch.
//!
//! A zero polling interval means "capture once": the schedule yields
//! `now` a single time if the session has not already ended.

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::OrgPolicy;

/// Lazy, finite, strictly increasing sequence of capture instants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSchedule {
    next: Option<DateTime<Utc>>,
    step: Option<TimeDelta>,
    end: DateTime<Utc>,
}

/// Build the schedule for `policy` anchored at `anchor`, as seen at `now`.
pub fn plan(anchor: DateTime<Utc>, policy: &OrgPolicy, now: DateTime<Utc>) -> CaptureSchedule {
    let end = anchor
        .checked_add_signed(policy.session_length())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let step = policy.step();
    let next = match step {
        None => (now <= end).then_some(now),
        Some(step) => first_after(anchor, step, now).filter(|t| *t <= end),
    };

    CaptureSchedule { next, step, end }
}

/// Earliest `anchor + k * step` (k >= 0) strictly after `now`.
fn first_after(anchor: DateTime<Utc>, step: TimeDelta, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if now < anchor {
        return Some(anchor);
    }
    let elapsed_ms = (now - anchor).num_milliseconds();
    let step_ms = step.num_milliseconds();
    let k = elapsed_ms / step_ms + 1;
    let offset = k
        .checked_mul(step_ms)
        .and_then(TimeDelta::try_milliseconds)?;
    anchor.checked_add_signed(offset)
}

impl CaptureSchedule {
    /// Next instant without consuming it.
    pub fn peek(&self) -> Option<DateTime<Utc>> {
        self.next
    }

    /// Last instant the session may capture at.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Instants not yet yielded.
    pub fn remaining(&self) -> usize {
        match (self.next, self.step) {
            (None, _) => 0,
            (Some(_), None) => 1,
            (Some(next), Some(step)) => {
                let span = (self.end - next).num_milliseconds();
                let steps = span / step.num_milliseconds();
                usize::try_from(steps).map_or(usize::MAX, |s| s.saturating_add(1))
            }
        }
    }
}

impl Iterator for CaptureSchedule {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self
            .step
            .and_then(|step| current.checked_add_signed(step))
            .filter(|t| *t <= self.end);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CaptureSchedule {}

impl std::iter::FusedIterator for CaptureSchedule {}
