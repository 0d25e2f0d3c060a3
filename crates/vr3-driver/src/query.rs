//! Query-all training status.
//!
//! A wildcard check-train request is answered with a burst of frames, five
//! records per frame. The exchange ends when the terminal frame count is
//! reached or when no frame arrives for a whole idle window. The idle window
//! restarts on every frame.
//!
//! The engine feeds [`TrainQuery`] frames and idle ticks; the query decides
//! how long the next read may block so the transport's own timeout never
//! extends the idle window.

use std::time::Duration;

use vr3_protocol::{TrainStatusReport, TrainStatusTable};

use crate::error::EngineError;

/// Where a query-all exchange stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Request sent, no frame yet.
    Waiting { since: Duration },
    /// At least one frame in; the idle window runs from the last one.
    Accumulating { last_frame: Duration },
    /// Terminal frame count reached.
    Done,
    /// Idle window elapsed.
    TimedOut,
}

/// Accumulates a query-all response.
#[derive(Debug, Clone)]
pub struct TrainQuery {
    state: QueryState,
    table: TrainStatusTable,
    frame_limit: usize,
    idle: Duration,
}

impl TrainQuery {
    /// Start a query at `now`.
    pub fn new(frame_limit: usize, idle: Duration, now: Duration) -> Self {
        TrainQuery {
            state: QueryState::Waiting { since: now },
            table: TrainStatusTable::new(),
            frame_limit: frame_limit.max(1),
            idle,
        }
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, QueryState::Done | QueryState::TimedOut)
    }

    pub fn frames(&self) -> usize {
        self.table.frames
    }

    fn idle_since(&self) -> Option<Duration> {
        match self.state {
            QueryState::Waiting { since } => Some(since),
            QueryState::Accumulating { last_frame } => Some(last_frame),
            QueryState::Done | QueryState::TimedOut => None,
        }
    }

    /// How long the next read may block: what is left of the idle window.
    pub fn read_budget(&self, now: Duration) -> Duration {
        match self.idle_since() {
            Some(since) => self.idle.saturating_sub(now.saturating_sub(since)),
            None => Duration::ZERO,
        }
    }

    /// Fold in a response frame received at `now`.
    pub fn on_frame(&mut self, report: &TrainStatusReport, now: Duration) {
        if self.is_finished() {
            return;
        }
        self.table.merge(report);
        if self.table.frames >= self.frame_limit {
            self.table.complete = true;
            self.state = QueryState::Done;
        } else {
            self.state = QueryState::Accumulating { last_frame: now };
        }
    }

    /// Check the idle window at `now`.
    pub fn on_idle(&mut self, now: Duration) {
        if let Some(since) = self.idle_since() {
            if now.saturating_sub(since) >= self.idle {
                self.state = QueryState::TimedOut;
            }
        }
    }

    /// The assembled table. Partial when the exchange went idle after at
    /// least one frame; an error when nothing arrived at all.
    pub fn finish(self) -> Result<TrainStatusTable, EngineError> {
        match self.state {
            QueryState::Done => Ok(self.table),
            _ if self.table.frames > 0 => Ok(self.table),
            _ => Err(EngineError::NoResponse),
        }
    }
}
