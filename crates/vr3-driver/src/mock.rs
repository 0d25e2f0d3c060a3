//! Scripted transport for tests. Built for this crate's own tests and, with
//! the `mock` feature, for downstream ones.
//!
//! Inbound traffic is a queue of byte chunks and silences. A read consumes
//! queued bytes; a silence is a gap before the next chunk. If the gap is
//! longer than what is left of the read's timeout the read times out and the
//! rest of the gap stays queued. When a [`ManualClock`] is attached, every
//! wait advances it, so timeout logic runs deterministically.

use std::collections::VecDeque;
use std::time::Duration;

use vr3_protocol::{ReadMode, Transport, TransportError};

use crate::clock::ManualClock;

/// One entry in the inbound script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Bytes that become readable.
    Bytes(Vec<u8>),
    /// Nothing arrives for this long.
    Silence(Duration),
}

/// In-memory [`Transport`] that replays a script.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    pending: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
    clock: Option<ManualClock>,
    bounded_timeout: Duration,
    fail_writes: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        ScriptedTransport {
            bounded_timeout: Duration::from_millis(10),
            ..Default::default()
        }
    }

    /// Advance `clock` by every wait.
    pub fn with_clock(clock: ManualClock) -> Self {
        ScriptedTransport {
            clock: Some(clock),
            ..Self::new()
        }
    }

    /// Queue bytes, typically one encoded frame.
    pub fn push_bytes(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.steps.push_back(Step::Bytes(bytes.into()));
        self
    }

    /// Queue a gap.
    pub fn push_silence(&mut self, gap: Duration) -> &mut Self {
        self.steps.push_back(Step::Silence(gap));
        self
    }

    /// Make every write fail.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Everything written, one entry per write.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Most recent write.
    pub fn last_sent(&self) -> Option<&[u8]> {
        self.sent.last().map(Vec::as_slice)
    }

    /// Script entries not yet consumed.
    pub fn remaining_steps(&self) -> usize {
        self.steps.len()
    }

    fn wait(&self, by: Duration) {
        if let Some(clock) = &self.clock {
            clock.advance(by);
        }
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.fail_writes {
            return Err(TransportError::Io("scripted write failure".into()));
        }
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], mode: ReadMode) -> Result<(), TransportError> {
        let mut remaining = match mode {
            ReadMode::Blocking(timeout) => timeout,
            ReadMode::Bounded => self.bounded_timeout,
        };
        loop {
            let wanted = buf.len();
            if self.pending.len() >= wanted {
                for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..wanted)) {
                    *slot = byte;
                }
                return Ok(());
            }
            match self.steps.pop_front() {
                Some(Step::Bytes(bytes)) => self.pending.extend(bytes),
                Some(Step::Silence(gap)) if gap <= remaining => {
                    self.wait(gap);
                    remaining -= gap;
                }
                Some(Step::Silence(gap)) => {
                    self.wait(remaining);
                    self.steps.push_front(Step::Silence(gap - remaining));
                    return Err(TransportError::TimedOut);
                }
                None => {
                    self.wait(remaining);
                    return Err(TransportError::TimedOut);
                }
            }
        }
    }
}
