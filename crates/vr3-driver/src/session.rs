//! Recognition session: bring the module up, then poll for voice commands.

use serde::Serialize;
use tracing::{debug, error, info, warn};
use vr3_protocol::{LoadStatus, RecognizedVoice, Transport};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::engine::VoiceRecognizer;
use crate::error::EngineError;

/// A recognized voice command and the label configured for its record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceEvent {
    pub voice: RecognizedVoice,
    pub label: Option<String>,
}

impl std::fmt::Display for VoiceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}\t{}", self.voice, label),
            None => write!(f, "{}", self.voice),
        }
    }
}

/// Startup and polling on top of a [`VoiceRecognizer`].
#[derive(Debug)]
pub struct RecognitionSession<T, C = SystemClock> {
    engine: VoiceRecognizer<T, C>,
    config: SessionConfig,
    loaded: Vec<u8>,
}

impl<T: Transport, C: Clock> RecognitionSession<T, C> {
    pub fn new(engine: VoiceRecognizer<T, C>, config: SessionConfig) -> Self {
        RecognitionSession {
            engine,
            config,
            loaded: Vec::new(),
        }
    }

    pub fn engine(&self) -> &VoiceRecognizer<T, C> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut VoiceRecognizer<T, C> {
        &mut self.engine
    }

    pub fn into_engine(self) -> VoiceRecognizer<T, C> {
        self.engine
    }

    /// Records the module confirmed loading during [`start`](Self::start).
    pub fn loaded(&self) -> &[u8] {
        &self.loaded
    }

    /// Clear the recognizer, then load the configured records one at a
    /// time.
    ///
    /// A module that cannot be cleared is unusable: after the configured
    /// number of attempts the engine is halted and
    /// [`EngineError::SessionHalted`] returned. Individual load failures
    /// are logged and skipped.
    pub fn start(&mut self) -> Result<(), EngineError> {
        let name = self.engine.config().name.clone();
        let attempts = self.config.clear_attempts.max(1);

        let mut cleared = false;
        for attempt in 1..=attempts {
            match self.engine.clear() {
                Ok(()) => {
                    cleared = true;
                    break;
                }
                Err(EngineError::SessionHalted) => return Err(EngineError::SessionHalted),
                Err(e) => warn!("Vr3[{}]: clear attempt {}/{} failed: {}", name, attempt, attempts, e),
            }
        }
        if !cleared {
            error!("Vr3[{}]: recognizer could not be cleared", name);
            self.engine.halt();
            return Err(EngineError::SessionHalted);
        }

        self.loaded.clear();
        for entry in &self.config.records {
            match self.engine.load_one(entry.record) {
                Ok(report) => match report.status_of(entry.record) {
                    Some(LoadStatus::Loaded) | Some(LoadStatus::AlreadyLoaded) => {
                        info!("Vr3[{}]: loaded record {} ({})", name, entry.record, entry.label);
                        self.loaded.push(entry.record);
                    }
                    status => warn!(
                        "Vr3[{}]: record {} ({}) not loaded: {:?}",
                        name, entry.record, entry.label, status
                    ),
                },
                Err(e) => warn!("Vr3[{}]: loading record {} failed: {}", name, entry.record, e),
            }
        }
        debug!("Vr3[{}]: session started with {} records", name, self.loaded.len());
        Ok(())
    }

    /// One recognition poll with the short recognize timeout.
    pub fn poll(&mut self) -> Result<Option<VoiceEvent>, EngineError> {
        let Some(voice) = self.engine.recognize()? else {
            return Ok(None);
        };
        let label = self.config.label_for(voice.record).map(str::to_string);
        info!(
            "Vr3[{}]: recognized {}",
            self.engine.config().name,
            label.as_deref().unwrap_or("unlabelled record")
        );
        Ok(Some(VoiceEvent { voice, label }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{EngineConfig, RecordLabel};
    use crate::mock::ScriptedTransport;
    use vr3_protocol::{encode_extended, encode_plain, CMD_CLEAR, CMD_LOAD};

    fn session(records: &[(u8, &str)]) -> RecognitionSession<ScriptedTransport, ManualClock> {
        let clock = ManualClock::new();
        let engine = VoiceRecognizer::with_clock(
            ScriptedTransport::with_clock(clock.clone()),
            EngineConfig::default(),
            clock,
        );
        let config = SessionConfig {
            records: records
                .iter()
                .map(|&(record, label)| RecordLabel {
                    record,
                    label: label.to_string(),
                })
                .collect(),
            ..SessionConfig::default()
        };
        RecognitionSession::new(engine, config)
    }

    #[test]
    fn test_start_loads_records_one_at_a_time() {
        let mut s = session(&[(0, "on"), (1, "off")]);
        s.engine_mut()
            .transport_mut()
            .push_bytes(encode_plain(CMD_CLEAR, &[]).unwrap())
            .push_bytes(encode_plain(CMD_LOAD, &[1, 0, 0x00]).unwrap())
            .push_bytes(encode_plain(CMD_LOAD, &[0, 1, 0xFE]).unwrap());
        s.start().unwrap();
        assert_eq!(s.loaded(), &[0]);

        let sent = s.engine().transport().sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1], vec![0xAA, 0x03, 0x30, 0, 0x0A]);
        assert_eq!(sent[2], vec![0xAA, 0x03, 0x30, 1, 0x0A]);
    }

    #[test]
    fn test_clear_retried_then_succeeds() {
        let mut s = session(&[]);
        s.engine_mut()
            .transport_mut()
            .push_bytes(encode_plain(CMD_LOAD, &[0]).unwrap())
            .push_bytes(encode_plain(CMD_CLEAR, &[]).unwrap());
        s.start().unwrap();
        assert!(!s.engine().is_halted());
        assert_eq!(s.engine().transport().sent().len(), 2);
    }

    #[test]
    fn test_poll_attaches_label() {
        let mut s = session(&[(4, "lights")]);
        assert_eq!(s.poll(), Ok(None));
        s.engine_mut()
            .transport_mut()
            .push_bytes(encode_extended(0x0D, 0, &[0xFF, 4, 0, 0]).unwrap());
        let event = s.poll().unwrap().unwrap();
        assert_eq!(event.label.as_deref(), Some("lights"));
        assert_eq!(event.to_string(), "0\tNONE\t4\tNONE\tlights");
    }
}
