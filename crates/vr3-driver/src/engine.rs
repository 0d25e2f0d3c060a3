//! The command engine.
//!
//! [`VoiceRecognizer`] issues one request at a time over a [`Framer`] and
//! waits, bounded by the configured timeout, for the frame that answers it.
//! A response is only accepted if its command byte matches the request;
//! anything else fails the operation.

use std::time::Duration;

use metrics::counter;
use tracing::{debug, error, info, trace, warn};
use vr3_protocol::{
    decode_group_control, BaudRate, Command, Frame, Framer, Group, IoMode, LoadReport, Notification, Opcode, Prompt,
    ReadMode, RecognizedVoice, RecognizerState, RecordId, Signature, SystemSettings, TrainReport, TrainStatusReport,
    TrainStatusTable, Transport, UserGroup, MAX_PULSE_WIDTH_LEVEL, MAX_SIGNATURE_LEN, RECOGNIZER_SLOTS, RECORD_NONE,
};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::metrics::metric_defs;
use crate::query::TrainQuery;

// ============================================================================
// Signature Arguments
// ============================================================================

/// A signature argument for set-signature and train-with-signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureInput<'a> {
    /// Remove the record's signature.
    Delete,
    /// Text whose length is derived: everything up to the first NUL, at most
    /// [`MAX_SIGNATURE_LEN`] bytes. Empty text is a valid zero-length
    /// signature.
    Text(&'a [u8]),
    /// Bytes sent verbatim with their explicit length.
    Raw(&'a [u8]),
}

impl SignatureInput<'_> {
    /// The bytes to put on the wire.
    pub fn resolve(&self) -> Result<Vec<u8>, EngineError> {
        match self {
            SignatureInput::Delete => Ok(Vec::new()),
            SignatureInput::Text(text) => {
                let len = text.iter().position(|&b| b == 0).unwrap_or(text.len());
                if len > MAX_SIGNATURE_LEN {
                    return Err(EngineError::InvalidArgument(format!(
                        "signature is {} bytes, at most {} allowed",
                        len, MAX_SIGNATURE_LEN
                    )));
                }
                Ok(text[..len].to_vec())
            }
            SignatureInput::Raw(bytes) => Ok(bytes.to_vec()),
        }
    }
}

impl<'a> From<&'a str> for SignatureInput<'a> {
    fn from(text: &'a str) -> Self {
        SignatureInput::Text(text.as_bytes())
    }
}

// ============================================================================
// Voice Recognizer
// ============================================================================

/// Request/response engine for one VR3 module.
///
/// Every operation takes `&mut self`: only one request can be in flight.
/// Share an engine across threads behind a `Mutex`.
#[derive(Debug)]
pub struct VoiceRecognizer<T, C = SystemClock> {
    framer: Framer<T>,
    clock: C,
    config: EngineConfig,
    halted: bool,
}

impl<T: Transport> VoiceRecognizer<T, SystemClock> {
    /// Create an engine with the default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    pub fn with_config(transport: T, config: EngineConfig) -> Self {
        Self::with_clock(transport, config, SystemClock::new())
    }
}

impl<T: Transport, C: Clock> VoiceRecognizer<T, C> {
    /// Create an engine reading time from `clock`.
    pub fn with_clock(transport: T, config: EngineConfig, clock: C) -> Self {
        VoiceRecognizer {
            framer: Framer::with_max_frame_len(transport, config.max_frame_len),
            clock,
            config,
            halted: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Change the response timeout for subsequent requests.
    pub fn set_response_timeout(&mut self, timeout: Duration) {
        self.config.response_timeout_ms = timeout.as_millis() as u64;
    }

    pub fn transport(&self) -> &T {
        self.framer.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.framer.transport_mut()
    }

    pub fn into_transport(self) -> T {
        self.framer.into_inner()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Whether the engine refuses further operations.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Refuse every further operation with [`EngineError::SessionHalted`].
    pub fn halt(&mut self) {
        error!("Vr3[{}]: halting, module is unusable", self.config.name);
        self.halted = true;
    }

    // ========================================================================
    // Request/Response Plumbing
    // ========================================================================

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.halted {
            return Err(EngineError::SessionHalted);
        }
        Ok(())
    }

    fn send(&mut self, cmd: &Command) -> Result<(), EngineError> {
        self.ensure_running()?;
        let frame = cmd.encode()?;
        self.framer.send_encoded(&frame)?;
        let label = cmd.opcode().map(Opcode::name).unwrap_or("raw");
        counter!(metric_defs::FRAMES_SENT.name, "command" => label).increment(1);
        trace!("Vr3[{}]: sent {}: {}", self.config.name, label, hex::encode(&frame));
        Ok(())
    }

    fn receive(&mut self, timeout: Duration, expected: Opcode) -> Result<Frame, EngineError> {
        match self.framer.receive(ReadMode::Blocking(timeout), &self.clock) {
            Ok(frame) => {
                counter!(metric_defs::FRAMES_RECEIVED.name, "command" => expected.name()).increment(1);
                Ok(frame)
            }
            Err(e) => {
                if e.is_truncated() {
                    warn!(
                        "Vr3[{}]: {} frame cut off, link is out of step until reopened",
                        self.config.name,
                        expected.name()
                    );
                }
                if !e.is_timeout() {
                    counter!(metric_defs::FRAMES_REJECTED.name, "command" => expected.name()).increment(1);
                }
                Err(e.into())
            }
        }
    }

    /// Accept `frame` only if it answers `expected`.
    fn expect_opcode(&self, expected: Opcode, frame: Frame) -> Result<Frame, EngineError> {
        let actual = frame.command_byte();
        if actual == expected.code() {
            return Ok(frame);
        }
        if let Ok(Notification::Error { code }) = Notification::decode(&frame) {
            warn!(
                "Vr3[{}]: module rejected {}: code 0x{:02X}",
                self.config.name,
                expected.name(),
                code
            );
            return Err(EngineError::Rejected {
                command: expected,
                code,
            });
        }
        warn!(
            "Vr3[{}]: expected {} response, got 0x{:02X}",
            self.config.name,
            expected.name(),
            actual
        );
        Err(EngineError::CommandMismatch { expected, actual })
    }

    fn track<V>(&self, op: Opcode, result: Result<V, EngineError>) -> Result<V, EngineError> {
        if let Err(e) = &result {
            counter!(metric_defs::COMMANDS_FAILED.name, "command" => op.name()).increment(1);
            debug!("Vr3[{}]: {} failed: {}", self.config.name, op.name(), e);
        }
        result
    }

    fn transact(&mut self, cmd: &Command, op: Opcode) -> Result<Frame, EngineError> {
        self.send(cmd)?;
        let frame = self.receive(self.config.response_timeout(), op)?;
        self.expect_opcode(op, frame)
    }

    /// One send, one bounded receive, then `decode`.
    fn run<V>(
        &mut self,
        cmd: Command,
        decode: impl FnOnce(Frame) -> Result<V, EngineError>,
    ) -> Result<V, EngineError> {
        let Some(op) = cmd.opcode() else {
            return Err(EngineError::InvalidArgument("raw frames are not answered".into()));
        };
        let result = self.transact(&cmd, op).and_then(decode);
        self.track(op, result)
    }

    fn invalid<V>(&self, op: Opcode, reason: String) -> Result<V, EngineError> {
        self.track(op, Err(EngineError::InvalidArgument(reason)))
    }

    // ========================================================================
    // System Settings
    // ========================================================================

    /// Read the module's configuration.
    pub fn check_system_settings(&mut self) -> Result<SystemSettings, EngineError> {
        self.run(Command::CheckSystem, |f| Ok(SystemSettings::decode(&f)?))
    }

    /// Restore factory settings.
    pub fn restore_system_settings(&mut self) -> Result<(), EngineError> {
        self.run(Command::RestoreDefaults, |_| Ok(()))
    }

    /// Change the module's baud rate. The host side must reopen its port at
    /// the new rate afterwards.
    pub fn set_baud_rate(&mut self, rate: BaudRate) -> Result<(), EngineError> {
        self.run(Command::SetBaudRate { rate }, |_| Ok(()))?;
        info!("Vr3[{}]: baud rate set to {}", self.config.name, rate.bps());
        Ok(())
    }

    pub fn set_io_mode(&mut self, mode: IoMode) -> Result<(), EngineError> {
        self.run(Command::SetIoMode { mode }, |_| Ok(()))
    }

    /// Set the output pulse width level, 0..=15.
    pub fn set_pulse_width(&mut self, level: u8) -> Result<(), EngineError> {
        if level > MAX_PULSE_WIDTH_LEVEL {
            return self.invalid(
                Opcode::SetPulseWidth,
                format!("pulse width level {} above {}", level, MAX_PULSE_WIDTH_LEVEL),
            );
        }
        self.run(Command::SetPulseWidth { level }, |_| Ok(()))
    }

    /// Reset output pins. An empty list resets all of them.
    pub fn reset_io(&mut self, outputs: &[u8]) -> Result<(), EngineError> {
        self.run(
            Command::ResetIo {
                outputs: outputs.to_vec(),
            },
            |_| Ok(()),
        )
    }

    /// Choose the records loaded at power-on.
    ///
    /// The module's bitmap marks list positions, not record values: `[5, 2]`
    /// sets bits 0 and 1.
    pub fn set_autoload(&mut self, records: &[RecordId]) -> Result<(), EngineError> {
        if records.len() > RECOGNIZER_SLOTS {
            return self.invalid(
                Opcode::SetAutoload,
                format!("{} autoload records, at most {}", records.len(), RECOGNIZER_SLOTS),
            );
        }
        self.run(
            Command::SetAutoload {
                records: records.to_vec(),
            },
            |_| Ok(()),
        )
    }

    /// Disable autoload: set-autoload with an empty selection.
    pub fn disable_autoload(&mut self) -> Result<(), EngineError> {
        self.set_autoload(&[])
    }

    // ========================================================================
    // Recognizer
    // ========================================================================

    /// Load records into the recognizer. Per-record results, including
    /// "recognizer full" or "untrained", come back in the report.
    pub fn load(&mut self, records: &[RecordId]) -> Result<LoadReport, EngineError> {
        self.run(
            Command::Load {
                records: records.to_vec(),
            },
            |f| Ok(LoadReport::decode(f.payload())?),
        )
    }

    pub fn load_one(&mut self, record: RecordId) -> Result<LoadReport, EngineError> {
        self.load(&[record])
    }

    /// Empty the recognizer.
    pub fn clear(&mut self) -> Result<(), EngineError> {
        match self.run(Command::Clear, |_| Ok(())) {
            Ok(()) => {
                info!("Vr3[{}]: recognizer cleared", self.config.name);
                Ok(())
            }
            Err(e) => {
                error!("Vr3[{}]: module clear failed: {}", self.config.name, e);
                Err(e)
            }
        }
    }

    /// Read the recognizer's slots. The response must be exactly 13 bytes
    /// long (`LEN == 0x0D`).
    pub fn check_recognizer(&mut self) -> Result<RecognizerState, EngineError> {
        self.run(Command::CheckRecognizer, |f| Ok(RecognizerState::decode(&f)?))
    }

    // ========================================================================
    // Training Status
    // ========================================================================

    /// Training status of specific records. The list is deduplicated before
    /// it is sent; an empty list is an error, and so is [`RECORD_NONE`],
    /// which would turn the request into a query-all.
    pub fn check_train(&mut self, records: &[RecordId]) -> Result<TrainStatusReport, EngineError> {
        if records.contains(&RECORD_NONE) {
            return self.invalid(
                Opcode::CheckTrain,
                format!("record 0x{:02X} is reserved; use check_train_all", RECORD_NONE),
            );
        }
        self.run(
            Command::CheckTrain {
                records: Some(records.to_vec()),
            },
            |f| Ok(TrainStatusReport::decode(&f)?),
        )
    }

    /// Training status of every record.
    ///
    /// Reads frames until the configured terminal count arrives or the link
    /// stays idle for the configured window. A partial table is returned if
    /// at least one frame arrived.
    pub fn check_train_all(&mut self) -> Result<TrainStatusTable, EngineError> {
        let result = self.query_all();
        self.track(Opcode::CheckTrain, result)
    }

    fn query_all(&mut self) -> Result<TrainStatusTable, EngineError> {
        self.send(&Command::CheckTrain { records: None })?;
        let mut query = TrainQuery::new(
            self.config.query_all_frames,
            self.config.query_all_idle(),
            self.clock.now(),
        );

        while !query.is_finished() {
            let budget = query.read_budget(self.clock.now());
            match self.receive(budget, Opcode::CheckTrain) {
                Ok(frame) => {
                    let frame = self.expect_opcode(Opcode::CheckTrain, frame)?;
                    let report = TrainStatusReport::decode(&frame)?;
                    query.on_frame(&report, self.clock.now());
                }
                // Nothing this tick; the idle check decides.
                Err(e) if e.is_timeout() => {}
                Err(e) => return Err(e),
            }
            query.on_idle(self.clock.now());
        }

        debug!(
            "Vr3[{}]: query-all finished in state {:?} after {} frames",
            self.config.name,
            query.state(),
            query.frames()
        );
        query.finish()
    }

    // ========================================================================
    // Training
    // ========================================================================

    /// Train records. Prompt frames are passed to `on_prompt` as they
    /// arrive; each one restarts the idle timeout.
    pub fn train<F>(&mut self, records: &[RecordId], on_prompt: F) -> Result<TrainReport, EngineError>
    where
        F: FnMut(&Prompt),
    {
        let result = self.train_exchange(
            Command::Train {
                records: records.to_vec(),
            },
            on_prompt,
        );
        self.track(Opcode::Train, result)
    }

    pub fn train_one<F>(&mut self, record: RecordId, on_prompt: F) -> Result<TrainReport, EngineError>
    where
        F: FnMut(&Prompt),
    {
        self.train(&[record], on_prompt)
    }

    /// Train a record and attach a signature in one exchange.
    pub fn train_with_signature<'a, F>(
        &mut self,
        record: RecordId,
        signature: impl Into<SignatureInput<'a>>,
        on_prompt: F,
    ) -> Result<TrainReport, EngineError>
    where
        F: FnMut(&Prompt),
    {
        let result = signature.into().resolve().and_then(|signature| {
            self.train_exchange(Command::SignatureTrain { record, signature }, on_prompt)
        });
        self.track(Opcode::SignatureTrain, result)
    }

    fn train_exchange<F>(&mut self, cmd: Command, mut on_prompt: F) -> Result<TrainReport, EngineError>
    where
        F: FnMut(&Prompt),
    {
        let op = cmd.opcode().unwrap_or(Opcode::Train);
        self.send(&cmd)?;
        let idle = self.config.train_idle_timeout();
        loop {
            let frame = self.receive(idle, op)?;
            if let Ok(Notification::Prompt(prompt)) = Notification::decode(&frame) {
                debug!(
                    "Vr3[{}]: training record {}: {}",
                    self.config.name, prompt.record, prompt.text
                );
                on_prompt(&prompt);
                continue;
            }
            let frame = self.expect_opcode(op, frame)?;
            return Ok(TrainReport::decode(frame.payload())?);
        }
    }

    // ========================================================================
    // Signatures
    // ========================================================================

    /// Set a record's signature.
    pub fn set_signature<'a>(
        &mut self,
        record: RecordId,
        signature: impl Into<SignatureInput<'a>>,
    ) -> Result<(), EngineError> {
        let signature = match signature.into().resolve() {
            Ok(bytes) => bytes,
            Err(e) => return self.track(Opcode::SetSignature, Err(e)),
        };
        self.run(Command::SetSignature { record, signature }, |_| Ok(()))
    }

    /// Remove a record's signature.
    pub fn delete_signature(&mut self, record: RecordId) -> Result<(), EngineError> {
        self.set_signature(record, SignatureInput::Delete)
    }

    /// Read a record's signature; empty if it has none.
    pub fn check_signature(&mut self, record: RecordId) -> Result<Signature, EngineError> {
        self.run(Command::CheckSignature { record }, |f| Ok(Signature::decode(&f)?))
    }

    // ========================================================================
    // Groups
    // ========================================================================

    pub fn set_group_control(&mut self, enabled: bool) -> Result<(), EngineError> {
        self.run(Command::SetGroupControl { enabled: Some(enabled) }, |_| Ok(()))
    }

    /// Whether group control is enabled.
    pub fn check_group_control(&mut self) -> Result<bool, EngineError> {
        self.run(Command::SetGroupControl { enabled: None }, |f| Ok(decode_group_control(&f)?))
    }

    /// Assign 1 to 7 records to a user group.
    pub fn set_user_group(&mut self, group: Group, records: &[RecordId]) -> Result<(), EngineError> {
        if records.is_empty() || records.len() > RECOGNIZER_SLOTS {
            return self.invalid(
                Opcode::Group,
                format!("user group needs 1 to {} records, got {}", RECOGNIZER_SLOTS, records.len()),
            );
        }
        self.run(
            Command::SetUserGroup {
                group,
                records: records.to_vec(),
            },
            |_| Ok(()),
        )
    }

    pub fn check_user_group(&mut self, group: Group) -> Result<UserGroup, EngineError> {
        self.run(Command::CheckUserGroup { group }, |f| Ok(UserGroup::decode(group, &f)?))
    }

    pub fn load_system_group(&mut self, group: Group) -> Result<LoadReport, EngineError> {
        self.run(Command::LoadSystemGroup { group }, |f| {
            Ok(LoadReport::decode(f.extended_payload())?)
        })
    }

    pub fn load_user_group(&mut self, group: Group) -> Result<LoadReport, EngineError> {
        self.run(Command::LoadUserGroup { group }, |f| {
            Ok(LoadReport::decode(f.extended_payload())?)
        })
    }

    // ========================================================================
    // Recognition
    // ========================================================================

    /// Poll for a recognized voice command with the configured short
    /// timeout.
    pub fn recognize(&mut self) -> Result<Option<RecognizedVoice>, EngineError> {
        self.recognize_with_timeout(self.config.recognize_timeout())
    }

    /// Poll for a recognized voice command.
    ///
    /// `Ok(None)` when no frame started in time. A frame cut off part way,
    /// or one that arrived with any other command byte, is an error.
    pub fn recognize_with_timeout(&mut self, timeout: Duration) -> Result<Option<RecognizedVoice>, EngineError> {
        self.ensure_running()?;
        let frame = match self.receive(timeout, Opcode::VoiceRecognized) {
            Ok(frame) => frame,
            Err(e) if e.is_timeout() => return Ok(None),
            Err(e) => return self.track(Opcode::VoiceRecognized, Err(e)),
        };
        let result = self
            .expect_opcode(Opcode::VoiceRecognized, frame)
            .and_then(|f| Ok(RecognizedVoice::decode(&f)?));
        self.track(Opcode::VoiceRecognized, result).map(Some)
    }

    // ========================================================================
    // Raw
    // ========================================================================

    /// Forward bytes as a header-only frame. No response is awaited.
    pub fn send_raw(&mut self, data: &[u8]) -> Result<(), EngineError> {
        self.send(&Command::Raw { data: data.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::mock::ScriptedTransport;
    use vr3_protocol::{
        encode_extended, encode_plain, FrameError, LoadStatus, CMD_CHECK_RECOGNIZER, CMD_CLEAR, CMD_ERROR, CMD_LOAD,
        CMD_PROMPT,
    };

    fn engine() -> VoiceRecognizer<ScriptedTransport, ManualClock> {
        let clock = ManualClock::new();
        VoiceRecognizer::with_clock(
            ScriptedTransport::with_clock(clock.clone()),
            EngineConfig::default(),
            clock,
        )
    }

    #[test]
    fn test_signature_input_rules() {
        assert_eq!(SignatureInput::Delete.resolve().unwrap(), Vec::<u8>::new());
        assert_eq!(SignatureInput::Text(b"").resolve().unwrap(), Vec::<u8>::new());
        assert_eq!(SignatureInput::Text(b"on\0junk").resolve().unwrap(), b"on".to_vec());
        assert_eq!(SignatureInput::from("0123456789").resolve().unwrap().len(), 10);
        assert!(matches!(
            SignatureInput::from("0123456789a").resolve(),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(SignatureInput::Raw(b"0123456789ab").resolve().unwrap().len(), 12);
    }

    #[test]
    fn test_load_decodes_report() {
        let mut vr = engine();
        vr.transport_mut()
            .push_bytes(encode_plain(CMD_LOAD, &[1, 4, 0x00, 9, 0xFD]).unwrap());
        let report = vr.load(&[4, 9]).unwrap();
        assert_eq!(report.wire_len(), 5);
        assert_eq!(report.status_of(9), Some(LoadStatus::RecognizerFull));
        assert_eq!(vr.transport().last_sent(), Some(&[0xAA, 0x04, 0x30, 4, 9, 0x0A][..]));
    }

    #[test]
    fn test_error_frame_is_rejected() {
        let mut vr = engine();
        vr.transport_mut().push_bytes(encode_plain(CMD_ERROR, &[0x03]).unwrap());
        assert_eq!(
            vr.clear(),
            Err(EngineError::Rejected {
                command: Opcode::Clear,
                code: 0x03
            })
        );
    }

    #[test]
    fn test_no_response_times_out() {
        let mut vr = engine();
        let err = vr.clear().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.code(), -1);
        assert_eq!(vr.clock().now(), Duration::from_millis(1000));
    }

    #[test]
    fn test_argument_checks_send_nothing() {
        let mut vr = engine();
        assert!(matches!(vr.set_pulse_width(16), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(
            vr.set_autoload(&[0, 1, 2, 3, 4, 5, 6, 7]),
            Err(EngineError::InvalidArgument(_))
        ));
        let group = Group::new(0).unwrap();
        assert!(matches!(vr.set_user_group(group, &[]), Err(EngineError::InvalidArgument(_))));
        assert!(matches!(vr.set_signature(1, "far too long"), Err(EngineError::InvalidArgument(_))));
        assert_eq!(vr.check_train(&[]), Err(EngineError::Frame(FrameError::EmptyInput)));
        assert!(vr.transport().sent().is_empty());
    }

    #[test]
    fn test_halted_engine_refuses_everything() {
        let mut vr = engine();
        vr.halt();
        assert_eq!(vr.clear(), Err(EngineError::SessionHalted));
        assert_eq!(vr.recognize(), Err(EngineError::SessionHalted));
        assert_eq!(vr.send_raw(&[1]), Err(EngineError::SessionHalted));
        assert!(vr.transport().sent().is_empty());
    }

    #[test]
    fn test_recognize_poll() {
        let mut vr = engine();
        assert_eq!(vr.recognize(), Ok(None));
        assert_eq!(vr.clock().now(), Duration::from_millis(50));

        vr.transport_mut()
            .push_bytes(encode_extended(0x0D, 0, &[0xFF, 2, 0, 0]).unwrap());
        let voice = vr.recognize().unwrap().unwrap();
        assert_eq!(voice.record, 2);

        vr.transport_mut()
            .push_bytes(encode_plain(CMD_CHECK_RECOGNIZER, &[0; 11]).unwrap());
        assert!(matches!(
            vr.recognize(),
            Err(EngineError::CommandMismatch { actual: 0x01, .. })
        ));
    }

    #[test]
    fn test_train_forwards_prompts() {
        let mut vr = engine();
        vr.transport_mut()
            .push_bytes(encode_extended(CMD_PROMPT, 3, b"Speak now").unwrap())
            .push_bytes(encode_extended(CMD_PROMPT, 3, b"Speak again").unwrap())
            .push_bytes(encode_plain(0x20, &[1, 3, 0x00]).unwrap());

        let mut prompts = Vec::new();
        let report = vr.train(&[3, 3], |p| prompts.push(p.text.clone())).unwrap();
        assert!(report.succeeded());
        assert_eq!(prompts, vec!["Speak now", "Speak again"]);
        assert_eq!(vr.transport().last_sent(), Some(&[0xAA, 0x03, 0x20, 3, 0x0A][..]));
    }

    #[test]
    fn test_send_raw_does_not_wait() {
        let mut vr = engine();
        vr.send_raw(&[CMD_CLEAR]).unwrap();
        assert_eq!(vr.transport().last_sent(), Some(&[0xAA, 0x02, 0x31, 0x0A][..]));
        assert_eq!(vr.clock().now(), Duration::ZERO);
    }
}
