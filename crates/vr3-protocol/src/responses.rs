//! Responses and notifications from the module.
//!
//! Each decoder takes a frame whose command byte has already been matched
//! against the request. Status bytes the module reports inside a payload
//! (recognizer full, record untrained, ...) are decoded, never treated as
//! failures.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::types::*;

fn require(data: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if data.len() < expected {
        return Err(ProtocolError::PayloadTooShort {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn require_subcommand(frame: &Frame) -> Result<u8, ProtocolError> {
    frame.subcommand().ok_or(ProtocolError::PayloadTooShort {
        expected: 1,
        actual: 0,
    })
}

fn slot(byte: u8) -> Option<RecordId> {
    (byte != RECORD_NONE).then_some(byte)
}

/// A record paired with the status the module reported for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStatus<S> {
    pub record: RecordId,
    pub status: S,
}

fn decode_pairs<S: From<u8>>(data: &[u8]) -> Vec<RecordStatus<S>> {
    data.chunks_exact(2)
        .map(|pair| RecordStatus {
            record: pair[0],
            status: S::from(pair[1]),
        })
        .collect()
}

// ============================================================================
// Load
// ============================================================================

/// Result of a load (or group load) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Number of records the module loaded successfully.
    pub loaded: u8,
    /// Per-record status, in the order the module reported them.
    pub entries: Vec<RecordStatus<LoadStatus>>,
    payload_len: usize,
}

impl LoadReport {
    /// Decode `[count, (record, status)...]`.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        require(payload, 1)?;
        Ok(LoadReport {
            loaded: payload[0],
            entries: decode_pairs(&payload[1..]),
            payload_len: payload.len(),
        })
    }

    /// Bytes of payload the module returned.
    pub fn wire_len(&self) -> usize {
        self.payload_len
    }

    /// Status of one record, if the module reported on it.
    pub fn status_of(&self, record: RecordId) -> Option<LoadStatus> {
        self.entries.iter().find(|e| e.record == record).map(|e| e.status)
    }
}

// ============================================================================
// Recognizer
// ============================================================================

/// Contents of the recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizerState {
    /// Number of valid records in the recognizer.
    pub valid_count: u8,
    /// Record in each recognizer slot; `None` when the slot is empty.
    pub slots: [Option<RecordId>; RECOGNIZER_SLOTS],
    /// Number of records in the recognizer, valid or not.
    pub total_count: u8,
    /// Bit `i` set when slot `i` holds a valid record.
    pub valid_bitmap: u8,
    pub group_mode: GroupMode,
}

impl RecognizerState {
    /// Payload bytes in a check-recognizer response.
    pub const PAYLOAD_LEN: usize = RECOGNIZER_RESPONSE_LEN as usize - 2;

    /// Decode a check-recognizer response. The `LEN` field must be exactly
    /// [`RECOGNIZER_RESPONSE_LEN`]; nothing partial is returned otherwise.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        if frame.len_field() != RECOGNIZER_RESPONSE_LEN {
            return Err(ProtocolError::UnexpectedLength {
                expected: RECOGNIZER_RESPONSE_LEN,
                actual: frame.len_field(),
            });
        }
        let p = frame.payload();
        let mut slots = [None; RECOGNIZER_SLOTS];
        for (i, s) in slots.iter_mut().enumerate() {
            *s = slot(p[1 + i]);
        }
        Ok(RecognizerState {
            valid_count: p[0],
            slots,
            total_count: p[8],
            valid_bitmap: p[9],
            group_mode: GroupMode::from(p[10]),
        })
    }

    pub fn wire_len(&self) -> usize {
        Self::PAYLOAD_LEN
    }

    /// Records currently loaded, in slot order.
    pub fn loaded_records(&self) -> Vec<RecordId> {
        self.slots.iter().flatten().copied().collect()
    }
}

// ============================================================================
// Training
// ============================================================================

/// One check-train response frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainStatusReport {
    /// Number of trained records, as reported in the subcommand byte.
    pub trained_count: u8,
    pub entries: Vec<RecordStatus<TrainStatus>>,
}

impl TrainStatusReport {
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let trained_count = require_subcommand(frame)?;
        Ok(TrainStatusReport {
            trained_count,
            entries: decode_pairs(frame.extended_payload()),
        })
    }

    /// Bytes of payload: the count byte plus the pairs.
    pub fn wire_len(&self) -> usize {
        1 + self.entries.len() * 2
    }
}

/// Training status of every record, assembled from a query-all exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainStatusTable {
    /// Raw status byte per record id. [`TRAIN_STA_NOT_REPORTED`] where the
    /// module said nothing.
    statuses: Vec<u8>,
    /// Trained count from the most recent frame.
    pub trained_count: u8,
    /// Frames accumulated.
    pub frames: usize,
    /// `frames * 5`: how many records the frames account for.
    pub records_seen: usize,
    /// Whether the module sent the full set of frames before going idle.
    pub complete: bool,
}

impl Default for TrainStatusTable {
    fn default() -> Self {
        TrainStatusTable {
            statuses: vec![TRAIN_STA_NOT_REPORTED; RECORD_COUNT],
            trained_count: 0,
            frames: 0,
            records_seen: 0,
            complete: false,
        }
    }
}

impl TrainStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one response frame into the table.
    pub fn merge(&mut self, report: &TrainStatusReport) {
        for entry in &report.entries {
            if let Some(slot) = self.statuses.get_mut(usize::from(entry.record)) {
                *slot = entry.status.into();
            }
        }
        self.trained_count = report.trained_count;
        self.frames += 1;
        self.records_seen = self.frames * RECORDS_PER_TRAIN_FRAME;
    }

    /// Status of a record, `None` if it was never reported.
    pub fn status(&self, record: RecordId) -> Option<TrainStatus> {
        match self.statuses.get(usize::from(record)) {
            Some(&TRAIN_STA_NOT_REPORTED) | None => None,
            Some(&code) => Some(TrainStatus::from(code)),
        }
    }

    /// The raw table, indexed by record id.
    pub fn as_bytes(&self) -> &[u8] {
        &self.statuses
    }

    /// Records reported as trained.
    pub fn trained(&self) -> Vec<RecordId> {
        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, code)| **code == TRAIN_STA_TRAINED)
            .map(|(record, _)| record as RecordId)
            .collect()
    }
}

/// Final response to a train request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainReport {
    /// Records the module reported on.
    pub count: u8,
    pub entries: Vec<RecordStatus<TrainOutcome>>,
    /// Signature echoed back by train-with-signature.
    pub signature: Vec<u8>,
    payload_len: usize,
}

impl TrainReport {
    /// Decode `[count, (record, outcome)×count, signature...]`.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        require(payload, 1)?;
        let count = payload[0];
        let pairs_end = 1 + usize::from(count) * 2;
        require(payload, pairs_end)?;
        Ok(TrainReport {
            count,
            entries: decode_pairs(&payload[1..pairs_end]),
            signature: payload[pairs_end..].to_vec(),
            payload_len: payload.len(),
        })
    }

    pub fn wire_len(&self) -> usize {
        self.payload_len
    }

    pub fn succeeded(&self) -> bool {
        self.entries.iter().all(|e| e.status == TrainOutcome::Success)
    }
}

/// Prompt the module emits while training ("Speak now", "Again", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub record: RecordId,
    pub text: String,
}

impl Prompt {
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let record = require_subcommand(frame)?;
        Ok(Prompt {
            record,
            text: String::from_utf8_lossy(frame.extended_payload()).trim_end().to_string(),
        })
    }
}

// ============================================================================
// Signatures
// ============================================================================

/// Signature attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub record: RecordId,
    pub bytes: Vec<u8>,
}

impl Signature {
    /// Decode a check-signature response: subcommand is the record, payload
    /// is `[len, signature...]`.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let record = require_subcommand(frame)?;
        let payload = frame.extended_payload();
        let len = payload.first().copied().map(usize::from).unwrap_or(0);
        require(payload, 1 + len)?;
        let bytes = if len == 0 { Vec::new() } else { payload[1..1 + len].to_vec() };
        Ok(Signature { record, bytes })
    }

    /// Signature length; zero when the record has none.
    pub fn wire_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.bytes.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", signature_to_string(&self.bytes))
        }
    }
}

// ============================================================================
// System Settings
// ============================================================================

/// Module configuration as reported by check-system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Status byte from the subcommand position.
    pub status: u8,
    /// `None` if the module reported an unknown code.
    pub baud_rate: Option<BaudRate>,
    pub io_mode: Option<IoMode>,
    pub pulse_width: u8,
    /// Nonzero when autoload is enabled.
    pub autoload: u8,
    /// Nonzero when group control is enabled.
    pub group_control: u8,
}

impl SystemSettings {
    pub const PAYLOAD_LEN: usize = 5;

    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let status = require_subcommand(frame)?;
        let p = frame.extended_payload();
        require(p, Self::PAYLOAD_LEN)?;
        Ok(SystemSettings {
            status,
            baud_rate: BaudRate::from_code(p[0]),
            io_mode: IoMode::from_code(p[1]),
            pulse_width: p[2],
            autoload: p[3],
            group_control: p[4],
        })
    }

    pub fn wire_len(&self) -> usize {
        Self::PAYLOAD_LEN
    }
}

// ============================================================================
// Groups
// ============================================================================

/// Records assigned to a user group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    pub group: Group,
    /// One entry per group slot; `None` for an unused slot.
    pub slots: Vec<Option<RecordId>>,
}

impl UserGroup {
    /// Decode a check-user-group response for `group`.
    pub fn decode(group: Group, frame: &Frame) -> Result<Self, ProtocolError> {
        let subcmd = require_subcommand(frame)?;
        if subcmd != GROUP_CHECK_USER {
            return Err(ProtocolError::InvalidData(format!(
                "expected group subcommand 0x{:02X}, got 0x{:02X}",
                GROUP_CHECK_USER, subcmd
            )));
        }
        Ok(UserGroup {
            group,
            slots: frame.extended_payload().iter().map(|&b| slot(b)).collect(),
        })
    }

    pub fn records(&self) -> Vec<RecordId> {
        self.slots.iter().flatten().copied().collect()
    }

    pub fn wire_len(&self) -> usize {
        self.slots.len()
    }
}

/// Decode the reply to a group-control query: whether group control is on.
pub fn decode_group_control(frame: &Frame) -> Result<bool, ProtocolError> {
    require_subcommand(frame)?;
    let p = frame.extended_payload();
    require(p, 1)?;
    Ok(p[0] != 0)
}

// ============================================================================
// Notifications
// ============================================================================

/// A recognized voice command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedVoice {
    pub group_mode: GroupMode,
    pub record: RecordId,
    /// Recognizer slot the record sits in.
    pub recognizer_index: u8,
    pub signature: Vec<u8>,
}

impl RecognizedVoice {
    /// Decode `[group, record, index, sig_len, signature...]` from an
    /// extended frame.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        let p = frame.extended_payload();
        require(p, 4)?;
        let sig_len = usize::from(p[3]);
        require(p, 4 + sig_len)?;
        Ok(RecognizedVoice {
            group_mode: GroupMode::from(p[0]),
            record: p[1],
            recognizer_index: p[2],
            signature: p[4..4 + sig_len].to_vec(),
        })
    }

    /// Payload bytes: the four header bytes plus the signature.
    pub fn wire_len(&self) -> usize {
        4 + self.signature.len()
    }
}

impl std::fmt::Display for RecognizedVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let signature = if self.signature.is_empty() {
            "NONE".to_string()
        } else {
            signature_to_string(&self.signature)
        };
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.recognizer_index, self.group_mode, self.record, signature
        )
    }
}

/// Frames the module sends that are not direct answers to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    Recognized(RecognizedVoice),
    Prompt(Prompt),
    /// The module rejected the last command.
    Error { code: u8 },
}

impl Notification {
    /// Decode a notification frame. Frames with any other opcode are not
    /// notifications.
    pub fn decode(frame: &Frame) -> Result<Self, ProtocolError> {
        match frame.opcode()? {
            Opcode::VoiceRecognized => Ok(Notification::Recognized(RecognizedVoice::decode(frame)?)),
            Opcode::Prompt => Ok(Notification::Prompt(Prompt::decode(frame)?)),
            Opcode::Error => Ok(Notification::Error {
                code: frame.payload().first().copied().unwrap_or_default(),
            }),
            other => Err(ProtocolError::InvalidData(format!("{} is not a notification", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_extended, encode_plain};

    fn frame(bytes: Vec<u8>) -> Frame {
        Frame::from_wire(&bytes).unwrap()
    }

    #[test]
    fn test_load_report() {
        let report = LoadReport::decode(&[1, 4, 0x00, 9, 0xFE]).unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(report.wire_len(), 5);
        assert_eq!(report.status_of(4), Some(LoadStatus::Loaded));
        assert_eq!(report.status_of(9), Some(LoadStatus::Untrained));
        assert_eq!(report.status_of(10), None);
    }

    #[test]
    fn test_load_report_empty_payload() {
        assert!(matches!(
            LoadReport::decode(&[]),
            Err(ProtocolError::PayloadTooShort { expected: 1, actual: 0 })
        ));
    }

    #[test]
    fn test_recognizer_state() {
        let payload = [2, 0, 3, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 2, 0b11, 0x81];
        let state = RecognizerState::decode(&frame(encode_plain(CMD_CHECK_RECOGNIZER, &payload).unwrap())).unwrap();
        assert_eq!(state.valid_count, 2);
        assert_eq!(state.loaded_records(), vec![0, 3]);
        assert_eq!(state.group_mode, GroupMode::User(1));
        assert_eq!(state.wire_len(), 11);
    }

    #[test]
    fn test_recognizer_state_bad_length() {
        let short = frame(encode_plain(CMD_CHECK_RECOGNIZER, &[0; 10]).unwrap());
        assert_eq!(
            RecognizerState::decode(&short),
            Err(ProtocolError::UnexpectedLength {
                expected: 0x0D,
                actual: 0x0C
            })
        );
    }

    #[test]
    fn test_train_status_table_merge() {
        let mut table = TrainStatusTable::new();
        let first = TrainStatusReport::decode(&frame(encode_extended(CMD_CHECK_TRAIN, 1, &[0, 1, 1, 0]).unwrap())).unwrap();
        table.merge(&first);
        assert_eq!(table.status(0), Some(TrainStatus::Trained));
        assert_eq!(table.status(1), Some(TrainStatus::Untrained));
        assert_eq!(table.status(2), None);
        assert_eq!(table.trained(), vec![0]);
        assert_eq!(table.records_seen, 5);
        assert_eq!(table.as_bytes().len(), RECORD_COUNT);
    }

    #[test]
    fn test_train_report_with_signature() {
        let report = TrainReport::decode(&[1, 6, 0x00, b'o', b'n']).unwrap();
        assert!(report.succeeded());
        assert_eq!(report.signature, b"on");

        let timeout = TrainReport::decode(&[1, 6, 0xFE]).unwrap();
        assert!(!timeout.succeeded());
        assert!(TrainReport::decode(&[2, 6, 0x00]).is_err());
    }

    #[test]
    fn test_signature_decode() {
        let sig = Signature::decode(&frame(encode_extended(CMD_CHECK_SIGNATURE, 3, &[2, b'o', b'n']).unwrap())).unwrap();
        assert_eq!(sig.record, 3);
        assert_eq!(sig.bytes, b"on");
        assert_eq!(sig.to_string(), "on");

        let none = Signature::decode(&frame(encode_extended(CMD_CHECK_SIGNATURE, 3, &[0]).unwrap())).unwrap();
        assert!(none.is_empty());
        assert_eq!(none.wire_len(), 0);
    }

    #[test]
    fn test_signature_truncated() {
        let bad = frame(encode_extended(CMD_CHECK_SIGNATURE, 3, &[5, b'o']).unwrap());
        assert!(Signature::decode(&bad).is_err());
    }

    #[test]
    fn test_system_settings() {
        let settings =
            SystemSettings::decode(&frame(encode_extended(CMD_CHECK_SYSTEM, 0, &[0, 1, 15, 0, 1]).unwrap())).unwrap();
        assert_eq!(settings.baud_rate, Some(BaudRate::B9600));
        assert_eq!(settings.io_mode, Some(IoMode::Toggle));
        assert_eq!(settings.pulse_width, 15);
    }

    #[test]
    fn test_recognized_voice_display() {
        let voice =
            RecognizedVoice::decode(&frame(encode_extended(CMD_VOICE_RECOGNIZED, 0, &[0xFF, 2, 1, 2, b'o', 0x01]).unwrap()))
                .unwrap();
        assert_eq!(voice.record, 2);
        assert_eq!(voice.wire_len(), 6);
        assert_eq!(voice.to_string(), "1\tNONE\t2\to\\x01");

        let bare = RecognizedVoice {
            group_mode: GroupMode::System(3),
            record: 0,
            recognizer_index: 0,
            signature: vec![],
        };
        assert_eq!(bare.to_string(), "0\tSG 3\t0\tNONE");
    }

    #[test]
    fn test_user_group() {
        let group = Group::new(1).unwrap();
        let ug = UserGroup::decode(group, &frame(encode_extended(CMD_GROUP, GROUP_CHECK_USER, &[4, 5, 0xFF]).unwrap()))
            .unwrap();
        assert_eq!(ug.slots, vec![Some(4), Some(5), None]);
        assert_eq!(ug.records(), vec![4, 5]);
    }

    #[test]
    fn test_notifications() {
        let prompt = Notification::decode(&frame(encode_extended(CMD_PROMPT, 6, b"Speak now\r").unwrap())).unwrap();
        assert_eq!(
            prompt,
            Notification::Prompt(Prompt {
                record: 6,
                text: "Speak now".into()
            })
        );
        let err = Notification::decode(&frame(encode_plain(CMD_ERROR, &[0x02]).unwrap())).unwrap();
        assert_eq!(err, Notification::Error { code: 2 });
        assert!(Notification::decode(&frame(encode_plain(CMD_LOAD, &[0]).unwrap())).is_err());
    }
}
