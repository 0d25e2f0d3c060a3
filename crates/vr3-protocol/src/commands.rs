//! Commands that can be sent to the module.

use crate::constants::*;
use crate::error::FrameError;
use crate::frame::{autoload_bitmap, dedup_records, encode_extended, encode_plain, encode_raw};
use crate::types::*;

/// Commands that can be sent to the module.
///
/// Argument ranges (pulse width level, signature length, group slot counts)
/// are checked by the caller; `encode` only enforces what the frame format
/// itself requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read baud rate, IO mode, pulse width, autoload and group settings.
    CheckSystem,

    /// Read which records sit in the recognizer.
    CheckRecognizer,

    /// Read training status.
    CheckTrain {
        /// Records to query. `None` asks for every record, answered over
        /// several frames.
        records: Option<Vec<RecordId>>,
    },

    /// Read the signature of a record.
    CheckSignature {
        record: RecordId,
    },

    /// Restore factory settings.
    RestoreDefaults,

    /// Change the serial baud rate.
    SetBaudRate {
        rate: BaudRate,
    },

    /// Change how output pins react to recognition.
    SetIoMode {
        mode: IoMode,
    },

    /// Change the output pulse width.
    SetPulseWidth {
        /// Level 0..=15.
        level: u8,
    },

    /// Reset output pins. An empty list resets all of them.
    ResetIo {
        outputs: Vec<u8>,
    },

    /// Choose the records loaded at power-on. An empty list disables
    /// autoload.
    SetAutoload {
        records: Vec<RecordId>,
    },

    /// Train one or more records.
    Train {
        records: Vec<RecordId>,
    },

    /// Train a record and attach a signature to it.
    SignatureTrain {
        record: RecordId,
        signature: Vec<u8>,
    },

    /// Set a record's signature. An empty signature deletes it.
    SetSignature {
        record: RecordId,
        signature: Vec<u8>,
    },

    /// Load records into the recognizer.
    Load {
        records: Vec<RecordId>,
    },

    /// Empty the recognizer.
    Clear,

    /// Enable, disable (`Some`) or query (`None`) group control.
    SetGroupControl {
        enabled: Option<bool>,
    },

    /// Define the records of a user group.
    SetUserGroup {
        group: Group,
        records: Vec<RecordId>,
    },

    /// Load a system group into the recognizer.
    LoadSystemGroup {
        group: Group,
    },

    /// Load a user group into the recognizer.
    LoadUserGroup {
        group: Group,
    },

    /// Read the records of a user group.
    CheckUserGroup {
        group: Group,
    },

    /// Header-only frame forwarded as-is. No response is expected.
    Raw {
        data: Vec<u8>,
    },
}

impl Command {
    /// The opcode this command is sent with, or `None` for raw frames.
    pub fn opcode(&self) -> Option<Opcode> {
        Some(match self {
            Command::CheckSystem => Opcode::CheckSystem,
            Command::CheckRecognizer => Opcode::CheckRecognizer,
            Command::CheckTrain { .. } => Opcode::CheckTrain,
            Command::CheckSignature { .. } => Opcode::CheckSignature,
            Command::RestoreDefaults => Opcode::RestoreDefaults,
            Command::SetBaudRate { .. } => Opcode::SetBaudRate,
            Command::SetIoMode { .. } => Opcode::SetIoMode,
            Command::SetPulseWidth { .. } => Opcode::SetPulseWidth,
            Command::ResetIo { .. } => Opcode::ResetIo,
            Command::SetAutoload { .. } => Opcode::SetAutoload,
            Command::Train { .. } => Opcode::Train,
            Command::SignatureTrain { .. } => Opcode::SignatureTrain,
            Command::SetSignature { .. } => Opcode::SetSignature,
            Command::Load { .. } => Opcode::Load,
            Command::Clear => Opcode::Clear,
            Command::SetGroupControl { .. }
            | Command::SetUserGroup { .. }
            | Command::LoadSystemGroup { .. }
            | Command::LoadUserGroup { .. }
            | Command::CheckUserGroup { .. } => Opcode::Group,
            Command::Raw { .. } => return None,
        })
    }

    /// Encode the command to a complete wire frame.
    ///
    /// Record lists for check-train and train are deduplicated first; an
    /// empty list where at least one record is needed is
    /// [`FrameError::EmptyInput`]. A specific check-train list may not name
    /// [`RECORD_NONE`]: `[0xFF]` would go out as the query-all request.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        match self {
            Command::CheckSystem => encode_plain(CMD_CHECK_SYSTEM, &[]),
            Command::CheckRecognizer => encode_plain(CMD_CHECK_RECOGNIZER, &[]),

            Command::CheckTrain { records: None } => encode_extended(CMD_CHECK_TRAIN, RECORD_NONE, &[]),
            Command::CheckTrain { records: Some(records) } => {
                let unique = dedup_records(records)?;
                if unique.contains(&RECORD_NONE) {
                    return Err(FrameError::ReservedRecord(RECORD_NONE));
                }
                encode_plain(CMD_CHECK_TRAIN, &unique)
            }

            Command::CheckSignature { record } => encode_extended(CMD_CHECK_SIGNATURE, *record, &[]),

            Command::RestoreDefaults => encode_plain(CMD_RESTORE_DEFAULT, &[]),
            Command::SetBaudRate { rate } => encode_plain(CMD_SET_BAUD_RATE, &[rate.code()]),
            Command::SetIoMode { mode } => encode_plain(CMD_SET_IO_MODE, &[mode.code()]),
            Command::SetPulseWidth { level } => encode_plain(CMD_SET_PULSE_WIDTH, &[*level]),
            Command::ResetIo { outputs } => encode_plain(CMD_RESET_IO, outputs),

            Command::SetAutoload { records } => {
                encode_extended(CMD_SET_AUTOLOAD, autoload_bitmap(records.len()), records)
            }

            Command::Train { records } => {
                let unique = dedup_records(records)?;
                encode_plain(CMD_TRAIN, &unique)
            }
            Command::SignatureTrain { record, signature } => {
                encode_extended(CMD_SIGNATURE_TRAIN, *record, signature)
            }
            Command::SetSignature { record, signature } => encode_extended(CMD_SET_SIGNATURE, *record, signature),

            Command::Load { records } => {
                if records.is_empty() {
                    return Err(FrameError::EmptyInput);
                }
                encode_plain(CMD_LOAD, records)
            }
            Command::Clear => encode_plain(CMD_CLEAR, &[]),

            Command::SetGroupControl { enabled } => {
                let ctrl = match enabled {
                    Some(true) => 1,
                    Some(false) => 0,
                    None => GROUP_CONTROL_QUERY,
                };
                encode_extended(CMD_GROUP, GROUP_SET_CONTROL, &[ctrl])
            }
            Command::SetUserGroup { group, records } => {
                let mut payload = Vec::with_capacity(records.len() + 1);
                payload.push(group.index());
                payload.extend_from_slice(records);
                encode_extended(CMD_GROUP, GROUP_SET_USER, &payload)
            }
            Command::LoadSystemGroup { group } => encode_extended(CMD_GROUP, GROUP_LOAD_SYSTEM, &[group.index()]),
            Command::LoadUserGroup { group } => encode_extended(CMD_GROUP, GROUP_LOAD_USER, &[group.index()]),
            Command::CheckUserGroup { group } => encode_extended(CMD_GROUP, GROUP_CHECK_USER, &[group.index()]),

            Command::Raw { data } => encode_raw(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_train_query_all_is_wildcard_subcommand() {
        let frame = Command::CheckTrain { records: None }.encode().unwrap();
        assert_eq!(frame, vec![0xAA, 0x03, 0x02, 0xFF, 0x0A]);
    }

    #[test]
    fn test_check_train_specific_dedups() {
        let frame = Command::CheckTrain {
            records: Some(vec![3, 1, 3, 2, 1]),
        }
        .encode()
        .unwrap();
        assert_eq!(frame, vec![0xAA, 0x05, 0x02, 3, 1, 2, 0x0A]);
    }

    #[test]
    fn test_check_train_empty_list_rejected() {
        let cmd = Command::CheckTrain { records: Some(vec![]) };
        assert_eq!(cmd.encode(), Err(FrameError::EmptyInput));
    }

    #[test]
    fn test_autoload_bitmap_by_position() {
        let frame = Command::SetAutoload { records: vec![5, 2] }.encode().unwrap();
        assert_eq!(frame, vec![0xAA, 0x05, 0x15, 0b11, 5, 2, 0x0A]);

        let disable = Command::SetAutoload { records: vec![] }.encode().unwrap();
        assert_eq!(disable, vec![0xAA, 0x03, 0x15, 0x00, 0x0A]);
    }

    #[test]
    fn test_set_signature_layout() {
        let frame = Command::SetSignature {
            record: 7,
            signature: b"lamp".to_vec(),
        }
        .encode()
        .unwrap();
        assert_eq!(frame, vec![0xAA, 0x07, 0x22, 7, b'l', b'a', b'm', b'p', 0x0A]);

        let delete = Command::SetSignature {
            record: 7,
            signature: vec![],
        }
        .encode()
        .unwrap();
        assert_eq!(delete, vec![0xAA, 0x03, 0x22, 7, 0x0A]);
    }

    #[test]
    fn test_group_commands() {
        let group = Group::new(2).unwrap();
        assert_eq!(
            Command::SetUserGroup {
                group,
                records: vec![0, 1]
            }
            .encode()
            .unwrap(),
            vec![0xAA, 0x06, 0x32, 0x01, 2, 0, 1, 0x0A]
        );
        assert_eq!(
            Command::SetGroupControl { enabled: None }.encode().unwrap(),
            vec![0xAA, 0x04, 0x32, 0x00, 0xFF, 0x0A]
        );
        assert_eq!(Command::LoadUserGroup { group }.opcode(), Some(Opcode::Group));
    }

    #[test]
    fn test_check_train_rejects_wildcard_record() {
        for records in [vec![0xFF], vec![0xFF, 0xFF], vec![3, 0xFF]] {
            assert_eq!(
                Command::CheckTrain { records: Some(records) }.encode(),
                Err(FrameError::ReservedRecord(0xFF))
            );
        }
        assert_eq!(Command::Raw { data: vec![1] }.opcode(), None);
    }

    #[test]
    fn test_load_requires_records() {
        assert_eq!(Command::Load { records: vec![] }.encode(), Err(FrameError::EmptyInput));
        assert_eq!(
            Command::Load { records: vec![4] }.encode().unwrap(),
            vec![0xAA, 0x03, 0x30, 4, 0x0A]
        );
    }
}
