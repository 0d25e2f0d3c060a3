//! Common types used in the protocol.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ProtocolError;

/// A record (trainable voice pattern slot) number, 0..=254.
///
/// `0xFF` ([`RECORD_NONE`]) is reserved as the all/none sentinel. Values are
/// passed to the module as-is; the module itself reports out-of-range records
/// through per-record status bytes.
pub type RecordId = u8;

// ============================================================================
// Opcodes
// ============================================================================

/// Every command byte the module understands or emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    CheckSystem,
    CheckRecognizer,
    CheckTrain,
    CheckSignature,
    RestoreDefaults,
    SetBaudRate,
    SetIoMode,
    SetPulseWidth,
    ResetIo,
    SetAutoload,
    Train,
    SignatureTrain,
    SetSignature,
    Load,
    Clear,
    Group,
    VoiceRecognized,
    Prompt,
    Error,
}

impl Opcode {
    /// The wire value of this opcode.
    pub const fn code(self) -> u8 {
        match self {
            Opcode::CheckSystem => CMD_CHECK_SYSTEM,
            Opcode::CheckRecognizer => CMD_CHECK_RECOGNIZER,
            Opcode::CheckTrain => CMD_CHECK_TRAIN,
            Opcode::CheckSignature => CMD_CHECK_SIGNATURE,
            Opcode::RestoreDefaults => CMD_RESTORE_DEFAULT,
            Opcode::SetBaudRate => CMD_SET_BAUD_RATE,
            Opcode::SetIoMode => CMD_SET_IO_MODE,
            Opcode::SetPulseWidth => CMD_SET_PULSE_WIDTH,
            Opcode::ResetIo => CMD_RESET_IO,
            Opcode::SetAutoload => CMD_SET_AUTOLOAD,
            Opcode::Train => CMD_TRAIN,
            Opcode::SignatureTrain => CMD_SIGNATURE_TRAIN,
            Opcode::SetSignature => CMD_SET_SIGNATURE,
            Opcode::Load => CMD_LOAD,
            Opcode::Clear => CMD_CLEAR,
            Opcode::Group => CMD_GROUP,
            Opcode::VoiceRecognized => CMD_VOICE_RECOGNIZED,
            Opcode::Prompt => CMD_PROMPT,
            Opcode::Error => CMD_ERROR,
        }
    }

    /// Short name, used in logs and metric labels.
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::CheckSystem => "check_system",
            Opcode::CheckRecognizer => "check_recognizer",
            Opcode::CheckTrain => "check_train",
            Opcode::CheckSignature => "check_signature",
            Opcode::RestoreDefaults => "restore_defaults",
            Opcode::SetBaudRate => "set_baud_rate",
            Opcode::SetIoMode => "set_io_mode",
            Opcode::SetPulseWidth => "set_pulse_width",
            Opcode::ResetIo => "reset_io",
            Opcode::SetAutoload => "set_autoload",
            Opcode::Train => "train",
            Opcode::SignatureTrain => "signature_train",
            Opcode::SetSignature => "set_signature",
            Opcode::Load => "load",
            Opcode::Clear => "clear",
            Opcode::Group => "group",
            Opcode::VoiceRecognized => "voice_recognized",
            Opcode::Prompt => "prompt",
            Opcode::Error => "error",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, ProtocolError> {
        Ok(match code {
            CMD_CHECK_SYSTEM => Opcode::CheckSystem,
            CMD_CHECK_RECOGNIZER => Opcode::CheckRecognizer,
            CMD_CHECK_TRAIN => Opcode::CheckTrain,
            CMD_CHECK_SIGNATURE => Opcode::CheckSignature,
            CMD_RESTORE_DEFAULT => Opcode::RestoreDefaults,
            CMD_SET_BAUD_RATE => Opcode::SetBaudRate,
            CMD_SET_IO_MODE => Opcode::SetIoMode,
            CMD_SET_PULSE_WIDTH => Opcode::SetPulseWidth,
            CMD_RESET_IO => Opcode::ResetIo,
            CMD_SET_AUTOLOAD => Opcode::SetAutoload,
            CMD_TRAIN => Opcode::Train,
            CMD_SIGNATURE_TRAIN => Opcode::SignatureTrain,
            CMD_SET_SIGNATURE => Opcode::SetSignature,
            CMD_LOAD => Opcode::Load,
            CMD_CLEAR => Opcode::Clear,
            CMD_GROUP => Opcode::Group,
            CMD_VOICE_RECOGNIZED => Opcode::VoiceRecognized,
            CMD_PROMPT => Opcode::Prompt,
            CMD_ERROR => Opcode::Error,
            other => return Err(ProtocolError::UnknownOpcode(other)),
        })
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op.code()
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.code())
    }
}

// ============================================================================
// Groups
// ============================================================================

/// A system or user group number, 0..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Group(u8);

impl Group {
    /// Create a group number. Returns None if out of range.
    pub fn new(index: u8) -> Option<Self> {
        (index < GROUP_COUNT).then_some(Group(index))
    }

    /// The group number.
    pub fn index(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Group {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Group::new(index).ok_or_else(|| format!("group {} out of range 0..{}", index, GROUP_COUNT))
    }
}

impl From<Group> for u8 {
    fn from(group: Group) -> Self {
        group.0
    }
}

/// Which group the recognizer is operating in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupMode {
    /// Not in group mode.
    None,
    /// System group n.
    System(u8),
    /// User group n.
    User(u8),
}

impl From<u8> for GroupMode {
    fn from(byte: u8) -> Self {
        if byte == GROUP_MODE_NONE {
            GroupMode::None
        } else if byte & GROUP_MODE_USER_FLAG != 0 {
            GroupMode::User(byte & !GROUP_MODE_USER_FLAG)
        } else {
            GroupMode::System(byte)
        }
    }
}

impl From<GroupMode> for u8 {
    fn from(mode: GroupMode) -> Self {
        match mode {
            GroupMode::None => GROUP_MODE_NONE,
            GroupMode::System(n) => n & !GROUP_MODE_USER_FLAG,
            GroupMode::User(n) => n | GROUP_MODE_USER_FLAG,
        }
    }
}

impl std::fmt::Display for GroupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupMode::None => write!(f, "NONE"),
            GroupMode::System(n) => write!(f, "SG {}", n),
            GroupMode::User(n) => write!(f, "UG {}", n),
        }
    }
}

// ============================================================================
// Status Codes
// ============================================================================

/// Per-record result of a load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadStatus {
    Loaded,
    AlreadyLoaded,
    RecognizerFull,
    Untrained,
    OutOfRange,
    Other(u8),
}

impl From<u8> for LoadStatus {
    fn from(code: u8) -> Self {
        match code {
            LOAD_STA_LOADED => LoadStatus::Loaded,
            LOAD_STA_ALREADY_LOADED => LoadStatus::AlreadyLoaded,
            LOAD_STA_RECOGNIZER_FULL => LoadStatus::RecognizerFull,
            LOAD_STA_UNTRAINED => LoadStatus::Untrained,
            LOAD_STA_OUT_OF_RANGE => LoadStatus::OutOfRange,
            other => LoadStatus::Other(other),
        }
    }
}

impl From<LoadStatus> for u8 {
    fn from(status: LoadStatus) -> Self {
        match status {
            LoadStatus::Loaded => LOAD_STA_LOADED,
            LoadStatus::AlreadyLoaded => LOAD_STA_ALREADY_LOADED,
            LoadStatus::RecognizerFull => LOAD_STA_RECOGNIZER_FULL,
            LoadStatus::Untrained => LOAD_STA_UNTRAINED,
            LoadStatus::OutOfRange => LOAD_STA_OUT_OF_RANGE,
            LoadStatus::Other(code) => code,
        }
    }
}

/// Training state of a record, as reported by check-train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainStatus {
    Untrained,
    Trained,
    OutOfRange,
    Other(u8),
}

impl From<u8> for TrainStatus {
    fn from(code: u8) -> Self {
        match code {
            TRAIN_STA_UNTRAINED => TrainStatus::Untrained,
            TRAIN_STA_TRAINED => TrainStatus::Trained,
            TRAIN_STA_OUT_OF_RANGE => TrainStatus::OutOfRange,
            other => TrainStatus::Other(other),
        }
    }
}

impl From<TrainStatus> for u8 {
    fn from(status: TrainStatus) -> Self {
        match status {
            TrainStatus::Untrained => TRAIN_STA_UNTRAINED,
            TrainStatus::Trained => TRAIN_STA_TRAINED,
            TrainStatus::OutOfRange => TRAIN_STA_OUT_OF_RANGE,
            TrainStatus::Other(code) => code,
        }
    }
}

/// Per-record result of a train request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainOutcome {
    Success,
    Timeout,
    OutOfRange,
    Other(u8),
}

impl From<u8> for TrainOutcome {
    fn from(code: u8) -> Self {
        match code {
            TRAIN_STA_UNTRAINED => TrainOutcome::Success,
            TRAIN_STA_TIMEOUT => TrainOutcome::Timeout,
            TRAIN_STA_OUT_OF_RANGE => TrainOutcome::OutOfRange,
            other => TrainOutcome::Other(other),
        }
    }
}

impl From<TrainOutcome> for u8 {
    fn from(outcome: TrainOutcome) -> Self {
        match outcome {
            TrainOutcome::Success => TRAIN_STA_UNTRAINED,
            TrainOutcome::Timeout => TRAIN_STA_TIMEOUT,
            TrainOutcome::OutOfRange => TRAIN_STA_OUT_OF_RANGE,
            TrainOutcome::Other(code) => code,
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Serial baud rates the module supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaudRate {
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
}

impl BaudRate {
    /// Wire code sent with set-baud-rate.
    pub fn code(self) -> u8 {
        match self {
            BaudRate::B2400 => 1,
            BaudRate::B4800 => 2,
            BaudRate::B9600 => 3,
            BaudRate::B19200 => 4,
            BaudRate::B38400 => 5,
        }
    }

    /// Decode a wire code. Code 0 is the module default (9600).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 | 3 => Some(BaudRate::B9600),
            1 => Some(BaudRate::B2400),
            2 => Some(BaudRate::B4800),
            4 => Some(BaudRate::B19200),
            5 => Some(BaudRate::B38400),
            _ => None,
        }
    }

    /// Look up a rate in bits per second.
    pub fn from_bps(bps: u32) -> Option<Self> {
        match bps {
            2400 => Some(BaudRate::B2400),
            4800 => Some(BaudRate::B4800),
            9600 => Some(BaudRate::B9600),
            19200 => Some(BaudRate::B19200),
            38400 => Some(BaudRate::B38400),
            _ => None,
        }
    }

    /// Rate in bits per second.
    pub fn bps(self) -> u32 {
        match self {
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
        }
    }
}

/// How the module drives its output pins on recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoMode {
    Pulse,
    Toggle,
    Set,
    Clear,
}

impl IoMode {
    pub fn code(self) -> u8 {
        match self {
            IoMode::Pulse => 0,
            IoMode::Toggle => 1,
            IoMode::Set => 2,
            IoMode::Clear => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(IoMode::Pulse),
            1 => Some(IoMode::Toggle),
            2 => Some(IoMode::Set),
            3 => Some(IoMode::Clear),
            _ => None,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Render signature bytes for display: printable ASCII as-is, anything
/// else as `\xNN`.
pub fn signature_to_string(signature: &[u8]) -> String {
    let mut out = String::with_capacity(signature.len());
    for &byte in signature {
        if byte.is_ascii_graphic() || byte == b' ' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("\\x{:02X}", byte));
        }
    }
    out
}
