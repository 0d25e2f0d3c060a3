//! Protocol constants
//!
//! Sentinels, command codes, subcommands and status bytes used on the
//! VR3 voice-recognition module's serial link.

// ============================================================================
// Frame Sentinels
// ============================================================================

/// First byte of every frame.
pub const FRAME_HEAD: u8 = 0xAA;
/// Last byte of every frame.
pub const FRAME_END: u8 = 0x0A;

// ============================================================================
// Command Codes (host → module)
// ============================================================================

/// Check system settings (baud rate, IO mode, pulse width, autoload, group).
pub const CMD_CHECK_SYSTEM: u8 = 0x00;
/// Check the recognizer (which records are loaded).
pub const CMD_CHECK_RECOGNIZER: u8 = 0x01;
/// Check record training status.
pub const CMD_CHECK_TRAIN: u8 = 0x02;
/// Check the signature of a record.
pub const CMD_CHECK_SIGNATURE: u8 = 0x03;

/// Restore the module's default configuration.
pub const CMD_RESTORE_DEFAULT: u8 = 0x10;
/// Set the serial baud rate.
pub const CMD_SET_BAUD_RATE: u8 = 0x11;
/// Set the output IO mode.
pub const CMD_SET_IO_MODE: u8 = 0x12;
/// Set the output pulse width.
pub const CMD_SET_PULSE_WIDTH: u8 = 0x13;
/// Reset output IOs.
pub const CMD_RESET_IO: u8 = 0x14;
/// Configure records loaded at power-on.
pub const CMD_SET_AUTOLOAD: u8 = 0x15;

/// Train records.
pub const CMD_TRAIN: u8 = 0x20;
/// Train a record and attach a signature.
pub const CMD_SIGNATURE_TRAIN: u8 = 0x21;
/// Set (or delete) the signature of a record.
pub const CMD_SET_SIGNATURE: u8 = 0x22;

/// Load records into the recognizer.
pub const CMD_LOAD: u8 = 0x30;
/// Clear the recognizer.
pub const CMD_CLEAR: u8 = 0x31;
/// Group control (see `GROUP_*` subcommands).
pub const CMD_GROUP: u8 = 0x32;

// ============================================================================
// Group Subcommands (for CMD_GROUP)
// ============================================================================

/// Enable/disable or query group control.
pub const GROUP_SET_CONTROL: u8 = 0x00;
/// Define a user group.
pub const GROUP_SET_USER: u8 = 0x01;
/// Load a system group into the recognizer.
pub const GROUP_LOAD_SYSTEM: u8 = 0x02;
/// Load a user group into the recognizer.
pub const GROUP_LOAD_USER: u8 = 0x03;
/// Check the records of a user group.
pub const GROUP_CHECK_USER: u8 = 0x04;

/// Query byte sent with `GROUP_SET_CONTROL` to read the current setting.
pub const GROUP_CONTROL_QUERY: u8 = 0xFF;

// ============================================================================
// Notification Codes (module → host)
// ============================================================================

/// A voice command was recognized.
pub const CMD_VOICE_RECOGNIZED: u8 = 0x0D;
/// Training prompt text.
pub const CMD_PROMPT: u8 = 0x0A;
/// The module rejected the last command.
pub const CMD_ERROR: u8 = 0xFF;

// ============================================================================
// Load Status
// ============================================================================

/// Record loaded.
pub const LOAD_STA_LOADED: u8 = 0x00;
/// Record already in the recognizer.
pub const LOAD_STA_ALREADY_LOADED: u8 = 0xFC;
/// Recognizer is full.
pub const LOAD_STA_RECOGNIZER_FULL: u8 = 0xFD;
/// Record is untrained.
pub const LOAD_STA_UNTRAINED: u8 = 0xFE;
/// Record value out of range.
pub const LOAD_STA_OUT_OF_RANGE: u8 = 0xFF;

// ============================================================================
// Train Status
// ============================================================================

/// Record untrained (check-train) / training succeeded (train).
pub const TRAIN_STA_UNTRAINED: u8 = 0x00;
/// Record trained (check-train).
pub const TRAIN_STA_TRAINED: u8 = 0x01;
/// Training timed out (train).
pub const TRAIN_STA_TIMEOUT: u8 = 0xFE;
/// Record value out of range.
pub const TRAIN_STA_OUT_OF_RANGE: u8 = 0xFF;
/// Table fill value for records the module never reported on.
pub const TRAIN_STA_NOT_REPORTED: u8 = 0xF0;

// ============================================================================
// Sizes
// ============================================================================

/// Largest frame the one-byte length field can describe (`LEN` + head + length byte).
pub const MAX_FRAME_SIZE: usize = 255 + 2;
/// Smallest legal `LEN` value (command + end byte).
pub const MIN_LEN: u8 = 2;
/// `LEN` of a check-recognizer response.
pub const RECOGNIZER_RESPONSE_LEN: u8 = 0x0D;
/// Number of recognizer slots.
pub const RECOGNIZER_SLOTS: usize = 7;
/// Maximum signature length.
pub const MAX_SIGNATURE_LEN: usize = 10;
/// Number of addressable records (0..=254, 0xFF is the all/none sentinel).
pub const RECORD_COUNT: usize = 255;
/// Sentinel meaning "all records" / "no record".
pub const RECORD_NONE: u8 = 0xFF;
/// Number of user/system groups.
pub const GROUP_COUNT: u8 = 8;
/// Highest pulse width level.
pub const MAX_PULSE_WIDTH_LEVEL: u8 = 15;
/// Records reported per frame in a query-all check-train response.
pub const RECORDS_PER_TRAIN_FRAME: usize = 5;

// ============================================================================
// Group Mode Byte
// ============================================================================

/// Group mode: not in group mode.
pub const GROUP_MODE_NONE: u8 = 0xFF;
/// Flag bit marking a user group (low bits hold the group number).
pub const GROUP_MODE_USER_FLAG: u8 = 0x80;
