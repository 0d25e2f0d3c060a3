//! Command engine against a scripted module.
//!
//! Every test drives a `VoiceRecognizer` over a `ScriptedTransport` that
//! shares a `ManualClock` with the engine, so idle windows and timeouts are
//! exact.

use std::time::Duration;

use vr3_protocol::{
    encode_extended, encode_plain, FrameError, Group, GroupMode, LoadStatus, Opcode, ProtocolError,
    TrainStatus, TransportError, CMD_CHECK_RECOGNIZER, CMD_CHECK_SIGNATURE, CMD_CHECK_TRAIN, CMD_CLEAR,
    CMD_GROUP, CMD_LOAD, CMD_SET_SIGNATURE, CMD_VOICE_RECOGNIZED, GROUP_CHECK_USER, GROUP_LOAD_SYSTEM,
};

use crate::mock::ScriptedTransport;
use crate::{
    Clock, EngineConfig, EngineError, ManualClock, RecognitionSession, RecordLabel, SessionConfig,
    SignatureInput, VoiceRecognizer,
};

fn engine() -> VoiceRecognizer<ScriptedTransport, ManualClock> {
    let clock = ManualClock::new();
    VoiceRecognizer::with_clock(
        ScriptedTransport::with_clock(clock.clone()),
        EngineConfig::default(),
        clock,
    )
}

/// One query-all response frame covering records `5 * index .. 5 * index + 5`.
fn train_frame(index: u8) -> Vec<u8> {
    let mut pairs = Vec::new();
    for record in index * 5..index * 5 + 5 {
        pairs.push(record);
        pairs.push(u8::from(record % 2 == 0));
    }
    encode_extended(CMD_CHECK_TRAIN, 3, &pairs).unwrap()
}

// ============================================================================
// Command Matching
// ============================================================================

#[test]
fn test_load_answered_with_clear_fails() {
    let mut vr = engine();
    vr.transport_mut().push_bytes(encode_plain(CMD_CLEAR, &[1, 0, 0]).unwrap());

    let err = vr.load(&[0]).unwrap_err();
    assert_eq!(
        err,
        EngineError::CommandMismatch {
            expected: Opcode::Load,
            actual: CMD_CLEAR
        }
    );
    assert_eq!(err.code(), -1);
}

#[test]
fn test_statuses_inside_payload_are_not_errors() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(encode_plain(CMD_LOAD, &[0, 7, 0xFE, 8, 0xFD]).unwrap());

    let report = vr.load(&[7, 8]).unwrap();
    assert_eq!(report.loaded, 0);
    assert_eq!(report.status_of(7), Some(LoadStatus::Untrained));
    assert_eq!(report.status_of(8), Some(LoadStatus::RecognizerFull));
}

// ============================================================================
// Query-All Training Status
// ============================================================================

#[test]
fn test_query_all_stops_at_terminal_frame() {
    let mut vr = engine();
    for i in 0..51 {
        vr.transport_mut()
            .push_silence(Duration::from_millis(5))
            .push_bytes(train_frame(i));
    }
    vr.transport_mut().push_bytes(train_frame(0));

    let table = vr.check_train_all().unwrap();
    assert!(table.complete);
    assert_eq!(table.frames, 51);
    assert_eq!(table.records_seen, 255);
    assert_eq!(table.status(4), Some(TrainStatus::Trained));
    assert_eq!(table.status(5), Some(TrainStatus::Untrained));

    // Returned as soon as frame 51 arrived; frame 52 was never read.
    assert_eq!(vr.clock().now(), Duration::from_millis(255));
    assert_eq!(vr.transport().remaining_steps(), 1);
    assert_eq!(vr.transport().sent()[0], vec![0xAA, 0x03, 0x02, 0xFF, 0x0A]);
}

#[test]
fn test_query_all_partial_after_idle() {
    let mut vr = engine();
    for i in 0..10 {
        vr.transport_mut()
            .push_silence(Duration::from_millis(5))
            .push_bytes(train_frame(i));
    }
    vr.transport_mut().push_silence(Duration::from_millis(600));

    let table = vr.check_train_all().unwrap();
    assert!(!table.complete);
    assert_eq!(table.frames, 10);
    assert_eq!(table.records_seen, 50);
    assert_eq!(table.status(49), Some(TrainStatus::Untrained));
    assert_eq!(table.status(50), None);
    assert_eq!(table.as_bytes()[50], 0xF0);
    assert_eq!(vr.clock().now(), Duration::from_millis(550));
}

#[test]
fn test_query_all_nothing_received() {
    let mut vr = engine();
    let err = vr.check_train_all().unwrap_err();
    assert_eq!(err, EngineError::NoResponse);
    assert_eq!(err.code(), -2);
    assert_eq!(vr.clock().now(), Duration::from_millis(500));
}

#[test]
fn test_query_all_wrong_command_aborts() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(train_frame(0))
        .push_bytes(encode_plain(CMD_LOAD, &[0]).unwrap());

    let err = vr.check_train_all().unwrap_err();
    assert_eq!(err.code(), -3);
}

#[test]
fn test_query_all_bad_trailer_aborts() {
    let mut vr = engine();
    vr.transport_mut().push_bytes(vec![0xAA, 0x03, 0x02, 0x00, 0x0B]);

    let err = vr.check_train_all().unwrap_err();
    assert_eq!(err, EngineError::Frame(FrameError::BadTrailer(0x0B)));
    assert_eq!(err.code(), -4);
}

#[test]
fn test_query_all_cut_off_frame_aborts() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(train_frame(0))
        .push_bytes(vec![0xAA, 0x0E, 0x02, 0x03])
        .push_silence(Duration::from_millis(600));

    let err = vr.check_train_all().unwrap_err();
    assert!(matches!(
        err,
        EngineError::Frame(FrameError::ShortRead {
            expected: 14,
            received: 2,
            ..
        })
    ));
    assert!(!err.is_timeout());
}

#[test]
fn test_check_train_rejects_wildcard_record() {
    let mut vr = engine();
    for records in [&[0xFF][..], &[0xFF, 0xFF][..], &[4, 0xFF][..]] {
        assert!(matches!(vr.check_train(records), Err(EngineError::InvalidArgument(_))));
    }
    assert!(vr.transport().sent().is_empty());
}

#[test]
fn test_check_train_specific_dedups() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(encode_extended(CMD_CHECK_TRAIN, 1, &[3, 1, 1, 0, 2, 0xFF]).unwrap());

    let report = vr.check_train(&[3, 1, 3, 2, 1]).unwrap();
    assert_eq!(report.trained_count, 1);
    assert_eq!(report.entries.len(), 3);
    assert_eq!(report.entries[0].status, TrainStatus::Trained);
    assert_eq!(report.entries[2].status, TrainStatus::OutOfRange);
    assert_eq!(vr.transport().sent()[0], vec![0xAA, 0x05, 0x02, 3, 1, 2, 0x0A]);
}

// ============================================================================
// Signatures
// ============================================================================

#[test]
fn test_signature_delete_and_empty_text_differ_in_kind() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(encode_extended(CMD_SET_SIGNATURE, 2, &[]).unwrap())
        .push_bytes(encode_extended(CMD_SET_SIGNATURE, 2, &[]).unwrap());

    vr.delete_signature(2).unwrap();
    vr.set_signature(2, SignatureInput::Text(b"")).unwrap();
    let sent = vr.transport().sent();
    assert_eq!(sent[0], vec![0xAA, 0x03, 0x22, 2, 0x0A]);
    assert_eq!(sent[1], vec![0xAA, 0x03, 0x22, 2, 0x0A]);

    // Text goes through length derivation; deletion does not.
    assert!(matches!(
        vr.set_signature(2, "eleven-char"),
        Err(EngineError::InvalidArgument(_))
    ));
    assert_eq!(vr.transport().sent().len(), 2);
}

#[test]
fn test_signature_raw_is_verbatim() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(encode_extended(CMD_SET_SIGNATURE, 1, &[]).unwrap());

    vr.set_signature(1, SignatureInput::Raw(&[0x00, 0x41])).unwrap();
    assert_eq!(vr.transport().sent()[0], vec![0xAA, 0x05, 0x22, 1, 0x00, 0x41, 0x0A]);
}

#[test]
fn test_check_signature() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(encode_extended(CMD_CHECK_SIGNATURE, 6, &[2, b'o', b'n']).unwrap())
        .push_bytes(encode_extended(CMD_CHECK_SIGNATURE, 7, &[0]).unwrap());

    let sig = vr.check_signature(6).unwrap();
    assert_eq!(sig.bytes, b"on".to_vec());
    assert_eq!(sig.wire_len(), 2);
    let none = vr.check_signature(7).unwrap();
    assert_eq!(none.wire_len(), 0);
    assert_eq!(none.to_string(), "NONE");
}

// ============================================================================
// Recognizer
// ============================================================================

#[test]
fn test_check_recognizer_requires_exact_length() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(encode_plain(CMD_CHECK_RECOGNIZER, &[0; 10]).unwrap())
        .push_bytes(
            encode_plain(
                CMD_CHECK_RECOGNIZER,
                &[2, 0, 5, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 2, 0b11, 0x81],
            )
            .unwrap(),
        );

    assert_eq!(
        vr.check_recognizer(),
        Err(EngineError::Protocol(ProtocolError::UnexpectedLength {
            expected: 0x0D,
            actual: 0x0C
        }))
    );

    let state = vr.check_recognizer().unwrap();
    assert_eq!(state.loaded_records(), vec![0, 5]);
    assert_eq!(state.group_mode, GroupMode::User(1));
}

#[test]
fn test_autoload_bitmap_is_positional() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(encode_extended(0x15, 0, &[]).unwrap())
        .push_bytes(encode_extended(0x15, 0, &[]).unwrap());

    vr.set_autoload(&[5, 2]).unwrap();
    vr.disable_autoload().unwrap();
    let sent = vr.transport().sent();
    assert_eq!(sent[0], vec![0xAA, 0x05, 0x15, 0b11, 5, 2, 0x0A]);
    assert_eq!(sent[1], vec![0xAA, 0x03, 0x15, 0x00, 0x0A]);
}

// ============================================================================
// Recognition Poll
// ============================================================================

#[test]
fn test_recognize_silence_is_no_event() {
    let mut vr = engine();
    vr.transport_mut().push_silence(Duration::from_millis(200));
    assert_eq!(vr.recognize(), Ok(None));
}

#[test]
fn test_recognize_cut_off_frame_is_error() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(vec![0xAA, 0x07, CMD_VOICE_RECOGNIZED, 0x00, 0xFF])
        .push_silence(Duration::from_millis(200));

    let err = vr.recognize().unwrap_err();
    assert_eq!(
        err,
        EngineError::Frame(FrameError::ShortRead {
            expected: 7,
            received: 2,
            cause: TransportError::TimedOut
        })
    );
    assert_eq!(err.code(), -1);
}

#[test]
fn test_recognize_lone_head_byte_is_error() {
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(vec![0xAA])
        .push_silence(Duration::from_millis(200));

    assert!(matches!(
        vr.recognize(),
        Err(EngineError::Frame(FrameError::ShortRead { received: 1, .. }))
    ));
    // The poll never waits past its own timeout.
    assert_eq!(vr.clock().now(), Duration::from_millis(50));
}

// ============================================================================
// Groups
// ============================================================================

#[test]
fn test_group_operations() {
    let group = Group::new(2).unwrap();
    let mut vr = engine();
    vr.transport_mut()
        .push_bytes(encode_extended(CMD_GROUP, 1, &[]).unwrap())
        .push_bytes(encode_extended(CMD_GROUP, GROUP_CHECK_USER, &[4, 9, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap())
        .push_bytes(encode_extended(CMD_GROUP, GROUP_LOAD_SYSTEM, &[1, 0, 0x00]).unwrap())
        .push_bytes(encode_extended(CMD_GROUP, 0, &[1]).unwrap());

    vr.set_user_group(group, &[4, 9]).unwrap();
    assert_eq!(vr.transport().sent()[0], vec![0xAA, 0x06, 0x32, 0x01, 2, 4, 9, 0x0A]);

    let members = vr.check_user_group(group).unwrap();
    assert_eq!(members.records(), vec![4, 9]);
    assert_eq!(members.slots.len(), 7);

    let report = vr.load_system_group(group).unwrap();
    assert_eq!(report.status_of(0), Some(LoadStatus::Loaded));

    assert!(vr.check_group_control().unwrap());
    assert_eq!(vr.transport().sent()[3], vec![0xAA, 0x04, 0x32, 0x00, 0xFF, 0x0A]);
}

// ============================================================================
// Session
// ============================================================================

#[test]
fn test_session_halts_when_clear_keeps_failing() {
    let engine = engine();
    let config = SessionConfig {
        clear_attempts: 3,
        records: vec![RecordLabel {
            record: 0,
            label: "on".to_string(),
        }],
    };
    let mut session = RecognitionSession::new(engine, config);

    assert_eq!(session.start(), Err(EngineError::SessionHalted));
    assert!(session.engine().is_halted());
    assert_eq!(session.engine().transport().sent().len(), 3);
    assert_eq!(session.engine().clock().now(), Duration::from_millis(3000));

    let vr = session.engine_mut();
    assert_eq!(vr.load(&[0]), Err(EngineError::SessionHalted));
    assert_eq!(vr.transport().sent().len(), 3);
}

#[test]
fn test_write_failure_surfaces() {
    let mut vr = engine();
    vr.transport_mut().set_fail_writes(true);
    assert!(matches!(vr.clear(), Err(EngineError::Frame(FrameError::Write(_)))));
}
