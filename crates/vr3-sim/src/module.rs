//! The simulated module.

use std::collections::VecDeque;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};
use vr3_protocol::{
    autoload_bitmap, encode_extended, encode_plain, BaudRate, Frame, FrameError, IoMode, ReadMode, RecordId,
    Transport, TransportError, CMD_CHECK_RECOGNIZER, CMD_CHECK_SIGNATURE, CMD_CHECK_SYSTEM, CMD_CHECK_TRAIN,
    CMD_CLEAR, CMD_ERROR, CMD_GROUP, CMD_LOAD, CMD_PROMPT, CMD_RESET_IO, CMD_RESTORE_DEFAULT, CMD_SET_AUTOLOAD,
    CMD_SET_BAUD_RATE, CMD_SET_IO_MODE, CMD_SET_PULSE_WIDTH, CMD_SET_SIGNATURE, CMD_SIGNATURE_TRAIN, CMD_TRAIN,
    CMD_VOICE_RECOGNIZED, GROUP_CHECK_USER, GROUP_CONTROL_QUERY, GROUP_COUNT, GROUP_LOAD_SYSTEM, GROUP_LOAD_USER,
    GROUP_MODE_NONE, GROUP_MODE_USER_FLAG, GROUP_SET_CONTROL, GROUP_SET_USER, LOAD_STA_ALREADY_LOADED,
    LOAD_STA_LOADED, LOAD_STA_OUT_OF_RANGE, LOAD_STA_RECOGNIZER_FULL, LOAD_STA_UNTRAINED, MAX_PULSE_WIDTH_LEVEL,
    MAX_SIGNATURE_LEN, RECOGNIZER_SLOTS, RECORDS_PER_TRAIN_FRAME, RECORD_COUNT, RECORD_NONE, TRAIN_STA_OUT_OF_RANGE,
    TRAIN_STA_TRAINED, TRAIN_STA_UNTRAINED,
};

use crate::config::SimConfig;

/// Error code for an opcode the module does not know.
pub const SIM_ERR_UNKNOWN_COMMAND: u8 = 0x01;
/// Error code for an argument outside its range.
pub const SIM_ERR_BAD_ARGUMENT: u8 = 0x02;
/// Error code for bytes that did not form a frame.
pub const SIM_ERR_MALFORMED: u8 = 0x03;

/// Prompts emitted for each record while training.
pub const TRAIN_PROMPTS: [&str; 2] = ["Speak now", "Speak again"];

const BOUNDED_WAIT: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Default)]
struct RecordState {
    trained: bool,
    signature: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Settings {
    baud_rate: BaudRate,
    io_mode: IoMode,
    pulse_width: u8,
    autoload: Vec<RecordId>,
    group_control: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            baud_rate: BaudRate::B9600,
            io_mode: IoMode::Pulse,
            pulse_width: 0,
            autoload: Vec::new(),
            group_control: false,
        }
    }
}

/// An in-memory VR3 module.
///
/// Frames written to it are answered immediately: responses are queued and
/// handed out by subsequent reads. Training completes at once, after the
/// usual prompt frames. Voice commands are injected with
/// [`speak`](Self::speak) or [`speak_random`](Self::speak_random).
#[derive(Debug)]
pub struct SimulatedModule {
    config: SimConfig,
    rng: ChaCha8Rng,
    records: Vec<RecordState>,
    recognizer: Vec<RecordId>,
    group_mode: u8,
    settings: Settings,
    user_groups: [[RecordId; RECOGNIZER_SLOTS]; GROUP_COUNT as usize],
    outbound: VecDeque<u8>,
    reject_next: Option<u8>,
    commands_handled: u64,
}

impl SimulatedModule {
    pub fn new(config: SimConfig) -> Self {
        let mut module = SimulatedModule {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            records: vec![RecordState::default(); RECORD_COUNT],
            recognizer: Vec::new(),
            group_mode: GROUP_MODE_NONE,
            settings: Settings::default(),
            user_groups: [[RECORD_NONE; RECOGNIZER_SLOTS]; GROUP_COUNT as usize],
            outbound: VecDeque::new(),
            reject_next: None,
            commands_handled: 0,
            config,
        };
        for sim_record in module.config.records.clone() {
            if let Some(state) = module.records.get_mut(usize::from(sim_record.record)) {
                state.trained = true;
                state.signature = sim_record.signature.into_bytes();
                state.signature.truncate(MAX_SIGNATURE_LEN);
            }
        }
        module.settings.autoload = module.config.autoload.clone();
        module.power_on();
        module
    }

    /// Reset the recognizer and load the autoload records, as at power-on.
    pub fn power_on(&mut self) {
        self.recognizer.clear();
        self.group_mode = GROUP_MODE_NONE;
        for record in self.settings.autoload.clone() {
            self.load_record(record);
        }
        debug!(
            "Vr3Sim[{}]: powered on with {} records loaded",
            self.config.name,
            self.recognizer.len()
        );
    }

    // ========================================================================
    // Inspection and Injection
    // ========================================================================

    pub fn is_trained(&self, record: RecordId) -> bool {
        self.records.get(usize::from(record)).is_some_and(|r| r.trained)
    }

    pub fn signature(&self, record: RecordId) -> Option<&[u8]> {
        self.records.get(usize::from(record)).map(|r| r.signature.as_slice())
    }

    /// Records in the recognizer, in slot order.
    pub fn recognizer(&self) -> &[RecordId] {
        &self.recognizer
    }

    pub fn baud_rate(&self) -> BaudRate {
        self.settings.baud_rate
    }

    pub fn group_control(&self) -> bool {
        self.settings.group_control
    }

    /// Frames handled so far, malformed ones included.
    pub fn commands_handled(&self) -> u64 {
        self.commands_handled
    }

    /// Answer the next command with an error frame carrying `code`.
    pub fn reject_next(&mut self, code: u8) {
        self.reject_next = Some(code);
    }

    /// Queue arbitrary bytes for the host to read.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.outbound.extend(bytes);
    }

    /// Simulate the user saying `record`. Returns false, queueing nothing,
    /// unless the record is in the recognizer.
    pub fn speak(&mut self, record: RecordId) -> bool {
        let Some(index) = self.recognizer.iter().position(|&r| r == record) else {
            return false;
        };
        let signature = self.records[usize::from(record)].signature.clone();
        let mut payload = vec![self.group_mode, record, index as u8, signature.len() as u8];
        payload.extend_from_slice(&signature);
        debug!("Vr3Sim[{}]: recognized record {}", self.config.name, record);
        self.queue(encode_extended(CMD_VOICE_RECOGNIZED, 0, &payload));
        true
    }

    /// Speak a random loaded record.
    pub fn speak_random(&mut self) -> Option<RecordId> {
        let record = *self.recognizer.choose(&mut self.rng)?;
        self.speak(record);
        Some(record)
    }

    // ========================================================================
    // Command Handling
    // ========================================================================

    fn queue(&mut self, encoded: Result<Vec<u8>, FrameError>) {
        match encoded {
            Ok(bytes) => {
                trace!("Vr3Sim[{}]: queue {:02X?}", self.config.name, bytes);
                self.outbound.extend(bytes);
            }
            Err(e) => warn!("Vr3Sim[{}]: could not encode response: {}", self.config.name, e),
        }
    }

    fn reject(&mut self, code: u8) {
        debug!("Vr3Sim[{}]: rejecting with code 0x{:02X}", self.config.name, code);
        self.queue(encode_plain(CMD_ERROR, &[code]));
    }

    fn handle(&mut self, frame: &Frame) {
        self.commands_handled += 1;
        if let Some(code) = self.reject_next.take() {
            self.reject(code);
            return;
        }
        match frame.command_byte() {
            CMD_CHECK_SYSTEM => self.check_system(),
            CMD_CHECK_RECOGNIZER => self.check_recognizer(),
            CMD_CHECK_TRAIN => self.check_train(frame.payload()),
            CMD_CHECK_SIGNATURE => self.check_signature(frame.subcommand()),
            CMD_RESTORE_DEFAULT => {
                self.settings = Settings::default();
                self.queue(encode_plain(CMD_RESTORE_DEFAULT, &[]));
            }
            CMD_SET_BAUD_RATE => self.set_baud_rate(frame.payload()),
            CMD_SET_IO_MODE => self.set_io_mode(frame.payload()),
            CMD_SET_PULSE_WIDTH => self.set_pulse_width(frame.payload()),
            CMD_RESET_IO => self.queue(encode_plain(CMD_RESET_IO, &[])),
            CMD_SET_AUTOLOAD => self.set_autoload(frame),
            CMD_TRAIN => self.train(frame.payload()),
            CMD_SIGNATURE_TRAIN => self.signature_train(frame),
            CMD_SET_SIGNATURE => self.set_signature(frame),
            CMD_LOAD => self.load(frame.payload()),
            CMD_CLEAR => {
                self.recognizer.clear();
                self.group_mode = GROUP_MODE_NONE;
                self.queue(encode_plain(CMD_CLEAR, &[]));
            }
            CMD_GROUP => self.group(frame),
            other => {
                warn!("Vr3Sim[{}]: unknown command 0x{:02X}", self.config.name, other);
                self.reject(SIM_ERR_UNKNOWN_COMMAND);
            }
        }
    }

    fn trained_count(&self) -> u8 {
        self.records.iter().filter(|r| r.trained).count() as u8
    }

    fn train_status(&self, record: RecordId) -> u8 {
        match self.records.get(usize::from(record)) {
            Some(state) if state.trained => TRAIN_STA_TRAINED,
            Some(_) => TRAIN_STA_UNTRAINED,
            None => TRAIN_STA_OUT_OF_RANGE,
        }
    }

    fn check_system(&mut self) {
        let payload = [
            self.settings.baud_rate.code(),
            self.settings.io_mode.code(),
            self.settings.pulse_width,
            autoload_bitmap(self.settings.autoload.len()),
            u8::from(self.settings.group_control),
        ];
        self.queue(encode_extended(CMD_CHECK_SYSTEM, 0, &payload));
    }

    fn check_recognizer(&mut self) {
        let mut payload = Vec::with_capacity(11);
        payload.push(self.recognizer.len() as u8);
        for i in 0..RECOGNIZER_SLOTS {
            payload.push(self.recognizer.get(i).copied().unwrap_or(RECORD_NONE));
        }
        payload.push(self.recognizer.len() as u8);
        payload.push(autoload_bitmap(self.recognizer.len()));
        payload.push(self.group_mode);
        self.queue(encode_plain(CMD_CHECK_RECOGNIZER, &payload));
    }

    fn check_train(&mut self, records: &[RecordId]) {
        let trained = self.trained_count();
        if records == [RECORD_NONE] {
            let all: Vec<RecordId> = (0..RECORD_COUNT).map(|r| r as RecordId).collect();
            for chunk in all.chunks(RECORDS_PER_TRAIN_FRAME) {
                let pairs: Vec<u8> = chunk.iter().flat_map(|&r| [r, self.train_status(r)]).collect();
                self.queue(encode_extended(CMD_CHECK_TRAIN, trained, &pairs));
            }
            return;
        }
        if records.is_empty() {
            self.reject(SIM_ERR_BAD_ARGUMENT);
            return;
        }
        let pairs: Vec<u8> = records.iter().flat_map(|&r| [r, self.train_status(r)]).collect();
        self.queue(encode_extended(CMD_CHECK_TRAIN, trained, &pairs));
    }

    fn check_signature(&mut self, record: Option<RecordId>) {
        let Some(signature) = record.and_then(|r| self.signature(r)).map(<[u8]>::to_vec) else {
            self.reject(SIM_ERR_BAD_ARGUMENT);
            return;
        };
        let mut payload = vec![signature.len() as u8];
        payload.extend_from_slice(&signature);
        self.queue(encode_extended(CMD_CHECK_SIGNATURE, record.unwrap_or_default(), &payload));
    }

    fn set_baud_rate(&mut self, payload: &[u8]) {
        match payload.first().copied().and_then(BaudRate::from_code) {
            Some(rate) => {
                self.settings.baud_rate = rate;
                self.queue(encode_plain(CMD_SET_BAUD_RATE, &[]));
            }
            None => self.reject(SIM_ERR_BAD_ARGUMENT),
        }
    }

    fn set_io_mode(&mut self, payload: &[u8]) {
        match payload.first().copied().and_then(IoMode::from_code) {
            Some(mode) => {
                self.settings.io_mode = mode;
                self.queue(encode_plain(CMD_SET_IO_MODE, &[]));
            }
            None => self.reject(SIM_ERR_BAD_ARGUMENT),
        }
    }

    fn set_pulse_width(&mut self, payload: &[u8]) {
        match payload.first().copied() {
            Some(level) if level <= MAX_PULSE_WIDTH_LEVEL => {
                self.settings.pulse_width = level;
                self.queue(encode_plain(CMD_SET_PULSE_WIDTH, &[]));
            }
            _ => self.reject(SIM_ERR_BAD_ARGUMENT),
        }
    }

    fn set_autoload(&mut self, frame: &Frame) {
        let records = frame.extended_payload();
        if records.len() > RECOGNIZER_SLOTS {
            self.reject(SIM_ERR_BAD_ARGUMENT);
            return;
        }
        self.settings.autoload = records.to_vec();
        self.queue(encode_extended(
            CMD_SET_AUTOLOAD,
            frame.subcommand().unwrap_or_default(),
            &[],
        ));
    }

    fn prompt(&mut self, record: RecordId) {
        for text in TRAIN_PROMPTS {
            self.queue(encode_extended(CMD_PROMPT, record, text.as_bytes()));
        }
    }

    fn train(&mut self, records: &[RecordId]) {
        if records.is_empty() {
            self.reject(SIM_ERR_BAD_ARGUMENT);
            return;
        }
        let mut payload = vec![records.len() as u8];
        for &record in records {
            if usize::from(record) < RECORD_COUNT {
                self.prompt(record);
                self.records[usize::from(record)].trained = true;
                payload.extend_from_slice(&[record, TRAIN_STA_UNTRAINED]);
            } else {
                payload.extend_from_slice(&[record, TRAIN_STA_OUT_OF_RANGE]);
            }
        }
        debug!("Vr3Sim[{}]: trained {:?}", self.config.name, records);
        self.queue(encode_plain(CMD_TRAIN, &payload));
    }

    fn signature_train(&mut self, frame: &Frame) {
        let signature = frame.extended_payload().to_vec();
        let record = match frame.subcommand() {
            Some(r) if usize::from(r) < RECORD_COUNT && signature.len() <= MAX_SIGNATURE_LEN => r,
            _ => {
                self.reject(SIM_ERR_BAD_ARGUMENT);
                return;
            }
        };
        self.prompt(record);
        let state = &mut self.records[usize::from(record)];
        state.trained = true;
        state.signature = signature.clone();

        let mut payload = vec![1, record, TRAIN_STA_UNTRAINED];
        payload.extend_from_slice(&signature);
        self.queue(encode_plain(CMD_SIGNATURE_TRAIN, &payload));
    }

    fn set_signature(&mut self, frame: &Frame) {
        let signature = frame.extended_payload();
        let record = match frame.subcommand() {
            Some(r) if usize::from(r) < RECORD_COUNT && signature.len() <= MAX_SIGNATURE_LEN => r,
            _ => {
                self.reject(SIM_ERR_BAD_ARGUMENT);
                return;
            }
        };
        self.records[usize::from(record)].signature = signature.to_vec();
        self.queue(encode_extended(CMD_SET_SIGNATURE, record, &[]));
    }

    fn load_record(&mut self, record: RecordId) -> u8 {
        if usize::from(record) >= RECORD_COUNT {
            LOAD_STA_OUT_OF_RANGE
        } else if !self.records[usize::from(record)].trained {
            LOAD_STA_UNTRAINED
        } else if self.recognizer.contains(&record) {
            LOAD_STA_ALREADY_LOADED
        } else if self.recognizer.len() >= RECOGNIZER_SLOTS {
            LOAD_STA_RECOGNIZER_FULL
        } else {
            self.recognizer.push(record);
            LOAD_STA_LOADED
        }
    }

    fn load_report(&mut self, records: &[RecordId]) -> Vec<u8> {
        let mut loaded = 0u8;
        let mut pairs = Vec::with_capacity(records.len() * 2);
        for &record in records {
            let status = self.load_record(record);
            if status == LOAD_STA_LOADED {
                loaded += 1;
            }
            pairs.extend_from_slice(&[record, status]);
        }
        let mut payload = vec![loaded];
        payload.extend(pairs);
        payload
    }

    fn load(&mut self, records: &[RecordId]) {
        if records.is_empty() {
            self.reject(SIM_ERR_BAD_ARGUMENT);
            return;
        }
        let payload = self.load_report(records);
        self.queue(encode_plain(CMD_LOAD, &payload));
    }

    fn group(&mut self, frame: &Frame) {
        let args = frame.extended_payload();
        let Some(&first) = args.first() else {
            self.reject(SIM_ERR_BAD_ARGUMENT);
            return;
        };
        match frame.subcommand() {
            Some(GROUP_SET_CONTROL) => {
                match first {
                    GROUP_CONTROL_QUERY => {}
                    0 | 1 => self.settings.group_control = first == 1,
                    _ => return self.reject(SIM_ERR_BAD_ARGUMENT),
                }
                let ctrl = u8::from(self.settings.group_control);
                self.queue(encode_extended(CMD_GROUP, GROUP_SET_CONTROL, &[ctrl]));
            }
            Some(GROUP_SET_USER) => {
                let records = &args[1..];
                if first >= GROUP_COUNT || records.is_empty() || records.len() > RECOGNIZER_SLOTS {
                    return self.reject(SIM_ERR_BAD_ARGUMENT);
                }
                let mut slots = [RECORD_NONE; RECOGNIZER_SLOTS];
                slots[..records.len()].copy_from_slice(records);
                self.user_groups[usize::from(first)] = slots;
                self.queue(encode_extended(CMD_GROUP, GROUP_SET_USER, &[]));
            }
            Some(GROUP_LOAD_SYSTEM) if first < GROUP_COUNT => {
                let base = first * RECOGNIZER_SLOTS as u8;
                let records: Vec<RecordId> = (base..base + RECOGNIZER_SLOTS as u8).collect();
                self.recognizer.clear();
                let payload = self.load_report(&records);
                self.group_mode = first;
                self.queue(encode_extended(CMD_GROUP, GROUP_LOAD_SYSTEM, &payload));
            }
            Some(GROUP_LOAD_USER) if first < GROUP_COUNT => {
                let records: Vec<RecordId> = self.user_groups[usize::from(first)]
                    .iter()
                    .copied()
                    .filter(|&r| r != RECORD_NONE)
                    .collect();
                self.recognizer.clear();
                let payload = self.load_report(&records);
                self.group_mode = first | GROUP_MODE_USER_FLAG;
                self.queue(encode_extended(CMD_GROUP, GROUP_LOAD_USER, &payload));
            }
            Some(GROUP_CHECK_USER) if first < GROUP_COUNT => {
                let slots = self.user_groups[usize::from(first)];
                self.queue(encode_extended(CMD_GROUP, GROUP_CHECK_USER, &slots));
            }
            _ => self.reject(SIM_ERR_BAD_ARGUMENT),
        }
    }
}

impl Transport for SimulatedModule {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        match Frame::from_wire(data) {
            Ok(frame) => self.handle(&frame),
            Err(e) => {
                warn!("Vr3Sim[{}]: malformed frame: {}", self.config.name, e);
                self.commands_handled += 1;
                self.reject(SIM_ERR_MALFORMED);
            }
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], mode: ReadMode) -> Result<(), TransportError> {
        let wanted = buf.len();
        if self.outbound.len() >= wanted {
            for (slot, byte) in buf.iter_mut().zip(self.outbound.drain(..wanted)) {
                *slot = byte;
            }
            return Ok(());
        }
        if self.config.idle_wait {
            std::thread::sleep(match mode {
                ReadMode::Blocking(timeout) => timeout,
                ReadMode::Bounded => BOUNDED_WAIT,
            });
        }
        Err(TransportError::TimedOut)
    }
}
