//! VR3 Voice Recognition Serial Protocol
//!
//! This crate provides types and utilities for talking to an Elechouse VR3
//! voice-recognition module over its serial link. The link is half-duplex:
//! the host sends one command frame and waits for the module's answer.
//!
//! # Protocol Overview
//!
//! Every message is a length-prefixed frame:
//!
//! ```text
//! | 0xAA | LEN | CMD | [SUBCMD] | payload... | 0x0A |
//! ```
//!
//! - **Commands** (host → module): [`Command`] variants, encoded with
//!   [`Command::encode`]
//! - **Responses** (module → host): carry the opcode of the command they
//!   answer; decoded by the typed decoders in this crate
//! - **Notifications** (module → host): voice recognized, training prompts
//!   and error frames ([`Notification`])
//!
//! # Example
//!
//! ```rust,ignore
//! use vr3_protocol::{Command, Framer, ReadMode, LoadReport, SystemClock};
//!
//! let clock = SystemClock::new();
//! let mut framer = Framer::new(transport);
//! framer.send_encoded(&Command::Load { records: vec![0, 1] }.encode()?)?;
//! let frame = framer.receive(ReadMode::Blocking(Duration::from_secs(1)), &clock)?;
//! let report = LoadReport::decode(frame.payload())?;
//! ```

mod clock;
mod commands;
mod constants;
mod error;
mod frame;
mod framer;
mod responses;
mod types;

pub use clock::*;
pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use framer::*;
pub use responses::*;
pub use types::*;
