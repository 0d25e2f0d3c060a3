//! Simulated VR3 Module
//!
//! [`SimulatedModule`] implements [`vr3_protocol::Transport`] and answers
//! every command the way the hardware does: trained records, recognizer
//! slots, signatures, autoload and groups are all tracked, and responses
//! use the same frame shapes. Use it to exercise the command engine without
//! hardware.
//!
//! ```rust,ignore
//! use vr3_driver::VoiceRecognizer;
//! use vr3_sim::{SimConfig, SimulatedModule};
//!
//! let mut vr = VoiceRecognizer::new(SimulatedModule::new(SimConfig::default()));
//! vr.train_one(0, |prompt| println!("{}", prompt.text))?;
//! vr.load_one(0)?;
//! vr.transport_mut().speak(0);
//! assert!(vr.recognize()?.is_some());
//! ```

mod config;
mod module;

pub use config::{SimConfig, SimRecord};
pub use module::{SimulatedModule, SIM_ERR_BAD_ARGUMENT, SIM_ERR_MALFORMED, SIM_ERR_UNKNOWN_COMMAND, TRAIN_PROMPTS};
