//! VR3 Command Engine
//!
//! Typed, synchronous operations against an Elechouse VR3 module, built on
//! the framing in [`vr3_protocol`].
//!
//! - [`VoiceRecognizer`]: one request in flight, one bounded receive per
//!   request, response command byte checked against the request
//! - [`RecognitionSession`]: clear and load at startup, then poll for
//!   recognized voice commands
//! - [`Vr3Config`]: YAML configuration with firmware-compatible defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use vr3_driver::{RecognitionSession, VoiceRecognizer, Vr3Config};
//!
//! let config = Vr3Config::from_file("vr3.yaml")?;
//! let engine = VoiceRecognizer::with_config(transport, config.engine);
//! let mut session = RecognitionSession::new(engine, config.session);
//! session.start()?;
//! loop {
//!     if let Some(event) = session.poll()? {
//!         println!("{}", event);
//!     }
//! }
//! ```

mod clock;
mod config;
mod engine;
mod error;
pub mod metrics;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod query;
mod session;

#[cfg(test)]
mod engine_tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig, RecordLabel, SessionConfig, Vr3Config};
pub use engine::{SignatureInput, VoiceRecognizer};
pub use error::EngineError;
pub use query::{QueryState, TrainQuery};
pub use session::{RecognitionSession, VoiceEvent};
