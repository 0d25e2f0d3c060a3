//! Simulator configuration.

use serde::{Deserialize, Serialize};
use vr3_protocol::RecordId;

/// A record that is already trained when the simulated module powers on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimRecord {
    pub record: RecordId,
    #[serde(default)]
    pub signature: String,
}

/// Initial state of a [`SimulatedModule`](crate::SimulatedModule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Name used to tag log lines.
    pub name: String,
    /// Seed for random recognitions.
    pub seed: u64,
    /// Records trained at power-on.
    pub records: Vec<SimRecord>,
    /// Records loaded into the recognizer at power-on.
    pub autoload: Vec<RecordId>,
    /// Sleep for the read timeout when nothing is queued, like a real
    /// serial port. Off for tests.
    pub idle_wait: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            name: "vr3-sim".to_string(),
            seed: 0,
            records: Vec::new(),
            autoload: Vec::new(),
            idle_wait: false,
        }
    }
}
