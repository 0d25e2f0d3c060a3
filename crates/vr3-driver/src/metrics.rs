//! Counters kept by the command engine.
//!
//! Each counter is declared once as a [`CounterDef`] so its name, help text
//! and label keys stay together. Nothing is recorded unless the application
//! installs a `metrics` recorder.
//!
//! ```rust,ignore
//! vr3_driver::metrics::describe_metrics();
//! metrics::counter!(metric_defs::FRAMES_SENT.name, "command" => "load").increment(1);
//! ```

use metrics::{describe_counter, Unit};

/// Name, help text and label keys of one engine counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDef {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

impl CounterDef {
    const fn per_command(name: &'static str, help: &'static str) -> Self {
        CounterDef {
            name,
            help,
            labels: metric_defs::COMMAND_LABELS,
        }
    }

    /// Publish the help text to the installed recorder.
    pub fn describe(&self) {
        describe_counter!(self.name, Unit::Count, self.help);
    }
}

/// Every counter the engine records.
pub mod metric_defs {
    use super::CounterDef;

    /// Label keys shared by all engine counters.
    pub const COMMAND_LABELS: &[&str] = &["command"];

    pub const FRAMES_SENT: CounterDef =
        CounterDef::per_command("vr3.frames.sent", "Frames written to the module");

    pub const FRAMES_RECEIVED: CounterDef =
        CounterDef::per_command("vr3.frames.received", "Well-formed frames received from the module");

    /// Bad head, length or trailer, or a frame cut off part way. Plain
    /// timeouts are not counted.
    pub const FRAMES_REJECTED: CounterDef =
        CounterDef::per_command("vr3.frames.rejected", "Received frames rejected as malformed");

    pub const COMMANDS_FAILED: CounterDef =
        CounterDef::per_command("vr3.commands.failed", "Engine operations that returned an error");

    pub const ALL: [CounterDef; 4] = [FRAMES_SENT, FRAMES_RECEIVED, FRAMES_REJECTED, COMMANDS_FAILED];
}

/// Describe every engine counter. Call once after installing a recorder.
pub fn describe_metrics() {
    metric_defs::ALL.iter().for_each(CounterDef::describe);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_defs() {
        assert_eq!(metric_defs::FRAMES_SENT.name, "vr3.frames.sent");
        assert_eq!(metric_defs::COMMANDS_FAILED.labels, &["command"]);
        assert!(metric_defs::ALL.iter().all(|c| c.name.starts_with("vr3.") && !c.help.is_empty()));
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
