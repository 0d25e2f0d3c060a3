//! `vr3`: inspect, train and listen to a VR3 voice-recognition module.
//!
//! Talks to the module through a TCP serial bridge (`--connect host:port`)
//! or to a simulated module (`--simulate`).

mod link;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vr3_driver::metrics::describe_metrics;
use vr3_driver::{RecognitionSession, VoiceRecognizer, Vr3Config};
use vr3_protocol::{BaudRate, Group, IoMode, RecordId};
use vr3_sim::{SimConfig, SimulatedModule};

use crate::link::{Link, TcpLink};

type CliResult<T> = Result<T, Box<dyn Error>>;

// ============================================================================
// Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "vr3", version, about = "Talk to an Elechouse VR3 voice-recognition module")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Address of a TCP serial bridge (host:port)
    #[arg(long, global = true, conflicts_with = "simulate")]
    connect: Option<String>,

    /// Use the built-in simulated module
    #[arg(long, global = true)]
    simulate: bool,

    /// Response timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log more (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show module settings
    Settings,
    /// Change module settings
    Configure {
        /// Baud rate in bits per second
        #[arg(long)]
        baud: Option<u32>,
        #[arg(long, value_enum)]
        io_mode: Option<IoModeArg>,
        /// Output pulse width level, 0-15
        #[arg(long)]
        pulse_width: Option<u8>,
    },
    /// Restore factory settings
    Restore,
    /// Reset output pins (all of them if none are given)
    ResetIo { outputs: Vec<u8> },
    /// Show recognizer contents
    Recognizer,
    /// Load records into the recognizer
    Load {
        #[arg(required = true)]
        records: Vec<RecordId>,
    },
    /// Empty the recognizer
    Clear,
    /// Show training status (every record if none are given)
    TrainStatus { records: Vec<RecordId> },
    /// Train records
    Train {
        #[arg(required = true)]
        records: Vec<RecordId>,
        /// Attach a signature (single record only)
        #[arg(long)]
        signature: Option<String>,
    },
    /// Read or change record signatures
    Signature {
        #[command(subcommand)]
        action: SignatureAction,
    },
    /// Choose records loaded at power-on
    Autoload {
        #[command(subcommand)]
        action: AutoloadAction,
    },
    /// Group control and group loading
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },
    /// Clear, load the configured records, then print recognized commands
    /// until interrupted
    Listen {
        /// With --simulate, speak a random loaded record this often
        #[arg(long, default_value_t = 2000)]
        speak_every_ms: u64,
    },
}

#[derive(Subcommand, Debug)]
enum SignatureAction {
    Get { record: RecordId },
    Set { record: RecordId, text: String },
    Delete { record: RecordId },
}

#[derive(Subcommand, Debug)]
enum AutoloadAction {
    Set {
        #[arg(required = true)]
        records: Vec<RecordId>,
    },
    Disable,
}

#[derive(Subcommand, Debug)]
enum GroupAction {
    /// Show or change group control
    Control {
        #[arg(value_enum)]
        state: Option<Switch>,
    },
    /// Assign records to a user group
    Set {
        group: u8,
        #[arg(required = true)]
        records: Vec<RecordId>,
    },
    /// Show a user group
    Show { group: u8 },
    /// Load a system group into the recognizer
    LoadSystem { group: u8 },
    /// Load a user group into the recognizer
    LoadUser { group: u8 },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Switch {
    On,
    Off,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum IoModeArg {
    Pulse,
    Toggle,
    Set,
    Clear,
}

impl From<IoModeArg> for IoMode {
    fn from(arg: IoModeArg) -> Self {
        match arg {
            IoModeArg::Pulse => IoMode::Pulse,
            IoModeArg::Toggle => IoMode::Toggle,
            IoModeArg::Set => IoMode::Set,
            IoModeArg::Clear => IoMode::Clear,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// The configuration file: engine and session settings plus the link.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileConfig {
    #[serde(flatten)]
    vr3: Vr3Config,
    /// Default bridge address when `--connect` is not given.
    connect: Option<String>,
    simulator: SimConfig,
}

impl FileConfig {
    fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: FileConfig = if text.trim().is_empty() {
            FileConfig::default()
        } else {
            serde_yaml::from_str(&text)?
        };
        config.vr3.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn group(index: u8) -> CliResult<Group> {
    Group::new(index).ok_or_else(|| format!("group {} out of range 0-7", index).into())
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn run(cli: Cli) -> CliResult<()> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    if let Some(ms) = cli.timeout_ms {
        config.vr3.engine.response_timeout_ms = ms;
    }

    let link = if cli.simulate {
        config.simulator.idle_wait = true;
        Link::Simulated(Box::new(SimulatedModule::new(config.simulator.clone())))
    } else {
        let addr = cli
            .connect
            .clone()
            .or_else(|| config.connect.clone())
            .ok_or("no module: pass --connect host:port or --simulate")?;
        Link::Tcp(TcpLink::connect(&addr)?)
    };

    describe_metrics();
    let mut vr = VoiceRecognizer::with_config(link, config.vr3.engine.clone());
    let json = cli.json;

    match cli.command {
        Commands::Settings => {
            let settings = vr.check_system_settings()?;
            if json {
                return print_json(&settings);
            }
            let baud = settings
                .baud_rate
                .map(|b| b.bps().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("baud rate:     {}", baud);
            println!("io mode:       {:?}", settings.io_mode);
            println!("pulse width:   {}", settings.pulse_width);
            println!("autoload:      0x{:02X}", settings.autoload);
            println!("group control: {}", settings.group_control != 0);
        }
        Commands::Configure {
            baud,
            io_mode,
            pulse_width,
        } => {
            if let Some(bps) = baud {
                let rate = BaudRate::from_bps(bps).ok_or_else(|| format!("unsupported baud rate {}", bps))?;
                vr.set_baud_rate(rate)?;
            }
            if let Some(mode) = io_mode {
                vr.set_io_mode(mode.into())?;
            }
            if let Some(level) = pulse_width {
                vr.set_pulse_width(level)?;
            }
        }
        Commands::Restore => vr.restore_system_settings()?,
        Commands::ResetIo { outputs } => vr.reset_io(&outputs)?,
        Commands::Recognizer => {
            let state = vr.check_recognizer()?;
            if json {
                return print_json(&state);
            }
            println!("group: {}", state.group_mode);
            for (i, slot) in state.slots.iter().enumerate() {
                match slot {
                    Some(record) => println!("{}\t{}", i, record),
                    None => println!("{}\t-", i),
                }
            }
        }
        Commands::Load { records } => {
            let report = vr.load(&records)?;
            if json {
                return print_json(&report);
            }
            println!("loaded {}", report.loaded);
            for entry in &report.entries {
                println!("{}\t{:?}", entry.record, entry.status);
            }
        }
        Commands::Clear => vr.clear()?,
        Commands::TrainStatus { records } if records.is_empty() => {
            let table = vr.check_train_all()?;
            if json {
                return print_json(&table);
            }
            if !table.complete {
                println!("partial: {} records reported", table.records_seen);
            }
            println!("trained: {:?}", table.trained());
        }
        Commands::TrainStatus { records } => {
            let report = vr.check_train(&records)?;
            if json {
                return print_json(&report);
            }
            for entry in &report.entries {
                println!("{}\t{:?}", entry.record, entry.status);
            }
        }
        Commands::Train { records, signature } => {
            let on_prompt = |p: &vr3_protocol::Prompt| println!("[{}] {}", p.record, p.text);
            let report = match (signature, records.as_slice()) {
                (Some(text), [record]) => vr.train_with_signature(*record, text.as_str(), on_prompt)?,
                (Some(_), _) => return Err("--signature needs exactly one record".into()),
                (None, _) => vr.train(&records, on_prompt)?,
            };
            if json {
                return print_json(&report);
            }
            for entry in &report.entries {
                println!("{}\t{:?}", entry.record, entry.status);
            }
        }
        Commands::Signature { action } => match action {
            SignatureAction::Get { record } => {
                let signature = vr.check_signature(record)?;
                if json {
                    return print_json(&signature);
                }
                println!("{}", signature);
            }
            SignatureAction::Set { record, text } => vr.set_signature(record, text.as_str())?,
            SignatureAction::Delete { record } => vr.delete_signature(record)?,
        },
        Commands::Autoload { action } => match action {
            AutoloadAction::Set { records } => vr.set_autoload(&records)?,
            AutoloadAction::Disable => vr.disable_autoload()?,
        },
        Commands::Group { action } => match action {
            GroupAction::Control { state: None } => {
                let enabled = vr.check_group_control()?;
                if json {
                    return print_json(&enabled);
                }
                println!("group control: {}", if enabled { "on" } else { "off" });
            }
            GroupAction::Control { state: Some(state) } => {
                vr.set_group_control(matches!(state, Switch::On))?;
            }
            GroupAction::Set { group: g, records } => vr.set_user_group(group(g)?, &records)?,
            GroupAction::Show { group: g } => {
                let members = vr.check_user_group(group(g)?)?;
                if json {
                    return print_json(&members);
                }
                println!("user group {}: {:?}", g, members.records());
            }
            GroupAction::LoadSystem { group: g } => {
                let report = vr.load_system_group(group(g)?)?;
                if json {
                    return print_json(&report);
                }
                println!("loaded {}", report.loaded);
            }
            GroupAction::LoadUser { group: g } => {
                let report = vr.load_user_group(group(g)?)?;
                if json {
                    return print_json(&report);
                }
                println!("loaded {}", report.loaded);
            }
        },
        Commands::Listen { speak_every_ms } => {
            listen(vr, config, json, Duration::from_millis(speak_every_ms))?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ListenEvent<'a> {
    time: String,
    #[serde(flatten)]
    event: &'a vr3_driver::VoiceEvent,
}

fn listen(vr: VoiceRecognizer<Link>, config: FileConfig, json: bool, speak_every: Duration) -> CliResult<()> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    let mut session = RecognitionSession::new(vr, config.vr3.session);
    session.start()?;
    info!("listening for voice commands");

    let mut last_spoken = Instant::now();
    while running.load(Ordering::SeqCst) {
        if let Some(sim) = session.engine_mut().transport_mut().simulator_mut() {
            if last_spoken.elapsed() >= speak_every {
                sim.speak_random();
                last_spoken = Instant::now();
            }
        }
        let Some(event) = session.poll()? else {
            continue;
        };
        let time = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        if json {
            println!("{}", serde_json::to_string(&ListenEvent { time, event: &event })?);
        } else {
            println!("{}  {}", time, event);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_train_with_signature() {
        let cli = Cli::parse_from(["vr3", "--simulate", "train", "3", "--signature", "lamp"]);
        assert!(cli.simulate);
        assert!(matches!(
            cli.command,
            Commands::Train { ref records, signature: Some(ref s) } if records == &[3] && s == "lamp"
        ));
    }

    #[test]
    fn test_file_config_flattens_engine_and_session() {
        let yaml = r#"
connect: "localhost:4000"
engine:
  response_timeout_ms: 300
session:
  records:
    - { record: 0, label: "on" }
simulator:
  seed: 9
"#;
        let config: FileConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.connect.as_deref(), Some("localhost:4000"));
        assert_eq!(config.vr3.engine.response_timeout_ms, 300);
        assert_eq!(config.vr3.session.label_for(0), Some("on"));
        assert_eq!(config.simulator.seed, 9);
    }
}
