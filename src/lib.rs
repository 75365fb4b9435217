//! # HP 83480A Control Simulator Library
//!
//! This library contains the core logic for simulating the `hpctrl` command
//! channel of an HP 83480A digital communications analyzer. It keeps the
//! simulated acquisition state and processes text commands against it,
//! returning responses in the same format as the real instrument.

pub mod config;
pub mod dispatch;
pub mod error;
#[cfg(feature = "serial")]
pub mod serial;
pub mod session;

use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

pub use config::SimConfig;
pub use dispatch::{Command, Dispatcher, ExactCommand, NormalizedLine};
pub use error::{SimError, SimResult};
pub use session::{AuditLog, Session};

/// Channels enabled on a freshly started instrument.
const DEFAULT_CHANNELS: [u8; 2] = [1, 3];

// Simulated acquisition settings of the instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentState {
    pub acquire_points: u64,
    pub acquire_count: u64,
    pub averaging: bool,
    // Off means the capture holds raw samples only.
    pub preamble: bool,
    pub enabled_channels: BTreeSet<u8>,
    // Set by `file <path>`; required before a flush.
    pub measurement_target: Option<PathBuf>,
}

impl Default for InstrumentState {
    fn default() -> Self {
        Self {
            acquire_points: 100,
            acquire_count: 200,
            averaging: true,
            preamble: false,
            enabled_channels: DEFAULT_CHANNELS.into_iter().collect(),
            measurement_target: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Terminated,
}

// The main struct that holds the state of the simulated instrument.
#[derive(Debug)]
pub struct Simulator {
    pub state: InstrumentState,
    config: SimConfig,
    dispatcher: Dispatcher,
    session: SessionState,
}

impl Simulator {
    /// Creates a new `Simulator` in its power-on state.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        Ok(Self {
            state: InstrumentState::default(),
            config,
            dispatcher: Dispatcher::new()?,
            session: SessionState::Running,
        })
    }

    pub fn session_state(&self) -> SessionState {
        self.session
    }

    /// Processes one input line and returns the response text, if the
    /// command produces one.
    ///
    /// Unknown commands are ignored and yield `Ok(None)` like set commands
    /// do. Any error is fatal for the session.
    pub fn process_command(&mut self, line: &str) -> SimResult<Option<String>> {
        let line = NormalizedLine::new(line);
        match self.dispatcher.recognize(&line)? {
            Some(command) => {
                debug!("command {:?}", command);
                self.execute_command(command)
            }
            None => {
                debug!("ignoring unknown command '{}'", line.raw);
                Ok(None)
            }
        }
    }

    /// Executes a recognized command and returns the response string.
    fn execute_command(&mut self, command: Command) -> SimResult<Option<String>> {
        let response = match command {
            Command::Exact(exact) => return self.execute_exact(exact),
            Command::SetAcquirePoints(points) => {
                self.state.acquire_points = points;
                None
            }
            Command::SetAcquireCount(count) => {
                self.state.acquire_count = count;
                None
            }
            Command::CaptureFile(path) => {
                self.state.measurement_target = (!path.is_empty()).then(|| PathBuf::from(path));
                None
            }
            Command::QueryChannelDisplay(channel) => {
                Some(flag(self.state.enabled_channels.contains(&channel)))
            }
        };
        Ok(response)
    }

    fn execute_exact(&mut self, command: ExactCommand) -> SimResult<Option<String>> {
        let responses = &self.config.responses;
        let response = match command {
            ExactCommand::Exit => {
                self.session = SessionState::Terminated;
                None
            }
            ExactCommand::Identify => Some(responses.identity.clone()),
            ExactCommand::SampleDump => Some(responses.sample_dump.clone()),
            ExactCommand::QueryPreamble => Some(responses.preamble.clone()),
            ExactCommand::PreambleOn => {
                self.state.preamble = true;
                None
            }
            ExactCommand::PreambleOff => {
                self.state.preamble = false;
                None
            }
            ExactCommand::QueryAcquirePoints => Some(self.state.acquire_points.to_string()),
            ExactCommand::QueryAcquireCount => Some(self.state.acquire_count.to_string()),
            ExactCommand::QueryAverage => Some(flag(self.state.averaging)),
            ExactCommand::AverageOn => {
                self.state.averaging = true;
                None
            }
            ExactCommand::AverageOff => {
                self.state.averaging = false;
                None
            }
            ExactCommand::StopContinuousRead => {
                self.flush_capture()?;
                None
            }
        };
        Ok(response)
    }

    /// Canned payload matching the current acquisition mode.
    pub fn capture_payload(&self) -> &Path {
        let payloads = &self.config.payloads;
        if self.state.preamble {
            &payloads.preamble
        } else if self.state.averaging {
            &payloads.averaged
        } else {
            &payloads.raw
        }
    }

    /// Copies the mode's canned payload over the measurement target.
    fn flush_capture(&self) -> SimResult<()> {
        let target = self
            .state
            .measurement_target
            .as_deref()
            .ok_or(SimError::NoCaptureTarget)?;
        let source = self.capture_payload();
        debug!("flushing {} to {}", source.display(), target.display());

        // Open the payload first so a missing payload leaves no target behind.
        let mut payload = File::open(source)?;
        let mut capture = File::create(target)?;
        io::copy(&mut payload, &mut capture)?;
        capture.sync_all()?;
        Ok(())
    }
}

fn flag(value: bool) -> String {
    String::from(if value { "1" } else { "0" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PREAMBLE_PAYLOAD: &str = "preamble,record\n0 1 2 3\n";
    const AVERAGED_PAYLOAD: &str = "0 10 20 30\n";
    const RAW_PAYLOAD: &str = "0 11 21 31\n5 12 22 32\n";

    // Simulator whose payload files live in a scratch directory.
    fn simulator_with_payloads() -> (Simulator, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SimConfig::default();
        config.audit_log = dir.path().join("log");
        config.payloads.preamble = dir.path().join("pon.txt");
        config.payloads.averaged = dir.path().join("poff.txt");
        config.payloads.raw = dir.path().join("poff_1000.txt");
        fs::write(&config.payloads.preamble, PREAMBLE_PAYLOAD).unwrap();
        fs::write(&config.payloads.averaged, AVERAGED_PAYLOAD).unwrap();
        fs::write(&config.payloads.raw, RAW_PAYLOAD).unwrap();
        (Simulator::new(config).unwrap(), dir)
    }

    fn run(sim: &mut Simulator, line: &str) -> Option<String> {
        sim.process_command(line).unwrap()
    }

    // --- Power-on state ---

    #[test]
    fn simulator_creation() {
        let sim = Simulator::new(SimConfig::default()).unwrap();
        assert_eq!(sim.state.acquire_points, 100);
        assert_eq!(sim.state.acquire_count, 200);
        assert!(sim.state.averaging);
        assert!(!sim.state.preamble);
        assert_eq!(sim.state.enabled_channels, BTreeSet::from([1, 3]));
        assert_eq!(sim.state.measurement_target, None);
        assert_eq!(sim.session_state(), SessionState::Running);
    }

    // --- Canned responses ---

    #[test]
    fn identity_query_in_any_case() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        let expected = Some(String::from("HEWLETT-PACKARD,83480A,US35240110,07.12"));
        assert_eq!(run(&mut sim, "q *idn?"), expected);
        assert_eq!(run(&mut sim, "Q *IDN?\n"), expected);
        assert_eq!(sim.state, InstrumentState::default());
    }

    #[test]
    fn sample_dump_and_preamble_are_canned() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        let dump = run(&mut sim, "16").unwrap();
        assert!(dump.starts_with("1776\n6441\n"));
        assert!(dump.ends_with("31232"));
        let preamble = run(&mut sim, "q :waveform:preamble?").unwrap();
        assert!(preamble.starts_with("2,2,2000,50,"));
    }

    #[test]
    fn canned_responses_follow_config() {
        let mut config = SimConfig::default();
        config.responses.identity = String::from("ACME,SCOPE,0,1.0");
        let mut sim = Simulator::new(config).unwrap();
        assert_eq!(run(&mut sim, "q *idn?"), Some(String::from("ACME,SCOPE,0,1.0")));
    }

    // --- State mutators and queries ---

    #[test]
    fn set_then_query_acquire_points_and_count() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        assert_eq!(run(&mut sim, "s :acquire:points 55"), None);
        assert_eq!(run(&mut sim, "q :acquire:points?"), Some(String::from("55")));
        assert_eq!(run(&mut sim, "s :acquire:count 55"), None);
        assert_eq!(run(&mut sim, "q :acquire:count?"), Some(String::from("55")));
    }

    #[test]
    fn averaging_toggle_and_repeated_query() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        run(&mut sim, "s :acquire:average off");
        assert_eq!(run(&mut sim, "q :acquire:average?"), Some(String::from("0")));
        assert_eq!(run(&mut sim, "q :acquire:average?"), Some(String::from("0")));
        run(&mut sim, "s :acquire:average on");
        assert_eq!(run(&mut sim, "q :acquire:average?"), Some(String::from("1")));
        assert_eq!(run(&mut sim, "q :acquire:average?"), Some(String::from("1")));
    }

    #[test]
    fn preamble_toggle_is_silent() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        assert_eq!(run(&mut sim, "PON"), None);
        assert!(sim.state.preamble);
        assert_eq!(run(&mut sim, "poff"), None);
        assert!(!sim.state.preamble);
    }

    #[test]
    fn channel_display_reports_membership() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        assert_eq!(run(&mut sim, "q :channel1:display?"), Some(String::from("1")));
        assert_eq!(run(&mut sim, "q :channel2:display?"), Some(String::from("0")));
        assert_eq!(run(&mut sim, "Q :CHANNEL3:DISPLAY?"), Some(String::from("1")));
        assert_eq!(run(&mut sim, "q :channel4:display?"), Some(String::from("0")));
    }

    #[test]
    fn channel_query_with_surrounding_text() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        assert_eq!(run(&mut sim, "q :channel1:display?;"), Some(String::from("1")));
        assert_eq!(run(&mut sim, ":q :channel3:display?"), Some(String::from("1")));
        assert_eq!(run(&mut sim, "1 q :channel2:display?"), Some(String::from("1")));
        assert_eq!(run(&mut sim, "4 q :channel1:display?"), Some(String::from("0")));
    }

    #[test]
    fn set_with_extra_whitespace_then_query() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        assert_eq!(run(&mut sim, "s  :acquire:points   9"), None);
        assert_eq!(run(&mut sim, "q :acquire:points?"), Some(String::from("9")));
    }

    #[test]
    fn unknown_command_changes_nothing() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        assert_eq!(run(&mut sim, "foo bar"), None);
        assert_eq!(sim.state, InstrumentState::default());
        assert_eq!(sim.session_state(), SessionState::Running);
        assert_eq!(run(&mut sim, "q :acquire:count?"), Some(String::from("200")));
    }

    #[test]
    fn bad_numeric_argument_keeps_previous_value() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        let err = sim.process_command("s :acquire:points lots").unwrap_err();
        assert!(matches!(err, SimError::InvalidArgument { .. }));
        assert_eq!(sim.state.acquire_points, 100);
    }

    #[test]
    fn exit_terminates_session() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        assert_eq!(run(&mut sim, "EXIT"), None);
        assert_eq!(sim.session_state(), SessionState::Terminated);
    }

    #[test]
    fn file_command_sets_and_clears_target() {
        let mut sim = Simulator::new(SimConfig::default()).unwrap();
        run(&mut sim, "file /tmp/Out.dat");
        assert_eq!(sim.state.measurement_target, Some(PathBuf::from("/tmp/Out.dat")));
        run(&mut sim, "file   ");
        assert_eq!(sim.state.measurement_target, None);
    }

    // --- Capture flush ---

    #[test]
    fn payload_selection_follows_mode() {
        let (mut sim, dir) = simulator_with_payloads();
        assert_eq!(sim.capture_payload(), dir.path().join("poff.txt"));
        run(&mut sim, "s :acquire:average off");
        assert_eq!(sim.capture_payload(), dir.path().join("poff_1000.txt"));
        run(&mut sim, "pon");
        assert_eq!(sim.capture_payload(), dir.path().join("pon.txt"));
        run(&mut sim, "s :acquire:average on");
        assert_eq!(sim.capture_payload(), dir.path().join("pon.txt"));
    }

    #[test]
    fn flush_copies_averaged_payload_by_default() {
        let (mut sim, dir) = simulator_with_payloads();
        let target = dir.path().join("out.dat");
        run(&mut sim, &format!("file {}", target.display()));
        assert_eq!(run(&mut sim, "?"), None);
        assert_eq!(fs::read_to_string(&target).unwrap(), AVERAGED_PAYLOAD);
    }

    #[test]
    fn flush_overwrites_with_current_mode() {
        let (mut sim, dir) = simulator_with_payloads();
        let target = dir.path().join("out.dat");
        run(&mut sim, &format!("file {}", target.display()));
        run(&mut sim, "?");
        run(&mut sim, "pon");
        run(&mut sim, "?");
        assert_eq!(fs::read_to_string(&target).unwrap(), PREAMBLE_PAYLOAD);
        run(&mut sim, "poff");
        run(&mut sim, "s :acquire:average off");
        run(&mut sim, "?");
        assert_eq!(fs::read_to_string(&target).unwrap(), RAW_PAYLOAD);
    }

    #[test]
    fn flush_without_target_is_fatal() {
        let (mut sim, _dir) = simulator_with_payloads();
        let err = sim.process_command("?").unwrap_err();
        assert!(matches!(err, SimError::NoCaptureTarget));
    }

    #[test]
    fn flush_with_missing_payload_creates_no_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SimConfig::default();
        config.payloads.averaged = dir.path().join("absent.txt");
        let mut sim = Simulator::new(config).unwrap();
        let target = dir.path().join("out.dat");
        run(&mut sim, &format!("file {}", target.display()));
        assert!(matches!(sim.process_command("?"), Err(SimError::Io(_))));
        assert!(!target.exists());
    }
}
