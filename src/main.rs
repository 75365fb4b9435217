use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hp_sim::{AuditLog, Session, SimConfig, SimError, SimResult, Simulator};
use log::error;

/// Stand-in for `hpctrl` that answers from simulated state and canned data.
#[derive(Parser, Debug)]
#[command(name = "fake_hpctrl")]
#[command(version)]
struct Args {
    /// Interactive mode; the simulator refuses to start without it
    #[arg(short = 'i', long)]
    interactive: bool,

    /// TOML file overriding paths and canned responses
    #[arg(long)]
    config: Option<PathBuf>,

    /// Audit log path (overrides the configured one)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Serve commands on this serial port instead of stdin/stdout
    #[cfg(feature = "serial")]
    #[arg(long)]
    serial: Option<String>,

    /// Baud rate for --serial
    #[cfg(feature = "serial")]
    #[arg(long, default_value_t = 9600)]
    baud: u32,
}

// The main entry point for the command-line simulator application.
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> SimResult<()> {
    if !args.interactive {
        return Err(SimError::NotInteractive);
    }

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(log) = args.log {
        config.audit_log = log;
    }

    let audit = AuditLog::open(&config.audit_log)?;
    let simulator = Simulator::new(config)?;

    #[cfg(feature = "serial")]
    if let Some(port_name) = &args.serial {
        let (input, output) = hp_sim::serial::open(port_name, args.baud)?;
        return Session::new(simulator, input, output, audit).run();
    }

    Session::new(simulator, io::stdin().lock(), io::stdout().lock(), audit).run()
}
