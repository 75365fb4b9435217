//! Session loop: reads newline-delimited records, keeps the audit trail and
//! writes responses until the simulator is told to exit.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, Write};
use std::path::Path;

use chrono::Local;
use log::info;

use crate::error::{SimError, SimResult};
use crate::{SessionState, Simulator};

/// Append-only record of every raw input line.
///
/// Each append is synced to disk before returning so the trail survives the
/// process being killed.
#[derive(Debug)]
pub struct AuditLog {
    file: File,
}

impl AuditLog {
    pub fn open(path: impl AsRef<Path>) -> SimResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self { file })
    }

    pub fn append(&mut self, bytes: &[u8]) -> SimResult<()> {
        self.file.write_all(bytes)?;
        self.file.sync_data()?;
        Ok(())
    }

    pub fn mark_start(&mut self) -> SimResult<()> {
        let marker = format!("started at {}\n", Local::now());
        self.append(marker.as_bytes())
    }

    pub fn mark_end(&mut self) -> SimResult<()> {
        self.append(b"\n")
    }
}

pub struct Session<R, W> {
    simulator: Simulator,
    input: R,
    output: W,
    audit: AuditLog,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(simulator: Simulator, input: R, output: W, audit: AuditLog) -> Self {
        Self {
            simulator,
            input,
            output,
            audit,
        }
    }

    /// Runs until `exit`. Any error ends the session at the failing line.
    pub fn run(&mut self) -> SimResult<()> {
        self.audit.mark_start()?;
        info!("session started");

        let mut record = Vec::new();
        while self.simulator.session_state() == SessionState::Running {
            record.clear();
            if self.input.read_until(b'\n', &mut record)? == 0 {
                return Err(SimError::UnexpectedEof);
            }
            self.audit.append(&record)?;
            // A record cut off by end of input is traced but never executed.
            if !record.ends_with(b"\n") {
                return Err(SimError::UnexpectedEof);
            }

            let line = String::from_utf8_lossy(&record);
            if let Some(response) = self.simulator.process_command(&line)? {
                writeln!(self.output, "{}", response)?;
                self.output.flush()?;
            }
        }

        self.audit.mark_end()?;
        info!("session ended by exit command");
        Ok(())
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn into_parts(self) -> (Simulator, R, W) {
        (self.simulator, self.input, self.output)
    }
}
