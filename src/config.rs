//! Immutable simulator configuration.
//!
//! A [`SimConfig`] is built once at startup (defaults, optionally overlaid by
//! a TOML file) and moved into the [`Simulator`](crate::Simulator). Nothing
//! else in the crate holds paths or canned responses.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SimResult;

const DEFAULT_AUDIT_LOG: &str = "tools/fake_hpctrl/log";
const DEFAULT_PREAMBLE_PAYLOAD: &str = "tools/fake_hpctrl/pon.txt";
const DEFAULT_AVERAGED_PAYLOAD: &str = "tools/fake_hpctrl/poff.txt";
const DEFAULT_RAW_PAYLOAD: &str = "tools/fake_hpctrl/poff_1000.txt";

const DEFAULT_IDENTITY: &str = "HEWLETT-PACKARD,83480A,US35240110,07.12";
const DEFAULT_SAMPLE_DUMP: &str =
    "1776\n6441\n8921\n12026\n16171\n18826\n20363\n20797\n19499\n17190\n32256\n31744\n31232";
const DEFAULT_PREAMBLE: &str = "2,2,2000,50,5.000000E-12,2.2000000000E-08,0,1.32375E-06,\
1.33434E-03,0,2,1.00000E-08,2.2000000000E-08,8.00000E-02,0.0E+000,\"10 DEC 2021\",\
\"14:16:16:16\",\"83480A:US35240110\",\"83485A:US34430174\",2,100,2,1,2.00000E+10,0E+000";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Append-only trace of every raw input line.
    pub audit_log: PathBuf,
    pub payloads: PayloadFiles,
    pub responses: CannedResponses,
}

/// Canned captures copied out by the flush command, one per acquisition mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PayloadFiles {
    /// Preamble + data records.
    pub preamble: PathBuf,
    /// Averaged records without preamble.
    pub averaged: PathBuf,
    /// Non-averaged records without preamble.
    pub raw: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CannedResponses {
    pub identity: String,
    pub sample_dump: String,
    pub preamble: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
            payloads: PayloadFiles::default(),
            responses: CannedResponses::default(),
        }
    }
}

impl Default for PayloadFiles {
    fn default() -> Self {
        Self {
            preamble: PathBuf::from(DEFAULT_PREAMBLE_PAYLOAD),
            averaged: PathBuf::from(DEFAULT_AVERAGED_PAYLOAD),
            raw: PathBuf::from(DEFAULT_RAW_PAYLOAD),
        }
    }
}

impl Default for CannedResponses {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY.to_string(),
            sample_dump: DEFAULT_SAMPLE_DUMP.to_string(),
            preamble: DEFAULT_PREAMBLE.to_string(),
        }
    }
}

impl SimConfig {
    /// Parses a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(source: &str) -> SimResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
