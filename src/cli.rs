//! Command-line interface definitions.
//!
//! This module defines the CLI structure for the `settings` tool using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{SettingsConfig, SyncMode};
use crate::error::{SettingsError, SettingsResult};
use crate::value::Value;

/// Inspect and edit a settings database.
#[derive(Parser, Debug)]
#[command(name = "settings")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the settings file.
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Namespace; the file is `<dir>/<name>.db`.
    #[arg(short, long, default_value = "settings")]
    pub name: String,

    /// Group to enter before running the command. Repeat to nest.
    #[arg(short, long = "group")]
    pub groups: Vec<String>,

    /// Sync every commit to disk instead of leaving it to the OS.
    #[arg(long)]
    pub durable: bool,

    /// Log store activity.
    #[arg(short, long)]
    pub verbose: bool,

    /// The command to execute.
    #[clap(subcommand)]
    pub command: SettingsCommand,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the value stored at a key.
    Get {
        /// The key to look up.
        key: String,
    },

    /// Store a value at a key.
    ///
    /// The value is stored as text unless `--json` is given.
    Set {
        /// The key to store the value under.
        key: String,
        /// The value to store.
        value: String,
        /// Parse the value as JSON (numbers, booleans, lists, objects).
        #[arg(long)]
        json: bool,
    },

    /// Remove a key and everything below it.
    Remove {
        /// The key to remove.
        key: String,
    },

    /// Check whether a key or group exists.
    Contains {
        /// The key to check.
        key: String,
    },

    /// List the keys and groups directly inside the current group.
    Keys,

    /// Show cache and store statistics after loading every key.
    Stats,
}

impl Cli {
    /// Settings configuration derived from the flags.
    pub fn config(&self) -> SettingsConfig {
        let mode = if self.durable {
            SyncMode::Full
        } else {
            SyncMode::Off
        };
        SettingsConfig::new().synchronous(mode).build()
    }
}

/// Turn a command-line argument into a value.
pub fn parse_value(raw: &str, json: bool) -> SettingsResult<Value> {
    if !json {
        return Ok(Value::from(raw));
    }
    Value::from_json(raw).map_err(|e| SettingsError::InvalidValue(format!("{}: {}", raw, e)))
}
