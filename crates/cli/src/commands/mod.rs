pub mod calculate;
pub mod config;
pub mod optimize;
pub mod recommend;

use std::fs;
use std::path::Path;

use anyhow::Context;
use priceflow_core::config::{EngineConfig, LoadOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_ENGINE: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    /// Successful command whose stdout is the serialized `payload` itself.
    pub fn payload<T: Serialize>(command: &str, payload: &T) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

pub fn load_config(command: &str, options: LoadOptions) -> Result<EngineConfig, CommandResult> {
    EngineConfig::load(options).map_err(|error| {
        CommandResult::failure(command, error.error_class(), error.to_string(), EXIT_CONFIG)
    })
}

/// Reads and parses a JSON input file. Failures map to the input exit code.
pub fn read_input<T: DeserializeOwned>(command: &str, path: &Path) -> Result<T, CommandResult> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read input file `{}`", path.display()))
        .map_err(|error| {
            CommandResult::failure(command, "input_read", format!("{error:#}"), EXIT_INPUT)
        })?;

    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse input file `{}`", path.display()))
        .map_err(|error| {
            CommandResult::failure(command, "input_parse", format!("{error:#}"), EXIT_INPUT)
        })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
