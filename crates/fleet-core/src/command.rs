use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Start,
    Stop,
    Stdin,
}

/// A single command delivered over a `command` routing key.
///
/// `args` is interpreted per `command_type`: `Start` takes exactly one arg
/// (a `GameServerConfigId`), `Stop` takes zero (whole worker) or one
/// (a single server), `Stdin` takes one or more (target id, then the
/// literal line to write).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command_type: CommandType,
    pub args: Vec<String>,
}

impl Command {
    pub fn start(config_id: impl ToString) -> Self {
        Self {
            command_type: CommandType::Start,
            args: vec![config_id.to_string()],
        }
    }

    pub fn stop_all() -> Self {
        Self {
            command_type: CommandType::Stop,
            args: Vec::new(),
        }
    }

    pub fn stop(config_id: impl ToString) -> Self {
        Self {
            command_type: CommandType::Stop,
            args: vec![config_id.to_string()],
        }
    }

    pub fn stdin(config_id: impl ToString, line: impl ToString) -> Self {
        Self {
            command_type: CommandType::Stdin,
            args: vec![config_id.to_string(), line.to_string()],
        }
    }
}
