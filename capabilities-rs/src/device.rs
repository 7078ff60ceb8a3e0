// capabilities-rs/src/device.rs
// Device command handling. Parsing is deliberately shallow: the pattern
// stage already guaranteed the imperative shape, this module extracts
// verb/target/state and hands the command to the controller seam.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use pattern_diagnostics::tokenize;
use shared_types::{CapabilityError, CapabilityModule, HandlerContext, HandlerOutput};

const STATE_WORDS: &[&str] = &[
    "on", "off", "up", "down", "open", "closed", "locked", "unlocked",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub verb: String,
    pub target: String,
    pub state: Option<String>,
    pub room: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAck {
    pub target: String,
    pub state: String,
    pub confirmation: String,
}

/// Seam to the actual home-automation transport.
#[async_trait]
pub trait DeviceController: Send + Sync {
    async fn execute(&self, command: &DeviceCommand) -> Result<DeviceAck, CapabilityError>;
}

/// Default controller: logs the command and acknowledges it. Stands in
/// until a real transport is wired up.
pub struct LoggingDeviceController;

#[async_trait]
impl DeviceController for LoggingDeviceController {
    async fn execute(&self, command: &DeviceCommand) -> Result<DeviceAck, CapabilityError> {
        info!(
            "device command: {} {} -> {:?} (room {:?})",
            command.verb, command.target, command.state, command.room
        );
        let state = command
            .state
            .clone()
            .unwrap_or_else(|| command.verb.clone());
        Ok(DeviceAck {
            target: command.target.clone(),
            state: state.clone(),
            confirmation: format!("Okay, {} is now {}.", command.target, state),
        })
    }
}

/// Parse an imperative device command out of normalized text.
pub fn parse_command(text: &str, room: Option<&str>) -> Option<DeviceCommand> {
    let tokens = tokenize(text);
    let mut iter = tokens.into_iter();
    let verb = iter.next()?;
    let rest: Vec<String> = iter.filter(|t| t != "the" && t != "a").collect();
    if rest.is_empty() {
        return None;
    }

    // "turn on the light" / "set the thermostat to 20"
    let (state, target_tokens): (Option<String>, Vec<String>) =
        if STATE_WORDS.contains(&rest[0].as_str()) {
            (Some(rest[0].clone()), rest[1..].to_vec())
        } else if let Some(pos) = rest.iter().position(|t| t == "to") {
            (
                Some(rest[pos + 1..].join(" ")),
                rest[..pos].to_vec(),
            )
        } else {
            (None, rest)
        };

    if target_tokens.is_empty() {
        return None;
    }
    Some(DeviceCommand {
        verb,
        target: target_tokens.join(" "),
        state,
        room: room.map(str::to_string),
    })
}

/// The ACTION capability module.
pub struct DeviceCommandExecutor {
    controller: Arc<dyn DeviceController>,
}

impl DeviceCommandExecutor {
    pub fn new(controller: Arc<dyn DeviceController>) -> Self {
        DeviceCommandExecutor { controller }
    }
}

impl Default for DeviceCommandExecutor {
    fn default() -> Self {
        DeviceCommandExecutor::new(Arc::new(LoggingDeviceController))
    }
}

#[async_trait]
impl CapabilityModule for DeviceCommandExecutor {
    fn name(&self) -> &str {
        "device_commands"
    }

    async fn handle_input(
        &self,
        text: &str,
        context: &HandlerContext,
    ) -> Result<HandlerOutput, CapabilityError> {
        let command = parse_command(text, context.room.as_deref()).ok_or_else(|| {
            CapabilityError::InvalidInput(format!("could not parse a device command from {text:?}"))
        })?;
        let ack = self.controller.execute(&command).await?;
        Ok(HandlerOutput {
            response: ack.confirmation.clone(),
            action: Some(serde_json::json!({
                "kind": "device_action",
                "verb": command.verb,
                "target": ack.target,
                "state": ack.state,
                "room": command.room,
            })),
            memories: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingController(Mutex<Vec<DeviceCommand>>);

    #[async_trait]
    impl DeviceController for RecordingController {
        async fn execute(&self, command: &DeviceCommand) -> Result<DeviceAck, CapabilityError> {
            self.0.lock().unwrap().push(command.clone());
            Ok(DeviceAck {
                target: command.target.clone(),
                state: command.state.clone().unwrap_or_default(),
                confirmation: "done".to_string(),
            })
        }
    }

    struct FailingController;

    #[async_trait]
    impl DeviceController for FailingController {
        async fn execute(&self, _command: &DeviceCommand) -> Result<DeviceAck, CapabilityError> {
            Err(CapabilityError::Unavailable("bridge offline".to_string()))
        }
    }

    #[test]
    fn parses_power_command() {
        let cmd = parse_command("turn on the kitchen light", Some("kitchen")).unwrap();
        assert_eq!(cmd.verb, "turn");
        assert_eq!(cmd.state.as_deref(), Some("on"));
        assert_eq!(cmd.target, "kitchen light");
        assert_eq!(cmd.room.as_deref(), Some("kitchen"));
    }

    #[test]
    fn parses_set_command_with_value() {
        let cmd = parse_command("set the thermostat to 20 degrees", None).unwrap();
        assert_eq!(cmd.verb, "set");
        assert_eq!(cmd.target, "thermostat");
        assert_eq!(cmd.state.as_deref(), Some("20 degrees"));
    }

    #[test]
    fn verb_only_input_does_not_parse() {
        assert!(parse_command("turn", None).is_none());
        assert!(parse_command("", None).is_none());
    }

    #[tokio::test]
    async fn executor_forwards_to_controller_and_reports_action() {
        let controller = Arc::new(RecordingController(Mutex::new(Vec::new())));
        let executor = DeviceCommandExecutor::new(controller.clone());
        let out = executor
            .handle_input("turn off the porch light", &HandlerContext::default())
            .await
            .unwrap();
        assert_eq!(controller.0.lock().unwrap().len(), 1);
        let action = out.action.expect("device action payload");
        assert_eq!(action["state"], "off");
        assert_eq!(action["target"], "porch light");
    }

    #[tokio::test]
    async fn controller_failure_propagates() {
        let executor = DeviceCommandExecutor::new(Arc::new(FailingController));
        let err = executor
            .handle_input("turn off the light", &HandlerContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Unavailable(_)));
    }
}
