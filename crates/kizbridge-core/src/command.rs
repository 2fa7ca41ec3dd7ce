// ── Inbound command handling ──
//
// Commands arrive as JSON on the commands topic:
// `{ "device": "<controllable name>", "command": "<name>", "params": [...] }`.
// They land in a single-slot last-write-wins cell written by the bus
// delivery task and drained once per sub-tick by the sync loop. Only the
// most recent command matters; there is no queue.

use std::sync::{Arc, Mutex, PoisonError};

use overkiz_api::OverkizClient;
use serde_json::Value;
use tracing::debug;

use crate::error::CoreError;

/// Label attached to every execution we start, so the vendor's
/// execution history shows who asked.
pub const CALLER_TAG: &str = "kizbridge";

/// One decoded inbound command.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    /// Target device, addressed by controllable name.
    pub device: String,
    pub command: String,
    pub params: Vec<Value>,
}

impl PendingCommand {
    /// Decode a commands-topic payload.
    ///
    /// `device` and `command` must be present non-empty strings; `params`
    /// is optional but must be a list when present. Anything else is
    /// malformed and gets logged and ignored by the caller.
    pub fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|e| CoreError::MalformedCommand {
                reason: format!("invalid JSON: {e}"),
            })?;
        let obj = value.as_object().ok_or_else(|| CoreError::MalformedCommand {
            reason: "payload is not a JSON object".into(),
        })?;

        let device = obj
            .get("device")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::MalformedCommand {
                reason: "missing target device".into(),
            })?;
        let command = obj
            .get("command")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::MalformedCommand {
                reason: "missing command name".into(),
            })?;
        let params = match obj.get("params") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(CoreError::MalformedCommand {
                    reason: "params must be a list".into(),
                });
            }
        };

        Ok(Self {
            device: device.to_owned(),
            command: command.to_owned(),
            params,
        })
    }
}

/// Single-slot exchange between the bus delivery task and the sync loop.
///
/// `put` overwrites whatever is pending (last-write-wins); `take` clears
/// the slot regardless of how the subsequent dispatch turns out.
#[derive(Clone, Default)]
pub struct CommandSlot {
    inner: Arc<Mutex<Option<PendingCommand>>>,
}

impl CommandSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, command: PendingCommand) {
        *self.lock() = Some(command);
    }

    pub fn take(&self) -> Option<PendingCommand> {
        self.lock().take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PendingCommand>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Execute a command against a resolved device address.
///
/// Null parameters are filtered out before the call. The caller decides
/// the failure policy: rate limiting is a hard stop, everything else is
/// logged and swallowed.
pub async fn dispatch(
    client: &OverkizClient,
    address: &str,
    command: &PendingCommand,
) -> Result<(), overkiz_api::Error> {
    let params: Vec<Value> = command
        .params
        .iter()
        .filter(|p| !p.is_null())
        .cloned()
        .collect();

    let exec_id = client
        .execute_command(address, &command.command, &params, CALLER_TAG)
        .await?;
    debug!(
        exec_id,
        device = %command.device,
        command = %command.command,
        "command dispatched"
    );
    Ok(())
}
