// Overkiz API response types
//
// Models for the enduser API JSON. Fields use `#[serde(default)]`
// liberally because the API is inconsistent about field presence across
// gateway generations; everything unmodelled lands in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Device ───────────────────────────────────────────────────────────

/// A device from `GET setup/devices`.
///
/// Identity is the `deviceURL` (stable, immutable); the
/// `controllableName` doubles as the pub/sub routing key and the
/// command-addressing key downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "deviceURL")]
    pub device_url: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "controllableName", default)]
    pub controllable_name: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub enabled: bool,
    /// Numeric product type tag.
    #[serde(rename = "type", default)]
    pub product_type: Option<i64>,
    #[serde(default)]
    pub widget: Option<String>,
    #[serde(rename = "uiClass", default)]
    pub ui_class: Option<String>,
    /// Semi-static attributes (firmware level, capabilities, ...).
    #[serde(default)]
    pub attributes: Vec<StateEntry>,
    /// States as of the last gateway sync. Live values come from
    /// `get_state`, not from here.
    #[serde(default)]
    pub states: Vec<StateEntry>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Device {
    /// The transport protocol, taken from the `deviceURL` scheme
    /// (e.g. `io://1234-5678-9012/3` → `io`).
    pub fn protocol(&self) -> &str {
        self.device_url
            .split_once("://")
            .map_or("", |(scheme, _)| scheme)
    }
}

// ── State ────────────────────────────────────────────────────────────

/// One named state value. Values are scalar JSON:
/// boolean, number, string, or null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEntry {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

// ── Events ───────────────────────────────────────────────────────────

/// One event from `POST events/{listener}/fetch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(rename = "deviceURL", default, skip_serializing_if = "Option::is_none")]
    pub device_url: Option<String>,
    #[serde(rename = "execId", default, skip_serializing_if = "Option::is_none")]
    pub exec_id: Option<String>,
    #[serde(
        rename = "deviceStates",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub device_states: Vec<StateEntry>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// ── Wire envelopes ───────────────────────────────────────────────────

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
}

/// Response of `POST events/register`.
#[derive(Debug, Deserialize)]
pub struct ListenerRegistration {
    pub id: String,
}

/// Response of `POST exec/apply`.
#[derive(Debug, Deserialize)]
pub struct ExecutionStarted {
    #[serde(rename = "execId")]
    pub exec_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_tolerates_missing_fields() {
        let device: Device = serde_json::from_value(json!({
            "deviceURL": "io://1234-5678-9012/12345678",
            "label": "Boiler",
        }))
        .unwrap();

        assert_eq!(device.protocol(), "io");
        assert!(!device.available);
        assert!(device.states.is_empty());
        assert_eq!(device.controllable_name, "");
    }

    #[test]
    fn unknown_device_fields_land_in_extra() {
        let device: Device = serde_json::from_value(json!({
            "deviceURL": "zigbee://0000/1",
            "controllableName": "io:LightMicroModule",
            "placeOID": "abc-def",
        }))
        .unwrap();

        assert_eq!(device.protocol(), "zigbee");
        assert_eq!(device.extra["placeOID"], json!("abc-def"));
    }

    #[test]
    fn event_serialization_strips_absent_fields() {
        let event: Event = serde_json::from_value(json!({
            "name": "GatewayAliveEvent",
            "timestamp": 1000,
            "deviceURL": null,
        }))
        .unwrap();

        let round = serde_json::to_value(&event).unwrap();
        assert_eq!(round["name"], json!("GatewayAliveEvent"));
        assert_eq!(round["timestamp"], json!(1000));
        assert!(round.get("deviceURL").is_none());
        assert!(round.get("execId").is_none());
    }
}
