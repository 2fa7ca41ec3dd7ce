//! Daemon configuration: one nested TOML file plus environment overrides,
//! translated into the core's `SyncConfig` / `MqttSettings` at the edge.
//!
//! Core never sees these types -- it receives pre-built settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;

use kizbridge_core::{MaintenanceCommand, MqttSettings, SyncConfig};
use overkiz_api::Server;

use crate::error::CliError;

// ── TOML config structs ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Config {
    pub overkiz: OverkizSection,

    #[serde(default)]
    pub mqtt: MqttSection,
}

#[derive(Debug, Deserialize)]
pub struct OverkizSection {
    /// Cloud account user id (an email address).
    pub username: String,

    /// Cloud account password (plaintext -- prefer the
    /// KIZBRIDGE_OVERKIZ__PASSWORD environment variable).
    pub password: String,

    /// Cloud endpoint, e.g. "somfy_europe" or "atlantic_cozytouch".
    pub server: Server,

    /// Device to nudge once per major cycle, by controllable name.
    pub device_name: Option<String>,

    /// Command to send to `device_name`.
    pub device_command: Option<String>,

    #[serde(default)]
    pub device_command_params: Vec<Value>,

    /// Major cycle interval in seconds.
    #[serde(default = "default_sleep")]
    pub sleep: u64,
}

#[derive(Debug, Deserialize)]
pub struct MqttSection {
    #[serde(default = "default_broker")]
    pub broker: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: Option<String>,

    /// Broker password (plaintext -- prefer the
    /// KIZBRIDGE_MQTT__PASSWORD environment variable).
    pub password: Option<String>,

    /// Base of every published topic.
    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            broker: default_broker(),
            port: default_port(),
            username: None,
            password: None,
            topic: default_topic(),
            client_id: default_client_id(),
        }
    }
}

fn default_sleep() -> u64 {
    60
}
fn default_broker() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    1883
}
fn default_topic() -> String {
    "overkiz".into()
}
fn default_client_id() -> String {
    "kizbridge".into()
}

// ── Config file path ─────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "kizbridge", "kizbridge").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("kizbridge");
    p
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the config from `path` (or the canonical location) plus
/// `KIZBRIDGE_`-prefixed environment variables (`__` separates levels,
/// e.g. `KIZBRIDGE_OVERKIZ__PASSWORD`).
pub fn load(path: Option<&Path>) -> Result<Config, CliError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if !path.exists() {
        return Err(CliError::NoConfig {
            path: path.display().to_string(),
        });
    }

    let figment = Figment::new()
        .merge(Toml::file(&path))
        .merge(Env::prefixed("KIZBRIDGE_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

impl Config {
    fn validate(&self) -> Result<(), CliError> {
        if self.overkiz.device_name.is_some() != self.overkiz.device_command.is_some() {
            return Err(CliError::Validation {
                field: "overkiz.device_name".into(),
                reason: "device_name and device_command must be set together".into(),
            });
        }
        if self.overkiz.sleep == 0 {
            return Err(CliError::Validation {
                field: "overkiz.sleep".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        Ok(())
    }

    /// Translate into the core sync settings.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            topic_base: self.mqtt.topic.clone(),
            poll_interval: Duration::from_secs(self.overkiz.sleep),
            maintenance: self.maintenance_command(),
            ..SyncConfig::default()
        }
    }

    fn maintenance_command(&self) -> Option<MaintenanceCommand> {
        match (&self.overkiz.device_name, &self.overkiz.device_command) {
            (Some(device), Some(command)) => Some(MaintenanceCommand {
                device: device.clone(),
                command: command.clone(),
                params: self.overkiz.device_command_params.clone(),
            }),
            _ => None,
        }
    }

    /// Translate into the core broker settings.
    pub fn mqtt_settings(&self) -> MqttSettings {
        MqttSettings {
            host: self.mqtt.broker.clone(),
            port: self.mqtt.port,
            username: self.mqtt.username.clone(),
            password: self
                .mqtt
                .password
                .as_ref()
                .map(|pw| SecretString::from(pw.clone())),
            client_id: self.mqtt.client_id.clone(),
        }
    }

    /// Cloud account password as a secret.
    pub fn overkiz_password(&self) -> SecretString {
        SecretString::from(self.overkiz.password.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let file = write_config(
            r#"
            [overkiz]
            username = "me@example.com"
            password = "very secret"
            server = "somfy_europe"
            "#,
        );

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.overkiz.server, Server::SomfyEurope);
        assert_eq!(config.overkiz.sleep, 60);
        assert_eq!(config.mqtt.broker, "127.0.0.1");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.topic, "overkiz");
        assert!(config.maintenance_command().is_none());

        let sync = config.sync_config();
        assert_eq!(sync.poll_interval, Duration::from_secs(60));
        assert_eq!(sync.topic_base, "overkiz");
    }

    #[test]
    fn full_config_round_trips_into_core_settings() {
        let file = write_config(
            r#"
            [overkiz]
            username = "me@example.com"
            password = "very secret"
            server = "atlantic_cozytouch"
            device_name = "io:AtlanticDomesticHotWaterProductionV2"
            device_command = "refreshMiddleWaterTemperature"
            sleep = 120

            [mqtt]
            broker = "broker.lan"
            port = 8883
            username = "mqtt-user"
            password = "mqtt-pass"
            topic = "home/overkiz"
            client_id = "bridge-1"
            "#,
        );

        let config = load(Some(file.path())).unwrap();
        let sync = config.sync_config();
        assert_eq!(sync.poll_interval, Duration::from_secs(120));
        assert_eq!(sync.commands_topic(), "home/overkiz/commands");

        let maintenance = config.maintenance_command().unwrap();
        assert_eq!(
            maintenance.device,
            "io:AtlanticDomesticHotWaterProductionV2"
        );
        assert_eq!(maintenance.command, "refreshMiddleWaterTemperature");
        assert!(maintenance.params.is_empty());

        let mqtt = config.mqtt_settings();
        assert_eq!(mqtt.host, "broker.lan");
        assert_eq!(mqtt.port, 8883);
        assert_eq!(mqtt.client_id, "bridge-1");
        assert!(mqtt.password.is_some());
    }

    #[test]
    fn maintenance_command_requires_both_halves() {
        let file = write_config(
            r#"
            [overkiz]
            username = "me@example.com"
            password = "very secret"
            server = "somfy_europe"
            device_name = "io:Boiler"
            "#,
        );

        let err = load(Some(file.path())).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }), "{err}");
    }

    #[test]
    fn unknown_server_is_a_config_error() {
        let file = write_config(
            r#"
            [overkiz]
            username = "me@example.com"
            password = "very secret"
            server = "somewhere_else"
            "#,
        );

        let err = load(Some(file.path())).unwrap_err();
        assert!(matches!(err, CliError::Config(_)), "{err}");
    }

    #[test]
    fn zero_sleep_is_rejected() {
        let file = write_config(
            r#"
            [overkiz]
            username = "me@example.com"
            password = "very secret"
            server = "somfy_europe"
            sleep = 0
            "#,
        );

        let err = load(Some(file.path())).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }), "{err}");
    }
}
