// ── Core error types ──
//
// Failures from the cloud API keep their classification (the `Api`
// variant wraps the typed error); call sites switch on the kind to pick
// fatal-vs-logged. There is no reconnect/resume machinery: recovery from
// any session-level failure is a full process restart.

use overkiz_api::ErrorKind;
use thiserror::Error;

/// Unified error type for the bridge core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cloud API failure, classification preserved.
    #[error("Cloud API failure: {0}")]
    Api(#[from] overkiz_api::Error),

    /// MQTT client failure (publish/subscribe rejected).
    #[error("MQTT failure: {0}")]
    Bus(#[from] rumqttc::ClientError),

    /// Broker connection failed or was refused at startup.
    #[error("MQTT connect failed: {0}")]
    Connect(#[from] rumqttc::ConnectionError),

    /// No device yielded a state read for longer than the ceiling.
    #[error("No state data received for {elapsed_secs}s (ceiling {ceiling_secs}s)")]
    LivenessTimeout {
        elapsed_secs: u64,
        ceiling_secs: u64,
    },

    /// Inbound command that could not be decoded.
    #[error("Malformed inbound command: {reason}")]
    MalformedCommand { reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Classification of the underlying cloud API error, if any.
    pub fn api_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Api(err) => Some(err.kind()),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.api_kind() == Some(ErrorKind::RateLimited)
    }

    pub fn is_maintenance(&self) -> bool {
        self.api_kind() == Some(ErrorKind::Maintenance)
    }
}
