// kizbridge-core: the synchronization loop between the Overkiz cloud API
// and an MQTT broker. Owns device-list caching, state polling, inbound
// command dispatch, and outbound event/state publication under a
// single-threaded cooperative loop with a fixed wake cadence.

pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod liveness;
pub mod mqtt;
pub mod sync;

pub use cache::DeviceCache;
pub use command::{CALLER_TAG, CommandSlot, PendingCommand};
pub use config::{MaintenanceCommand, SyncConfig};
pub use error::CoreError;
pub use mqtt::{MqttBus, MqttSettings, Publisher};
pub use sync::{Bridge, Shutdown};
