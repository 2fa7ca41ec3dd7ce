// Typed configuration owned by the sync loop.

use std::time::Duration;

use serde_json::Value;

/// An optional command executed against one named device every major
/// cycle (e.g. asking a boiler to refresh its water temperature before
/// the poll). Best-effort: failures are logged, never fatal.
#[derive(Debug, Clone)]
pub struct MaintenanceCommand {
    /// Target device, matched against the controllable name.
    pub device: String,
    pub command: String,
    pub params: Vec<Value>,
}

/// Timing and routing parameters of the sync loop.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Topic prefix for all published messages.
    pub topic_base: String,
    /// Length of one full major+minor cycle.
    pub poll_interval: Duration,
    /// Sub-tick within the minor cycle; bounds inbound-command latency
    /// independent of the main polling cadence.
    pub sub_tick: Duration,
    /// Maximum tolerated time with no successful state read.
    pub liveness_ceiling: Duration,
    /// Device list age after which a refresh is forced.
    pub cache_max_age: Duration,
    /// Pause before exiting on rejected credentials, so a supervisor
    /// restart loop does not hammer the vendor auth endpoint.
    pub auth_cooldown: Duration,
    pub maintenance: Option<MaintenanceCommand>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            topic_base: "overkiz".into(),
            poll_interval: Duration::from_secs(60),
            sub_tick: Duration::from_secs(2),
            liveness_ceiling: Duration::from_secs(600),
            cache_max_age: Duration::from_secs(3600 * 24),
            auth_cooldown: Duration::from_secs(300),
            maintenance: None,
        }
    }
}

impl SyncConfig {
    /// Number of sub-ticks in one minor cycle. At least one, so a poll
    /// interval shorter than the sub-tick still drains commands/events.
    pub fn sub_tick_count(&self) -> u32 {
        let ratio = self.poll_interval.as_millis() / self.sub_tick.as_millis().max(1);
        u32::try_from(ratio).unwrap_or(u32::MAX).max(1)
    }

    /// Topic carrying inbound commands.
    pub fn commands_topic(&self) -> String {
        format!("{}/commands", self.topic_base)
    }

    /// Topic carrying the upstream event stream.
    pub fn events_topic(&self) -> String {
        format!("{}/events", self.topic_base)
    }

    /// Per-device descriptor topic (retained).
    pub fn device_topic(&self, name: &str) -> String {
        format!("{}/{name}", self.topic_base)
    }

    /// Per-device state snapshot topic (not retained).
    pub fn states_topic(&self, name: &str) -> String {
        format!("{}/{name}/states", self.topic_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_interval_yields_thirty_sub_ticks() {
        let config = SyncConfig::default();
        assert_eq!(config.sub_tick_count(), 30);
    }

    #[test]
    fn sub_tick_count_is_at_least_one() {
        let config = SyncConfig {
            poll_interval: Duration::from_secs(1),
            sub_tick: Duration::from_secs(2),
            ..SyncConfig::default()
        };
        assert_eq!(config.sub_tick_count(), 1);
    }

    #[test]
    fn topics_are_rooted_at_the_base() {
        let config = SyncConfig {
            topic_base: "home/overkiz".into(),
            ..SyncConfig::default()
        };
        assert_eq!(config.commands_topic(), "home/overkiz/commands");
        assert_eq!(config.events_topic(), "home/overkiz/events");
        assert_eq!(config.device_topic("io:Boiler"), "home/overkiz/io:Boiler");
        assert_eq!(
            config.states_topic("io:Boiler"),
            "home/overkiz/io:Boiler/states"
        );
    }
}
