// ── Device cache ──
//
// Holds the last known device list and the name→address index. Refresh
// is all-or-nothing: the replacement list and index are both built before
// either becomes visible, and a failed refresh leaves the stale cache
// (and its timestamp) untouched. The cache is owned by the sync loop;
// other components only see snapshots.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use overkiz_api::{Device, OverkizClient};
use tracing::info;

use crate::error::CoreError;

#[derive(Default)]
pub struct DeviceCache {
    devices: Vec<Device>,
    /// controllable name → device URL
    index: HashMap<String, String>,
    refreshed_at: Option<Instant>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True on cold start (never populated) or once the list is older
    /// than `max_age` of elapsed wall-clock time.
    pub fn needs_refresh(&self, max_age: Duration) -> bool {
        self.refreshed_at.is_none_or(|at| at.elapsed() >= max_age)
    }

    /// Replace the cache with a forced device listing.
    ///
    /// On error the existing cache is left as-is and the error
    /// propagates; there is no merge or partial-update path.
    pub async fn refresh(&mut self, client: &OverkizClient) -> Result<(), CoreError> {
        let devices = client.list_devices(true).await?;
        self.replace(devices);
        info!(devices = self.devices.len(), "device cache refreshed");
        Ok(())
    }

    /// Resolve a controllable name to its device URL.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.index.get(name).map(String::as_str)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn replace(&mut self, devices: Vec<Device>) {
        let index = devices
            .iter()
            .map(|d| (d.controllable_name.clone(), d.device_url.clone()))
            .collect();
        self.devices = devices;
        self.index = index;
        self.refreshed_at = Some(Instant::now());
    }

    #[cfg(test)]
    fn backdate(&mut self, age: Duration) {
        self.refreshed_at = Instant::now().checked_sub(age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device(name: &str, url: &str) -> Device {
        serde_json::from_value(json!({
            "deviceURL": url,
            "label": name,
            "controllableName": name,
        }))
        .unwrap()
    }

    #[test]
    fn cold_cache_always_needs_refresh() {
        let cache = DeviceCache::new();
        assert!(cache.is_empty());
        assert!(cache.needs_refresh(Duration::from_secs(3600 * 24)));
    }

    #[test]
    fn fresh_cache_does_not_need_refresh_until_max_age() {
        let mut cache = DeviceCache::new();
        cache.replace(vec![device("io:Boiler", "io://1/1")]);
        assert!(!cache.needs_refresh(Duration::from_secs(3600 * 24)));

        cache.backdate(Duration::from_secs(3600 * 25));
        assert!(cache.needs_refresh(Duration::from_secs(3600 * 24)));
    }

    #[test]
    fn replace_swaps_list_and_index_together() {
        let mut cache = DeviceCache::new();
        cache.replace(vec![
            device("io:Boiler", "io://1/1"),
            device("io:Shutter", "io://1/2"),
        ]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("io:Shutter"), Some("io://1/2"));

        cache.replace(vec![device("zigbee:Light", "zigbee://2/1")]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("io:Shutter"), None);
        assert_eq!(cache.lookup("zigbee:Light"), Some("zigbee://2/1"));
    }
}
