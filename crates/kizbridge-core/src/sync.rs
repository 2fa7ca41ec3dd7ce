// ── Sync loop ──
//
// The top-level state machine: LOGGING_IN → MAJOR_CYCLE → MINOR_CYCLE →
// MAJOR_CYCLE → …, terminal on unrecoverable error or liveness timeout.
// One single-threaded cooperative flow: devices are polled strictly
// sequentially, and the only suspension points are network calls and the
// fixed sub-tick sleep. Recovery from session-level failures is a full
// process restart driven by an external supervisor.

use overkiz_api::{Device, ErrorKind, OverkizClient, StateEntry};
use serde_json::{Map, Value, json};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::cache::DeviceCache;
use crate::command::{CALLER_TAG, CommandSlot, dispatch};
use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::liveness::LivenessClock;
use crate::mqtt::Publisher;

/// Reason for a clean, intentional stop (process exit code 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The vendor platform entered a maintenance window.
    Maintenance,
    /// The cloud API rate-limited the session; stopping immediately
    /// rather than backing off avoids amplifying the condition.
    RateLimited,
}

/// The bridge session: cloud client, device cache, command slot,
/// publisher, and liveness clock, all owned by one cooperative loop.
pub struct Bridge<P> {
    client: OverkizClient,
    publisher: P,
    cache: DeviceCache,
    slot: CommandSlot,
    liveness: LivenessClock,
    config: SyncConfig,
}

impl<P: Publisher> Bridge<P> {
    pub fn new(client: OverkizClient, publisher: P, slot: CommandSlot, config: SyncConfig) -> Self {
        let liveness = LivenessClock::new(config.liveness_ceiling);
        Self {
            client,
            publisher,
            cache: DeviceCache::new(),
            slot,
            liveness,
            config,
        }
    }

    /// Run the session to completion.
    ///
    /// `Ok(Shutdown)` is a clean intentional stop; `Err` is a liveness
    /// timeout or an unrecoverable session error.
    pub async fn run(&mut self) -> Result<Shutdown, CoreError> {
        if let Err(err) = self.client.login().await {
            error!(error = %err, "login failed");
            if err.is_bad_credentials() {
                info!(
                    cooldown_secs = self.config.auth_cooldown.as_secs(),
                    "pausing before exit so restarts do not hammer the auth endpoint"
                );
                sleep(self.config.auth_cooldown).await;
                return Err(err.into());
            }
            return shutdown_or_fatal(err.into());
        }
        info!("logged in, starting sync loop");

        loop {
            let cycle = async {
                self.major_cycle().await?;
                self.minor_cycle().await
            };
            if let Err(err) = cycle.await {
                return shutdown_or_fatal(err);
            }
        }
    }

    // ── Major cycle ──────────────────────────────────────────────────

    /// Refresh check, per-device state poll, publication, liveness check.
    async fn major_cycle(&mut self) -> Result<(), CoreError> {
        if self.cache.needs_refresh(self.config.cache_max_age) {
            self.cache.refresh(&self.client).await?;
            for device in self.cache.devices().to_vec() {
                let topic = self.config.device_topic(&device.controllable_name);
                self.publish_json(&topic, &descriptor_payload(&device), true)
                    .await?;
            }
        }

        let mut data_received = false;
        for device in self.cache.devices().to_vec() {
            self.run_maintenance_command(&device).await;

            let states = self.client.get_state(&device.device_url).await?;
            if !states.is_empty() {
                data_received = true;
            }
            debug!(
                device = %device.controllable_name,
                states = states.len(),
                "state poll complete"
            );

            let topic = self.config.states_topic(&device.controllable_name);
            self.publish_json(&topic, &snapshot_payload(&states), false)
                .await?;
        }

        if data_received {
            self.liveness.mark_data();
        } else if self.liveness.expired() {
            error!(
                elapsed_secs = self.liveness.elapsed().as_secs(),
                "too long since last state update -- exiting"
            );
            return Err(CoreError::LivenessTimeout {
                elapsed_secs: self.liveness.elapsed().as_secs(),
                ceiling_secs: self.liveness.ceiling().as_secs(),
            });
        }
        Ok(())
    }

    /// Best-effort per-cycle maintenance command for one configured
    /// device. Failures (including rate limiting) are logged only.
    async fn run_maintenance_command(&self, device: &Device) {
        let Some(ref maintenance) = self.config.maintenance else {
            return;
        };
        if device.controllable_name != maintenance.device {
            return;
        }

        match self
            .client
            .execute_command(
                &device.device_url,
                &maintenance.command,
                &maintenance.params,
                CALLER_TAG,
            )
            .await
        {
            Ok(exec_id) => debug!(
                exec_id,
                command = %maintenance.command,
                "maintenance command queued"
            ),
            Err(err) if err.is_rate_limited() => {
                warn!(error = %err, "maintenance command rate limited");
            }
            Err(err) => warn!(error = %err, "maintenance command failed"),
        }
    }

    // ── Minor cycle ──────────────────────────────────────────────────

    /// Fixed sub-ticks for the rest of the wake interval: drain the
    /// pending command, drain upstream events, sleep. The sub-tick
    /// bounds inbound-command latency without true concurrency --
    /// every operation in a tick is short-lived I/O.
    async fn minor_cycle(&mut self) -> Result<(), CoreError> {
        for _ in 0..self.config.sub_tick_count() {
            self.drain_pending_command().await?;
            self.drain_events().await?;
            sleep(self.config.sub_tick).await;
        }
        Ok(())
    }

    /// Take and dispatch the pending command, if any. Taking clears the
    /// slot no matter how dispatch turns out. Rate limiting propagates
    /// as a hard stop; other execution failures are logged only.
    async fn drain_pending_command(&mut self) -> Result<(), CoreError> {
        let Some(command) = self.slot.take() else {
            return Ok(());
        };
        let Some(address) = self.cache.lookup(&command.device) else {
            warn!(device = %command.device, "dropping command for unknown device");
            return Ok(());
        };
        let address = address.to_owned();

        match dispatch(&self.client, &address, &command).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_rate_limited() => Err(err.into()),
            Err(err) => {
                warn!(
                    error = %err,
                    device = %command.device,
                    command = %command.command,
                    "command execution failed"
                );
                Ok(())
            }
        }
    }

    /// Poll the event stream once and publish each event, with
    /// null-valued fields stripped, to the shared events topic.
    async fn drain_events(&mut self) -> Result<(), CoreError> {
        let events = self.client.fetch_events().await?;
        if events.is_empty() {
            return Ok(());
        }

        let topic = self.config.events_topic();
        debug!(count = events.len(), "publishing upstream events");
        for event in events {
            let value = strip_nulls(
                serde_json::to_value(&event).map_err(|e| CoreError::Internal(e.to_string()))?,
            );
            self.publish_json(&topic, &value, false).await?;
        }
        Ok(())
    }

    async fn publish_json(
        &self,
        topic: &str,
        payload: &Value,
        retain: bool,
    ) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec(payload).map_err(|e| CoreError::Internal(e.to_string()))?;
        self.publisher.publish(topic, bytes, retain).await
    }
}

/// Map a session-ending error to its exit class: rate limiting and
/// vendor maintenance are clean intentional stops, everything else is
/// a failure. The same mapping applies at login and in the cycle loop.
fn shutdown_or_fatal(err: CoreError) -> Result<Shutdown, CoreError> {
    match err.api_kind() {
        Some(ErrorKind::RateLimited) => {
            warn!(error = %err, "rate limited -- stopping cleanly");
            Ok(Shutdown::RateLimited)
        }
        Some(ErrorKind::Maintenance) => {
            info!("vendor maintenance window -- stopping cleanly");
            Ok(Shutdown::Maintenance)
        }
        _ => Err(err),
    }
}

// ── Payload shaping ──────────────────────────────────────────────────

/// Full device descriptor, published retained on refresh so new
/// subscribers immediately see what exists.
///
/// `type` is the numeric product tag exactly as the API reports it.
/// The name strings some clients show for it are a client-library
/// lookup table, not wire data, so no mapping is applied here.
fn descriptor_payload(device: &Device) -> Value {
    let mut payload = json!({
        "available": device.available,
        "enabled": device.enabled,
        "type": device.product_type,
        "protocol": device.protocol(),
        "widget": device.widget,
        "ui_class": device.ui_class,
        "label": device.label,
        "url": device.device_url,
    });
    let attributes: Map<String, Value> = device
        .attributes
        .iter()
        .map(|a| (a.name.clone(), a.value.clone()))
        .collect();
    if !attributes.is_empty() {
        payload["attributes"] = Value::Object(attributes);
    }
    payload
}

/// Full current state snapshot: name → value, order irrelevant. Every
/// poll publishes the whole snapshot; no diffing against history.
fn snapshot_payload(states: &[StateEntry]) -> Value {
    let map: Map<String, Value> = states
        .iter()
        .map(|s| (s.name.clone(), s.value.clone()))
        .collect();
    Value::Object(map)
}

/// Drop null-valued top-level fields from an event payload.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn device_from(json_value: Value) -> Device {
        serde_json::from_value(json_value).unwrap()
    }

    #[test]
    fn descriptor_carries_identity_and_classification() {
        let device = device_from(json!({
            "deviceURL": "io://1234-5678-9012/1",
            "label": "Boiler",
            "controllableName": "io:AtlanticDHWComponent",
            "available": true,
            "enabled": true,
            "type": 1,
            "widget": "DomesticHotWaterProduction",
            "uiClass": "WaterHeatingSystem",
            "attributes": [
                { "name": "core:FirmwareRevision", "value": "5.1" },
            ],
        }));

        let payload = descriptor_payload(&device);
        assert_eq!(payload["label"], json!("Boiler"));
        assert_eq!(payload["url"], json!("io://1234-5678-9012/1"));
        assert_eq!(payload["protocol"], json!("io"));
        // the numeric tag passes through unmapped
        assert_eq!(payload["type"], json!(1));
        assert_eq!(payload["widget"], json!("DomesticHotWaterProduction"));
        assert_eq!(
            payload["attributes"],
            json!({ "core:FirmwareRevision": "5.1" })
        );
    }

    #[test]
    fn descriptor_omits_empty_attributes() {
        let device = device_from(json!({
            "deviceURL": "io://1/1",
            "controllableName": "io:Shutter",
        }));
        let payload = descriptor_payload(&device);
        assert!(payload.get("attributes").is_none());
    }

    #[test]
    fn snapshot_maps_names_to_values() {
        let states: Vec<StateEntry> = serde_json::from_value(json!([
            { "name": "core:TemperatureState", "value": 54.5 },
            { "name": "core:OnOffState", "value": "on" },
            { "name": "core:ErrorState", "value": null },
        ]))
        .unwrap();

        assert_eq!(
            snapshot_payload(&states),
            json!({
                "core:TemperatureState": 54.5,
                "core:OnOffState": "on",
                "core:ErrorState": null,
            })
        );
        assert_eq!(snapshot_payload(&[]), json!({}));
    }

    #[test]
    fn events_lose_null_fields_but_keep_the_rest() {
        let stripped = strip_nulls(json!({
            "name": "ExecutionStateChangedEvent",
            "execId": "exec-1",
            "failureType": null,
        }));
        assert_eq!(
            stripped,
            json!({ "name": "ExecutionStateChangedEvent", "execId": "exec-1" })
        );
    }
}
