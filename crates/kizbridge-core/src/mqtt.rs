// ── MQTT bus ──
//
// Connects to the broker, subscribes to the commands topic, and runs the
// rumqttc event loop in a background task. That task is the one point of
// true concurrency in the bridge: it feeds decoded inbound commands into
// the single-slot exchange read by the sync loop.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{CommandSlot, PendingCommand};
use crate::error::CoreError;

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub client_id: String,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1883,
            username: None,
            password: None,
            client_id: "kizbridge".into(),
        }
    }
}

/// Outbound publication seam.
///
/// The sync loop is generic over this so tests can record publishes
/// instead of talking to a broker.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), CoreError>;
}

/// Connected broker handle: an `AsyncClient` plus the background
/// delivery task draining its event loop.
#[derive(Debug)]
pub struct MqttBus {
    client: AsyncClient,
    cancel: CancellationToken,
}

impl MqttBus {
    /// Connect, subscribe to the commands topic, and spawn the delivery
    /// task that writes inbound commands into `slot`.
    pub async fn connect(
        settings: &MqttSettings,
        commands_topic: &str,
        slot: CommandSlot,
    ) -> Result<Self, CoreError> {
        let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        options.set_keep_alive(Duration::from_secs(60));
        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            options.set_credentials(user, pass.expose_secret());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        client
            .subscribe(commands_topic, QoS::AtLeastOnce)
            .await
            .map_err(CoreError::Bus)?;

        // The client only enqueues requests; drive the event loop until
        // the broker acknowledges the session, so a refused or
        // unreachable broker fails startup instead of wedging the
        // request queue once it fills.
        loop {
            if let Event::Incoming(Packet::ConnAck(_)) =
                eventloop.poll().await.map_err(CoreError::Connect)?
            {
                break;
            }
        }

        let cancel = CancellationToken::new();
        tokio::spawn(delivery_task(
            eventloop,
            commands_topic.to_owned(),
            slot,
            cancel.clone(),
        ));

        info!(
            broker = %format!("{}:{}", settings.host, settings.port),
            commands_topic,
            "MQTT bus connected"
        );
        Ok(Self { client, cancel })
    }

    /// Stop the background delivery task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for MqttBus {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Publisher for MqttBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), CoreError> {
        self.client
            .publish(topic, QoS::AtMostOnce, retain, payload)
            .await
            .map_err(CoreError::Bus)
    }
}

/// Drain the rumqttc event loop, decoding commands-topic publishes into
/// the slot. Connection errors are logged and retried after a short
/// pause; the loop only stops on cancellation.
async fn delivery_task(
    mut eventloop: EventLoop,
    commands_topic: String,
    slot: CommandSlot,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            polled = eventloop.poll() => match polled {
                Ok(Event::Incoming(Packet::Publish(publish)))
                    if publish.topic == commands_topic =>
                {
                    match PendingCommand::decode(&publish.payload) {
                        Ok(command) => {
                            debug!(
                                device = %command.device,
                                command = %command.command,
                                "inbound command received"
                            );
                            slot.put(command);
                        }
                        Err(err) => warn!(error = %err, "ignoring malformed inbound command"),
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "MQTT event loop error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
    debug!("MQTT delivery task stopped");
}
