// Copyright 2025 The Drasi Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! MQTT receive loop feeding sensor messages to the sink.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use envsensor_sink_influx::TelemetrySink;
use log::{debug, error, info};
use rumqttc::{AsyncClient, ConnectionError, Event, Incoming, MqttOptions, Outgoing};

use crate::config::SensorSourceConfig;
use crate::handler::{ConnectionHandler, MessageHandler};

/// Pause after a connection error before polling again.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
/// Time allowed for the DISCONNECT packet to go out on shutdown.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Sensor telemetry source.
///
/// Subscribes to the configured topic, maps each JSON payload to a
/// telemetry record and writes it to the sink before taking the next
/// message off the connection.
pub struct SensorSource {
    config: SensorSourceConfig,
    connection: ConnectionHandler,
    messages: MessageHandler,
}

impl SensorSource {
    /// Create a new sensor source from the given config.
    pub fn new(config: SensorSourceConfig, sink: Arc<dyn TelemetrySink>) -> Result<Self> {
        config.validate()?;

        let connection = ConnectionHandler::new(&config.id, &config.topic, config.qos.into());
        let messages = MessageHandler::new(&config.id, &config.host_tag, sink);

        Ok(Self {
            config,
            connection,
            messages,
        })
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut mqtt_opts = MqttOptions::new(
            &self.config.client_id,
            &self.config.broker_host,
            self.config.port,
        );
        mqtt_opts.set_keep_alive(self.config.keep_alive);

        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            mqtt_opts.set_credentials(user, pass);
        }
        mqtt_opts
    }

    /// Drive the connection until `shutdown` completes.
    ///
    /// Events are handled one at a time: a slow sink write holds back the
    /// next message.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let source_id = &self.config.id;
        info!(
            "[{source_id}] Starting sensor source (broker={}:{}, topic={})",
            self.config.broker_host, self.config.port, self.config.topic
        );

        let (client, mut eventloop) = AsyncClient::new(self.mqtt_options(), self.config.channel_capacity);
        tokio::pin!(shutdown);

        loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                event = eventloop.poll() => event,
            };

            let stopped = match event {
                Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                    self.connection.on_connect(&client, &ack);
                    false
                }
                Ok(Event::Incoming(Incoming::SubAck(ack))) => {
                    self.connection.on_suback(&ack);
                    false
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    // An in-flight write is abandoned on shutdown.
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => true,
                        _ = self.messages.on_message(&publish.topic, &publish.payload) => false,
                    }
                }
                Ok(_) => false, // PingResp, outgoing packets, etc.
                Err(e) => {
                    match e {
                        ConnectionError::ConnectionRefused(code) => {
                            self.connection.on_refused(code);
                        }
                        e => error!("[{source_id}] MQTT connection error: {e}"),
                    }
                    // rumqttc reconnects on the next poll()
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => true,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => false,
                    }
                }
            };
            if stopped {
                break;
            }
        }
        info!("[{source_id}] Shutdown signal received");

        if let Err(e) = client.try_disconnect() {
            debug!("[{source_id}] Disconnect request not queued: {e}");
            return;
        }
        let flushed = tokio::time::timeout(DISCONNECT_GRACE, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;
        if flushed.is_err() {
            debug!("[{source_id}] Broker did not acknowledge disconnect in time");
        }
        info!("[{source_id}] Sensor source stopped");
    }
}
