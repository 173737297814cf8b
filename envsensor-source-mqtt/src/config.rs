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

//! Configuration types for the sensor MQTT source.

use std::time::Duration;

use rumqttc::QoS;
use serde::Deserialize;

/// Topic the sensor fleet publishes to.
pub const DEFAULT_TOPIC: &str = "feedback_systems_sensors";
/// Host tag identifying this collection point.
pub const DEFAULT_HOST_TAG: &str = "apt202";

/// Delivery guarantee requested when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryQos {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl From<DeliveryQos> for QoS {
    fn from(qos: DeliveryQos) -> Self {
        match qos {
            DeliveryQos::AtMostOnce => QoS::AtMostOnce,
            DeliveryQos::AtLeastOnce => QoS::AtLeastOnce,
            DeliveryQos::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

/// Configuration for the sensor source.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorSourceConfig {
    /// Identifier used to prefix log lines.
    pub id: String,
    /// MQTT broker hostname or IP.
    pub broker_host: String,
    /// MQTT broker port (default: 1883).
    pub port: u16,
    /// Topic filter to subscribe to (default: `feedback_systems_sensors`).
    pub topic: String,
    /// MQTT client ID. Defaults to `"envsensor-source-{id}"`.
    pub client_id: String,
    /// Optional MQTT username for authentication.
    pub username: Option<String>,
    /// Optional MQTT password for authentication.
    pub password: Option<String>,
    /// Keep-alive interval (default: 60s). Zero disables keep-alive.
    pub keep_alive: Duration,
    /// Subscription QoS (default: at most once).
    pub qos: DeliveryQos,
    /// Value of the `host` tag on every record (default: `apt202`).
    pub host_tag: String,
    /// Capacity of the client request channel (default: 10).
    pub channel_capacity: usize,
}

impl SensorSourceConfig {
    /// Start building a new config with the required fields.
    pub fn builder(id: impl Into<String>, broker_host: impl Into<String>) -> SensorSourceConfigBuilder {
        let id = id.into();
        SensorSourceConfigBuilder {
            id: id.clone(),
            broker_host: broker_host.into(),
            port: 1883,
            topic: DEFAULT_TOPIC.to_string(),
            client_id: format!("envsensor-source-{id}"),
            username: None,
            password: None,
            keep_alive: Duration::from_secs(60),
            qos: DeliveryQos::default(),
            host_tag: DEFAULT_HOST_TAG.to_string(),
            channel_capacity: 10,
        }
    }

    /// Check values rumqttc would otherwise reject at runtime.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.broker_host.is_empty() {
            anyhow::bail!("broker host must not be empty");
        }
        if self.topic.is_empty() {
            anyhow::bail!("topic must not be empty");
        }
        if !self.keep_alive.is_zero() && self.keep_alive < Duration::from_secs(1) {
            anyhow::bail!("keep-alive must be zero or at least one second");
        }
        if self.username.is_some() != self.password.is_some() {
            anyhow::bail!("username and password must be set together");
        }
        if self.channel_capacity == 0 {
            anyhow::bail!("channel capacity must be at least 1");
        }
        Ok(())
    }
}

/// Builder for [`SensorSourceConfig`].
pub struct SensorSourceConfigBuilder {
    id: String,
    broker_host: String,
    port: u16,
    topic: String,
    client_id: String,
    username: Option<String>,
    password: Option<String>,
    keep_alive: Duration,
    qos: DeliveryQos,
    host_tag: String,
    channel_capacity: usize,
}

impl SensorSourceConfigBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn qos(mut self, qos: DeliveryQos) -> Self {
        self.qos = qos;
        self
    }

    pub fn host_tag(mut self, host_tag: impl Into<String>) -> Self {
        self.host_tag = host_tag.into();
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Build the config.
    pub fn build(self) -> SensorSourceConfig {
        SensorSourceConfig {
            id: self.id,
            broker_host: self.broker_host,
            port: self.port,
            topic: self.topic,
            client_id: self.client_id,
            username: self.username,
            password: self.password,
            keep_alive: self.keep_alive,
            qos: self.qos,
            host_tag: self.host_tag,
            channel_capacity: self.channel_capacity,
        }
    }
}
