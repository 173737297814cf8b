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

//! Gateway configuration read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use envsensor_sink_influx::InfluxSinkConfig;
use envsensor_source_mqtt::config::{DEFAULT_HOST_TAG, DEFAULT_TOPIC};
use envsensor_source_mqtt::SensorSourceConfig;

const DEFAULT_BROKER_HOST: &str = "iot.eclipse.org";
const DEFAULT_INFLUX_URL: &str = "http://localhost:8086";
const DEFAULT_INFLUX_DATABASE: &str = "atmospheric_data";
const DEFAULT_INFLUX_CREDENTIAL: &str = "root";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub source: SensorSourceConfig,
    pub sink: InfluxSinkConfig,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from `lookup`, falling back to the defaults for
    /// unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let broker_host = lookup("MQTT_BROKER_HOST").unwrap_or_else(|| DEFAULT_BROKER_HOST.to_string());
        let port: u16 = parse_or(&lookup, "MQTT_PORT", 1883)?;
        let keep_alive: u64 = parse_or(&lookup, "MQTT_KEEP_ALIVE_SECS", 60)?;
        let topic = lookup("MQTT_TOPIC").unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let client_id = lookup("MQTT_CLIENT_ID")
            .unwrap_or_else(|| format!("envsensor-gateway-{}", uuid::Uuid::new_v4()));
        let host_tag = lookup("SENSOR_HOST_TAG").unwrap_or_else(|| DEFAULT_HOST_TAG.to_string());

        let mut source = SensorSourceConfig::builder("envsensor", broker_host)
            .port(port)
            .keep_alive(Duration::from_secs(keep_alive))
            .topic(topic)
            .client_id(client_id)
            .host_tag(host_tag);
        match (lookup("MQTT_USERNAME"), lookup("MQTT_PASSWORD")) {
            (Some(user), Some(pass)) => source = source.username(user).password(pass),
            (None, None) => {}
            _ => bail!("MQTT_USERNAME and MQTT_PASSWORD must be set together"),
        }

        let url = lookup("INFLUX_URL").unwrap_or_else(|| DEFAULT_INFLUX_URL.to_string());
        let database = lookup("INFLUX_DATABASE").unwrap_or_else(|| DEFAULT_INFLUX_DATABASE.to_string());
        let write_timeout: u64 = parse_or(&lookup, "INFLUX_WRITE_TIMEOUT_SECS", 10)?;
        let sink = InfluxSinkConfig::builder(url, database)
            .username(lookup("INFLUX_USERNAME").unwrap_or_else(|| DEFAULT_INFLUX_CREDENTIAL.to_string()))
            .password(lookup("INFLUX_PASSWORD").unwrap_or_else(|| DEFAULT_INFLUX_CREDENTIAL.to_string()))
            .write_timeout(Duration::from_secs(write_timeout))
            .build();

        Ok(Self {
            source: source.build(),
            sink,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = GatewayConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.source.broker_host, "iot.eclipse.org");
        assert_eq!(config.source.port, 1883);
        assert_eq!(config.source.keep_alive, Duration::from_secs(60));
        assert_eq!(config.source.topic, "feedback_systems_sensors");
        assert_eq!(config.source.host_tag, "apt202");
        assert!(config.source.client_id.starts_with("envsensor-gateway-"));
        assert!(config.source.username.is_none());

        assert_eq!(config.sink.url, "http://localhost:8086");
        assert_eq!(config.sink.database, "atmospheric_data");
        assert_eq!(config.sink.username.as_deref(), Some("root"));
        assert_eq!(config.sink.password.as_deref(), Some("root"));
        assert_eq!(config.sink.write_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("MQTT_BROKER_HOST", "broker.local"),
            ("MQTT_PORT", "8883"),
            ("MQTT_TOPIC", "sensors/env"),
            ("MQTT_CLIENT_ID", "gw-1"),
            ("MQTT_USERNAME", "mqtt-user"),
            ("MQTT_PASSWORD", "mqtt-pass"),
            ("SENSOR_HOST_TAG", "lab"),
            ("INFLUX_URL", "http://influx:8086"),
            ("INFLUX_DATABASE", "env"),
            ("INFLUX_WRITE_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.source.broker_host, "broker.local");
        assert_eq!(config.source.port, 8883);
        assert_eq!(config.source.topic, "sensors/env");
        assert_eq!(config.source.client_id, "gw-1");
        assert_eq!(config.source.username.as_deref(), Some("mqtt-user"));
        assert_eq!(config.source.host_tag, "lab");
        assert_eq!(config.sink.url, "http://influx:8086");
        assert_eq!(config.sink.database, "env");
        assert_eq!(config.sink.write_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_partial_mqtt_credentials_rejected() {
        let err = GatewayConfig::from_lookup(lookup_from(&[("MQTT_USERNAME", "mqtt-user")])).unwrap_err();
        assert!(err.to_string().contains("MQTT_PASSWORD"));

        let err = GatewayConfig::from_lookup(lookup_from(&[("MQTT_PASSWORD", "mqtt-pass")])).unwrap_err();
        assert!(err.to_string().contains("MQTT_USERNAME"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = GatewayConfig::from_lookup(lookup_from(&[("MQTT_PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("MQTT_PORT"));
    }
}
