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

//! Connection and message callbacks driven by the MQTT event loop.

use std::sync::Arc;

use chrono::Utc;
use envsensor_sink_influx::{SinkError, TelemetryRecord, TelemetrySink};
use log::{debug, error, info};
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, QoS, SubAck, SubscribeReasonCode};

use crate::mapper::{self, MapError};

/// Result of handling a broker `ConnAck`.
#[derive(Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Subscription request queued.
    Subscribed,
    /// The broker refused the connection.
    Refused(ConnectReturnCode),
    /// The subscription request could not be queued.
    SubscribeFailed,
}

/// Subscribes to the sensor topic each time the broker accepts a connection.
pub struct ConnectionHandler {
    id: String,
    topic: String,
    qos: QoS,
}

impl ConnectionHandler {
    pub fn new(id: impl Into<String>, topic: impl Into<String>, qos: QoS) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            qos,
        }
    }

    /// Handle a `ConnAck`. Runs after every (re)connect, so the
    /// subscription survives broker restarts.
    pub fn on_connect(&self, client: &AsyncClient, ack: &ConnAck) -> ConnectOutcome {
        let id = &self.id;
        debug!("[{id}] Connection result: {:?}", ack.code);

        if ack.code != ConnectReturnCode::Success {
            return self.on_refused(ack.code);
        }

        // Non-blocking: the event loop that drains this channel is our caller.
        match client.try_subscribe(&self.topic, self.qos) {
            Ok(()) => {
                info!("[{id}] Subscribing to topic '{}' ({:?})", self.topic, self.qos);
                ConnectOutcome::Subscribed
            }
            Err(e) => {
                error!("[{id}] Failed to subscribe to '{}': {e}", self.topic);
                ConnectOutcome::SubscribeFailed
            }
        }
    }

    /// Handle a connection the broker refused. rumqttc reports these as
    /// `ConnectionError::ConnectionRefused` rather than as a `ConnAck` event.
    pub fn on_refused(&self, code: ConnectReturnCode) -> ConnectOutcome {
        error!("[{}] Broker refused connection: {code:?}", self.id);
        ConnectOutcome::Refused(code)
    }

    /// Handle a `SubAck`. Returns `false` if the broker rejected any filter.
    pub fn on_suback(&self, ack: &SubAck) -> bool {
        let rejected = ack
            .return_codes
            .iter()
            .any(|code| matches!(code, SubscribeReasonCode::Failure));

        if rejected {
            error!(
                "[{}] Broker rejected subscription to '{}' (pkid={})",
                self.id, self.topic, ack.pkid
            );
        } else {
            info!("[{}] Subscribed to topic '{}'", self.id, self.topic);
        }
        !rejected
    }
}

/// Result of handling one inbound message.
#[derive(Debug)]
pub enum Outcome {
    /// The record was accepted by the sink.
    Persisted(TelemetryRecord),
    /// The payload could not be mapped; nothing was written.
    Discarded(MapError),
    /// The sink rejected the record.
    WriteFailed(SinkError),
}

/// Maps each inbound payload to a record and writes it to the sink.
pub struct MessageHandler {
    id: String,
    host_tag: String,
    sink: Arc<dyn TelemetrySink>,
}

impl MessageHandler {
    pub fn new(id: impl Into<String>, host_tag: impl Into<String>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            id: id.into(),
            host_tag: host_tag.into(),
            sink,
        }
    }

    /// Handle one message. Never fails: every error is logged and reported
    /// through the returned [`Outcome`].
    pub async fn on_message(&self, topic: &str, payload: &[u8]) -> Outcome {
        let id = &self.id;
        let raw = String::from_utf8_lossy(payload);
        debug!("[{id}] {topic}: {raw}");

        let record = match mapper::payload_to_record(payload, &self.host_tag, Utc::now()) {
            Ok(record) => record,
            Err(e) => {
                error!("[{id}] Ignoring invalid sensor data ({e}): {raw}");
                return Outcome::Discarded(e);
            }
        };

        debug!("[{id}] {record:?}");
        match self.sink.write(&record).await {
            Ok(()) => Outcome::Persisted(record),
            Err(e) => {
                error!("[{id}] Failed to persist reading from '{}': {e}", record.measurement);
                Outcome::WriteFailed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use rumqttc::MqttOptions;

    /// Captures log records so tests can assert on what was reported.
    struct LogRecorder {
        entries: Mutex<Vec<(log::Level, String)>>,
    }

    impl log::Log for LogRecorder {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            self.entries
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static LOGS: LogRecorder = LogRecorder {
        entries: Mutex::new(Vec::new()),
    };

    fn install_log_recorder() {
        // Another test may have installed it already.
        let _ = log::set_logger(&LOGS);
        log::set_max_level(log::LevelFilter::Trace);
    }

    /// Error-level messages logged by the handler with the given id.
    fn errors_from(id: &str) -> Vec<String> {
        let prefix = format!("[{id}]");
        LOGS.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, msg)| *level == log::Level::Error && msg.starts_with(&prefix))
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    const SCENARIO_1: &[u8] = br#"{"id":"s1","reg":"north","t":21.5,"p":1012,"h":45,"v":3.7}"#;

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<TelemetryRecord>>,
    }

    impl RecordingSink {
        fn records(&self) -> Vec<TelemetryRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TelemetrySink for RecordingSink {
        async fn write(&self, record: &TelemetryRecord) -> Result<(), SinkError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl TelemetrySink for FailingSink {
        async fn write(&self, _record: &TelemetryRecord) -> Result<(), SinkError> {
            Err(SinkError::Timeout(Duration::from_secs(10)))
        }
    }

    fn handler_with(sink: Arc<dyn TelemetrySink>) -> MessageHandler {
        MessageHandler::new("test", "apt202", sink)
    }

    #[tokio::test]
    async fn test_valid_message_persists_one_record() {
        let sink = Arc::new(RecordingSink::default());
        let handler = handler_with(sink.clone());

        let outcome = handler.on_message("feedback_systems_sensors", SCENARIO_1).await;
        assert!(matches!(outcome, Outcome::Persisted(_)));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.measurement, "s1");
        assert_eq!(record.tags.region, "north");
        assert_eq!(record.tags.host, "apt202");
        assert_eq!(record.fields.temperature, 21.5);
        assert_eq!(record.fields.pressure, 1012.0);
        assert_eq!(record.fields.humidity, 45.0);
        assert_eq!(record.fields.battery, 3.7);
    }

    #[tokio::test]
    async fn test_invalid_json_writes_nothing() {
        install_log_recorder();
        let sink = Arc::new(RecordingSink::default());
        let handler = MessageHandler::new("invalid-json", "apt202", sink.clone());

        let outcome = handler.on_message("feedback_systems_sensors", b"not valid json").await;
        assert!(matches!(outcome, Outcome::Discarded(MapError::Malformed(_))));
        assert!(sink.records().is_empty());

        let errors = errors_from("invalid-json");
        assert_eq!(errors.len(), 1, "unexpected errors: {errors:?}");
        assert!(errors[0].contains("not valid json"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_dropped() {
        install_log_recorder();
        let sink = Arc::new(RecordingSink::default());
        let handler = MessageHandler::new("missing-fields", "apt202", sink.clone());

        let outcome = handler.on_message("feedback_systems_sensors", br#"{"id":"s1"}"#).await;
        assert!(matches!(outcome, Outcome::Discarded(MapError::MissingField(_))));
        assert!(sink.records().is_empty());

        let errors = errors_from("missing-fields");
        assert_eq!(errors.len(), 1, "unexpected errors: {errors:?}");
        assert!(errors[0].contains(r#"{"id":"s1"}"#));
    }

    #[tokio::test]
    async fn test_valid_message_logs_no_error() {
        install_log_recorder();
        let sink = Arc::new(RecordingSink::default());
        let handler = MessageHandler::new("valid-message", "apt202", sink.clone());

        handler.on_message("feedback_systems_sensors", SCENARIO_1).await;
        assert!(errors_from("valid-message").is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_and_handler_continues() {
        let handler = handler_with(Arc::new(FailingSink));

        let first = handler.on_message("feedback_systems_sensors", SCENARIO_1).await;
        assert!(matches!(first, Outcome::WriteFailed(SinkError::Timeout(_))));

        let second = handler.on_message("feedback_systems_sensors", SCENARIO_1).await;
        assert!(matches!(second, Outcome::WriteFailed(_)));
    }

    #[tokio::test]
    async fn test_repeated_message_produces_distinct_records() {
        let sink = Arc::new(RecordingSink::default());
        let handler = handler_with(sink.clone());

        handler.on_message("feedback_systems_sensors", SCENARIO_1).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        handler.on_message("feedback_systems_sensors", SCENARIO_1).await;

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records[1].time > records[0].time);
        assert_eq!(records[0].measurement, records[1].measurement);
        assert_eq!(records[0].tags, records[1].tags);
        assert_eq!(records[0].fields, records[1].fields);
    }

    #[test]
    fn test_on_connect_subscribes_on_success() {
        let (client, _eventloop) = AsyncClient::new(MqttOptions::new("test", "localhost", 1883), 10);
        let handler = ConnectionHandler::new("test", "feedback_systems_sensors", QoS::AtMostOnce);

        let ack = ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
        };
        assert_eq!(handler.on_connect(&client, &ack), ConnectOutcome::Subscribed);
    }

    #[test]
    fn test_on_connect_refused() {
        let (client, _eventloop) = AsyncClient::new(MqttOptions::new("test", "localhost", 1883), 10);
        let handler = ConnectionHandler::new("test", "feedback_systems_sensors", QoS::AtMostOnce);

        let ack = ConnAck {
            session_present: false,
            code: ConnectReturnCode::NotAuthorized,
        };
        assert_eq!(
            handler.on_connect(&client, &ack),
            ConnectOutcome::Refused(ConnectReturnCode::NotAuthorized)
        );
    }

    #[test]
    fn test_on_refused() {
        let handler = ConnectionHandler::new("test", "feedback_systems_sensors", QoS::AtMostOnce);
        assert_eq!(
            handler.on_refused(ConnectReturnCode::BadUserNamePassword),
            ConnectOutcome::Refused(ConnectReturnCode::BadUserNamePassword)
        );
    }

    #[test]
    fn test_on_connect_reports_subscribe_failure() {
        let (client, eventloop) = AsyncClient::new(MqttOptions::new("test", "localhost", 1883), 10);
        drop(eventloop);
        let handler = ConnectionHandler::new("test", "feedback_systems_sensors", QoS::AtMostOnce);

        let ack = ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
        };
        assert_eq!(handler.on_connect(&client, &ack), ConnectOutcome::SubscribeFailed);
    }

    #[test]
    fn test_on_suback() {
        let handler = ConnectionHandler::new("test", "feedback_systems_sensors", QoS::AtMostOnce);

        let granted = SubAck {
            pkid: 1,
            return_codes: vec![SubscribeReasonCode::Success(QoS::AtMostOnce)],
        };
        assert!(handler.on_suback(&granted));

        let rejected = SubAck {
            pkid: 2,
            return_codes: vec![SubscribeReasonCode::Failure],
        };
        assert!(!handler.on_suback(&rejected));
    }
}
