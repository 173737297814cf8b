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

//! Storage seam and the InfluxDB-backed writer.

use std::time::Duration;

use async_trait::async_trait;
use influxdb::{Client, Timestamp, WriteQuery};
use log::{debug, warn};

use crate::config::InfluxSinkConfig;
use crate::record::TelemetryRecord;

/// Errors returned by a [`TelemetrySink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("InfluxDB write failed: {0}")]
    Write(#[from] influxdb::Error),
    #[error("InfluxDB write timed out after {0:?}")]
    Timeout(Duration),
}

/// Destination for telemetry records.
///
/// `write` returns only once the backend has accepted or rejected the
/// record, so callers process records one at a time.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn write(&self, record: &TelemetryRecord) -> Result<(), SinkError>;
}

/// [`TelemetrySink`] that writes one point per record to InfluxDB 1.x.
pub struct InfluxWriter {
    client: Client,
    database: String,
    write_timeout: Duration,
}

impl InfluxWriter {
    /// Create a writer from the given config. No connection is opened until
    /// the first request.
    pub fn new(config: &InfluxSinkConfig) -> Self {
        let mut client = Client::new(&config.url, &config.database);
        match (&config.username, &config.password) {
            (Some(user), Some(pass)) => client = client.with_auth(user, pass),
            (None, None) => {}
            _ => warn!(
                "InfluxDB username and password must both be set; connecting to '{}' without authentication",
                config.url
            ),
        }

        Self {
            client,
            database: config.database.clone(),
            write_timeout: config.write_timeout,
        }
    }

    /// Check that the backend is reachable. Returns `(build, version)`.
    pub async fn ping(&self) -> Result<(String, String), SinkError> {
        match tokio::time::timeout(self.write_timeout, self.client.ping()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SinkError::Timeout(self.write_timeout)),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

#[async_trait]
impl TelemetrySink for InfluxWriter {
    async fn write(&self, record: &TelemetryRecord) -> Result<(), SinkError> {
        let query = write_query(record);
        match tokio::time::timeout(self.write_timeout, self.client.query(query)).await {
            Ok(Ok(response)) => {
                debug!("InfluxDB accepted point for '{}': {response}", record.measurement);
                Ok(())
            }
            Ok(Err(e)) => Err(SinkError::Write(e)),
            Err(_) => Err(SinkError::Timeout(self.write_timeout)),
        }
    }
}

/// Build the InfluxDB write for a single record.
pub fn write_query(record: &TelemetryRecord) -> WriteQuery {
    let timestamp = match record.time.timestamp_nanos_opt() {
        Some(ns) => Timestamp::Nanoseconds(ns as u128),
        None => Timestamp::Seconds(record.time.timestamp() as u128),
    };

    let mut query = WriteQuery::new(timestamp, record.measurement.as_str());
    for (key, value) in record.tag_pairs() {
        query = query.add_tag(key, value.to_string());
    }
    for (key, value) in record.field_pairs() {
        query = query.add_field(key, value);
    }
    query
}
