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

//! Telemetry record written to the time-series backend.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Sensor readings carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorFields {
    pub temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub battery: f64,
}

/// Indexed tags attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordTags {
    /// Collection point that received the reading.
    pub host: String,
    /// Region reported by the sensor.
    pub region: String,
}

/// One time-series point per inbound sensor message.
///
/// A record is built once and handed straight to a sink; it is never
/// updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// Sensor identifier, used as the measurement name.
    pub measurement: String,
    pub tags: RecordTags,
    pub fields: SensorFields,
    /// Wall-clock time at which the message was processed.
    pub time: DateTime<Utc>,
}

impl TelemetryRecord {
    pub fn new(
        measurement: impl Into<String>,
        region: impl Into<String>,
        host: impl Into<String>,
        fields: SensorFields,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            measurement: measurement.into(),
            tags: RecordTags {
                host: host.into(),
                region: region.into(),
            },
            fields,
            time,
        }
    }

    /// Processing time as an RFC 3339 string.
    pub fn timestamp(&self) -> String {
        self.time.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Tag set in write order.
    pub fn tag_pairs(&self) -> [(&'static str, &str); 2] {
        [("host", self.tags.host.as_str()), ("region", self.tags.region.as_str())]
    }

    /// Field set in write order, keyed by the names stored in the database.
    ///
    /// The battery field keeps its capitalised `Battery` key so new points
    /// land in the same series as existing data.
    pub fn field_pairs(&self) -> [(&'static str, f64); 4] {
        [
            ("temperature", self.fields.temperature),
            ("pressure", self.fields.pressure),
            ("humidity", self.fields.humidity),
            ("Battery", self.fields.battery),
        ]
    }
}
