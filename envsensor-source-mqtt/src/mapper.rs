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

//! Payload mapping utilities for converting sensor JSON payloads to
//! [`TelemetryRecord`]s.

use chrono::{DateTime, Utc};
use envsensor_sink_influx::{SensorFields, TelemetryRecord};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Keys every sensor payload must carry.
const REQUIRED_FIELDS: [&str; 6] = ["id", "reg", "t", "p", "h", "v"];

/// Errors produced while mapping a payload.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload is missing field '{0}'")]
    MissingField(&'static str),
    #[error("payload has an invalid field: {0}")]
    InvalidField(#[source] serde_json::Error),
}

/// A reading as published by a sensor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorReading {
    /// Sensor identifier. Numeric ids are accepted and kept as text.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub reg: String,
    /// Temperature.
    pub t: f64,
    /// Pressure.
    pub p: f64,
    /// Humidity.
    pub h: f64,
    /// Battery voltage.
    pub v: f64,
}

/// Parse a raw payload into a [`SensorReading`].
pub fn parse_reading(payload: &[u8]) -> Result<SensorReading, MapError> {
    let json: Value = serde_json::from_slice(payload).map_err(MapError::Malformed)?;

    let Value::Object(map) = &json else {
        return Err(MapError::NotAnObject);
    };
    if let Some(missing) = REQUIRED_FIELDS.iter().find(|key| !map.contains_key(**key)) {
        return Err(MapError::MissingField(*missing));
    }

    serde_json::from_value(json).map_err(MapError::InvalidField)
}

/// Reshape a reading into a record stamped with `now`.
pub fn reading_to_record(reading: SensorReading, host: &str, now: DateTime<Utc>) -> TelemetryRecord {
    let fields = SensorFields {
        temperature: reading.t,
        pressure: reading.p,
        humidity: reading.h,
        battery: reading.v,
    };
    TelemetryRecord::new(reading.id, reading.reg, host, fields, now)
}

/// Converts a raw JSON payload into a [`TelemetryRecord`].
///
/// Either every required field is present and well typed, or no record is
/// produced.
pub fn payload_to_record(
    payload: &[u8],
    host: &str,
    now: DateTime<Utc>,
) -> Result<TelemetryRecord, MapError> {
    let reading = parse_reading(payload)?;
    Ok(reading_to_record(reading, host, now))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}
