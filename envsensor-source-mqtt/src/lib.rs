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

//! MQTT source for environmental sensor telemetry.
//!
//! Subscribes to the sensor topic, parses JSON payloads of the form
//! `{"id", "reg", "t", "p", "h", "v"}` into [`TelemetryRecord`]s and writes
//! each one to a [`TelemetrySink`] as it arrives.
//!
//! # Example
//!
//! ```ignore
//! use envsensor_source_mqtt::{SensorSource, SensorSourceConfig};
//!
//! let config = SensorSourceConfig::builder("envsensor", "iot.eclipse.org")
//!     .topic("feedback_systems_sensors")
//!     .build();
//!
//! let source = SensorSource::new(config, sink)?;
//! source.run(shutdown).await;
//! ```
//!
//! [`TelemetryRecord`]: envsensor_sink_influx::TelemetryRecord
//! [`TelemetrySink`]: envsensor_sink_influx::TelemetrySink

pub mod config;
pub mod handler;
pub mod mapper;
pub mod source;

pub use config::{DeliveryQos, SensorSourceConfig, SensorSourceConfigBuilder};
pub use handler::{ConnectOutcome, ConnectionHandler, MessageHandler, Outcome};
pub use mapper::{MapError, SensorReading};
pub use source::SensorSource;
