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

//! InfluxDB sink for environmental sensor telemetry.
//!
//! Holds the [`TelemetryRecord`] produced for every inbound sensor message
//! and the [`TelemetrySink`] seam through which records are persisted.
//!
//! # Example
//!
//! ```ignore
//! use envsensor_sink_influx::{InfluxSinkConfig, InfluxWriter};
//!
//! let config = InfluxSinkConfig::builder("http://localhost:8086", "atmospheric_data")
//!     .username("root")
//!     .password("root")
//!     .build();
//!
//! let writer = InfluxWriter::new(&config);
//! writer.write(&record).await?;
//! ```

pub mod config;
pub mod record;
pub mod writer;

pub use config::{InfluxSinkConfig, InfluxSinkConfigBuilder};
pub use record::{RecordTags, SensorFields, TelemetryRecord};
pub use writer::{InfluxWriter, SinkError, TelemetrySink};
