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

//! Configuration types for the InfluxDB sink.

use std::time::Duration;

use serde::Deserialize;

/// Default bound on a single write request.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the InfluxDB sink.
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxSinkConfig {
    /// InfluxDB base URL (e.g. `http://localhost:8086`).
    pub url: String,
    /// Target database.
    pub database: String,
    /// Optional username for basic authentication.
    pub username: Option<String>,
    /// Optional password for basic authentication.
    pub password: Option<String>,
    /// Upper bound on a single write request (default: 10s).
    pub write_timeout: Duration,
}

impl InfluxSinkConfig {
    /// Start building a new config with the required fields.
    pub fn builder(url: impl Into<String>, database: impl Into<String>) -> InfluxSinkConfigBuilder {
        InfluxSinkConfigBuilder {
            url: url.into(),
            database: database.into(),
            username: None,
            password: None,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Builder for [`InfluxSinkConfig`].
pub struct InfluxSinkConfigBuilder {
    url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
    write_timeout: Duration,
}

impl InfluxSinkConfigBuilder {
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Build the config.
    pub fn build(self) -> InfluxSinkConfig {
        InfluxSinkConfig {
            url: self.url,
            database: self.database,
            username: self.username,
            password: self.password,
            write_timeout: self.write_timeout,
        }
    }
}
