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

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use envsensor_sink_influx::InfluxWriter;
use envsensor_source_mqtt::SensorSource;
use log::{info, warn};

use crate::config::GatewayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));

    info!("Starting environmental sensor gateway...");
    let config = GatewayConfig::from_env().context("Configuration error")?;

    // 1. Storage client
    let writer = InfluxWriter::new(&config.sink);
    match writer.ping().await {
        Ok((build, version)) => info!(
            "InfluxDB reachable at {} (database={}, build={build}, version={version})",
            config.sink.url,
            writer.database()
        ),
        Err(e) => warn!("InfluxDB at {} not reachable yet: {e}", config.sink.url),
    }

    // 2. MQTT source writing into it
    let source = SensorSource::new(config.source, Arc::new(writer))?;

    // 3. Run until signal
    source
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Gateway stopped");
    Ok(())
}
